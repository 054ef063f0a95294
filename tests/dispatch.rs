mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::bail;
use async_trait::async_trait;
use common::{alice, bot_identity, harness, BOT_ID};
use roombot::router::{
    BufferSay, Command, CommandHandler, CommandRouter, Dispatch, Invocation, Prefix, Say,
    FAILURE_REPLY,
};

/// Replies with a fixed line and counts its runs.
struct Counted {
    reply: &'static str,
    runs: Arc<AtomicUsize>,
}

#[async_trait]
impl CommandHandler for Counted {
    async fn run(&self, _inv: &Invocation, _say: &dyn Say) -> anyhow::Result<Option<String>> {
        self.runs.fetch_add(1, Ordering::SeqCst);
        Ok(Some(self.reply.to_string()))
    }
}

struct Failing;

#[async_trait]
impl CommandHandler for Failing {
    async fn run(&self, _inv: &Invocation, _say: &dyn Say) -> anyhow::Result<Option<String>> {
        bail!("storage exploded")
    }
}

struct Panicking;

#[async_trait]
impl CommandHandler for Panicking {
    async fn run(&self, _inv: &Invocation, _say: &dyn Say) -> anyhow::Result<Option<String>> {
        panic!("handler bug");
    }
}

/// Echoes what the handler saw of the message.
struct Describe;

#[async_trait]
impl CommandHandler for Describe {
    async fn run(&self, inv: &Invocation, _say: &dyn Say) -> anyhow::Result<Option<String>> {
        let m = &inv.msg;
        Ok(Some(format!(
            "cmd={} alias={} argcat={} admin={}",
            m.command.as_deref().unwrap_or(""),
            m.used_alias.as_deref().unwrap_or(""),
            m.argcat,
            m.admin
        )))
    }
}

fn counted(reply: &'static str) -> (Counted, Arc<AtomicUsize>) {
    let runs = Arc::new(AtomicUsize::new(0));
    (Counted { reply, runs: runs.clone() }, runs)
}

fn router_with(commands: Vec<Command>) -> CommandRouter {
    let mut router = CommandRouter::new();
    router.add_prefix(Prefix::attached("/"));
    router.add_prefix(Prefix::separated("bot"));
    for c in commands {
        router.add_command(c);
    }
    router
}

async fn run(router: &CommandRouter, text: &str) -> (Dispatch, Vec<String>) {
    let h = harness();
    let say = Arc::new(BufferSay::new());
    let outcome = router.dispatch(&h.ctx, alice(), text, false, say.clone()).await;
    (outcome, say.lines().await)
}

#[tokio::test]
async fn own_messages_run_nothing() {
    let h = harness();
    h.ctx.set_own_id(BOT_ID).await;
    let (outcome, lines) = h.send(bot_identity(), "/go outside").await;
    assert_eq!(outcome, Dispatch::Echo);
    assert!(lines.is_empty());
    assert_eq!(h.ctx.world.location_id(BOT_ID).await.unwrap(), "home");
}

#[tokio::test]
async fn every_matching_command_runs_in_order() {
    let (first, first_runs) = counted("first");
    let (second, second_runs) = counted("second");
    let (other, other_runs) = counted("other");
    let router = router_with(vec![
        Command::new("a", &["ping"], first),
        Command::new("b", &["pong"], other),
        Command::new("c", &["p", "ping"], second),
    ]);

    let (outcome, lines) = run(&router, "/ping").await;
    assert_eq!(outcome, Dispatch::Handled { ran: 2, refused: 0, failed: 0 });
    assert_eq!(lines, vec!["first".to_string(), "second".to_string()]);
    assert_eq!(first_runs.load(Ordering::SeqCst), 1);
    assert_eq!(second_runs.load(Ordering::SeqCst), 1);
    assert_eq!(other_runs.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn aliases_are_case_sensitive() {
    let (handler, runs) = counted("hi");
    let router = router_with(vec![Command::new("hi", &["hi"], handler)]);
    assert_eq!(run(&router, "/HI").await.0, Dispatch::Unknown);
    assert_eq!(runs.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn failing_handler_reports_and_later_matches_still_run() {
    let (after, after_runs) = counted("after");
    let router = router_with(vec![
        Command::new("bad", &["x"], Failing),
        Command::new("good", &["x"], after),
    ]);
    let (outcome, lines) = run(&router, "/x").await;
    assert_eq!(outcome, Dispatch::Handled { ran: 1, refused: 0, failed: 1 });
    assert_eq!(lines, vec![FAILURE_REPLY.to_string(), "after".to_string()]);
    assert_eq!(after_runs.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn panicking_handler_is_contained() {
    let (after, after_runs) = counted("still here");
    let router = router_with(vec![
        Command::new("boom", &["boom"], Panicking),
        Command::new("after", &["boom"], after),
    ]);
    let (outcome, lines) = run(&router, "/boom").await;
    assert_eq!(outcome, Dispatch::Handled { ran: 1, refused: 0, failed: 1 });
    assert_eq!(lines, vec![FAILURE_REPLY.to_string(), "still here".to_string()]);
    assert_eq!(after_runs.load(Ordering::SeqCst), 1);

    // the router is still usable afterwards
    let (outcome, _) = run(&router, "/boom").await;
    assert_eq!(outcome, Dispatch::Handled { ran: 1, refused: 0, failed: 1 });
}

#[tokio::test]
async fn plain_chat_and_unknown_commands_stay_silent() {
    let h = harness();
    let (outcome, lines) = h.send(alice(), "hello everyone").await;
    assert_eq!(outcome, Dispatch::NotCommand);
    assert!(lines.is_empty());

    let (outcome, lines) = h.send(alice(), "/dance").await;
    assert_eq!(outcome, Dispatch::Unknown);
    assert!(lines.is_empty());

    let (outcome, lines) = h.send(alice(), "").await;
    assert_eq!(outcome, Dispatch::NotCommand);
    assert!(lines.is_empty());
}

#[tokio::test]
async fn separated_prefix_takes_the_next_word() {
    let router = router_with(vec![Command::new("describe", &["describe", "d"], Describe)]);
    let (_, lines) = run(&router, "bot d  one   two").await;
    assert_eq!(lines, vec!["cmd=d alias=d argcat=one   two admin=false".to_string()]);

    let (_, lines) = run(&router, "/describe one two").await;
    assert_eq!(lines, vec!["cmd=describe alias=describe argcat=one two admin=false".to_string()]);

    // glued to the word it is no prefix at all
    assert_eq!(run(&router, "botd one").await.0, Dispatch::NotCommand);
}

#[tokio::test]
async fn builtin_commands_accept_the_separated_form() {
    let mut router = roombot::bot::BotServer::build_router(&roombot::config::Config::default());
    router.add_prefix(Prefix::separated("bot"));
    let h = harness();
    let say = Arc::new(BufferSay::new());
    router.dispatch(&h.ctx, alice(), "bot go outside", false, say.clone()).await;
    assert_eq!(say.take().await, vec!["Alice went Outside.".to_string()]);
}

#[tokio::test]
async fn help_spells_out_the_separated_prefix() {
    let mut router = roombot::bot::BotServer::build_router(&roombot::config::Config::default());
    router.add_prefix(Prefix::separated("bot"));
    let h = harness();
    let say = Arc::new(BufferSay::new());
    router.dispatch(&h.ctx, alice(), "bot help", false, say.clone()).await;
    let lines = say.take().await;
    assert_eq!(lines.len(), 1);
    assert!(lines[0].starts_with("Commands: bot help, bot location, bot go"), "{}", lines[0]);
    assert!(!lines[0].contains("bothelp"));

    router.dispatch(&h.ctx, alice(), "/help", false, say.clone()).await;
    assert!(say.take().await[0].starts_with("Commands: /help, /location, /go"));
}

#[tokio::test]
async fn id_reports_the_caller() {
    let h = harness();
    assert_eq!(h.reply(alice(), "/myid").await, format!("Friend Alice: `{}`", alice().id));
}
