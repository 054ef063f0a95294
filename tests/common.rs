//! Test utilities & fixtures.
//! Builds a bot context over an in-memory (or caller-supplied) store and a
//! local transport, plus a router with the default prefixes and commands.

#![allow(dead_code)] // each test binary uses a different subset

use std::sync::Arc;

use roombot::bot::{BotContext, BotServer};
use roombot::config::Config;
use roombot::router::{BufferSay, CommandRouter, Dispatch};
use roombot::store::{KvStore, MemoryStore};
use roombot::transport::{LocalTransport, Participant};

pub const BOT_ID: &str = "bot000";

pub struct Harness {
    pub ctx: Arc<BotContext>,
    pub router: CommandRouter,
    pub transport: Arc<LocalTransport>,
}

pub fn harness() -> Harness {
    harness_with_store(Arc::new(MemoryStore::new()))
}

pub fn harness_with_store(store: Arc<dyn KvStore>) -> Harness {
    let transport = Arc::new(LocalTransport::new(bot_identity()));
    let ctx = Arc::new(BotContext::new(store, transport.clone(), "home"));
    let router = BotServer::build_router(&Config::default());
    Harness { ctx, router, transport }
}

pub fn bot_identity() -> Participant {
    Participant::new(BOT_ID, "Paint Watching Club", "#8d3f50")
}

pub fn alice() -> Participant {
    Participant::new("alice0123456789", "Alice", "#ff0000")
}

pub fn bob() -> Participant {
    Participant::new("bob0123456789", "Bob", "#0000ff")
}

impl Harness {
    /// Dispatch `text` from `actor` and collect every reply.
    pub async fn send(&self, actor: Participant, text: &str) -> (Dispatch, Vec<String>) {
        self.send_as(actor, text, false).await
    }

    pub async fn send_as(&self, actor: Participant, text: &str, trusted: bool) -> (Dispatch, Vec<String>) {
        let say = Arc::new(BufferSay::new());
        let outcome = self
            .router
            .dispatch(&self.ctx, actor, text, trusted, say.clone())
            .await;
        (outcome, say.lines().await)
    }

    /// Single reply helper; panics when the command said anything else.
    pub async fn reply(&self, actor: Participant, text: &str) -> String {
        let (_, lines) = self.send(actor, text).await;
        assert_eq!(lines.len(), 1, "expected one reply to {text:?}, got {lines:?}");
        lines.into_iter().next().unwrap()
    }
}
