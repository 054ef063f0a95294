//! Prefix and command registries and the dispatch pipeline.
//!
//! Pipeline for one inbound line:
//!
//! 1. normalize into a [`ChatMessage`]
//! 2. drop the line if it is our own echo
//! 3. resolve the prefix (registration order, first match wins)
//! 4. collect every command with an alias equal to the command word
//! 5. resolve the admin flag (trusted source OR admin set)
//! 6. run each match in registration order; admin-only commands refuse
//!    non-admins before their handler runs
//!
//! Each handler runs on its own task. An `Err` or a panic is logged, the
//! caller gets a generic failure line, and the remaining matches still run.

use std::sync::Arc;

use async_trait::async_trait;
use log::{debug, error, trace, warn};
use serde::{Deserialize, Serialize};

use crate::bot::BotContext;
use crate::router::message::ChatMessage;
use crate::router::say::Say;
use crate::transport::Participant;

/// Reply sent when a handler fails.
pub const FAILURE_REPLY: &str = "An error has occurred.";

/// A command prefix. `separated` prefixes are their own word (`bot go
/// home`); attached ones are glued to the command word (`/go home`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prefix {
    pub token: String,
    #[serde(default)]
    pub separated: bool,
}

impl Prefix {
    pub fn attached(token: impl Into<String>) -> Self {
        Self { token: token.into(), separated: false }
    }

    pub fn separated(token: impl Into<String>) -> Self {
        Self { token: token.into(), separated: true }
    }

    /// Command word and consumed token count when `args` uses this prefix.
    fn resolve(&self, args: &[String]) -> Option<(String, usize)> {
        let first = args.first()?;
        if self.separated {
            if *first == self.token {
                return Some((args.get(1).cloned().unwrap_or_default(), 2));
            }
            None
        } else {
            first
                .strip_prefix(self.token.as_str())
                .map(|cmd| (cmd.to_string(), 1))
        }
    }
}

/// Everything a handler gets to work with.
pub struct Invocation {
    pub msg: ChatMessage,
    pub ctx: Arc<BotContext>,
    pub catalog: Arc<[CommandInfo]>,
}

#[async_trait]
pub trait CommandHandler: Send + Sync {
    /// Run the command. A returned string is said on the handler's behalf;
    /// handlers may also call `say` themselves and return `None`.
    async fn run(&self, inv: &Invocation, say: &dyn Say) -> anyhow::Result<Option<String>>;
}

pub struct Command {
    pub id: String,
    pub aliases: Vec<String>,
    pub admin: bool,
    handler: Arc<dyn CommandHandler>,
}

impl Command {
    pub fn new<H>(id: &str, aliases: &[&str], handler: H) -> Self
    where
        H: CommandHandler + 'static,
    {
        Self {
            id: id.to_string(),
            aliases: aliases.iter().map(|a| a.to_string()).collect(),
            admin: false,
            handler: Arc::new(handler),
        }
    }

    pub fn admin_only(mut self) -> Self {
        self.admin = true;
        self
    }

    /// The alias equal to `name`, case-sensitive.
    pub fn matches(&self, name: &str) -> Option<&str> {
        self.aliases.iter().find(|a| a.as_str() == name).map(String::as_str)
    }
}

/// Registry summary of a command, for help listings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandInfo {
    pub id: String,
    pub aliases: Vec<String>,
    pub admin: bool,
}

/// What happened to one inbound line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// Our own message came back; nothing ran.
    Echo,
    /// No prefix matched: plain chat.
    NotCommand,
    /// A prefix matched but no command did.
    Unknown,
    Handled {
        ran: usize,
        refused: usize,
        failed: usize,
    },
}

pub struct CommandRouter {
    prefixes: Vec<Prefix>,
    commands: Vec<Command>,
    catalog: Arc<[CommandInfo]>,
}

impl Default for CommandRouter {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandRouter {
    pub fn new() -> Self {
        Self {
            prefixes: Vec::new(),
            commands: Vec::new(),
            catalog: Arc::from(Vec::new()),
        }
    }

    pub fn add_prefix(&mut self, prefix: Prefix) {
        self.prefixes.push(prefix);
    }

    pub fn add_command(&mut self, command: Command) {
        self.commands.push(command);
        self.catalog = self
            .commands
            .iter()
            .map(|c| CommandInfo {
                id: c.id.clone(),
                aliases: c.aliases.clone(),
                admin: c.admin,
            })
            .collect();
    }

    pub fn prefixes(&self) -> &[Prefix] {
        &self.prefixes
    }

    pub fn catalog(&self) -> Arc<[CommandInfo]> {
        self.catalog.clone()
    }

    /// True when `text` starts with any registered prefix token.
    pub fn is_prefixed(&self, text: &str) -> bool {
        self.prefixes.iter().any(|p| text.starts_with(p.token.as_str()))
    }

    /// Resolve the prefix of `msg` in place. Returns false for plain chat.
    pub fn resolve_prefix(&self, msg: &mut ChatMessage) -> bool {
        for prefix in &self.prefixes {
            if let Some((command, offset)) = prefix.resolve(&msg.args) {
                trace!("prefix '{}' matched, command '{}'", prefix.token, command);
                msg.set_command(prefix.clone(), command, offset);
                return true;
            }
        }
        false
    }

    /// Every command with an alias equal to `name`, in registration order.
    pub fn resolve_commands<'a>(&'a self, name: &str) -> Vec<(&'a Command, &'a str)> {
        self.commands
            .iter()
            .filter_map(|c| c.matches(name).map(|alias| (c, alias)))
            .collect()
    }

    /// Run one inbound line through the whole pipeline.
    pub async fn dispatch(
        &self,
        ctx: &Arc<BotContext>,
        actor: Participant,
        text: &str,
        trusted: bool,
        say: Arc<dyn Say>,
    ) -> Dispatch {
        if ctx.own_id().await.as_deref() == Some(actor.id.as_str()) {
            trace!("ignoring own message");
            return Dispatch::Echo;
        }

        let mut msg = ChatMessage::new(actor, text, trusted);
        if !self.resolve_prefix(&mut msg) {
            return Dispatch::NotCommand;
        }
        let name = msg.command.clone().unwrap_or_default();
        let matched = self.resolve_commands(&name);
        if matched.is_empty() {
            debug!("no command '{}' for {}", name, msg.actor.id);
            return Dispatch::Unknown;
        }

        msg.admin = trusted
            || match ctx.world.is_admin(&msg.actor.id).await {
                Ok(is_admin) => is_admin,
                Err(e) => {
                    warn!("admin lookup for {} failed: {}", msg.actor.id, e);
                    false
                }
            };

        let (mut ran, mut refused, mut failed) = (0, 0, 0);
        for (command, alias) in matched {
            if command.admin && !msg.admin {
                debug!("refused admin command '{}' for {}", command.id, msg.actor.id);
                say.say(&format!(
                    "Friend {}, `{}` is for admins only.",
                    msg.actor.name, alias
                ))
                .await;
                refused += 1;
                continue;
            }

            let mut inv_msg = msg.clone();
            inv_msg.used_alias = Some(alias.to_string());
            let inv = Invocation {
                msg: inv_msg,
                ctx: ctx.clone(),
                catalog: self.catalog(),
            };
            let handler = command.handler.clone();
            let task_say = say.clone();
            debug!("running '{}' for {}", command.id, msg.actor.id);
            let outcome =
                tokio::spawn(async move { handler.run(&inv, task_say.as_ref()).await }).await;

            match outcome {
                Ok(Ok(Some(reply))) => {
                    say.say(&reply).await;
                    ran += 1;
                }
                Ok(Ok(None)) => ran += 1,
                Ok(Err(e)) => {
                    error!("command '{}' failed: {:#}", command.id, e);
                    say.say(FAILURE_REPLY).await;
                    failed += 1;
                }
                Err(e) => {
                    error!("command '{}' aborted: {}", command.id, e);
                    say.say(FAILURE_REPLY).await;
                    failed += 1;
                }
            }
        }

        Dispatch::Handled { ran, refused, failed }
    }
}
