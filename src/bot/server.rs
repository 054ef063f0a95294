//! Bot server: joins the chat transport, the console and the shutdown
//! signal into one event loop.
//!
//! Each inbound chat action or console command is dispatched on its own
//! task, so a slow handler never holds up the loop. Store and transport
//! calls are the only suspension points inside a dispatch.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use log::{debug, info, warn};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::bot::context::BotContext;
use crate::config::Config;
use crate::logutil::{chat_line, escape_log};
use crate::router::commands::register_builtin;
use crate::router::{CommandRouter, ConsoleSay, Dispatch, Say};
use crate::store::KvStore;
use crate::transport::{ChatSay, ChatTransport, Participant, TransportEvent};
use crate::world::TableKind;

/// Actor id used for console input.
pub const CONSOLE_ACTOR_ID: &str = "console";

/// How long `run` waits for in-flight dispatches after the loop ends.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

pub struct BotServer {
    config: Config,
    ctx: Arc<BotContext>,
    router: Arc<CommandRouter>,
    chat_say: Arc<dyn Say>,
    in_channel: bool,
}

impl BotServer {
    pub fn new(config: Config, store: Arc<dyn KvStore>, transport: Arc<dyn ChatTransport>) -> Self {
        let ctx = Arc::new(BotContext::new(
            store,
            transport.clone(),
            &config.world.default_location,
        ));
        let router = Arc::new(Self::build_router(&config));
        Self {
            config,
            ctx,
            router,
            chat_say: Arc::new(ChatSay::new(transport)),
            in_channel: false,
        }
    }

    /// Router with the configured prefixes and every built-in command.
    pub fn build_router(config: &Config) -> CommandRouter {
        let mut router = CommandRouter::new();
        for prefix in &config.commands.prefixes {
            router.add_prefix(prefix.clone());
        }
        register_builtin(&mut router);
        router
    }

    pub fn context(&self) -> &Arc<BotContext> {
        &self.ctx
    }

    pub fn router(&self) -> &Arc<CommandRouter> {
        &self.router
    }

    /// Whether the last channel joined is the configured one.
    pub fn in_channel(&self) -> bool {
        self.in_channel
    }

    /// Connect, join the configured channel and make sure both world
    /// tables exist.
    pub async fn start(&mut self) -> Result<mpsc::UnboundedReceiver<TransportEvent>> {
        let transport = &self.ctx.transport;
        let events = transport.connect().await?;
        if let Err(e) = transport.join_channel(&self.config.bot.channel).await {
            warn!("Could not join channel {}: {}", self.config.bot.channel, e);
        }
        for kind in [TableKind::Locations, TableKind::Objects] {
            let table = self.ctx.world.get_table(kind).await?;
            debug!("{} table ready with {} record(s)", kind.entity(), table.len());
        }
        Ok(events)
    }

    pub async fn run(&mut self) -> Result<()> {
        info!("Bot '{}' starting", self.config.bot.name);
        let mut events = self.start().await?;
        let mut shutdown = self.ctx.subscribe_shutdown();

        let (console_tx, mut console_rx) = mpsc::unbounded_channel::<String>();
        if self.config.bot.console {
            spawn_console_reader(console_tx.clone());
        }

        let mut inflight: Vec<JoinHandle<Dispatch>> = Vec::new();
        loop {
            tokio::select! {
                event = events.recv() => {
                    match event {
                        Some(event) => {
                            if let Some(handle) = self.handle_event(event).await {
                                inflight.push(handle);
                            }
                        }
                        None => {
                            warn!("Transport event stream closed");
                            break;
                        }
                    }
                }

                Some(line) = console_rx.recv() => {
                    if let Some(handle) = self.handle_console_line(&line).await {
                        inflight.push(handle);
                    }
                }

                _ = shutdown.changed() => {
                    info!("Shutdown requested");
                    break;
                }

                _ = tokio::signal::ctrl_c() => {
                    info!("Received shutdown signal");
                    break;
                }
            }
            inflight.retain(|h| !h.is_finished());
        }

        drain(inflight).await;
        drop(console_tx);
        Ok(())
    }

    /// React to one transport event. Chat actions are dispatched on a new
    /// task whose handle is returned.
    pub async fn handle_event(&mut self, event: TransportEvent) -> Option<JoinHandle<Dispatch>> {
        match event {
            TransportEvent::IdentityAnnounce(own) => {
                self.enforce_profile(own).await;
                None
            }
            TransportEvent::OwnIdentityUpdate => {
                self.enforce_profile(None).await;
                None
            }
            TransportEvent::ChannelJoined { channel } => {
                self.in_channel = channel == self.config.bot.channel;
                info!("Connected to {}", channel);
                if !self.in_channel {
                    warn!("Joined {} but configured channel is {}", channel, self.config.bot.channel);
                }
                None
            }
            TransportEvent::ChatAction { actor, text } => {
                info!("{}", chat_line(&actor, &text));
                let ctx = self.ctx.clone();
                let router = self.router.clone();
                let say = self.chat_say.clone();
                Some(tokio::spawn(async move {
                    router.dispatch(&ctx, actor, &text, false, say).await
                }))
            }
            TransportEvent::Fault(reason) => {
                warn!("Issues connecting to the chat server, hopefully not a server outage: {}", reason);
                None
            }
        }
    }

    /// Console input: prefixed lines run as the trusted console actor,
    /// anything else is relayed to chat verbatim.
    pub async fn handle_console_line(&self, line: &str) -> Option<JoinHandle<Dispatch>> {
        let line = line.trim_end_matches(&['\r', '\n'][..]).replace('\n', " ");
        if line.trim().is_empty() {
            return None;
        }
        if !self.router.is_prefixed(&line) {
            debug!("console relay: {}", escape_log(&line));
            self.chat_say.say(&line).await;
            return None;
        }

        let actor = Participant::new(CONSOLE_ACTOR_ID, "Console", self.config.bot.color.clone());
        let ctx = self.ctx.clone();
        let router = self.router.clone();
        let say: Arc<dyn Say> = Arc::new(ConsoleSay);
        Some(tokio::spawn(async move {
            router.dispatch(&ctx, actor, &line, true, say).await
        }))
    }

    /// Remember our own id and put the configured name and colour back if
    /// the room shows something else.
    async fn enforce_profile(&self, announced: Option<Participant>) {
        let transport = &self.ctx.transport;
        let Some(own) = announced.or(transport.own_identity().await) else {
            debug!("Own identity not known yet");
            return;
        };
        self.ctx.set_own_id(own.id.clone()).await;

        let wanted = &self.config.bot;
        if own.name != wanted.name || own.color != wanted.color {
            info!("Resetting profile to '{}' {}", wanted.name, wanted.color);
            if let Err(e) = transport.set_own_profile(&wanted.name, &wanted.color).await {
                warn!("Profile update failed: {}", e);
            }
        }
    }
}

/// Wait for dispatches still running so their store writes complete.
async fn drain(inflight: Vec<JoinHandle<Dispatch>>) {
    let pending: Vec<_> = inflight.into_iter().filter(|h| !h.is_finished()).collect();
    if pending.is_empty() {
        return;
    }
    debug!("Waiting for {} in-flight command(s)", pending.len());
    let wait = async {
        for handle in pending {
            if let Err(e) = handle.await {
                warn!("In-flight command aborted: {}", e);
            }
        }
    };
    if tokio::time::timeout(DRAIN_TIMEOUT, wait).await.is_err() {
        warn!("In-flight commands still running after {:?}; stopping anyway", DRAIN_TIMEOUT);
    }
}

fn spawn_console_reader(tx: mpsc::UnboundedSender<String>) {
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    if tx.send(line).is_err() {
                        break;
                    }
                }
                Ok(None) => {
                    debug!("Console input closed");
                    break;
                }
                Err(e) => {
                    warn!("Console read failed: {}", e);
                    break;
                }
            }
        }
    });
}
