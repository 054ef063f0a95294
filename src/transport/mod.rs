//! # Chat Transport Surface
//!
//! The bot consumes a real-time chat room through the narrow
//! [`ChatTransport`] trait: a stream of [`TransportEvent`]s plus a handful
//! of outbound calls. Connection lifecycle, handshakes and reconnection
//! belong to the implementation behind the trait.
//!
//! [`LocalTransport`] is an in-process implementation. It records every
//! outbound chat action and lets callers inject inbound events, which is
//! what the tests drive and what the binary runs on when it is only
//! reachable from its console.

use std::sync::Arc;

use async_trait::async_trait;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::{mpsc, Mutex};

use crate::router::say::Say;

/// Invisible marker put in front of everything the bot says in chat so
/// other bots do not mistake it for a command.
pub const OUTBOUND_MARKER: char = '\u{034f}';

/// A chat participant, human or bot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub color: String,
}

impl Participant {
    pub fn new(id: impl Into<String>, name: impl Into<String>, color: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            color: color.into(),
        }
    }
}

/// Inbound events a transport emits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// Handshake completed; carries our own participant when known.
    IdentityAnnounce(Option<Participant>),
    /// Our own participant record may have changed.
    OwnIdentityUpdate,
    ChannelJoined { channel: String },
    ChatAction { actor: Participant, text: String },
    /// Connection-level trouble. Never fatal.
    Fault(String),
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("transport not connected")]
    NotConnected,
    #[error("transport closed")]
    Closed,
    #[error("send failed: {0}")]
    Send(String),
}

#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Start the connection and hand back the inbound event stream.
    async fn connect(&self) -> Result<mpsc::UnboundedReceiver<TransportEvent>, TransportError>;
    async fn join_channel(&self, name: &str) -> Result<(), TransportError>;
    async fn send_chat_action(&self, text: &str) -> Result<(), TransportError>;
    async fn set_own_profile(&self, name: &str, color: &str) -> Result<(), TransportError>;
    async fn own_identity(&self) -> Option<Participant>;
    async fn participants(&self) -> Vec<Participant>;
}

/// [`Say`] into the chat room. Send failures are logged and dropped.
pub struct ChatSay {
    transport: Arc<dyn ChatTransport>,
}

impl ChatSay {
    pub fn new(transport: Arc<dyn ChatTransport>) -> Self {
        Self { transport }
    }
}

#[async_trait]
impl Say for ChatSay {
    async fn say(&self, text: &str) {
        let line = format!("{}{}", OUTBOUND_MARKER, text);
        if let Err(e) = self.transport.send_chat_action(&line).await {
            warn!("chat send failed: {}", e);
        }
    }
}

#[derive(Default)]
struct LocalState {
    events: Option<mpsc::UnboundedSender<TransportEvent>>,
    own: Option<Participant>,
    channel: Option<String>,
    participants: Vec<Participant>,
    sent: Vec<String>,
}

/// In-process transport. Outbound chat is kept in memory and, when
/// `echo` is set, printed to stdout.
pub struct LocalTransport {
    state: Mutex<LocalState>,
    identity: Participant,
    echo: bool,
}

impl LocalTransport {
    pub fn new(identity: Participant) -> Self {
        Self {
            state: Mutex::new(LocalState::default()),
            identity,
            echo: false,
        }
    }

    /// Print outbound chat to stdout as well.
    pub fn with_echo(mut self) -> Self {
        self.echo = true;
        self
    }

    /// Feed an inbound event. Fails when nobody is connected.
    pub async fn inject(&self, event: TransportEvent) -> Result<(), TransportError> {
        let state = self.state.lock().await;
        let tx = state.events.as_ref().ok_or(TransportError::NotConnected)?;
        tx.send(event).map_err(|_| TransportError::Closed)
    }

    pub async fn add_participant(&self, participant: Participant) {
        let mut state = self.state.lock().await;
        state.participants.retain(|p| p.id != participant.id);
        state.participants.push(participant);
    }

    /// Everything sent so far, markers included.
    pub async fn sent(&self) -> Vec<String> {
        self.state.lock().await.sent.clone()
    }

    pub async fn channel(&self) -> Option<String> {
        self.state.lock().await.channel.clone()
    }
}

#[async_trait]
impl ChatTransport for LocalTransport {
    async fn connect(&self) -> Result<mpsc::UnboundedReceiver<TransportEvent>, TransportError> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut state = self.state.lock().await;
        let own = state.own.get_or_insert_with(|| self.identity.clone()).clone();
        let _ = tx.send(TransportEvent::IdentityAnnounce(Some(own.clone())));
        state.participants.retain(|p| p.id != own.id);
        state.participants.push(own);
        state.events = Some(tx);
        info!("local transport connected as {}", self.identity.id);
        Ok(rx)
    }

    async fn join_channel(&self, name: &str) -> Result<(), TransportError> {
        let mut state = self.state.lock().await;
        let tx = state.events.clone().ok_or(TransportError::NotConnected)?;
        state.channel = Some(name.to_string());
        tx.send(TransportEvent::ChannelJoined { channel: name.to_string() })
            .map_err(|_| TransportError::Closed)
    }

    async fn send_chat_action(&self, text: &str) -> Result<(), TransportError> {
        let mut state = self.state.lock().await;
        if state.events.is_none() {
            return Err(TransportError::NotConnected);
        }
        if self.echo {
            println!("{}", text.trim_start_matches(OUTBOUND_MARKER));
        }
        state.sent.push(text.to_string());
        Ok(())
    }

    async fn set_own_profile(&self, name: &str, color: &str) -> Result<(), TransportError> {
        let mut state = self.state.lock().await;
        let own = state.own.get_or_insert_with(|| self.identity.clone());
        own.name = name.to_string();
        own.color = color.to_string();
        let updated = own.clone();
        if let Some(p) = state.participants.iter_mut().find(|p| p.id == updated.id) {
            *p = updated;
        }
        debug!("local transport profile set to '{}' {}", name, color);
        if let Some(tx) = &state.events {
            let _ = tx.send(TransportEvent::OwnIdentityUpdate);
        }
        Ok(())
    }

    async fn own_identity(&self) -> Option<Participant> {
        self.state.lock().await.own.clone()
    }

    async fn participants(&self) -> Vec<Participant> {
        self.state.lock().await.participants.clone()
    }
}
