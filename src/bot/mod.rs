//! # Bot Runtime
//!
//! - [`context`] - [`BotContext`], the one shared state object (world,
//!   transport, own identity, shutdown signal) handed to every handler
//! - [`server`] - [`BotServer`], the event loop over transport events,
//!   console input and shutdown
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use roombot::bot::BotServer;
//! use roombot::config::Config;
//! use roombot::store::SledStore;
//! use roombot::transport::{LocalTransport, Participant};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config.toml").await?;
//!     let store = Arc::new(SledStore::open(&config.storage.data_dir)?);
//!     let transport = Arc::new(LocalTransport::new(Participant::new("bot", "Bot", "#000")));
//!     let mut server = BotServer::new(config, store, transport);
//!     server.run().await
//! }
//! ```

pub mod context;
pub mod server;

pub use context::BotContext;
pub use server::{BotServer, CONSOLE_ACTOR_ID};
