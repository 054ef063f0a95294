//! # Roombot - a chat-room bot with a small persistent world
//!
//! Roombot sits in a real-time chat room and answers prefixed text
//! commands. Behind the commands is a persistent world: named locations
//! connected by travel, objects placed in them, and where every actor
//! currently stands.
//!
//! ## Features
//!
//! - **Command Router**: ordered attached (`/go`) and separated (`bot go`)
//!   prefixes, alias matching, admin gating, and per-handler fault isolation.
//! - **Persistent World**: sled-backed tables seeded from built-in defaults
//!   and reconciled on every read without touching user-made records.
//! - **Navigation**: partition-aware fuzzy destination matching, bans, and
//!   sitting.
//! - **Console**: stdin commands run as a trusted actor; plain lines are
//!   relayed to chat.
//!
//! ## Module Organization
//!
//! - [`router`] - command parsing, registry and dispatch
//! - [`world`] - world model, reconciliation, object registry, navigation
//! - [`store`] - key/value persistence boundary
//! - [`transport`] - chat transport surface
//! - [`bot`] - shared context and the server loop
//! - [`config`] - configuration management
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────┐   ┌─────────────────┐
//! │ Chat Transport  │   │    Console      │ ← inbound text
//! └─────────────────┘   └─────────────────┘
//!          │                    │
//! ┌─────────────────────────────────────────┐
//! │            Command Router               │ ← prefix / alias / admin
//! └─────────────────────────────────────────┘
//!          │
//! ┌─────────────────┐
//! │   World Model   │ ← reconciliation, navigation
//! └─────────────────┘
//!          │
//! ┌─────────────────┐
//! │   KV Store      │ ← sled
//! └─────────────────┘
//! ```

pub mod bot;
pub mod config;
pub mod logutil;
pub mod router;
pub mod store;
pub mod transport;
pub mod world;
