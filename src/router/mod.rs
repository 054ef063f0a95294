//! # Command Router
//!
//! Turns free-text chat and console input into command invocations.
//!
//! - [`message`] - normalization of inbound text into a [`ChatMessage`]
//! - [`registry`] - prefixes, commands, authorization and dispatch
//! - [`commands`] - the built-in command set
//! - [`say`] - the output capability handlers respond through
//!
//! ## Matching rules
//!
//! ```text
//! /go outside        attached prefix "/"   -> command "go", tail "outside"
//! bot go outside     separated prefix "bot" -> command "go", tail "outside"
//! hello there        no prefix             -> plain chat, nothing runs
//! ```
//!
//! Prefixes are tried in registration order and the first match wins.
//! Commands match on exact, case-sensitive alias equality, and every
//! matching command runs.

pub mod commands;
pub mod message;
pub mod registry;
pub mod say;

pub use message::ChatMessage;
pub use registry::{
    Command, CommandHandler, CommandInfo, CommandRouter, Dispatch, Invocation, Prefix,
    FAILURE_REPLY,
};
pub use say::{BufferSay, ConsoleSay, Say};
