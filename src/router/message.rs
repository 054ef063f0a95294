//! Inbound text normalization.
//!
//! A [`ChatMessage`] keeps the raw text, its whitespace-split tokens and
//! everything prefix resolution later learns about it (which prefix, which
//! command word, how many leading tokens belong to the invocation).

use crate::router::registry::Prefix;
use crate::transport::Participant;

/// Remainder of `text` after its first `n` whitespace-separated tokens,
/// trimmed. Internal whitespace is preserved.
pub fn tail_after(text: &str, n: usize) -> &str {
    let mut rest = text.trim_start();
    for _ in 0..n {
        let end = rest.find(char::is_whitespace).unwrap_or(rest.len());
        rest = rest[end..].trim_start();
    }
    rest.trim_end()
}

#[derive(Debug, Clone)]
pub struct ChatMessage {
    pub actor: Participant,
    pub text: String,
    /// Whitespace-split tokens of `text`.
    pub args: Vec<String>,
    /// Text after the first token, trimmed. Recomputed after prefix
    /// resolution to start after the command word.
    pub argcat: String,
    /// The source vouches for this caller (console).
    pub trusted: bool,
    /// trusted OR in the admin set. Resolved at dispatch.
    pub admin: bool,
    pub prefix: Option<Prefix>,
    pub command: Option<String>,
    pub used_alias: Option<String>,
    /// Number of leading tokens consumed by prefix + command word.
    offset: usize,
}

impl ChatMessage {
    pub fn new(actor: Participant, text: impl Into<String>, trusted: bool) -> Self {
        let text = text.into();
        let args = text.split_whitespace().map(str::to_string).collect();
        let argcat = tail_after(&text, 1).to_string();
        Self {
            actor,
            text,
            args,
            argcat,
            trusted,
            admin: trusted,
            prefix: None,
            command: None,
            used_alias: None,
            offset: 1,
        }
    }

    /// Record the resolved prefix and command word. `offset` is how many
    /// leading tokens the invocation used.
    pub(crate) fn set_command(&mut self, prefix: Prefix, command: String, offset: usize) {
        self.prefix = Some(prefix);
        self.command = Some(command);
        self.offset = offset;
        self.argcat = tail_after(&self.text, offset).to_string();
    }

    /// Parameters after the command word.
    pub fn params(&self) -> &[String] {
        self.args.get(self.offset..).unwrap_or_default()
    }

    /// The `n`th parameter (0-based) after the command word.
    pub fn param(&self, n: usize) -> Option<&str> {
        self.params().get(n).map(String::as_str)
    }

    /// Text after the first `n` parameters, trimmed.
    pub fn rest(&self, n: usize) -> &str {
        tail_after(&self.text, self.offset + n)
    }

    /// The prefix token used, or "" when none matched.
    pub fn prefix_token(&self) -> &str {
        self.prefix.as_ref().map(|p| p.token.as_str()).unwrap_or("")
    }
}
