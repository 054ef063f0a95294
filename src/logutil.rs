//! Single-line log rendering of chat traffic.
//!
//! Chat text is user controlled, so everything that reaches a log line goes
//! through [`Preview`]: control characters are escaped, the invisible
//! outbound marker other bots prepend is dropped, and the whole line shares
//! one length budget.

use std::fmt::Write;

use crate::transport::{Participant, OUTBOUND_MARKER};

const MAX_PREVIEW: usize = 300;

/// First six characters of a participant id, enough to tell people apart
/// in logs and listings.
pub fn short_id(id: &str) -> &str {
    match id.char_indices().nth(6) {
        Some((end, _)) => &id[..end],
        None => id,
    }
}

/// Escaping writer with a character budget shared by every push.
struct Preview {
    out: String,
    left: usize,
    cut: bool,
}

impl Preview {
    fn new(budget: usize) -> Self {
        Self { out: String::with_capacity(budget.min(64) + 8), left: budget, cut: false }
    }

    fn raw(&mut self, s: &str) -> &mut Self {
        self.out.push_str(s);
        self
    }

    fn text(&mut self, s: &str) -> &mut Self {
        for ch in s.chars().filter(|c| *c != OUTBOUND_MARKER) {
            if self.left == 0 {
                self.cut = true;
                break;
            }
            self.left -= 1;
            match ch {
                '\\' => self.out.push_str("\\\\"),
                '\n' => self.out.push_str("\\n"),
                '\r' => self.out.push_str("\\r"),
                '\t' => self.out.push_str("\\t"),
                c if c.is_control() => {
                    let _ = write!(self.out, "\\x{:02X}", c as u32);
                }
                c => self.out.push(c),
            }
        }
        self
    }

    fn finish(&mut self) -> String {
        if self.cut {
            self.out.push('…');
        }
        std::mem::take(&mut self.out)
    }
}

/// `s` escaped onto one line and capped at [`MAX_PREVIEW`] characters.
pub fn escape_log(s: &str) -> String {
    Preview::new(MAX_PREVIEW).text(s).finish()
}

/// `abc123 Alice: text` for the chat log. Name and text share the cap.
pub fn chat_line(actor: &Participant, text: &str) -> String {
    Preview::new(MAX_PREVIEW)
        .raw(short_id(&actor.id))
        .raw(" ")
        .text(&actor.name)
        .raw(": ")
        .text(text)
        .finish()
}
