//! The "say" output capability handed to every command handler.

use async_trait::async_trait;
use log::info;
use tokio::sync::Mutex;

use crate::logutil::escape_log;

/// Where a handler's textual response goes: the chat room, the console,
/// or a buffer in tests.
#[async_trait]
pub trait Say: Send + Sync {
    async fn say(&self, text: &str);
}

/// Console output: stdout plus an info log line.
pub struct ConsoleSay;

#[async_trait]
impl Say for ConsoleSay {
    async fn say(&self, text: &str) {
        info!("console reply: {}", escape_log(text));
        println!("{}", text);
    }
}

/// Collects everything said, in order.
#[derive(Default)]
pub struct BufferSay {
    lines: Mutex<Vec<String>>,
}

impl BufferSay {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn lines(&self) -> Vec<String> {
        self.lines.lock().await.clone()
    }

    pub async fn take(&self) -> Vec<String> {
        std::mem::take(&mut *self.lines.lock().await)
    }
}

#[async_trait]
impl Say for BufferSay {
    async fn say(&self, text: &str) {
        self.lines.lock().await.push(text.to_string());
    }
}
