use std::sync::Arc;

use tokio::sync::{watch, RwLock};

use crate::store::KvStore;
use crate::transport::ChatTransport;
use crate::world::WorldModel;

/// Process-wide state shared by the server loop and every handler.
pub struct BotContext {
    pub world: WorldModel,
    pub transport: Arc<dyn ChatTransport>,
    own_id: RwLock<Option<String>>,
    shutdown: watch::Sender<bool>,
}

impl BotContext {
    pub fn new(
        store: Arc<dyn KvStore>,
        transport: Arc<dyn ChatTransport>,
        default_location: &str,
    ) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            world: WorldModel::with_default_location(store, default_location),
            transport,
            own_id: RwLock::new(None),
            shutdown,
        }
    }

    /// Our participant id on the chat transport, once known.
    pub async fn own_id(&self) -> Option<String> {
        self.own_id.read().await.clone()
    }

    pub async fn set_own_id(&self, id: impl Into<String>) {
        *self.own_id.write().await = Some(id.into());
    }

    /// Ask the server loop to stop.
    pub fn request_shutdown(&self) {
        self.shutdown.send_replace(true);
    }

    pub fn shutdown_requested(&self) -> bool {
        *self.shutdown.borrow()
    }

    pub fn subscribe_shutdown(&self) -> watch::Receiver<bool> {
        self.shutdown.subscribe()
    }
}
