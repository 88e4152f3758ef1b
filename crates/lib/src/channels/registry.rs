//! Channel registry: register and lookup channels by id.

use crate::channels::ChannelError;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Handle to a running channel (stop, send message).
#[async_trait]
pub trait ChannelHandle: Send + Sync {
    /// Channel id (e.g. "telegram").
    fn id(&self) -> &str;
    /// Stop the channel connector.
    fn stop(&self);
    /// Send a text message to a conversation (e.g. Telegram chat_id). Default returns error.
    async fn send_message(&self, _conversation_id: &str, _text: &str) -> Result<(), ChannelError> {
        Err(ChannelError::Unsupported(self.id().to_string()))
    }
}

/// Registry of channel ids to handles. Shared across gateway.
pub struct ChannelRegistry {
    inner: Arc<RwLock<HashMap<String, Arc<dyn ChannelHandle>>>>,
}

impl Default for ChannelRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ChannelRegistry {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Register a handle; a previous handle under the same id is stopped.
    pub async fn register(&self, id: String, handle: Arc<dyn ChannelHandle>) {
        let mut g = self.inner.write().await;
        if let Some(old) = g.insert(id.clone(), handle) {
            log::info!("channel {} re-registered, stopping previous connector", id);
            old.stop();
        }
    }

    pub async fn get(&self, id: &str) -> Option<Arc<dyn ChannelHandle>> {
        let g = self.inner.read().await;
        g.get(id).cloned()
    }

    pub async fn ids(&self) -> Vec<String> {
        let g = self.inner.read().await;
        let mut ids: Vec<String> = g.keys().cloned().collect();
        ids.sort();
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    struct Dummy {
        id: String,
        stopped: AtomicBool,
    }

    impl Dummy {
        fn new(id: &str) -> Arc<Self> {
            Arc::new(Self {
                id: id.to_string(),
                stopped: AtomicBool::new(false),
            })
        }
    }

    #[async_trait]
    impl ChannelHandle for Dummy {
        fn id(&self) -> &str {
            &self.id
        }

        fn stop(&self) {
            self.stopped.store(true, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn register_replaces_and_stops_old_handle() {
        let registry = ChannelRegistry::new();
        let first = Dummy::new("telegram");
        let second = Dummy::new("telegram");
        registry.register("telegram".into(), first.clone()).await;
        registry.register("telegram".into(), second.clone()).await;
        assert!(first.stopped.load(Ordering::SeqCst));
        assert!(!second.stopped.load(Ordering::SeqCst));
        assert_eq!(registry.ids().await, vec!["telegram".to_string()]);
    }

    #[tokio::test]
    async fn default_send_is_unsupported() {
        let d = Dummy::new("x");
        let err = d.send_message("1", "hi").await.unwrap_err();
        assert!(matches!(err, ChannelError::Unsupported(ref id) if id == "x"));
    }
}
