//! The subscriber registry: one delivery channel per subscribed key.
//!
//! A single mutex guards the whole map. Registration, lookup, and removal
//! are each atomic with respect to it. The forward send also happens under
//! the lock, so a stalled subscriber backs up the publish path for
//! everyone; accepted at this scale.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};
use tracing::debug;

use crate::error::ServerError;

/// Queue depth for one subscriber's delivery channel
const SUBSCRIBER_DEPTH: usize = 64;

#[derive(Clone, Default)]
pub struct Registry {
    subscribers: Arc<Mutex<HashMap<String, mpsc::Sender<Vec<u8>>>>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a delivery channel for `key`, replacing any previous one,
    /// and hand back its receiving end.
    pub async fn subscribe(&self, key: &str) -> mpsc::Receiver<Vec<u8>> {
        let (tx, rx) = mpsc::channel(SUBSCRIBER_DEPTH);
        let mut subscribers = self.subscribers.lock().await;
        subscribers.insert(key.to_string(), tx);
        debug!(subscribers = subscribers.len(), "registered subscriber");
        rx
    }

    pub async fn unsubscribe(&self, key: &str) {
        let mut subscribers = self.subscribers.lock().await;
        subscribers.remove(key);
        debug!(subscribers = subscribers.len(), "removed subscriber");
    }

    /// Push `payload` onto the channel registered for `key`. A key with no
    /// live subscriber is a delivery failure the publisher hears about.
    pub async fn forward(&self, key: &str, payload: Vec<u8>) -> Result<(), ServerError> {
        let subscribers = self.subscribers.lock().await;
        let Some(tx) = subscribers.get(key) else {
            return Err(ServerError::NotSubscribed(key.to_string()));
        };
        tx.send(payload)
            .await
            .map_err(|_| ServerError::NotSubscribed(key.to_string()))
    }
}
