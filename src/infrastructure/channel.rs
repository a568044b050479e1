use crate::domain::ports::{EventTransport, MessageStream};
use crate::error::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, broadcast};
use tokio_stream::StreamExt;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;

/// Messages a subscriber may fall behind by before it starts losing them.
pub const DEFAULT_CAPACITY: usize = 1024;

/// An in-process publish/subscribe channel.
///
/// Each named channel is a `tokio::sync::broadcast` channel. Publishing with no
/// live subscriber drops the message, and a subscriber that lags more than
/// `capacity` messages behind loses the oldest ones.
#[derive(Clone)]
pub struct InMemoryChannel {
    capacity: usize,
    topics: Arc<Mutex<HashMap<String, broadcast::Sender<Vec<u8>>>>>,
}

impl Default for InMemoryChannel {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

impl InMemoryChannel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity,
            topics: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    async fn sender(&self, channel: &str) -> broadcast::Sender<Vec<u8>> {
        let mut topics = self.topics.lock().await;
        topics
            .entry(channel.to_string())
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .clone()
    }
}

#[async_trait]
impl EventTransport for InMemoryChannel {
    async fn publish(&self, channel: &str, message: Vec<u8>) -> Result<()> {
        match self.sender(channel).await.send(message) {
            Ok(receivers) => tracing::debug!(channel, receivers, "message published"),
            Err(_) => tracing::debug!(channel, "no active subscribers, message dropped"),
        }
        Ok(())
    }

    async fn subscribe(&self, channel: &str) -> Result<MessageStream> {
        let receiver = self.sender(channel).await.subscribe();
        let name = channel.to_string();
        let stream = BroadcastStream::new(receiver).filter_map(move |item| match item {
            Ok(message) => Some(message),
            Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                tracing::warn!(channel = %name, skipped, "subscriber lagged, messages lost");
                None
            }
        });
        Ok(Box::pin(stream))
    }

    async fn close(&self, channel: &str) -> Result<()> {
        // Dropping the last sender ends every subscription once drained.
        self.topics.lock().await.remove(channel);
        Ok(())
    }
}
