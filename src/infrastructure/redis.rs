use crate::domain::ports::{EventTransport, MessageStream};
use crate::error::Result;
use async_trait::async_trait;
use redis::AsyncCommands;
use redis::aio::MultiplexedConnection;
use tokio::sync::OnceCell;
use tokio_stream::StreamExt;

/// Redis pub/sub transport.
///
/// Redis keeps no history for pub/sub channels, so this has the same
/// at-most-once semantics as the in-process channel.
pub struct RedisTransport {
    client: redis::Client,
    publisher: OnceCell<MultiplexedConnection>,
}

impl RedisTransport {
    pub fn open(url: &str) -> Result<Self> {
        Ok(Self {
            client: redis::Client::open(url)?,
            publisher: OnceCell::new(),
        })
    }

    async fn publisher(&self) -> Result<MultiplexedConnection> {
        let conn = self
            .publisher
            .get_or_try_init(|| self.client.get_multiplexed_tokio_connection())
            .await?;
        Ok(conn.clone())
    }
}

#[async_trait]
impl EventTransport for RedisTransport {
    async fn publish(&self, channel: &str, message: Vec<u8>) -> Result<()> {
        let mut conn = self.publisher().await?;
        let receivers: i64 = conn.publish(channel, message).await?;
        tracing::debug!(channel, receivers, "message published");
        Ok(())
    }

    async fn subscribe(&self, channel: &str) -> Result<MessageStream> {
        let mut pubsub = self.client.get_async_connection().await?.into_pubsub();
        pubsub.subscribe(channel).await?;
        let name = channel.to_string();
        let stream = pubsub
            .into_on_message()
            .filter_map(move |msg| match msg.get_payload::<Vec<u8>>() {
                Ok(payload) => Some(payload),
                Err(e) => {
                    tracing::warn!(channel = %name, error = %e, "unreadable redis message");
                    None
                }
            });
        Ok(Box::pin(stream))
    }
}
