//! Typed queue proxy.

use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fmt;
use std::marker::PhantomData;
use std::time::Duration;
use tracing::debug;

use crate::backend::QueueMessage;
use crate::binding::{Binding, ProxyState, QueueResource, short_type_name};
use crate::{Result, StorageEnvironment, codec};

/// A decoded message together with the envelope needed to complete it.
#[derive(Debug, Clone, PartialEq)]
pub struct Delivery<M> {
    /// Decoded payload.
    pub message: M,
    /// Service envelope.
    pub envelope: QueueMessage,
}

/// Typed access to one queue.
pub struct QueueProxy<M> {
    binding: Binding<QueueResource>,
    _message: PhantomData<fn() -> M>,
}

impl<M> QueueProxy<M>
where
    M: Serialize + DeserializeOwned,
{
    /// Create a proxy whose queue is named after the message type.
    pub fn new(environment: StorageEnvironment) -> Result<Self> {
        Ok(Self {
            binding: Binding::new(environment, short_type_name::<M>())?,
            _message: PhantomData,
        })
    }

    /// Use a different queue name.
    pub fn with_queue_name(mut self, name: &str) -> Result<Self> {
        self.set_queue_name(name)?;
        Ok(self)
    }

    /// Set the connection name.
    pub fn with_connection_name(mut self, name: impl Into<String>) -> Self {
        self.set_connection_name(name);
        self
    }

    /// Canonical queue name.
    pub fn queue_name(&self) -> &str {
        self.binding.resource_name()
    }

    /// Change the queue name. Drops the cached client.
    pub fn set_queue_name(&mut self, name: &str) -> Result<()> {
        self.binding.set_resource_name(name)
    }

    /// Configured connection name.
    pub fn connection_name(&self) -> Option<&str> {
        self.binding.connection_name()
    }

    /// Change the connection name. Drops the cached client.
    pub fn set_connection_name(&mut self, name: impl Into<String>) {
        self.binding.set_connection_name(Some(name.into()));
    }

    /// Remove the connection name.
    pub fn clear_connection_name(&mut self) {
        self.binding.set_connection_name(None);
    }

    /// Client state.
    pub fn state(&self) -> ProxyState {
        self.binding.state()
    }

    /// Encode and append a message.
    pub async fn enqueue(&self, message: &M) -> Result<QueueMessage> {
        self.binding.ensure_configured()?;
        let body = codec::encode(message)?;

        let queue = self.binding.handle().await?;
        let envelope = queue.put_message(body).await?;
        debug!(id = %envelope.id, queue = %self.queue_name(), "Enqueued message");
        Ok(envelope)
    }

    /// Decode a raw message body. Needs no connection.
    pub fn decode(&self, raw: &str) -> Result<M> {
        codec::decode(raw)
    }

    /// Take the next visible message, hiding it for `visibility`.
    ///
    /// The message reappears after the timeout unless it is passed to
    /// [`complete`](Self::complete). A message that fails to decode is left
    /// on the queue and the error is returned.
    pub async fn dequeue(&self, visibility: Duration) -> Result<Option<Delivery<M>>> {
        self.binding.ensure_configured()?;
        let queue = self.binding.handle().await?;
        let Some(envelope) = queue.get_message(visibility).await? else {
            return Ok(None);
        };
        debug!(
            id = %envelope.id,
            queue = %self.queue_name(),
            attempt = envelope.dequeue_count,
            "Dequeued message"
        );
        let message = self.decode(&envelope.body)?;
        Ok(Some(Delivery { message, envelope }))
    }

    /// Decode the next visible message without hiding it.
    pub async fn peek(&self) -> Result<Option<M>> {
        self.binding.ensure_configured()?;
        let queue = self.binding.handle().await?;
        match queue.peek_message().await? {
            Some(envelope) => Ok(Some(self.decode(&envelope.body)?)),
            None => Ok(None),
        }
    }

    /// Delete a dequeued message.
    pub async fn complete(&self, delivery: &Delivery<M>) -> Result<()> {
        self.binding.ensure_configured()?;
        let queue = self.binding.handle().await?;
        queue
            .delete_message(&delivery.envelope.id, &delivery.envelope.pop_receipt)
            .await
    }

    /// Number of messages on the queue, visible or not.
    pub async fn approximate_len(&self) -> Result<usize> {
        self.binding.ensure_configured()?;
        let queue = self.binding.handle().await?;
        queue.approximate_len().await
    }
}

impl<M> fmt::Debug for QueueProxy<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueueProxy")
            .field("queue", &self.binding.resource_name())
            .field("connection", &self.binding.connection_name())
            .field("state", &self.binding.state())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryAccountFactory;
    use serde::Deserialize;
    use stowage_config::ConfigManager;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct ThumbnailRequest {
        blob: String,
        width: u32,
    }

    fn request(blob: &str) -> ThumbnailRequest {
        ThumbnailRequest {
            blob: blob.into(),
            width: 128,
        }
    }

    fn proxy(factory: &MemoryAccountFactory) -> QueueProxy<ThumbnailRequest> {
        let settings = ConfigManager::new();
        settings.set("Storage", "UseDevelopmentStorage=true").unwrap();
        QueueProxy::new(StorageEnvironment::in_memory(settings, factory))
            .unwrap()
            .with_connection_name("Storage")
    }

    #[test]
    fn test_default_queue_name_is_type_name() {
        let proxy = proxy(&MemoryAccountFactory::new());
        assert_eq!(proxy.queue_name(), "thumbnailrequest");
    }

    #[tokio::test]
    async fn test_dequeue_and_complete() {
        let factory = MemoryAccountFactory::new();
        let proxy = proxy(&factory);
        proxy.enqueue(&request("a.png")).await.unwrap();
        proxy.enqueue(&request("b.png")).await.unwrap();

        assert_eq!(proxy.peek().await.unwrap(), Some(request("a.png")));
        let delivery = proxy.dequeue(Duration::from_secs(30)).await.unwrap().unwrap();
        assert_eq!(delivery.message, request("a.png"));
        assert_eq!(delivery.envelope.dequeue_count, 1);

        proxy.complete(&delivery).await.unwrap();
        assert_eq!(proxy.approximate_len().await.unwrap(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_uncompleted_message_reappears() {
        let factory = MemoryAccountFactory::new();
        let proxy = proxy(&factory);
        proxy.enqueue(&request("a.png")).await.unwrap();

        let first = proxy.dequeue(Duration::from_secs(10)).await.unwrap().unwrap();
        assert!(proxy.dequeue(Duration::from_secs(10)).await.unwrap().is_none());

        tokio::time::advance(Duration::from_secs(11)).await;
        let again = proxy.dequeue(Duration::from_secs(10)).await.unwrap().unwrap();
        assert_eq!(again.envelope.id, first.envelope.id);
        assert_eq!(again.envelope.dequeue_count, 2);
    }

    #[test]
    fn test_decode_needs_no_connection() {
        let factory = MemoryAccountFactory::new();
        let mut proxy = proxy(&factory);
        proxy.clear_connection_name();

        let decoded = proxy
            .decode("<ThumbnailRequest><blob>x.png</blob><width>64</width></ThumbnailRequest>")
            .unwrap();
        assert_eq!(decoded.width, 64);
        assert!(proxy.decode("plain text").unwrap_err().is_malformed_message());
    }
}
