//! In-process realtime channel.
//!
//! Connects coordinators running in the same process over a tokio
//! broadcast channel. Used by tests and local development; a production
//! deployment substitutes a network-backed [`RealtimeChannel`]
//! implementation.

use super::{CallEvent, ChannelError, EventSubscription, RealtimeChannel};
use tokio::sync::broadcast;
use tracing::debug;

/// Default event buffer per subscription.
const DEFAULT_EVENT_BUFFER: usize = 64;

/// Broadcast-backed [`RealtimeChannel`] for a single process.
#[derive(Debug, Clone)]
pub struct LocalChannel {
    tx: broadcast::Sender<CallEvent>,
}

impl LocalChannel {
    /// Create a channel with the default buffer.
    #[must_use]
    pub fn new() -> Self {
        Self::with_buffer(DEFAULT_EVENT_BUFFER)
    }

    /// Create a channel with an explicit per-subscription buffer.
    #[must_use]
    pub fn with_buffer(buffer: usize) -> Self {
        let (tx, _rx) = broadcast::channel(buffer);
        Self { tx }
    }

    /// Number of live subscriptions.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for LocalChannel {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl RealtimeChannel for LocalChannel {
    async fn publish(&self, event: CallEvent) -> Result<(), ChannelError> {
        // A send with zero subscribers is not a connectivity failure; the
        // event simply had no listener yet.
        match self.tx.send(event) {
            Ok(receivers) => {
                debug!(receivers, "event published");
                Ok(())
            }
            Err(broadcast::error::SendError(event)) => {
                debug!(kind = event.kind(), "event published with no subscribers");
                Ok(())
            }
        }
    }

    fn subscribe(&self) -> EventSubscription {
        EventSubscription::new(self.tx.subscribe())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use common::types::CallId;

    #[tokio::test]
    async fn test_publish_reaches_all_subscribers() {
        let channel = LocalChannel::new();
        let mut a = channel.subscribe();
        let mut b = channel.subscribe();

        let event = CallEvent::Ended { id: CallId::new() };
        channel.publish(event.clone()).await.unwrap();

        assert_eq!(a.next().await.unwrap(), event);
        assert_eq!(b.next().await.unwrap(), event);
    }

    #[tokio::test]
    async fn test_publish_without_subscribers_is_ok() {
        let channel = LocalChannel::new();
        channel
            .publish(CallEvent::Ended { id: CallId::new() })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_drop_deregisters_subscription() {
        let channel = LocalChannel::new();
        let sub = channel.subscribe();
        assert_eq!(channel.subscriber_count(), 1);

        drop(sub);
        assert_eq!(channel.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_subscription_closes_with_channel() {
        let channel = LocalChannel::new();
        let mut sub = channel.subscribe();
        drop(channel);

        assert!(sub.next().await.is_none());
    }
}
