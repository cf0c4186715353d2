//! Realtime channel wrapper with publish-failure injection.

use call_coordinator::channel::{
    CallEvent, ChannelError, EventSubscription, LocalChannel, RealtimeChannel,
};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// [`RealtimeChannel`] that delivers over an in-process [`LocalChannel`]
/// but can be told to fail publishes, simulating a dropped connection.
pub struct FlakyChannel {
    inner: LocalChannel,
    fail_publishes: AtomicBool,
    publish_calls: AtomicUsize,
}

impl FlakyChannel {
    /// Healthy channel.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: LocalChannel::new(),
            fail_publishes: AtomicBool::new(false),
            publish_calls: AtomicUsize::new(0),
        }
    }

    /// Toggle publish failures.
    pub fn set_fail_publishes(&self, fail: bool) {
        self.fail_publishes.store(fail, Ordering::SeqCst);
    }

    /// Number of publish attempts (including failed ones).
    pub fn publish_calls(&self) -> usize {
        self.publish_calls.load(Ordering::SeqCst)
    }

    /// Number of live subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.inner.subscriber_count()
    }
}

impl Default for FlakyChannel {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl RealtimeChannel for FlakyChannel {
    async fn publish(&self, event: CallEvent) -> Result<(), ChannelError> {
        self.publish_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_publishes.load(Ordering::SeqCst) {
            return Err(ChannelError::Disconnected(
                "injected publish failure".to_string(),
            ));
        }
        self.inner.publish(event).await
    }

    fn subscribe(&self) -> EventSubscription {
        self.inner.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::types::CallId;

    #[tokio::test]
    async fn test_failure_injection() {
        let channel = FlakyChannel::new();
        let mut sub = channel.subscribe();

        channel.set_fail_publishes(true);
        let err = channel
            .publish(CallEvent::Ended { id: CallId::new() })
            .await
            .unwrap_err();
        assert!(matches!(err, ChannelError::Disconnected(_)));

        channel.set_fail_publishes(false);
        let event = CallEvent::Ended { id: CallId::new() };
        channel.publish(event.clone()).await.unwrap();
        assert_eq!(sub.next().await.unwrap(), event);
        assert_eq!(channel.publish_calls(), 2);
    }
}
