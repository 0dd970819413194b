//! Broadcast-based event bus.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::broadcast;

use super::Event;

/// Default broadcast channel capacity.
pub const DEFAULT_CAPACITY: usize = 1024;

/// Typed publish/subscribe fabric connecting the coordinator to observers.
///
/// Non-blocking: `emit` never awaits. A receiver that falls more than the
/// channel capacity behind gets `RecvError::Lagged(n)` on its next `recv`,
/// so lost notifications are always signalled to the slow observer and
/// never stall the producer.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<Event>,
    emit_count: Arc<AtomicU64>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self {
            tx,
            emit_count: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Publish an event to all current subscribers.
    ///
    /// Returns the number of receivers that got it (0 with no subscribers).
    pub fn emit(&self, event: Event) -> usize {
        tracing::trace!(event_type = event.event_type(), "emit");
        let _ = self.emit_count.fetch_add(1, Ordering::Relaxed);
        self.tx.send(event).unwrap_or(0)
    }

    /// Receive every event emitted after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    pub fn emit_count(&self) -> u64 {
        self.emit_count.load(Ordering::Relaxed)
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::broadcast::error::RecvError;

    #[test]
    fn emit_with_no_subscribers() {
        let bus = EventBus::new();
        assert_eq!(bus.emit(Event::workspace_created(1)), 0);
        assert_eq!(bus.emit_count(), 1);
    }

    #[tokio::test]
    async fn clones_share_one_channel() {
        let bus = EventBus::new();
        let other = bus.clone();
        let mut rx = bus.subscribe();

        assert_eq!(other.emit(Event::terminal_closed(3)), 1);
        let received = rx.recv().await.unwrap();
        assert_eq!(received.terminal_id(), Some(3));
        assert_eq!(bus.emit_count(), 1);
    }

    #[tokio::test]
    async fn multiple_subscribers_see_the_same_order() {
        let bus = EventBus::new();
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 2);

        for id in 1..=3 {
            bus.emit(Event::workspace_created(id));
        }

        for rx in [&mut rx1, &mut rx2] {
            for id in 1..=3 {
                assert_eq!(rx.recv().await.unwrap().workspace_id(), Some(id));
            }
        }
    }

    #[tokio::test]
    async fn slow_receiver_is_told_it_lagged() {
        let bus = EventBus::with_capacity(2);
        let mut rx = bus.subscribe();

        bus.emit(Event::workspace_created(1));
        bus.emit(Event::workspace_created(2));
        bus.emit(Event::workspace_created(3));

        match rx.recv().await {
            Err(RecvError::Lagged(n)) => assert_eq!(n, 1),
            other => panic!("expected lag, got {:?}", other),
        }
        assert_eq!(rx.recv().await.unwrap().workspace_id(), Some(2));
        assert_eq!(rx.recv().await.unwrap().workspace_id(), Some(3));
    }
}
