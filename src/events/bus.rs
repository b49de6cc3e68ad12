//! # Event bus for broadcasting scheduler events.
//!
//! [`Bus`] is a thin wrapper around [`tokio::sync::broadcast`] that provides
//! non-blocking event publishing from multiple sources (poller actors, the
//! registry, the penalty tracker).
//!
//! ## Rules
//! - **Non-blocking publish**: `publish()` never blocks; it calls `broadcast::Sender::send`.
//! - **Bounded capacity**: a single ring buffer stores recent events for all receivers.
//! - **Lag handling**: slow receivers get `RecvError::Lagged(n)` and skip `n` oldest items.
//! - **No persistence**: events are lost if there are no active receivers at send time.

use tokio::sync::broadcast;

use super::event::Event;

/// Broadcast channel for scheduler events.
///
/// Multiple publishers can publish concurrently; receivers get clones of each
/// event. Cheap to clone (internally holds an `Arc`-backed sender).
#[derive(Clone, Debug)]
pub struct Bus {
    tx: broadcast::Sender<Event>,
}

impl Bus {
    /// Creates a new bus with the given channel capacity (clamped to ≥ 1).
    ///
    /// Capacity is **shared** across all receivers; receivers that lag behind
    /// more than `capacity` events observe `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel::<Event>(capacity.max(1));
        Self { tx }
    }

    /// Publishes an event to all active receivers.
    ///
    /// If there are no receivers, the event is dropped and this still returns
    /// immediately.
    pub fn publish(&self, ev: Event) {
        let _ = self.tx.send(ev);
    }

    /// Creates a new receiver that observes subsequent events.
    ///
    /// Each call creates an **independent** receiver; a receiver only gets
    /// events sent **after** it subscribed.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventKind;

    #[tokio::test]
    async fn test_publish_reaches_subscriber() {
        let bus = Bus::new(8);
        let mut rx = bus.subscribe();
        bus.publish(Event::new(EventKind::PollStarting).with_poller("a"));

        let ev = rx.recv().await.expect("event delivered");
        assert_eq!(ev.kind, EventKind::PollStarting);
        assert_eq!(ev.poller.as_deref(), Some("a"));
    }

    #[tokio::test]
    async fn test_publish_without_receivers_is_silent() {
        let bus = Bus::new(8);
        bus.publish(Event::new(EventKind::PenaltyCleared));
        // a receiver created afterwards sees nothing
        let mut rx = bus.subscribe();
        bus.publish(Event::new(EventKind::PenaltyEngaged));
        let ev = rx.recv().await.expect("later event delivered");
        assert_eq!(ev.kind, EventKind::PenaltyEngaged);
    }

    #[test]
    fn test_capacity_clamped() {
        // constructing with zero capacity must not panic
        let _bus = Bus::new(0);
    }
}
