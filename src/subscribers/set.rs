//! # SubscriberSet: non-blocking fan-out of poller results
//!
//! [`SubscriberSet`] routes scheduler events to per-poller subscriptions
//! **without awaiting** their processing.
//!
//! ## What it guarantees
//! - `emit(&Event)` returns immediately.
//! - Per-subscription FIFO (queue order).
//! - Panics inside subscribers are caught and reported (isolation).
//!
//! ## What it does **not** guarantee
//! - No global ordering across different subscriptions.
//! - No retries on queue overflow (updates are dropped for that subscription).

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use futures::FutureExt;
use tokio::sync::mpsc;

use crate::error::FailureKind;
use crate::events::{Bus, Event, EventKind};

use super::subscribe::{Subscribe, Update};

/// Per-subscription channel with metadata.
struct Channel {
    key: u64,
    poller: Arc<str>,
    name: &'static str,
    tx: mpsc::Sender<Update>,
}

/// Handle returned by `subscribe`; cancels the subscription explicitly.
///
/// Dropping the handle without calling [`Subscription::cancel`] leaves the
/// subscription active for the poller's lifetime.
pub struct Subscription {
    key: u64,
    set: Arc<SubscriberSet>,
}

impl Subscription {
    /// Removes the subscription; its worker drains and exits.
    pub fn cancel(self) {
        self.set.remove(self.key);
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("key", &self.key).finish()
    }
}

/// Dynamic fan-out with per-subscription bounded queues and worker tasks.
pub struct SubscriberSet {
    channels: RwLock<Vec<Channel>>,
    next_key: AtomicU64,
    failure_threshold: u32,
    bus: Bus,
}

impl SubscriberSet {
    /// Creates an empty set.
    ///
    /// `failure_threshold` gates [`Update::Failing`] notifications: streaks
    /// shorter than it stay quiet.
    pub(crate) fn new(failure_threshold: u32, bus: Bus) -> Self {
        Self {
            channels: RwLock::new(Vec::new()),
            next_key: AtomicU64::new(0),
            failure_threshold,
            bus,
        }
    }

    /// Registers a subscription for `poller` and spawns its worker.
    pub(crate) fn add(self: &Arc<Self>, poller: Arc<str>, sub: Arc<dyn Subscribe>) -> Subscription {
        let key = self.next_key.fetch_add(1, Ordering::Relaxed);
        let cap = sub.queue_capacity().max(1);
        let name = sub.name();
        let (tx, mut rx) = mpsc::channel::<Update>(cap);

        let worker_poller = Arc::clone(&poller);
        let worker_bus = self.bus.clone();
        tokio::spawn(async move {
            while let Some(update) = rx.recv().await {
                let fut = sub.on_update(&update);
                if let Err(panic_err) = std::panic::AssertUnwindSafe(fut).catch_unwind().await {
                    log::warn!("subscriber '{}' panicked: {:?}", sub.name(), panic_err);
                    worker_bus.publish(Event::subscriber_panicked(
                        &worker_poller,
                        sub.name(),
                        format!("{panic_err:?}"),
                    ));
                }
            }
        });

        self.write().push(Channel {
            key,
            poller,
            name,
            tx,
        });
        Subscription {
            key,
            set: Arc::clone(self),
        }
    }

    /// Removes one subscription by key.
    pub(crate) fn remove(&self, key: u64) {
        self.write().retain(|c| c.key != key);
    }

    /// Removes every subscription attached to `poller` (on poller stop).
    pub(crate) fn cancel_for(&self, poller: &str) {
        self.write().retain(|c| &*c.poller != poller);
    }

    /// Routes one event to matching subscriptions (non-blocking).
    ///
    /// Only `PayloadChanged` and threshold-crossing `PollFailed` events turn
    /// into updates; everything else is plumbing and stays on the bus.
    pub(crate) fn emit(&self, ev: &Event) {
        let update = match ev.kind {
            EventKind::PayloadChanged => {
                let (Some(id), Some(payload)) = (ev.poller.clone(), ev.payload.clone()) else {
                    return;
                };
                Update::Payload { id, payload }
            }
            EventKind::PollFailed => {
                let Some(id) = ev.poller.clone() else {
                    return;
                };
                let failures = ev.failures.unwrap_or(0);
                if failures < self.failure_threshold {
                    return;
                }
                Update::Failing {
                    id,
                    kind: ev.failure.unwrap_or(FailureKind::Network),
                    detail: ev.reason.clone().unwrap_or_else(|| Arc::from("")),
                    consecutive_failures: failures,
                }
            }
            _ => return,
        };

        let target = Arc::clone(update.id());
        let channels = self.read();
        for ch in channels.iter().filter(|c| c.poller == target) {
            match ch.tx.try_send(update.clone()) {
                Ok(()) => {}
                Err(mpsc::error::TrySendError::Full(_)) => {
                    log::warn!("subscriber '{}' dropped update: queue full", ch.name);
                    self.bus
                        .publish(Event::subscriber_overflow(&ch.poller, ch.name, "full"));
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    log::warn!("subscriber '{}' dropped update: worker closed", ch.name);
                    self.bus
                        .publish(Event::subscriber_overflow(&ch.poller, ch.name, "closed"));
                }
            }
        }
    }

    /// Number of live subscriptions.
    pub fn len(&self) -> usize {
        self.read().len()
    }

    /// True if there are no subscriptions.
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Vec<Channel>> {
        self.channels.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Vec<Channel>> {
        self.channels.write().unwrap_or_else(|e| e.into_inner())
    }
}
