//! # Runtime events emitted by the registry and poller actors.
//!
//! The [`EventKind`] enum classifies event types across four categories:
//! - **Lifecycle events**: poll execution flow (starting, changed, unchanged, failed, backoff)
//! - **Management events**: poller registration and removal, manual refresh
//! - **Cadence events**: pause/resume/downshift and visibility changes
//! - **Coordination events**: shared penalty engage/clear, subscriber overflow/panic
//!
//! The [`Event`] struct carries additional metadata such as timestamps, the
//! poller id, failure streaks, delays, and accepted payloads.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases
//! monotonically. Use `seq` to restore the exact order when events are
//! delivered out of order.
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use refetch::{Event, EventKind};
//!
//! let ev = Event::new(EventKind::BackoffScheduled)
//!     .with_poller("prices")
//!     .with_reason("network failure: connection refused")
//!     .with_failures(2)
//!     .with_delay(Duration::from_secs(4));
//!
//! assert_eq!(ev.kind, EventKind::BackoffScheduled);
//! assert_eq!(ev.poller.as_deref(), Some("prices"));
//! assert_eq!(ev.delay_ms, Some(4000));
//! ```

use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use bytes::Bytes;

use crate::error::FailureKind;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of scheduler events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Poller management ===
    /// A poller was registered and its actor spawned.
    ///
    /// Sets: `poller`, `at`, `seq`.
    PollerAdded,

    /// A poller was stopped and its cache entry evicted.
    ///
    /// Sets: `poller`, `at`, `seq`.
    PollerRemoved,

    /// A manual refresh was requested through the registry.
    ///
    /// Sets: `poller`, `at`, `seq`.
    RefreshRequested,

    // === Poll lifecycle ===
    /// A poller is starting a run.
    ///
    /// Sets: `poller`, `at`, `seq`.
    PollStarting,

    /// A run produced new content that was accepted into the cache.
    ///
    /// Sets: `poller`, `payload`, `interval_ms` (next cadence), `at`, `seq`.
    PayloadChanged,

    /// A run confirmed the held content is still current.
    ///
    /// Sets: `poller`, `interval_ms` (next cadence), `at`, `seq`.
    PayloadUnchanged,

    /// A run failed.
    ///
    /// Sets: `poller`, `failures` (consecutive), `failure` (category),
    /// `reason`, `at`, `seq`.
    PollFailed,

    /// A retry was scheduled after a failure.
    ///
    /// Sets: `poller`, `failures`, `delay_ms` (actual armed delay, jitter
    /// included), `reason`, `at`, `seq`.
    BackoffScheduled,

    // === Cadence ===
    /// A poller stopped scheduling runs (hidden host or client-error streak).
    ///
    /// Sets: `poller`, `reason` (`"hidden"` or `"client-errors"`), `at`, `seq`.
    PollerPaused,

    /// A paused or downshifted poller returned to its normal cadence.
    ///
    /// Sets: `poller`, `at`, `seq`.
    PollerResumed,

    /// A poller downshifted to its maximum interval while the host is hidden.
    ///
    /// Sets: `poller`, `interval_ms` (downshifted cadence), `at`, `seq`.
    PollerDownshifted,

    /// The host reported a visibility change.
    ///
    /// Sets: `hidden`, `at`, `seq`.
    VisibilityChanged,

    // === Coordination ===
    /// Clustered failures engaged the shared backoff penalty.
    ///
    /// Sets: `reason` (failing/active counts), `at`, `seq`.
    PenaltyEngaged,

    /// A success (or an emptied failure window) cleared the shared penalty.
    ///
    /// Sets: `at`, `seq`.
    PenaltyCleared,

    // === Subscriber plumbing ===
    /// A subscriber dropped an update (queue full or worker closed).
    ///
    /// Sets: `poller` (subscribed id), `reason`, `at`, `seq`.
    SubscriberOverflow,

    /// A subscriber panicked while processing an update.
    ///
    /// Sets: `poller` (subscribed id), `reason` (panic info), `at`, `seq`.
    SubscriberPanicked,
}

/// Scheduler event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,

    /// Poller id, if applicable.
    pub poller: Option<Arc<str>>,
    /// Human-readable reason (errors, pause cause, overflow details).
    pub reason: Option<Arc<str>>,
    /// Armed delay before the next run in milliseconds (compact).
    pub delay_ms: Option<u64>,
    /// Current steady interval in milliseconds (compact).
    pub interval_ms: Option<u64>,
    /// Consecutive-failure streak at the time of the event.
    pub failures: Option<u32>,
    /// Failure category for `PollFailed`.
    pub failure: Option<FailureKind>,
    /// Host visibility for `VisibilityChanged`.
    pub hidden: Option<bool>,
    /// Accepted payload for `PayloadChanged` (cheap to clone).
    pub payload: Option<Bytes>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            poller: None,
            reason: None,
            delay_ms: None,
            interval_ms: None,
            failures: None,
            failure: None,
            hidden: None,
            payload: None,
        }
    }

    /// Attaches a poller id.
    #[inline]
    pub fn with_poller(mut self, poller: impl Into<Arc<str>>) -> Self {
        self.poller = Some(poller.into());
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Attaches an armed delay (stored as milliseconds).
    #[inline]
    pub fn with_delay(mut self, d: Duration) -> Self {
        self.delay_ms = Some(d.as_millis().min(u128::from(u64::MAX)) as u64);
        self
    }

    /// Attaches the current steady interval (stored as milliseconds).
    #[inline]
    pub fn with_interval(mut self, d: Duration) -> Self {
        self.interval_ms = Some(d.as_millis().min(u128::from(u64::MAX)) as u64);
        self
    }

    /// Attaches a consecutive-failure streak.
    #[inline]
    pub fn with_failures(mut self, n: u32) -> Self {
        self.failures = Some(n);
        self
    }

    /// Attaches a failure category.
    #[inline]
    pub fn with_failure_kind(mut self, kind: FailureKind) -> Self {
        self.failure = Some(kind);
        self
    }

    /// Attaches the host visibility flag.
    #[inline]
    pub fn with_hidden(mut self, hidden: bool) -> Self {
        self.hidden = Some(hidden);
        self
    }

    /// Attaches an accepted payload.
    #[inline]
    pub fn with_payload(mut self, payload: Bytes) -> Self {
        self.payload = Some(payload);
        self
    }

    /// Creates a subscriber overflow event.
    #[inline]
    pub fn subscriber_overflow(poller: &Arc<str>, subscriber: &'static str, cause: &'static str) -> Self {
        Event::new(EventKind::SubscriberOverflow)
            .with_poller(Arc::clone(poller))
            .with_reason(format!("subscriber={subscriber} cause={cause}"))
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(poller: &Arc<str>, subscriber: &'static str, info: String) -> Self {
        Event::new(EventKind::SubscriberPanicked)
            .with_poller(Arc::clone(poller))
            .with_reason(format!("subscriber={subscriber} panic={info}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seq_is_monotonic() {
        let a = Event::new(EventKind::PollStarting);
        let b = Event::new(EventKind::PollStarting);
        assert!(b.seq > a.seq);
    }

    #[test]
    fn test_builder_fields() {
        let ev = Event::new(EventKind::PollFailed)
            .with_poller("news")
            .with_failures(3)
            .with_failure_kind(FailureKind::Network)
            .with_reason("connection refused");
        assert_eq!(ev.poller.as_deref(), Some("news"));
        assert_eq!(ev.failures, Some(3));
        assert_eq!(ev.failure, Some(FailureKind::Network));
        assert_eq!(ev.reason.as_deref(), Some("connection refused"));
        assert!(ev.payload.is_none());
    }

    #[test]
    fn test_durations_stored_as_millis() {
        let ev = Event::new(EventKind::BackoffScheduled)
            .with_delay(Duration::from_secs(2))
            .with_interval(Duration::from_millis(1500));
        assert_eq!(ev.delay_ms, Some(2000));
        assert_eq!(ev.interval_ms, Some(1500));
    }
}
