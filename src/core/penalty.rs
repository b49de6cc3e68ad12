//! # Cross-poller failure correlation.
//!
//! Independent exponential backoffs are enough when pollers fail for
//! independent reasons. When failures cluster — more than half of the active
//! pollers failing inside a short trailing window — the likely cause is a
//! shared outage, and independently backing-off pollers can still resynchronize
//! into bursts once the network returns. [`PenaltyTracker`] detects the cluster
//! and hands every backoff computation a shared multiplier until any poller
//! succeeds again.
//!
//! ## Rules
//! - Failures are tracked per poller id inside a rolling window (monotonic clock).
//! - The penalty engages when `failed_ids / active_pollers > threshold` **and**
//!   at least two distinct pollers are failing — a lone flaky resource is not
//!   an outage signal, however few siblings it has.
//! - Any success anywhere clears the window and the penalty.
//! - An emptied window (all failures aged out) also clears the penalty.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::time::Instant;

use crate::events::{Bus, Event, EventKind};

struct Window {
    /// Most recent failure instant per poller id.
    failed: HashMap<Arc<str>, Instant>,
    /// Whether the shared penalty is currently engaged.
    engaged: bool,
}

/// Shared outage detector and backoff penalty source.
///
/// One instance per registry, shared with every poller actor.
pub(crate) struct PenaltyTracker {
    window: Duration,
    threshold: f64,
    multiplier: f64,
    min_failing: usize,
    bus: Bus,
    active: AtomicUsize,
    inner: Mutex<Window>,
}

impl PenaltyTracker {
    pub(crate) fn new(
        window: Duration,
        threshold: f64,
        multiplier: f64,
        min_failing: usize,
        bus: Bus,
    ) -> Arc<Self> {
        Arc::new(Self {
            window,
            threshold,
            multiplier: multiplier.max(1.0),
            min_failing: min_failing.max(2),
            bus,
            active: AtomicUsize::new(0),
            inner: Mutex::new(Window {
                failed: HashMap::new(),
                engaged: false,
            }),
        })
    }

    /// Updates the active-poller count used for the failing proportion.
    pub(crate) fn set_active(&self, n: usize) {
        self.active.store(n, Ordering::Relaxed);
    }

    /// Records a failed run for `id` and engages the penalty when failures cluster.
    pub(crate) fn on_failure(&self, id: &Arc<str>) {
        let mut inner = self.lock();
        inner.failed.insert(Arc::clone(id), Instant::now());
        self.prune(&mut inner);

        let active = self.active.load(Ordering::Relaxed).max(1);
        let failing = inner.failed.len();
        if !inner.engaged
            && failing >= self.min_failing
            && (failing as f64) / (active as f64) > self.threshold
        {
            inner.engaged = true;
            self.bus.publish(
                Event::new(EventKind::PenaltyEngaged)
                    .with_reason(format!("{failing} of {active} pollers failing")),
            );
        }
    }

    /// Records a successful run anywhere; clears the window and the penalty.
    pub(crate) fn on_success(&self) {
        let mut inner = self.lock();
        inner.failed.clear();
        if inner.engaged {
            inner.engaged = false;
            self.bus.publish(Event::new(EventKind::PenaltyCleared));
        }
    }

    /// Current multiplier for backoff computations: `1.0`, or the configured
    /// penalty while an outage is suspected.
    pub(crate) fn factor(&self) -> f64 {
        let mut inner = self.lock();
        self.prune(&mut inner);
        if inner.engaged && inner.failed.is_empty() {
            inner.engaged = false;
            self.bus.publish(Event::new(EventKind::PenaltyCleared));
        }
        if inner.engaged {
            self.multiplier
        } else {
            1.0
        }
    }

    fn prune(&self, inner: &mut Window) {
        let horizon = Instant::now();
        let window = self.window;
        inner
            .failed
            .retain(|_, at| horizon.duration_since(*at) <= window);
    }

    fn lock(&self) -> MutexGuard<'_, Window> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tracker(bus: &Bus) -> Arc<PenaltyTracker> {
        PenaltyTracker::new(Duration::from_secs(30), 0.5, 2.0, 2, bus.clone())
    }

    fn id(s: &str) -> Arc<str> {
        Arc::from(s)
    }

    #[tokio::test(start_paused = true)]
    async fn test_engages_above_threshold() {
        let bus = Bus::new(16);
        let mut rx = bus.subscribe();
        let t = tracker(&bus);
        t.set_active(5);

        for name in ["a", "b", "c"] {
            t.on_failure(&id(name));
        }
        // 3 of 5 failing: 0.6 > 0.5
        assert_eq!(t.factor(), 2.0);

        let ev = rx.recv().await.expect("penalty event");
        assert_eq!(ev.kind, EventKind::PenaltyEngaged);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stays_clear_at_threshold() {
        let bus = Bus::new(16);
        let t = tracker(&bus);
        t.set_active(2);

        t.on_failure(&id("a"));
        // 1 of 2 failing: 0.5 is not > 0.5
        assert_eq!(t.factor(), 1.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_clears_penalty() {
        let bus = Bus::new(16);
        let t = tracker(&bus);
        t.set_active(2);

        t.on_failure(&id("a"));
        t.on_failure(&id("b"));
        assert_eq!(t.factor(), 2.0);

        t.on_success();
        assert_eq!(t.factor(), 1.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_window_ages_out_failures() {
        let bus = Bus::new(16);
        let t = tracker(&bus);
        t.set_active(2);

        t.on_failure(&id("a"));
        t.on_failure(&id("b"));
        assert_eq!(t.factor(), 2.0);

        tokio::time::advance(Duration::from_secs(31)).await;
        assert_eq!(t.factor(), 1.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_lone_poller_never_engages() {
        let bus = Bus::new(16);
        let t = tracker(&bus);
        t.set_active(1);

        // 1 of 1 failing is above the threshold, but a single resource
        // failing is not an outage
        t.on_failure(&id("a"));
        assert_eq!(t.factor(), 1.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_repeated_failures_count_one_id_once() {
        let bus = Bus::new(16);
        let t = tracker(&bus);
        t.set_active(3);

        for _ in 0..10 {
            t.on_failure(&id("a"));
        }
        // 1 of 3 failing, however often it failed
        assert_eq!(t.factor(), 1.0);
    }
}
