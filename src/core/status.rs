//! # Coarse poller state for diagnostics.
//!
//! Each poller actor exclusively owns its mutable state and publishes
//! read-only [`PollerStatus`] snapshots over a `tokio::sync::watch` channel
//! after every transition. The registry and [`PollerHandle`]s only ever read
//! these snapshots; nothing outside the actor mutates poller state.

use std::sync::Arc;
use std::time::{Duration, SystemTime};

use tokio::sync::watch;

/// Lifecycle phase of a poller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollStatus {
    /// Created, first timer not yet armed.
    Idle,
    /// Timer armed for the next run.
    Scheduled,
    /// Operation in flight.
    Running,
    /// Timer armed with a failure-driven delay (a distinguishable flavor of
    /// `Scheduled`, kept separate for observability).
    Backoff,
    /// Not scheduling runs: host hidden, or parked after a client-error streak.
    Paused,
    /// Terminal. No pending timer; any in-flight result is discarded.
    Disposed,
}

impl PollStatus {
    /// Returns a short stable label (snake_case) for logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            PollStatus::Idle => "idle",
            PollStatus::Scheduled => "scheduled",
            PollStatus::Running => "running",
            PollStatus::Backoff => "backoff",
            PollStatus::Paused => "paused",
            PollStatus::Disposed => "disposed",
        }
    }
}

/// Read-only snapshot of one poller's state.
#[derive(Clone, Debug)]
pub struct PollerStatus {
    /// Current lifecycle phase.
    pub status: PollStatus,
    /// Interval currently in effect. While in `Backoff` this reports the
    /// armed backoff delay rather than the steady interval.
    pub current_interval: Duration,
    /// Consecutive failed runs; reset by any successful run.
    pub consecutive_failures: u32,
    /// Consecutive runs that confirmed unchanged content; reset when content changes.
    pub consecutive_unchanged: u32,
    /// When the last run started.
    pub last_run_at: Option<SystemTime>,
    /// When the last successful run (changed or unchanged) completed.
    pub last_success_at: Option<SystemTime>,
    /// When content last changed.
    pub last_changed_at: Option<SystemTime>,
    /// Last failure, cleared on success.
    pub last_error: Option<String>,
}

impl PollerStatus {
    /// Snapshot for a freshly created poller.
    pub(crate) fn initial(interval: Duration) -> Self {
        Self {
            status: PollStatus::Idle,
            current_interval: interval,
            consecutive_failures: 0,
            consecutive_unchanged: 0,
            last_run_at: None,
            last_success_at: None,
            last_changed_at: None,
            last_error: None,
        }
    }
}

/// Caller-facing handle to a started poller.
///
/// Holds the poller id and a live view of its status. Dropping the handle
/// does **not** stop the poller; lifecycle is owned by the registry.
#[derive(Clone, Debug)]
pub struct PollerHandle {
    id: Arc<str>,
    status: watch::Receiver<PollerStatus>,
}

impl PollerHandle {
    pub(crate) fn new(id: Arc<str>, status: watch::Receiver<PollerStatus>) -> Self {
        Self { id, status }
    }

    /// The poller's resource id.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The latest status snapshot.
    pub fn status(&self) -> PollerStatus {
        self.status.borrow().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_labels() {
        assert_eq!(PollStatus::Idle.as_label(), "idle");
        assert_eq!(PollStatus::Backoff.as_label(), "backoff");
        assert_eq!(PollStatus::Disposed.as_label(), "disposed");
    }

    #[test]
    fn test_initial_snapshot() {
        let s = PollerStatus::initial(Duration::from_secs(30));
        assert_eq!(s.status, PollStatus::Idle);
        assert_eq!(s.current_interval, Duration::from_secs(30));
        assert_eq!(s.consecutive_failures, 0);
        assert!(s.last_run_at.is_none());
        assert!(s.last_error.is_none());
    }
}
