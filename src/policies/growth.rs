//! # Idle-cadence growth policy.
//!
//! [`GrowthPolicy`] lengthens a poller's interval once its payload has stopped
//! changing, trading a little staleness for fewer requests against a resource
//! that is visibly quiet.
//!
//! Growth only starts after the unchanged streak reaches
//! [`GrowthPolicy::unchanged_threshold`]: reacting to the very first quiet
//! cycle makes the cadence oscillate between two intervals.
//!
//! # Example
//! ```rust
//! use std::time::Duration;
//! use refetch::GrowthPolicy;
//!
//! let growth = GrowthPolicy { factor: 1.5, unchanged_threshold: 3 };
//! let min = Duration::from_secs(10);
//! let max = Duration::from_secs(300);
//! let current = Duration::from_secs(30);
//!
//! // Two quiet cycles: interval holds
//! assert_eq!(growth.next_interval(current, 2, min, max, None), current);
//!
//! // Third quiet cycle: 30s × 1.5 = 45s
//! assert_eq!(
//!     growth.next_interval(current, 3, min, max, None),
//!     Duration::from_secs(45)
//! );
//! ```

use std::time::Duration;

/// Interval lengthening for pollers whose payload has stopped changing.
#[derive(Clone, Copy, Debug)]
pub struct GrowthPolicy {
    /// Multiplicative growth factor (`>= 1.0`).
    pub factor: f64,
    /// Unchanged-streak length required before growth starts.
    pub unchanged_threshold: u32,
}

impl Default for GrowthPolicy {
    /// Returns `factor = 1.5`, `unchanged_threshold = 3`.
    fn default() -> Self {
        Self {
            factor: 1.5,
            unchanged_threshold: 3,
        }
    }
}

impl GrowthPolicy {
    /// Computes the interval to use after an unchanged poll.
    ///
    /// - Below the streak threshold, the current interval is kept (re-clamped
    ///   into `[min, max]` in case bounds changed around it).
    /// - At or above the threshold, the interval grows by `factor`, clamped to
    ///   `[min, max]`.
    /// - `floor` is the server-suggested minimum re-poll interval, if any; the
    ///   result never drops below it (capped at `max` so a hostile hint cannot
    ///   push the poller past its own ceiling).
    pub fn next_interval(
        &self,
        current: Duration,
        unchanged_streak: u32,
        min: Duration,
        max: Duration,
        floor: Option<Duration>,
    ) -> Duration {
        let grown = if unchanged_streak >= self.unchanged_threshold {
            current.mul_f64(self.factor.max(1.0))
        } else {
            current
        };
        apply_floor(grown.clamp(min, max), max, floor)
    }
}

/// Raises `interval` to the server-suggested floor, capped at `max`.
pub(crate) fn apply_floor(interval: Duration, max: Duration, floor: Option<Duration>) -> Duration {
    match floor {
        Some(f) => interval.max(f.min(max)),
        None => interval,
    }
}
