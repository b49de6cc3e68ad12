//! # Global scheduler configuration.
//!
//! Provides [`Config`] centralized tunables for a [`Registry`](crate::Registry)
//! and every poller it owns.
//!
//! Config is used in two ways:
//! 1. **Registry creation**: `Registry::new(config)`
//! 2. **PollerSpec defaults**: `PollerSpec::with_defaults(..)` inherits bounds from it
//!
//! ## Sentinel values
//! - `client_error_pause_threshold = 0` → client errors back off like any other failure
//! - `bus_capacity` is clamped to a minimum of 1 by the bus

use std::time::Duration;

use crate::policies::{BackoffPolicy, GrowthPolicy};

/// Global configuration for a scheduler registry.
///
/// Defines:
/// - **Idle adaptation**: growth factor and unchanged-streak threshold
/// - **Failure handling**: backoff factor, hard backoff ceiling, client-error parking
/// - **Outage coordination**: rolling failure window, engage threshold, penalty multiplier
/// - **Delivery**: event bus capacity, subscriber failure-streak notification threshold
///
/// ## Field semantics
/// - `growth_factor`: multiplier applied to an idle poller's interval once the
///   unchanged streak reaches `unchanged_threshold`
/// - `backoff_cap_multiplier`: hard global ceiling for backoff delays, expressed
///   as a multiple of each poller's `max_interval`
/// - `penalty_threshold`: proportion of active pollers that must fail inside
///   `penalty_window` before the shared penalty engages
/// - `notify_failure_threshold`: consecutive failures before subscribers hear
///   about a failing poller (single blips stay quiet)
/// - `client_error_pause_threshold`: consecutive client-error failures before a
///   poller parks itself and waits for an explicit refresh (`0` = disabled)
///
/// All fields are public for flexibility. Prefer the helper accessors to avoid
/// sprinkling sentinel checks across the codebase.
#[derive(Clone, Debug)]
pub struct Config {
    /// Interval multiplier for pollers whose payload has stopped changing.
    pub growth_factor: f64,

    /// Unchanged-streak length required before `growth_factor` kicks in.
    ///
    /// Growing on the very first idle cycle makes the cadence oscillate; the
    /// streak threshold keeps one quiet poll from slowing the poller down.
    pub unchanged_threshold: u32,

    /// Multiplicative backoff growth factor (`>= 1.0` recommended).
    pub backoff_factor: f64,

    /// Hard ceiling for backoff delays, as a multiple of a poller's `max_interval`.
    ///
    /// Backoff may exceed `max_interval`, but never `max_interval × this`.
    pub backoff_cap_multiplier: f64,

    /// Trailing window over which cross-poller failures are correlated.
    pub penalty_window: Duration,

    /// Proportion of active pollers that must fail inside the window to engage
    /// the shared penalty (`0.5` = more than half).
    pub penalty_threshold: f64,

    /// Multiplier applied to every backoff computation while the penalty is engaged.
    pub penalty_multiplier: f64,

    /// Minimum number of distinct failing pollers required to engage the
    /// penalty (clamped to ≥ 2: a lone flaky resource is not an outage).
    pub penalty_min_failing: usize,

    /// Consecutive failures before subscribers are notified of a failing poller.
    pub notify_failure_threshold: u32,

    /// Consecutive client-error failures before a poller parks itself.
    ///
    /// - `0` = disabled (client errors back off like any other failure)
    /// - `n > 0` = after `n` client errors in a row the poller moves to `Paused`
    ///   and stays there until an explicit `refresh`
    pub client_error_pause_threshold: u32,

    /// Capacity of the event bus broadcast channel ring buffer.
    ///
    /// Slow receivers that lag behind more than `bus_capacity` events will
    /// observe `Lagged` and skip older items. Minimum value is 1 (enforced by the bus).
    pub bus_capacity: usize,
}

impl Config {
    /// Returns the client-error parking threshold as an `Option`.
    ///
    /// - `None` → disabled
    /// - `Some(n)` → park after `n` consecutive client errors
    #[inline]
    pub fn client_error_pause(&self) -> Option<u32> {
        if self.client_error_pause_threshold == 0 {
            None
        } else {
            Some(self.client_error_pause_threshold)
        }
    }

    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }

    /// Builds the idle-growth policy from the configured factor and threshold.
    #[inline]
    pub fn growth(&self) -> GrowthPolicy {
        GrowthPolicy {
            factor: self.growth_factor.max(1.0),
            unchanged_threshold: self.unchanged_threshold,
        }
    }

    /// Builds the backoff policy from the configured factor.
    #[inline]
    pub fn backoff(&self) -> BackoffPolicy {
        BackoffPolicy {
            factor: self.backoff_factor.max(1.0),
        }
    }

    /// Returns the hard backoff ceiling for a poller with the given `max_interval`.
    #[inline]
    pub fn backoff_cap(&self, max_interval: Duration) -> Duration {
        max_interval.mul_f64(self.backoff_cap_multiplier.max(1.0))
    }
}

impl Default for Config {
    /// Default configuration:
    ///
    /// - `growth_factor = 1.5`, `unchanged_threshold = 3` (slow down after three quiet polls)
    /// - `backoff_factor = 2.0` (double on error), `backoff_cap_multiplier = 2.0`
    /// - `penalty_window = 30s`, `penalty_threshold = 0.5`, `penalty_multiplier = 2.0`
    /// - `notify_failure_threshold = 2` (one blip stays quiet)
    /// - `client_error_pause_threshold = 3`
    /// - `bus_capacity = 1024`
    fn default() -> Self {
        Self {
            growth_factor: 1.5,
            unchanged_threshold: 3,
            backoff_factor: 2.0,
            backoff_cap_multiplier: 2.0,
            penalty_window: Duration::from_secs(30),
            penalty_threshold: 0.5,
            penalty_multiplier: 2.0,
            penalty_min_failing: 2,
            notify_failure_threshold: 2,
            client_error_pause_threshold: 3,
            bus_capacity: 1024,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = Config::default();
        assert_eq!(cfg.unchanged_threshold, 3);
        assert_eq!(cfg.penalty_window, Duration::from_secs(30));
        assert_eq!(cfg.client_error_pause(), Some(3));
        assert_eq!(cfg.bus_capacity_clamped(), 1024);
    }

    #[test]
    fn test_client_error_pause_sentinel() {
        let cfg = Config {
            client_error_pause_threshold: 0,
            ..Config::default()
        };
        assert_eq!(cfg.client_error_pause(), None);
    }

    #[test]
    fn test_bus_capacity_clamped() {
        let cfg = Config {
            bus_capacity: 0,
            ..Config::default()
        };
        assert_eq!(cfg.bus_capacity_clamped(), 1);
    }

    #[test]
    fn test_backoff_cap_scales_max_interval() {
        let cfg = Config::default();
        assert_eq!(
            cfg.backoff_cap(Duration::from_secs(60)),
            Duration::from_secs(120)
        );
    }

    #[test]
    fn test_degenerate_factors_clamped() {
        let cfg = Config {
            growth_factor: 0.5,
            backoff_factor: 0.0,
            ..Config::default()
        };
        assert_eq!(cfg.growth().factor, 1.0);
        assert_eq!(cfg.backoff().factor, 1.0);
    }
}
