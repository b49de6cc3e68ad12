//! # Backoff policy for failing pollers.
//!
//! [`BackoffPolicy`] controls how retry delays grow after repeated failures.
//! The delay for `failures` consecutive failures is computed as
//! `base × factor^failures`, multiplied by the shared penalty factor while a
//! cross-poller outage is suspected, and clamped to a hard cap.
//!
//! Because the delay is derived purely from the failure count, jitter output
//! never feeds back into subsequent calculations — this prevents the negative
//! feedback loop that causes delays to shrink over time. Jitter is applied by
//! the caller on the final value.
//!
//! # Example
//! ```rust
//! use std::time::Duration;
//! use refetch::BackoffPolicy;
//!
//! let backoff = BackoffPolicy { factor: 2.0 };
//! let base = Duration::from_secs(1);
//! let cap = Duration::from_secs(60);
//!
//! // First failure — base × 2¹ = 2s
//! assert_eq!(backoff.delay(1, base, cap, 1.0), Duration::from_secs(2));
//!
//! // Second failure — base × 2² = 4s
//! assert_eq!(backoff.delay(2, base, cap, 1.0), Duration::from_secs(4));
//!
//! // Tenth failure — 1s × 2¹⁰ = 1024s → capped at 60s
//! assert_eq!(backoff.delay(10, base, cap, 1.0), Duration::from_secs(60));
//! ```

use std::time::Duration;

/// Retry backoff policy.
///
/// The only parameter is the multiplicative growth [`BackoffPolicy::factor`];
/// base delay and cap vary per poller and are passed per call.
#[derive(Clone, Copy, Debug)]
pub struct BackoffPolicy {
    /// Multiplicative growth factor (`>= 1.0` recommended).
    pub factor: f64,
}

impl Default for BackoffPolicy {
    /// Returns the classic doubling policy (`factor = 2.0`).
    fn default() -> Self {
        Self { factor: 2.0 }
    }
}

impl BackoffPolicy {
    /// Computes the delay for the given consecutive-failure count.
    ///
    /// `failures` is 1-indexed: a poller that has never failed is scheduled by
    /// the normal interval rules and never reaches this function.
    ///
    /// `penalty` is the shared outage multiplier (`1.0` when no outage is
    /// suspected). It is applied before the cap, so even a penalized delay
    /// never exceeds `cap`.
    ///
    /// Guarantees:
    /// - monotonically non-decreasing in `failures`
    /// - bounded above by `cap`
    /// - strictly positive (floors at 1ms for degenerate inputs)
    pub fn delay(&self, failures: u32, base: Duration, cap: Duration, penalty: f64) -> Duration {
        let cap_secs = cap.as_secs_f64();
        let exponent = failures.min(i32::MAX as u32) as i32;
        let penalty = if penalty.is_finite() && penalty >= 1.0 {
            penalty
        } else {
            1.0
        };
        let unclamped = base.as_secs_f64() * self.factor.powi(exponent) * penalty;

        let delay = if !unclamped.is_finite() || unclamped < 0.0 || unclamped > cap_secs {
            cap
        } else {
            Duration::from_secs_f64(unclamped)
        };

        delay.max(Duration::from_millis(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: Duration = Duration::from_secs(1);
    const CAP: Duration = Duration::from_secs(60);

    #[test]
    fn test_doubling_sequence() {
        let policy = BackoffPolicy { factor: 2.0 };
        assert_eq!(policy.delay(1, BASE, CAP, 1.0), Duration::from_secs(2));
        assert_eq!(policy.delay(2, BASE, CAP, 1.0), Duration::from_secs(4));
        assert_eq!(policy.delay(3, BASE, CAP, 1.0), Duration::from_secs(8));
        assert_eq!(policy.delay(4, BASE, CAP, 1.0), Duration::from_secs(16));
    }

    #[test]
    fn test_monotone_non_decreasing() {
        let policy = BackoffPolicy { factor: 2.0 };
        let mut prev = Duration::ZERO;
        for failures in 1..20 {
            let d = policy.delay(failures, BASE, CAP, 1.0);
            assert!(d >= prev, "delay shrank at {} failures", failures);
            assert!(d <= CAP);
            prev = d;
        }
    }

    #[test]
    fn test_clamped_to_cap() {
        let policy = BackoffPolicy { factor: 2.0 };
        assert_eq!(policy.delay(10, BASE, CAP, 1.0), CAP);
        assert_eq!(policy.delay(u32::MAX, BASE, CAP, 1.0), CAP);
    }

    #[test]
    fn test_penalty_multiplies_before_cap() {
        let policy = BackoffPolicy { factor: 2.0 };
        assert_eq!(policy.delay(1, BASE, CAP, 2.0), Duration::from_secs(4));
        // penalized delay still respects the cap
        assert_eq!(policy.delay(6, BASE, CAP, 2.0), CAP);
    }

    #[test]
    fn test_degenerate_penalty_ignored() {
        let policy = BackoffPolicy { factor: 2.0 };
        assert_eq!(policy.delay(1, BASE, CAP, 0.0), Duration::from_secs(2));
        assert_eq!(policy.delay(1, BASE, CAP, f64::NAN), Duration::from_secs(2));
    }

    #[test]
    fn test_strictly_positive() {
        let policy = BackoffPolicy { factor: 2.0 };
        let d = policy.delay(1, Duration::ZERO, CAP, 1.0);
        assert!(d > Duration::ZERO);
    }

    #[test]
    fn test_constant_factor() {
        let policy = BackoffPolicy { factor: 1.0 };
        for failures in 1..10 {
            assert_eq!(policy.delay(failures, BASE, CAP, 1.0), BASE);
        }
    }
}
