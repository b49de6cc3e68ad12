//! # Jitter for computed delays.
//!
//! [`Jitter`] adds randomness to intervals and backoff delays to prevent
//! thundering herd effects when multiple pollers fire or retry simultaneously.
//!
//! - [`Jitter::None`] — no randomization, predictable delays
//! - [`Jitter::Ratio`] — uniform random factor in `[1 − r, 1 + r]`

use rand::Rng;
use std::time::Duration;

/// Randomization applied to every computed delay.
///
/// A ratio of `0.1` perturbs each delay by up to ±10%, which is enough to
/// spread pollers that were created together (or recovered from the same
/// outage) across the timeline.
///
/// ## Trade-offs
/// - **None**: predictable, but sibling pollers that share a cadence stay in
///   lock-step and hit the backend in bursts
/// - **Ratio**: keeps the expected cadence while breaking synchronization
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Jitter {
    /// No jitter: use the exact computed delay.
    ///
    /// Use when:
    /// - Only one poller exists (no herd risk)
    /// - Predictable timing is required
    /// - Testing/debugging
    None,

    /// Multiply each delay by a uniform random factor in `[1 − r, 1 + r]`.
    ///
    /// The ratio is kept in `[0, 1]`; `Ratio(0.0)` behaves like `None`.
    Ratio(f64),
}

impl Default for Jitter {
    /// Returns [`Jitter::None`].
    fn default() -> Self {
        Jitter::None
    }
}

impl Jitter {
    /// Creates a ratio jitter, clamping the ratio into `[0, 1]`.
    pub fn ratio(r: f64) -> Self {
        if r.is_finite() {
            Jitter::Ratio(r.clamp(0.0, 1.0))
        } else {
            Jitter::None
        }
    }

    /// Applies jitter to the given delay.
    ///
    /// A zero delay stays zero; otherwise the result is strictly positive for
    /// ratios below 1.0.
    pub fn apply(&self, delay: Duration) -> Duration {
        match *self {
            Jitter::None => delay,
            Jitter::Ratio(r) => {
                if delay.is_zero() || r <= 0.0 {
                    return delay;
                }
                let mut rng = rand::rng();
                let factor = rng.random_range((1.0 - r)..=(1.0 + r));
                Duration::from_secs_f64(delay.as_secs_f64() * factor)
            }
        }
    }
}
