//! # Poller specification.
//!
//! Defines [`PollerSpec`] a configuration bundle that describes one recurring
//! conditional fetch: the operation, interval bounds, adaptivity, visibility
//! policy, and jitter.
//!
//! ## Rules
//! - `min_interval ≤ base_interval ≤ max_interval` (checked by the registry
//!   at `start`).
//! - The spec is immutable once the poller is started.

use std::sync::Arc;
use std::time::Duration;

use crate::error::RegistryError;
use crate::fetch::OperationRef;
use crate::policies::Jitter;

/// Specification for one scheduled poller.
///
/// Bundles together:
/// - The resource id (unique within a registry)
/// - The conditional fetch operation ([`OperationRef`])
/// - Interval bounds for adaptive cadence
/// - Visibility and jitter policy
///
/// ## Example
/// ```rust
/// use std::time::Duration;
/// use refetch::{FetchFn, FetchOutcome, Jitter, PollerSpec, Validator};
///
/// let op = FetchFn::arc(|_v: Option<Validator>| async { FetchOutcome::unchanged() });
///
/// let spec = PollerSpec::new("prices", op, Duration::from_secs(30))
///     .with_bounds(Duration::from_secs(10), Duration::from_secs(300))
///     .with_pause_when_hidden(true)
///     .with_jitter(Jitter::ratio(0.1));
///
/// assert_eq!(spec.id(), "prices");
/// assert!(spec.adaptive());
/// ```
#[derive(Clone)]
pub struct PollerSpec {
    id: Arc<str>,
    operation: OperationRef,
    base_interval: Duration,
    min_interval: Duration,
    max_interval: Duration,
    adaptive: bool,
    pause_when_hidden: bool,
    jitter: Jitter,
}

impl PollerSpec {
    /// Creates a specification with defaults:
    ///
    /// - `min_interval = base_interval`, `max_interval = base_interval × 8`
    /// - `adaptive = true`
    /// - `pause_when_hidden = true`
    /// - `jitter = Jitter::ratio(0.1)`
    pub fn new(id: impl Into<Arc<str>>, operation: OperationRef, base_interval: Duration) -> Self {
        Self {
            id: id.into(),
            operation,
            base_interval,
            min_interval: base_interval,
            max_interval: base_interval.saturating_mul(8),
            adaptive: true,
            pause_when_hidden: true,
            jitter: Jitter::ratio(0.1),
        }
    }

    /// Sets the interval bounds.
    pub fn with_bounds(mut self, min: Duration, max: Duration) -> Self {
        self.min_interval = min;
        self.max_interval = max;
        self
    }

    /// Enables or disables interval adaptation.
    ///
    /// A non-adaptive poller holds `base_interval` except during backoff.
    pub fn with_adaptive(mut self, adaptive: bool) -> Self {
        self.adaptive = adaptive;
        self
    }

    /// Chooses between fully pausing while the host is hidden (`true`) and
    /// downshifting to `max_interval` (`false`).
    pub fn with_pause_when_hidden(mut self, pause: bool) -> Self {
        self.pause_when_hidden = pause;
        self
    }

    /// Sets the jitter applied to every computed delay.
    pub fn with_jitter(mut self, jitter: Jitter) -> Self {
        self.jitter = jitter;
        self
    }

    /// Resource id, unique within a registry.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Shared id handle.
    pub(crate) fn id_arc(&self) -> Arc<str> {
        Arc::clone(&self.id)
    }

    /// The conditional fetch operation.
    pub fn operation(&self) -> &OperationRef {
        &self.operation
    }

    /// The steady interval the poller returns to after changes.
    pub fn base_interval(&self) -> Duration {
        self.base_interval
    }

    /// Lower interval bound.
    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Upper interval bound (also the downshift cadence while hidden).
    pub fn max_interval(&self) -> Duration {
        self.max_interval
    }

    /// Whether idle adaptation is enabled.
    pub fn adaptive(&self) -> bool {
        self.adaptive
    }

    /// Whether the poller fully pauses while the host is hidden.
    pub fn pause_when_hidden(&self) -> bool {
        self.pause_when_hidden
    }

    /// Jitter applied to every computed delay.
    pub fn jitter(&self) -> Jitter {
        self.jitter
    }

    /// Checks the interval bounds.
    pub(crate) fn validate(&self) -> Result<(), RegistryError> {
        if self.base_interval.is_zero() {
            return Err(self.invalid("base_interval must be positive"));
        }
        if self.min_interval > self.base_interval {
            return Err(self.invalid("min_interval exceeds base_interval"));
        }
        if self.base_interval > self.max_interval {
            return Err(self.invalid("base_interval exceeds max_interval"));
        }
        Ok(())
    }

    fn invalid(&self, reason: &str) -> RegistryError {
        RegistryError::InvalidSpec {
            id: self.id.to_string(),
            reason: reason.to_string(),
        }
    }
}

impl std::fmt::Debug for PollerSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PollerSpec")
            .field("id", &self.id)
            .field("base_interval", &self.base_interval)
            .field("min_interval", &self.min_interval)
            .field("max_interval", &self.max_interval)
            .field("adaptive", &self.adaptive)
            .field("pause_when_hidden", &self.pause_when_hidden)
            .field("jitter", &self.jitter)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::{FetchFn, FetchOutcome, Validator};

    fn noop() -> OperationRef {
        FetchFn::arc(|_v: Option<Validator>| async { FetchOutcome::unchanged() })
    }

    #[test]
    fn test_defaults() {
        let spec = PollerSpec::new("a", noop(), Duration::from_secs(30));
        assert_eq!(spec.min_interval(), Duration::from_secs(30));
        assert_eq!(spec.max_interval(), Duration::from_secs(240));
        assert!(spec.adaptive());
        assert!(spec.pause_when_hidden());
        assert!(spec.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_inverted_bounds() {
        let spec = PollerSpec::new("a", noop(), Duration::from_secs(30))
            .with_bounds(Duration::from_secs(60), Duration::from_secs(300));
        assert!(matches!(
            spec.validate(),
            Err(RegistryError::InvalidSpec { .. })
        ));

        let spec = PollerSpec::new("a", noop(), Duration::from_secs(30))
            .with_bounds(Duration::from_secs(10), Duration::from_secs(20));
        assert!(spec.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_base() {
        let spec = PollerSpec::new("a", noop(), Duration::ZERO);
        assert!(spec.validate().is_err());
    }
}
