//! # The conditional-fetch contract.
//!
//! An operation asked to refresh a resource answers with a [`FetchOutcome`]:
//! the content changed (full payload attached), the content is still what the
//! holder has (no body), or the attempt failed (categorized reason).
//!
//! The [`Validator`] is the opaque version token a poller presents on the next
//! request — a "not modified since" marker or entity-tag equivalent. The
//! scheduler never interprets it; it only stores and replays it.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;

use crate::error::FetchFailure;

/// Opaque version token for conditional requests.
///
/// Derived from whatever freshness marker the backing resource supplies
/// (entity tag, modification stamp, revision counter). Compared only for
/// equality, never inspected.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Validator(Arc<str>);

impl Validator {
    /// Wraps a raw token.
    pub fn new(token: impl Into<Arc<str>>) -> Self {
        Self(token.into())
    }

    /// Returns the raw token.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Validator {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for Validator {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl std::fmt::Display for Validator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Result of one conditional fetch.
///
/// `min_interval` carries the server-suggested minimum re-poll interval when
/// the response included one; the scheduler treats it as a floor for interval
/// adaptation, never a ceiling.
#[derive(Clone, Debug)]
pub enum FetchOutcome {
    /// The resource changed; the full payload is attached.
    Changed {
        /// New payload body.
        payload: Bytes,
        /// Version token from the response, to present on the next request.
        validator: Option<Validator>,
        /// Server-suggested minimum re-poll interval.
        min_interval: Option<Duration>,
    },

    /// The resource has not changed since the presented validator.
    Unchanged {
        /// Server-suggested minimum re-poll interval.
        min_interval: Option<Duration>,
    },

    /// The attempt failed.
    Failed(FetchFailure),
}

impl FetchOutcome {
    /// A changed outcome with no validator or interval hint.
    pub fn changed(payload: impl Into<Bytes>) -> Self {
        FetchOutcome::Changed {
            payload: payload.into(),
            validator: None,
            min_interval: None,
        }
    }

    /// An unchanged outcome with no interval hint.
    pub fn unchanged() -> Self {
        FetchOutcome::Unchanged { min_interval: None }
    }

    /// A failed outcome.
    pub fn failed(failure: FetchFailure) -> Self {
        FetchOutcome::Failed(failure)
    }

    /// Attaches a validator (meaningful on `Changed` only).
    pub fn with_validator(mut self, v: impl Into<Validator>) -> Self {
        if let FetchOutcome::Changed { validator, .. } = &mut self {
            *validator = Some(v.into());
        }
        self
    }

    /// Attaches a server-suggested minimum re-poll interval.
    pub fn with_min_interval(mut self, d: Duration) -> Self {
        match &mut self {
            FetchOutcome::Changed { min_interval, .. }
            | FetchOutcome::Unchanged { min_interval } => *min_interval = Some(d),
            FetchOutcome::Failed(_) => {}
        }
        self
    }

    /// True for `Changed`.
    pub fn is_changed(&self) -> bool {
        matches!(self, FetchOutcome::Changed { .. })
    }

    /// True for `Unchanged`.
    pub fn is_unchanged(&self) -> bool {
        matches!(self, FetchOutcome::Unchanged { .. })
    }

    /// True for `Failed`.
    pub fn is_failed(&self) -> bool {
        matches!(self, FetchOutcome::Failed(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FetchFailure;

    #[test]
    fn test_changed_builder() {
        let out = FetchOutcome::changed(&b"body"[..])
            .with_validator("etag-1")
            .with_min_interval(Duration::from_secs(15));
        match out {
            FetchOutcome::Changed {
                payload,
                validator,
                min_interval,
            } => {
                assert_eq!(payload, Bytes::from_static(b"body"));
                assert_eq!(validator, Some(Validator::from("etag-1")));
                assert_eq!(min_interval, Some(Duration::from_secs(15)));
            }
            other => panic!("expected Changed, got {:?}", other),
        }
    }

    #[test]
    fn test_validator_ignored_on_unchanged() {
        let out = FetchOutcome::unchanged().with_validator("etag-1");
        assert!(out.is_unchanged());
    }

    #[test]
    fn test_predicates() {
        assert!(FetchOutcome::changed(&b"x"[..]).is_changed());
        assert!(FetchOutcome::unchanged().is_unchanged());
        assert!(FetchOutcome::failed(FetchFailure::network("down")).is_failed());
    }
}
