//! Error types used by the refetch scheduler and poller operations.
//!
//! This module defines two main error types:
//!
//! - [`RegistryError`] — misuse errors raised synchronously by [`Registry`](crate::Registry) calls.
//! - [`FetchFailure`] — runtime failures reported by poller operations.
//!
//! Runtime fetch failures never propagate as panics or early returns out of the
//! scheduler: they are absorbed into the owning poller's state, drive the backoff
//! policy, and reach subscribers only as data. Misuse errors (`DuplicateId`,
//! `Disposed`, ...) are returned directly to the caller so mistakes surface
//! during development.
//!
//! Both types provide helper methods (`as_label`, `as_message`) for logging/metrics.

use thiserror::Error;

/// # Errors returned by [`Registry`](crate::Registry) operations.
///
/// These represent caller mistakes rather than runtime conditions, and are
/// returned synchronously from `start` / `refresh` / `subscribe` / `status`.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// A poller with this id is already active.
    #[error("poller id {id:?} is already active")]
    DuplicateId {
        /// The conflicting poller id.
        id: String,
    },

    /// No active poller with this id.
    #[error("no active poller with id {id:?}")]
    UnknownPoller {
        /// The requested poller id.
        id: String,
    },

    /// The registry has been torn down via `stop_all` and accepts no further calls.
    #[error("registry is disposed")]
    Disposed,

    /// The poller specification violates its own interval bounds.
    #[error("invalid spec for poller {id:?}: {reason}")]
    InvalidSpec {
        /// The offending poller id.
        id: String,
        /// What is wrong with the spec.
        reason: String,
    },
}

impl RegistryError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use refetch::RegistryError;
    ///
    /// let err = RegistryError::DuplicateId { id: "prices".into() };
    /// assert_eq!(err.as_label(), "duplicate_id");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            RegistryError::DuplicateId { .. } => "duplicate_id",
            RegistryError::UnknownPoller { .. } => "unknown_poller",
            RegistryError::Disposed => "registry_disposed",
            RegistryError::InvalidSpec { .. } => "invalid_spec",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        self.to_string()
    }
}

/// Machine-readable category of a fetch failure.
///
/// Categories matter to the scheduler: transport-level trouble
/// ([`FailureKind::Network`], [`FailureKind::ServerError`]) is retried with
/// backoff, while [`FailureKind::ClientError`] (permission denial, bad request)
/// is unlikely to heal on its own and can park the poller after a streak.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// Transport-level failure: connection refused, DNS, timeout.
    Network,
    /// The backing resource answered with a server-side error status.
    ServerError,
    /// The request itself was rejected: authentication, permissions, bad input.
    ClientError,
    /// The response arrived but its payload could not be decoded.
    Parse,
}

impl FailureKind {
    /// Returns the stable wire label for this category.
    pub fn as_label(&self) -> &'static str {
        match self {
            FailureKind::Network => "network",
            FailureKind::ServerError => "server-error",
            FailureKind::ClientError => "client-error",
            FailureKind::Parse => "parse-error",
        }
    }
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_label())
    }
}

/// # A failed poller operation.
///
/// Carries the failure category plus a human-readable detail string. Produced
/// by operations via [`FetchOutcome::Failed`](crate::FetchOutcome::Failed),
/// stored in the owning poller's state, and forwarded to subscribers once the
/// failure streak crosses the notification threshold.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{kind} failure: {detail}")]
pub struct FetchFailure {
    /// Machine-readable category.
    pub kind: FailureKind,
    /// Human-readable detail.
    pub detail: String,
}

impl FetchFailure {
    /// Creates a failure with an explicit category.
    pub fn new(kind: FailureKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: detail.into(),
        }
    }

    /// Transport-level failure.
    pub fn network(detail: impl Into<String>) -> Self {
        Self::new(FailureKind::Network, detail)
    }

    /// Server-side error status.
    pub fn server_error(detail: impl Into<String>) -> Self {
        Self::new(FailureKind::ServerError, detail)
    }

    /// Client-side rejection (auth, permissions, bad request).
    pub fn client_error(detail: impl Into<String>) -> Self {
        Self::new(FailureKind::ClientError, detail)
    }

    /// Payload decode failure.
    pub fn parse(detail: impl Into<String>) -> Self {
        Self::new(FailureKind::Parse, detail)
    }

    /// Returns a short stable label for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        self.kind.as_label()
    }

    /// Returns a human-readable message with details about the failure.
    pub fn as_message(&self) -> String {
        format!("{}: {}", self.kind, self.detail)
    }

    /// Indicates whether retrying at backoff cadence is likely to help.
    ///
    /// Returns `false` for [`FailureKind::ClientError`]: a permission denial
    /// does not heal by asking again faster.
    ///
    /// # Example
    /// ```
    /// use refetch::FetchFailure;
    ///
    /// assert!(FetchFailure::network("connection refused").is_retryable());
    /// assert!(!FetchFailure::client_error("403 forbidden").is_retryable());
    /// ```
    pub fn is_retryable(&self) -> bool {
        !matches!(self.kind, FailureKind::ClientError)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_error_labels() {
        assert_eq!(
            RegistryError::DuplicateId { id: "a".into() }.as_label(),
            "duplicate_id"
        );
        assert_eq!(
            RegistryError::UnknownPoller { id: "a".into() }.as_label(),
            "unknown_poller"
        );
        assert_eq!(RegistryError::Disposed.as_label(), "registry_disposed");
        assert_eq!(
            RegistryError::InvalidSpec {
                id: "a".into(),
                reason: "min > max".into()
            }
            .as_label(),
            "invalid_spec"
        );
    }

    #[test]
    fn test_failure_kind_labels() {
        assert_eq!(FailureKind::Network.as_label(), "network");
        assert_eq!(FailureKind::ServerError.as_label(), "server-error");
        assert_eq!(FailureKind::ClientError.as_label(), "client-error");
        assert_eq!(FailureKind::Parse.as_label(), "parse-error");
    }

    #[test]
    fn test_retryable_classification() {
        assert!(FetchFailure::network("x").is_retryable());
        assert!(FetchFailure::server_error("x").is_retryable());
        assert!(FetchFailure::parse("x").is_retryable());
        assert!(!FetchFailure::client_error("x").is_retryable());
    }

    #[test]
    fn test_failure_display() {
        let f = FetchFailure::server_error("503 unavailable");
        assert_eq!(f.to_string(), "server-error failure: 503 unavailable");
        assert_eq!(f.as_message(), "server-error: 503 unavailable");
    }
}
