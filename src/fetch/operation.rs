//! # Fetch operation abstraction.
//!
//! This module defines the [`FetchOperation`] trait: the asynchronous,
//! idempotent unit of work a poller invokes on every run. The common handle
//! type is [`OperationRef`], an `Arc<dyn FetchOperation>` suitable for sharing
//! across the runtime.
//!
//! An operation receives the stored [`Validator`] for its resource (if any)
//! and is responsible for presenting it to the backing resource, translating
//! the response into a [`FetchOutcome`]:
//! - "changed" status with a body → [`FetchOutcome::Changed`]
//! - "not modified" status → [`FetchOutcome::Unchanged`]
//! - any error status, transport failure, or parse failure → [`FetchOutcome::Failed`]
//!
//! The scheduler never inspects transport details — this keeps the core
//! protocol-agnostic and testable with a fake operation.

use async_trait::async_trait;
use std::sync::Arc;

use super::outcome::{FetchOutcome, Validator};

/// Shared handle to a fetch operation.
pub type OperationRef = Arc<dyn FetchOperation>;

/// # Asynchronous conditional fetch.
///
/// Implementations must be safe to invoke repeatedly (the scheduler retries
/// freely) and should carry their own internal timeout: an operation that
/// never resolves stalls its own poller, though no sibling pollers.
///
/// # Example
/// ```
/// use async_trait::async_trait;
/// use refetch::{FetchOperation, FetchOutcome, Validator};
///
/// struct Quotes;
///
/// #[async_trait]
/// impl FetchOperation for Quotes {
///     async fn fetch(&self, validator: Option<Validator>) -> FetchOutcome {
///         if validator.as_ref().map(Validator::as_str) == Some("rev-7") {
///             return FetchOutcome::unchanged();
///         }
///         FetchOutcome::changed(&b"{\"spy\":512.3}"[..]).with_validator("rev-7")
///     }
/// }
/// ```
#[async_trait]
pub trait FetchOperation: Send + Sync + 'static {
    /// Performs one conditional fetch.
    ///
    /// `validator` is the version token held from the last accepted response,
    /// absent on the first run or after eviction.
    async fn fetch(&self, validator: Option<Validator>) -> FetchOutcome;
}
