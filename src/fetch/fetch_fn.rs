//! # Function-backed fetch operation (`FetchFn`)
//!
//! [`FetchFn`] wraps a closure `F: Fn(Option<Validator>) -> Fut`, producing a
//! fresh future per run. This avoids shared mutable state between runs; if an
//! operation needs shared state (counters, a client handle), capture an
//! `Arc<...>` explicitly inside the closure.
//!
//! ## Example
//! ```rust
//! use refetch::{FetchFn, FetchOutcome, OperationRef, Validator};
//!
//! let op: OperationRef = FetchFn::arc(|validator: Option<Validator>| async move {
//!     if validator.is_some() {
//!         return FetchOutcome::unchanged();
//!     }
//!     FetchOutcome::changed(&b"fresh"[..]).with_validator("v1")
//! });
//! ```

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;

use super::operation::FetchOperation;
use super::outcome::{FetchOutcome, Validator};

/// Function-backed operation implementation.
///
/// Wraps a closure that *creates* a new future per run.
pub struct FetchFn<F> {
    f: F,
}

impl<F> FetchFn<F> {
    /// Creates a new function-backed operation.
    ///
    /// Prefer [`FetchFn::arc`] when you immediately need an [`OperationRef`].
    pub fn new(f: F) -> Self {
        Self { f }
    }

    /// Creates the operation and returns it as a shared handle.
    pub fn arc(f: F) -> Arc<Self> {
        Arc::new(Self::new(f))
    }
}

#[async_trait]
impl<F, Fut> FetchOperation for FetchFn<F>
where
    F: Fn(Option<Validator>) -> Fut + Send + Sync + 'static, // Fn, not FnMut
    Fut: Future<Output = FetchOutcome> + Send + 'static,
{
    async fn fetch(&self, validator: Option<Validator>) -> FetchOutcome {
        (self.f)(validator).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_closure_sees_validator() {
        let op = FetchFn::new(|validator: Option<Validator>| async move {
            match validator {
                Some(_) => FetchOutcome::unchanged(),
                None => FetchOutcome::changed(&b"first"[..]).with_validator("v1"),
            }
        });

        assert!(op.fetch(None).await.is_changed());
        assert!(op.fetch(Some(Validator::from("v1"))).await.is_unchanged());
    }
}
