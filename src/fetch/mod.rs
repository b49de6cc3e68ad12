//! # Fetch abstractions and poller specifications.
//!
//! This module provides the types a caller brings to the scheduler:
//! - [`FetchOperation`] - trait for implementing async conditional fetches
//! - [`FetchFn`] - function-backed operation implementation
//! - [`OperationRef`] - shared reference to an operation (`Arc<dyn FetchOperation>`)
//! - [`FetchOutcome`] / [`Validator`] - the conditional-fetch contract
//! - [`PollerSpec`] - specification bundling an operation with cadence policy

mod fetch_fn;
mod operation;
mod outcome;
mod spec;

pub use fetch_fn::FetchFn;
pub use operation::{FetchOperation, OperationRef};
pub use outcome::{FetchOutcome, Validator};
pub use spec::PollerSpec;
