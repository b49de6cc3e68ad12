//! Cadence policies.
//!
//! This module groups the knobs that control **how often** a poller runs
//! and **how long** it waits after failures.
//!
//! ## Contents
//! - [`BackoffPolicy`] how retry delays evolve after consecutive failures
//! - [`GrowthPolicy`]  how an idle poller's interval lengthens
//! - [`Jitter`]        randomization applied to every computed delay
//!
//! ## Quick wiring
//! ```text
//! PollerSpec { jitter: Jitter, base/min/max intervals }
//! Config     { growth_factor, unchanged_threshold, backoff_factor, ... }
//!      └─► core::actor::PollerActor uses:
//!           - GrowthPolicy::next_interval(..) after an Unchanged outcome
//!           - BackoffPolicy::delay(..) after a Failed outcome
//!           - Jitter::apply(..) on every armed timer
//! ```
//!
//! ## Defaults
//! - `BackoffPolicy { factor: 2.0 }` — double on error.
//! - `GrowthPolicy { factor: 1.5, unchanged_threshold: 3 }` — slow down after
//!   three quiet polls.
//! - `Jitter::None` by default on the policy types; `PollerSpec` defaults to
//!   `Jitter::ratio(0.1)` to desynchronize sibling pollers.

mod backoff;
mod growth;
mod jitter;

pub use backoff::BackoffPolicy;
pub use growth::GrowthPolicy;
pub use jitter::Jitter;

pub(crate) use growth::apply_floor;
