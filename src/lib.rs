//! # refetch
//!
//! **Refetch** is an adaptive polling and synchronization scheduler for Rust.
//!
//! It keeps many independently-paced recurring fetches fresh against one
//! constrained, possibly-flaky backend: per-resource pollers with adaptive
//! cadence, conditional (cache-validating) fetches, visibility-aware
//! suspend/resume, and bounded jittered backoff with cross-poller outage
//! coordination. Built for data that changes slowly and tolerates staleness
//! of tens of seconds — portfolio values, market prices, news, dashboard
//! aggregates.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!     ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//!     │  PollerSpec  │   │  PollerSpec  │   │  PollerSpec  │
//!     │  ("prices")  │   │   ("news")   │   │ ("networth") │
//!     └──────┬───────┘   └──────┬───────┘   └──────┬───────┘
//!            ▼                  ▼                  ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  Registry (scheduler)                                             │
//! │  - Bus (broadcast events)                                         │
//! │  - ConditionalCache (validator + payload per resource)            │
//! │  - PenaltyTracker (cross-poller outage coordination)              │
//! │  - SubscriberSet (payload/failure fan-out per poller id)          │
//! └──────┬──────────────────┬──────────────────┬──────────────────────┘
//!        ▼                  ▼                  ▼
//!     ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//!     │ PollerActor  │   │ PollerActor  │   │ PollerActor  │
//!     │(poll loop)   │   │(poll loop)   │   │(poll loop)   │
//!     └┬─────────────┘   └┬─────────────┘   └┬─────────────┘
//!      │ Publishes        │ Publishes        │ Publishes
//!      │ Events:          │ Events:          │ Events:
//!      │ - PollStarting   │ - PayloadChanged │ - PollFailed
//!      │ - PayloadChanged │ - PollerPaused   │ - BackoffSched.
//!      ▼                  ▼                  ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │                        Bus (broadcast channel)                    │
//! └─────────────────────────────────┬─────────────────────────────────┘
//!                                   ▼
//!                         ┌──────────────────┐
//!                         │ update listener  │
//!                         │  (in Registry)   │
//!                         └────────┬─────────┘
//!                                  ▼
//!                            SubscriberSet
//!                        ┌─────────┼─────────┐
//!                        ▼         ▼         ▼
//!                     worker1   worker2   workerN
//!                        ▼         ▼         ▼
//!                  sub1.on_update()  ...  subN.on_update()
//! ```
//!
//! ### Poll loop
//! ```text
//! PollerSpec ──► Registry::start ──► PollerActor::run()
//!
//! loop {
//!   ├─► arm timer: steady interval (jittered), backoff delay, or
//!   │             max interval while the host is hidden (downshift)
//!   ├─► timer fires │ manual refresh ──► run
//!   ├─► operation.fetch(held validator)
//!   │       │
//!   │       ├─ Changed   ──► cache.record, reset streaks,
//!   │       │               interval = base, notify subscribers
//!   │       ├─ Unchanged ──► unchanged streak += 1,
//!   │       │               lengthen interval after threshold
//!   │       └─ Failed    ──► failure streak += 1,
//!   │                       delay = backoff(streak) × shared penalty,
//!   │                       notify subscribers past the streak threshold
//!   │
//!   └─ exit conditions:
//!        - registry stop/stop_all (in-flight result discarded)
//!        - client-error streak parks the poller until an explicit refresh
//! }
//! ```
//!
//! ## Features
//! | Area              | Description                                                             | Key types / traits                       |
//! |-------------------|-------------------------------------------------------------------------|------------------------------------------|
//! | **Operations**    | Bring conditional fetches as trait impls or plain closures.             | [`FetchOperation`], [`FetchFn`]          |
//! | **Cadence**       | Adaptive intervals, growth on idle streaks, jitter, backoff.            | [`GrowthPolicy`], [`BackoffPolicy`], [`Jitter`] |
//! | **Caching**       | Validator + payload digest per resource, "not modified" aware.          | [`ConditionalCache`], [`Recorded`]       |
//! | **Scheduling**    | Start/stop/refresh pollers, visibility-aware pause and downshift.       | [`Registry`], [`PollerSpec`]             |
//! | **Subscriptions** | Hear accepted payloads and failure streaks per poller.                  | [`Subscribe`], [`Update`]                |
//! | **Errors**        | Typed misuse errors and categorized fetch failures.                     | [`RegistryError`], [`FetchFailure`]      |
//! | **Observability** | Sequenced event stream for diagnostics and logging.                     | [`Event`], [`EventKind`]                 |
//!
//! ## Optional features
//! - `logging`: exports a simple built-in [`LogWriter`] _(demo/reference only)_.
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use refetch::{Config, FetchFn, FetchOutcome, Jitter, PollerSpec, Registry, Validator};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let registry = Registry::new(Config::default());
//!
//!     // A conditional fetch: present the held validator, report the outcome.
//!     let quotes = FetchFn::arc(|validator: Option<Validator>| async move {
//!         if validator.as_ref().map(Validator::as_str) == Some("rev-7") {
//!             return FetchOutcome::unchanged();
//!         }
//!         FetchOutcome::changed(&b"{\"spy\":512.3}"[..]).with_validator("rev-7")
//!     });
//!
//!     let spec = PollerSpec::new("prices", quotes, Duration::from_secs(30))
//!         .with_bounds(Duration::from_secs(10), Duration::from_secs(300))
//!         .with_jitter(Jitter::ratio(0.1));
//!
//!     let handle = registry.start(spec).await?;
//!     println!("started poller {}", handle.id());
//!
//!     // ... hand the registry to the rest of the application ...
//!     registry.stop_all().await;
//!     Ok(())
//! }
//! ```

mod cache;
mod config;
mod core;
mod error;
mod events;
mod fetch;
mod policies;
mod subscribers;

// ---- Public re-exports ----

pub use cache::{CacheEntry, ConditionalCache, PayloadDigest, Recorded};
pub use config::Config;
pub use crate::core::{PollStatus, PollerHandle, PollerStatus, Registry};
pub use error::{FailureKind, FetchFailure, RegistryError};
pub use events::{Bus, Event, EventKind};
pub use fetch::{FetchFn, FetchOperation, FetchOutcome, OperationRef, PollerSpec, Validator};
pub use policies::{BackoffPolicy, GrowthPolicy, Jitter};
pub use subscribers::{Subscribe, Subscription, Update};

// Optional: expose a simple built-in event logger (demo/reference).
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use subscribers::LogWriter;
