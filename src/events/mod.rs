//! Scheduler events: types and broadcast bus.
//!
//! This module groups the event **data model** and the **bus** used to
//! publish/subscribe to runtime events emitted by the registry, poller actors,
//! penalty tracker, and subscriber workers.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and payload metadata
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: `Registry`, `PollerActor`, `PenaltyTracker`,
//!   `SubscriberSet` workers (overflow/panic).
//! - **Consumers**: the registry's update listener (routes payload/failure
//!   events to subscribers), `Registry::events()` receivers (diagnostics,
//!   `LogWriter`).

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};
