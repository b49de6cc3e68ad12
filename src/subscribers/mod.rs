//! # Data subscribers for poller results.
//!
//! This module provides the [`Subscribe`] trait and the fan-out machinery that
//! delivers accepted payloads and failure streaks to interested listeners.
//!
//! ## Architecture
//! ```text
//! PollerActor ── publish(Event) ──► Bus ──► update listener (in Registry)
//!                                              │
//!                                              ▼
//!                                       SubscriberSet::emit(&Event)
//!                                              │  (filter by poller id,
//!                                              │   gate failures by streak)
//!                                   ┌──────────┼──────────┐
//!                                   ▼          ▼          ▼
//!                              [queue S1] [queue S2] [queue SN]
//!                                   │          │          │
//!                              worker S1  worker S2  worker SN
//!                                   │          │          │
//!                            sub.on_update(&Update)  (per subscription)
//! ```
//!
//! ## Rules
//! - Subscribers hear about **accepted changes** ([`Update::Payload`]) and
//!   about pollers whose failure streak crossed the notification threshold
//!   ([`Update::Failing`]). Single failure blips stay quiet.
//! - Delivery is non-blocking: a slow subscriber overflows its own queue and
//!   drops updates; siblings are unaffected.
//! - Panics inside subscribers are caught and reported, never propagated.

mod set;
mod subscribe;

#[cfg(feature = "logging")]
mod log;

pub use set::Subscription;
pub use subscribe::{Subscribe, Update};

pub(crate) use set::SubscriberSet;

#[cfg(feature = "logging")]
pub use log::LogWriter;
