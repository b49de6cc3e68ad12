//! # Simple event logger for debugging and demos.
//!
//! [`LogWriter`] drains a registry's event stream and writes each event
//! through the `log` facade in a compact, human-readable format.
//!
//! ## Output format
//! ```text
//! [starting] poller=prices
//! [changed] poller=prices interval=30000ms
//! [unchanged] poller=prices interval=45000ms
//! [failed] poller=prices failures=2 reason="network failure: connection refused"
//! [backoff] poller=prices delay=4000ms failures=2
//! [paused] poller=prices reason="hidden"
//! [penalty-engaged] reason="4 of 5 pollers failing"
//! ```
//!
//! ## Example
//! ```no_run
//! # use refetch::{Config, LogWriter, Registry};
//! let registry = Registry::new(Config::default());
//! LogWriter::spawn(registry.events());
//! ```
//!
//! Not intended for production use - drain `Registry::events()` yourself for
//! structured logging or metrics collection.

use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;

use crate::events::{Event, EventKind};

/// Event-stream logger. Enabled via the `logging` feature.
pub struct LogWriter;

impl LogWriter {
    /// Spawns a task that logs every event until the stream closes.
    pub fn spawn(mut events: broadcast::Receiver<Event>) -> JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(ev) => Self::write(&ev),
                    Err(RecvError::Closed) => break,
                    Err(RecvError::Lagged(n)) => {
                        log::warn!("event log lagged, skipped {n} events");
                    }
                }
            }
        })
    }

    fn write(ev: &Event) {
        let poller = ev.poller.as_deref().unwrap_or("-");
        match ev.kind {
            EventKind::PollerAdded => log::info!("[added] poller={poller}"),
            EventKind::PollerRemoved => log::info!("[removed] poller={poller}"),
            EventKind::RefreshRequested => log::debug!("[refresh] poller={poller}"),
            EventKind::PollStarting => log::debug!("[starting] poller={poller}"),
            EventKind::PayloadChanged => log::info!(
                "[changed] poller={poller} interval={}ms",
                ev.interval_ms.unwrap_or(0)
            ),
            EventKind::PayloadUnchanged => log::debug!(
                "[unchanged] poller={poller} interval={}ms",
                ev.interval_ms.unwrap_or(0)
            ),
            EventKind::PollFailed => log::warn!(
                "[failed] poller={poller} failures={} reason={:?}",
                ev.failures.unwrap_or(0),
                ev.reason.as_deref().unwrap_or("")
            ),
            EventKind::BackoffScheduled => log::info!(
                "[backoff] poller={poller} delay={}ms failures={}",
                ev.delay_ms.unwrap_or(0),
                ev.failures.unwrap_or(0)
            ),
            EventKind::PollerPaused => log::info!(
                "[paused] poller={poller} reason={:?}",
                ev.reason.as_deref().unwrap_or("")
            ),
            EventKind::PollerResumed => log::info!("[resumed] poller={poller}"),
            EventKind::PollerDownshifted => log::info!(
                "[downshifted] poller={poller} interval={}ms",
                ev.interval_ms.unwrap_or(0)
            ),
            EventKind::VisibilityChanged => {
                log::info!("[visibility] hidden={}", ev.hidden.unwrap_or(false))
            }
            EventKind::PenaltyEngaged => log::warn!(
                "[penalty-engaged] reason={:?}",
                ev.reason.as_deref().unwrap_or("")
            ),
            EventKind::PenaltyCleared => log::info!("[penalty-cleared]"),
            EventKind::SubscriberOverflow => log::warn!(
                "[subscriber-overflow] poller={poller} reason={:?}",
                ev.reason.as_deref().unwrap_or("")
            ),
            EventKind::SubscriberPanicked => log::error!(
                "[subscriber-panicked] poller={poller} reason={:?}",
                ev.reason.as_deref().unwrap_or("")
            ),
        }
    }
}
