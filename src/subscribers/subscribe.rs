//! # Core subscriber trait
//!
//! `Subscribe` is the extension point for consuming poller results. Each
//! subscription is driven by a dedicated worker loop fed by a bounded queue
//! owned by the registry's subscriber set.
//!
//! ## Contract
//! - Implementations may be slow (I/O, batching, rendering) – they do **not**
//!   block the scheduler nor sibling subscribers.
//! - Each subscriber **declares** its preferred queue capacity via
//!   [`Subscribe::queue_capacity`]. If a queue overflows, updates for that
//!   subscriber are **dropped** (warn).

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::FailureKind;

/// What a subscriber hears about its poller.
#[derive(Clone, Debug)]
pub enum Update {
    /// The poller accepted new content.
    Payload {
        /// Resource id.
        id: Arc<str>,
        /// The accepted payload.
        payload: Bytes,
    },

    /// The poller's failure streak crossed the notification threshold.
    Failing {
        /// Resource id.
        id: Arc<str>,
        /// Category of the latest failure.
        kind: FailureKind,
        /// Human-readable detail of the latest failure.
        detail: Arc<str>,
        /// Length of the streak.
        consecutive_failures: u32,
    },
}

impl Update {
    /// The resource id this update concerns.
    pub fn id(&self) -> &Arc<str> {
        match self {
            Update::Payload { id, .. } => id,
            Update::Failing { id, .. } => id,
        }
    }
}

/// Contract for poller-result subscribers.
///
/// Called from a subscription-dedicated worker task. Implementations should
/// avoid blocking the async runtime (prefer async I/O and cooperative waits).
///
/// # Example
/// ```
/// use async_trait::async_trait;
/// use refetch::{Subscribe, Update};
///
/// struct DashboardTile;
///
/// #[async_trait]
/// impl Subscribe for DashboardTile {
///     async fn on_update(&self, update: &Update) {
///         match update {
///             Update::Payload { payload, .. } => { /* re-render with payload */ }
///             Update::Failing { detail, .. } => { /* show stale badge */ }
///         }
///     }
///
///     fn name(&self) -> &'static str {
///         "dashboard-tile"
///     }
/// }
/// ```
#[async_trait]
pub trait Subscribe: Send + Sync + 'static {
    /// Handle a single update for this subscriber.
    async fn on_update(&self, update: &Update);

    /// Human-readable name (for logs/metrics).
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Preferred capacity of this subscriber's queue.
    ///
    /// On overflow, updates for this subscriber are **dropped** (warn).
    fn queue_capacity(&self) -> usize {
        64
    }
}
