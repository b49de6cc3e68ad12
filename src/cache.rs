//! # Conditional cache: last-known validator and payload per resource.
//!
//! [`ConditionalCache`] is the keyed store behind conditional fetches. For each
//! resource id it remembers the last server-supplied [`Validator`], a SHA-256
//! fingerprint of the last accepted payload, and the payload itself (so callers
//! can be served the held value when the server reports "not modified").
//!
//! ## Rules
//! - Entries are recorded only after a `Changed` outcome is accepted.
//! - Recording identical content is a no-op ([`Recorded::Identical`]), so a
//!   server that re-sends an unchanged body never triggers duplicate change
//!   notifications downstream.
//! - Entries live for the registry's process lifetime and are evicted when
//!   their poller is stopped. Nothing is persisted across restarts.
//! - Each id is only ever written by its own poller; the internal lock exists
//!   for the read side (operations and diagnostics may look entries up at any
//!   time).

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::SystemTime;

use bytes::Bytes;
use sha2::{Digest, Sha256};

use crate::fetch::Validator;

/// Content fingerprint of a payload.
pub type PayloadDigest = [u8; 32];

/// A single cached resource snapshot.
#[derive(Clone, Debug)]
pub struct CacheEntry {
    /// Opaque version token from the last accepted response, if the server sent one.
    pub validator: Option<Validator>,
    /// SHA-256 fingerprint of the last accepted payload.
    pub digest: PayloadDigest,
    /// The last accepted payload.
    pub payload: Bytes,
    /// When the entry was recorded.
    pub recorded_at: SystemTime,
}

/// Result of [`ConditionalCache::record`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Recorded {
    /// The entry changed: new validator and/or new content.
    Fresh,
    /// Validator and content match what is already held; nothing was written.
    Identical,
}

/// Keyed store of last-known validators and payloads.
///
/// Cheap to share (`Arc`) between a registry, its pollers, and caller-supplied
/// operations that want to consult the held validator themselves.
#[derive(Debug, Default)]
pub struct ConditionalCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
}

impl ConditionalCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a clone of the entry for `id`, if one is held.
    pub fn lookup(&self, id: &str) -> Option<CacheEntry> {
        self.read().get(id).cloned()
    }

    /// Returns the held validator for `id`, if any.
    ///
    /// This is what a poller presents to the server as its "has this changed
    /// since token X?" hint.
    pub fn validator(&self, id: &str) -> Option<Validator> {
        self.read().get(id).and_then(|e| e.validator.clone())
    }

    /// Returns the held payload for `id`, if any.
    pub fn payload(&self, id: &str) -> Option<Bytes> {
        self.read().get(id).map(|e| e.payload.clone())
    }

    /// Records a newly accepted payload for `id`.
    ///
    /// If both the validator and the content fingerprint match the held entry,
    /// nothing is written and [`Recorded::Identical`] is returned — callers use
    /// this to suppress duplicate change notifications.
    pub fn record(&self, id: &str, validator: Option<Validator>, payload: Bytes) -> Recorded {
        let digest = Self::digest(&payload);
        let mut entries = self.write();

        if let Some(held) = entries.get(id) {
            if held.digest == digest && held.validator == validator {
                return Recorded::Identical;
            }
        }

        entries.insert(
            id.to_string(),
            CacheEntry {
                validator,
                digest,
                payload,
                recorded_at: SystemTime::now(),
            },
        );
        Recorded::Fresh
    }

    /// Acknowledges a "not modified" response for `id`.
    ///
    /// Deliberately a no-op: an unchanged resource leaves the cache exactly
    /// as it is, held payload included.
    pub fn mark_unchanged(&self, id: &str) {
        let _ = id;
    }

    /// Drops the entry for `id`. Returns whether an entry was held.
    pub fn evict(&self, id: &str) -> bool {
        self.write().remove(id).is_some()
    }

    /// Number of held entries.
    pub fn len(&self) -> usize {
        self.read().len()
    }

    /// True if no entries are held.
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Computes the content fingerprint of a payload.
    pub fn digest(payload: &[u8]) -> PayloadDigest {
        let mut hasher = Sha256::new();
        hasher.update(payload);
        hasher.finalize().into()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, HashMap<String, CacheEntry>> {
        self.entries.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<String, CacheEntry>> {
        self.entries.write().unwrap_or_else(|e| e.into_inner())
    }
}
