//! Shared in-memory session-key cache.
//!
//! The cache is the single merged view over all bundles, held only in
//! memory. Resource operations elsewhere in the client read keys from it
//! and append freshly generated ones; the manager rebuilds it on fetch
//! and pushes it back on persist.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::session_keys::merge::MergedSessionKeys;
use crate::session_keys::models::{SessionKey, SessionKeyDto, SessionKeyIdentifier, SessionKeysBundle};

#[derive(Default)]
struct CacheState {
    keys: HashMap<SessionKeyIdentifier, SessionKey>,
    origin: HashMap<Uuid, DateTime<Utc>>,
    was_initially_empty: bool,
    locally_modified: bool,
}

/// Process-wide session-key cache. Cloning shares the underlying state.
#[derive(Clone, Default)]
pub struct SessionKeysCache {
    inner: Arc<RwLock<CacheState>>,
}

impl SessionKeysCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the cache with a freshly merged fetch result. Resets the
    /// modification flags; `was_initially_empty` records whether the
    /// server had any bundle at all.
    pub fn replace(&self, merged: MergedSessionKeys) {
        let mut state = self.inner.write().unwrap_or_else(|e| e.into_inner());
        state.was_initially_empty = merged.origin.is_empty();
        state.locally_modified = false;
        state.keys = merged.keys;
        state.origin = merged.origin;
    }

    /// Swap in a conflict-recovery merge without touching the flags.
    pub fn adopt(&self, merged: MergedSessionKeys) {
        let mut state = self.inner.write().unwrap_or_else(|e| e.into_inner());
        state.keys = merged.keys;
        state.origin = merged.origin;
    }

    pub fn get(&self, identifier: &SessionKeyIdentifier) -> Option<SessionKey> {
        let state = self.inner.read().unwrap_or_else(|e| e.into_inner());
        state.keys.get(identifier).cloned()
    }

    /// Add or overwrite a key from a local resource operation.
    pub fn insert(&self, identifier: SessionKeyIdentifier, key: SessionKey) {
        let mut state = self.inner.write().unwrap_or_else(|e| e.into_inner());
        state.keys.insert(identifier, key);
        state.locally_modified = true;
    }

    pub fn len(&self) -> usize {
        let state = self.inner.read().unwrap_or_else(|e| e.into_inner());
        state.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether the last fetch found no bundles server-side.
    pub fn was_initially_empty(&self) -> bool {
        let state = self.inner.read().unwrap_or_else(|e| e.into_inner());
        state.was_initially_empty
    }

    /// Whether local resource operations changed the cache since the
    /// last fetch.
    pub fn is_locally_modified(&self) -> bool {
        let state = self.inner.read().unwrap_or_else(|e| e.into_inner());
        state.locally_modified
    }

    /// The origin bundle to target with an update: the one the server
    /// modified last, with the timestamp to send for conflict detection.
    pub fn find_latest_modified_origin(&self) -> Option<(Uuid, DateTime<Utc>)> {
        let state = self.inner.read().unwrap_or_else(|e| e.into_inner());
        state
            .origin
            .iter()
            .max_by_key(|(id, modified)| (**modified, **id))
            .map(|(id, modified)| (*id, *modified))
    }

    /// Snapshot the cache as an uploadable bundle payload.
    pub fn export_bundle(&self) -> SessionKeysBundle {
        let state = self.inner.read().unwrap_or_else(|e| e.into_inner());
        let session_keys = state
            .keys
            .iter()
            .map(|(identifier, key)| SessionKeyDto {
                foreign_model: identifier.foreign_model.clone(),
                foreign_id: identifier.foreign_id,
                session_key: key.session_key.clone(),
                modified: key.modified,
            })
            .collect();
        SessionKeysBundle::new(session_keys)
    }
}
