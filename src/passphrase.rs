//! In-memory passphrase cache shared across the engine.
//!
//! The passphrase is captured at unlock, kept only for the lifetime of
//! the process and wiped on lock/logout. Components take the cache as a
//! constructor dependency; nothing here is persisted.

use std::sync::{Arc, RwLock};
use zeroize::Zeroizing;

/// Outcome of a cache read.
pub enum PotentialPassphrase {
    Passphrase(Zeroizing<Vec<u8>>),
    NotPresent,
}

/// Process-lifetime passphrase cache.
///
/// Cloning shares the underlying slot; all clones observe the same
/// populate/clear lifecycle.
#[derive(Clone, Default)]
pub struct PassphraseMemoryCache {
    slot: Arc<RwLock<Option<Zeroizing<Vec<u8>>>>>,
}

impl PassphraseMemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Populate the cache at unlock.
    pub fn set(&self, passphrase: &[u8]) {
        let mut slot = self.slot.write().unwrap_or_else(|e| e.into_inner());
        *slot = Some(Zeroizing::new(passphrase.to_vec()));
    }

    /// Read a copy of the cached passphrase.
    pub fn get(&self) -> PotentialPassphrase {
        let slot = self.slot.read().unwrap_or_else(|e| e.into_inner());
        match slot.as_ref() {
            Some(bytes) => PotentialPassphrase::Passphrase(Zeroizing::new(bytes.to_vec())),
            None => PotentialPassphrase::NotPresent,
        }
    }

    /// Wipe the cache at lock/logout.
    pub fn clear(&self) {
        let mut slot = self.slot.write().unwrap_or_else(|e| e.into_inner());
        *slot = None;
    }
}
