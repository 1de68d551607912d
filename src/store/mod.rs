//! Encrypted key-value store for trust material.
//!
//! The trusted-key record must survive restarts but never touch disk in
//! the clear, so it lives in a small encrypted store separate from the
//! relational database. [`SecureStore`] is the seam; the file-backed
//! implementation in [`cipher`] encrypts the whole store with a key
//! derived from the device secret.

pub mod cipher;
pub mod trusted_key;

use std::collections::HashMap;
use std::sync::Mutex;

use thiserror::Error;

pub use cipher::EncryptedFileStore;
pub use trusted_key::TrustedKeyStore;

/// Errors from the encrypted store.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Store encryption failed: {0}")]
    Crypto(String),

    #[error("Store serialization failed: {0}")]
    Serialization(String),

    #[error("Store IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Store lock poisoned")]
    LockPoisoned,
}

/// Result type for store operations
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// String key-value store with encrypted persistence.
pub trait SecureStore {
    fn get(&self, key: &str) -> StoreResult<Option<String>>;

    fn set(&self, key: &str, value: &str) -> StoreResult<()>;

    fn remove(&self, key: &str) -> StoreResult<()>;
}

/// In-memory store. Backs tests and platforms that provide their own
/// at-rest encryption for the whole data directory.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SecureStore for MemoryStore {
    fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let entries = self.entries.lock().map_err(|_| StoreError::LockPoisoned)?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        let mut entries = self.entries.lock().map_err(|_| StoreError::LockPoisoned)?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> StoreResult<()> {
        let mut entries = self.entries.lock().map_err(|_| StoreError::LockPoisoned)?;
        entries.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_store_set_get_remove() {
        let store = MemoryStore::new();
        assert!(store.get("k").unwrap().is_none());

        store.set("k", "v").unwrap();
        assert_eq!(store.get("k").unwrap().as_deref(), Some("v"));

        store.remove("k").unwrap();
        assert!(store.get("k").unwrap().is_none());
    }
}
