//! File-backed encrypted store.
//!
//! The store is a single file holding an AES-256-GCM sealed JSON map.
//! The sealing key is derived from a device secret with Argon2id; the
//! KDF salt and the nonce travel in the file header so the store can be
//! reopened with the secret alone.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use aes_gcm::{
    aead::{Aead, AeadCore, KeyInit, OsRng},
    Aes256Gcm, Nonce,
};
use argon2::{Algorithm, Argon2, Params, Version};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

use crate::store::{SecureStore, StoreError, StoreResult};

/// Argon2id parameters for the store sealing key.
///
/// Sized for an interactive client unlock rather than a server-side
/// password hash.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreKdfParams {
    pub salt: [u8; 16],
    pub mem_cost: u32,
    pub time_cost: u32,
    pub parallelism: u32,
}

impl Default for StoreKdfParams {
    fn default() -> Self {
        Self {
            salt: rand::random(),
            mem_cost: 19_456, // 19 MiB
            time_cost: 2,
            parallelism: 1,
        }
    }
}

/// The derived sealing key. Zeroized on drop.
struct StoreKey {
    key: [u8; 32],
}

impl Drop for StoreKey {
    fn drop(&mut self) {
        self.key.zeroize();
    }
}

/// On-disk layout of the store file.
#[derive(Serialize, Deserialize)]
struct StoreFile {
    kdf: StoreKdfParams,
    nonce: [u8; 12],
    /// Base64 AES-256-GCM ciphertext of the JSON entry map, tag appended.
    ciphertext: String,
}

fn derive_store_key(secret: &[u8], params: &StoreKdfParams) -> StoreResult<StoreKey> {
    let argon_params = Params::new(params.mem_cost, params.time_cost, params.parallelism, Some(32))
        .map_err(|e| StoreError::Crypto(format!("Invalid KDF parameters: {}", e)))?;
    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, argon_params);

    let mut key = [0u8; 32];
    argon2
        .hash_password_into(secret, &params.salt, &mut key)
        .map_err(|e| StoreError::Crypto(format!("Key derivation failed: {}", e)))?;
    Ok(StoreKey { key })
}

/// Encrypted store persisted to a single file.
pub struct EncryptedFileStore {
    path: PathBuf,
    key: StoreKey,
    kdf: StoreKdfParams,
    entries: Mutex<HashMap<String, String>>,
}

impl EncryptedFileStore {
    /// Open the store at `path`, creating an empty one if the file does
    /// not exist. `secret` is the device secret the sealing key is
    /// derived from.
    pub fn open<P: AsRef<Path>>(path: P, secret: &[u8]) -> StoreResult<Self> {
        Self::open_with_params(path, secret, StoreKdfParams::default())
    }

    /// Open with explicit KDF parameters for a fresh store. An existing
    /// file keeps the parameters it was created with.
    pub fn open_with_params<P: AsRef<Path>>(
        path: P,
        secret: &[u8],
        fresh_params: StoreKdfParams,
    ) -> StoreResult<Self> {
        let path = path.as_ref().to_path_buf();

        if path.exists() {
            let raw = std::fs::read_to_string(&path)?;
            let file: StoreFile = serde_json::from_str(&raw)
                .map_err(|e| StoreError::Serialization(e.to_string()))?;
            let key = derive_store_key(secret, &file.kdf)?;
            let entries = Self::unseal(&key, &file)?;
            Ok(Self {
                path,
                key,
                kdf: file.kdf,
                entries: Mutex::new(entries),
            })
        } else {
            let key = derive_store_key(secret, &fresh_params)?;
            Ok(Self {
                path,
                key,
                kdf: fresh_params,
                entries: Mutex::new(HashMap::new()),
            })
        }
    }

    fn unseal(key: &StoreKey, file: &StoreFile) -> StoreResult<HashMap<String, String>> {
        let cipher = Aes256Gcm::new((&key.key).into());
        let ciphertext = BASE64
            .decode(&file.ciphertext)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        let plaintext = cipher
            .decrypt(Nonce::from_slice(&file.nonce), ciphertext.as_slice())
            .map_err(|_| StoreError::Crypto("Store authentication failed".to_string()))?;
        serde_json::from_slice(&plaintext).map_err(|e| StoreError::Serialization(e.to_string()))
    }

    fn flush(&self, entries: &HashMap<String, String>) -> StoreResult<()> {
        let plaintext = serde_json::to_vec(entries)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;

        let cipher = Aes256Gcm::new((&self.key.key).into());
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let ciphertext = cipher
            .encrypt(&nonce, plaintext.as_slice())
            .map_err(|e| StoreError::Crypto(format!("{}", e)))?;

        let file = StoreFile {
            kdf: self.kdf.clone(),
            nonce: nonce.into(),
            ciphertext: BASE64.encode(ciphertext),
        };
        let raw = serde_json::to_string(&file)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        std::fs::write(&self.path, raw)?;
        Ok(())
    }
}

impl SecureStore for EncryptedFileStore {
    fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let entries = self.entries.lock().map_err(|_| StoreError::LockPoisoned)?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        let mut entries = self.entries.lock().map_err(|_| StoreError::LockPoisoned)?;
        entries.insert(key.to_string(), value.to_string());
        self.flush(&entries)
    }

    fn remove(&self, key: &str) -> StoreResult<()> {
        let mut entries = self.entries.lock().map_err(|_| StoreError::LockPoisoned)?;
        entries.remove(key);
        self.flush(&entries)
    }
}
