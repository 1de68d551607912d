//! KeyHaven Core Library
//!
//! This library provides the core functionality for the KeyHaven password
//! manager client: metadata-key trust verification, metadata key
//! decryption, and session-key cache synchronization.

pub mod accounts;
pub mod api;
pub mod auth;
pub mod database;
pub mod metadata;
pub mod passphrase;
pub mod pgp;
pub mod session_keys;
pub mod store;

#[cfg(test)]
pub(crate) mod test_support;

pub use auth::{AuthenticationState, MfaProvider, UnauthenticatedReason};
pub use metadata::{MetadataKeysPipeline, TrustEngine, TrustOutput};
pub use passphrase::{PassphraseMemoryCache, PotentialPassphrase};
pub use pgp::{PgpError, PgpSuite, VerifiedMessage};
pub use session_keys::SessionKeyCacheManager;

use thiserror::Error;

/// Result type for KeyHaven core operations
pub type Result<T> = std::result::Result<T, CoreError>;

/// General error type for KeyHaven core operations
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("PGP error: {0}")]
    Pgp(#[from] pgp::PgpError),

    #[error("API error: {0}")]
    Api(#[from] api::ApiError),

    #[error("Database error: {0}")]
    Database(#[from] database::DatabaseError),

    #[error("Store error: {0}")]
    Store(#[from] store::StoreError),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Invariant violation: {0}")]
    Internal(String),
}

impl From<serde_json::Error> for CoreError {
    fn from(e: serde_json::Error) -> Self {
        CoreError::Serialization(e.to_string())
    }
}
