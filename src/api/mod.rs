//! Backend API surface consumed by the engine.
//!
//! [`MetadataApi`] abstracts the metadata endpoints so the engines can
//! be exercised against fakes; [`client::ApiClient`] is the reqwest
//! implementation. [`ApiError`] preserves the backend's authentication
//! classification so failures map onto [`AuthenticationState`] without
//! loss.

pub mod client;
pub mod models;

use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::auth::{AuthenticationState, MfaProvider, UnauthenticatedReason};
use models::{MetadataKeyDto, SessionKeyBundleDto};

/// Errors from the backend API.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Session rejected by the backend")]
    Unauthorized,

    #[error("Multi-factor authentication required")]
    MfaRequired(Vec<MfaProvider>),

    #[error("Resource was modified concurrently")]
    Conflict,

    #[error("HTTP error {status}: {message}")]
    Http { status: u16, message: String },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Invalid response: {0}")]
    Decode(String),
}

impl ApiError {
    /// The authentication state this failure implies for the caller.
    ///
    /// Non-authentication failures (transport, server errors, conflicts)
    /// leave the session usable.
    pub fn authentication_state(&self) -> AuthenticationState {
        match self {
            ApiError::Unauthorized => {
                AuthenticationState::Unauthenticated(UnauthenticatedReason::Session)
            }
            ApiError::MfaRequired(providers) => {
                AuthenticationState::Unauthenticated(UnauthenticatedReason::Mfa(providers.clone()))
            }
            _ => AuthenticationState::Authenticated,
        }
    }
}

/// Result type for API operations
pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// Metadata endpoints of the backend.
pub trait MetadataApi {
    /// List all metadata keys, including the current user's encrypted
    /// private-key copies.
    fn fetch_metadata_keys(&self) -> impl std::future::Future<Output = ApiResult<Vec<MetadataKeyDto>>> + Send;

    /// Upload a re-signed private-key copy.
    fn update_metadata_private_key(
        &self,
        id: Uuid,
        data: &str,
    ) -> impl std::future::Future<Output = ApiResult<()>> + Send;

    /// List the session-key bundles visible to the current user.
    fn fetch_session_key_bundles(
        &self,
    ) -> impl std::future::Future<Output = ApiResult<Vec<SessionKeyBundleDto>>> + Send;

    /// Create a new session-key bundle.
    fn post_session_key_bundle(
        &self,
        data: &str,
    ) -> impl std::future::Future<Output = ApiResult<()>> + Send;

    /// Replace an existing bundle. `last_modified` is the modification
    /// timestamp last seen by this client; the backend rejects the write
    /// with [`ApiError::Conflict`] if another client updated the bundle
    /// in the meantime.
    fn update_session_key_bundle(
        &self,
        id: Uuid,
        last_modified: DateTime<Utc>,
        data: &str,
    ) -> impl std::future::Future<Output = ApiResult<()>> + Send;
}
