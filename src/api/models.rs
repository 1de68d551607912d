//! Wire models for the metadata endpoints.
//!
//! Only the fields the engine consumes are modeled; unknown fields in
//! server responses are ignored.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A metadata key as served by the backend, with the per-user encrypted
/// private-key copies the current user may be able to decrypt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetadataKeyDto {
    pub id: Uuid,
    pub fingerprint: String,
    pub armored_key: String,
    pub modified: DateTime<Utc>,
    pub expired: Option<DateTime<Utc>>,
    pub deleted: Option<DateTime<Utc>>,
    #[serde(default)]
    pub metadata_private_keys: Vec<MetadataPrivateKeyDto>,
}

/// One encrypted private-key copy, addressed to a single user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetadataPrivateKeyDto {
    pub id: Uuid,
    pub metadata_key_id: Uuid,
    pub user_id: Uuid,
    /// Armored PGP message carrying the encrypted (and possibly signed)
    /// private-key payload.
    pub data: String,
    pub created: DateTime<Utc>,
    pub created_by: Option<Uuid>,
    pub modified: DateTime<Utc>,
    pub modified_by: Option<Uuid>,
}

/// A server-side session-key bundle: an opaque encrypted container of
/// per-resource session keys.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionKeyBundleDto {
    pub id: Uuid,
    /// Armored encrypted-and-signed bundle payload.
    pub data: String,
    pub created: DateTime<Utc>,
    pub modified: DateTime<Utc>,
}

/// Request body for re-uploading a freshly signed private-key copy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateMetadataPrivateKeyRequest {
    pub id: Uuid,
    pub data: String,
}

/// Request body for creating or replacing a session-key bundle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionKeyBundleUpload {
    pub data: String,
}
