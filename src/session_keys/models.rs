//! Session-key bundle payloads and cache entries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Object-type marker required inside a decrypted bundle payload.
pub const SESSION_KEYS_OBJECT_TYPE: &str = "KEYHAVEN_SESSION_KEYS";

/// One per-resource session key as carried inside a bundle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionKeyDto {
    /// Resource kind the key belongs to (e.g. "Resource", "Folder").
    pub foreign_model: String,
    pub foreign_id: Uuid,
    pub session_key: String,
    pub modified: DateTime<Utc>,
}

/// Decrypted payload of a session-key bundle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionKeysBundle {
    pub object_type: String,
    pub session_keys: Vec<SessionKeyDto>,
}

impl SessionKeysBundle {
    pub fn new(session_keys: Vec<SessionKeyDto>) -> Self {
        Self {
            object_type: SESSION_KEYS_OBJECT_TYPE.to_string(),
            session_keys,
        }
    }

    /// Whether the payload is a well-formed session-key bundle.
    pub fn is_valid(&self) -> bool {
        self.object_type == SESSION_KEYS_OBJECT_TYPE
    }
}

/// Identity of a session key within the merged cache.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionKeyIdentifier {
    pub foreign_model: String,
    pub foreign_id: Uuid,
}

/// Cached session-key material with the modification time used for
/// merge tie-breaking.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionKey {
    pub session_key: String,
    pub modified: DateTime<Utc>,
}

/// A successfully decrypted and validated server-side bundle.
#[derive(Debug, Clone)]
pub struct DecryptedBundle {
    pub id: Uuid,
    pub created: DateTime<Utc>,
    pub modified: DateTime<Utc>,
    pub bundle: SessionKeysBundle,
}
