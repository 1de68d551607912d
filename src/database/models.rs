//! Row models for the local relational store.

use uuid::Uuid;

/// A user known locally, with the public key used to verify signatures
/// they produced.
#[derive(Debug, Clone)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub armored_public_key: String,
    pub key_fingerprint: String,
    pub disabled: bool,
}

impl User {
    /// Display name as shown in trust prompts.
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}
