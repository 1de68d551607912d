//! Authentication status carried by engine outcomes.
//!
//! Every engine operation reports whether the caller must re-authenticate
//! before retrying, and for which reason. Mirrors the backend's session
//! and MFA semantics; the UI layer maps these to the matching prompts.

use serde::{Deserialize, Serialize};

/// Whether the account session is usable, and if not, why.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthenticationState {
    Authenticated,
    Unauthenticated(UnauthenticatedReason),
}

/// Why re-authentication is required.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnauthenticatedReason {
    /// The decryption passphrase is not cached (or the private key is
    /// missing) and must be re-entered.
    Passphrase,
    /// The backend rejected the session token.
    Session,
    /// The backend requires a second factor; providers the server accepts.
    Mfa(Vec<MfaProvider>),
}

/// Second-factor providers the backend may advertise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MfaProvider {
    Totp,
    Yubikey,
    Duo,
}

impl MfaProvider {
    /// Parse a provider from its backend identifier.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "totp" => Some(Self::Totp),
            "yubikey" => Some(Self::Yubikey),
            "duo" => Some(Self::Duo),
            _ => None,
        }
    }
}
