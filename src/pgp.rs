//! OpenPGP operations consumed by the engine.
//!
//! The engine treats OpenPGP as a black box behind the [`PgpSuite`]
//! trait: decryption, signing and signature verification of armored
//! messages plus key introspection. A production implementation wraps
//! an OpenPGP library; tests substitute a deterministic fake.

use thiserror::Error;

/// Errors from the underlying OpenPGP implementation.
#[derive(Error, Debug)]
pub enum PgpError {
    #[error("Decryption failed: {0}")]
    DecryptionFailed(String),

    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    #[error("Signature verification failed: {0}")]
    SignatureInvalid(String),

    #[error("Invalid key material: {0}")]
    InvalidKey(String),
}

/// Result type for PGP operations
pub type PgpResult<T> = std::result::Result<T, PgpError>;

/// A successfully verified signed message.
#[derive(Debug, Clone)]
pub struct VerifiedMessage {
    /// Decrypted message content.
    pub plaintext: Vec<u8>,
    /// Fingerprint of the key that produced the signature.
    pub signature_key_fingerprint: String,
    /// Signature creation time, Unix seconds.
    pub signature_created_seconds: i64,
}

/// OpenPGP primitive operations.
///
/// All methods take the armored private key of the current user together
/// with its passphrase; `verify` additionally takes the counterparty's
/// armored public key to check the signature against.
pub trait PgpSuite {
    /// Decrypt an armored message.
    fn decrypt(
        &self,
        private_key: &str,
        passphrase: &[u8],
        message: &str,
    ) -> PgpResult<Vec<u8>>;

    /// Decrypt an armored message and verify its embedded signature
    /// against the current user's own key.
    fn decrypt_verify(
        &self,
        private_key: &str,
        passphrase: &[u8],
        message: &str,
    ) -> PgpResult<Vec<u8>>;

    /// Encrypt and sign a plaintext, producing an armored message.
    fn encrypt_sign(
        &self,
        private_key: &str,
        passphrase: &[u8],
        plaintext: &[u8],
    ) -> PgpResult<String>;

    /// Verify the signature on an armored message signed by the holder
    /// of `signer_public_key`, returning the decrypted payload and
    /// signature details.
    fn verify(
        &self,
        private_key: &str,
        passphrase: &[u8],
        signer_public_key: &str,
        message: &str,
    ) -> PgpResult<VerifiedMessage>;

    /// Fingerprint of the given armored private key.
    fn key_fingerprint(&self, private_key: &str) -> PgpResult<String>;

    /// Derive the armored public key from an armored private key.
    fn derive_public_key(&self, private_key: &str) -> PgpResult<String>;
}
