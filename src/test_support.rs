//! Hand-rolled fakes and fixture builders shared across test modules.
//!
//! [`FakePgp`] speaks a transparent pipe-delimited message format so
//! tests can stage messages "encrypted" for a recipient and "signed" by
//! a signer without real OpenPGP:
//!
//! ```text
//! private key:  PRIVATE|<fingerprint>|<passphrase>
//! public key:   PUBLIC|<fingerprint>
//! message:      PGPMSG|<recipient fpr>|<signer fpr>|<signature unix secs>|<plaintext>
//! ```

use std::collections::VecDeque;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::accounts::{AccountData, AccountStore};
use crate::api::models::{MetadataKeyDto, SessionKeyBundleDto};
use crate::api::{ApiError, ApiResult, MetadataApi};
use crate::metadata::models::{MetadataKey, MetadataPrivateKey};
use crate::pgp::{PgpError, PgpResult, PgpSuite, VerifiedMessage};

/// Deterministic stand-in for the OpenPGP implementation.
pub struct FakePgp {
    fail_encrypt_sign: bool,
    /// Signature timestamp stamped onto messages produced by
    /// `encrypt_sign`.
    pub sign_timestamp: i64,
}

impl FakePgp {
    pub fn new() -> Self {
        Self {
            fail_encrypt_sign: false,
            sign_timestamp: Utc::now().timestamp(),
        }
    }

    /// A fake whose `encrypt_sign` always fails.
    pub fn failing_encrypt() -> Self {
        Self {
            fail_encrypt_sign: true,
            ..Self::new()
        }
    }

    pub fn private_key(fingerprint: &str, passphrase: &str) -> String {
        format!("PRIVATE|{}|{}", fingerprint, passphrase)
    }

    pub fn public_key(fingerprint: &str) -> String {
        format!("PUBLIC|{}", fingerprint)
    }

    /// A message encrypted for `recipient_fpr` and signed by `signer_fpr`.
    pub fn message_for(
        recipient_fpr: &str,
        signer_fpr: &str,
        signed_at_seconds: i64,
        plaintext: &str,
    ) -> String {
        format!(
            "PGPMSG|{}|{}|{}|{}",
            recipient_fpr, signer_fpr, signed_at_seconds, plaintext
        )
    }

    fn parse_private_key(private_key: &str) -> PgpResult<(String, String)> {
        let mut parts = private_key.splitn(3, '|');
        match (parts.next(), parts.next(), parts.next()) {
            (Some("PRIVATE"), Some(fpr), Some(pass)) => Ok((fpr.to_string(), pass.to_string())),
            _ => Err(PgpError::InvalidKey(format!("not a private key: {}", private_key))),
        }
    }

    fn parse_message(message: &str) -> PgpResult<(String, String, i64, String)> {
        let mut parts = message.splitn(5, '|');
        match (parts.next(), parts.next(), parts.next(), parts.next(), parts.next()) {
            (Some("PGPMSG"), Some(recipient), Some(signer), Some(ts), Some(plaintext)) => {
                let ts = ts
                    .parse()
                    .map_err(|_| PgpError::DecryptionFailed("bad timestamp".to_string()))?;
                Ok((
                    recipient.to_string(),
                    signer.to_string(),
                    ts,
                    plaintext.to_string(),
                ))
            }
            _ => Err(PgpError::DecryptionFailed(format!("not a message: {}", message))),
        }
    }

    fn open(private_key: &str, passphrase: &[u8], message: &str) -> PgpResult<(String, i64, String)> {
        let (own_fpr, own_pass) = Self::parse_private_key(private_key)?;
        let (recipient, signer, ts, plaintext) = Self::parse_message(message)?;
        if recipient != own_fpr {
            return Err(PgpError::DecryptionFailed("not a recipient".to_string()));
        }
        if own_pass.as_bytes() != passphrase {
            return Err(PgpError::DecryptionFailed("wrong passphrase".to_string()));
        }
        Ok((signer, ts, plaintext))
    }
}

impl Default for FakePgp {
    fn default() -> Self {
        Self::new()
    }
}

impl PgpSuite for FakePgp {
    fn decrypt(&self, private_key: &str, passphrase: &[u8], message: &str) -> PgpResult<Vec<u8>> {
        let (_, _, plaintext) = Self::open(private_key, passphrase, message)?;
        Ok(plaintext.into_bytes())
    }

    fn decrypt_verify(
        &self,
        private_key: &str,
        passphrase: &[u8],
        message: &str,
    ) -> PgpResult<Vec<u8>> {
        self.decrypt(private_key, passphrase, message)
    }

    fn encrypt_sign(
        &self,
        private_key: &str,
        passphrase: &[u8],
        plaintext: &[u8],
    ) -> PgpResult<String> {
        if self.fail_encrypt_sign {
            return Err(PgpError::EncryptionFailed("forced failure".to_string()));
        }
        let (fpr, pass) = Self::parse_private_key(private_key)?;
        if pass.as_bytes() != passphrase {
            return Err(PgpError::EncryptionFailed("wrong passphrase".to_string()));
        }
        let plaintext = String::from_utf8(plaintext.to_vec())
            .map_err(|_| PgpError::EncryptionFailed("non-utf8 plaintext".to_string()))?;
        Ok(Self::message_for(&fpr, &fpr, self.sign_timestamp, &plaintext))
    }

    fn verify(
        &self,
        private_key: &str,
        passphrase: &[u8],
        signer_public_key: &str,
        message: &str,
    ) -> PgpResult<VerifiedMessage> {
        let (signer, ts, plaintext) = Self::open(private_key, passphrase, message)?;
        if signer_public_key != Self::public_key(&signer) {
            return Err(PgpError::SignatureInvalid(format!(
                "message signed by {}, not by the given key",
                signer
            )));
        }
        Ok(VerifiedMessage {
            plaintext: plaintext.into_bytes(),
            signature_key_fingerprint: signer,
            signature_created_seconds: ts,
        })
    }

    fn key_fingerprint(&self, private_key: &str) -> PgpResult<String> {
        Ok(Self::parse_private_key(private_key)?.0)
    }

    fn derive_public_key(&self, private_key: &str) -> PgpResult<String> {
        Ok(Self::public_key(&Self::parse_private_key(private_key)?.0))
    }
}

/// In-memory backend double recording writes and serving staged reads.
#[derive(Default)]
pub struct FakeApi {
    metadata_keys: Mutex<Vec<MetadataKeyDto>>,
    session_bundles: Mutex<Vec<SessionKeyBundleDto>>,
    updated_private_keys: Mutex<Vec<(Uuid, String)>>,
    posted_bundles: Mutex<Vec<String>>,
    updated_bundles: Mutex<Vec<(Uuid, DateTime<Utc>, String)>>,
    fetch_keys_error: Mutex<Option<ApiError>>,
    update_private_key_error: Mutex<Option<ApiError>>,
    update_bundle_errors: Mutex<VecDeque<ApiError>>,
}

impl FakeApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_metadata_keys(&self, keys: Vec<MetadataKeyDto>) {
        *self.metadata_keys.lock().unwrap() = keys;
    }

    pub fn set_session_bundles(&self, bundles: Vec<SessionKeyBundleDto>) {
        *self.session_bundles.lock().unwrap() = bundles;
    }

    pub fn fail_next_fetch_keys(&self, error: ApiError) {
        *self.fetch_keys_error.lock().unwrap() = Some(error);
    }

    pub fn fail_next_update_private_key(&self, error: ApiError) {
        *self.update_private_key_error.lock().unwrap() = Some(error);
    }

    pub fn queue_update_bundle_error(&self, error: ApiError) {
        self.update_bundle_errors.lock().unwrap().push_back(error);
    }

    pub fn updated_private_keys(&self) -> Vec<(Uuid, String)> {
        self.updated_private_keys.lock().unwrap().clone()
    }

    pub fn posted_bundles(&self) -> Vec<String> {
        self.posted_bundles.lock().unwrap().clone()
    }

    pub fn updated_bundles(&self) -> Vec<(Uuid, DateTime<Utc>, String)> {
        self.updated_bundles.lock().unwrap().clone()
    }
}

impl MetadataApi for FakeApi {
    async fn fetch_metadata_keys(&self) -> ApiResult<Vec<MetadataKeyDto>> {
        if let Some(error) = self.fetch_keys_error.lock().unwrap().take() {
            return Err(error);
        }
        Ok(self.metadata_keys.lock().unwrap().clone())
    }

    async fn update_metadata_private_key(&self, id: Uuid, data: &str) -> ApiResult<()> {
        if let Some(error) = self.update_private_key_error.lock().unwrap().take() {
            return Err(error);
        }
        self.updated_private_keys
            .lock()
            .unwrap()
            .push((id, data.to_string()));
        Ok(())
    }

    async fn fetch_session_key_bundles(&self) -> ApiResult<Vec<SessionKeyBundleDto>> {
        Ok(self.session_bundles.lock().unwrap().clone())
    }

    async fn post_session_key_bundle(&self, data: &str) -> ApiResult<()> {
        self.posted_bundles.lock().unwrap().push(data.to_string());
        Ok(())
    }

    async fn update_session_key_bundle(
        &self,
        id: Uuid,
        last_modified: DateTime<Utc>,
        data: &str,
    ) -> ApiResult<()> {
        if let Some(error) = self.update_bundle_errors.lock().unwrap().pop_front() {
            return Err(error);
        }
        self.updated_bundles
            .lock()
            .unwrap()
            .push((id, last_modified, data.to_string()));
        Ok(())
    }
}

/// Fixed selected-account data.
pub struct StubAccounts {
    private_key: Option<String>,
    account: Option<AccountData>,
}

impl StubAccounts {
    pub fn new(private_key: Option<String>, account: Option<AccountData>) -> Self {
        Self {
            private_key,
            account,
        }
    }

    pub fn with_key(private_key: String) -> Self {
        Self::new(
            Some(private_key),
            Some(AccountData {
                user_id: Uuid::new_v4(),
                username: "admin@keyhaven.local".to_string(),
                full_name: "Admin User".to_string(),
            }),
        )
    }

    pub fn without_key() -> Self {
        Self::new(None, None)
    }
}

impl AccountStore for StubAccounts {
    fn private_key(&self) -> Option<String> {
        self.private_key.clone()
    }

    fn account_data(&self) -> Option<AccountData> {
        self.account.clone()
    }
}

/// A metadata key holding the given private-key copies, with the
/// copies' owning-key ids fixed up to match.
pub fn metadata_key(private_keys: Vec<MetadataPrivateKey>) -> MetadataKey {
    let id = Uuid::new_v4();
    let private_keys = private_keys
        .into_iter()
        .map(|mut copy| {
            copy.metadata_key_id = id;
            copy
        })
        .collect();
    MetadataKey {
        id,
        armored_key: "-----BEGIN PGP PUBLIC KEY BLOCK-----".to_string(),
        fingerprint: "63452C7A0AE6FAE8C8C309640BD9E2409BC6A569".to_string(),
        modified: Utc::now(),
        expired: None,
        deleted: None,
        private_keys,
    }
}

/// A private-key copy carrying the given encrypted message.
pub fn private_key_copy(pgp_message: &str, user_id: Uuid) -> MetadataPrivateKey {
    MetadataPrivateKey {
        id: Uuid::new_v4(),
        metadata_key_id: Uuid::new_v4(),
        user_id,
        pgp_message: pgp_message.to_string(),
        created: Utc::now(),
        created_by: None,
        modified: Utc::now(),
        modified_by: Some(user_id),
    }
}
