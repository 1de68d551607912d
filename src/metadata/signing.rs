//! TOFU signing of a backend metadata key.
//!
//! Signs the decrypted key payload with the current user's key, verifies
//! the fresh signature, persists the resulting trust record and pushes
//! the re-signed copy back to the backend. Used by the trust engine for
//! the first-use path and directly for user-confirmed trust decisions.

use std::sync::{Arc, Mutex};

use tracing::{debug, error, warn};

use crate::accounts::AccountStore;
use crate::api::{ApiError, MetadataApi};
use crate::auth::{AuthenticationState, UnauthenticatedReason};
use crate::database::Database;
use crate::metadata::keys::{MetadataKeysPipeline, PipelineOutput};
use crate::metadata::models::{MetadataPrivateKey, NewKeyToTrust, PrivateKeyPayload, TrustedKeyRecord};
use crate::passphrase::{PassphraseMemoryCache, PotentialPassphrase};
use crate::pgp::{PgpError, PgpSuite};
use crate::store::{SecureStore, TrustedKeyStore};

/// Outcome of a sign-and-push run.
#[derive(Debug)]
pub enum SigningOutput {
    Success,
    /// Signing or self-verification failed; usually a stale passphrase.
    CryptoFailure(PgpError),
    /// The backend rejected the upload.
    UploadFailure(ApiError),
}

impl SigningOutput {
    /// The authentication state this outcome implies.
    pub fn authentication_state(&self) -> AuthenticationState {
        match self {
            SigningOutput::Success => AuthenticationState::Authenticated,
            SigningOutput::CryptoFailure(_) => {
                AuthenticationState::Unauthenticated(UnauthenticatedReason::Passphrase)
            }
            SigningOutput::UploadFailure(e) => e.authentication_state(),
        }
    }
}

/// Signs backend keys with the current user's key and records the trust
/// decision.
pub struct TrustSigner<A, P, C, S> {
    api: Arc<A>,
    pgp: Arc<P>,
    accounts: Arc<C>,
    passphrase: PassphraseMemoryCache,
    trusted_keys: Arc<TrustedKeyStore<S>>,
    pipeline: MetadataKeysPipeline<A, P, C>,
}

impl<A, P, C, S> TrustSigner<A, P, C, S>
where
    A: MetadataApi,
    P: PgpSuite,
    C: AccountStore,
    S: SecureStore,
{
    pub fn new(
        api: Arc<A>,
        pgp: Arc<P>,
        accounts: Arc<C>,
        passphrase: PassphraseMemoryCache,
        trusted_keys: Arc<TrustedKeyStore<S>>,
        database: Arc<Mutex<Database>>,
    ) -> Self {
        let pipeline = MetadataKeysPipeline::new(
            api.clone(),
            pgp.clone(),
            accounts.clone(),
            passphrase.clone(),
            database,
        );
        Self {
            api,
            pgp,
            accounts,
            passphrase,
            trusted_keys,
            pipeline,
        }
    }

    /// Record a verified backend key as trusted without re-signing.
    pub fn save_trusted_key(&self, key: &NewKeyToTrust) -> crate::Result<()> {
        self.trusted_keys.save(&key.to_trusted_record())?;
        Ok(())
    }

    /// User-confirmed trust of a conflicting backend key: re-sign it and
    /// push the new signature.
    pub async fn trust_new_key(&self, key: &NewKeyToTrust) -> crate::Result<SigningOutput> {
        let private_key = match self.accounts.private_key() {
            Some(k) => k,
            None => {
                error!("No private key available while trusting a new key");
                return Ok(SigningOutput::CryptoFailure(PgpError::InvalidKey(
                    "no private key for the selected account".to_string(),
                )));
            }
        };
        let passphrase = match self.passphrase.get() {
            PotentialPassphrase::Passphrase(bytes) => bytes,
            PotentialPassphrase::NotPresent => {
                error!("No cached passphrase while trusting a new key");
                return Ok(SigningOutput::CryptoFailure(PgpError::DecryptionFailed(
                    "passphrase not cached".to_string(),
                )));
            }
        };
        let public_key = self.pgp.derive_public_key(&private_key)?;

        self.sign_and_push(&key.private_key, &key.payload, &private_key, &passphrase, &public_key)
            .await
    }

    /// Sign the decrypted payload, persist the record, push to backend,
    /// then refresh the local key table so it reflects the new signature.
    pub async fn sign_and_push(
        &self,
        private_key_copy: &MetadataPrivateKey,
        payload: &PrivateKeyPayload,
        user_private_key: &str,
        user_passphrase: &[u8],
        user_public_key: &str,
    ) -> crate::Result<SigningOutput> {
        debug!("Signing the backend key with the current user's key");

        let payload_json = serde_json::to_string(payload)?;
        let signed_message =
            match self
                .pgp
                .encrypt_sign(user_private_key, user_passphrase, payload_json.as_bytes())
            {
                Ok(message) => message,
                Err(e) => {
                    error!("Failed to sign the key payload: {}", e);
                    return Ok(SigningOutput::CryptoFailure(e));
                }
            };

        // Check our own signature before persisting or uploading it.
        let verified = match self.pgp.verify(
            user_private_key,
            user_passphrase,
            user_public_key,
            &signed_message,
        ) {
            Ok(verified) => verified,
            Err(e) => {
                error!("Fresh signature failed verification: {}", e);
                return Ok(SigningOutput::CryptoFailure(e));
            }
        };

        let account = self.accounts.account_data().ok_or_else(|| {
            crate::CoreError::Internal("no account selected during trust signing".to_string())
        })?;

        let record = TrustedKeyRecord {
            id: private_key_copy.id,
            user_id: private_key_copy.user_id,
            key_data: payload.armored_key.clone(),
            passphrase: payload.passphrase.clone(),
            created: private_key_copy.created,
            created_by: private_key_copy.created_by,
            modified: private_key_copy.modified,
            modified_by: private_key_copy.modified_by,
            key_pgp_message: signed_message.clone(),
            signing_key_fingerprint: verified.signature_key_fingerprint,
            signature_created_seconds: verified.signature_created_seconds,
            signed_username: account.username,
            signed_name: account.full_name,
        };
        self.trusted_keys.save(&record)?;
        debug!("Saved signed key to the trust store");

        if let Err(e) = self
            .api
            .update_metadata_private_key(private_key_copy.id, &signed_message)
            .await
        {
            error!("Failed to upload the re-signed key: {}", e);
            return Ok(SigningOutput::UploadFailure(e));
        }

        match self.pipeline.fetch_and_decrypt().await? {
            PipelineOutput::Success => {}
            PipelineOutput::Failure(_) => {
                warn!("Failed to refresh local keys after push; manual refresh required");
            }
        }
        Ok(SigningOutput::Success)
    }

    /// Forget the trusted key. Backs the explicit, user-confirmed
    /// deletion that follows a `TrustedKeyDeleted` advisory.
    pub fn delete_trusted_key(&self) -> crate::Result<()> {
        self.trusted_keys.delete()?;
        debug!("Deleted trusted metadata key");
        Ok(())
    }
}
