//! Session-key cache synchronization.
//!
//! Fetch rebuilds the in-memory cache from every bundle the user can
//! decrypt; persist pushes the cache back best-effort, with a single
//! re-fetch-and-merge retry on a concurrent-modification conflict.
//! Persist failures never invalidate the cache, which is always
//! rebuildable from bundles.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::accounts::AccountStore;
use crate::api::models::SessionKeyBundleDto;
use crate::api::{ApiError, MetadataApi};
use crate::auth::{AuthenticationState, UnauthenticatedReason};
use crate::passphrase::{PassphraseMemoryCache, PotentialPassphrase};
use crate::pgp::PgpSuite;
use crate::session_keys::cache::SessionKeysCache;
use crate::session_keys::merge::merge;
use crate::session_keys::models::{DecryptedBundle, SessionKeysBundle};

/// Outcome of a session-key fetch or persist.
#[derive(Debug, PartialEq)]
pub enum SessionKeysOutput {
    Success,
    Failure(AuthenticationState),
}

/// Fetches, merges and pushes the session-key cache.
pub struct SessionKeyCacheManager<A, P, C> {
    api: Arc<A>,
    pgp: Arc<P>,
    accounts: Arc<C>,
    passphrase: PassphraseMemoryCache,
    cache: SessionKeysCache,
}

impl<A, P, C> SessionKeyCacheManager<A, P, C>
where
    A: MetadataApi,
    P: PgpSuite,
    C: AccountStore,
{
    pub fn new(
        api: Arc<A>,
        pgp: Arc<P>,
        accounts: Arc<C>,
        passphrase: PassphraseMemoryCache,
        cache: SessionKeysCache,
    ) -> Self {
        Self {
            api,
            pgp,
            accounts,
            passphrase,
            cache,
        }
    }

    /// Rebuild the cache from all server-side bundles. Bundles this user
    /// cannot decrypt, or with invalid payloads, are skipped.
    pub async fn fetch(&self) -> crate::Result<SessionKeysOutput> {
        let bundles = match self.api.fetch_session_key_bundles().await {
            Ok(bundles) => bundles,
            Err(e) => {
                error!("Failed to fetch session-key bundles: {}", e);
                return Ok(SessionKeysOutput::Failure(e.authentication_state()));
            }
        };

        let Some((private_key, passphrase)) = self.credentials() else {
            return Ok(SessionKeysOutput::Failure(AuthenticationState::Unauthenticated(
                UnauthenticatedReason::Passphrase,
            )));
        };

        debug!("Building session-key cache from {} bundles", bundles.len());
        let decrypted = self.decrypt_bundles(bundles, &private_key, &passphrase);
        self.cache.replace(merge(decrypted));
        debug!("Session-key cache loaded; {} keys", self.cache.len());

        Ok(SessionKeysOutput::Success)
    }

    /// Push the cache back to the server.
    ///
    /// Best-effort: encryption and upload failures leave the cache valid
    /// locally and still report success. A conflict triggers one
    /// re-fetch-merge-retry cycle.
    pub async fn persist(&self) -> crate::Result<SessionKeysOutput> {
        debug!("Saving session-key cache");

        let Some((private_key, passphrase)) = self.credentials() else {
            return Ok(SessionKeysOutput::Failure(AuthenticationState::Unauthenticated(
                UnauthenticatedReason::Passphrase,
            )));
        };

        let Some(encrypted) = self.encrypt_cache(&private_key, &passphrase) else {
            return Ok(SessionKeysOutput::Success);
        };

        if self.cache.was_initially_empty() {
            debug!("No bundles existed initially; posting a new one");
            if let Err(e) = self.api.post_session_key_bundle(&encrypted).await {
                error!("Failed to post session-key bundle: {}", e);
            }
            return Ok(SessionKeysOutput::Success);
        }

        if !self.cache.is_locally_modified() {
            debug!("Skipping session-key update; no local modifications");
            return Ok(SessionKeysOutput::Success);
        }

        let Some((bundle_id, last_modified)) = self.cache.find_latest_modified_origin() else {
            return Err(crate::CoreError::Internal(
                "no origin bundle recorded but an update was attempted".to_string(),
            ));
        };

        match self
            .api
            .update_session_key_bundle(bundle_id, last_modified, &encrypted)
            .await
        {
            Ok(()) => {
                debug!("Session-key bundle updated");
            }
            Err(ApiError::Conflict) => {
                debug!("Concurrent bundle update detected; re-fetching and retrying once");
                self.refetch_merge_and_retry(&private_key, &passphrase).await;
            }
            Err(e) => {
                error!("Failed to update session-key bundle: {}", e);
            }
        }
        Ok(SessionKeysOutput::Success)
    }

    /// Shared handle to the cache this manager maintains.
    pub fn cache(&self) -> SessionKeysCache {
        self.cache.clone()
    }

    fn credentials(&self) -> Option<(String, zeroize::Zeroizing<Vec<u8>>)> {
        let private_key = match self.accounts.private_key() {
            Some(key) => key,
            None => {
                error!("User private key not found");
                return None;
            }
        };
        match self.passphrase.get() {
            PotentialPassphrase::Passphrase(bytes) => Some((private_key, bytes)),
            PotentialPassphrase::NotPresent => {
                debug!("Passphrase is not present in cache");
                None
            }
        }
    }

    fn decrypt_bundles(
        &self,
        bundles: Vec<SessionKeyBundleDto>,
        private_key: &str,
        passphrase: &[u8],
    ) -> Vec<DecryptedBundle> {
        bundles
            .into_iter()
            .filter_map(|dto| {
                let plaintext = match self.pgp.decrypt_verify(private_key, passphrase, &dto.data) {
                    Ok(plaintext) => plaintext,
                    Err(e) => {
                        warn!("Skipping undecryptable session-key bundle {}: {}", dto.id, e);
                        return None;
                    }
                };
                let bundle: SessionKeysBundle = match serde_json::from_slice(&plaintext) {
                    Ok(bundle) => bundle,
                    Err(e) => {
                        warn!("Skipping unparseable session-key bundle {}: {}", dto.id, e);
                        return None;
                    }
                };
                if !bundle.is_valid() {
                    warn!("Skipping invalid session-key bundle {}", dto.id);
                    return None;
                }
                Some(DecryptedBundle {
                    id: dto.id,
                    created: dto.created,
                    modified: dto.modified,
                    bundle,
                })
            })
            .collect()
    }

    fn encrypt_cache(&self, private_key: &str, passphrase: &[u8]) -> Option<String> {
        let payload = match serde_json::to_string(&self.cache.export_bundle()) {
            Ok(json) => json,
            Err(e) => {
                error!("Failed to serialize session-key cache: {}", e);
                return None;
            }
        };
        match self
            .pgp
            .encrypt_sign(private_key, passphrase, payload.as_bytes())
        {
            Ok(encrypted) => Some(encrypted),
            Err(e) => {
                // The cache stays valid locally; only the server copy is stale.
                error!("Failed to encrypt session-key cache: {}", e);
                None
            }
        }
    }

    /// Conflict recovery: merge the local cache into the re-fetched
    /// bundles as a synthetic bundle (excluded from origin bookkeeping)
    /// and retry the update once.
    async fn refetch_merge_and_retry(&self, private_key: &str, passphrase: &[u8]) {
        let bundles = match self.api.fetch_session_key_bundles().await {
            Ok(bundles) => bundles,
            Err(e) => {
                warn!("Re-fetch after conflict failed: {}", e);
                return;
            }
        };

        let mut decrypted = self.decrypt_bundles(bundles, private_key, passphrase);
        let local_bundle_id = Uuid::new_v4();
        let now = Utc::now();
        decrypted.push(DecryptedBundle {
            id: local_bundle_id,
            created: now,
            modified: now,
            bundle: self.cache.export_bundle(),
        });

        let mut merged = merge(decrypted);
        // The synthetic local bundle does not exist server-side.
        merged.origin.remove(&local_bundle_id);
        self.cache.adopt(merged);

        let Some(encrypted) = self.encrypt_cache(private_key, passphrase) else {
            return;
        };
        let Some((bundle_id, last_modified)) = self.cache.find_latest_modified_origin() else {
            warn!("No origin bundle after conflict re-fetch; skipping update");
            return;
        };
        match self
            .api
            .update_session_key_bundle(bundle_id, last_modified, &encrypted)
            .await
        {
            Ok(()) => debug!("Session-key bundle updated after conflict recovery"),
            Err(e) => warn!("Retry after conflict failed: {}", e),
        }
    }
}
