//! Deterministic merging of session-key bundles.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::session_keys::models::{DecryptedBundle, SessionKey, SessionKeyIdentifier};

/// The merged, de-duplicated view over all bundles, plus the origin
/// bookkeeping needed to pick an update target at persist time.
#[derive(Debug, Default)]
pub struct MergedSessionKeys {
    pub keys: HashMap<SessionKeyIdentifier, SessionKey>,
    /// Server-side bundle id to its last-seen modification time.
    pub origin: HashMap<Uuid, DateTime<Utc>>,
}

/// Merge bundles into one canonical key map.
///
/// On identifier collision the key with the latest `modified` wins.
/// Bundles are processed in (modified, id) order so the result does not
/// depend on server response ordering; within equal key timestamps the
/// first key seen is kept.
pub fn merge(mut bundles: Vec<DecryptedBundle>) -> MergedSessionKeys {
    bundles.sort_by(|a, b| a.modified.cmp(&b.modified).then_with(|| a.id.cmp(&b.id)));

    let mut merged = MergedSessionKeys::default();
    for bundle in bundles {
        merged.origin.insert(bundle.id, bundle.modified);

        for key in bundle.bundle.session_keys {
            let identifier = SessionKeyIdentifier {
                foreign_model: key.foreign_model,
                foreign_id: key.foreign_id,
            };
            let candidate = SessionKey {
                session_key: key.session_key,
                modified: key.modified,
            };
            merged
                .keys
                .entry(identifier)
                .and_modify(|existing| {
                    if candidate.modified > existing.modified {
                        *existing = candidate.clone();
                    }
                })
                .or_insert(candidate);
        }
    }
    merged
}
