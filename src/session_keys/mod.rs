//! Session-key cache: merge, shared state and synchronization.

pub mod cache;
pub mod manager;
pub mod merge;
pub mod models;

pub use cache::SessionKeysCache;
pub use manager::{SessionKeyCacheManager, SessionKeysOutput};
pub use merge::{merge, MergedSessionKeys};
pub use models::{SessionKey, SessionKeyIdentifier, SessionKeysBundle};
