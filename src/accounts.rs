//! Selected-account data used by the engine.
//!
//! The account subsystem (setup, key import, multi-account switching)
//! lives elsewhere; the engine only needs the selected account's
//! identity and armored private key.

use uuid::Uuid;

/// Display identity of the selected account.
#[derive(Debug, Clone)]
pub struct AccountData {
    /// The user id this account maps to on the server.
    pub user_id: Uuid,
    pub username: String,
    pub full_name: String,
}

/// Read access to the selected account.
pub trait AccountStore {
    /// Armored private key of the selected account, if one is imported.
    fn private_key(&self) -> Option<String>;

    /// Identity of the selected account, if one is selected.
    fn account_data(&self) -> Option<AccountData>;
}
