//! Persistence interface consumed by the auth core.
//!
//! The concrete store (SQL, KV, ...) lives outside this crate; everything
//! here is expressed against the `Database` trait. Operations returning a
//! success flag map to `NotFound` in the flows when the flag is false.

use async_trait::async_trait;
use thiserror::Error;

use crate::permissions::Permissions;
use crate::session::Session;

/// Backend failure reported by a store implementation.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store backend error: {0}")]
    Backend(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Login data as persisted for one account.
#[derive(Debug, Clone)]
pub struct LoginRecord {
    pub data: String,
    pub login_token: String,
    /// Raw scheme code; decoded via `LoginType::from_code`.
    pub login_type: i16,
}

/// The account fields needed outside of session resolution.
#[derive(Debug, Clone)]
pub struct UserProfile {
    pub username: String,
    pub settings: Permissions,
    pub permission_group: i32,
}

/// Capability-typed store the core runs against.
#[async_trait]
pub trait Database: Send + Sync {
    /// Whether a username is taken, optionally ignoring one user slot
    /// (the slot being filled by the signup in progress).
    async fn has_username(&self, username: &str, except_user_id: Option<&str>)
        -> StoreResult<bool>;

    /// Fill a pre-created user slot with a real account.
    async fn create_user(
        &self,
        username: &str,
        login_data: &str,
        login_token: &str,
        login_type: i16,
        user_slot: &str,
    ) -> StoreResult<()>;

    /// Reserve an empty, invited-but-unfilled user slot. Returns the slot id.
    async fn create_user_slot(
        &self,
        settings: u32,
        permission_group: i32,
        temp_name: &str,
    ) -> StoreResult<String>;

    /// Delete an unfilled slot. False when no such slot exists.
    async fn remove_unfilled_user(&self, username: &str) -> StoreResult<bool>;

    async fn set_permission_group(
        &self,
        username: &str,
        permission_group: i32,
    ) -> StoreResult<bool>;

    async fn set_settings(&self, username: &str, settings: u32) -> StoreResult<bool>;

    async fn disable_user(&self, username: &str) -> StoreResult<bool>;

    async fn get_login_data_by_username(&self, username: &str)
        -> StoreResult<Option<LoginRecord>>;

    /// Stored spelling of a username looked up case-insensitively.
    async fn get_correctly_cased_username(&self, username: &str) -> StoreResult<Option<String>>;

    /// Replace an account's login data wholesale (scheme migration).
    async fn migrate_login_data(
        &self,
        username: &str,
        login_data: &str,
        login_token: &str,
        login_type: i16,
    ) -> StoreResult<()>;

    async fn add_session(
        &self,
        session_token: &str,
        username: &str,
        session_name: &str,
    ) -> StoreResult<()>;

    async fn delete_session(&self, session_token: &str) -> StoreResult<()>;

    async fn get_session(&self, session_token: &str) -> StoreResult<Option<Session>>;

    async fn get_username_by_session_data(
        &self,
        session_token: &str,
    ) -> StoreResult<Option<String>>;

    /// Persist a public-key credential bound to one account.
    async fn create_authkey(
        &self,
        encoded_credential: &str,
        credential_id: &[u8],
        username: &str,
        session_name: &str,
    ) -> StoreResult<()>;

    /// Stored credential record by credential id, if registered.
    async fn find_credential_by_id(&self, credential_id: &[u8]) -> StoreResult<Option<String>>;

    async fn get_user_profile_by_credential_id(
        &self,
        credential_id: &[u8],
    ) -> StoreResult<Option<UserProfile>>;

    async fn get_user_profile(&self, username: &str) -> StoreResult<Option<UserProfile>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn login_record_holds_values() {
        let record = LoginRecord {
            data: "hash".to_string(),
            login_token: "token".to_string(),
            login_type: 1,
        };
        assert_eq!(record.login_type, 1);
        assert_eq!(record.login_token, "token");
    }

    #[test]
    fn user_profile_carries_permissions() {
        let profile = UserProfile {
            username: "alice".to_string(),
            settings: Permissions::VIEW_MEMBERS,
            permission_group: 3,
        };
        assert!(profile.settings.contains(Permissions::VIEW_MEMBERS));
        assert_eq!(profile.permission_group, 3);
    }
}
