//! In-memory collaborators for exercising the flows end-to-end.

use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde_json::json;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use uuid::Uuid;

use pordisto::permissions::Permissions;
use pordisto::session::{Session, SessionData};
use pordisto::store::{Database, LoginRecord, StoreResult, UserProfile};
use pordisto::webauthn::{
    AuthenticationOptions, AuthenticationResponse, CredentialVerifier, RegistrationOptions,
    RegistrationResponse, RelyingParty, VerifiedRegistration, VerifierError,
};

#[derive(Debug, Clone)]
pub struct UserRow {
    pub username: String,
    pub login: Option<(String, String, i16)>,
    pub settings: u32,
    pub permission_group: i32,
    pub unfilled: bool,
    pub disabled: bool,
}

#[derive(Debug, Clone)]
struct SessionRow {
    username: String,
    session_name: String,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
struct AuthkeyRow {
    encoded: String,
    username: String,
}

/// DashMap-backed store with the same observable semantics the flows
/// depend on: case-insensitive username lookup with preserved casing,
/// unfilled-slot bookkeeping, and unique credential ids.
#[derive(Default, Clone)]
pub struct MockDatabase {
    users: Arc<DashMap<String, UserRow>>,
    by_username: Arc<DashMap<String, String>>,
    sessions: Arc<DashMap<String, SessionRow>>,
    authkeys: Arc<DashMap<Vec<u8>, AuthkeyRow>>,
}

impl MockDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot_for(&self, username: &str) -> Option<String> {
        self.by_username
            .get(&username.to_lowercase())
            .map(|entry| entry.value().clone())
    }

    fn row_for(&self, username: &str) -> Option<UserRow> {
        self.slot_for(username)
            .and_then(|slot| self.users.get(&slot).map(|row| row.value().clone()))
    }

    /// Direct row access for assertions.
    pub fn user_row(&self, username: &str) -> Option<UserRow> {
        self.row_for(username)
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }
}

#[async_trait]
impl Database for MockDatabase {
    async fn has_username(
        &self,
        username: &str,
        except_user_id: Option<&str>,
    ) -> StoreResult<bool> {
        Ok(self
            .slot_for(username)
            .is_some_and(|slot| except_user_id != Some(slot.as_str())))
    }

    async fn create_user(
        &self,
        username: &str,
        login_data: &str,
        login_token: &str,
        login_type: i16,
        user_slot: &str,
    ) -> StoreResult<()> {
        let mut row = self
            .users
            .get_mut(user_slot)
            .ok_or_else(|| pordisto::StoreError::Backend("no such user slot".to_string()))?;
        self.by_username.remove(&row.username.to_lowercase());
        row.username = username.to_string();
        row.login = Some((
            login_data.to_string(),
            login_token.to_string(),
            login_type,
        ));
        row.unfilled = false;
        self.by_username
            .insert(username.to_lowercase(), user_slot.to_string());
        Ok(())
    }

    async fn create_user_slot(
        &self,
        settings: u32,
        permission_group: i32,
        temp_name: &str,
    ) -> StoreResult<String> {
        let slot = Uuid::new_v4().to_string();
        self.users.insert(
            slot.clone(),
            UserRow {
                username: temp_name.to_string(),
                login: None,
                settings,
                permission_group,
                unfilled: true,
                disabled: false,
            },
        );
        self.by_username
            .insert(temp_name.to_lowercase(), slot.clone());
        Ok(slot)
    }

    async fn remove_unfilled_user(&self, username: &str) -> StoreResult<bool> {
        let Some(slot) = self.slot_for(username) else {
            return Ok(false);
        };
        let unfilled = self
            .users
            .get(&slot)
            .is_some_and(|row| row.value().unfilled);
        if !unfilled {
            return Ok(false);
        }
        self.users.remove(&slot);
        self.by_username.remove(&username.to_lowercase());
        Ok(true)
    }

    async fn set_permission_group(
        &self,
        username: &str,
        permission_group: i32,
    ) -> StoreResult<bool> {
        let Some(slot) = self.slot_for(username) else {
            return Ok(false);
        };
        if let Some(mut row) = self.users.get_mut(&slot) {
            row.permission_group = permission_group;
            return Ok(true);
        }
        Ok(false)
    }

    async fn set_settings(&self, username: &str, settings: u32) -> StoreResult<bool> {
        let Some(slot) = self.slot_for(username) else {
            return Ok(false);
        };
        if let Some(mut row) = self.users.get_mut(&slot) {
            row.settings = settings;
            return Ok(true);
        }
        Ok(false)
    }

    async fn disable_user(&self, username: &str) -> StoreResult<bool> {
        let Some(slot) = self.slot_for(username) else {
            return Ok(false);
        };
        if let Some(mut row) = self.users.get_mut(&slot) {
            row.disabled = true;
            return Ok(true);
        }
        Ok(false)
    }

    async fn get_login_data_by_username(
        &self,
        username: &str,
    ) -> StoreResult<Option<LoginRecord>> {
        Ok(self.row_for(username).and_then(|row| {
            row.login.map(|(data, login_token, login_type)| LoginRecord {
                data,
                login_token,
                login_type,
            })
        }))
    }

    async fn get_correctly_cased_username(&self, username: &str) -> StoreResult<Option<String>> {
        Ok(self.row_for(username).map(|row| row.username))
    }

    async fn migrate_login_data(
        &self,
        username: &str,
        login_data: &str,
        login_token: &str,
        login_type: i16,
    ) -> StoreResult<()> {
        let slot = self
            .slot_for(username)
            .ok_or_else(|| pordisto::StoreError::Backend("no such user".to_string()))?;
        let mut row = self
            .users
            .get_mut(&slot)
            .ok_or_else(|| pordisto::StoreError::Backend("no such user".to_string()))?;
        row.login = Some((
            login_data.to_string(),
            login_token.to_string(),
            login_type,
        ));
        Ok(())
    }

    async fn add_session(
        &self,
        session_token: &str,
        username: &str,
        session_name: &str,
    ) -> StoreResult<()> {
        self.sessions.insert(
            session_token.to_string(),
            SessionRow {
                username: username.to_string(),
                session_name: session_name.to_string(),
                created_at: Utc::now(),
            },
        );
        Ok(())
    }

    async fn delete_session(&self, session_token: &str) -> StoreResult<()> {
        self.sessions.remove(session_token);
        Ok(())
    }

    async fn get_session(&self, session_token: &str) -> StoreResult<Option<Session>> {
        let Some(row) = self
            .sessions
            .get(session_token)
            .map(|entry| entry.value().clone())
        else {
            return Ok(None);
        };
        let user = self.row_for(&row.username);
        Ok(Some(Session {
            session_data: SessionData::new(session_token),
            creation_time: row.created_at,
            username: row.username,
            session_name: row.session_name,
            settings: user
                .as_ref()
                .map_or(Permissions::NONE, |u| Permissions::from_bits(u.settings)),
            permission_group: user.map_or(0, |u| u.permission_group),
        }))
    }

    async fn get_username_by_session_data(
        &self,
        session_token: &str,
    ) -> StoreResult<Option<String>> {
        Ok(self
            .sessions
            .get(session_token)
            .map(|entry| entry.value().username.clone()))
    }

    async fn create_authkey(
        &self,
        encoded_credential: &str,
        credential_id: &[u8],
        username: &str,
        _session_name: &str,
    ) -> StoreResult<()> {
        self.authkeys.insert(
            credential_id.to_vec(),
            AuthkeyRow {
                encoded: encoded_credential.to_string(),
                username: username.to_string(),
            },
        );
        Ok(())
    }

    async fn find_credential_by_id(&self, credential_id: &[u8]) -> StoreResult<Option<String>> {
        Ok(self
            .authkeys
            .get(credential_id)
            .map(|entry| entry.value().encoded.clone()))
    }

    async fn get_user_profile_by_credential_id(
        &self,
        credential_id: &[u8],
    ) -> StoreResult<Option<UserProfile>> {
        let Some(username) = self
            .authkeys
            .get(credential_id)
            .map(|entry| entry.value().username.clone())
        else {
            return Ok(None);
        };
        self.get_user_profile(&username).await
    }

    async fn get_user_profile(&self, username: &str) -> StoreResult<Option<UserProfile>> {
        Ok(self.row_for(username).map(|row| UserProfile {
            username: row.username,
            settings: Permissions::from_bits(row.settings),
            permission_group: row.permission_group,
        }))
    }
}

/// Deterministic verifier: issues numbered challenges and accepts any
/// response that echoes the expected challenge, unless told to reject.
#[derive(Default)]
pub struct MockVerifier {
    counter: AtomicU64,
    reject: AtomicBool,
}

impl MockVerifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reject_everything(&self, reject: bool) {
        self.reject.store(reject, Ordering::SeqCst);
    }

    fn next_challenge(&self) -> Vec<u8> {
        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        format!("challenge-{n}").into_bytes()
    }

    fn rejecting(&self) -> bool {
        self.reject.load(Ordering::SeqCst)
    }

    /// Public key the mock derives for a credential id.
    pub fn public_key_for(credential_id: &[u8]) -> Vec<u8> {
        let mut key = b"pk-".to_vec();
        key.extend_from_slice(credential_id);
        key
    }
}

fn challenge_matches(payload: &serde_json::Value, expected: &[u8]) -> bool {
    payload
        .get("challenge")
        .and_then(|value| value.as_str())
        .is_some_and(|value| value == URL_SAFE_NO_PAD.encode(expected))
}

#[async_trait]
impl CredentialVerifier for MockVerifier {
    async fn registration_options(
        &self,
        rp: &RelyingParty,
        user_id: &[u8],
        user_name: &str,
    ) -> Result<RegistrationOptions, VerifierError> {
        Ok(RegistrationOptions {
            rp_id: rp.id.clone(),
            rp_name: rp.name.clone(),
            user_id: user_id.to_vec(),
            user_name: user_name.to_string(),
            challenge: self.next_challenge(),
        })
    }

    async fn verify_registration(
        &self,
        response: &RegistrationResponse,
        expected: &RegistrationOptions,
        _expected_origin: &str,
        _expected_rp_id: &str,
    ) -> Result<VerifiedRegistration, VerifierError> {
        if self.rejecting() {
            return Err(VerifierError::Rejected("forced rejection".to_string()));
        }
        if !challenge_matches(&response.payload, &expected.challenge) {
            return Err(VerifierError::Rejected("challenge mismatch".to_string()));
        }
        let credential_id = URL_SAFE_NO_PAD
            .decode(&response.credential_id)
            .map_err(|err| VerifierError::Rejected(format!("bad credential id: {err}")))?;
        let credential_public_key = Self::public_key_for(&credential_id);
        Ok(VerifiedRegistration {
            credential_id,
            credential_public_key,
        })
    }

    async fn authentication_options(
        &self,
        rp_id: &str,
    ) -> Result<AuthenticationOptions, VerifierError> {
        Ok(AuthenticationOptions {
            rp_id: rp_id.to_string(),
            challenge: self.next_challenge(),
        })
    }

    async fn verify_authentication(
        &self,
        response: &AuthenticationResponse,
        expected: &AuthenticationOptions,
        _expected_origin: &str,
        _expected_rp_id: &str,
        credential_public_key: &[u8],
        _current_sign_count: u32,
    ) -> Result<(), VerifierError> {
        if self.rejecting() {
            return Err(VerifierError::Rejected("forced rejection".to_string()));
        }
        if !challenge_matches(&response.payload, &expected.challenge) {
            return Err(VerifierError::Rejected("challenge mismatch".to_string()));
        }
        if credential_public_key.is_empty() {
            return Err(VerifierError::Rejected("empty public key".to_string()));
        }
        Ok(())
    }
}

/// Registration response a browser would produce for these options.
pub fn registration_response(
    credential_id: &[u8],
    options: &RegistrationOptions,
) -> RegistrationResponse {
    RegistrationResponse {
        credential_id: URL_SAFE_NO_PAD.encode(credential_id),
        payload: json!({ "challenge": URL_SAFE_NO_PAD.encode(&options.challenge) }),
    }
}

/// Authentication response asserting a credential over these options.
pub fn authentication_response(
    credential_id: &[u8],
    options: &AuthenticationOptions,
) -> AuthenticationResponse {
    AuthenticationResponse {
        credential_id: URL_SAFE_NO_PAD.encode(credential_id),
        payload: json!({ "challenge": URL_SAFE_NO_PAD.encode(&options.challenge) }),
    }
}
