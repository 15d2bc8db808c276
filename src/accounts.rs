//! Account lifecycle: signup, the two login flows, lazy hash migration,
//! and member administration.
//!
//! Signup fills a pre-created user slot (invited members get a slot before
//! they pick a name). Login is scheme-gated: an account whose stored login
//! data is still the legacy hash must use the legacy flow, and vice versa,
//! so a downgrade can never be forced by the client. A successful legacy
//! login immediately re-derives the record under the current scheme with
//! the same login token and persists it.

use http::{HeaderMap, HeaderValue};
use secrecy::{ExposeSecret, SecretString};
use std::sync::Arc;

use crate::config::AuthConfig;
use crate::credentials::{
    strong_login_data, validate_username_and_password, verify_login_data, LoginData, LoginType,
    PASSWORD_MAX_LENGTH,
};
use crate::error::AuthError;
use crate::permissions::Permissions;
use crate::session::{SessionData, SessionStore};
use crate::store::Database;

/// Signup, login, and member-administration flows against the store.
pub struct AccountManager<D> {
    db: Arc<D>,
    sessions: SessionStore<D>,
    auth_salt: SecretString,
}

impl<D> Clone for AccountManager<D> {
    fn clone(&self) -> Self {
        Self {
            db: Arc::clone(&self.db),
            sessions: self.sessions.clone(),
            auth_salt: self.auth_salt.clone(),
        }
    }
}

impl<D: Database> AccountManager<D> {
    #[must_use]
    pub fn new(db: Arc<D>, sessions: SessionStore<D>, config: &AuthConfig) -> Self {
        Self {
            db,
            sessions,
            auth_salt: config.auth_salt().clone(),
        }
    }

    /// Create an account in a reserved slot and log it in.
    ///
    /// Validation runs before anything touches the store; a rejected
    /// signup leaves no partial state behind.
    pub async fn sign_up(
        &self,
        username: &str,
        password: &str,
        session_name: &str,
        user_slot: &str,
    ) -> Result<SessionData, AuthError> {
        validate_username_and_password(username, password)?;
        if self.db.has_username(username, Some(user_slot)).await? {
            return Err(AuthError::AlreadyExists);
        }
        let login_data = strong_login_data(username, password, None, self.auth_salt.expose_secret());
        self.db
            .create_user(
                username,
                &login_data.data,
                &login_data.login_token,
                login_data.login_type.code(),
                user_slot,
            )
            .await?;
        self.sessions.create(username, session_name).await
    }

    /// Current-scheme login. Accounts still on the legacy hash are
    /// redirected to the legacy flow instead of silently falling back.
    pub async fn login(
        &self,
        username: &str,
        password: &str,
        session_name: &str,
    ) -> Result<SessionData, AuthError> {
        if !self.db.has_username(username, None).await? {
            return Err(AuthError::NotFound);
        }
        let stored = self.lookup_login_data(username).await?;
        if stored.login_type != LoginType::Strong {
            return Err(AuthError::NeedsOldLogin);
        }
        let corrected = self.correctly_cased(username).await?;
        self.verify(&stored, &corrected, password)?;
        self.sessions.create(&corrected, session_name).await
    }

    /// Legacy login plus lazy upgrade.
    ///
    /// `new_password` lets the frontend collect a replacement password
    /// during migration; the old one is re-used otherwise. The migrated
    /// record keeps the stored login token so the account keeps verifying
    /// deterministically under the current scheme.
    pub async fn legacy_login(
        &self,
        username: &str,
        password: &str,
        session_name: &str,
        new_password: Option<&str>,
    ) -> Result<SessionData, AuthError> {
        if !self.db.has_username(username, None).await? {
            return Err(AuthError::NotFound);
        }
        let stored = self.lookup_login_data(username).await?;
        if stored.login_type != LoginType::Weak {
            return Err(AuthError::NeedsNotOldLogin);
        }
        let corrected = self.correctly_cased(username).await?;
        self.verify(&stored, &corrected, password)?;

        let migrated = strong_login_data(
            &corrected,
            new_password.unwrap_or(password),
            Some(&stored.login_token),
            self.auth_salt.expose_secret(),
        );
        self.db
            .migrate_login_data(
                username,
                &migrated.data,
                &migrated.login_token,
                migrated.login_type.code(),
            )
            .await?;
        self.sessions.create(&corrected, session_name).await
    }

    /// Which login flow the account currently requires.
    pub async fn login_type(&self, username: &str) -> Result<LoginType, AuthError> {
        Ok(self.lookup_login_data(username).await?.login_type)
    }

    /// Reserve an unfilled slot for an invited member.
    pub async fn create_user_slot(
        &self,
        settings: Permissions,
        permission_group: i32,
        temp_name: &str,
    ) -> Result<String, AuthError> {
        if self.db.has_username(temp_name, None).await? {
            return Err(AuthError::AlreadyExists);
        }
        Ok(self
            .db
            .create_user_slot(settings.bits(), permission_group, temp_name)
            .await?)
    }

    pub async fn remove_unfilled_user(&self, username: &str) -> Result<(), AuthError> {
        if self.db.remove_unfilled_user(username).await? {
            Ok(())
        } else {
            Err(AuthError::NotFound)
        }
    }

    pub async fn set_permission_group(
        &self,
        username: &str,
        permission_group: i32,
    ) -> Result<(), AuthError> {
        if self.db.set_permission_group(username, permission_group).await? {
            Ok(())
        } else {
            Err(AuthError::NotFound)
        }
    }

    /// Replace an account's capability mask wholesale.
    pub async fn set_settings(
        &self,
        username: &str,
        settings: Permissions,
    ) -> Result<(), AuthError> {
        if self.db.set_settings(username, settings.bits()).await? {
            Ok(())
        } else {
            Err(AuthError::NotFound)
        }
    }

    pub async fn disable_user(&self, username: &str) -> Result<(), AuthError> {
        if self.db.disable_user(username).await? {
            Ok(())
        } else {
            Err(AuthError::NotFound)
        }
    }

    /// Delete the session named by the request's cookie, if any, and hand
    /// back the clearing `Set-Cookie`. A cookieless request is a no-op.
    pub async fn logout(&self, headers: &HeaderMap) -> Result<Option<HeaderValue>, AuthError> {
        let Some(session_data) = SessionData::from_headers(headers) else {
            return Ok(None);
        };
        self.sessions.invalidate(&session_data).await?;
        Ok(Some(self.sessions.clear_session_cookie()?))
    }

    async fn lookup_login_data(&self, username: &str) -> Result<LoginData, AuthError> {
        let record = self
            .db
            .get_login_data_by_username(username)
            .await?
            .ok_or(AuthError::NotFound)?;
        let login_type = LoginType::from_code(record.login_type).ok_or_else(|| {
            AuthError::Internal(format!("unknown login type code {}", record.login_type))
        })?;
        Ok(LoginData {
            data: record.data,
            login_token: record.login_token,
            login_type,
        })
    }

    async fn correctly_cased(&self, username: &str) -> Result<String, AuthError> {
        self.db
            .get_correctly_cased_username(username)
            .await?
            .ok_or(AuthError::NotFound)
    }

    fn verify(
        &self,
        stored: &LoginData,
        username: &str,
        password: &str,
    ) -> Result<(), AuthError> {
        // Stored records never exceed the signup bounds, so an oversized
        // attempt cannot match and must not reach the length-prefixed
        // preimage.
        if password.len() > PASSWORD_MAX_LENGTH {
            return Err(AuthError::InvalidCredentials);
        }
        verify_login_data(stored, username, password, self.auth_salt.expose_secret())
    }
}
