//! Challenge lifecycle for public-key (passkey) registration and login.
//!
//! Two independent one-time-challenge flows, each backed by its own TTL
//! cache:
//!
//! - registration challenges are keyed by username, so a user re-polling
//!   the registration page inside the TTL receives the same challenge;
//! - login challenges are keyed by the caller's CSRF cookie, because the
//!   user is not identified yet — which also means a login attempt cannot
//!   even begin without a CSRF cookie.
//!
//! A login challenge is deleted when consumed; a second attempt against it
//! fails as `NoSession`. Verifier rejections are normalized to `NoSession`
//! as well so callers cannot distinguish which check failed.

pub mod models;

use http::HeaderMap;
use moka::future::Cache;
use std::sync::Arc;
use uuid::Uuid;

use crate::config::AuthConfig;
use crate::csrf::CsrfGuard;
use crate::error::AuthError;
use crate::session::{Session, SessionData, SessionStore};
use crate::store::{Database, UserProfile};

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;

pub use models::{
    AuthenticationOptions, AuthenticationResponse, CredentialVerifier, RegistrationOptions,
    RegistrationResponse, RelyingParty, VerifiedRegistration, VerifierError, WebAuthnCredential,
    RELYING_PARTY_NAME,
};

/// The authenticator response does not prove a monotonically increasing
/// signature counter here; the sign count handed to the verifier is pinned.
/// One-time challenge consumption is the replay bound this core owns.
const PINNED_SIGN_COUNT: u32 = 0;

/// Orchestrates the two-step challenge protocol around the external
/// verifier and mints sessions on successful login.
pub struct PasskeyService<D, V> {
    db: Arc<D>,
    verifier: Arc<V>,
    sessions: SessionStore<D>,
    /// username -> pending registration challenge
    registrations: Cache<String, RegistrationOptions>,
    /// csrf token -> pending login challenge
    logins: Cache<String, AuthenticationOptions>,
}

impl<D, V> Clone for PasskeyService<D, V> {
    fn clone(&self) -> Self {
        Self {
            db: Arc::clone(&self.db),
            verifier: Arc::clone(&self.verifier),
            sessions: self.sessions.clone(),
            registrations: self.registrations.clone(),
            logins: self.logins.clone(),
        }
    }
}

impl<D: Database, V: CredentialVerifier> PasskeyService<D, V> {
    #[must_use]
    pub fn new(
        db: Arc<D>,
        verifier: Arc<V>,
        sessions: SessionStore<D>,
        config: &AuthConfig,
    ) -> Self {
        let registrations = Cache::builder()
            .max_capacity(config.challenge_capacity())
            .time_to_live(config.challenge_ttl())
            .build();
        let logins = Cache::builder()
            .max_capacity(config.challenge_capacity())
            .time_to_live(config.challenge_ttl())
            .build();
        Self {
            db,
            verifier,
            sessions,
            registrations,
            logins,
        }
    }

    /// Challenge for registering a new credential. Idempotent within the
    /// cache TTL: re-polling returns the pending challenge instead of
    /// invalidating it with a fresh one.
    pub async fn register_begin(
        &self,
        user: &UserProfile,
        hostname: &str,
    ) -> Result<RegistrationOptions, AuthError> {
        if let Some(options) = self.registrations.get(&user.username).await {
            return Ok(options);
        }
        let rp = RelyingParty::from_hostname(hostname);
        let options = self
            .verifier
            .registration_options(&rp, Uuid::new_v4().as_bytes(), &user.username)
            .await
            .map_err(|err| AuthError::Internal(format!("registration options: {err}")))?;
        self.registrations
            .insert(user.username.clone(), options.clone())
            .await;
        Ok(options)
    }

    /// Verify the browser's registration response against the pending
    /// challenge and persist the credential for the session's account.
    pub async fn register_finish(
        &self,
        user: &UserProfile,
        session: &Session,
        hostname: &str,
        response: &RegistrationResponse,
    ) -> Result<(), AuthError> {
        let expected = self.register_begin(user, hostname).await?;
        let rp = RelyingParty::from_hostname(hostname);
        let verified = self
            .verifier
            .verify_registration(response, &expected, &rp.origin(), &rp.id)
            .await
            .map_err(|err| {
                tracing::debug!("Registration response rejected: {err}");
                AuthError::NoSession
            })?;

        let credential = WebAuthnCredential {
            credential_public_key: verified.credential_public_key,
            credential_id: verified.credential_id,
        };
        self.db
            .create_authkey(
                &credential.encode()?,
                &credential.credential_id,
                &session.username,
                &session.session_name,
            )
            .await?;
        Ok(())
    }

    /// Challenge for logging in with a registered credential, keyed by the
    /// caller's CSRF cookie. Idempotent within the TTL like registration.
    pub async fn login_begin(
        &self,
        headers: &HeaderMap,
        hostname: &str,
    ) -> Result<AuthenticationOptions, AuthError> {
        let csrf_token = CsrfGuard::extract(headers).ok_or(AuthError::NoSession)?;
        if let Some(options) = self.logins.get(&csrf_token).await {
            return Ok(options);
        }
        let options = self
            .verifier
            .authentication_options(hostname)
            .await
            .map_err(|err| AuthError::Internal(format!("authentication options: {err}")))?;
        self.logins.insert(csrf_token, options.clone()).await;
        Ok(options)
    }

    /// Verify an assertion, consume its challenge, and mint a session for
    /// the credential's owner.
    pub async fn login_finish(
        &self,
        headers: &HeaderMap,
        hostname: &str,
        response: &AuthenticationResponse,
        session_name: &str,
    ) -> Result<SessionData, AuthError> {
        let csrf_token = CsrfGuard::extract(headers).ok_or(AuthError::NoSession)?;
        // Strict lookup: a consumed or expired challenge must not be
        // replaced under an in-flight response.
        let expected = self
            .logins
            .get(&csrf_token)
            .await
            .ok_or(AuthError::NoSession)?;

        let credential_id = URL_SAFE_NO_PAD
            .decode(&response.credential_id)
            .map_err(|_| AuthError::NoSession)?;
        let stored = self
            .db
            .find_credential_by_id(&credential_id)
            .await?
            .ok_or(AuthError::NoSession)?;
        let credential = WebAuthnCredential::decode(&stored)?;

        let rp = RelyingParty::from_hostname(hostname);
        self.verifier
            .verify_authentication(
                response,
                &expected,
                &rp.origin(),
                &rp.id,
                &credential.credential_public_key,
                PINNED_SIGN_COUNT,
            )
            .await
            .map_err(|err| {
                tracing::debug!("Authentication response rejected: {err}");
                AuthError::NoSession
            })?;

        // One-time use: the challenge is spent whether or not anything
        // downstream fails.
        self.logins.invalidate(&csrf_token).await;

        let owner = self
            .db
            .get_user_profile_by_credential_id(&credential.credential_id)
            .await?
            .ok_or(AuthError::NoSession)?;
        self.sessions.create(&owner.username, session_name).await
    }
}
