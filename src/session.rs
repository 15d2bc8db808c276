//! Session minting, resolution, and the request-path caches.
//!
//! A session token is a pure bearer credential: 256 bytes of entropy with
//! no embedded meaning, resolved against the store. Two read-through
//! caches sit in front of the store because the request path has two very
//! different read patterns: full hydration ("who is this actor") and a
//! high-volume validity check ("is this token a session at all"). Neither
//! cache is ever a source of truth.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Utc};
use http::header::COOKIE;
use http::{HeaderMap, HeaderValue};
use moka::future::Cache;
use rand::rngs::OsRng;
use rand::RngCore;
use std::sync::Arc;

use crate::config::AuthConfig;
use crate::credentials::ANONYMOUS_USERNAME;
use crate::error::AuthError;
use crate::permissions::Permissions;
use crate::store::{Database, UserProfile};

pub const SESSION_COOKIE_NAME: &str = "session";

const SESSION_TOKEN_BYTES: usize = 256;

/// A bearer session token as carried by the session cookie.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionData(String);

impl SessionData {
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    #[must_use]
    pub fn token(&self) -> &str {
        &self.0
    }

    /// Extract the session cookie from request headers, if present.
    #[must_use]
    pub fn from_headers(headers: &HeaderMap) -> Option<Self> {
        cookie_value(headers, SESSION_COOKIE_NAME).map(Self)
    }
}

/// Generate a fresh session token.
/// The raw value is only handed to the client; the store keeps the mapping.
pub(crate) fn generate_session_data() -> Result<SessionData, AuthError> {
    let mut bytes = [0u8; SESSION_TOKEN_BYTES];
    OsRng
        .try_fill_bytes(&mut bytes)
        .map_err(|err| AuthError::Internal(format!("failed to generate session token: {err}")))?;
    Ok(SessionData(URL_SAFE_NO_PAD.encode(bytes)))
}

/// A resolved actor: either an authenticated account or the anonymous
/// sentinel.
#[derive(Debug, Clone)]
pub struct Session {
    pub session_data: SessionData,
    pub creation_time: DateTime<Utc>,
    pub username: String,
    pub session_name: String,
    pub settings: Permissions,
    pub permission_group: i32,
}

impl Session {
    /// The anonymous sentinel: never persisted, holds no capabilities,
    /// and sorts below every real permission group.
    #[must_use]
    pub fn anonymous() -> Self {
        Self {
            session_data: SessionData::new(""),
            creation_time: Utc::now(),
            username: ANONYMOUS_USERNAME.to_string(),
            session_name: ANONYMOUS_USERNAME.to_string(),
            settings: Permissions::NONE,
            permission_group: i32::MIN + 1,
        }
    }

    #[must_use]
    pub fn is_anonymous(&self) -> bool {
        self.username == ANONYMOUS_USERNAME
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        !self.is_anonymous()
    }
}

/// Value of a named cookie in request headers.
pub(crate) fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    let header = headers.get(COOKIE)?;
    let value = header.to_str().ok()?;
    for pair in value.split(';') {
        let trimmed = pair.trim();
        let mut parts = trimmed.splitn(2, '=');
        let key = parts.next()?.trim();
        let val = parts.next()?.trim();
        if key == name {
            return Some(val.to_string());
        }
    }
    None
}

/// Build a `Set-Cookie` value in the shape every cookie of this core uses.
pub(crate) fn build_cookie(
    name: &str,
    value: &str,
    max_age: i64,
    secure: bool,
) -> Result<HeaderValue, AuthError> {
    let mut cookie = format!("{name}={value}; Path=/; HttpOnly; SameSite=Lax; Max-Age={max_age}");
    if secure {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
        .map_err(|err| AuthError::Internal(format!("invalid cookie value: {err}")))
}

/// Session creation, resolution, and invalidation against the store, with
/// the two request-path caches in front.
pub struct SessionStore<D> {
    db: Arc<D>,
    /// token -> full session; bounds how stale a hydrated actor can be.
    sessions: Cache<String, Session>,
    /// token -> username; weight-bounded by key+value size, no TTL.
    identities: Cache<String, String>,
    cookie_max_age: i64,
    cookie_secure: bool,
}

impl<D> Clone for SessionStore<D> {
    fn clone(&self) -> Self {
        Self {
            db: Arc::clone(&self.db),
            sessions: self.sessions.clone(),
            identities: self.identities.clone(),
            cookie_max_age: self.cookie_max_age,
            cookie_secure: self.cookie_secure,
        }
    }
}

impl<D: Database> SessionStore<D> {
    #[must_use]
    pub fn new(db: Arc<D>, config: &AuthConfig) -> Self {
        let sessions = Cache::builder()
            .max_capacity(config.session_cache_capacity())
            .time_to_live(config.session_cache_ttl())
            .build();
        let identities = Cache::builder()
            .max_capacity(config.identity_cache_weight())
            .weigher(|key: &String, value: &String| {
                u32::try_from(key.len() + value.len()).unwrap_or(u32::MAX)
            })
            .build();
        Self {
            db,
            sessions,
            identities,
            cookie_max_age: config.session_cookie_max_age(),
            cookie_secure: config.cookie_secure(),
        }
    }

    /// Mint and persist a fresh session for an account.
    pub async fn create(
        &self,
        username: &str,
        session_name: &str,
    ) -> Result<SessionData, AuthError> {
        let session_data = generate_session_data()?;
        self.db
            .add_session(session_data.token(), username, session_name)
            .await?;
        Ok(session_data)
    }

    /// Resolve a token to a full session, cache-first.
    pub async fn resolve(&self, session_data: &SessionData) -> Result<Session, AuthError> {
        if let Some(session) = self.sessions.get(session_data.token()).await {
            return Ok(session);
        }
        let session = self
            .db
            .get_session(session_data.token())
            .await?
            .ok_or(AuthError::NoSession)?;
        self.sessions
            .insert(session_data.token().to_string(), session.clone())
            .await;
        Ok(session)
    }

    /// Resolve the session cookie from request headers.
    pub async fn resolve_from_headers(&self, headers: &HeaderMap) -> Result<Session, AuthError> {
        let session_data = SessionData::from_headers(headers).ok_or(AuthError::NoSession)?;
        self.resolve(&session_data).await
    }

    /// Like `resolve_from_headers`, but unauthenticated requests get the
    /// anonymous sentinel instead of an error.
    pub async fn resolve_or_anonymous(&self, headers: &HeaderMap) -> Result<Session, AuthError> {
        match self.resolve_from_headers(headers).await {
            Ok(session) => Ok(session),
            Err(AuthError::NoSession) => Ok(Session::anonymous()),
            Err(err) => Err(err),
        }
    }

    /// Lightweight validity check: token -> username, via the identity
    /// cache. Used on every authenticated request without hydrating the
    /// full session.
    pub async fn check(&self, session_data: &SessionData) -> Result<String, AuthError> {
        if let Some(username) = self.identities.get(session_data.token()).await {
            return Ok(username);
        }
        let username = self
            .db
            .get_username_by_session_data(session_data.token())
            .await?
            .ok_or(AuthError::NotFound)?;
        self.identities
            .insert(session_data.token().to_string(), username.clone())
            .await;
        Ok(username)
    }

    /// Delete the session from the store. Cache entries are left to age
    /// out: privileged operations still hit the store, and a rejected
    /// session staying visible for one cache TTL is tolerated.
    pub async fn invalidate(&self, session_data: &SessionData) -> Result<(), AuthError> {
        self.db.delete_session(session_data.token()).await?;
        Ok(())
    }

    /// Profile of the resolved account; a vanished row means the session
    /// no longer stands for anyone.
    pub async fn user_profile(&self, session: &Session) -> Result<UserProfile, AuthError> {
        self.db
            .get_user_profile(&session.username)
            .await?
            .ok_or(AuthError::NoSession)
    }

    /// `Set-Cookie` value carrying the session token.
    pub fn session_cookie(&self, session_data: &SessionData) -> Result<HeaderValue, AuthError> {
        build_cookie(
            SESSION_COOKIE_NAME,
            session_data.token(),
            self.cookie_max_age,
            self.cookie_secure,
        )
    }

    /// `Set-Cookie` value clearing the session cookie.
    pub fn clear_session_cookie(&self) -> Result<HeaderValue, AuthError> {
        build_cookie(SESSION_COOKIE_NAME, "", 0, self.cookie_secure)
    }
}
