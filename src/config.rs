//! Service configuration: server pepper, cookie lifetimes, cache tuning.

use secrecy::SecretString;
use std::time::Duration;

const DEFAULT_SESSION_COOKIE_MAX_AGE: i64 = 30 * 86_400;
const DEFAULT_SESSION_CACHE_TTL: Duration = Duration::from_secs(60);
const DEFAULT_SESSION_CACHE_CAPACITY: u64 = 256;
const DEFAULT_IDENTITY_CACHE_WEIGHT: u64 = 1 << 16;
const DEFAULT_CHALLENGE_TTL: Duration = Duration::from_secs(600);
const DEFAULT_CHALLENGE_CAPACITY: u64 = 1024;

/// Configuration for the auth core, constructed once at startup.
///
/// The pepper (`auth_salt`) is a process-wide secret mixed into every
/// migrated password hash; it must be stable across restarts or existing
/// login data stops verifying.
#[derive(Clone, Debug)]
pub struct AuthConfig {
    auth_salt: SecretString,
    cookie_secure: bool,
    session_cookie_max_age: i64,
    session_cache_ttl: Duration,
    session_cache_capacity: u64,
    identity_cache_weight: u64,
    challenge_ttl: Duration,
    challenge_capacity: u64,
}

impl AuthConfig {
    #[must_use]
    pub fn new(auth_salt: impl Into<String>) -> Self {
        Self {
            auth_salt: SecretString::from(auth_salt.into()),
            cookie_secure: true,
            session_cookie_max_age: DEFAULT_SESSION_COOKIE_MAX_AGE,
            session_cache_ttl: DEFAULT_SESSION_CACHE_TTL,
            session_cache_capacity: DEFAULT_SESSION_CACHE_CAPACITY,
            identity_cache_weight: DEFAULT_IDENTITY_CACHE_WEIGHT,
            challenge_ttl: DEFAULT_CHALLENGE_TTL,
            challenge_capacity: DEFAULT_CHALLENGE_CAPACITY,
        }
    }

    /// Only mark cookies `Secure` when the site is served over HTTPS.
    #[must_use]
    pub fn with_cookie_secure(mut self, secure: bool) -> Self {
        self.cookie_secure = secure;
        self
    }

    #[must_use]
    pub fn with_session_cookie_max_age(mut self, seconds: i64) -> Self {
        self.session_cookie_max_age = seconds;
        self
    }

    #[must_use]
    pub fn with_session_cache_ttl(mut self, ttl: Duration) -> Self {
        self.session_cache_ttl = ttl;
        self
    }

    #[must_use]
    pub fn with_session_cache_capacity(mut self, capacity: u64) -> Self {
        self.session_cache_capacity = capacity;
        self
    }

    #[must_use]
    pub fn with_identity_cache_weight(mut self, weight: u64) -> Self {
        self.identity_cache_weight = weight;
        self
    }

    #[must_use]
    pub fn with_challenge_ttl(mut self, ttl: Duration) -> Self {
        self.challenge_ttl = ttl;
        self
    }

    #[must_use]
    pub fn with_challenge_capacity(mut self, capacity: u64) -> Self {
        self.challenge_capacity = capacity;
        self
    }

    #[must_use]
    pub fn auth_salt(&self) -> &SecretString {
        &self.auth_salt
    }

    #[must_use]
    pub fn cookie_secure(&self) -> bool {
        self.cookie_secure
    }

    #[must_use]
    pub fn session_cookie_max_age(&self) -> i64 {
        self.session_cookie_max_age
    }

    /// The CSRF cookie outlives the session cookie by a factor of two.
    #[must_use]
    pub fn csrf_cookie_max_age(&self) -> i64 {
        self.session_cookie_max_age * 2
    }

    pub(crate) fn session_cache_ttl(&self) -> Duration {
        self.session_cache_ttl
    }

    pub(crate) fn session_cache_capacity(&self) -> u64 {
        self.session_cache_capacity
    }

    pub(crate) fn identity_cache_weight(&self) -> u64 {
        self.identity_cache_weight
    }

    pub(crate) fn challenge_ttl(&self) -> Duration {
        self.challenge_ttl
    }

    pub(crate) fn challenge_capacity(&self) -> u64 {
        self.challenge_capacity
    }
}
