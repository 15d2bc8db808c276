//! Double-submit CSRF protection.
//!
//! State-changing requests must echo the CSRF cookie back in a custom
//! header. Verification compares both sides in constant time and then
//! re-checks that the cookie is really present: when cookie and header are
//! both absent, both fall back to the same placeholder and would otherwise
//! compare equal. A CSRF failure surfaces as `NoSession`, indistinguishable
//! from being unauthenticated.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use http::{HeaderMap, HeaderValue};
use rand::rngs::OsRng;
use rand::RngCore;
use subtle::ConstantTimeEq;

use crate::config::AuthConfig;
use crate::error::AuthError;
use crate::session::{build_cookie, cookie_value};

pub const CSRF_COOKIE_NAME: &str = "csrftoken";
pub const CSRF_HEADER_NAME: &str = "X-CSRFTOKEN";

const CSRF_TOKEN_BYTES: usize = 128;
/// Placeholder compared when either side is missing; never a valid token.
const ABSENT: &str = "csrf";

/// Issues and verifies double-submit tokens.
#[derive(Debug, Clone)]
pub struct CsrfGuard {
    cookie_max_age: i64,
    cookie_secure: bool,
}

impl CsrfGuard {
    #[must_use]
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            cookie_max_age: config.csrf_cookie_max_age(),
            cookie_secure: config.cookie_secure(),
        }
    }

    /// Fresh token plus the `Set-Cookie` value carrying it. Attach to any
    /// identity-bearing page render.
    pub fn issue(&self) -> Result<(String, HeaderValue), AuthError> {
        let mut bytes = [0u8; CSRF_TOKEN_BYTES];
        OsRng
            .try_fill_bytes(&mut bytes)
            .map_err(|err| AuthError::Internal(format!("failed to generate csrf token: {err}")))?;
        let token = URL_SAFE_NO_PAD.encode(bytes);
        let cookie = build_cookie(
            CSRF_COOKIE_NAME,
            &token,
            self.cookie_max_age,
            self.cookie_secure,
        )?;
        Ok((token, cookie))
    }

    /// The CSRF cookie value, if the request carries one.
    #[must_use]
    pub fn extract(headers: &HeaderMap) -> Option<String> {
        cookie_value(headers, CSRF_COOKIE_NAME)
    }

    /// Verify the cookie/header pair of a mutating request.
    pub fn verify(&self, headers: &HeaderMap) -> Result<(), AuthError> {
        let header = headers
            .get(CSRF_HEADER_NAME)
            .and_then(|value| value.to_str().ok())
            .unwrap_or(ABSENT);
        let cookie = Self::extract(headers);
        let cookie_str = cookie.as_deref().unwrap_or(ABSENT);

        let matches: bool = header.as_bytes().ct_eq(cookie_str.as_bytes()).into();
        if !matches {
            tracing::debug!("CSRF token mismatch");
            return Err(AuthError::NoSession);
        }
        // Both sides defaulting to the placeholder must not count as a match.
        if cookie.is_none() {
            tracing::debug!("CSRF cookie absent");
            return Err(AuthError::NoSession);
        }
        Ok(())
    }
}
