//! Login-data derivation and verification.
//!
//! Two schemes coexist while accounts migrate off the legacy hash:
//!
//! - `Weak`: a single SHA3-512 over the length-prefixed username/password
//!   and the per-account login token.
//! - `Strong`: the same preimage additionally peppered with the server
//!   secret, then stretched with PBKDF2-HMAC-SHA3-512 (100k rounds) using
//!   the login token as the KDF salt.
//!
//! The login token is generated once at account creation and reused across
//! migrations, so re-deriving either scheme stays deterministic. The exact
//! byte layout is load-bearing: existing stored records must keep
//! verifying.

use base64::engine::general_purpose::URL_SAFE;
use base64::Engine;
use sha3::{Digest, Sha3_512};
use subtle::ConstantTimeEq;
use uuid::Uuid;

use crate::error::AuthError;

pub const ANONYMOUS_USERNAME: &str = "anonymous";
pub const USERNAME_MIN_LENGTH: usize = 3;
pub const USERNAME_MAX_LENGTH: usize = 32;
pub const PASSWORD_MIN_LENGTH: usize = 5;
pub const PASSWORD_MAX_LENGTH: usize = 1024;

const KDF_ITERATIONS: u32 = 100_000;
const KDF_OUTPUT_LENGTH: usize = 64;

/// Which derivation produced a stored login-data value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginType {
    /// Legacy single-pass SHA3-512
    Weak,
    /// Peppered SHA3-512 + PBKDF2-HMAC-SHA3-512, 100k iterations
    Strong,
}

impl LoginType {
    /// Raw code as persisted by the store.
    #[must_use]
    pub const fn code(self) -> i16 {
        match self {
            Self::Weak => 0,
            Self::Strong => 1,
        }
    }

    #[must_use]
    pub const fn from_code(code: i16) -> Option<Self> {
        match code {
            0 => Some(Self::Weak),
            1 => Some(Self::Strong),
            _ => None,
        }
    }
}

/// The persisted, verifiable proof derived from a username+password pair.
///
/// Immutable value type: migration replaces the whole record, never
/// mutates it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginData {
    pub data: String,
    pub login_token: String,
    pub login_type: LoginType,
}

/// Fresh per-account login token, fixed for the lifetime of the account.
#[must_use]
pub fn generate_login_token() -> String {
    Uuid::new_v4().to_string()
}

/// Unambiguous preimage: every variable-length field is length-prefixed
/// so no two (username, password) pairs can collide by concatenation.
fn login_preimage(username: &str, password: &str, login_token: &str, pepper: Option<&str>) -> Vec<u8> {
    let mut buf = Vec::with_capacity(
        username.len() + password.len() + login_token.len() + 16,
    );
    buf.push(username.len() as u8);
    buf.extend_from_slice(username.as_bytes());
    buf.extend_from_slice(&(password.len() as u16).to_be_bytes());
    buf.extend_from_slice(password.as_bytes());
    buf.extend_from_slice(login_token.as_bytes());
    if let Some(pepper) = pepper {
        buf.extend_from_slice(&(pepper.len() as u64).to_be_bytes());
        buf.extend_from_slice(pepper.as_bytes());
    }
    buf
}

/// Derive legacy login data. A missing token means a fresh account; an
/// existing token reproduces the stored value for verification.
#[must_use]
pub fn weak_login_data(username: &str, password: &str, login_token: Option<&str>) -> LoginData {
    let login_token = login_token.map_or_else(generate_login_token, ToString::to_string);
    let digest = Sha3_512::digest(login_preimage(username, password, &login_token, None));
    LoginData {
        data: URL_SAFE.encode(digest),
        login_token,
        login_type: LoginType::Weak,
    }
}

/// Derive current-scheme login data.
///
/// The SHA3-512 digest of the peppered preimage is base64-encoded and fed
/// through PBKDF2 with the login token as salt, so the stored value is
/// bound to both the server pepper and the per-account token.
#[must_use]
pub fn strong_login_data(
    username: &str,
    password: &str,
    login_token: Option<&str>,
    pepper: &str,
) -> LoginData {
    let login_token = login_token.map_or_else(generate_login_token, ToString::to_string);
    let digest = Sha3_512::digest(login_preimage(username, password, &login_token, Some(pepper)));
    let intermediate = URL_SAFE.encode(digest);

    let mut stretched = [0u8; KDF_OUTPUT_LENGTH];
    pbkdf2::pbkdf2_hmac::<Sha3_512>(
        intermediate.as_bytes(),
        login_token.as_bytes(),
        KDF_ITERATIONS,
        &mut stretched,
    );

    LoginData {
        data: URL_SAFE.encode(stretched),
        login_token,
        login_type: LoginType::Strong,
    }
}

/// Recompute the stored record's scheme and compare in constant time.
pub fn verify_login_data(
    stored: &LoginData,
    username: &str,
    password: &str,
    pepper: &str,
) -> Result<(), AuthError> {
    let derived = match stored.login_type {
        LoginType::Weak => weak_login_data(username, password, Some(&stored.login_token)),
        LoginType::Strong => {
            strong_login_data(username, password, Some(&stored.login_token), pepper)
        }
    };
    let matches: bool = derived
        .data
        .as_bytes()
        .ct_eq(stored.data.as_bytes())
        .into();
    if matches {
        Ok(())
    } else {
        tracing::debug!("Login data mismatch for {username}");
        Err(AuthError::InvalidCredentials)
    }
}

/// Admission rules for a new username. Checked before any hashing so a
/// rejected signup never touches the store.
pub fn validate_username(username: &str) -> Result<(), AuthError> {
    if username.eq_ignore_ascii_case(ANONYMOUS_USERNAME) {
        return Err(AuthError::CannotBeNamedAnonymous);
    }
    if username.len() < USERNAME_MIN_LENGTH {
        return Err(AuthError::UsernameTooShort);
    }
    if username.len() > USERNAME_MAX_LENGTH {
        return Err(AuthError::UsernameTooLong);
    }
    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err(AuthError::UsernameInvalidCharacters);
    }
    Ok(())
}

pub fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.len() < PASSWORD_MIN_LENGTH {
        return Err(AuthError::PasswordTooShort);
    }
    if password.len() > PASSWORD_MAX_LENGTH {
        return Err(AuthError::PasswordTooLong);
    }
    Ok(())
}

pub fn validate_username_and_password(username: &str, password: &str) -> Result<(), AuthError> {
    validate_username(username)?;
    validate_password(password)
}
