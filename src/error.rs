//! Error kinds surfaced by the credential and session core.

use thiserror::Error;

use crate::store::StoreError;

/// Authentication and account errors.
///
/// Every failure the core can produce is an enumerable kind so the
/// request-handling layer can map it mechanically. `NoSession` is
/// intentionally coarse: a missing session, a CSRF failure, and a rejected
/// `WebAuthn` assertion all surface identically to avoid leaking which
/// check failed.
#[derive(Error, Debug)]
pub enum AuthError {
    /// Username, session, or credential absent
    #[error("not found")]
    NotFound,

    /// Username or user slot collision
    #[error("already exists")]
    AlreadyExists,

    /// Password hash mismatch
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Missing or invalid session, CSRF failure, or rejected assertion
    #[error("no session")]
    NoSession,

    /// The anonymous identifier is reserved
    #[error("username cannot be the anonymous identifier")]
    CannotBeNamedAnonymous,

    /// Username below the minimum length
    #[error("username too short")]
    UsernameTooShort,

    /// Username above the maximum length
    #[error("username too long")]
    UsernameTooLong,

    /// Username contains characters outside `[A-Za-z0-9_-]`
    #[error("username contains invalid characters")]
    UsernameInvalidCharacters,

    /// Password below the minimum length
    #[error("password too short")]
    PasswordTooShort,

    /// Password above the maximum length
    #[error("password too long")]
    PasswordTooLong,

    /// The stored record uses the legacy scheme; the legacy login flow is required
    #[error("account requires the legacy login flow")]
    NeedsOldLogin,

    /// The stored record was already migrated; the legacy login flow is refused
    #[error("account no longer accepts the legacy login flow")]
    NeedsNotOldLogin,

    /// Persistence layer failure
    #[error("store error: {0}")]
    Store(String),

    /// Internal error (token generation, serialization)
    #[error("internal error: {0}")]
    Internal(String),
}

impl AuthError {
    /// Suggested HTTP status code for this error.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            Self::InvalidCredentials | Self::NoSession => 401,
            Self::NotFound => 404,
            Self::AlreadyExists => 409,
            Self::NeedsOldLogin | Self::NeedsNotOldLogin => 400,
            Self::CannotBeNamedAnonymous
            | Self::UsernameTooShort
            | Self::UsernameTooLong
            | Self::UsernameInvalidCharacters
            | Self::PasswordTooShort
            | Self::PasswordTooLong => 422,
            Self::Store(_) | Self::Internal(_) => 500,
        }
    }

    /// Stable error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound => "NOT_FOUND",
            Self::AlreadyExists => "ALREADY_EXISTS",
            Self::InvalidCredentials => "INVALID_CREDENTIALS",
            Self::NoSession => "NO_SESSION",
            Self::CannotBeNamedAnonymous => "CANNOT_BE_NAMED_ANONYMOUS",
            Self::UsernameTooShort => "USERNAME_TOO_SHORT",
            Self::UsernameTooLong => "USERNAME_TOO_LONG",
            Self::UsernameInvalidCharacters => "USERNAME_INVALID_CHARACTERS",
            Self::PasswordTooShort => "PASSWORD_TOO_SHORT",
            Self::PasswordTooLong => "PASSWORD_TOO_LONG",
            Self::NeedsOldLogin => "NEEDS_OLD_LOGIN",
            Self::NeedsNotOldLogin => "NEEDS_NOT_OLD_LOGIN",
            Self::Store(_) => "STORE_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl From<StoreError> for AuthError {
    fn from(err: StoreError) -> Self {
        tracing::error!("Store error: {err}");
        Self::Store(err.to_string())
    }
}
