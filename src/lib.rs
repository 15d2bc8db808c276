//! # Pordisto (credential, session, and capability core)
//!
//! `pordisto` decides who a request *is* and what that identity may do,
//! for a multi-user web application. It owns the credential lifecycle and
//! nothing else: the HTTP framework and the persistence layer are
//! collaborators behind narrow interfaces.
//!
//! ## Credentials
//!
//! Passwords are never stored; the store holds derived login data under
//! one of two schemes. Legacy records (single SHA3-512) keep verifying
//! and are upgraded in place — same per-account login token — the first
//! time their owner logs in, after which the legacy flow is refused for
//! that account. Scheme selection is read from the stored record, never
//! negotiated with the client.
//!
//! ## Sessions
//!
//! A session is a 256-byte bearer token resolved against the store
//! through two read-through caches: a short-lived hydrated-session cache
//! for the "who is this actor" path and a weight-bounded identity cache
//! for the per-request validity check. The distinguished anonymous
//! session stands for unauthenticated callers and is never persisted.
//!
//! ## Capabilities
//!
//! Permissions are a plain integer bitmask in which every composite
//! permission structurally contains its prerequisites, so a grant check
//! is a single constant-time mask comparison.
//!
//! ## Public-key login
//!
//! `WebAuthn`-style registration and login run a two-step challenge
//! protocol; challenge issuance and caching live here, cryptographic
//! verification is delegated to an external verifier. Login challenges
//! are keyed by the caller's CSRF cookie and are strictly one-time.

pub mod accounts;
pub mod config;
pub mod credentials;
pub mod csrf;
pub mod error;
pub mod permissions;
pub mod service;
pub mod session;
pub mod store;
pub mod webauthn;

pub use accounts::AccountManager;
pub use config::AuthConfig;
pub use credentials::{LoginData, LoginType, ANONYMOUS_USERNAME};
pub use csrf::{CsrfGuard, CSRF_COOKIE_NAME, CSRF_HEADER_NAME};
pub use error::AuthError;
pub use permissions::Permissions;
pub use service::AuthService;
pub use session::{Session, SessionData, SessionStore, SESSION_COOKIE_NAME};
pub use store::{Database, LoginRecord, StoreError, UserProfile};
pub use webauthn::{CredentialVerifier, PasskeyService, WebAuthnCredential};
