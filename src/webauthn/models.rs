//! Payload types and the external verifier interface for public-key
//! authentication.
//!
//! The cryptographic work (attestation and assertion verification,
//! challenge signing rules) belongs to the verifier behind
//! `CredentialVerifier`; this crate only moves these payloads around and
//! stores the resulting credential.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::AuthError;

/// Fixed relying-party display name presented to authenticators.
pub const RELYING_PARTY_NAME: &str = "Pordisto";

/// Relying party for one request; the id is the serving hostname.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelyingParty {
    pub id: String,
    pub name: String,
}

impl RelyingParty {
    #[must_use]
    pub fn from_hostname(hostname: &str) -> Self {
        Self {
            id: hostname.to_string(),
            name: RELYING_PARTY_NAME.to_string(),
        }
    }

    /// Expected origin for responses bound to this relying party.
    #[must_use]
    pub fn origin(&self) -> String {
        format!("https://{}", self.id)
    }
}

/// Options handed to the browser to create a new credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationOptions {
    pub rp_id: String,
    pub rp_name: String,
    pub user_id: Vec<u8>,
    pub user_name: String,
    pub challenge: Vec<u8>,
}

/// Options handed to the browser to assert an existing credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticationOptions {
    pub rp_id: String,
    pub challenge: Vec<u8>,
}

/// Browser response to a registration challenge. The payload stays opaque
/// to this crate and is interpreted by the verifier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistrationResponse {
    /// base64-url (unpadded) credential id chosen by the authenticator
    pub credential_id: String,
    pub payload: serde_json::Value,
}

/// Browser response to an authentication challenge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthenticationResponse {
    /// base64-url (unpadded) id of the credential being asserted
    pub credential_id: String,
    pub payload: serde_json::Value,
}

/// What the verifier extracted from a valid registration response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedRegistration {
    pub credential_id: Vec<u8>,
    pub credential_public_key: Vec<u8>,
}

/// One registered authenticator bound to one account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebAuthnCredential {
    pub credential_public_key: Vec<u8>,
    pub credential_id: Vec<u8>,
}

/// Persisted layout: JSON with the byte fields base64-encoded, the whole
/// record base64-encoded again for storage in a text column.
#[derive(Serialize, Deserialize)]
struct CredentialRecord {
    public_key: String,
    id: String,
}

impl WebAuthnCredential {
    pub fn encode(&self) -> Result<String, AuthError> {
        let record = CredentialRecord {
            public_key: STANDARD.encode(&self.credential_public_key),
            id: STANDARD.encode(&self.credential_id),
        };
        let json = serde_json::to_vec(&record)
            .map_err(|err| AuthError::Internal(format!("failed to encode credential: {err}")))?;
        Ok(STANDARD.encode(json))
    }

    pub fn decode(encoded: &str) -> Result<Self, AuthError> {
        let json = STANDARD
            .decode(encoded)
            .map_err(|err| AuthError::Internal(format!("corrupt credential record: {err}")))?;
        let record: CredentialRecord = serde_json::from_slice(&json)
            .map_err(|err| AuthError::Internal(format!("corrupt credential record: {err}")))?;
        Ok(Self {
            credential_public_key: STANDARD
                .decode(&record.public_key)
                .map_err(|err| AuthError::Internal(format!("corrupt credential record: {err}")))?,
            credential_id: STANDARD
                .decode(&record.id)
                .map_err(|err| AuthError::Internal(format!("corrupt credential record: {err}")))?,
        })
    }
}

/// Failure reported by the external verifier.
#[derive(Debug, Error)]
pub enum VerifierError {
    /// The response did not verify against the challenge.
    #[error("response rejected: {0}")]
    Rejected(String),
    /// The verifier itself failed.
    #[error("verifier unavailable: {0}")]
    Backend(String),
}

/// External challenge generator and response verifier.
///
/// All four calls are opaque and fallible; this core decides only when to
/// call them and what to do with the result.
#[async_trait]
pub trait CredentialVerifier: Send + Sync {
    async fn registration_options(
        &self,
        rp: &RelyingParty,
        user_id: &[u8],
        user_name: &str,
    ) -> Result<RegistrationOptions, VerifierError>;

    async fn verify_registration(
        &self,
        response: &RegistrationResponse,
        expected: &RegistrationOptions,
        expected_origin: &str,
        expected_rp_id: &str,
    ) -> Result<VerifiedRegistration, VerifierError>;

    async fn authentication_options(
        &self,
        rp_id: &str,
    ) -> Result<AuthenticationOptions, VerifierError>;

    #[allow(clippy::too_many_arguments)]
    async fn verify_authentication(
        &self,
        response: &AuthenticationResponse,
        expected: &AuthenticationOptions,
        expected_origin: &str,
        expected_rp_id: &str,
        credential_public_key: &[u8],
        current_sign_count: u32,
    ) -> Result<(), VerifierError>;
}
