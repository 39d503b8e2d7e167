//! Passkey wire and record types
//!
//! Serializable data structures exchanged with the browser (creation and
//! request options, attestation and assertion responses) plus the persisted
//! credential record and the typed ceremony results.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Creation options sent to the client for a registration ceremony
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct RegistrationOptions {
    pub challenge: String, // Base64URL-encoded random challenge
    pub rp: RelyingParty,
    pub user: UserEntity,
    #[serde(rename = "pubKeyCredParams")]
    pub public_key_params: Vec<PublicKeyCredentialParameters>,
    pub timeout: u32, // Milliseconds
    pub attestation: String, // "none", "indirect", "direct"
    #[serde(rename = "authenticatorSelection")]
    pub authenticator_selection: AuthenticatorSelectionCriteria,
    #[serde(rename = "excludeCredentials")]
    pub exclude_credentials: Vec<PublicKeyCredentialDescriptor>,
}

/// Request options sent to the client for an authentication ceremony
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct AuthenticationOptions {
    pub challenge: String, // Base64URL-encoded random challenge
    pub timeout: u32,      // Milliseconds
    #[serde(rename = "rpId")]
    pub rp_id: String,
    #[serde(rename = "allowCredentials")]
    pub allow_credentials: Vec<PublicKeyCredentialDescriptor>,
    #[serde(rename = "userVerification")]
    pub user_verification: String, // "required", "preferred", "discouraged"
}

/// Relying party information
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct RelyingParty {
    pub id: String,   // Domain name (e.g., "example.com")
    pub name: String, // Display name
}

/// User entity descriptor, also used as the resolved-user half of results
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct UserEntity {
    pub id: String, // Base64URL-encoded user handle
    pub name: String,
    #[serde(rename = "displayName")]
    pub display_name: String,
}

/// Public key credential parameters
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct PublicKeyCredentialParameters {
    #[serde(rename = "type")]
    pub r#type: String, // Always "public-key"
    pub alg: i64, // IANA COSE algorithm identifier
}

/// Authenticator selection criteria
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct AuthenticatorSelectionCriteria {
    #[serde(rename = "authenticatorAttachment")]
    pub authenticator_attachment: Option<String>, // "platform", "cross-platform"
    #[serde(rename = "requireResidentKey")]
    pub require_resident_key: bool,
    #[serde(rename = "userVerification")]
    pub user_verification: String,
}

/// Public key credential descriptor
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct PublicKeyCredentialDescriptor {
    #[serde(rename = "type")]
    pub r#type: String, // Always "public-key"
    pub id: String, // Base64URL-encoded credential ID
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub transports: Vec<String>,
}

/// Registration response from the client
#[derive(Serialize, Deserialize, Debug)]
pub struct RegistrationResponse {
    pub id: String, // Base64URL-encoded credential ID
    #[serde(rename = "rawId")]
    pub raw_id: String,
    pub response: AuthenticatorAttestationResponse,
    #[serde(rename = "clientExtensionResults", default)]
    pub client_extension_results: Option<serde_json::Value>,
    pub r#type: String, // Always "public-key"
}

/// Authentication response from the client
#[derive(Serialize, Deserialize, Debug)]
pub struct AuthenticationResponse {
    pub id: String, // Base64URL-encoded credential ID
    #[serde(rename = "rawId")]
    pub raw_id: String,
    pub response: AuthenticatorAssertionResponse,
    #[serde(rename = "clientExtensionResults", default)]
    pub client_extension_results: Option<serde_json::Value>,
    pub r#type: String, // Always "public-key"
}

/// Attestation half of a registration response
#[derive(Serialize, Deserialize, Debug)]
pub struct AuthenticatorAttestationResponse {
    #[serde(rename = "clientDataJSON")]
    pub client_data_json: String, // Base64URL-encoded client data JSON
    #[serde(rename = "attestationObject")]
    pub attestation_object: String, // Base64URL-encoded attestation object
    #[serde(default)]
    pub transports: Vec<String>,
}

/// Assertion half of an authentication response
#[derive(Serialize, Deserialize, Debug)]
pub struct AuthenticatorAssertionResponse {
    #[serde(rename = "clientDataJSON")]
    pub client_data_json: String, // Base64URL-encoded client data JSON
    #[serde(rename = "authenticatorData")]
    pub authenticator_data: String, // Base64URL-encoded authenticator data
    pub signature: String, // Base64URL-encoded signature
    #[serde(rename = "userHandle", default)]
    pub user_handle: Option<String>, // Base64URL-encoded user handle
}

/// A registered passkey as persisted by the external credential store.
///
/// The engine only ever mutates `sign_count` and `is_backed_up`, in memory,
/// while producing an assertion result; persisting the update is the
/// caller's responsibility.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct UserPasskeyInfo {
    pub credential_id: Vec<u8>,
    /// COSE-encoded public key
    pub public_key: Vec<u8>,
    pub sign_count: u32,
    pub transports: Vec<String>,
    pub is_user_verified: bool,
    pub is_backup_eligible: bool,
    pub is_backed_up: bool,
    pub created_at: DateTime<Utc>,
    /// Raw attestation object, retained for audit
    pub attestation_object: Vec<u8>,
    /// Raw collected client data JSON, retained for audit
    pub client_data_json: Vec<u8>,
}

/// Successful outcome of an attestation ceremony
#[derive(Clone, Debug)]
pub struct AttestationSuccess {
    /// The newly verified credential record, not yet persisted
    pub passkey: UserPasskeyInfo,
    /// The user entity the ceremony was started for
    pub user: UserEntity,
}

/// Successful outcome of an assertion ceremony
#[derive(Clone, Debug)]
pub struct AssertionSuccess {
    /// The stored record with `sign_count` and `is_backed_up` refreshed
    pub passkey: UserPasskeyInfo,
    /// The resolved user the credential belongs to
    pub user: UserEntity,
}
