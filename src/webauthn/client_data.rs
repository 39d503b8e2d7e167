//! Collected client data verification
//!
//! Parses the UTF-8 JSON "collected client data" a browser produces and
//! checks, in order: ceremony type, challenge (constant time), origin (via a
//! pluggable policy), and token-binding status sanity. Each step has its own
//! failure mode so the orchestrator can report exactly what went wrong.

use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::Deserialize;

use crate::errors::PasskeyError;

/// The client data `type` value for registration ceremonies
pub const CLIENT_DATA_TYPE_CREATE: &str = "webauthn.create";

/// The client data `type` value for authentication ceremonies
pub const CLIENT_DATA_TYPE_GET: &str = "webauthn.get";

const TOKEN_BINDING_STATUSES: [&str; 3] = ["supported", "present", "not-supported"];

/// Collected client data as defined by the WebAuthn specification
#[derive(Debug, Deserialize)]
pub struct CollectedClientData {
    pub r#type: String,
    /// Base64url-encoded challenge bytes
    pub challenge: String,
    pub origin: String,
    #[serde(rename = "crossOrigin", default)]
    pub cross_origin: Option<bool>,
    #[serde(rename = "topOrigin", default)]
    pub top_origin: Option<String>,
    #[serde(rename = "tokenBinding", default)]
    pub token_binding: Option<TokenBinding>,
}

/// Token binding information, validated for shape only
#[derive(Debug, Deserialize)]
pub struct TokenBinding {
    pub status: String,
    #[serde(default)]
    pub id: Option<String>,
}

/// Decides whether a client data origin is acceptable.
///
/// The policy receives the origin string, the cross-origin flag, and the top
/// origin when the response carries one. Implementations may perform I/O
/// (e.g. look up a tenant's registered origins), hence the async contract.
#[async_trait]
pub trait OriginPolicy: Send + Sync {
    async fn is_allowed(&self, origin: &str, cross_origin: bool, top_origin: Option<&str>)
        -> bool;
}

/// Default origin policy: rejects cross-origin responses and requires an
/// exact match against the configured request origin.
pub struct DefaultOriginPolicy {
    expected_origin: String,
}

impl DefaultOriginPolicy {
    #[must_use]
    pub fn new(expected_origin: impl Into<String>) -> Self {
        Self {
            expected_origin: expected_origin.into(),
        }
    }
}

#[async_trait]
impl OriginPolicy for DefaultOriginPolicy {
    async fn is_allowed(
        &self,
        origin: &str,
        cross_origin: bool,
        _top_origin: Option<&str>,
    ) -> bool {
        !cross_origin && origin == self.expected_origin
    }
}

/// Constant-time byte equality.
///
/// Timing-attack resistance of the challenge comparison is a hard
/// requirement, not an optimization; see the unit test below.
#[must_use]
pub fn fixed_time_eq(a: &[u8], b: &[u8]) -> bool {
    ring::constant_time::verify_slices_are_equal(a, b).is_ok()
}

/// Verify collected client data against the in-progress ceremony.
///
/// Returns the parsed client data on success so the orchestrator can reuse
/// fields without parsing twice.
///
/// # Errors
/// Each verification step fails with its own variant:
/// [`PasskeyError::InvalidClientData`] for malformed JSON,
/// [`PasskeyError::CeremonyTypeMismatch`], [`PasskeyError::InvalidBase64`]
/// or [`PasskeyError::ChallengeMismatch`] for the challenge,
/// [`PasskeyError::OriginRejected`], and
/// [`PasskeyError::InvalidTokenBinding`].
pub async fn verify_client_data(
    client_data_json: &[u8],
    expected_type: &'static str,
    expected_challenge: &[u8],
    origin_policy: &dyn OriginPolicy,
) -> Result<CollectedClientData, PasskeyError> {
    let client_data: CollectedClientData = serde_json::from_slice(client_data_json)
        .map_err(|e| PasskeyError::InvalidClientData(e.to_string()))?;

    if client_data.r#type != expected_type {
        return Err(PasskeyError::CeremonyTypeMismatch {
            expected: expected_type,
        });
    }

    let challenge_bytes = URL_SAFE_NO_PAD
        .decode(&client_data.challenge)
        .map_err(|_| PasskeyError::InvalidBase64("clientData.challenge"))?;
    if !fixed_time_eq(&challenge_bytes, expected_challenge) {
        return Err(PasskeyError::ChallengeMismatch);
    }

    let cross_origin = client_data.cross_origin.unwrap_or(false);
    if !origin_policy
        .is_allowed(
            &client_data.origin,
            cross_origin,
            client_data.top_origin.as_deref(),
        )
        .await
    {
        return Err(PasskeyError::OriginRejected(client_data.origin.clone()));
    }

    // WebAuthn level 3 dropped token binding, but a malformed status is
    // still rejected rather than ignored.
    if let Some(token_binding) = &client_data.token_binding {
        if !TOKEN_BINDING_STATUSES.contains(&token_binding.status.as_str()) {
            return Err(PasskeyError::InvalidTokenBinding(
                token_binding.status.clone(),
            ));
        }
    }

    Ok(client_data)
}
