//! Ceremony state codec
//!
//! The small piece of per-ceremony state (challenge plus user identity hint)
//! that must survive between "create options" and "verify response". It is
//! encoded as a base64url JSON blob; the external transport (encrypted
//! cookie, server-side session) is responsible for authenticity,
//! confidentiality, and single use. The engine only deserializes it and
//! distinguishes a missing blob from a corrupt one.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::PasskeyError;
use crate::passkey::types::UserEntity;

/// Per-ceremony state, consumed exactly once at verification time
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(tag = "ceremony", rename_all = "lowercase")]
pub enum PasskeyCeremonyState {
    /// Registration in progress
    Attestation {
        #[serde(with = "challenge_bytes")]
        challenge: Vec<u8>,
        user: UserEntity,
        created_at: DateTime<Utc>,
    },
    /// Authentication in progress
    Assertion {
        #[serde(with = "challenge_bytes")]
        challenge: Vec<u8>,
        /// Known user ID, when the ceremony was started for a specific user
        user_id: Option<String>,
        created_at: DateTime<Utc>,
    },
}

impl PasskeyCeremonyState {
    /// The challenge bound to this ceremony
    #[must_use]
    pub fn challenge(&self) -> &[u8] {
        match self {
            Self::Attestation { challenge, .. } | Self::Assertion { challenge, .. } => challenge,
        }
    }

    /// Encode to an opaque string for the external transport.
    ///
    /// # Errors
    /// Returns [`PasskeyError::Unexpected`] if JSON serialization fails,
    /// which cannot happen for well-formed state.
    pub fn encode(&self) -> Result<String, PasskeyError> {
        let json = serde_json::to_vec(self)
            .map_err(|e| PasskeyError::Unexpected(format!("ceremony state encoding: {e}")))?;
        Ok(URL_SAFE_NO_PAD.encode(json))
    }

    /// Decode ceremony state received from the external transport.
    ///
    /// # Errors
    /// A missing or empty blob yields [`PasskeyError::NoCeremonyInProgress`];
    /// a present but undecodable blob yields
    /// [`PasskeyError::CeremonyStateCorrupt`]. The two are deliberately
    /// distinct failure modes.
    pub fn decode(encoded: Option<&str>) -> Result<Self, PasskeyError> {
        let encoded = match encoded {
            Some(value) if !value.is_empty() => value,
            _ => return Err(PasskeyError::NoCeremonyInProgress),
        };
        let json = URL_SAFE_NO_PAD
            .decode(encoded)
            .map_err(|_| PasskeyError::CeremonyStateCorrupt)?;
        serde_json::from_slice(&json).map_err(|_| PasskeyError::CeremonyStateCorrupt)
    }
}

/// Serde helpers storing challenge bytes as base64url text
mod challenge_bytes {
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&URL_SAFE_NO_PAD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        URL_SAFE_NO_PAD
            .decode(encoded)
            .map_err(serde::de::Error::custom)
    }
}
