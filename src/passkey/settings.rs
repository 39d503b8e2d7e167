//! Passkey ceremony settings
//!
//! Configuration for the ceremony orchestrator: relying party identity,
//! user-verification and credential-backup policies, and the algorithm
//! allow-list applied at registration.

use serde::{Deserialize, Serialize};

use crate::webauthn::cose::CoseAlgorithm;

/// Whether the ceremony requires the authenticator to verify the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserVerificationPolicy {
    Required,
    Preferred,
    Discouraged,
}

impl UserVerificationPolicy {
    /// True when the UV flag must be set for a ceremony to succeed
    #[must_use]
    pub const fn requires_verification(self) -> bool {
        matches!(self, Self::Required)
    }

    /// The wire string sent in creation/request options
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Required => "required",
            Self::Preferred => "preferred",
            Self::Discouraged => "discouraged",
        }
    }
}

/// Policy applied to the backup-eligible and backed-up flags at registration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CredentialBackupPolicy {
    /// The flag must be set
    Required,
    /// The flag may have either value
    Allowed,
    /// The flag must be clear
    Disallowed,
}

impl CredentialBackupPolicy {
    /// Check a flag value against this policy
    #[must_use]
    pub const fn permits(self, flag: bool) -> bool {
        match self {
            Self::Required => flag,
            Self::Allowed => true,
            Self::Disallowed => !flag,
        }
    }
}

/// Settings for passkey ceremony verification
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PasskeySettings {
    /// Relying party ID, the effective domain credentials are scoped to
    pub rp_id: String,
    /// Relying party display name
    pub rp_name: String,
    /// Expected origin of client data, e.g. `https://example.com`
    pub rp_origin: String,
    /// Client-side ceremony timeout
    pub timeout_seconds: u64,
    pub user_verification: UserVerificationPolicy,
    /// Applied to the BE flag at registration
    pub backup_eligible_policy: CredentialBackupPolicy,
    /// Applied to the BS flag at registration
    pub backed_up_policy: CredentialBackupPolicy,
    /// Algorithms acceptable for new credentials, in preference order
    pub allowed_algorithms: Vec<CoseAlgorithm>,
    /// "platform", "cross-platform", or none for no preference
    pub authenticator_attachment: Option<String>,
}

impl Default for PasskeySettings {
    fn default() -> Self {
        Self {
            rp_id: "localhost".to_string(),
            rp_name: "Passkey RP".to_string(),
            rp_origin: "https://localhost".to_string(),
            timeout_seconds: 60,
            user_verification: UserVerificationPolicy::Preferred,
            backup_eligible_policy: CredentialBackupPolicy::Allowed,
            backed_up_policy: CredentialBackupPolicy::Allowed,
            allowed_algorithms: CoseAlgorithm::ALL.to_vec(),
            authenticator_attachment: None,
        }
    }
}
