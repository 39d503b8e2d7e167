//! Passkey ceremony orchestrator
//!
//! The state machine that sequences the parsing and verification primitives
//! in `crate::webauthn` into complete attestation and assertion ceremonies.
//! Each ceremony is a linear pipeline of `Result`-returning steps; any
//! failed check short-circuits with its specific error, and the orchestrator
//! never continues past a failed step.
//!
//! Verification itself is synchronous and CPU bound. The only suspension
//! points are store lookups and the pluggable origin policy and attestation
//! statement verifier, all of which may perform I/O on the host's runtime.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::Utc;
use ring::digest;
use ring::rand::SecureRandom;

use crate::errors::PasskeyError;
use crate::passkey::policy::{AttestationStatementVerifier, NoopAttestationVerifier};
use crate::passkey::settings::PasskeySettings;
use crate::passkey::state::PasskeyCeremonyState;
use crate::passkey::store::PasskeyStore;
use crate::passkey::types::{
    AssertionSuccess, AttestationSuccess, AuthenticationOptions, AuthenticationResponse,
    AuthenticatorSelectionCriteria, PublicKeyCredentialDescriptor, PublicKeyCredentialParameters,
    RegistrationOptions, RegistrationResponse, RelyingParty, UserEntity, UserPasskeyInfo,
};
use crate::webauthn::attestation::AttestationObject;
use crate::webauthn::authenticator_data::AuthenticatorData;
use crate::webauthn::client_data::{
    fixed_time_eq, verify_client_data, DefaultOriginPolicy, OriginPolicy, CLIENT_DATA_TYPE_CREATE,
    CLIENT_DATA_TYPE_GET,
};
use crate::webauthn::cose::CredentialPublicKey;

const CREDENTIAL_TYPE: &str = "public-key";

/// Generate a fresh 32-byte ceremony challenge
fn generate_challenge() -> Result<[u8; 32], PasskeyError> {
    let mut bytes = [0u8; 32];
    ring::rand::SystemRandom::new()
        .fill(&mut bytes)
        .map_err(|_| PasskeyError::Unexpected("challenge generation failed".to_string()))?;
    Ok(bytes)
}

fn sha256(data: &[u8]) -> [u8; 32] {
    let hash = digest::digest(&digest::SHA256, data);
    let mut out = [0u8; 32];
    out.copy_from_slice(hash.as_ref());
    out
}

fn decode_b64(field: &'static str, value: &str) -> Result<Vec<u8>, PasskeyError> {
    URL_SAFE_NO_PAD
        .decode(value)
        .map_err(|_| PasskeyError::InvalidBase64(field))
}

/// The passkey ceremony verification engine.
///
/// Holds the relying-party configuration, the external store, and the two
/// strategy objects (origin policy, attestation statement verifier). A
/// single instance serves any number of concurrent ceremonies; verification
/// mutates no shared state.
pub struct PasskeyService<S> {
    settings: PasskeySettings,
    store: S,
    origin_policy: Box<dyn OriginPolicy>,
    attestation_verifier: Box<dyn AttestationStatementVerifier>,
}

impl<S: PasskeyStore> PasskeyService<S> {
    /// Create a service with the default origin policy (exact match against
    /// `settings.rp_origin`, cross-origin rejected) and the no-op
    /// attestation verifier.
    #[must_use]
    pub fn new(settings: PasskeySettings, store: S) -> Self {
        let origin_policy = Box::new(DefaultOriginPolicy::new(settings.rp_origin.clone()));
        Self {
            settings,
            store,
            origin_policy,
            attestation_verifier: Box::new(NoopAttestationVerifier),
        }
    }

    /// Replace the origin policy
    #[must_use]
    pub fn with_origin_policy(mut self, policy: impl OriginPolicy + 'static) -> Self {
        self.origin_policy = Box::new(policy);
        self
    }

    /// Replace the attestation statement verifier
    #[must_use]
    pub fn with_attestation_verifier(
        mut self,
        verifier: impl AttestationStatementVerifier + 'static,
    ) -> Self {
        self.attestation_verifier = Box::new(verifier);
        self
    }

    /// Build creation options and the matching ceremony state for
    /// registering a new passkey.
    ///
    /// # Errors
    /// Fails only on challenge generation or store lookup failure.
    pub async fn creation_options(
        &self,
        user: &UserEntity,
    ) -> Result<(RegistrationOptions, PasskeyCeremonyState), PasskeyError> {
        let challenge = generate_challenge()?;
        let exclude_credentials = self
            .store
            .passkeys_for_user(&user.id)
            .await?
            .iter()
            .map(descriptor_for)
            .collect();

        let options = RegistrationOptions {
            challenge: URL_SAFE_NO_PAD.encode(challenge),
            rp: RelyingParty {
                id: self.settings.rp_id.clone(),
                name: self.settings.rp_name.clone(),
            },
            user: user.clone(),
            public_key_params: self
                .settings
                .allowed_algorithms
                .iter()
                .map(|alg| PublicKeyCredentialParameters {
                    r#type: CREDENTIAL_TYPE.to_string(),
                    alg: alg.id(),
                })
                .collect(),
            timeout: self.timeout_millis(),
            attestation: "none".to_string(),
            authenticator_selection: AuthenticatorSelectionCriteria {
                authenticator_attachment: self.settings.authenticator_attachment.clone(),
                require_resident_key: true, // Required for passkeys
                user_verification: self.settings.user_verification.as_str().to_string(),
            },
            exclude_credentials,
        };

        let state = PasskeyCeremonyState::Attestation {
            challenge: challenge.to_vec(),
            user: user.clone(),
            created_at: Utc::now(),
        };

        Ok((options, state))
    }

    /// Build request options and the matching ceremony state for asserting
    /// an existing passkey. When a user is named, their registered
    /// credentials populate `allowCredentials`; otherwise the options allow
    /// any discoverable credential for this RP.
    ///
    /// # Errors
    /// Fails only on challenge generation or store lookup failure.
    pub async fn request_options(
        &self,
        user_id: Option<&str>,
    ) -> Result<(AuthenticationOptions, PasskeyCeremonyState), PasskeyError> {
        let challenge = generate_challenge()?;
        let allow_credentials = match user_id {
            Some(id) => self
                .store
                .passkeys_for_user(id)
                .await?
                .iter()
                .map(descriptor_for)
                .collect(),
            None => Vec::new(),
        };

        let options = AuthenticationOptions {
            challenge: URL_SAFE_NO_PAD.encode(challenge),
            timeout: self.timeout_millis(),
            rp_id: self.settings.rp_id.clone(),
            allow_credentials,
            user_verification: self.settings.user_verification.as_str().to_string(),
        };

        let state = PasskeyCeremonyState::Assertion {
            challenge: challenge.to_vec(),
            user_id: user_id.map(ToString::to_string),
            created_at: Utc::now(),
        };

        Ok((options, state))
    }

    /// Verify a registration (attestation) response.
    ///
    /// On success, returns the new credential record paired with the user
    /// entity the ceremony was started for. The caller persists the record.
    ///
    /// # Errors
    /// Every failed step short-circuits with its named [`PasskeyError`]
    /// variant; see the error taxonomy.
    pub async fn verify_attestation(
        &self,
        credential_json: &str,
        encoded_state: Option<&str>,
    ) -> Result<AttestationSuccess, PasskeyError> {
        let state = PasskeyCeremonyState::decode(encoded_state)?;
        let PasskeyCeremonyState::Attestation {
            challenge, user, ..
        } = state
        else {
            return Err(PasskeyError::CeremonyStateCorrupt);
        };

        let response: RegistrationResponse = serde_json::from_str(credential_json)
            .map_err(|e| PasskeyError::InvalidCredentialJson(e.to_string()))?;
        if response.r#type != CREDENTIAL_TYPE {
            return Err(PasskeyError::CredentialTypeMismatch);
        }

        let client_data_json = decode_b64("clientDataJSON", &response.response.client_data_json)?;
        verify_client_data(
            &client_data_json,
            CLIENT_DATA_TYPE_CREATE,
            &challenge,
            self.origin_policy.as_ref(),
        )
        .await?;
        let client_data_hash = sha256(&client_data_json);

        let attestation_object =
            decode_b64("attestationObject", &response.response.attestation_object)?;
        let attestation = AttestationObject::parse(&attestation_object)?;
        let auth_data = AuthenticatorData::parse(&attestation.auth_data)?;

        self.check_authenticator_flags(&auth_data)?;
        if !self
            .settings
            .backup_eligible_policy
            .permits(auth_data.is_backup_eligible())
        {
            return Err(PasskeyError::BackupPolicyViolation(
                "backup eligibility conflicts with the configured policy".to_string(),
            ));
        }
        if !self.settings.backed_up_policy.permits(auth_data.is_backed_up()) {
            return Err(PasskeyError::BackupPolicyViolation(
                "backup state conflicts with the configured policy".to_string(),
            ));
        }

        let attested = auth_data
            .attested_credential_data
            .as_ref()
            .ok_or(PasskeyError::MissingAttestedCredentialData)?;

        let public_key = CredentialPublicKey::decode(&attested.credential_public_key)?;
        let algorithm = public_key.algorithm();
        if !self.settings.allowed_algorithms.contains(&algorithm) {
            return Err(PasskeyError::DisallowedAlgorithm(algorithm));
        }

        self.attestation_verifier
            .verify(&attestation_object, &client_data_hash)
            .await?;

        // The wrapper ID must name the same credential as the attested block
        let credential_id = decode_b64("credential.id", &response.id)?;
        if credential_id != attested.credential_id {
            return Err(PasskeyError::CredentialIdMismatch);
        }

        if self
            .store
            .find_credential_by_id(&attested.credential_id)
            .await?
            .is_some()
        {
            return Err(PasskeyError::CredentialAlreadyRegistered);
        }

        log::debug!(
            "attestation verified for user '{}' with {algorithm:?} credential",
            user.name
        );

        let passkey = UserPasskeyInfo {
            credential_id: attested.credential_id.clone(),
            public_key: attested.credential_public_key.clone(),
            sign_count: auth_data.sign_count,
            transports: response.response.transports.clone(),
            is_user_verified: auth_data.is_user_verified(),
            is_backup_eligible: auth_data.is_backup_eligible(),
            is_backed_up: auth_data.is_backed_up(),
            created_at: Utc::now(),
            attestation_object,
            client_data_json,
        };

        Ok(AttestationSuccess { passkey, user })
    }

    /// Verify an authentication (assertion) response.
    ///
    /// On success, returns the stored credential record with `sign_count`
    /// and `is_backed_up` updated in memory, paired with the resolved user.
    /// The caller persists the update.
    ///
    /// # Errors
    /// Every failed step short-circuits with its named [`PasskeyError`]
    /// variant; see the error taxonomy.
    pub async fn verify_assertion(
        &self,
        credential_json: &str,
        encoded_state: Option<&str>,
    ) -> Result<AssertionSuccess, PasskeyError> {
        let state = PasskeyCeremonyState::decode(encoded_state)?;
        let PasskeyCeremonyState::Assertion {
            challenge,
            user_id: user_hint,
            ..
        } = state
        else {
            return Err(PasskeyError::CeremonyStateCorrupt);
        };

        let response: AuthenticationResponse = serde_json::from_str(credential_json)
            .map_err(|e| PasskeyError::InvalidCredentialJson(e.to_string()))?;
        if response.r#type != CREDENTIAL_TYPE {
            return Err(PasskeyError::CredentialTypeMismatch);
        }

        // A named ceremony user must exist before identity is resolved
        let hint_user = match user_hint.as_deref() {
            Some(hint) => Some(
                self.store
                    .find_user_by_id(hint)
                    .await?
                    .ok_or(PasskeyError::CredentialNotOwned)?,
            ),
            None => None,
        };

        let credential_id = decode_b64("credential.id", &response.id)?;
        let user_handle = response.response.user_handle.as_deref();

        // The ceremony user and the response user handle must agree; a
        // disagreement means state and response describe different users.
        let user = match (hint_user, user_handle) {
            (Some(user), Some(handle)) => {
                if user.id != handle {
                    return Err(PasskeyError::UserHandleMismatch);
                }
                user
            }
            (Some(user), None) => user,
            (None, Some(handle)) => self
                .store
                .find_user_by_id(handle)
                .await?
                .ok_or(PasskeyError::CredentialNotOwned)?,
            (None, None) => return Err(PasskeyError::MissingUserHandle),
        };

        // A stored record is always required; an unknown credential is
        // never treated as a new user.
        let mut passkey = self
            .store
            .passkeys_for_user(&user.id)
            .await?
            .into_iter()
            .find(|p| p.credential_id == credential_id)
            .ok_or(PasskeyError::CredentialNotOwned)?;

        let authenticator_data =
            decode_b64("authenticatorData", &response.response.authenticator_data)?;
        let auth_data = AuthenticatorData::parse(&authenticator_data)?;

        let client_data_json = decode_b64("clientDataJSON", &response.response.client_data_json)?;
        verify_client_data(
            &client_data_json,
            CLIENT_DATA_TYPE_GET,
            &challenge,
            self.origin_policy.as_ref(),
        )
        .await?;

        self.check_authenticator_flags(&auth_data)?;
        // Backup policy is enforced at registration only; an assertion just
        // re-checks self-consistency and that eligibility never changes.
        if auth_data.is_backup_eligible() != passkey.is_backup_eligible {
            return Err(PasskeyError::BackupStateMismatch);
        }

        let client_data_hash = sha256(&client_data_json);
        let mut signed_data =
            Vec::with_capacity(authenticator_data.len() + client_data_hash.len());
        signed_data.extend_from_slice(&authenticator_data);
        signed_data.extend_from_slice(&client_data_hash);

        let public_key = CredentialPublicKey::decode(&passkey.public_key)?;
        let signature = decode_b64("signature", &response.response.signature)?;
        if !public_key.verify(&signed_data, &signature) {
            return Err(PasskeyError::InvalidAssertionSignature);
        }

        // Anti-cloning: the counter must strictly increase unless the
        // authenticator does not implement counters at all (both zero).
        if (auth_data.sign_count != 0 || passkey.sign_count != 0)
            && auth_data.sign_count <= passkey.sign_count
        {
            log::warn!(
                "sign count regression for user '{}': presented {}, stored {}",
                user.name,
                auth_data.sign_count,
                passkey.sign_count
            );
            return Err(PasskeyError::SignCountNotIncreasing {
                presented: auth_data.sign_count,
                stored: passkey.sign_count,
            });
        }

        log::debug!("assertion verified for user '{}'", user.name);

        passkey.sign_count = auth_data.sign_count;
        passkey.is_backed_up = auth_data.is_backed_up();

        Ok(AssertionSuccess { passkey, user })
    }

    /// Flag checks shared by both ceremonies: RP ID hash, user presence,
    /// user verification, and BE/BS self-consistency.
    fn check_authenticator_flags(&self, auth_data: &AuthenticatorData) -> Result<(), PasskeyError> {
        let expected_hash = sha256(self.settings.rp_id.as_bytes());
        if !fixed_time_eq(&auth_data.rp_id_hash, &expected_hash) {
            return Err(PasskeyError::RpIdHashMismatch);
        }
        if !auth_data.is_user_present() {
            return Err(PasskeyError::UserNotPresent);
        }
        if self.settings.user_verification.requires_verification() && !auth_data.is_user_verified()
        {
            return Err(PasskeyError::UserNotVerified);
        }
        if !auth_data.is_backup_eligible() && auth_data.is_backed_up() {
            return Err(PasskeyError::BackedUpButNotBackupEligible);
        }
        Ok(())
    }

    fn timeout_millis(&self) -> u32 {
        u32::try_from(self.settings.timeout_seconds * 1000).unwrap_or(u32::MAX)
    }
}

fn descriptor_for(passkey: &UserPasskeyInfo) -> PublicKeyCredentialDescriptor {
    PublicKeyCredentialDescriptor {
        r#type: CREDENTIAL_TYPE.to_string(),
        id: URL_SAFE_NO_PAD.encode(&passkey.credential_id),
        transports: passkey.transports.clone(),
    }
}
