//! Error taxonomy for passkey ceremony verification
//!
//! Every verification step maps to exactly one named variant, so callers can
//! log or audit the precise failure without string matching. The outward
//! result types collapse all of these into a single failure case; HTTP-facing
//! code should not branch on the variant.

use crate::webauthn::cose::CoseAlgorithm;

/// Errors produced while verifying a passkey ceremony
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PasskeyError {
    // --- Malformed input ---
    /// The credential JSON sent by the browser could not be deserialized
    #[error("invalid credential JSON: {0}")]
    InvalidCredentialJson(String),

    /// The collected client data was not valid UTF-8 JSON
    #[error("invalid client data JSON: {0}")]
    InvalidClientData(String),

    /// A CBOR payload (attestation object or COSE key) was malformed
    #[error("invalid CBOR: {0}")]
    InvalidCbor(String),

    /// The attestation object decoded but lacked a required key
    #[error("attestation object is missing the '{0}' field")]
    MissingAttestationField(&'static str),

    /// The fixed-layout authenticator data could not be parsed
    #[error("invalid authenticator data: {0}")]
    InvalidAuthenticatorData(String),

    /// A base64url field could not be decoded
    #[error("invalid base64url encoding in '{0}'")]
    InvalidBase64(&'static str),

    /// A COSE key was structurally invalid (missing or mistyped entries)
    #[error("invalid COSE key: {0}")]
    InvalidCoseKey(String),

    // --- Protocol mismatch ---
    /// The credential `type` field was not `public-key`
    #[error("credential type is not 'public-key'")]
    CredentialTypeMismatch,

    /// The client data `type` did not match the ceremony being verified
    #[error("client data type mismatch, expected '{expected}'")]
    CeremonyTypeMismatch { expected: &'static str },

    /// The client data challenge did not match the ceremony challenge
    #[error("challenge verification failed")]
    ChallengeMismatch,

    /// The origin policy rejected the client data origin
    #[error("origin '{0}' rejected")]
    OriginRejected(String),

    /// A token binding object carried an unrecognized status
    #[error("invalid token binding status '{0}'")]
    InvalidTokenBinding(String),

    /// The RP ID hash in authenticator data did not match the configured RP
    #[error("RP ID hash mismatch")]
    RpIdHashMismatch,

    /// A registration response carried no attested credential data
    #[error("authenticator data has no attested credential data")]
    MissingAttestedCredentialData,

    // --- Policy violations ---
    /// The user-present flag was not set
    #[error("user was not present during the ceremony")]
    UserNotPresent,

    /// User verification is required but the flag was not set
    #[error("user verification required but not performed")]
    UserNotVerified,

    /// The backed-up flag was set on a credential that is not backup eligible
    #[error("credential is backed up but not backup eligible")]
    BackedUpButNotBackupEligible,

    /// The configured backup-eligibility or backed-up policy was violated
    #[error("credential backup policy violated: {0}")]
    BackupPolicyViolation(String),

    /// The key algorithm is recognized but not implemented by this crate
    #[error("unsupported COSE algorithm {0}")]
    UnsupportedAlgorithm(i64),

    /// The key algorithm is implemented but excluded by configuration
    #[error("algorithm {0:?} disallowed by policy")]
    DisallowedAlgorithm(CoseAlgorithm),

    /// The attestation statement verifier rejected the attestation
    #[error("attestation statement rejected: {0}")]
    AttestationStatementRejected(String),

    // --- Identity consistency ---
    /// A credential with the same ID is already registered
    #[error("credential is already registered")]
    CredentialAlreadyRegistered,

    /// No stored credential links this credential ID to the resolved user
    #[error("credential does not belong to the user")]
    CredentialNotOwned,

    /// The ceremony state user hint and the response user handle disagree
    #[error("user handle does not match the ceremony user")]
    UserHandleMismatch,

    /// An assertion without a user hint must carry a user handle
    #[error("assertion response is missing a user handle")]
    MissingUserHandle,

    /// The credential wrapper ID and the attested credential ID disagree
    #[error("credential ID does not match attested credential data")]
    CredentialIdMismatch,

    /// The presented backup-eligibility flag contradicts the stored record
    #[error("backup eligibility changed since registration")]
    BackupStateMismatch,

    // --- Integrity ---
    /// The assertion signature did not verify against the stored public key
    #[error("invalid assertion signature")]
    InvalidAssertionSignature,

    /// The presented sign count did not strictly increase
    #[error("sign count not strictly increasing: presented {presented}, stored {stored}")]
    SignCountNotIncreasing { presented: u32, stored: u32 },

    // --- Ceremony state ---
    /// No ceremony state was supplied at verification time
    #[error("no ceremony in progress")]
    NoCeremonyInProgress,

    /// Ceremony state was supplied but could not be decoded
    #[error("ceremony state is corrupt")]
    CeremonyStateCorrupt,

    // --- Catch-all ---
    /// A failure outside the ceremony protocol (RNG, store internals)
    #[error("unexpected error during ceremony: {0}")]
    Unexpected(String),
}
