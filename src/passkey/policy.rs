//! Attestation statement verification extension point
//!
//! Format-specific attestation validation (packed, TPM, Android, ...) is out
//! of scope for the core engine. The orchestrator instead hands the raw
//! attestation object and the client data hash to a pluggable verifier. The
//! default implementation accepts unconditionally, which matches relying
//! parties that request `attestation: "none"`.

use async_trait::async_trait;

use crate::errors::PasskeyError;

/// Verifies the attestation statement of a registration ceremony.
///
/// Implementations may perform I/O, e.g. fetching metadata or calling an
/// attestation CA, and should honor cancellation from the caller.
#[async_trait]
pub trait AttestationStatementVerifier: Send + Sync {
    /// Verify the attestation statement.
    ///
    /// # Errors
    /// Returns [`PasskeyError::AttestationStatementRejected`] (or another
    /// variant) to fail the ceremony.
    async fn verify(
        &self,
        attestation_object: &[u8],
        client_data_hash: &[u8; 32],
    ) -> Result<(), PasskeyError>;
}

/// Accepts every attestation statement without inspecting it
pub struct NoopAttestationVerifier;

#[async_trait]
impl AttestationStatementVerifier for NoopAttestationVerifier {
    async fn verify(
        &self,
        _attestation_object: &[u8],
        _client_data_hash: &[u8; 32],
    ) -> Result<(), PasskeyError> {
        Ok(())
    }
}
