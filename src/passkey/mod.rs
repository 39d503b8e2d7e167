//! Passkey ceremony orchestration
//!
//! This module ties the wire-format primitives in [`crate::webauthn`] into
//! complete attestation and assertion ceremonies: configuration, ceremony
//! state, the external store interface, the attestation-statement extension
//! point, and the orchestrating service.

mod policy;
mod service;
mod settings;
mod state;
mod store;
mod types;

// Re-exports for public use
pub use policy::{AttestationStatementVerifier, NoopAttestationVerifier};
pub use service::PasskeyService;
pub use settings::{CredentialBackupPolicy, PasskeySettings, UserVerificationPolicy};
pub use state::PasskeyCeremonyState;
pub use store::{MemoryPasskeyStore, PasskeyStore};
pub use types::*;
