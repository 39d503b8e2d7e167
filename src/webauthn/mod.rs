//! `WebAuthn` wire-format primitives
//!
//! This module holds the pure parsing and verification building blocks of the
//! ceremony engine: the fixed-layout authenticator data parser, the CBOR
//! attestation-object decoder, the COSE public key codec, and the collected
//! client data verifier. Everything here is side-effect free and independent
//! of credential storage or session handling.

pub mod attestation;
pub mod authenticator_data;
pub mod client_data;
pub mod cose;

// Re-exports for public use
pub use attestation::AttestationObject;
pub use authenticator_data::{AttestedCredentialData, AuthenticatorData};
pub use client_data::{
    fixed_time_eq, verify_client_data, CollectedClientData, DefaultOriginPolicy, OriginPolicy,
    CLIENT_DATA_TYPE_CREATE, CLIENT_DATA_TYPE_GET,
};
pub use cose::{CoseAlgorithm, CredentialPublicKey};
