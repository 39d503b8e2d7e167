#![warn(clippy::pedantic)]
#![warn(clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! WebAuthn/FIDO2 passkey ceremony verification engine.
//!
//! Turns a browser-supplied credential response into a verified registration
//! (attestation) or login (assertion) result: parses the untrusted binary
//! formats, enforces the multi-step verification protocol of the W3C
//! `WebAuthn` specification, compares secrets in constant time, and upholds
//! the monotonic sign-counter anti-cloning invariant across ceremonies.
//!
//! Credential storage, user lookup, session handling, and HTTP routing are
//! external collaborators, reached through the [`passkey::PasskeyStore`]
//! trait and the origin-policy / attestation-verifier extension points.

/// Version of the crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod errors;
pub mod passkey;
pub mod webauthn;

/// Re-export commonly used items
pub use errors::PasskeyError;
pub use passkey::{
    AssertionSuccess, AttestationSuccess, MemoryPasskeyStore, PasskeyCeremonyState,
    PasskeyService, PasskeySettings, PasskeyStore, UserEntity, UserPasskeyInfo,
};
pub use webauthn::{AuthenticatorData, CoseAlgorithm, CredentialPublicKey};
