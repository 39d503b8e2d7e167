//! Shared synthetic-authenticator helpers for ceremony integration tests

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use ciborium::value::Value;
use p256::ecdsa::signature::Signer;
use p256::ecdsa::{Signature, SigningKey};
use rand_core::OsRng;
use sha2::{Digest, Sha256};

use passkey_core::webauthn::authenticator_data::{flags, AttestedCredentialData};
use passkey_core::{AuthenticatorData, CredentialPublicKey, UserEntity};

pub const RP_ID: &str = "example.com";
pub const ORIGIN: &str = "https://example.com";

/// A fake ES256 authenticator holding one resident credential
pub struct SyntheticAuthenticator {
    signing_key: SigningKey,
    pub credential_id: Vec<u8>,
}

impl SyntheticAuthenticator {
    pub fn new(credential_id: Vec<u8>) -> Self {
        Self {
            signing_key: SigningKey::random(&mut OsRng),
            credential_id,
        }
    }

    /// COSE-encoded ES256 public key
    pub fn cose_public_key(&self) -> Vec<u8> {
        let point = self.signing_key.verifying_key().to_encoded_point(false);
        CredentialPublicKey::Es256 {
            x: point.x().expect("point is uncompressed").to_vec(),
            y: point.y().expect("point is uncompressed").to_vec(),
        }
        .encode()
    }

    /// Authenticator data with the attested-credential block, for registration
    pub fn attestation_auth_data(&self, flag_bits: u8, sign_count: u32) -> Vec<u8> {
        AuthenticatorData {
            rp_id_hash: rp_id_hash(),
            flags: flag_bits | flags::ATTESTED_CREDENTIAL_DATA,
            sign_count,
            attested_credential_data: Some(AttestedCredentialData {
                aaguid: [0u8; 16],
                credential_id: self.credential_id.clone(),
                credential_public_key: self.cose_public_key(),
            }),
            extensions: None,
        }
        .to_bytes()
    }

    /// Authenticator data without the attested-credential block, for assertions
    pub fn assertion_auth_data(&self, flag_bits: u8, sign_count: u32) -> Vec<u8> {
        AuthenticatorData {
            rp_id_hash: rp_id_hash(),
            flags: flag_bits,
            sign_count,
            attested_credential_data: None,
            extensions: None,
        }
        .to_bytes()
    }

    /// Assertion authenticator data carrying a CBOR extensions blob
    pub fn assertion_auth_data_with_extensions(
        &self,
        flag_bits: u8,
        sign_count: u32,
        extensions: Vec<u8>,
    ) -> Vec<u8> {
        AuthenticatorData {
            rp_id_hash: rp_id_hash(),
            flags: flag_bits | flags::EXTENSION_DATA,
            sign_count,
            attested_credential_data: None,
            extensions: Some(extensions),
        }
        .to_bytes()
    }

    /// DER-encoded ES256 signature over `auth_data || SHA-256(client_data)`
    pub fn sign(&self, auth_data: &[u8], client_data_json: &[u8]) -> Vec<u8> {
        let mut signed_data = auth_data.to_vec();
        signed_data.extend_from_slice(&Sha256::digest(client_data_json));
        let signature: Signature = self.signing_key.sign(&signed_data);
        signature.to_der().as_bytes().to_vec()
    }
}

pub fn rp_id_hash() -> [u8; 32] {
    Sha256::digest(RP_ID.as_bytes()).into()
}

pub fn client_data_json(ceremony_type: &str, challenge_b64: &str, origin: &str) -> Vec<u8> {
    format!(r#"{{"type":"{ceremony_type}","challenge":"{challenge_b64}","origin":"{origin}"}}"#)
        .into_bytes()
}

/// CBOR attestation object with fmt "none" and an empty statement
pub fn attestation_object(auth_data: &[u8]) -> Vec<u8> {
    let value = Value::Map(vec![
        (Value::Text("fmt".into()), Value::Text("none".into())),
        (Value::Text("attStmt".into()), Value::Map(Vec::new())),
        (
            Value::Text("authData".into()),
            Value::Bytes(auth_data.to_vec()),
        ),
    ]);
    let mut out = Vec::new();
    ciborium::ser::into_writer(&value, &mut out).expect("CBOR encoding should succeed");
    out
}

pub fn registration_json(
    credential_id: &[u8],
    client_data: &[u8],
    attestation_object: &[u8],
) -> String {
    let id = URL_SAFE_NO_PAD.encode(credential_id);
    serde_json::json!({
        "id": id,
        "rawId": id,
        "type": "public-key",
        "response": {
            "clientDataJSON": URL_SAFE_NO_PAD.encode(client_data),
            "attestationObject": URL_SAFE_NO_PAD.encode(attestation_object),
            "transports": ["internal"],
        },
    })
    .to_string()
}

pub fn assertion_json(
    credential_id: &[u8],
    client_data: &[u8],
    auth_data: &[u8],
    signature: &[u8],
    user_handle: Option<&str>,
) -> String {
    let id = URL_SAFE_NO_PAD.encode(credential_id);
    serde_json::json!({
        "id": id,
        "rawId": id,
        "type": "public-key",
        "response": {
            "clientDataJSON": URL_SAFE_NO_PAD.encode(client_data),
            "authenticatorData": URL_SAFE_NO_PAD.encode(auth_data),
            "signature": URL_SAFE_NO_PAD.encode(signature),
            "userHandle": user_handle,
        },
    })
    .to_string()
}

pub fn test_user() -> UserEntity {
    UserEntity {
        id: "dXNlci1hbGljZQ".to_string(),
        name: "alice@example.com".to_string(),
        display_name: "Alice".to_string(),
    }
}
