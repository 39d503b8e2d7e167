//! COSE public key codec and signature verification
//!
//! Credential public keys arrive as CBOR-encoded `COSE_Key` maps with integer
//! keys per the IANA COSE registry. This module decodes them into a tagged
//! union with one variant per supported algorithm family and exposes a
//! verification operation that never fails on malformed signatures, it just
//! returns `false`.

use ciborium::de::from_reader;
use ciborium::value::Value;
use ed25519_dalek::Verifier as _;
use p256::ecdsa::signature::Verifier as _;
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::errors::PasskeyError;

// COSE key type identifiers
const KTY_OKP: i128 = 1;
const KTY_EC2: i128 = 2;
const KTY_RSA: i128 = 3;

// COSE elliptic curve identifiers
const CRV_P256: i128 = 1;
const CRV_P384: i128 = 2;
const CRV_P521: i128 = 3;
const CRV_ED25519: i128 = 6;

/// Supported COSE algorithm identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CoseAlgorithm {
    /// ECDSA with P-256 and SHA-256 (-7)
    Es256,
    /// EdDSA over Ed25519 (-8)
    Eddsa,
    /// ECDSA with P-384 and SHA-384 (-35)
    Es384,
    /// ECDSA with P-521 and SHA-512 (-36)
    Es512,
    /// RSASSA-PKCS1-v1_5 with SHA-256 (-257)
    Rs256,
}

impl CoseAlgorithm {
    /// Every algorithm this crate can verify
    pub const ALL: [Self; 5] = [
        Self::Es256,
        Self::Eddsa,
        Self::Es384,
        Self::Es512,
        Self::Rs256,
    ];

    /// The IANA COSE algorithm identifier
    #[must_use]
    pub const fn id(self) -> i64 {
        match self {
            Self::Es256 => -7,
            Self::Eddsa => -8,
            Self::Es384 => -35,
            Self::Es512 => -36,
            Self::Rs256 => -257,
        }
    }

    /// Look up an algorithm by its IANA identifier
    #[must_use]
    pub fn from_id(id: i64) -> Option<Self> {
        Self::ALL.into_iter().find(|alg| alg.id() == id)
    }
}

/// A decoded credential public key, immutable once constructed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialPublicKey {
    Es256 { x: Vec<u8>, y: Vec<u8> },
    Es384 { x: Vec<u8>, y: Vec<u8> },
    Es512 { x: Vec<u8>, y: Vec<u8> },
    Rs256 { n: Vec<u8>, e: Vec<u8> },
    Eddsa { x: Vec<u8> },
}

impl CredentialPublicKey {
    /// The algorithm this key verifies under
    #[must_use]
    pub const fn algorithm(&self) -> CoseAlgorithm {
        match self {
            Self::Es256 { .. } => CoseAlgorithm::Es256,
            Self::Es384 { .. } => CoseAlgorithm::Es384,
            Self::Es512 { .. } => CoseAlgorithm::Es512,
            Self::Rs256 { .. } => CoseAlgorithm::Rs256,
            Self::Eddsa { .. } => CoseAlgorithm::Eddsa,
        }
    }

    /// Decode a `COSE_Key` CBOR map.
    ///
    /// # Errors
    /// Returns [`PasskeyError::InvalidCoseKey`] for structural problems
    /// (wrong CBOR shape, missing or mistyped entries, key type that does
    /// not match the declared algorithm) and
    /// [`PasskeyError::UnsupportedAlgorithm`] when the declared algorithm is
    /// outside the supported set. The latter is deliberately distinct so the
    /// orchestrator can tell "we don't implement this" apart from "policy
    /// disallows this".
    pub fn decode(input: &[u8]) -> Result<Self, PasskeyError> {
        let value: Value = from_reader(input)
            .map_err(|e| PasskeyError::InvalidCoseKey(format!("not valid CBOR: {e}")))?;
        let Value::Map(entries) = value else {
            return Err(PasskeyError::InvalidCoseKey("not a CBOR map".to_string()));
        };

        let kty = int_entry(&entries, 1)
            .ok_or_else(|| PasskeyError::InvalidCoseKey("missing key type (1)".to_string()))?;
        let alg = int_entry(&entries, 3)
            .ok_or_else(|| PasskeyError::InvalidCoseKey("missing algorithm (3)".to_string()))?;
        let alg = i64::try_from(alg)
            .map_err(|_| PasskeyError::InvalidCoseKey("algorithm out of range".to_string()))?;
        let algorithm =
            CoseAlgorithm::from_id(alg).ok_or(PasskeyError::UnsupportedAlgorithm(alg))?;

        match algorithm {
            CoseAlgorithm::Es256 => {
                let (x, y) = ec2_coordinates(&entries, kty, CRV_P256)?;
                Ok(Self::Es256 { x, y })
            }
            CoseAlgorithm::Es384 => {
                let (x, y) = ec2_coordinates(&entries, kty, CRV_P384)?;
                Ok(Self::Es384 { x, y })
            }
            CoseAlgorithm::Es512 => {
                let (x, y) = ec2_coordinates(&entries, kty, CRV_P521)?;
                Ok(Self::Es512 { x, y })
            }
            CoseAlgorithm::Rs256 => {
                if kty != KTY_RSA {
                    return Err(PasskeyError::InvalidCoseKey(format!(
                        "key type {kty} does not match RS256"
                    )));
                }
                let n = bytes_entry(&entries, -1).ok_or_else(|| {
                    PasskeyError::InvalidCoseKey("missing RSA modulus (-1)".to_string())
                })?;
                let e = bytes_entry(&entries, -2).ok_or_else(|| {
                    PasskeyError::InvalidCoseKey("missing RSA exponent (-2)".to_string())
                })?;
                Ok(Self::Rs256 { n, e })
            }
            CoseAlgorithm::Eddsa => {
                if kty != KTY_OKP {
                    return Err(PasskeyError::InvalidCoseKey(format!(
                        "key type {kty} does not match EdDSA"
                    )));
                }
                let crv = int_entry(&entries, -1).ok_or_else(|| {
                    PasskeyError::InvalidCoseKey("missing curve (-1)".to_string())
                })?;
                if crv != CRV_ED25519 {
                    return Err(PasskeyError::InvalidCoseKey(format!(
                        "unexpected OKP curve {crv}"
                    )));
                }
                let x = bytes_entry(&entries, -2).ok_or_else(|| {
                    PasskeyError::InvalidCoseKey("missing public key bytes (-2)".to_string())
                })?;
                Ok(Self::Eddsa { x })
            }
        }
    }

    /// Encode back to a `COSE_Key` CBOR map
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let entries = match self {
            Self::Es256 { x, y } => ec2_entries(self.algorithm(), CRV_P256, x, y),
            Self::Es384 { x, y } => ec2_entries(self.algorithm(), CRV_P384, x, y),
            Self::Es512 { x, y } => ec2_entries(self.algorithm(), CRV_P521, x, y),
            Self::Rs256 { n, e } => vec![
                (int_value(1), int_value(KTY_RSA)),
                (int_value(3), int_value(i128::from(self.algorithm().id()))),
                (int_value(-1), Value::Bytes(n.clone())),
                (int_value(-2), Value::Bytes(e.clone())),
            ],
            Self::Eddsa { x } => vec![
                (int_value(1), int_value(KTY_OKP)),
                (int_value(3), int_value(i128::from(self.algorithm().id()))),
                (int_value(-1), int_value(CRV_ED25519)),
                (int_value(-2), Value::Bytes(x.clone())),
            ],
        };
        let mut out = Vec::new();
        // Serializing a fully owned value map cannot fail
        ciborium::ser::into_writer(&Value::Map(entries), &mut out)
            .unwrap_or_else(|_| unreachable!("CBOR serialization of an owned map is infallible"));
        out
    }

    /// Verify `signature` over `message`.
    ///
    /// ECDSA signatures are expected in ASN.1 DER form, as produced by
    /// authenticators. A malformed key or signature is reported as `false`,
    /// never as an error.
    #[must_use]
    pub fn verify(&self, message: &[u8], signature: &[u8]) -> bool {
        match self {
            Self::Es256 { x, y } => {
                let Ok(key) = p256::ecdsa::VerifyingKey::from_sec1_bytes(&sec1_point(x, y)) else {
                    return false;
                };
                let Ok(sig) = p256::ecdsa::Signature::from_der(signature) else {
                    return false;
                };
                key.verify(message, &sig).is_ok()
            }
            Self::Es384 { x, y } => {
                let Ok(key) = p384::ecdsa::VerifyingKey::from_sec1_bytes(&sec1_point(x, y)) else {
                    return false;
                };
                let Ok(sig) = p384::ecdsa::Signature::from_der(signature) else {
                    return false;
                };
                key.verify(message, &sig).is_ok()
            }
            Self::Es512 { x, y } => {
                let Ok(key) = p521::ecdsa::VerifyingKey::from_sec1_bytes(&sec1_point(x, y)) else {
                    return false;
                };
                let Ok(sig) = p521::ecdsa::Signature::from_der(signature) else {
                    return false;
                };
                key.verify(message, &sig).is_ok()
            }
            Self::Rs256 { n, e } => {
                let Ok(key) = rsa::RsaPublicKey::new(
                    rsa::BigUint::from_bytes_be(n),
                    rsa::BigUint::from_bytes_be(e),
                ) else {
                    return false;
                };
                let key = rsa::pkcs1v15::VerifyingKey::<Sha256>::new(key);
                let Ok(sig) = rsa::pkcs1v15::Signature::try_from(signature) else {
                    return false;
                };
                key.verify(message, &sig).is_ok()
            }
            Self::Eddsa { x } => {
                let Ok(bytes) = <&[u8; 32]>::try_from(x.as_slice()) else {
                    return false;
                };
                let Ok(key) = ed25519_dalek::VerifyingKey::from_bytes(bytes) else {
                    return false;
                };
                let Ok(sig) = ed25519_dalek::Signature::from_slice(signature) else {
                    return false;
                };
                key.verify(message, &sig).is_ok()
            }
        }
    }
}

/// Uncompressed SEC1 point: `0x04 || x || y`
fn sec1_point(x: &[u8], y: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(1 + x.len() + y.len());
    out.push(0x04);
    out.extend_from_slice(x);
    out.extend_from_slice(y);
    out
}

fn ec2_coordinates(
    entries: &[(Value, Value)],
    kty: i128,
    expected_crv: i128,
) -> Result<(Vec<u8>, Vec<u8>), PasskeyError> {
    if kty != KTY_EC2 {
        return Err(PasskeyError::InvalidCoseKey(format!(
            "key type {kty} is not EC2"
        )));
    }
    let crv = int_entry(entries, -1)
        .ok_or_else(|| PasskeyError::InvalidCoseKey("missing curve (-1)".to_string()))?;
    if crv != expected_crv {
        return Err(PasskeyError::InvalidCoseKey(format!(
            "curve {crv} does not match the declared algorithm"
        )));
    }
    let x = bytes_entry(entries, -2)
        .ok_or_else(|| PasskeyError::InvalidCoseKey("missing x coordinate (-2)".to_string()))?;
    let y = bytes_entry(entries, -3)
        .ok_or_else(|| PasskeyError::InvalidCoseKey("missing y coordinate (-3)".to_string()))?;
    Ok((x, y))
}

fn ec2_entries(alg: CoseAlgorithm, crv: i128, x: &[u8], y: &[u8]) -> Vec<(Value, Value)> {
    vec![
        (int_value(1), int_value(KTY_EC2)),
        (int_value(3), int_value(i128::from(alg.id()))),
        (int_value(-1), int_value(crv)),
        (int_value(-2), Value::Bytes(x.to_vec())),
        (int_value(-3), Value::Bytes(y.to_vec())),
    ]
}

fn int_value(v: i128) -> Value {
    Value::Integer(
        ciborium::value::Integer::try_from(v)
            .unwrap_or_else(|_| unreachable!("COSE labels fit in a CBOR integer")),
    )
}

fn int_entry(entries: &[(Value, Value)], key: i128) -> Option<i128> {
    entries
        .iter()
        .find(|(k, _)| k == &int_value(key))
        .and_then(|(_, v)| v.as_integer())
        .map(i128::from)
}

fn bytes_entry(entries: &[(Value, Value)], key: i128) -> Option<Vec<u8>> {
    entries
        .iter()
        .find(|(k, _)| k == &int_value(key))
        .and_then(|(_, v)| v.as_bytes())
        .cloned()
}
