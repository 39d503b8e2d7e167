//! Attestation object decoding
//!
//! The attestation object is the top-level CBOR map a registration response
//! carries: `{fmt, attStmt, authData}`. The attestation statement stays
//! opaque here; format-specific chain validation is the job of a pluggable
//! [`AttestationStatementVerifier`](crate::passkey::AttestationStatementVerifier).

use ciborium::de::from_reader;
use ciborium::value::Value;

use crate::errors::PasskeyError;

/// Decoded attestation object
#[derive(Debug, Clone)]
pub struct AttestationObject {
    /// Attestation statement format identifier, e.g. `"none"` or `"packed"`
    pub fmt: String,
    /// Format-specific attestation statement, kept opaque
    pub att_stmt: Vec<(Value, Value)>,
    /// Raw authenticator data bytes
    pub auth_data: Vec<u8>,
}

impl AttestationObject {
    /// Decode an attestation object from CBOR bytes.
    ///
    /// # Errors
    /// Returns [`PasskeyError::InvalidCbor`] when the input is not a CBOR
    /// map, and [`PasskeyError::MissingAttestationField`] when the map
    /// decodes but lacks `fmt`, `attStmt`, or `authData`. The distinction
    /// lets the orchestrator report malformed input separately from a
    /// semantically incomplete object.
    pub fn parse(input: &[u8]) -> Result<Self, PasskeyError> {
        let value: Value = from_reader(input)
            .map_err(|e| PasskeyError::InvalidCbor(format!("attestation object: {e}")))?;

        let Value::Map(entries) = value else {
            return Err(PasskeyError::InvalidCbor(
                "attestation object is not a map".to_string(),
            ));
        };

        let fmt = entries
            .iter()
            .find(|(k, _)| k.as_text() == Some("fmt"))
            .and_then(|(_, v)| v.as_text())
            .ok_or(PasskeyError::MissingAttestationField("fmt"))?
            .to_string();

        let att_stmt = entries
            .iter()
            .find(|(k, _)| k.as_text() == Some("attStmt"))
            .and_then(|(_, v)| v.as_map())
            .ok_or(PasskeyError::MissingAttestationField("attStmt"))?
            .clone();

        let auth_data = entries
            .iter()
            .find(|(k, _)| k.as_text() == Some("authData"))
            .and_then(|(_, v)| v.as_bytes())
            .ok_or(PasskeyError::MissingAttestationField("authData"))?
            .clone();

        Ok(Self {
            fmt,
            att_stmt,
            auth_data,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(entries: Vec<(Value, Value)>) -> Vec<u8> {
        let mut out = Vec::new();
        ciborium::ser::into_writer(&Value::Map(entries), &mut out)
            .expect("CBOR encoding should succeed");
        out
    }

    #[test]
    fn parses_complete_object() {
        let bytes = encode(vec![
            (Value::Text("fmt".into()), Value::Text("none".into())),
            (Value::Text("attStmt".into()), Value::Map(Vec::new())),
            (Value::Text("authData".into()), Value::Bytes(vec![1, 2, 3])),
        ]);
        let parsed = AttestationObject::parse(&bytes).expect("parse should succeed");
        assert_eq!(parsed.fmt, "none");
        assert!(parsed.att_stmt.is_empty());
        assert_eq!(parsed.auth_data, vec![1, 2, 3]);
    }

    #[test]
    fn missing_fmt_is_a_semantic_error() {
        let bytes = encode(vec![
            (Value::Text("attStmt".into()), Value::Map(Vec::new())),
            (Value::Text("authData".into()), Value::Bytes(vec![1])),
        ]);
        assert_eq!(
            AttestationObject::parse(&bytes).unwrap_err(),
            PasskeyError::MissingAttestationField("fmt")
        );
    }

    #[test]
    fn missing_auth_data_is_a_semantic_error() {
        let bytes = encode(vec![
            (Value::Text("fmt".into()), Value::Text("none".into())),
            (Value::Text("attStmt".into()), Value::Map(Vec::new())),
        ]);
        assert_eq!(
            AttestationObject::parse(&bytes).unwrap_err(),
            PasskeyError::MissingAttestationField("authData")
        );
    }

    #[test]
    fn malformed_cbor_is_a_decode_error() {
        let err = AttestationObject::parse(&[0xff, 0x00]).unwrap_err();
        assert!(matches!(err, PasskeyError::InvalidCbor(_)));
    }

    #[test]
    fn non_map_cbor_is_a_decode_error() {
        let mut bytes = Vec::new();
        ciborium::ser::into_writer(&Value::Integer(7.into()), &mut bytes)
            .expect("CBOR encoding should succeed");
        let err = AttestationObject::parse(&bytes).unwrap_err();
        assert!(matches!(err, PasskeyError::InvalidCbor(_)));
    }
}
