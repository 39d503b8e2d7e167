//! Authenticator data parsing
//!
//! Decodes the fixed-layout binary structure authenticators return in both
//! ceremonies: a 32-byte RP ID hash, one flag byte, a big-endian 32-bit sign
//! counter, then the optional attested-credential block and extensions.

use std::io::Cursor;

use ciborium::de::from_reader;
use ciborium::value::Value;

use crate::errors::PasskeyError;

/// Flag bits carried in byte 32 of authenticator data
pub mod flags {
    pub const USER_PRESENT: u8 = 1 << 0;
    pub const USER_VERIFIED: u8 = 1 << 2;
    pub const BACKUP_ELIGIBLE: u8 = 1 << 3;
    pub const BACKED_UP: u8 = 1 << 4;
    pub const ATTESTED_CREDENTIAL_DATA: u8 = 1 << 6;
    pub const EXTENSION_DATA: u8 = 1 << 7;
}

/// Minimum length of authenticator data (hash + flags + sign count)
const FIXED_PREFIX_LEN: usize = 37;

/// Maximum credential ID length allowed by the WebAuthn specification
const MAX_CREDENTIAL_ID_LEN: usize = 1023;

/// The attested credential block inside authenticator data
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttestedCredentialData {
    /// Authenticator model identifier
    pub aaguid: [u8; 16],
    /// Credential ID, 1 to 1023 bytes
    pub credential_id: Vec<u8>,
    /// Raw CBOR-encoded COSE public key
    pub credential_public_key: Vec<u8>,
}

/// Parsed authenticator data
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatorData {
    /// SHA-256 hash of the RP ID the credential is scoped to
    pub rp_id_hash: [u8; 32],
    /// Raw flag byte, see [`flags`]
    pub flags: u8,
    /// Signature counter, big-endian on the wire
    pub sign_count: u32,
    /// Present iff the AT flag bit is set
    pub attested_credential_data: Option<AttestedCredentialData>,
    /// Raw CBOR extensions blob, present iff the ED flag bit is set
    pub extensions: Option<Vec<u8>>,
}

impl AuthenticatorData {
    /// Parse authenticator data from its wire representation.
    ///
    /// Pure function over the input span; consumes the entire buffer.
    /// Trailing bytes not claimed by the attested-credential block or the
    /// extensions blob are rejected.
    ///
    /// # Errors
    /// Returns [`PasskeyError::InvalidAuthenticatorData`] if the input is
    /// shorter than 37 bytes, the attested-credential block is truncated,
    /// the credential ID length is outside `[1, 1023]`, the trailing COSE
    /// key or extensions are not valid CBOR, or unclaimed bytes remain.
    pub fn parse(input: &[u8]) -> Result<Self, PasskeyError> {
        if input.len() < FIXED_PREFIX_LEN {
            return Err(PasskeyError::InvalidAuthenticatorData(format!(
                "length {} is below the 37 byte minimum",
                input.len()
            )));
        }

        let mut rp_id_hash = [0u8; 32];
        rp_id_hash.copy_from_slice(&input[..32]);
        let flag_bits = input[32];
        let sign_count = u32::from_be_bytes([input[33], input[34], input[35], input[36]]);

        let mut pos = FIXED_PREFIX_LEN;
        let attested_credential_data = if flag_bits & flags::ATTESTED_CREDENTIAL_DATA == 0 {
            None
        } else {
            let (acd, consumed) = parse_attested_credential_data(&input[pos..])?;
            pos += consumed;
            Some(acd)
        };

        let extensions = if flag_bits & flags::EXTENSION_DATA == 0 {
            None
        } else {
            let remaining = &input[pos..];
            let mut cursor = Cursor::new(remaining);
            let _: Value = from_reader(&mut cursor).map_err(|e| {
                PasskeyError::InvalidAuthenticatorData(format!("invalid extensions CBOR: {e}"))
            })?;
            let consumed = cursor_consumed(&cursor)?;
            pos += consumed;
            Some(remaining[..consumed].to_vec())
        };

        if pos != input.len() {
            return Err(PasskeyError::InvalidAuthenticatorData(format!(
                "{} unexpected trailing bytes",
                input.len() - pos
            )));
        }

        Ok(Self {
            rp_id_hash,
            flags: flag_bits,
            sign_count,
            attested_credential_data,
            extensions,
        })
    }

    /// Encode back to the wire representation.
    ///
    /// The flag byte is written as stored; callers constructing synthetic
    /// authenticator data must keep the AT and ED bits consistent with the
    /// optional fields.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(FIXED_PREFIX_LEN);
        out.extend_from_slice(&self.rp_id_hash);
        out.push(self.flags);
        out.extend_from_slice(&self.sign_count.to_be_bytes());
        if let Some(acd) = &self.attested_credential_data {
            out.extend_from_slice(&acd.aaguid);
            #[allow(clippy::cast_possible_truncation)]
            out.extend_from_slice(&(acd.credential_id.len() as u16).to_be_bytes());
            out.extend_from_slice(&acd.credential_id);
            out.extend_from_slice(&acd.credential_public_key);
        }
        if let Some(extensions) = &self.extensions {
            out.extend_from_slice(extensions);
        }
        out
    }

    #[must_use]
    pub fn is_user_present(&self) -> bool {
        self.flags & flags::USER_PRESENT != 0
    }

    #[must_use]
    pub fn is_user_verified(&self) -> bool {
        self.flags & flags::USER_VERIFIED != 0
    }

    #[must_use]
    pub fn is_backup_eligible(&self) -> bool {
        self.flags & flags::BACKUP_ELIGIBLE != 0
    }

    #[must_use]
    pub fn is_backed_up(&self) -> bool {
        self.flags & flags::BACKED_UP != 0
    }

    #[must_use]
    pub fn has_attested_credential_data(&self) -> bool {
        self.flags & flags::ATTESTED_CREDENTIAL_DATA != 0
    }

    #[must_use]
    pub fn has_extension_data(&self) -> bool {
        self.flags & flags::EXTENSION_DATA != 0
    }
}

/// Parse the attested credential block, returning it and the byte count consumed
fn parse_attested_credential_data(
    input: &[u8],
) -> Result<(AttestedCredentialData, usize), PasskeyError> {
    // aaguid(16) + credential ID length(2)
    if input.len() < 18 {
        return Err(PasskeyError::InvalidAuthenticatorData(
            "attested credential data is truncated".to_string(),
        ));
    }

    let mut aaguid = [0u8; 16];
    aaguid.copy_from_slice(&input[..16]);

    let id_len = usize::from(u16::from_be_bytes([input[16], input[17]]));
    if id_len == 0 || id_len > MAX_CREDENTIAL_ID_LEN {
        return Err(PasskeyError::InvalidAuthenticatorData(format!(
            "credential ID length {id_len} outside [1, 1023]"
        )));
    }

    let mut pos = 18;
    if input.len() < pos + id_len {
        return Err(PasskeyError::InvalidAuthenticatorData(
            "credential ID exceeds remaining buffer".to_string(),
        ));
    }
    let credential_id = input[pos..pos + id_len].to_vec();
    pos += id_len;

    // The COSE key length is implied by the CBOR parse cursor
    let remaining = &input[pos..];
    let mut cursor = Cursor::new(remaining);
    let _: Value = from_reader(&mut cursor).map_err(|e| {
        PasskeyError::InvalidAuthenticatorData(format!("invalid credential public key CBOR: {e}"))
    })?;
    let consumed = cursor_consumed(&cursor)?;
    let credential_public_key = remaining[..consumed].to_vec();
    pos += consumed;

    Ok((
        AttestedCredentialData {
            aaguid,
            credential_id,
            credential_public_key,
        },
        pos,
    ))
}

fn cursor_consumed(cursor: &Cursor<&[u8]>) -> Result<usize, PasskeyError> {
    usize::try_from(cursor.position())
        .map_err(|_| PasskeyError::Unexpected("CBOR cursor position overflow".to_string()))
}
