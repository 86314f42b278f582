//! PEM-encoded public key handling shared by identity validation and
//! challenge verification.
//!
//! Organization public keys travel as SPKI documents wrapped in a
//! `-----BEGIN PUBLIC KEY-----` block. Only ECDSA keys on the P-256 curve
//! are accepted.

use p256::ecdsa::VerifyingKey;
use p256::pkcs8::DecodePublicKey;
use p256::pkcs8::spki;
use thiserror::Error;

/// PEM label required on organization public keys.
pub const PUBLIC_KEY_LABEL: &str = "PUBLIC KEY";

/// Reasons a PEM public key could not be turned into a verifying key.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PublicKeyError {
    /// The text does not contain a decodable PEM block.
    #[error("no PEM block found: {0}")]
    MissingPemBlock(String),

    /// A PEM block was decoded but carries a different label.
    #[error("expected a PEM \"{PUBLIC_KEY_LABEL}\" block, found \"{found}\"")]
    WrongPemType { found: String },

    /// The SPKI document names an algorithm or curve other than ECDSA P-256.
    #[error("public key is not an ECDSA P-256 key")]
    UnsupportedKey,

    /// The SPKI document could not be parsed.
    #[error("failed to parse public key: {0}")]
    InvalidKey(String),
}

/// Decode a PEM block and return its label and DER contents.
pub fn decode_pem_block(pem: &str) -> Result<(String, Vec<u8>), PublicKeyError> {
    let (label, der) = pem_rfc7468::decode_vec(pem.trim().as_bytes())
        .map_err(|e| PublicKeyError::MissingPemBlock(e.to_string()))?;
    Ok((label.to_string(), der))
}

/// Parse a PEM `PUBLIC KEY` block into a P-256 verifying key.
pub fn parse_public_key_pem(pem: &str) -> Result<VerifyingKey, PublicKeyError> {
    let (label, der) = decode_pem_block(pem)?;
    if label != PUBLIC_KEY_LABEL {
        return Err(PublicKeyError::WrongPemType { found: label });
    }
    parse_public_key_der(&der)
}

/// Parse a DER-encoded SPKI document into a P-256 verifying key.
pub fn parse_public_key_der(der: &[u8]) -> Result<VerifyingKey, PublicKeyError> {
    VerifyingKey::from_public_key_der(der).map_err(|e| match e {
        spki::Error::OidUnknown { .. } => PublicKeyError::UnsupportedKey,
        other => PublicKeyError::InvalidKey(other.to_string()),
    })
}
