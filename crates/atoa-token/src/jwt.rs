//! Compact JWS serialization (RFC 7515) for ES256 tokens.
//!
//! `base64url(header) "." base64url(payload) "." base64url(r || s)`
//!
//! The signature covers the exact ASCII of the first two segments, so the
//! payload is only decoded after the signature has been checked.

use crate::error::TokenError;
use crate::keys::KeyPair;
use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use p256::ecdsa::signature::{Signer, Verifier};
use p256::ecdsa::{Signature, VerifyingKey};
use serde::{Deserialize, Serialize};

/// The only accepted signing algorithm: ECDSA P-256 with SHA-256.
pub const ALGORITHM: &str = "ES256";

/// Token type written into the header.
pub const TOKEN_TYPE: &str = "JWT";

/// JOSE header of an Atoa token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    pub alg: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub typ: Option<String>,
    /// Thumbprint of the signing key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kid: Option<String>,
}

impl Header {
    fn es256(key_id: &str) -> Self {
        Self {
            alg: ALGORITHM.to_string(),
            typ: Some(TOKEN_TYPE.to_string()),
            kid: Some(key_id.to_string()),
        }
    }
}

/// A token split into its segments with the header decoded and the
/// algorithm checked. Nothing here has been authenticated yet.
pub(crate) struct UnverifiedToken<'a> {
    pub header: Header,
    signing_input: &'a str,
    payload_b64: &'a str,
    signature: Signature,
}

impl<'a> UnverifiedToken<'a> {
    /// Split and pre-validate a compact token.
    pub fn parse(token: &'a str) -> Result<Self, TokenError> {
        let (header_b64, payload_b64, signature_b64) = split(token)?;

        let header: Header = decode_json(header_b64, "header")?;
        if header.alg != ALGORITHM {
            return Err(TokenError::UnsupportedAlgorithm { alg: header.alg });
        }

        let signature_bytes = URL_SAFE_NO_PAD
            .decode(signature_b64)
            .map_err(|e| TokenError::malformed(format!("signature: {e}")))?;
        let signature = Signature::from_slice(&signature_bytes)
            .map_err(|e| TokenError::malformed(format!("signature: {e}")))?;

        // header and payload with the separating dot
        let signing_input = &token[..header_b64.len() + 1 + payload_b64.len()];

        Ok(Self {
            header,
            signing_input,
            payload_b64,
            signature,
        })
    }

    /// Check the signature and hand back the raw payload bytes.
    pub fn verify(self, key: &VerifyingKey) -> Result<Vec<u8>, TokenError> {
        key.verify(self.signing_input.as_bytes(), &self.signature)
            .map_err(|_| TokenError::InvalidSignature)?;

        URL_SAFE_NO_PAD
            .decode(self.payload_b64)
            .map_err(|e| TokenError::malformed(format!("payload: {e}")))
    }
}

/// Sign `claims` into a compact token.
pub(crate) fn encode<C: Serialize>(claims: &C, keypair: &KeyPair) -> Result<String, TokenError> {
    let header = serde_json::to_vec(&Header::es256(keypair.key_id()))
        .map_err(|e| TokenError::TokenCreationFailed(format!("header encoding failed: {e}")))?;
    let payload = serde_json::to_vec(claims)
        .map_err(|e| TokenError::TokenCreationFailed(format!("payload encoding failed: {e}")))?;

    let signing_input = format!(
        "{}.{}",
        URL_SAFE_NO_PAD.encode(header),
        URL_SAFE_NO_PAD.encode(payload)
    );
    let signature: Signature = keypair.signing_key().sign(signing_input.as_bytes());

    Ok(format!(
        "{signing_input}.{}",
        URL_SAFE_NO_PAD.encode(signature.to_bytes())
    ))
}

fn split(token: &str) -> Result<(&str, &str, &str), TokenError> {
    let mut parts = token.split('.');
    match (parts.next(), parts.next(), parts.next(), parts.next()) {
        (Some(header), Some(payload), Some(signature), None)
            if !header.is_empty() && !payload.is_empty() && !signature.is_empty() =>
        {
            Ok((header, payload, signature))
        }
        _ => Err(TokenError::malformed(
            "token must have three non-empty segments",
        )),
    }
}

fn decode_json<T: serde::de::DeserializeOwned>(
    segment: &str,
    what: &str,
) -> Result<T, TokenError> {
    let bytes = URL_SAFE_NO_PAD
        .decode(segment)
        .map_err(|e| TokenError::malformed(format!("{what}: {e}")))?;
    serde_json::from_slice(&bytes).map_err(|e| TokenError::malformed(format!("{what}: {e}")))
}

/// Header and claims of a token, decoded without any verification.
#[derive(Debug, Clone)]
pub struct TokenInfo {
    pub header: Header,
    pub claims: serde_json::Value,
}

/// Inspect a token without verification (for debugging).
///
/// Nothing returned here may be trusted.
pub fn inspect_token_unverified(token: &str) -> Result<TokenInfo, TokenError> {
    let (header_b64, payload_b64, _) = split(token)?;
    Ok(TokenInfo {
        header: decode_json(header_b64, "header")?,
        claims: decode_json(payload_b64, "payload")?,
    })
}
