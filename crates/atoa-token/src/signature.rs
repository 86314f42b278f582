//! Challenge-response signatures for organization registration.
//!
//! The platform hands an organization a random challenge; the organization
//! signs SHA-256(challenge) with its private key and returns the ASN.1 DER
//! signature, base64-encoded. The platform checks it against the public key
//! on the organization's card.
//!
//! [`verify_signature`] separates "could not check" from "checked and
//! failed": malformed key or signature input is an `Err`, a well-formed
//! signature that does not match is `Ok(false)`.

use crate::keys::KeyPair;
use atoa_core::{PublicKeyError, parse_public_key_pem};
use base64::Engine as _;
use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use p256::ecdsa::signature::{DigestSigner, DigestVerifier};
use p256::ecdsa::{DerSignature, Signature};
use rand::RngCore;
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Random bytes in a freshly issued challenge.
pub const CHALLENGE_BYTES: usize = 32;

/// Reasons a challenge signature could not be produced or checked.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignatureError {
    /// The public key PEM is absent, mislabeled or not a P-256 key.
    #[error("invalid public key: {0}")]
    PublicKey(#[from] PublicKeyError),

    /// The signature is not valid base64.
    #[error("invalid signature format: {0}")]
    InvalidEncoding(String),

    /// The signature bytes are not an ASN.1 DER ECDSA signature.
    #[error("invalid signature encoding: {0}")]
    InvalidDer(String),

    /// The signing operation failed.
    #[error("failed to sign challenge: {0}")]
    SigningFailed(String),
}

/// Produce a random challenge for the registration handshake.
pub fn new_challenge() -> String {
    let mut bytes = [0u8; CHALLENGE_BYTES];
    rand::rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Sign a challenge, returning a base64 DER signature.
pub fn sign_challenge(challenge: &[u8], keypair: &KeyPair) -> Result<String, SignatureError> {
    let digest = Sha256::new_with_prefix(challenge);
    let signature: Signature = keypair
        .signing_key()
        .try_sign_digest(digest)
        .map_err(|e| SignatureError::SigningFailed(e.to_string()))?;

    let der: DerSignature = signature.to_der();
    Ok(STANDARD.encode(der.as_bytes()))
}

/// Check a base64 DER signature over `challenge` against a PEM public key.
pub fn verify_signature(
    challenge: &[u8],
    signature_b64: &str,
    public_key_pem: &str,
) -> Result<bool, SignatureError> {
    let verifying_key = parse_public_key_pem(public_key_pem)?;

    let der = STANDARD
        .decode(signature_b64.trim())
        .map_err(|e| SignatureError::InvalidEncoding(e.to_string()))?;
    let signature =
        Signature::from_der(&der).map_err(|e| SignatureError::InvalidDer(e.to_string()))?;

    let digest = Sha256::new_with_prefix(challenge);
    let valid = verifying_key.verify_digest(digest, &signature).is_ok();
    if !valid {
        tracing::debug!("challenge signature did not verify");
    }
    Ok(valid)
}
