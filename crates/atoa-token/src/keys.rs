//! Keypair management for platform and organization keys.
//!
//! All keys are ECDSA over NIST P-256. Private keys are stored as PKCS#8 PEM
//! (SEC1 `EC PRIVATE KEY` blocks are accepted on load), public keys as SPKI
//! PEM.

use crate::error::TokenError;
use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use p256::SecretKey;
use p256::ecdsa::{SigningKey, VerifyingKey};
use p256::pkcs8::{DecodePrivateKey, EncodePrivateKey, EncodePublicKey, LineEnding};
use rand::RngCore;
use sha2::{Digest, Sha256};
use std::path::Path;

/// Attempts at drawing a valid scalar before giving up.
const MAX_GENERATION_ATTEMPTS: usize = 8;

/// An ECDSA P-256 keypair used to sign challenges and tokens.
#[derive(Clone)]
pub struct KeyPair {
    signing_key: SigningKey,
    key_id: String,
}

impl std::fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyPair")
            .field("key_id", &self.key_id)
            .finish_non_exhaustive()
    }
}

impl KeyPair {
    /// Generate a new random keypair.
    pub fn generate() -> Result<Self, TokenError> {
        let mut rng = rand::rng();
        let mut bytes = [0u8; 32];

        // Zero and values >= the curve order are rejected; redraw.
        for _ in 0..MAX_GENERATION_ATTEMPTS {
            rng.fill_bytes(&mut bytes);
            if let Ok(signing_key) = SigningKey::from_slice(&bytes) {
                bytes.fill(0);
                return Ok(Self::from_signing_key(signing_key));
            }
        }

        Err(TokenError::KeyGenerationFailed(
            "no valid P-256 scalar drawn".to_string(),
        ))
    }

    /// Create a keypair from an existing signing key.
    pub fn from_signing_key(signing_key: SigningKey) -> Self {
        let key_id = key_id_for(signing_key.verifying_key());
        Self {
            signing_key,
            key_id,
        }
    }

    /// Load a keypair from a PEM private key (PKCS#8, or SEC1 `EC PRIVATE KEY`).
    pub fn from_private_key_pem(pem: &str) -> Result<Self, TokenError> {
        let pem = pem.trim();
        let signing_key = match SigningKey::from_pkcs8_pem(pem) {
            Ok(key) => key,
            Err(pkcs8_err) => {
                let secret = SecretKey::from_sec1_pem(pem)
                    .map_err(|_| TokenError::InvalidPrivateKey(pkcs8_err.to_string()))?;
                SigningKey::from(secret)
            }
        };
        Ok(Self::from_signing_key(signing_key))
    }

    /// The signing half.
    pub fn signing_key(&self) -> &SigningKey {
        &self.signing_key
    }

    /// The verifying half.
    pub fn verifying_key(&self) -> VerifyingKey {
        *self.signing_key.verifying_key()
    }

    /// RFC 7638 thumbprint of the public key, used as the token `kid`.
    pub fn key_id(&self) -> &str {
        &self.key_id
    }

    /// Get the private key as a PKCS#8 PEM document.
    pub fn private_key_pem(&self) -> Result<String, TokenError> {
        let pem = self
            .signing_key
            .to_pkcs8_pem(LineEnding::LF)
            .map_err(|e| TokenError::InvalidPrivateKey(e.to_string()))?;
        Ok(pem.to_string())
    }

    /// Get the public key as an SPKI PEM document.
    pub fn public_key_pem(&self) -> Result<String, TokenError> {
        public_key_pem(&self.verifying_key())
    }

    /// Save the keypair to files.
    pub fn save_to_files(
        &self,
        private_key_path: &Path,
        public_key_path: &Path,
    ) -> Result<(), TokenError> {
        std::fs::write(private_key_path, self.private_key_pem()?)?;
        std::fs::write(public_key_path, self.public_key_pem()?)?;
        Ok(())
    }

    /// Load a keypair from a private key file.
    pub fn load_from_file(private_key_path: &Path) -> Result<Self, TokenError> {
        let pem = std::fs::read_to_string(private_key_path)?;
        Self::from_private_key_pem(&pem)
    }
}

/// Encode a verifying key as an SPKI PEM document.
pub fn public_key_pem(key: &VerifyingKey) -> Result<String, TokenError> {
    key.to_public_key_pem(LineEnding::LF)
        .map_err(|e| TokenError::KeyGenerationFailed(e.to_string()))
}

/// Load a public key from PEM (for verification-only scenarios).
pub fn load_public_key_pem(pem: &str) -> Result<VerifyingKey, TokenError> {
    Ok(atoa_core::parse_public_key_pem(pem)?)
}

/// Load a public key from a file.
pub fn load_public_key_file(path: &Path) -> Result<VerifyingKey, TokenError> {
    let pem = std::fs::read_to_string(path)?;
    load_public_key_pem(&pem)
}

/// RFC 7638 JWK thumbprint of a P-256 public key.
///
/// SHA-256 over `{"crv":"P-256","kty":"EC","x":..,"y":..}` with members in
/// lexicographic order, base64url-encoded without padding.
pub fn key_id_for(key: &VerifyingKey) -> String {
    let point = key.to_encoded_point(false);
    let x = URL_SAFE_NO_PAD.encode(point.x().map(|x| x.as_slice()).unwrap_or_default());
    let y = URL_SAFE_NO_PAD.encode(point.y().map(|y| y.as_slice()).unwrap_or_default());

    let canonical = format!(r#"{{"crv":"P-256","kty":"EC","x":"{x}","y":"{y}"}}"#);
    URL_SAFE_NO_PAD.encode(Sha256::digest(canonical.as_bytes()))
}
