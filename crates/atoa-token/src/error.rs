//! Error types for token issuance and verification.

use atoa_core::{PublicKeyError, ValidationError};
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Broad failure category of a [`TokenError`].
///
/// Callers pick their remediation from the kind: re-authenticate on
/// `Signature`, re-issue on `Expired`, reject on `DelegationMismatch`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// An identity card is missing a field or carries an invalid key.
    Validation,
    /// The token cannot be parsed into the expected shape.
    MalformedToken,
    /// The signature does not match, or could not be checked.
    Signature,
    /// The token is correctly signed but its validity window has passed.
    Expired,
    /// The token is correctly signed but was issued in the future.
    NotYetValid,
    /// Issuer or audience differ from what the caller expects.
    ClaimMismatch,
    /// The presented organization token belongs to another organization.
    DelegationMismatch,
    /// Local key material could not be created, loaded or used.
    Key,
}

/// Errors that can occur during token operations.
#[derive(Debug, Error)]
pub enum TokenError {
    /// Identity card rejected before issuance.
    #[error("invalid identity: {0}")]
    Validation(#[from] ValidationError),

    /// Failed to generate keypair.
    #[error("failed to generate keypair: {0}")]
    KeyGenerationFailed(String),

    /// Failed to parse private key.
    #[error("failed to parse private key: {0}")]
    InvalidPrivateKey(String),

    /// Failed to parse public key.
    #[error("failed to parse public key: {0}")]
    InvalidPublicKey(#[from] PublicKeyError),

    /// No verification key is known for the token's key id.
    #[error("no verification key for key id {key_id:?}")]
    UnknownKey { key_id: Option<String> },

    /// Failed to create token.
    #[error("failed to create token: {0}")]
    TokenCreationFailed(String),

    /// Token is not a well-formed three-segment token.
    #[error("malformed token: {0}")]
    Malformed(String),

    /// Token is missing a mandatory claim.
    #[error("token missing required claim: {claim}")]
    MissingClaim { claim: &'static str },

    /// Token header declares an algorithm other than ES256.
    #[error("unexpected signing method: {alg}")]
    UnsupportedAlgorithm { alg: String },

    /// Signature does not match the header and payload.
    #[error("token signature is invalid")]
    InvalidSignature,

    /// Token has expired.
    #[error("token has expired at {expired_at}")]
    Expired { expired_at: DateTime<Utc> },

    /// Token was issued after the verification time.
    #[error("token used before issued at {issued_at}")]
    NotYetValid { issued_at: DateTime<Utc> },

    /// Token was issued by someone else.
    #[error("unexpected issuer: expected {expected}, found {found}")]
    IssuerMismatch { expected: &'static str, found: String },

    /// Token was issued for another audience.
    #[error("unexpected audience: expected {expected}, found {found}")]
    AudienceMismatch { expected: &'static str, found: String },

    /// The organization token and the agent card name different organizations.
    #[error("org_id mismatch between card ({card_org_id}) and token ({token_org_id})")]
    DelegationMismatch {
        card_org_id: String,
        token_org_id: String,
    },

    /// IO error (reading/writing keys).
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl TokenError {
    /// Failure category for this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::Malformed(_) | Self::MissingClaim { .. } => ErrorKind::MalformedToken,
            Self::UnsupportedAlgorithm { .. }
            | Self::InvalidSignature
            | Self::InvalidPublicKey(_)
            | Self::UnknownKey { .. } => ErrorKind::Signature,
            Self::Expired { .. } => ErrorKind::Expired,
            Self::NotYetValid { .. } => ErrorKind::NotYetValid,
            Self::IssuerMismatch { .. } | Self::AudienceMismatch { .. } => {
                ErrorKind::ClaimMismatch
            }
            Self::DelegationMismatch { .. } => ErrorKind::DelegationMismatch,
            Self::KeyGenerationFailed(_)
            | Self::InvalidPrivateKey(_)
            | Self::TokenCreationFailed(_)
            | Self::IoError(_) => ErrorKind::Key,
        }
    }

    pub(crate) fn malformed(reason: impl std::fmt::Display) -> Self {
        Self::Malformed(reason.to_string())
    }
}
