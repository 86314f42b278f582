//! Error types for identity and message validation.

use crate::public_key::PublicKeyError;
use thiserror::Error;

/// A structurally missing or invalid field on an identity card or message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A mandatory field is empty.
    #[error("{field} is required")]
    MissingField { field: &'static str },

    /// An agent card declares no capabilities.
    #[error("at least one capability is required")]
    NoCapabilities,

    /// The organization public key is not a usable P-256 `PUBLIC KEY` block.
    #[error("invalid public_key: {0}")]
    InvalidPublicKey(#[from] PublicKeyError),
}

impl ValidationError {
    pub(crate) fn missing(field: &'static str) -> Self {
        Self::MissingField { field }
    }
}
