//! # atoa-core
//!
//! Shared types for the Atoa trust chain: identity cards for organizations
//! and agents, their structural validation, the agent-to-agent message
//! envelope, and platform configuration.
//!
//! Nothing in this crate signs or verifies; see `atoa-token` for that.

pub mod config;
pub mod error;
pub mod identity;
pub mod message;
pub mod public_key;

pub use config::{
    AtoaConfig, ConfigError, KeysConfig, ObservabilityConfig, TaskConfig, TokenConfig,
};
pub use error::ValidationError;
pub use identity::{AgentCard, OrgCard, validate_agent_identity, validate_organization_identity};
pub use message::A2AMessage;
pub use public_key::{PublicKeyError, parse_public_key_pem};
