//! Organization and agent identity cards.
//!
//! An organization submits an [`OrgCard`] once at registration; an agent
//! presents an [`AgentCard`] each time it needs a fresh agent token. The
//! `verified` flag on either card is informational only: the platform sets
//! it, and token issuance never trusts the value a card declares.

use crate::error::ValidationError;
use crate::public_key::parse_public_key_pem;
use serde::{Deserialize, Serialize};

/// Identity record of an organization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrgCard {
    /// Organization identifier.
    pub org_id: String,

    /// Display name.
    pub name: String,

    /// Domain the organization operates under.
    pub domain: String,

    /// P-256 public key as a PEM `PUBLIC KEY` block.
    pub public_key: String,

    /// Set by the platform after the challenge handshake.
    #[serde(default)]
    pub verified: bool,
}

/// Identity record of an agent acting for an organization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentCard {
    /// Agent identifier.
    pub agent_id: String,

    /// Owning organization identifier.
    pub org_id: String,

    /// Declared capabilities, in order.
    pub capabilities: Vec<String>,

    /// Endpoints the agent can be reached at.
    #[serde(default)]
    pub endpoints: Vec<String>,

    /// Inherited from the organization token, never self-declared.
    #[serde(default)]
    pub verified: bool,
}

impl OrgCard {
    /// Create an unverified organization card.
    pub fn new(
        org_id: impl Into<String>,
        name: impl Into<String>,
        domain: impl Into<String>,
        public_key: impl Into<String>,
    ) -> Self {
        Self {
            org_id: org_id.into(),
            name: name.into(),
            domain: domain.into(),
            public_key: public_key.into(),
            verified: false,
        }
    }

    /// Check that all fields are populated and the public key is a
    /// well-formed P-256 `PUBLIC KEY` block.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.org_id.is_empty() {
            return Err(ValidationError::missing("org_id"));
        }
        if self.name.is_empty() {
            return Err(ValidationError::missing("name"));
        }
        if self.domain.is_empty() {
            return Err(ValidationError::missing("domain"));
        }
        if self.public_key.is_empty() {
            return Err(ValidationError::missing("public_key"));
        }

        parse_public_key_pem(&self.public_key)?;
        Ok(())
    }
}

impl AgentCard {
    /// Create an unverified agent card with no endpoints.
    pub fn new(
        agent_id: impl Into<String>,
        org_id: impl Into<String>,
        capabilities: Vec<String>,
    ) -> Self {
        Self {
            agent_id: agent_id.into(),
            org_id: org_id.into(),
            capabilities,
            endpoints: Vec::new(),
            verified: false,
        }
    }

    /// Add a reachable endpoint.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoints.push(endpoint.into());
        self
    }

    /// Check that the identifiers are populated and at least one capability
    /// is declared.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.agent_id.is_empty() {
            return Err(ValidationError::missing("agent_id"));
        }
        if self.org_id.is_empty() {
            return Err(ValidationError::missing("org_id"));
        }
        if self.capabilities.is_empty() {
            return Err(ValidationError::NoCapabilities);
        }
        Ok(())
    }
}

/// Validate an organization identity card.
pub fn validate_organization_identity(card: &OrgCard) -> Result<(), ValidationError> {
    card.validate()
}

/// Validate an agent identity card.
pub fn validate_agent_identity(card: &AgentCard) -> Result<(), ValidationError> {
    card.validate()
}
