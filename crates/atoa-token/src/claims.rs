//! Token claims for organization and agent tokens.
//!
//! Field names are part of the wire format and match the JWT registered
//! claims (`iss`, `aud`, `iat`, `exp`) plus the Atoa-specific fields.
//! Every field is mandatory when decoding: a payload missing `verified` or
//! `capabilities` is malformed, not defaulted.

use atoa_core::AgentCard;
use chrono::{DateTime, Duration, Utc};
use serde::de::{self, DeserializeOwned};
use serde::{Deserialize, Deserializer, Serialize};

/// Issuer of all Atoa tokens.
pub const TOKEN_ISSUER: &str = "atoa.platform";

/// Audience of organization tokens.
pub const ORG_TOKEN_AUDIENCE: &str = "atoa.agent";

/// Audience of agent tokens.
pub const AGENT_TOKEN_AUDIENCE: &str = "atoa.session";

/// Default validity window for newly issued tokens.
pub const DEFAULT_TOKEN_VALIDITY_SECS: i64 = 3600;

/// Default validity window as a duration.
pub fn default_token_validity() -> Duration {
    Duration::seconds(DEFAULT_TOKEN_VALIDITY_SECS)
}

/// Behaviour shared by organization and agent claim sets.
pub trait ClaimSet: Serialize + DeserializeOwned {
    /// Audience a token of this shape must carry.
    const AUDIENCE: &'static str;

    /// Short name used in logs.
    const KIND: &'static str;

    fn issuer(&self) -> &str;
    fn audience(&self) -> &str;
    fn issued_at(&self) -> i64;
    fn expires_at(&self) -> i64;
}

/// Claims of an organization token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrgClaims {
    pub iss: String,
    /// Written as a string; a one-element array is accepted on decode.
    #[serde(deserialize_with = "single_audience")]
    pub aud: String,
    /// Issued at (Unix timestamp).
    pub iat: i64,
    /// Expiration (Unix timestamp).
    pub exp: i64,
    pub org_id: String,
    /// Platform-asserted verification status.
    pub verified: bool,
}

/// Claims of an agent token, delegated from an organization token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentClaims {
    pub iss: String,
    /// Written as a string; a one-element array is accepted on decode.
    #[serde(deserialize_with = "single_audience")]
    pub aud: String,
    /// Issued at (Unix timestamp).
    pub iat: i64,
    /// Expiration (Unix timestamp).
    pub exp: i64,
    pub agent_id: String,
    pub org_id: String,
    /// Copied from the organization token, never from the agent card.
    pub verified: bool,
    pub capabilities: Vec<String>,
}

impl OrgClaims {
    /// Build organization claims valid from `issued_at` for `validity`.
    pub fn new(
        org_id: impl Into<String>,
        verified: bool,
        issued_at: DateTime<Utc>,
        validity: Duration,
    ) -> Self {
        let iat = issued_at.timestamp();
        Self {
            iss: TOKEN_ISSUER.to_string(),
            aud: ORG_TOKEN_AUDIENCE.to_string(),
            iat,
            exp: iat.saturating_add(validity.num_seconds()),
            org_id: org_id.into(),
            verified,
        }
    }
}

impl AgentClaims {
    /// Build agent claims for `card`, inheriting verification status from
    /// the organization's claims.
    ///
    /// The caller is responsible for having verified `org` and checked that
    /// it names the card's organization.
    pub fn delegated(
        card: &AgentCard,
        org: &OrgClaims,
        issued_at: DateTime<Utc>,
        validity: Duration,
    ) -> Self {
        let iat = issued_at.timestamp();
        Self {
            iss: TOKEN_ISSUER.to_string(),
            aud: AGENT_TOKEN_AUDIENCE.to_string(),
            iat,
            exp: iat.saturating_add(validity.num_seconds()),
            agent_id: card.agent_id.clone(),
            org_id: org.org_id.clone(),
            verified: org.verified,
            capabilities: card.capabilities.clone(),
        }
    }

    /// Whether the agent was granted `capability`.
    pub fn has_capability(&self, capability: &str) -> bool {
        self.capabilities.iter().any(|c| c == capability)
    }
}

/// Accept `aud` as a string or as an array holding exactly one string
/// (RFC 7519 section 4.1.3 allows either form).
fn single_audience<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Audience {
        One(String),
        Many(Vec<String>),
    }

    match Audience::deserialize(deserializer)? {
        Audience::One(aud) => Ok(aud),
        Audience::Many(mut auds) if auds.len() == 1 => Ok(auds.remove(0)),
        Audience::Many(auds) => Err(de::Error::custom(format!(
            "expected a single audience, found {}",
            auds.len()
        ))),
    }
}

macro_rules! impl_claim_set {
    ($ty:ty, $audience:expr, $kind:literal) => {
        impl ClaimSet for $ty {
            const AUDIENCE: &'static str = $audience;
            const KIND: &'static str = $kind;

            fn issuer(&self) -> &str {
                &self.iss
            }

            fn audience(&self) -> &str {
                &self.aud
            }

            fn issued_at(&self) -> i64 {
                self.iat
            }

            fn expires_at(&self) -> i64 {
                self.exp
            }
        }
    };
}

impl_claim_set!(OrgClaims, ORG_TOKEN_AUDIENCE, "organization");
impl_claim_set!(AgentClaims, AGENT_TOKEN_AUDIENCE, "agent");

/// Convert a NumericDate to a UTC timestamp, saturating on overflow.
pub(crate) fn to_datetime(secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(secs, 0).unwrap_or(if secs < 0 {
        DateTime::<Utc>::MIN_UTC
    } else {
        DateTime::<Utc>::MAX_UTC
    })
}
