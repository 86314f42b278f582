//! # atoa-token
//!
//! Delegated credentials for the Atoa platform.
//!
//! This crate provides functionality for:
//! - Generating and loading ECDSA P-256 keypairs
//! - Signing and verifying registration challenges
//! - Issuing organization tokens and agent tokens delegated from them
//! - Verifying tokens against an injected key resolver and clock
//!
//! ## Two-Tier Trust Chain
//!
//! | Token Type | Issued For | Audience | Proof Required |
//! |------------|------------|----------|----------------|
//! | **Organization Token** | A registered organization | `atoa.agent` | Challenge signature at registration |
//! | **Agent Token** | An agent acting for the organization | `atoa.session` | A valid organization token for the same `org_id` |
//!
//! An agent token inherits `verified` from the organization token it was
//! delegated from; the agent's own card cannot raise it.
//!
//! ## Token Format
//!
//! Tokens are compact JWS strings signed with ES256. The header carries the
//! RFC 7638 thumbprint of the signing key as `kid`, which a [`KeyResolver`]
//! maps back to a verification key.

pub mod claims;
pub mod clock;
pub mod error;
pub mod jwt;
pub mod keys;
pub mod resolver;
pub mod signature;
pub mod token;

pub use claims::{
    AGENT_TOKEN_AUDIENCE, AgentClaims, ClaimSet, DEFAULT_TOKEN_VALIDITY_SECS, ORG_TOKEN_AUDIENCE,
    OrgClaims, TOKEN_ISSUER,
};
pub use clock::{Clock, FixedClock, SystemClock};
pub use error::{ErrorKind, TokenError};
pub use jwt::{Header, TokenInfo, inspect_token_unverified};
pub use keys::{KeyPair, key_id_for, load_public_key_file, load_public_key_pem};
pub use p256::ecdsa::VerifyingKey;
pub use resolver::{KeyResolver, KeyRing, StaticKeyResolver};
pub use signature::{SignatureError, new_challenge, sign_challenge, verify_signature};
pub use token::{
    TokenIssuer, TokenVerifier, issue_agent_token, issue_organization_token, verify_agent_token,
    verify_organization_token,
};
