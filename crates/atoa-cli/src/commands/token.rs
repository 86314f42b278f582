//! Token commands.
//!
//! `atoa token issue-org` - Issue an organization token.
//! `atoa token issue-agent` - Issue an agent token against an organization token.
//! `atoa token verify` - Verify a token and print its claims.
//! `atoa token inspect` - Decode a token without verification.

use super::identity::load_card;
use super::{emit, read_token, resolve_private_key, resolve_public_key};
use anyhow::Context;
use atoa_core::{AgentCard, AtoaConfig};
use atoa_token::{FixedClock, TokenIssuer, TokenVerifier, inspect_token_unverified};
use chrono::{DateTime, Utc};
use clap::ValueEnum;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Kind of token expected by `atoa token verify`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TokenKind {
    /// Organization token (audience `atoa.agent`)
    Org,
    /// Agent token (audience `atoa.session`)
    Agent,
}

fn issuer(config: &AtoaConfig, key: Option<String>) -> anyhow::Result<TokenIssuer> {
    let keypair = resolve_private_key(key, config)?;
    Ok(TokenIssuer::new(keypair).configured(&config.tokens))
}

/// Issue an organization token.
pub fn issue_org(
    config: &AtoaConfig,
    key: Option<String>,
    org_id: &str,
    verified: bool,
    output: Option<PathBuf>,
) -> anyhow::Result<()> {
    let token = issuer(config, key)?
        .issue_org_token(org_id, verified)
        .context("Failed to issue organization token")?;
    emit(&token, output.as_deref())
}

/// Issue an agent token for the card at `card_path`.
pub fn issue_agent(
    config: &AtoaConfig,
    key: Option<String>,
    card_path: &Path,
    org_token: String,
    output: Option<PathBuf>,
) -> anyhow::Result<()> {
    let card: AgentCard = load_card(card_path)?;
    let org_token = read_token(org_token)?;

    let token = issuer(config, key)?
        .issue_agent_token(&card, &org_token)
        .with_context(|| format!("Failed to issue agent token for {}", card.agent_id))?;
    emit(&token, output.as_deref())
}

/// Verify a token and print its claims as JSON.
pub fn verify(
    config: &AtoaConfig,
    key: Option<String>,
    token: String,
    kind: TokenKind,
    at: Option<&str>,
) -> anyhow::Result<()> {
    let public_key = resolve_public_key(key, config)?;
    let token = read_token(token)?;

    let mut verifier = TokenVerifier::new(public_key).configured(&config.tokens);
    if let Some(at) = at {
        let instant: DateTime<Utc> = DateTime::parse_from_rfc3339(at)
            .with_context(|| format!("Invalid --at timestamp: {at}"))?
            .with_timezone(&Utc);
        verifier = verifier.with_clock(Arc::new(FixedClock::new(instant)));
    }

    let claims = match kind {
        TokenKind::Org => verifier.verify_org_token(&token).map(serde_json::to_value),
        TokenKind::Agent => verifier.verify_agent_token(&token).map(serde_json::to_value),
    };

    match claims {
        Ok(claims) => {
            println!("✔ Token is valid");
            println!();
            println!("{}", serde_json::to_string_pretty(&claims?)?);
            Ok(())
        }
        Err(e) => anyhow::bail!("✖ Token verification failed ({:?}): {}", e.kind(), e),
    }
}

/// Inspect a token without verification.
pub fn inspect(token: String) -> anyhow::Result<()> {
    let token = read_token(token)?;
    let info = inspect_token_unverified(&token)?;

    println!("Token Information (unverified):");
    println!();
    println!("Header:");
    println!("{}", serde_json::to_string_pretty(&info.header)?);
    println!();
    println!("Claims:");
    println!("{}", serde_json::to_string_pretty(&info.claims)?);

    if let Some(exp) = info
        .claims
        .get("exp")
        .and_then(|v| v.as_i64())
        .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0))
    {
        println!();
        println!("Expires: {}", exp.to_rfc3339());
    }

    Ok(())
}
