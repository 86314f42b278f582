//! Identity card commands.
//!
//! `atoa org validate` - Validate an organization card.
//! `atoa agent validate` - Validate an agent card.
//!
//! Cards are read as YAML, so JSON cards work too.

use anyhow::Context;
use atoa_core::{AgentCard, OrgCard, parse_public_key_pem};
use atoa_token::key_id_for;
use serde::de::DeserializeOwned;
use std::fs;
use std::path::Path;

pub(crate) fn load_card<T: DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read card: {}", path.display()))?;
    serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse card: {}", path.display()))
}

/// Validate an organization card and print its key id.
pub fn validate_org(path: &Path) -> anyhow::Result<()> {
    let card: OrgCard = load_card(path)?;
    card.validate()
        .with_context(|| format!("✖ Invalid organization card: {}", path.display()))?;

    let key = parse_public_key_pem(&card.public_key)?;
    println!("✔ Organization card is valid");
    println!("  Org id:  {}", card.org_id);
    println!("  Name:    {}", card.name);
    println!("  Domain:  {}", card.domain);
    println!("  Key id:  {}", key_id_for(&key));
    Ok(())
}

/// Validate an agent card.
pub fn validate_agent(path: &Path) -> anyhow::Result<()> {
    let card: AgentCard = load_card(path)?;
    card.validate()
        .with_context(|| format!("✖ Invalid agent card: {}", path.display()))?;

    println!("✔ Agent card is valid");
    println!("  Agent id:     {}", card.agent_id);
    println!("  Org id:       {}", card.org_id);
    println!("  Capabilities: {}", card.capabilities.join(", "));
    if !card.endpoints.is_empty() {
        println!("  Endpoints:    {}", card.endpoints.join(", "));
    }
    Ok(())
}
