//! CLI command implementations for Atoa.

pub mod challenge;
pub mod identity;
pub mod keys;
pub mod token;

use anyhow::Context;
use atoa_core::AtoaConfig;
use atoa_token::{KeyPair, VerifyingKey, load_public_key_pem};
use std::fs;
use std::path::Path;

const PEM_MARKER: &str = "-----BEGIN";

/// Read a key argument that is either a path to a PEM file or PEM text.
fn read_key_argument(value: &str) -> anyhow::Result<String> {
    let path = Path::new(value);
    if !value.contains(PEM_MARKER) && path.exists() {
        return fs::read_to_string(path)
            .with_context(|| format!("Failed to read key file: {}", path.display()));
    }
    if value.contains(PEM_MARKER) {
        return Ok(value.to_string());
    }
    anyhow::bail!("Key is neither an existing file nor PEM text: {value}")
}

/// Resolve the private key from `--key` / `ATOA_PRIVATE_KEY`, then the config file.
pub(crate) fn resolve_private_key(
    key: Option<String>,
    config: &AtoaConfig,
) -> anyhow::Result<KeyPair> {
    let pem = match key {
        Some(value) => read_key_argument(&value)?,
        None => config
            .keys
            .resolve_private_key()
            .context("Failed to read private key configured in keys section")?
            .context(
                "Private key not provided. Either pass --key <path>, set ATOA_PRIVATE_KEY, \
                 or configure keys.private_key_file",
            )?,
    };

    KeyPair::from_private_key_pem(&pem)
        .context("Failed to parse private key. Expected a PEM-encoded P-256 private key")
}

/// Resolve public key PEM text from `--key` / `ATOA_PUBLIC_KEY`, then the config file.
///
/// Falls back to the public half of the configured private key, since the
/// platform signs and verifies with the same keypair by default.
pub(crate) fn resolve_public_key_pem(
    key: Option<String>,
    config: &AtoaConfig,
) -> anyhow::Result<String> {
    if let Some(value) = key {
        return read_key_argument(&value);
    }

    if let Some(pem) = config
        .keys
        .resolve_public_key()
        .context("Failed to read public key configured in keys section")?
    {
        return Ok(pem);
    }

    if config.keys.resolve_private_key().ok().flatten().is_some() {
        let keypair = resolve_private_key(None, config)?;
        tracing::debug!(key_id = keypair.key_id(), "using public half of configured private key");
        return Ok(keypair.public_key_pem()?);
    }

    anyhow::bail!(
        "Public key not provided. Either pass --key <path>, set ATOA_PUBLIC_KEY, \
         or configure keys.public_key_file"
    )
}

/// Resolve the verification key.
pub(crate) fn resolve_public_key(
    key: Option<String>,
    config: &AtoaConfig,
) -> anyhow::Result<VerifyingKey> {
    let pem = resolve_public_key_pem(key, config)?;
    load_public_key_pem(&pem)
        .context("Failed to parse public key. Expected a PEM-encoded P-256 public key")
}

/// Accept a token either inline or as a path to a file containing it.
pub(crate) fn read_token(token: String) -> anyhow::Result<String> {
    let path = Path::new(&token);
    if path.exists() {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read token file: {}", path.display()))?;
        return Ok(contents.trim().to_string());
    }
    Ok(token.trim().to_string())
}

/// Write `contents` to `output`, or print it when no output is given.
pub(crate) fn emit(contents: &str, output: Option<&Path>) -> anyhow::Result<()> {
    match output {
        Some(path) => {
            fs::write(path, contents)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!("✔ Written to: {}", path.display());
        }
        None => println!("{contents}"),
    }
    Ok(())
}
