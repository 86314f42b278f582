//! Registration challenge commands.
//!
//! `atoa challenge new` - Print a fresh challenge.
//! `atoa challenge sign` - Sign a challenge with an organization key.
//! `atoa challenge verify` - Check a challenge signature.

use super::{resolve_private_key, resolve_public_key_pem};
use anyhow::Context;
use atoa_core::AtoaConfig;
use atoa_token::{new_challenge, sign_challenge, verify_signature};

/// Print a new random challenge.
pub fn new() {
    println!("{}", new_challenge());
}

/// Sign `challenge` and print the base64 DER signature.
pub fn sign(config: &AtoaConfig, key: Option<String>, challenge: &str) -> anyhow::Result<()> {
    let keypair = resolve_private_key(key, config)?;
    let signature = sign_challenge(challenge.as_bytes(), &keypair)?;
    println!("{signature}");
    Ok(())
}

/// Verify a challenge signature. Fails when the signature does not match.
pub fn verify(
    config: &AtoaConfig,
    key: Option<String>,
    challenge: &str,
    signature: &str,
) -> anyhow::Result<()> {
    let public_key = resolve_public_key_pem(key, config)?;

    let valid = verify_signature(challenge.as_bytes(), signature, &public_key)
        .context("Could not check signature")?;
    if !valid {
        anyhow::bail!("✖ Signature does not match the challenge and public key");
    }

    println!("✔ Signature is valid");
    Ok(())
}
