//! Key management commands.
//!
//! `atoa keys generate` - Generate a new ECDSA P-256 keypair.

use anyhow::Context;
use atoa_token::KeyPair;
use std::fs;
use std::path::PathBuf;

pub const PRIVATE_KEY_FILE: &str = "private.pem";
pub const PUBLIC_KEY_FILE: &str = "public.pem";

/// Generate a new keypair.
pub fn generate(output: Option<PathBuf>) -> anyhow::Result<()> {
    let keypair = KeyPair::generate()?;

    if let Some(output_dir) = output {
        fs::create_dir_all(&output_dir)
            .with_context(|| format!("Failed to create {}", output_dir.display()))?;

        let private_path = output_dir.join(PRIVATE_KEY_FILE);
        let public_path = output_dir.join(PUBLIC_KEY_FILE);
        keypair.save_to_files(&private_path, &public_path)?;

        println!("✔ Generated P-256 keypair:");
        println!("  Private key: {}", private_path.display());
        println!("  Public key:  {}", public_path.display());
        println!("  Key id:      {}", keypair.key_id());
        println!();
        println!("⚠️  Keep your private key secure! Never commit it to version control.");
        println!();
        println!("Set as environment variables:");
        println!("  export ATOA_PRIVATE_KEY=\"$(cat {})\"", private_path.display());
        println!("  export ATOA_PUBLIC_KEY=\"$(cat {})\"", public_path.display());
    } else {
        println!("{}", keypair.private_key_pem()?);
        println!("{}", keypair.public_key_pem()?);
        println!("Key id: {}", keypair.key_id());
        println!();
        println!("Use --output <dir> to save keys to files.");
    }

    Ok(())
}
