//! Signing key configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Where the platform signing key and its public counterpart come from.
///
/// Keys are PEM documents: PKCS#8 for the private key, SPKI for the
/// public key.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct KeysConfig {
    /// Environment variable containing the PEM private key.
    #[serde(default)]
    pub private_key_env: Option<String>,

    /// Path to the PEM private key file.
    #[serde(default)]
    pub private_key_file: Option<PathBuf>,

    /// Environment variable containing the PEM public key.
    #[serde(default)]
    pub public_key_env: Option<String>,

    /// Path to the PEM public key file.
    #[serde(default)]
    pub public_key_file: Option<PathBuf>,
}

impl KeysConfig {
    /// Resolve the public key PEM from environment or file.
    pub fn resolve_public_key(&self) -> Result<Option<String>, std::io::Error> {
        resolve(self.public_key_env.as_deref(), self.public_key_file.as_ref())
    }

    /// Resolve the private key PEM from environment or file.
    pub fn resolve_private_key(&self) -> Result<Option<String>, std::io::Error> {
        resolve(
            self.private_key_env.as_deref(),
            self.private_key_file.as_ref(),
        )
    }

    /// Rebase relative key paths onto `base_dir`.
    pub(crate) fn rebase(&mut self, base_dir: &std::path::Path) {
        for path in [&mut self.private_key_file, &mut self.public_key_file]
            .into_iter()
            .flatten()
        {
            if path.is_relative() {
                *path = base_dir.join(&*path);
            }
        }
    }
}

fn resolve(env_var: Option<&str>, path: Option<&PathBuf>) -> Result<Option<String>, std::io::Error> {
    // Environment takes precedence over the file
    if let Some(env_var) = env_var {
        if let Ok(key) = std::env::var(env_var) {
            return Ok(Some(key));
        }
    }

    if let Some(path) = path {
        if path.exists() {
            let key = std::fs::read_to_string(path)?;
            return Ok(Some(key.trim().to_string()));
        }
    }

    Ok(None)
}
