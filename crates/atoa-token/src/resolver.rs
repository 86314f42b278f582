//! Verification key lookup.
//!
//! The verifier does not discover keys itself. It asks a [`KeyResolver`]
//! for the key matching the `kid` in the token header.

use crate::error::TokenError;
use crate::keys::key_id_for;
use p256::ecdsa::VerifyingKey;
use std::collections::HashMap;

/// Maps a token's key id to the public key that must have signed it.
pub trait KeyResolver: Send + Sync {
    fn resolve(&self, key_id: Option<&str>) -> Result<VerifyingKey, TokenError>;
}

/// Always answers with one key, whatever the token's `kid` says.
#[derive(Debug, Clone)]
pub struct StaticKeyResolver {
    key: VerifyingKey,
}

impl StaticKeyResolver {
    pub fn new(key: VerifyingKey) -> Self {
        Self { key }
    }
}

impl KeyResolver for StaticKeyResolver {
    fn resolve(&self, _key_id: Option<&str>) -> Result<VerifyingKey, TokenError> {
        Ok(self.key)
    }
}

/// A set of trusted keys indexed by their RFC 7638 thumbprint.
///
/// Tokens without a `kid` are rejected.
#[derive(Debug, Clone, Default)]
pub struct KeyRing {
    keys: HashMap<String, VerifyingKey>,
}

impl KeyRing {
    pub fn new() -> Self {
        Self::default()
    }

    /// Trust `key`; returns its key id.
    pub fn insert(&mut self, key: VerifyingKey) -> String {
        let key_id = key_id_for(&key);
        self.keys.insert(key_id.clone(), key);
        key_id
    }

    /// Stop trusting the key with this id.
    pub fn remove(&mut self, key_id: &str) -> Option<VerifyingKey> {
        self.keys.remove(key_id)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

impl KeyResolver for KeyRing {
    fn resolve(&self, key_id: Option<&str>) -> Result<VerifyingKey, TokenError> {
        key_id
            .and_then(|kid| self.keys.get(kid))
            .copied()
            .ok_or_else(|| TokenError::UnknownKey {
                key_id: key_id.map(str::to_string),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::KeyPair;

    #[test]
    fn test_static_resolver_ignores_kid() {
        let keypair = KeyPair::generate().unwrap();
        let resolver = StaticKeyResolver::new(keypair.verifying_key());
        assert_eq!(
            resolver.resolve(Some("anything")).unwrap(),
            keypair.verifying_key()
        );
        assert_eq!(resolver.resolve(None).unwrap(), keypair.verifying_key());
    }

    #[test]
    fn test_key_ring_lookup() {
        let a = KeyPair::generate().unwrap();
        let b = KeyPair::generate().unwrap();

        let mut ring = KeyRing::new();
        let kid_a = ring.insert(a.verifying_key());
        assert_eq!(kid_a, a.key_id());
        assert_eq!(ring.resolve(Some(a.key_id())).unwrap(), a.verifying_key());

        let err = ring.resolve(Some(b.key_id())).unwrap_err();
        assert!(matches!(err, TokenError::UnknownKey { .. }));

        let err = ring.resolve(None).unwrap_err();
        assert!(matches!(err, TokenError::UnknownKey { key_id: None }));

        ring.remove(&kid_a);
        assert!(ring.is_empty());
    }
}
