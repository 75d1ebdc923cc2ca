//! # Addresses and Public Keys
//!
//! Addresses are opaque strings owned by their chain. Public keys are
//! chain-independent; a vault's address on a given chain is derived from its
//! key deterministically so every replica computes the same value.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::chain::Chain;
use crate::errors::{TypeError, TypeResult};

/// An account address on some chain.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct Address(String);

impl Address {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into().trim().to_string())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the address carries the prefix this chain renders.
    pub fn is_chain(&self, chain: &Chain) -> bool {
        self.0.starts_with(&chain.address_prefix())
    }
}

impl FromStr for Address {
    type Err = TypeError;

    fn from_str(s: &str) -> TypeResult<Self> {
        let s = s.trim();
        if s.is_empty() || s.chars().any(char::is_whitespace) {
            return Err(TypeError::InvalidAddress(s.to_string()));
        }
        Ok(Self(s.to_string()))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A public key, held in its canonical string encoding.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct PubKey(String);

impl PubKey {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Address controlled by this key on `chain`.
    pub fn address(&self, chain: &Chain) -> Address {
        let mut hasher = Sha256::new();
        hasher.update(chain.as_str().as_bytes());
        hasher.update(self.0.as_bytes());
        let digest = hex::encode(hasher.finalize());
        Address(format!("{}{}", chain.address_prefix(), &digest[..40]))
    }
}

impl FromStr for PubKey {
    type Err = TypeError;

    fn from_str(s: &str) -> TypeResult<Self> {
        let s = s.trim();
        if s.is_empty() || !s.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(TypeError::InvalidPubKey(s.to_string()));
        }
        Ok(Self(s.to_string()))
    }
}

impl fmt::Display for PubKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The two keys an operator registers, one per curve family.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct PubKeySet {
    pub secp256k1: PubKey,
    pub ed25519: PubKey,
}

impl PubKeySet {
    pub fn new(secp256k1: PubKey, ed25519: PubKey) -> Self {
        Self { secp256k1, ed25519 }
    }

    /// True when either key is missing.
    pub fn is_empty(&self) -> bool {
        self.secp256k1.is_empty() || self.ed25519.is_empty()
    }

    pub fn contains(&self, pk: &PubKey) -> bool {
        self.secp256k1 == *pk || self.ed25519 == *pk
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derived_address_is_deterministic_and_chain_scoped() {
        let pk = PubKey::new("thorpub1abc");
        let bnb = pk.address(&Chain::bnb());
        assert_eq!(bnb, pk.address(&Chain::bnb()));
        assert_ne!(bnb, pk.address(&Chain::btc()));
        assert!(bnb.is_chain(&Chain::bnb()));
    }

    #[test]
    fn test_pub_key_set_empty() {
        let set = PubKeySet::new(PubKey::new("a"), PubKey::default());
        assert!(set.is_empty());
        assert!(set.contains(&PubKey::new("a")));
    }

    #[test]
    fn test_address_parse() {
        assert!("".parse::<Address>().is_err());
        assert!("bnb 1".parse::<Address>().is_err());
        assert_eq!("bnb1xyz".parse::<Address>().unwrap().as_str(), "bnb1xyz");
    }
}
