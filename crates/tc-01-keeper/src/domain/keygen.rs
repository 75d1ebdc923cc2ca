//! Keygen requests picked up by the external signer daemons.

use serde::{Deserialize, Serialize};
use shared_types::PubKey;

use super::vault::VaultType;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Keygen {
    pub keygen_type: VaultType,
    /// Sorted member keys.
    pub members: Vec<PubKey>,
}

impl Keygen {
    pub fn new(keygen_type: VaultType, mut members: Vec<PubKey>) -> Self {
        members.sort();
        members.dedup();
        Self { keygen_type, members }
    }
}

/// All keygens requested at one height.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct KeygenBlock {
    pub height: u64,
    pub keygens: Vec<Keygen>,
}

impl KeygenBlock {
    pub fn new(height: u64) -> Self {
        Self {
            height,
            keygens: Vec::new(),
        }
    }

    pub fn contains(&self, keygen: &Keygen) -> bool {
        self.keygens.contains(keygen)
    }

    /// Append unless an identical request is already present.
    pub fn add(&mut self, keygen: Keygen) -> bool {
        if self.contains(&keygen) {
            return false;
        }
        self.keygens.push(keygen);
        true
    }

    pub fn is_empty(&self) -> bool {
        self.keygens.is_empty()
    }
}
