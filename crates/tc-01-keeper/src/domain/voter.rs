//! # Consensus Voters
//!
//! A voter aggregates signatures of active operators about one subject and
//! commits exactly once, on the first call that observes a super-majority:
//!
//! ```text
//! Open --sign, < 2/3--> Open
//! Open --sign, >= 2/3--> Consensus (height recorded, commit returns true)
//! Consensus --anything--> Consensus (commit returns false)
//! ```

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use shared_types::{Address, PubKey};

use super::node_account::NodeAccount;
use super::vault::VaultType;

/// `signers >= ceil(2/3 * total)`; never true for an empty active set.
pub fn has_super_majority(signers: usize, total: usize) -> bool {
    total > 0 && signers * 3 >= total * 2
}

/// Number of `signers` that belong to the active set.
pub fn count_active_signers(signers: &[Address], active: &[NodeAccount]) -> usize {
    signers
        .iter()
        .filter(|s| active.iter().any(|na| &na.node_address == *s))
        .count()
}

/// Shared commit protocol of the signer-set voters.
pub trait ConsensusVoter {
    fn signers(&self) -> &[Address];
    fn signers_mut(&mut self) -> &mut Vec<Address>;
    /// Height consensus was recorded at, zero while open.
    fn consensus_height(&self) -> u64;
    fn set_consensus_height(&mut self, height: u64);

    fn has_signed(&self, signer: &Address) -> bool {
        self.signers().contains(signer)
    }

    /// Add `signer`; false when it had already signed.
    fn sign(&mut self, signer: Address) -> bool {
        if self.has_signed(&signer) {
            return false;
        }
        self.signers_mut().push(signer);
        true
    }

    fn has_consensus(&self, active: &[NodeAccount]) -> bool {
        has_super_majority(count_active_signers(self.signers(), active), active.len())
    }

    /// Record consensus at `height` if this is the edge transition.
    fn commit(&mut self, height: u64, active: &[NodeAccount]) -> bool {
        if self.consensus_height() > 0 || !self.has_consensus(active) {
            return false;
        }
        self.set_consensus_height(height);
        true
    }
}

macro_rules! impl_consensus_voter {
    ($t:ty) => {
        impl ConsensusVoter for $t {
            fn signers(&self) -> &[Address] {
                &self.signers
            }
            fn signers_mut(&mut self) -> &mut Vec<Address> {
                &mut self.signers
            }
            fn consensus_height(&self) -> u64 {
                self.block_height
            }
            fn set_consensus_height(&mut self, height: u64) {
                self.block_height = height;
            }
        }
    };
}

/// Votes to force an operator out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct BanVoter {
    pub node_address: Address,
    pub signers: Vec<Address>,
    pub block_height: u64,
}

impl BanVoter {
    pub fn new(node_address: Address) -> Self {
        Self {
            node_address,
            ..Default::default()
        }
    }
}

impl_consensus_voter!(BanVoter);

/// Votes on the outcome of a keygen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct TssVoter {
    pub id: String,
    /// Empty when the keygen failed.
    pub pool_pub_key: PubKey,
    pub pub_keys: Vec<PubKey>,
    pub keygen_type: VaultType,
    /// Height the keygen was requested at.
    pub keygen_height: u64,
    pub signers: Vec<Address>,
    pub block_height: u64,
}

impl TssVoter {
    /// Voters are keyed by `(members, pool key, kind, keygen height)`.
    pub fn voter_id(pub_keys: &[PubKey], pool_pub_key: &PubKey, kind: VaultType, height: u64) -> String {
        let mut keys: Vec<&str> = pub_keys.iter().map(PubKey::as_str).collect();
        keys.sort_unstable();
        let mut hasher = Sha256::new();
        for k in keys {
            hasher.update(k.as_bytes());
            hasher.update(b",");
        }
        hasher.update(pool_pub_key.as_str().as_bytes());
        hasher.update(format!("{kind:?}:{height}").as_bytes());
        hex::encode_upper(hasher.finalize())
    }

    pub fn new(id: String, pool_pub_key: PubKey, pub_keys: Vec<PubKey>, keygen_type: VaultType, keygen_height: u64) -> Self {
        Self {
            id,
            pool_pub_key,
            pub_keys,
            keygen_type,
            keygen_height,
            ..Default::default()
        }
    }
}

impl_consensus_voter!(TssVoter);

/// Votes that a keysign round failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct TssKeysignFailVoter {
    pub id: String,
    pub signers: Vec<Address>,
    pub block_height: u64,
}

impl TssKeysignFailVoter {
    pub fn new(id: String) -> Self {
        Self {
            id,
            ..Default::default()
        }
    }
}

impl_consensus_voter!(TssKeysignFailVoter);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::NodeStatus;

    fn active(n: usize) -> Vec<NodeAccount> {
        (0..n)
            .map(|i| {
                let mut na = NodeAccount::default();
                na.node_address = Address::new(format!("thor{i}"));
                na.status = NodeStatus::Active;
                na
            })
            .collect()
    }

    #[test]
    fn test_super_majority_threshold() {
        assert!(!has_super_majority(1, 3));
        assert!(has_super_majority(2, 3));
        assert!(!has_super_majority(2, 4));
        assert!(has_super_majority(3, 4));
        assert!(!has_super_majority(0, 0));
    }

    #[test]
    fn test_commit_fires_once() {
        let nodes = active(3);
        let mut voter = BanVoter::new(Address::new("thor0"));
        assert!(voter.sign(nodes[1].node_address.clone()));
        assert!(!voter.commit(10, &nodes));
        assert!(!voter.sign(nodes[1].node_address.clone()));
        assert!(voter.sign(nodes[2].node_address.clone()));
        assert!(voter.commit(11, &nodes));
        assert_eq!(voter.block_height, 11);
        assert!(voter.sign(nodes[0].node_address.clone()));
        assert!(!voter.commit(12, &nodes));
        assert_eq!(voter.block_height, 11);
    }

    #[test]
    fn test_inactive_signers_do_not_count() {
        let nodes = active(3);
        let mut voter = TssKeysignFailVoter::new("x".into());
        voter.sign(Address::new("stranger1"));
        voter.sign(Address::new("stranger2"));
        voter.sign(nodes[0].node_address.clone());
        assert!(!voter.has_consensus(&nodes));
    }

    #[test]
    fn test_tss_voter_id_ignores_member_order() {
        let a = vec![PubKey::new("a"), PubKey::new("b")];
        let b = vec![PubKey::new("b"), PubKey::new("a")];
        let pk = PubKey::new("pool");
        assert_eq!(
            TssVoter::voter_id(&a, &pk, VaultType::Asgard, 5),
            TssVoter::voter_id(&b, &pk, VaultType::Asgard, 5)
        );
        assert_ne!(
            TssVoter::voter_id(&a, &pk, VaultType::Asgard, 5),
            TssVoter::voter_id(&a, &PubKey::default(), VaultType::Asgard, 5)
        );
    }
}
