//! # Node Accounts
//!
//! An operator's on-chain identity. Status changes go through
//! [`NodeAccount::update_status`], which enforces the lifecycle
//!
//! ```text
//! Unknown → WhiteListed → Standby ⇄ Ready → Active → Standby
//!                 └──────────┴────────┴────────┴──→ Disabled
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};
use shared_types::{Address, Amount, PubKey, PubKeySet, ProtocolVersion};

use super::errors::{KeeperError, KeeperResult};

/// Lifecycle status of an operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
pub enum NodeStatus {
    /// No record exists.
    #[default]
    Unknown,
    /// Bonded, waiting for keys.
    WhiteListed,
    /// Keys set, not yet eligible.
    Standby,
    /// Eligible for the next churn.
    Ready,
    /// Member of the validator set.
    Active,
    /// Permanently out.
    Disabled,
}

impl NodeStatus {
    /// Allowed lifecycle edges. Self-edges are always accepted.
    pub fn can_transition_to(self, next: NodeStatus) -> bool {
        use NodeStatus::*;
        if self == next {
            return true;
        }
        matches!(
            (self, next),
            (Unknown, WhiteListed)
                | (WhiteListed, Standby)
                | (WhiteListed, Disabled)
                | (Standby, Ready)
                | (Standby, Disabled)
                | (Ready, Active)
                | (Ready, Standby)
                | (Ready, Disabled)
                | (Active, Standby)
                | (Active, Disabled)
        )
    }
}

impl fmt::Display for NodeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            NodeStatus::Unknown => "unknown",
            NodeStatus::WhiteListed => "whitelisted",
            NodeStatus::Standby => "standby",
            NodeStatus::Ready => "ready",
            NodeStatus::Active => "active",
            NodeStatus::Disabled => "disabled",
        };
        f.write_str(s)
    }
}

/// An operator account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct NodeAccount {
    /// Native-ledger address that signs the operator's messages.
    pub node_address: Address,
    pub status: NodeStatus,
    pub pub_key_set: PubKeySet,
    pub validator_cons_pub_key: String,
    /// Collateral in rune base units.
    pub bond: Amount,
    /// Height the operator last became active.
    pub active_block_height: u64,
    /// Where bond refunds are paid.
    pub bond_address: Address,
    /// Height of the last status change.
    pub status_since: u64,
    /// Vault pool keys this operator holds a key share of.
    pub signer_membership: Vec<PubKey>,
    pub requested_to_leave: bool,
    pub forced_to_leave: bool,
    /// Height the operator was marked for removal, zero when unmarked.
    pub leave_height: u64,
    pub ip_address: String,
    pub version: ProtocolVersion,
    pub slash_points: u64,
}

impl NodeAccount {
    pub fn new(
        node_address: Address,
        status: NodeStatus,
        pub_key_set: PubKeySet,
        validator_cons_pub_key: impl Into<String>,
        bond: Amount,
        bond_address: Address,
        height: u64,
    ) -> Self {
        Self {
            node_address,
            status,
            pub_key_set,
            validator_cons_pub_key: validator_cons_pub_key.into(),
            bond,
            bond_address,
            status_since: height,
            ..Default::default()
        }
    }

    /// True when no account is stored under this address.
    pub fn is_empty(&self) -> bool {
        self.node_address.is_empty() || self.status == NodeStatus::Unknown
    }

    pub fn is_active(&self) -> bool {
        self.status == NodeStatus::Active
    }

    /// Both key families and the consensus key are registered.
    pub fn has_keys(&self) -> bool {
        !self.pub_key_set.is_empty() && !self.validator_cons_pub_key.is_empty()
    }

    /// Marked for removal in the next churn.
    pub fn is_leaving(&self) -> bool {
        self.forced_to_leave || self.requested_to_leave || self.leave_height > 0
    }

    /// Move to `status`, recording the height when it changes.
    pub fn update_status(&mut self, status: NodeStatus, height: u64) -> KeeperResult<()> {
        if !self.status.can_transition_to(status) {
            return Err(KeeperError::InvalidStatusTransition {
                entity: "node account",
                from: self.status.to_string(),
                to: status.to_string(),
            });
        }
        if self.status != status {
            self.status = status;
            self.status_since = height;
        }
        Ok(())
    }

    /// Record membership of a vault; duplicates are ignored.
    pub fn try_add_signer_pub_key(&mut self, key: PubKey) {
        if !self.signer_membership.contains(&key) {
            self.signer_membership.push(key);
        }
    }

    /// Mark for removal at `height` unless already marked.
    pub fn mark_leave(&mut self, height: u64) {
        if self.leave_height == 0 {
            self.leave_height = height;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account(status: NodeStatus) -> NodeAccount {
        NodeAccount::new(
            Address::new("thor1node"),
            status,
            PubKeySet::new(PubKey::new("secp"), PubKey::new("ed")),
            "cons",
            100,
            Address::new("bnb1bond"),
            1,
        )
    }

    #[test]
    fn test_update_status_records_height() {
        let mut na = account(NodeStatus::Ready);
        na.update_status(NodeStatus::Active, 42).unwrap();
        assert_eq!(na.status_since, 42);
        // self edge keeps the original height
        na.update_status(NodeStatus::Active, 50).unwrap();
        assert_eq!(na.status_since, 42);
    }

    #[test]
    fn test_disabled_is_terminal() {
        let mut na = account(NodeStatus::Disabled);
        let err = na.update_status(NodeStatus::Standby, 3).unwrap_err();
        assert!(matches!(err, KeeperError::InvalidStatusTransition { .. }));
    }

    #[test]
    fn test_whitelisted_cannot_jump_to_active() {
        assert!(!NodeStatus::WhiteListed.can_transition_to(NodeStatus::Active));
        assert!(NodeStatus::Ready.can_transition_to(NodeStatus::Active));
    }

    #[test]
    fn test_mark_leave_is_sticky() {
        let mut na = account(NodeStatus::Active);
        na.mark_leave(10);
        na.mark_leave(20);
        assert_eq!(na.leave_height, 10);
        assert!(na.is_leaving());
    }

    #[test]
    fn test_signer_membership_dedup() {
        let mut na = account(NodeStatus::Active);
        na.try_add_signer_pub_key(PubKey::new("pool"));
        na.try_add_signer_pub_key(PubKey::new("pool"));
        assert_eq!(na.signer_membership.len(), 1);
    }
}
