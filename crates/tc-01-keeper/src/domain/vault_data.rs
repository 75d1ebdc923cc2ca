//! Network-wide reserve and bond-reward accounting.

use serde::{Deserialize, Serialize};
use shared_types::{get_share, Address, Amount};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct VaultData {
    /// Rune set aside for paying bonders.
    pub bond_reward_rune: Amount,
    /// Sum over active operators of blocks spent active since the last payout.
    pub total_bond_units: Amount,
    pub total_reserve: Amount,
    /// Rune still held on BNB as the BEP2 token.
    pub total_bep2_rune: Amount,
    /// Gas subsidy the reserve could not cover.
    pub gas_shortfall: Amount,
}

impl VaultData {
    /// Share of the bond-reward bucket earned by `earned_blocks`.
    pub fn calc_node_rewards(&self, earned_blocks: Amount) -> Amount {
        get_share(earned_blocks, self.total_bond_units, self.bond_reward_rune)
    }
}

/// An external address that donated to the reserve.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ReserveContributor {
    pub address: Address,
    pub amount: Amount,
}

impl ReserveContributor {
    pub fn new(address: Address, amount: Amount) -> Self {
        Self { address, amount }
    }

    pub fn is_empty(&self) -> bool {
        self.address.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct ReserveContributors(pub Vec<ReserveContributor>);

impl ReserveContributors {
    /// Append, or increment the existing entry for the same address.
    pub fn add(&mut self, contributor: ReserveContributor) {
        match self.0.iter_mut().find(|c| c.address == contributor.address) {
            Some(existing) => existing.amount = existing.amount.saturating_add(contributor.amount),
            None => self.0.push(contributor),
        }
    }

    pub fn total(&self) -> Amount {
        self.0.iter().map(|c| c.amount).sum()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ReserveContributor> {
        self.0.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
