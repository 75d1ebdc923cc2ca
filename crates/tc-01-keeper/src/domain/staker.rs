//! A liquidity provider's position in one pool.

use serde::{Deserialize, Serialize};
use shared_types::{Address, Amount, Asset};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Staker {
    pub asset: Asset,
    pub rune_address: Address,
    pub asset_address: Address,
    pub units: Amount,
    /// Rune staked into a non-BNB pool while waiting for the asset leg.
    pub pending_rune: Amount,
    pub last_stake_height: u64,
    pub last_unstake_height: u64,
}

impl Staker {
    pub fn new(asset: Asset, rune_address: Address) -> Self {
        Self {
            asset,
            rune_address,
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.units == 0 && self.pending_rune == 0
    }
}
