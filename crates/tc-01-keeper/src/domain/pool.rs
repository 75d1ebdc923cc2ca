//! Continuous-product liquidity pools.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use shared_types::{get_share, Amount, Asset};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum PoolStatus {
    /// Swaps allowed.
    Enabled,
    /// Staking only.
    #[default]
    Bootstrap,
}

impl FromStr for PoolStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "enabled" => Ok(PoolStatus::Enabled),
            "bootstrap" => Ok(PoolStatus::Bootstrap),
            other => Err(format!("unknown pool status: {other}")),
        }
    }
}

impl fmt::Display for PoolStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PoolStatus::Enabled => f.write_str("Enabled"),
            PoolStatus::Bootstrap => f.write_str("Bootstrap"),
        }
    }
}

/// An asset/rune pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Pool {
    pub balance_rune: Amount,
    pub balance_asset: Amount,
    pub asset: Asset,
    /// Total stake units issued.
    pub pool_units: Amount,
    pub status: PoolStatus,
}

impl Pool {
    pub fn new(asset: Asset) -> Self {
        Self {
            asset,
            ..Default::default()
        }
    }

    /// No pool is stored for this asset.
    pub fn is_empty(&self) -> bool {
        self.asset.is_empty()
    }

    pub fn is_enabled(&self) -> bool {
        self.status == PoolStatus::Enabled
    }

    /// Both sides hold liquidity.
    pub fn has_liquidity(&self) -> bool {
        self.balance_rune > 0 && self.balance_asset > 0
    }

    /// Asset amount worth `rune` at the current price.
    pub fn rune_value_in_asset(&self, rune: Amount) -> Amount {
        get_share(rune, self.balance_rune, self.balance_asset)
    }

    /// Rune amount worth `asset` at the current price.
    pub fn asset_value_in_rune(&self, asset: Amount) -> Amount {
        get_share(asset, self.balance_asset, self.balance_rune)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_price_conversion() {
        let mut pool = Pool::new("BNB.BNB".parse().unwrap());
        pool.balance_rune = 10_000;
        pool.balance_asset = 20_000;
        assert_eq!(pool.asset_value_in_rune(2_000), 1_000);
        assert_eq!(pool.rune_value_in_asset(1_000), 2_000);
    }

    #[test]
    fn test_empty_pool_prices_zero() {
        let pool = Pool::new("BNB.BNB".parse().unwrap());
        assert_eq!(pool.asset_value_in_rune(100), 0);
        assert!(!pool.has_liquidity());
    }

    #[test]
    fn test_status_parse() {
        assert_eq!("bootstrap".parse::<PoolStatus>().unwrap(), PoolStatus::Bootstrap);
        assert!("paused".parse::<PoolStatus>().is_err());
    }
}
