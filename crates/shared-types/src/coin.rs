//! Coins and coin sets.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::asset::Asset;
use crate::errors::{TypeError, TypeResult};
use crate::math::Amount;

/// An amount of one asset.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct Coin {
    pub asset: Asset,
    pub amount: Amount,
}

impl Coin {
    pub fn new(asset: Asset, amount: Amount) -> Self {
        Self { asset, amount }
    }

    /// True for zero-amount or asset-less coins.
    pub fn is_empty(&self) -> bool {
        self.asset.is_empty() || self.amount == 0
    }

    pub fn is_native(&self) -> bool {
        self.asset.is_native()
    }

    pub fn validate(&self) -> TypeResult<()> {
        if self.asset.is_empty() {
            return Err(TypeError::InvalidCoins("coin has no asset".into()));
        }
        if self.amount == 0 {
            return Err(TypeError::InvalidCoins(format!("zero amount of {}", self.asset)));
        }
        Ok(())
    }
}

impl fmt::Display for Coin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.amount, self.asset)
    }
}

/// An ordered set of coins with at most one entry per asset.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct Coins(Vec<Coin>);

impl Coins {
    pub fn new(coins: Vec<Coin>) -> Self {
        let mut set = Self::default();
        for coin in coins {
            set.add(coin);
        }
        set
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Coin> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn first(&self) -> Option<&Coin> {
        self.0.first()
    }

    pub fn get(&self, asset: &Asset) -> Option<&Coin> {
        self.0.iter().find(|c| &c.asset == asset)
    }

    /// Balance of `asset`, zero if absent.
    pub fn amount_of(&self, asset: &Asset) -> Amount {
        self.get(asset).map(|c| c.amount).unwrap_or(0)
    }

    /// Exact match on asset and amount.
    pub fn contains(&self, coin: &Coin) -> bool {
        self.get(&coin.asset).is_some_and(|c| c.amount == coin.amount)
    }

    /// Merge `coin` into the set, summing amounts of the same asset.
    pub fn add(&mut self, coin: Coin) {
        match self.0.iter_mut().find(|c| c.asset == coin.asset) {
            Some(existing) => existing.amount = existing.amount.saturating_add(coin.amount),
            None => self.0.push(coin),
        }
    }

    /// Subtract `coin`, flooring at zero. Emptied entries stay with amount zero.
    pub fn sub(&mut self, coin: &Coin) {
        if let Some(existing) = self.0.iter_mut().find(|c| c.asset == coin.asset) {
            existing.amount = existing.amount.saturating_sub(coin.amount);
        }
    }

    /// True when any coin carries a non-zero amount.
    pub fn has_funds(&self) -> bool {
        self.0.iter().any(|c| c.amount > 0)
    }

    /// Every coin must be non-empty and assets must be unique.
    pub fn validate(&self) -> TypeResult<()> {
        if self.0.is_empty() {
            return Err(TypeError::InvalidCoins("no coins".into()));
        }
        for (i, coin) in self.0.iter().enumerate() {
            coin.validate()?;
            if self.0[..i].iter().any(|c| c.asset == coin.asset) {
                return Err(TypeError::InvalidCoins(format!("duplicate asset {}", coin.asset)));
            }
        }
        Ok(())
    }
}

impl From<Vec<Coin>> for Coins {
    fn from(coins: Vec<Coin>) -> Self {
        Self::new(coins)
    }
}

impl IntoIterator for Coins {
    type Item = Coin;
    type IntoIter = std::vec::IntoIter<Coin>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a Coins {
    type Item = &'a Coin;
    type IntoIter = std::slice::Iter<'a, Coin>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl fmt::Display for Coins {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(ToString::to_string).collect();
        f.write_str(&parts.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bnb(amount: Amount) -> Coin {
        Coin::new("BNB.BNB".parse().unwrap(), amount)
    }

    #[test]
    fn test_add_merges_same_asset() {
        let mut coins = Coins::new(vec![bnb(5), bnb(7)]);
        assert_eq!(coins.len(), 1);
        coins.add(Coin::new(Asset::rune(), 3));
        assert_eq!(coins.amount_of(&bnb(0).asset), 12);
        assert_eq!(coins.amount_of(&Asset::rune()), 3);
    }

    #[test]
    fn test_sub_floors_and_has_funds() {
        let mut coins = Coins::new(vec![bnb(5)]);
        coins.sub(&bnb(9));
        assert!(!coins.has_funds());
    }

    #[test]
    fn test_validate_rejects_zero() {
        let coins = Coins(vec![bnb(0)]);
        assert!(coins.validate().is_err());
        assert!(Coins::default().validate().is_err());
        assert!(Coins::new(vec![bnb(1)]).validate().is_ok());
    }
}
