//! # Vaults
//!
//! Custodial accounts controlled by a threshold key. Asgard vaults are
//! shared by the active set; yggdrasil vaults belong to a single operator.
//!
//! Status table: `Active → Retiring → Inactive`, and `Active → Inactive`
//! for yggdrasil vaults whose operator left.

use std::fmt;

use serde::{Deserialize, Serialize};
use shared_types::{Address, Amount, Asset, Chain, Coin, Coins, PubKey};

use super::errors::{KeeperError, KeeperResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum VaultType {
    #[default]
    Asgard,
    Yggdrasil,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum VaultStatus {
    #[default]
    Active,
    Retiring,
    Inactive,
}

impl VaultStatus {
    pub fn can_transition_to(self, next: VaultStatus, kind: VaultType) -> bool {
        use VaultStatus::*;
        match (self, next) {
            (a, b) if a == b => true,
            (Active, Retiring) => kind == VaultType::Asgard,
            (Active, Inactive) => kind == VaultType::Yggdrasil,
            (Retiring, Inactive) => true,
            _ => false,
        }
    }
}

impl fmt::Display for VaultStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            VaultStatus::Active => "active",
            VaultStatus::Retiring => "retiring",
            VaultStatus::Inactive => "inactive",
        };
        f.write_str(s)
    }
}

/// A custodial vault.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Vault {
    /// Height the vault was created.
    pub block_height: u64,
    pub pub_key: PubKey,
    pub coins: Coins,
    pub vault_type: VaultType,
    pub status: VaultStatus,
    pub status_since: u64,
    /// Secp256k1 keys of the operators holding a key share.
    pub membership: Vec<PubKey>,
    pub chains: Vec<Chain>,
}

impl Vault {
    pub fn new(height: u64, status: VaultStatus, vault_type: VaultType, pub_key: PubKey) -> Self {
        Self {
            block_height: height,
            pub_key,
            vault_type,
            status,
            status_since: height,
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.pub_key.is_empty()
    }

    pub fn is_asgard(&self) -> bool {
        self.vault_type == VaultType::Asgard
    }

    pub fn is_yggdrasil(&self) -> bool {
        self.vault_type == VaultType::Yggdrasil
    }

    pub fn has_funds(&self) -> bool {
        self.coins.has_funds()
    }

    pub fn amount_of(&self, asset: &Asset) -> Amount {
        self.coins.amount_of(asset)
    }

    pub fn add_funds(&mut self, coins: &Coins) {
        for coin in coins {
            self.coins.add(coin.clone());
            self.add_chain(coin.asset.chain.clone());
        }
    }

    /// Remove coins, flooring each balance at zero.
    pub fn sub_funds(&mut self, coins: &Coins) {
        for coin in coins {
            self.coins.sub(coin);
        }
    }

    pub fn sub_coin(&mut self, coin: &Coin) {
        self.coins.sub(coin);
    }

    pub fn add_chain(&mut self, chain: Chain) {
        if !self.chains.contains(&chain) {
            self.chains.push(chain);
        }
    }

    /// Whether `key` is one of the members.
    pub fn contains(&self, key: &PubKey) -> bool {
        self.membership.contains(key)
    }

    pub fn address(&self, chain: &Chain) -> Address {
        self.pub_key.address(chain)
    }

    pub fn update_status(&mut self, status: VaultStatus, height: u64) -> KeeperResult<()> {
        if !self.status.can_transition_to(status, self.vault_type) {
            return Err(KeeperError::InvalidStatusTransition {
                entity: "vault",
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
}

/// Helpers over a list of vaults.
pub trait VaultsExt {
    /// True when any vault owns `address` on `chain`.
    fn has_address(&self, chain: &Chain, address: &Address) -> bool;
    /// Vault holding the most of `asset`.
    fn most_of(&self, asset: &Asset) -> Option<&Vault>;
    /// Vault holding the least of `asset`.
    fn least_of(&self, asset: &Asset) -> Option<&Vault>;
}

impl VaultsExt for [Vault] {
    fn has_address(&self, chain: &Chain, address: &Address) -> bool {
        self.iter().any(|v| v.address(chain) == *address)
    }

    fn most_of(&self, asset: &Asset) -> Option<&Vault> {
        // ties resolve to the first vault in iteration order
        self.iter().fold(None, |best: Option<&Vault>, v| match best {
            Some(b) if b.amount_of(asset) >= v.amount_of(asset) => Some(b),
            _ => Some(v),
        })
    }

    fn least_of(&self, asset: &Asset) -> Option<&Vault> {
        self.iter().fold(None, |best: Option<&Vault>, v| match best {
            Some(b) if b.amount_of(asset) <= v.amount_of(asset) => Some(b),
            _ => Some(v),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vault(pk: &str, rune: Amount) -> Vault {
        let mut v = Vault::new(1, VaultStatus::Active, VaultType::Asgard, PubKey::new(pk));
        v.add_funds(&Coins::new(vec![Coin::new(Asset::rune(), rune)]));
        v
    }

    #[test]
    fn test_asgard_lifecycle() {
        let mut v = vault("a", 0);
        assert!(v.update_status(VaultStatus::Inactive, 2).is_err());
        v.update_status(VaultStatus::Retiring, 2).unwrap();
        v.update_status(VaultStatus::Inactive, 3).unwrap();
        assert_eq!(v.status_since, 3);
    }

    #[test]
    fn test_yggdrasil_goes_straight_to_inactive() {
        let mut v = Vault::new(1, VaultStatus::Active, VaultType::Yggdrasil, PubKey::new("y"));
        assert!(v.update_status(VaultStatus::Retiring, 2).is_err());
        assert!(v.update_status(VaultStatus::Inactive, 2).is_ok());
    }

    #[test]
    fn test_funds_accounting() {
        let mut v = vault("a", 10);
        assert!(v.has_funds());
        v.sub_funds(&Coins::new(vec![Coin::new(Asset::rune(), 10)]));
        assert!(!v.has_funds());
        assert!(v.chains.contains(&Chain::bnb()));
    }

    #[test]
    fn test_most_and_least_of() {
        let vaults = vec![vault("a", 5), vault("b", 9), vault("c", 1)];
        let rune = Asset::rune();
        assert_eq!(vaults.most_of(&rune).unwrap().pub_key, PubKey::new("b"));
        assert_eq!(vaults.least_of(&rune).unwrap().pub_key, PubKey::new("c"));
        let addr = vaults[0].address(&Chain::bnb());
        assert!(vaults.has_address(&Chain::bnb(), &addr));
    }
}
