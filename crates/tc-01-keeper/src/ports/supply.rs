//! Module-scoped sub-ledgers for native coins.

use std::fmt;

use shared_types::{Address, Amount, Asset, Coin, Coins};

use crate::domain::KeeperResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModuleName {
    Reserve,
    Asgard,
    Bond,
    Module,
}

impl ModuleName {
    pub fn as_str(self) -> &'static str {
        match self {
            ModuleName::Reserve => "reserve",
            ModuleName::Asgard => "asgard",
            ModuleName::Bond => "bond",
            ModuleName::Module => "thorchain",
        }
    }
}

impl fmt::Display for ModuleName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Bank/supply collaborator. Every transfer either moves the full amount or
/// fails with [`KeeperError::InsufficientFunds`](crate::domain::KeeperError).
pub trait Supply: Send + Sync {
    fn module_address(&self, module: ModuleName) -> Address;
    fn balance_of(&self, owner: &Address, asset: &Asset) -> KeeperResult<Amount>;

    fn mint(&self, module: ModuleName, coin: &Coin) -> KeeperResult<()>;
    fn burn(&self, module: ModuleName, coin: &Coin) -> KeeperResult<()>;
    fn send_module_to_module(&self, from: ModuleName, to: ModuleName, coins: &Coins) -> KeeperResult<()>;
    fn send_module_to_account(&self, from: ModuleName, to: &Address, coins: &Coins) -> KeeperResult<()>;
    fn send_account_to_module(&self, from: &Address, to: ModuleName, coins: &Coins) -> KeeperResult<()>;
    fn send_account_to_account(&self, from: &Address, to: &Address, coins: &Coins) -> KeeperResult<()>;

    fn module_balance(&self, module: ModuleName, asset: &Asset) -> KeeperResult<Amount> {
        self.balance_of(&self.module_address(module), asset)
    }

    fn has_coins(&self, owner: &Address, coins: &Coins) -> KeeperResult<bool> {
        for coin in coins.iter() {
            if self.balance_of(owner, &coin.asset)? < coin.amount {
                return Ok(false);
            }
        }
        Ok(true)
    }
}
