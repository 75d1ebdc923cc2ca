//! Supply ledger kept in the same store as the keeper, so it shares the
//! keeper's transactional view.

use std::sync::Arc;

use sha2::{Digest, Sha256};
use shared_types::{Address, Amount, Asset, Coin, Coins};
use tracing::debug;

use crate::domain::{KeeperError, KeeperResult};
use crate::keys::Prefix;
use crate::ports::{KvStore, ModuleName, Supply};

#[derive(Clone)]
pub struct StoreSupply {
    store: Arc<dyn KvStore>,
}

impl StoreSupply {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self { store }
    }

    fn key(owner: &Address, asset: &Asset) -> String {
        Prefix::Balance.key(format!("{owner}/{asset}"))
    }

    fn read(&self, owner: &Address, asset: &Asset) -> KeeperResult<Amount> {
        let key = Self::key(owner, asset);
        match self.store.get(&key)? {
            Some(bytes) => bincode::deserialize(&bytes).map_err(|e| KeeperError::Codec {
                key,
                reason: e.to_string(),
            }),
            None => Ok(0),
        }
    }

    fn write(&self, owner: &Address, asset: &Asset, amount: Amount) -> KeeperResult<()> {
        let key = Self::key(owner, asset);
        if amount == 0 {
            return self.store.delete(&key);
        }
        let bytes = bincode::serialize(&amount).map_err(|e| KeeperError::Codec {
            key: key.clone(),
            reason: e.to_string(),
        })?;
        self.store.set(&key, bytes)
    }

    fn credit(&self, owner: &Address, coin: &Coin) -> KeeperResult<()> {
        let balance = self.read(owner, &coin.asset)?;
        self.write(owner, &coin.asset, balance.saturating_add(coin.amount))
    }

    fn debit(&self, owner: &Address, coin: &Coin) -> KeeperResult<()> {
        let balance = self.read(owner, &coin.asset)?;
        if balance < coin.amount {
            return Err(KeeperError::InsufficientFunds {
                account: owner.to_string(),
                needed: coin.amount,
                available: balance,
            });
        }
        self.write(owner, &coin.asset, balance - coin.amount)
    }

    fn transfer(&self, from: &Address, to: &Address, coins: &Coins) -> KeeperResult<()> {
        // check every coin first so a multi-coin send is all or nothing
        for coin in coins.iter() {
            let available = self.read(from, &coin.asset)?;
            if available < coin.amount {
                return Err(KeeperError::InsufficientFunds {
                    account: from.to_string(),
                    needed: coin.amount,
                    available,
                });
            }
        }
        for coin in coins.iter() {
            self.debit(from, coin)?;
            self.credit(to, coin)?;
        }
        debug!(from = %from, to = %to, coins = %coins, "[supply] transfer");
        Ok(())
    }
}

impl Supply for StoreSupply {
    fn module_address(&self, module: ModuleName) -> Address {
        let digest = Sha256::digest(module.as_str().as_bytes());
        Address::new(format!("thor1{}", &hex::encode(digest)[..38]))
    }

    fn balance_of(&self, owner: &Address, asset: &Asset) -> KeeperResult<Amount> {
        self.read(owner, asset)
    }

    fn mint(&self, module: ModuleName, coin: &Coin) -> KeeperResult<()> {
        self.credit(&self.module_address(module), coin)
    }

    fn burn(&self, module: ModuleName, coin: &Coin) -> KeeperResult<()> {
        self.debit(&self.module_address(module), coin)
    }

    fn send_module_to_module(&self, from: ModuleName, to: ModuleName, coins: &Coins) -> KeeperResult<()> {
        self.transfer(&self.module_address(from), &self.module_address(to), coins)
    }

    fn send_module_to_account(&self, from: ModuleName, to: &Address, coins: &Coins) -> KeeperResult<()> {
        self.transfer(&self.module_address(from), to, coins)
    }

    fn send_account_to_module(&self, from: &Address, to: ModuleName, coins: &Coins) -> KeeperResult<()> {
        self.transfer(from, &self.module_address(to), coins)
    }

    fn send_account_to_account(&self, from: &Address, to: &Address, coins: &Coins) -> KeeperResult<()> {
        self.transfer(from, to, coins)
    }
}
