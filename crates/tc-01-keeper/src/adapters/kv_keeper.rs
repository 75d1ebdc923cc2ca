//! # KV-Backed Keeper
//!
//! Implements [`Keeper`] over any [`KvStore`], encoding entities with
//! bincode under the keys of [`crate::keys`].

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use shared_types::{Address, Amount, Asset, Chain, PubKey, PubKeySet, TxId};
use tracing::debug;

use crate::domain::{
    BanVoter, Event, IncompleteEvent, KeeperError, KeeperResult, KeygenBlock, NodeAccount,
    ObservedTxVoter, Pool, ReserveContributors, Staker, TssKeysignFailVoter, TssVoter, TxMarker,
    TxOut, Vault, VaultData,
};
use crate::keys::{height_id, Prefix};
use crate::ports::{Keeper, KvStore};

#[derive(Clone)]
pub struct KvKeeper {
    store: Arc<dyn KvStore>,
}

impl KvKeeper {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn KvStore> {
        &self.store
    }

    fn load<T: DeserializeOwned>(&self, key: &str) -> KeeperResult<Option<T>> {
        match self.store.get(key)? {
            Some(bytes) => bincode::deserialize(&bytes).map(Some).map_err(|e| KeeperError::Codec {
                key: key.to_string(),
                reason: e.to_string(),
            }),
            None => Ok(None),
        }
    }

    fn load_or_default<T: DeserializeOwned + Default>(&self, key: &str) -> KeeperResult<T> {
        Ok(self.load(key)?.unwrap_or_default())
    }

    fn save<T: Serialize>(&self, key: &str, value: &T) -> KeeperResult<()> {
        let bytes = bincode::serialize(value).map_err(|e| KeeperError::Codec {
            key: key.to_string(),
            reason: e.to_string(),
        })?;
        self.store.set(key, bytes)
    }

    fn scan<T: DeserializeOwned>(&self, prefix: Prefix) -> KeeperResult<Vec<T>> {
        self.store
            .scan_prefix(&prefix.scan())?
            .into_iter()
            .map(|(key, bytes)| {
                bincode::deserialize(&bytes).map_err(|e| KeeperError::Codec {
                    key,
                    reason: e.to_string(),
                })
            })
            .collect()
    }

    fn staker_id(asset: &Asset, rune_address: &Address) -> String {
        format!("{asset}/{rune_address}")
    }
}

impl Keeper for KvKeeper {
    fn get_node_account(&self, addr: &Address) -> KeeperResult<NodeAccount> {
        self.load_or_default(&Prefix::NodeAccount.key(addr))
    }

    fn set_node_account(&self, na: &NodeAccount) -> KeeperResult<()> {
        debug!(node = %na.node_address, status = %na.status, "[keeper] set node account");
        self.save(&Prefix::NodeAccount.key(&na.node_address), na)
    }

    fn list_node_accounts(&self) -> KeeperResult<Vec<NodeAccount>> {
        self.scan(Prefix::NodeAccount)
    }

    fn get_node_account_by_pub_key(&self, pk: &PubKey) -> KeeperResult<Option<NodeAccount>> {
        Ok(self
            .list_node_accounts()?
            .into_iter()
            .find(|na| na.pub_key_set.contains(pk)))
    }

    fn ensure_node_keys_unique(&self, owner: &Address, keys: &PubKeySet, cons_pub_key: &str) -> KeeperResult<()> {
        for na in self.list_node_accounts()? {
            if &na.node_address == owner {
                continue;
            }
            let clash = (!keys.secp256k1.is_empty() && na.pub_key_set.contains(&keys.secp256k1))
                || (!keys.ed25519.is_empty() && na.pub_key_set.contains(&keys.ed25519))
                || (!cons_pub_key.is_empty() && na.validator_cons_pub_key == cons_pub_key);
            if clash {
                return Err(KeeperError::DuplicateNodeKeys(na.node_address.to_string()));
            }
        }
        Ok(())
    }

    fn get_vault(&self, pk: &PubKey) -> KeeperResult<Vault> {
        self.load(&Prefix::Vault.key(pk))?.ok_or_else(|| KeeperError::NotFound {
            kind: "vault",
            key: pk.to_string(),
        })
    }

    fn vault_exists(&self, pk: &PubKey) -> KeeperResult<bool> {
        self.store.has(&Prefix::Vault.key(pk))
    }

    fn set_vault(&self, vault: &Vault) -> KeeperResult<()> {
        self.save(&Prefix::Vault.key(&vault.pub_key), vault)
    }

    fn delete_vault(&self, pk: &PubKey) -> KeeperResult<()> {
        debug!(vault = %pk, "[keeper] delete vault");
        self.store.delete(&Prefix::Vault.key(pk))
    }

    fn list_vaults(&self) -> KeeperResult<Vec<Vault>> {
        self.scan(Prefix::Vault)
    }

    fn get_pool(&self, asset: &Asset) -> KeeperResult<Pool> {
        self.load_or_default(&Prefix::Pool.key(asset))
    }

    fn set_pool(&self, pool: &Pool) -> KeeperResult<()> {
        self.save(&Prefix::Pool.key(&pool.asset), pool)
    }

    fn list_pools(&self) -> KeeperResult<Vec<Pool>> {
        self.scan(Prefix::Pool)
    }

    fn get_staker(&self, asset: &Asset, rune_address: &Address) -> KeeperResult<Staker> {
        let mut staker: Staker = self.load_or_default(&Prefix::PoolStaker.key(Self::staker_id(asset, rune_address)))?;
        if staker.asset.is_empty() {
            staker = Staker::new(asset.clone(), rune_address.clone());
        }
        Ok(staker)
    }

    fn set_staker(&self, staker: &Staker) -> KeeperResult<()> {
        self.save(
            &Prefix::PoolStaker.key(Self::staker_id(&staker.asset, &staker.rune_address)),
            staker,
        )
    }

    fn remove_staker(&self, asset: &Asset, rune_address: &Address) -> KeeperResult<()> {
        self.store.delete(&Prefix::PoolStaker.key(Self::staker_id(asset, rune_address)))
    }

    fn list_stakers(&self, asset: &Asset) -> KeeperResult<Vec<Staker>> {
        let prefix = format!("{}{}/", Prefix::PoolStaker.scan(), asset.to_string().to_uppercase());
        self.store
            .scan_prefix(&prefix)?
            .into_iter()
            .map(|(key, bytes)| bincode::deserialize(&bytes).map_err(|e| KeeperError::Codec { key, reason: e.to_string() }))
            .collect()
    }

    fn add_liquidity_fee(&self, height: u64, asset: &Asset, fee: Amount) -> KeeperResult<()> {
        let total_key = Prefix::TotalLiquidityFee.key(height_id(height));
        let total: Amount = self.load_or_default(&total_key)?;
        self.save(&total_key, &total.saturating_add(fee))?;
        let pool_key = Prefix::PoolLiquidityFee.key(format!("{}/{asset}", height_id(height)));
        let pool: Amount = self.load_or_default(&pool_key)?;
        self.save(&pool_key, &pool.saturating_add(fee))
    }

    fn get_total_liquidity_fees(&self, height: u64) -> KeeperResult<Amount> {
        self.load_or_default(&Prefix::TotalLiquidityFee.key(height_id(height)))
    }

    fn get_pool_liquidity_fees(&self, height: u64, asset: &Asset) -> KeeperResult<Amount> {
        self.load_or_default(&Prefix::PoolLiquidityFee.key(format!("{}/{asset}", height_id(height))))
    }

    fn get_observed_tx_voter(&self, id: &TxId) -> KeeperResult<ObservedTxVoter> {
        Ok(self
            .load(&Prefix::ObservedTxVoter.key(id))?
            .unwrap_or_else(|| ObservedTxVoter::new(id.clone())))
    }

    fn set_observed_tx_voter(&self, voter: &ObservedTxVoter) -> KeeperResult<()> {
        self.save(&Prefix::ObservedTxVoter.key(&voter.tx_id), voter)
    }

    fn get_observed_tx_out_voter(&self, id: &TxId) -> KeeperResult<ObservedTxVoter> {
        Ok(self
            .load(&Prefix::ObservedTxOutVoter.key(id))?
            .unwrap_or_else(|| ObservedTxVoter::new(id.clone())))
    }

    fn set_observed_tx_out_voter(&self, voter: &ObservedTxVoter) -> KeeperResult<()> {
        self.save(&Prefix::ObservedTxOutVoter.key(&voter.tx_id), voter)
    }

    fn get_ban_voter(&self, addr: &Address) -> KeeperResult<BanVoter> {
        Ok(self
            .load(&Prefix::BanVoter.key(addr))?
            .unwrap_or_else(|| BanVoter::new(addr.clone())))
    }

    fn set_ban_voter(&self, voter: &BanVoter) -> KeeperResult<()> {
        self.save(&Prefix::BanVoter.key(&voter.node_address), voter)
    }

    fn get_tss_voter(&self, id: &str) -> KeeperResult<TssVoter> {
        self.load_or_default(&Prefix::TssVoter.key(id))
    }

    fn set_tss_voter(&self, voter: &TssVoter) -> KeeperResult<()> {
        self.save(&Prefix::TssVoter.key(&voter.id), voter)
    }

    fn get_keysign_fail_voter(&self, id: &str) -> KeeperResult<TssKeysignFailVoter> {
        Ok(self
            .load(&Prefix::KeysignFailVoter.key(id))?
            .unwrap_or_else(|| TssKeysignFailVoter::new(id.to_string())))
    }

    fn set_keysign_fail_voter(&self, voter: &TssKeysignFailVoter) -> KeeperResult<()> {
        self.save(&Prefix::KeysignFailVoter.key(&voter.id), voter)
    }

    fn get_tx_out(&self, height: u64) -> KeeperResult<TxOut> {
        Ok(self
            .load(&Prefix::TxOut.key(height_id(height)))?
            .unwrap_or_else(|| TxOut::new(height)))
    }

    fn set_tx_out(&self, tx_out: &TxOut) -> KeeperResult<()> {
        self.save(&Prefix::TxOut.key(height_id(tx_out.height)), tx_out)
    }

    fn list_tx_markers(&self, hash: &str) -> KeeperResult<Vec<TxMarker>> {
        self.load_or_default(&Prefix::TxMarker.key(hash))
    }

    fn set_tx_markers(&self, hash: &str, markers: &[TxMarker]) -> KeeperResult<()> {
        let key = Prefix::TxMarker.key(hash);
        if markers.is_empty() {
            return self.store.delete(&key);
        }
        self.save(&key, &markers)
    }

    fn get_last_event_id(&self) -> KeeperResult<u64> {
        self.load_or_default(&Prefix::LastEventId.singleton())
    }

    fn set_last_event_id(&self, id: u64) -> KeeperResult<()> {
        self.save(&Prefix::LastEventId.singleton(), &id)
    }

    fn get_block_events(&self, height: u64) -> KeeperResult<Vec<Event>> {
        self.load_or_default(&Prefix::BlockEvents.key(height_id(height)))
    }

    fn set_block_events(&self, height: u64, events: &[Event]) -> KeeperResult<()> {
        self.save(&Prefix::BlockEvents.key(height_id(height)), &events)
    }

    fn get_incomplete_events(&self) -> KeeperResult<Vec<IncompleteEvent>> {
        self.load_or_default(&Prefix::IncompleteEvents.singleton())
    }

    fn set_incomplete_events(&self, entries: &[IncompleteEvent]) -> KeeperResult<()> {
        self.save(&Prefix::IncompleteEvents.singleton(), &entries)
    }

    fn get_vault_data(&self) -> KeeperResult<VaultData> {
        self.load_or_default(&Prefix::VaultData.singleton())
    }

    fn set_vault_data(&self, data: &VaultData) -> KeeperResult<()> {
        self.save(&Prefix::VaultData.singleton(), data)
    }

    fn get_reserve_contributors(&self) -> KeeperResult<ReserveContributors> {
        self.load_or_default(&Prefix::Reserves.singleton())
    }

    fn set_reserve_contributors(&self, list: &ReserveContributors) -> KeeperResult<()> {
        self.save(&Prefix::Reserves.singleton(), list)
    }

    fn get_keygen_block(&self, height: u64) -> KeeperResult<KeygenBlock> {
        Ok(self
            .load(&Prefix::Keygen.key(height_id(height)))?
            .unwrap_or_else(|| KeygenBlock::new(height)))
    }

    fn set_keygen_block(&self, block: &KeygenBlock) -> KeeperResult<()> {
        self.save(&Prefix::Keygen.key(height_id(block.height)), block)
    }

    fn get_mimir(&self, key: &str) -> KeeperResult<Option<i64>> {
        self.load(&Prefix::Mimir.key(key))
    }

    fn set_mimir(&self, key: &str, value: i64) -> KeeperResult<()> {
        self.save(&Prefix::Mimir.key(key), &value)
    }

    fn list_mimirs(&self) -> KeeperResult<Vec<(String, i64)>> {
        let scan = Prefix::Mimir.scan();
        self.store
            .scan_prefix(&scan)?
            .into_iter()
            .map(|(key, bytes)| {
                let value: i64 = bincode::deserialize(&bytes).map_err(|e| KeeperError::Codec {
                    key: key.clone(),
                    reason: e.to_string(),
                })?;
                Ok((key.trim_start_matches(scan.as_str()).to_string(), value))
            })
            .collect()
    }

    fn get_admins(&self) -> KeeperResult<Vec<Address>> {
        self.load_or_default(&Prefix::Admin.singleton())
    }

    fn set_admins(&self, admins: &[Address]) -> KeeperResult<()> {
        self.save(&Prefix::Admin.singleton(), &admins)
    }

    fn ragnarok_height(&self) -> KeeperResult<u64> {
        self.load_or_default(&Prefix::Ragnarok.singleton())
    }

    fn set_ragnarok_height(&self, height: u64) -> KeeperResult<()> {
        let current = self.ragnarok_height()?;
        if current > 0 {
            return Err(KeeperError::RagnarokAlreadyStarted(current));
        }
        self.save(&Prefix::Ragnarok.singleton(), &height)
    }

    fn get_active_observers(&self) -> KeeperResult<Vec<Address>> {
        self.load_or_default(&Prefix::ActiveObserver.singleton())
    }

    fn set_active_observers(&self, observers: &[Address]) -> KeeperResult<()> {
        self.save(&Prefix::ActiveObserver.singleton(), &observers)
    }

    fn get_chains(&self) -> KeeperResult<Vec<Chain>> {
        self.load_or_default(&Prefix::SupportedChains.singleton())
    }

    fn set_chains(&self, chains: &[Chain]) -> KeeperResult<()> {
        self.save(&Prefix::SupportedChains.singleton(), &chains)
    }

    fn get_last_chain_height(&self, chain: &Chain) -> KeeperResult<u64> {
        self.load_or_default(&Prefix::LastChainHeight.key(chain))
    }

    fn set_last_chain_height(&self, chain: &Chain, height: u64) -> KeeperResult<()> {
        self.save(&Prefix::LastChainHeight.key(chain), &height)
    }
}
