//! Typed accessors over the store.
//!
//! Getters of keyed entities return an empty default when nothing is stored
//! (`is_empty()` tells the caller), except vaults, whose absence is an error
//! the handlers care about.

use shared_types::{Address, Amount, Asset, Chain, PubKey, PubKeySet, ProtocolVersion, TxId};

use crate::domain::{
    BanVoter, Event, IncompleteEvent, KeeperResult, KeygenBlock, NodeAccount, NodeStatus,
    ObservedTxVoter, Pool, ReserveContributors, Staker, TssKeysignFailVoter, TssVoter, TxMarker,
    TxOut, TxOutItem, Vault, VaultData, VaultStatus, VaultType,
};

/// Version assumed when no operator has declared one.
pub const DEFAULT_PROTOCOL_VERSION: ProtocolVersion = ProtocolVersion::new(0, 1, 0);

pub trait Keeper: Send + Sync {
    // Operators
    fn get_node_account(&self, addr: &Address) -> KeeperResult<NodeAccount>;
    fn set_node_account(&self, na: &NodeAccount) -> KeeperResult<()>;
    fn list_node_accounts(&self) -> KeeperResult<Vec<NodeAccount>>;
    fn get_node_account_by_pub_key(&self, pk: &PubKey) -> KeeperResult<Option<NodeAccount>>;
    /// Rejects keys already registered by a different operator.
    fn ensure_node_keys_unique(&self, owner: &Address, keys: &PubKeySet, cons_pub_key: &str) -> KeeperResult<()>;

    // Vaults
    fn get_vault(&self, pk: &PubKey) -> KeeperResult<Vault>;
    fn vault_exists(&self, pk: &PubKey) -> KeeperResult<bool>;
    fn set_vault(&self, vault: &Vault) -> KeeperResult<()>;
    fn delete_vault(&self, pk: &PubKey) -> KeeperResult<()>;
    fn list_vaults(&self) -> KeeperResult<Vec<Vault>>;

    // Pools and stakers
    fn get_pool(&self, asset: &Asset) -> KeeperResult<Pool>;
    fn set_pool(&self, pool: &Pool) -> KeeperResult<()>;
    fn list_pools(&self) -> KeeperResult<Vec<Pool>>;
    fn get_staker(&self, asset: &Asset, rune_address: &Address) -> KeeperResult<Staker>;
    fn set_staker(&self, staker: &Staker) -> KeeperResult<()>;
    fn remove_staker(&self, asset: &Asset, rune_address: &Address) -> KeeperResult<()>;
    fn list_stakers(&self, asset: &Asset) -> KeeperResult<Vec<Staker>>;
    fn add_liquidity_fee(&self, height: u64, asset: &Asset, fee: Amount) -> KeeperResult<()>;
    fn get_total_liquidity_fees(&self, height: u64) -> KeeperResult<Amount>;
    fn get_pool_liquidity_fees(&self, height: u64, asset: &Asset) -> KeeperResult<Amount>;

    // Voters
    fn get_observed_tx_voter(&self, id: &TxId) -> KeeperResult<ObservedTxVoter>;
    fn set_observed_tx_voter(&self, voter: &ObservedTxVoter) -> KeeperResult<()>;
    /// Voter for the sending leg of a tx. Kept apart from the inbound voter
    /// so an internal transfer can be observed leaving one vault and
    /// arriving at another.
    fn get_observed_tx_out_voter(&self, id: &TxId) -> KeeperResult<ObservedTxVoter>;
    fn set_observed_tx_out_voter(&self, voter: &ObservedTxVoter) -> KeeperResult<()>;
    fn get_ban_voter(&self, addr: &Address) -> KeeperResult<BanVoter>;
    fn set_ban_voter(&self, voter: &BanVoter) -> KeeperResult<()>;
    fn get_tss_voter(&self, id: &str) -> KeeperResult<TssVoter>;
    fn set_tss_voter(&self, voter: &TssVoter) -> KeeperResult<()>;
    fn get_keysign_fail_voter(&self, id: &str) -> KeeperResult<TssKeysignFailVoter>;
    fn set_keysign_fail_voter(&self, voter: &TssKeysignFailVoter) -> KeeperResult<()>;

    // Outbound queue
    fn get_tx_out(&self, height: u64) -> KeeperResult<TxOut>;
    fn set_tx_out(&self, tx_out: &TxOut) -> KeeperResult<()>;
    fn list_tx_markers(&self, hash: &str) -> KeeperResult<Vec<TxMarker>>;
    fn set_tx_markers(&self, hash: &str, markers: &[TxMarker]) -> KeeperResult<()>;

    // Events
    fn get_last_event_id(&self) -> KeeperResult<u64>;
    fn set_last_event_id(&self, id: u64) -> KeeperResult<()>;
    fn get_block_events(&self, height: u64) -> KeeperResult<Vec<Event>>;
    fn set_block_events(&self, height: u64, events: &[Event]) -> KeeperResult<()>;
    /// Inbounds whose events are still waiting on outbounds.
    fn get_incomplete_events(&self) -> KeeperResult<Vec<IncompleteEvent>>;
    fn set_incomplete_events(&self, entries: &[IncompleteEvent]) -> KeeperResult<()>;

    // Network accounting
    fn get_vault_data(&self) -> KeeperResult<VaultData>;
    fn set_vault_data(&self, data: &VaultData) -> KeeperResult<()>;
    fn get_reserve_contributors(&self) -> KeeperResult<ReserveContributors>;
    fn set_reserve_contributors(&self, list: &ReserveContributors) -> KeeperResult<()>;
    fn get_keygen_block(&self, height: u64) -> KeeperResult<KeygenBlock>;
    fn set_keygen_block(&self, block: &KeygenBlock) -> KeeperResult<()>;

    // Admin and runtime overrides
    fn get_mimir(&self, key: &str) -> KeeperResult<Option<i64>>;
    fn set_mimir(&self, key: &str, value: i64) -> KeeperResult<()>;
    fn list_mimirs(&self) -> KeeperResult<Vec<(String, i64)>>;
    fn get_admins(&self) -> KeeperResult<Vec<Address>>;
    fn set_admins(&self, admins: &[Address]) -> KeeperResult<()>;

    // Ragnarok
    fn ragnarok_height(&self) -> KeeperResult<u64>;
    /// Write-once; a second call fails with `RagnarokAlreadyStarted`.
    fn set_ragnarok_height(&self, height: u64) -> KeeperResult<()>;

    // Observation bookkeeping
    fn get_active_observers(&self) -> KeeperResult<Vec<Address>>;
    fn set_active_observers(&self, observers: &[Address]) -> KeeperResult<()>;
    fn get_chains(&self) -> KeeperResult<Vec<Chain>>;
    fn set_chains(&self, chains: &[Chain]) -> KeeperResult<()>;
    fn get_last_chain_height(&self, chain: &Chain) -> KeeperResult<u64>;
    fn set_last_chain_height(&self, chain: &Chain, height: u64) -> KeeperResult<()>;

    // Derived queries

    fn list_active_node_accounts(&self) -> KeeperResult<Vec<NodeAccount>> {
        Ok(self
            .list_node_accounts()?
            .into_iter()
            .filter(|na| na.status == NodeStatus::Active)
            .collect())
    }

    fn list_node_accounts_by_status(&self, status: NodeStatus) -> KeeperResult<Vec<NodeAccount>> {
        Ok(self
            .list_node_accounts()?
            .into_iter()
            .filter(|na| na.status == status)
            .collect())
    }

    fn is_active_observer(&self, addr: &Address) -> KeeperResult<bool> {
        Ok(self.get_node_account(addr)?.is_active())
    }

    /// Lowest version declared by an active operator.
    fn get_lowest_active_version(&self) -> KeeperResult<ProtocolVersion> {
        Ok(self
            .list_active_node_accounts()?
            .iter()
            .map(|na| na.version)
            .min()
            .unwrap_or(DEFAULT_PROTOCOL_VERSION))
    }

    /// Version run by the largest number of active operators, higher on ties.
    fn get_min_join_version(&self) -> KeeperResult<ProtocolVersion> {
        let mut counts: Vec<(ProtocolVersion, usize)> = Vec::new();
        for na in self.list_active_node_accounts()? {
            match counts.iter_mut().find(|(v, _)| *v == na.version) {
                Some((_, n)) => *n += 1,
                None => counts.push((na.version, 1)),
            }
        }
        Ok(counts
            .into_iter()
            .max_by(|a, b| a.1.cmp(&b.1).then(a.0.cmp(&b.0)))
            .map(|(v, _)| v)
            .unwrap_or(DEFAULT_PROTOCOL_VERSION))
    }

    fn list_vaults_by(&self, kind: VaultType, status: VaultStatus) -> KeeperResult<Vec<Vault>> {
        Ok(self
            .list_vaults()?
            .into_iter()
            .filter(|v| v.vault_type == kind && v.status == status)
            .collect())
    }

    fn list_active_asgards(&self) -> KeeperResult<Vec<Vault>> {
        self.list_vaults_by(VaultType::Asgard, VaultStatus::Active)
    }

    fn list_retiring_asgards(&self) -> KeeperResult<Vec<Vault>> {
        self.list_vaults_by(VaultType::Asgard, VaultStatus::Retiring)
    }

    /// Yggdrasil vault of an operator, keyed by its secp256k1 key.
    fn get_yggdrasil(&self, na: &NodeAccount) -> KeeperResult<Option<Vault>> {
        let pk = &na.pub_key_set.secp256k1;
        if pk.is_empty() || !self.vault_exists(pk)? {
            return Ok(None);
        }
        let vault = self.get_vault(pk)?;
        Ok(vault.is_yggdrasil().then_some(vault))
    }

    fn pool_exists(&self, asset: &Asset) -> KeeperResult<bool> {
        Ok(!self.get_pool(asset)?.is_empty())
    }

    fn ragnarok_in_progress(&self) -> KeeperResult<bool> {
        Ok(self.ragnarok_height()? > 0)
    }

    fn is_admin(&self, addr: &Address) -> KeeperResult<bool> {
        Ok(self.get_admins()?.contains(addr))
    }

    /// Append a queued item to the outbound list at `height`.
    fn append_tx_out(&self, height: u64, item: TxOutItem) -> KeeperResult<()> {
        let mut tx_out = self.get_tx_out(height)?;
        tx_out.height = height;
        tx_out.tx_array.push(item);
        self.set_tx_out(&tx_out)
    }

    fn append_tx_marker(&self, hash: &str, marker: TxMarker) -> KeeperResult<()> {
        let mut markers = self.list_tx_markers(hash)?;
        markers.push(marker);
        self.set_tx_markers(hash, &markers)
    }

    /// Remove and return the oldest marker registered under `hash`.
    fn pop_tx_marker(&self, hash: &str) -> KeeperResult<Option<TxMarker>> {
        let mut markers = self.list_tx_markers(hash)?;
        if markers.is_empty() {
            return Ok(None);
        }
        let marker = markers.remove(0);
        self.set_tx_markers(hash, &markers)?;
        Ok(Some(marker))
    }
}
