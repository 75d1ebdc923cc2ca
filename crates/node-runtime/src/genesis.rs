//! # Genesis State
//!
//! JSON snapshot of the keeper used to start a network or to hand state to
//! a new binary. Import writes into an empty store; export reads the
//! persisted entities back out.
//!
//! Account balances live in the supply ledger. They can be seeded through
//! `balances` on import but are not part of an export.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::Context as _;
use serde::{Deserialize, Serialize};
use shared_types::{Address, Chain, Coins, ProtocolVersion};
use tc_01_keeper::{
    Keeper, ModuleName, NodeAccount, Pool, ReserveContributors, Staker, Supply, Vault, VaultData,
};
use tracing::info;

use crate::config::ChainConfig;
use crate::errors::{RuntimeError, RuntimeResult};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenesisBalance {
    pub address: Address,
    pub coins: Coins,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenesisState {
    pub node_accounts: Vec<NodeAccount>,
    pub vaults: Vec<Vault>,
    pub pools: Vec<Pool>,
    pub stakers: Vec<Staker>,
    pub vault_data: VaultData,
    pub reserve_contributors: ReserveContributors,
    pub admins: Vec<Address>,
    pub mimir: BTreeMap<String, i64>,
    pub chains: Vec<Chain>,
    pub last_event_id: u64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub balances: Vec<GenesisBalance>,
}

impl GenesisState {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading genesis file {}", path.display()))?;
        serde_json::from_str(&raw).with_context(|| format!("parsing genesis file {}", path.display()))
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let raw = serde_json::to_string_pretty(self).context("encoding genesis state")?;
        std::fs::write(path, raw).with_context(|| format!("writing genesis file {}", path.display()))
    }

    /// Apply the chain configuration: admins and constant overrides are
    /// merged in, and every operator must meet the minimum join version.
    pub fn apply_chain_config(&mut self, chain: &ChainConfig) -> RuntimeResult<()> {
        for admin in &chain.admins {
            if !self.admins.contains(admin) {
                self.admins.push(admin.clone());
            }
        }
        for (name, value) in &chain.constant_overrides {
            self.mimir.insert(name.clone(), *value);
        }
        self.check_versions(chain.min_join_version)
    }

    fn check_versions(&self, min: ProtocolVersion) -> RuntimeResult<()> {
        match self.node_accounts.iter().find(|na| na.version < min) {
            Some(na) => Err(RuntimeError::VersionTooLow {
                operator: na.node_address.to_string(),
                version: na.version,
                min,
            }),
            None => Ok(()),
        }
    }

    /// Write the state into an empty store.
    pub fn import(&self, keeper: &dyn Keeper, supply: &dyn Supply) -> RuntimeResult<()> {
        if !keeper.list_node_accounts()?.is_empty() || !keeper.list_vaults()?.is_empty() {
            return Err(RuntimeError::Genesis("store already holds state".into()));
        }
        if self.node_accounts.is_empty() {
            return Err(RuntimeError::Genesis("no node accounts".into()));
        }

        for na in &self.node_accounts {
            keeper.set_node_account(na)?;
        }
        for vault in &self.vaults {
            keeper.set_vault(vault)?;
        }
        for pool in &self.pools {
            keeper.set_pool(pool)?;
        }
        for staker in &self.stakers {
            keeper.set_staker(staker)?;
        }
        keeper.set_vault_data(&self.vault_data)?;
        keeper.set_reserve_contributors(&self.reserve_contributors)?;
        keeper.set_admins(&self.admins)?;
        for (key, value) in &self.mimir {
            keeper.set_mimir(key, *value)?;
        }
        keeper.set_chains(&self.chains)?;
        keeper.set_last_event_id(self.last_event_id)?;

        for balance in &self.balances {
            for coin in balance.coins.iter() {
                supply.mint(ModuleName::Module, coin)?;
            }
            supply.send_module_to_account(ModuleName::Module, &balance.address, &balance.coins)?;
        }

        info!(
            nodes = self.node_accounts.len(),
            vaults = self.vaults.len(),
            pools = self.pools.len(),
            "[runtime] genesis imported"
        );
        Ok(())
    }

    /// Read the persisted entities back out of the keeper.
    pub fn export(keeper: &dyn Keeper) -> RuntimeResult<Self> {
        let pools = keeper.list_pools()?;
        let mut stakers = Vec::new();
        for pool in &pools {
            stakers.extend(keeper.list_stakers(&pool.asset)?);
        }
        Ok(Self {
            node_accounts: keeper.list_node_accounts()?,
            vaults: keeper.list_vaults()?,
            pools,
            stakers,
            vault_data: keeper.get_vault_data()?,
            reserve_contributors: keeper.get_reserve_contributors()?,
            admins: keeper.get_admins()?,
            mimir: keeper.list_mimirs()?.into_iter().collect(),
            chains: keeper.get_chains()?,
            last_event_id: keeper.get_last_event_id()?,
            balances: Vec::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use shared_types::{Asset, Coin, PubKey, PubKeySet};
    use tc_01_keeper::{KvKeeper, MemoryKvStore, NodeStatus, PoolStatus, StoreSupply, VaultStatus, VaultType};

    use super::*;

    fn state() -> GenesisState {
        let mut na = NodeAccount::new(
            Address::new("thor1"),
            NodeStatus::Active,
            PubKeySet::new(PubKey::new("pk1"), PubKey::new("ed1")),
            "cons1".to_string(),
            100_000_000,
            Address::new("bnb1bond"),
            1,
        );
        na.version = ProtocolVersion::new(0, 1, 0);
        let mut pool = Pool::new("BNB.BNB".parse().unwrap());
        pool.status = PoolStatus::Enabled;
        pool.balance_rune = 1_000;
        pool.balance_asset = 2_000;
        GenesisState {
            node_accounts: vec![na],
            vaults: vec![Vault::new(1, VaultStatus::Active, VaultType::Asgard, PubKey::new("asgardpk"))],
            pools: vec![pool],
            admins: vec![Address::new("thor1admin")],
            chains: vec![Chain::bnb()],
            last_event_id: 7,
            ..Default::default()
        }
    }

    fn store() -> (KvKeeper, StoreSupply) {
        let store = Arc::new(MemoryKvStore::new());
        (KvKeeper::new(store.clone()), StoreSupply::new(store))
    }

    #[test]
    fn test_import_then_export_preserves_state() {
        let (keeper, supply) = store();
        let genesis = state();
        genesis.import(&keeper, &supply).unwrap();
        assert_eq!(GenesisState::export(&keeper).unwrap(), genesis);
    }

    #[test]
    fn test_import_requires_empty_store() {
        let (keeper, supply) = store();
        state().import(&keeper, &supply).unwrap();
        assert!(matches!(state().import(&keeper, &supply), Err(RuntimeError::Genesis(_))));
    }

    #[test]
    fn test_balances_are_seeded() {
        let (keeper, supply) = store();
        let mut genesis = state();
        genesis.balances.push(GenesisBalance {
            address: Address::new("thor1user"),
            coins: Coins::new(vec![Coin::new(Asset::rune_native(), 500)]),
        });
        genesis.import(&keeper, &supply).unwrap();
        assert_eq!(supply.balance_of(&Address::new("thor1user"), &Asset::rune_native()).unwrap(), 500);
        assert_eq!(supply.module_balance(ModuleName::Module, &Asset::rune_native()).unwrap(), 0);
    }

    #[test]
    fn test_chain_config_merges_and_checks_versions() {
        let mut chain = ChainConfig::default();
        chain.admins.push(Address::new("thor1ops"));
        chain.constant_overrides.insert("RotatePerBlockHeight".into(), 20);
        let mut genesis = state();
        genesis.apply_chain_config(&chain).unwrap();
        assert_eq!(genesis.admins.len(), 2);
        assert_eq!(genesis.mimir.get("RotatePerBlockHeight"), Some(&20));

        chain.min_join_version = ProtocolVersion::new(9, 0, 0);
        assert!(matches!(
            genesis.apply_chain_config(&chain),
            Err(RuntimeError::VersionTooLow { .. })
        ));
    }

    #[test]
    fn test_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("genesis.json");
        let genesis = state();
        genesis.save(&path).unwrap();
        assert_eq!(GenesisState::load(&path).unwrap(), genesis);
        assert!(GenesisState::load(&dir.path().join("missing.json")).is_err());
    }
}
