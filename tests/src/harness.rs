//! # Test Network
//!
//! A state machine over an in-memory store. Writes land directly in the
//! store, so a test can inspect state between `deliver` calls without
//! closing the block.

use std::sync::Arc;

use shared_types::{Address, Amount, Asset, Chain, Coin, Coins, PubKey, PubKeySet, ProtocolVersion, Tx, TxId};
use tc_01_keeper::{
    Keeper, KvKeeper, MemoryKvStore, NodeAccount, NodeStatus, ObservedTx, Pool, PoolStatus, StoreSupply, Vault,
    VaultStatus, VaultType,
};
use tc_03_state_machine::domain::MsgObservedTxIn;
use tc_03_state_machine::{ConstantName, HandlerResult, Msg, StateMachine, ValidatorUpdate};

/// Protocol version every harness operator runs.
pub const VERSION: ProtocolVersion = ProtocolVersion::new(0, 1, 0);

pub struct TestNet {
    pub keeper: KvKeeper,
    pub supply: StoreSupply,
    pub machine: StateMachine,
}

impl Default for TestNet {
    fn default() -> Self {
        Self::new()
    }
}

impl TestNet {
    pub fn new() -> Self {
        let store = Arc::new(MemoryKvStore::new());
        Self {
            keeper: KvKeeper::new(store.clone()),
            supply: StoreSupply::new(store),
            machine: StateMachine::new(),
        }
    }

    /// Store operator `thor{i}` (secp256k1 key `pk{i}`, consensus key
    /// `cons{i}`) with the given status and bond.
    pub fn operator(&self, i: usize, status: NodeStatus, bond: Amount) -> NodeAccount {
        let na = operator(i, status, bond);
        self.keeper.set_node_account(&na).expect("store operator");
        na
    }

    /// Overwrite a stored operator.
    pub fn save(&self, na: &NodeAccount) {
        self.keeper.set_node_account(na).expect("store operator");
    }

    pub fn node(&self, i: usize) -> NodeAccount {
        self.keeper.get_node_account(&address(i)).expect("load operator")
    }

    /// Active asgard created at `height`, shared by `members`.
    pub fn asgard(&self, name: &str, height: u64, members: &[&NodeAccount], coins: Vec<Coin>) -> Vault {
        let mut vault = Vault::new(height, VaultStatus::Active, VaultType::Asgard, PubKey::new(name));
        vault.membership = members.iter().map(|na| na.pub_key_set.secp256k1.clone()).collect();
        vault.chains = vec![Chain::bnb()];
        vault.add_funds(&Coins::new(coins));
        self.keeper.set_vault(&vault).expect("store vault");
        vault
    }

    /// Yggdrasil vault of `owner` holding `coins`.
    pub fn yggdrasil(&self, owner: &NodeAccount, coins: Vec<Coin>) -> Vault {
        let mut vault = Vault::new(1, VaultStatus::Active, VaultType::Yggdrasil, owner.pub_key_set.secp256k1.clone());
        vault.chains = vec![Chain::bnb()];
        vault.add_funds(&Coins::new(coins));
        self.keeper.set_vault(&vault).expect("store vault");
        vault
    }

    pub fn pool(&self, asset: &Asset, rune: Amount, balance_asset: Amount, status: PoolStatus) -> Pool {
        let pool = Pool {
            balance_rune: rune,
            balance_asset,
            asset: asset.clone(),
            pool_units: rune,
            status,
        };
        self.keeper.set_pool(&pool).expect("store pool");
        pool
    }

    pub fn mimir(&self, name: ConstantName, value: i64) {
        self.keeper.set_mimir(name.as_str(), value).expect("store mimir");
    }

    pub fn reserve(&self) -> Amount {
        self.keeper.get_vault_data().expect("load vault data").total_reserve
    }

    pub fn begin(&mut self, height: u64) -> HandlerResult<()> {
        self.machine.begin_block(&self.keeper, &self.supply, height)
    }

    pub fn deliver(&mut self, msg: &Msg) -> HandlerResult<()> {
        self.machine.deliver(&self.keeper, &self.supply, None, msg)
    }

    pub fn end(&mut self) -> HandlerResult<Vec<ValidatorUpdate>> {
        self.machine.end_block(&self.keeper, &self.supply)
    }

    /// Empty block at `height`.
    pub fn empty_block(&mut self, height: u64) -> HandlerResult<Vec<ValidatorUpdate>> {
        self.begin(height)?;
        self.end()
    }
}

pub fn address(i: usize) -> Address {
    Address::new(format!("thor{i}"))
}

pub fn pub_key(i: usize) -> PubKey {
    PubKey::new(format!("pk{i}"))
}

/// Operator `thor{i}` ready to join: declared version, ip and bond address.
pub fn operator(i: usize, status: NodeStatus, bond: Amount) -> NodeAccount {
    let mut na = NodeAccount::new(
        address(i),
        status,
        PubKeySet::new(pub_key(i), PubKey::new(format!("ed{i}"))),
        format!("cons{i}"),
        bond,
        Address::new(format!("bnb1bond{i}")),
        1,
    );
    na.ip_address = format!("10.0.0.{i}");
    na.version = VERSION;
    na
}

pub fn bnb() -> Asset {
    "BNB.BNB".parse().expect("valid asset")
}

/// Observation of `coins` sent from `from` into `vault` on BNB.
pub fn observed_in(id: &str, from: &str, vault: &Vault, coins: Vec<Coin>, memo: &str, signer: &Address) -> Msg {
    let tx = Tx::new(
        TxId::from_bytes(id.as_bytes()),
        Chain::bnb(),
        Address::new(from),
        vault.address(&Chain::bnb()),
        Coins::new(coins),
        Coins::default(),
        memo,
    );
    Msg::ObservedTxIn(MsgObservedTxIn {
        txs: vec![ObservedTx::new(tx, 1, vault.pub_key.clone())],
        signer: signer.clone(),
    })
}
