//! # Messages
//!
//! Every state change enters through one of these. Each message carries its
//! signer and a `validate_basic` for static checks that need no state.

use std::fmt;

use serde::{Deserialize, Serialize};
use shared_types::{Address, Amount, Asset, Chain, Coins, ProtocolVersion, PubKey, PubKeySet, Tx, TxId};
use tc_01_keeper::{ObservedTx, ReserveContributor, VaultType};

use super::errors::{HandlerError, HandlerResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum MsgType {
    ObservedTxIn,
    ObservedTxOut,
    Stake,
    Unstake,
    Swap,
    Add,
    Bond,
    Leave,
    Ban,
    SetNodeKeys,
    SetIpAddress,
    SetVersion,
    TssPool,
    TssKeysignFail,
    Yggdrasil,
    ReserveContributor,
    NativeTx,
    Send,
    Switch,
    Outbound,
    SetMimir,
    NoOp,
}

impl fmt::Display for MsgType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

fn require(cond: bool, what: &str) -> HandlerResult<()> {
    if cond {
        Ok(())
    } else {
        Err(HandlerError::unknown_request(what))
    }
}

fn require_signer(signer: &Address) -> HandlerResult<()> {
    if signer.is_empty() {
        return Err(HandlerError::unauthorized("signer cannot be empty"));
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgObservedTxIn {
    pub txs: Vec<ObservedTx>,
    pub signer: Address,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgObservedTxOut {
    pub txs: Vec<ObservedTx>,
    pub signer: Address,
}

fn validate_observed(txs: &[ObservedTx], signer: &Address) -> HandlerResult<()> {
    require_signer(signer)?;
    require(!txs.is_empty(), "txs cannot be empty")?;
    for tx in txs {
        tx.tx.validate()?;
        require(!tx.observed_pub_key.is_empty(), "observed pubkey cannot be empty")?;
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgStake {
    pub tx: Tx,
    pub asset: Asset,
    pub rune_amount: Amount,
    pub asset_amount: Amount,
    pub rune_address: Address,
    pub asset_address: Address,
    pub signer: Address,
}

impl MsgStake {
    pub fn validate_basic(&self) -> HandlerResult<()> {
        require_signer(&self.signer)?;
        require(!self.asset.is_empty(), "stake asset cannot be empty")?;
        require(!self.asset.is_rune(), "cannot stake into the rune pool")?;
        require(!self.tx.id.is_blank(), "request tx hash cannot be empty")?;
        require(!self.rune_address.is_empty(), "rune address cannot be empty")?;
        if !self.asset.chain.is_bnb() {
            require(!self.asset_address.is_empty(), "asset address cannot be empty")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgUnstake {
    pub tx: Tx,
    pub rune_address: Address,
    pub basis_points: u64,
    pub asset: Asset,
    pub signer: Address,
}

impl MsgUnstake {
    pub fn validate_basic(&self) -> HandlerResult<()> {
        require_signer(&self.signer)?;
        require(!self.tx.id.is_blank(), "request tx hash cannot be empty")?;
        require(!self.rune_address.is_empty(), "rune address cannot be empty")?;
        require(!self.asset.is_empty(), "asset cannot be empty")?;
        require(
            (1..=10_000).contains(&self.basis_points),
            "unstake basis points must be within 1..=10000",
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgSwap {
    pub tx: Tx,
    pub target_asset: Asset,
    pub destination: Address,
    /// Minimum emission; zero for no limit.
    pub trade_target: Amount,
    pub signer: Address,
}

impl MsgSwap {
    pub fn validate_basic(&self) -> HandlerResult<()> {
        require_signer(&self.signer)?;
        self.tx.validate()?;
        require(!self.target_asset.is_empty(), "swap target cannot be empty")?;
        require(!self.destination.is_empty(), "swap destination cannot be empty")?;
        if self.tx.coins.len() != 1 {
            return Err(HandlerError::InvalidCoins("swap takes exactly one source coin".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgAdd {
    pub tx: Tx,
    pub asset: Asset,
    pub rune_amount: Amount,
    pub asset_amount: Amount,
    pub signer: Address,
}

impl MsgAdd {
    pub fn validate_basic(&self) -> HandlerResult<()> {
        require_signer(&self.signer)?;
        require(!self.asset.is_empty(), "asset cannot be empty")?;
        require(!self.tx.id.is_blank(), "request tx hash cannot be empty")?;
        require(self.rune_amount > 0 || self.asset_amount > 0, "rune and asset cannot both be zero")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgBond {
    pub tx: Tx,
    pub node_address: Address,
    pub bond: Amount,
    pub bond_address: Address,
    pub signer: Address,
}

impl MsgBond {
    pub fn validate_basic(&self) -> HandlerResult<()> {
        require_signer(&self.signer)?;
        require(!self.node_address.is_empty(), "node address cannot be empty")?;
        require(self.bond > 0, "bond cannot be zero")?;
        require(!self.bond_address.is_empty(), "bond address cannot be empty")?;
        require(!self.tx.id.is_blank(), "request tx hash cannot be empty")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgLeave {
    /// Sent from the operator's bond address.
    pub tx: Tx,
    pub node_address: Address,
    pub signer: Address,
}

impl MsgLeave {
    pub fn validate_basic(&self) -> HandlerResult<()> {
        require_signer(&self.signer)?;
        require(!self.tx.id.is_blank(), "request tx hash cannot be empty")?;
        require(!self.tx.from_address.is_empty(), "from address cannot be empty")?;
        require(!self.node_address.is_empty(), "node address cannot be empty")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgBan {
    pub node_address: Address,
    pub signer: Address,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgSetNodeKeys {
    pub pub_key_set: PubKeySet,
    pub validator_cons_pub_key: String,
    pub version: ProtocolVersion,
    pub signer: Address,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgSetIpAddress {
    pub ip_address: String,
    pub signer: Address,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgSetVersion {
    pub version: ProtocolVersion,
    pub signer: Address,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgTssPool {
    pub id: String,
    /// Empty when the keygen failed.
    pub pool_pub_key: PubKey,
    pub keygen_type: VaultType,
    pub pub_keys: Vec<PubKey>,
    /// Height the keygen was requested at.
    pub height: u64,
    pub blame: Vec<PubKey>,
    pub chains: Vec<Chain>,
    pub signer: Address,
}

impl MsgTssPool {
    pub fn new(
        pub_keys: Vec<PubKey>,
        pool_pub_key: PubKey,
        keygen_type: VaultType,
        height: u64,
        blame: Vec<PubKey>,
        chains: Vec<Chain>,
        signer: Address,
    ) -> Self {
        let id = tc_01_keeper::TssVoter::voter_id(&pub_keys, &pool_pub_key, keygen_type, height);
        Self {
            id,
            pool_pub_key,
            keygen_type,
            pub_keys,
            height,
            blame,
            chains,
            signer,
        }
    }

    pub fn is_success(&self) -> bool {
        !self.pool_pub_key.is_empty() && self.blame.is_empty()
    }

    pub fn validate_basic(&self) -> HandlerResult<()> {
        require_signer(&self.signer)?;
        require(!self.id.is_empty(), "id cannot be empty")?;
        require(!self.pub_keys.is_empty(), "pubkeys cannot be empty")?;
        require(
            self.id == tc_01_keeper::TssVoter::voter_id(&self.pub_keys, &self.pool_pub_key, self.keygen_type, self.height),
            "id does not match the keygen",
        )?;
        if !self.is_success() {
            require(!self.blame.is_empty(), "a failed keygen must blame someone")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgTssKeysignFail {
    pub id: String,
    pub height: u64,
    pub blame: Vec<PubKey>,
    pub memo: String,
    pub coins: Coins,
    pub signer: Address,
}

impl MsgTssKeysignFail {
    pub fn new(height: u64, blame: Vec<PubKey>, memo: impl Into<String>, coins: Coins, signer: Address) -> Self {
        let memo = memo.into();
        let mut keys: Vec<&str> = blame.iter().map(PubKey::as_str).collect();
        keys.sort_unstable();
        let id = TxId::from_bytes(format!("{height}:{}:{memo}:{coins}", keys.join(",")).as_bytes()).to_string();
        Self {
            id,
            height,
            blame,
            memo,
            coins,
            signer,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgYggdrasil {
    pub tx: Tx,
    pub pub_key: PubKey,
    /// True for funding, false for a return.
    pub add_funds: bool,
    pub coins: Coins,
    pub block_height: u64,
    pub signer: Address,
}

impl MsgYggdrasil {
    pub fn validate_basic(&self) -> HandlerResult<()> {
        require_signer(&self.signer)?;
        require(!self.pub_key.is_empty(), "pubkey cannot be empty")?;
        require(!self.tx.id.is_blank(), "request tx hash cannot be empty")?;
        self.coins.validate()?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgReserveContributor {
    pub tx: Tx,
    pub contributor: ReserveContributor,
    pub signer: Address,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgNativeTx {
    pub coins: Coins,
    pub memo: String,
    pub signer: Address,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgSend {
    pub from_address: Address,
    pub to_address: Address,
    pub coins: Coins,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgSwitch {
    pub tx: Tx,
    pub destination: Address,
    pub signer: Address,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgOutbound {
    pub tx: ObservedTx,
    /// Inbound this outbound answers; blank for internal transfers.
    pub in_tx_id: TxId,
    pub signer: Address,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgSetMimir {
    pub key: String,
    pub value: i64,
    pub signer: Address,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgNoOp {
    pub tx: ObservedTx,
    pub signer: Address,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Msg {
    ObservedTxIn(MsgObservedTxIn),
    ObservedTxOut(MsgObservedTxOut),
    Stake(MsgStake),
    Unstake(MsgUnstake),
    Swap(MsgSwap),
    Add(MsgAdd),
    Bond(MsgBond),
    Leave(MsgLeave),
    Ban(MsgBan),
    SetNodeKeys(MsgSetNodeKeys),
    SetIpAddress(MsgSetIpAddress),
    SetVersion(MsgSetVersion),
    TssPool(MsgTssPool),
    TssKeysignFail(MsgTssKeysignFail),
    Yggdrasil(MsgYggdrasil),
    ReserveContributor(MsgReserveContributor),
    NativeTx(MsgNativeTx),
    Send(MsgSend),
    Switch(MsgSwitch),
    Outbound(MsgOutbound),
    SetMimir(MsgSetMimir),
    NoOp(MsgNoOp),
}

impl Msg {
    pub fn msg_type(&self) -> MsgType {
        match self {
            Msg::ObservedTxIn(_) => MsgType::ObservedTxIn,
            Msg::ObservedTxOut(_) => MsgType::ObservedTxOut,
            Msg::Stake(_) => MsgType::Stake,
            Msg::Unstake(_) => MsgType::Unstake,
            Msg::Swap(_) => MsgType::Swap,
            Msg::Add(_) => MsgType::Add,
            Msg::Bond(_) => MsgType::Bond,
            Msg::Leave(_) => MsgType::Leave,
            Msg::Ban(_) => MsgType::Ban,
            Msg::SetNodeKeys(_) => MsgType::SetNodeKeys,
            Msg::SetIpAddress(_) => MsgType::SetIpAddress,
            Msg::SetVersion(_) => MsgType::SetVersion,
            Msg::TssPool(_) => MsgType::TssPool,
            Msg::TssKeysignFail(_) => MsgType::TssKeysignFail,
            Msg::Yggdrasil(_) => MsgType::Yggdrasil,
            Msg::ReserveContributor(_) => MsgType::ReserveContributor,
            Msg::NativeTx(_) => MsgType::NativeTx,
            Msg::Send(_) => MsgType::Send,
            Msg::Switch(_) => MsgType::Switch,
            Msg::Outbound(_) => MsgType::Outbound,
            Msg::SetMimir(_) => MsgType::SetMimir,
            Msg::NoOp(_) => MsgType::NoOp,
        }
    }

    /// Address that authorised the message.
    pub fn signer(&self) -> &Address {
        match self {
            Msg::ObservedTxIn(m) => &m.signer,
            Msg::ObservedTxOut(m) => &m.signer,
            Msg::Stake(m) => &m.signer,
            Msg::Unstake(m) => &m.signer,
            Msg::Swap(m) => &m.signer,
            Msg::Add(m) => &m.signer,
            Msg::Bond(m) => &m.signer,
            Msg::Leave(m) => &m.signer,
            Msg::Ban(m) => &m.signer,
            Msg::SetNodeKeys(m) => &m.signer,
            Msg::SetIpAddress(m) => &m.signer,
            Msg::SetVersion(m) => &m.signer,
            Msg::TssPool(m) => &m.signer,
            Msg::TssKeysignFail(m) => &m.signer,
            Msg::Yggdrasil(m) => &m.signer,
            Msg::ReserveContributor(m) => &m.signer,
            Msg::NativeTx(m) => &m.signer,
            Msg::Send(m) => &m.from_address,
            Msg::Switch(m) => &m.signer,
            Msg::Outbound(m) => &m.signer,
            Msg::SetMimir(m) => &m.signer,
            Msg::NoOp(m) => &m.signer,
        }
    }

    /// Stateless checks.
    pub fn validate_basic(&self) -> HandlerResult<()> {
        match self {
            Msg::ObservedTxIn(m) => validate_observed(&m.txs, &m.signer),
            Msg::ObservedTxOut(m) => validate_observed(&m.txs, &m.signer),
            Msg::Stake(m) => m.validate_basic(),
            Msg::Unstake(m) => m.validate_basic(),
            Msg::Swap(m) => m.validate_basic(),
            Msg::Add(m) => m.validate_basic(),
            Msg::Bond(m) => m.validate_basic(),
            Msg::Leave(m) => m.validate_basic(),
            Msg::Ban(m) => {
                require_signer(&m.signer)?;
                require(!m.node_address.is_empty(), "node address cannot be empty")
            }
            Msg::SetNodeKeys(m) => {
                require_signer(&m.signer)?;
                require(!m.pub_key_set.is_empty(), "node pub keys cannot be empty")?;
                require(!m.validator_cons_pub_key.is_empty(), "validator consensus pub key cannot be empty")
            }
            Msg::SetIpAddress(m) => {
                require_signer(&m.signer)?;
                require(!m.ip_address.is_empty(), "ip address cannot be empty")
            }
            Msg::SetVersion(m) => {
                require_signer(&m.signer)?;
                require(!m.version.is_zero(), "version cannot be zero")
            }
            Msg::TssPool(m) => m.validate_basic(),
            Msg::TssKeysignFail(m) => {
                require_signer(&m.signer)?;
                require(!m.id.is_empty(), "id cannot be empty")?;
                require(!m.blame.is_empty(), "blame cannot be empty")
            }
            Msg::Yggdrasil(m) => m.validate_basic(),
            Msg::ReserveContributor(m) => {
                require_signer(&m.signer)?;
                require(!m.contributor.is_empty(), "contributor cannot be empty")?;
                require(m.contributor.amount > 0, "contribution cannot be zero")
            }
            Msg::NativeTx(m) => {
                require_signer(&m.signer)?;
                m.coins.validate()?;
                if m.coins.iter().any(|c| !c.is_native()) {
                    return Err(HandlerError::InvalidCoins("native tx only carries native coins".into()));
                }
                Ok(())
            }
            Msg::Send(m) => {
                require_signer(&m.from_address)?;
                require(!m.to_address.is_empty(), "to address cannot be empty")?;
                m.coins.validate()?;
                Ok(())
            }
            Msg::Switch(m) => {
                require_signer(&m.signer)?;
                require(!m.destination.is_empty(), "destination cannot be empty")?;
                m.tx.validate()?;
                Ok(())
            }
            Msg::Outbound(m) => {
                require_signer(&m.signer)?;
                m.tx.tx.validate()?;
                Ok(())
            }
            Msg::SetMimir(m) => {
                require_signer(&m.signer)?;
                require(!m.key.is_empty(), "mimir key cannot be empty")
            }
            Msg::NoOp(m) => require_signer(&m.signer),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unstake_basis_points_range() {
        let mut msg = MsgUnstake {
            tx: Tx {
                id: TxId::from_bytes(b"x"),
                ..Default::default()
            },
            rune_address: Address::new("bnb1rune"),
            basis_points: 0,
            asset: "BNB.BNB".parse().unwrap(),
            signer: Address::new("thor1signer"),
        };
        assert!(msg.validate_basic().is_err());
        msg.basis_points = 10_000;
        assert!(msg.validate_basic().is_ok());
        msg.basis_points = 10_001;
        assert_eq!(msg.validate_basic().unwrap_err().code(), super::super::ErrorCode::UnknownRequest);
    }

    #[test]
    fn test_tss_pool_id_binds_payload() {
        let keys = vec![PubKey::new("a"), PubKey::new("b")];
        let mut msg = MsgTssPool::new(keys, PubKey::new("pool"), VaultType::Asgard, 7, vec![], vec![], Address::new("thor1s"));
        assert!(msg.validate_basic().is_ok());
        assert!(msg.is_success());
        msg.height = 8;
        assert!(msg.validate_basic().is_err());
    }

    #[test]
    fn test_failed_keygen_requires_blame() {
        let msg = MsgTssPool::new(vec![PubKey::new("a")], PubKey::default(), VaultType::Asgard, 7, vec![], vec![], Address::new("thor1s"));
        assert!(msg.validate_basic().is_err());
    }

    #[test]
    fn test_empty_signer_is_unauthorized() {
        let msg = Msg::Ban(MsgBan {
            node_address: Address::new("thor1x"),
            signer: Address::default(),
        });
        assert_eq!(msg.validate_basic().unwrap_err().code(), super::super::ErrorCode::Unauthorized);
    }
}
