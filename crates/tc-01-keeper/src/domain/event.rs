//! # Domain Events
//!
//! Handlers append events during a block; the event manager persists them
//! under the block height at EndBlock. An event is never rewritten once
//! added: completing an outbound emits a new `Outbound` event instead, and a
//! pending inbound that outlives the signing window gets an `Expired` event.

use serde::{Deserialize, Serialize};
use shared_types::{Amount, Asset, Coins, Tx, TxId};

use super::pool::PoolStatus;
use super::vault_data::ReserveContributor;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum EventStatus {
    /// Waiting for outbounds to be observed.
    #[default]
    Pending,
    Success,
    Refund,
    /// Outbounds were not observed in time.
    Fail,
}

/// Entry of the incomplete-events index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncompleteEvent {
    pub in_tx_id: TxId,
    /// Height of the pending event.
    pub height: u64,
}

/// Signed rune/asset movement attributed to a pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolAmt {
    pub asset: Asset,
    pub amount: i128,
}

impl PoolAmt {
    pub fn new(asset: Asset, amount: i128) -> Self {
        Self { asset, amount }
    }
}

/// Aggregated gas paid out of one gas asset during a block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct GasPool {
    pub asset: Asset,
    pub asset_amt: Amount,
    pub rune_amt: Amount,
    /// Number of outbounds that reported gas in this asset.
    pub count: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BondType {
    Paid,
    Returned,
}

/// Protocol fee charged on an outbound.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Fee {
    pub coins: Coins,
    /// Rune taken from the pool to the reserve.
    pub pool_deduct: Amount,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventPayload {
    Swap {
        pool: Asset,
        price_target: Amount,
        trade_slip: Amount,
        liquidity_fee: Amount,
        liquidity_fee_in_rune: Amount,
    },
    Stake {
        pool: Asset,
        stake_units: Amount,
    },
    Unstake {
        pool: Asset,
        stake_units: Amount,
        basis_points: u64,
    },
    Add {
        pool: Asset,
    },
    Pool {
        pool: Asset,
        status: PoolStatus,
    },
    Rewards {
        bond_reward: Amount,
        pool_rewards: Vec<PoolAmt>,
    },
    Refund {
        code: u32,
        reason: String,
    },
    Bond {
        amount: Amount,
        bond_type: BondType,
    },
    Gas {
        pools: Vec<GasPool>,
    },
    Reserve {
        contributor: ReserveContributor,
    },
    Slash {
        pool: Asset,
        slash_amount: Vec<PoolAmt>,
    },
    Fee {
        tx_id: TxId,
        fee: Fee,
    },
    /// An inbound's outbounds have all been observed.
    Outbound {
        in_tx_id: TxId,
        tx: Tx,
    },
    /// An inbound's outbounds were never all observed.
    Expired {
        in_tx_id: TxId,
        pending_height: u64,
    },
}

impl EventPayload {
    pub fn kind(&self) -> &'static str {
        match self {
            EventPayload::Swap { .. } => "swap",
            EventPayload::Stake { .. } => "stake",
            EventPayload::Unstake { .. } => "unstake",
            EventPayload::Add { .. } => "add",
            EventPayload::Pool { .. } => "pool",
            EventPayload::Rewards { .. } => "rewards",
            EventPayload::Refund { .. } => "refund",
            EventPayload::Bond { .. } => "bond",
            EventPayload::Gas { .. } => "gas",
            EventPayload::Reserve { .. } => "reserve",
            EventPayload::Slash { .. } => "slash",
            EventPayload::Fee { .. } => "fee",
            EventPayload::Outbound { .. } => "outbound",
            EventPayload::Expired { .. } => "expired",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// Assigned when the block's events are flushed.
    pub id: u64,
    pub height: u64,
    pub in_tx: Tx,
    pub payload: EventPayload,
    pub status: EventStatus,
}

impl Event {
    pub fn new(height: u64, in_tx: Tx, payload: EventPayload, status: EventStatus) -> Self {
        Self {
            id: 0,
            height,
            in_tx,
            payload,
            status,
        }
    }

    pub fn kind(&self) -> &'static str {
        self.payload.kind()
    }
}
