//! Outbound queue entries.

use serde::{Deserialize, Serialize};
use shared_types::{Address, Chain, Coin, Gas, PubKey, TxId};

/// A pending external outbound.
///
/// An item is queued until an observation fills `out_hash`, or cancelled
/// when it is re-queued on another vault.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct TxOutItem {
    pub chain: Chain,
    pub to_address: Address,
    /// Vault that signs the outbound; empty until selected.
    pub vault_pub_key: PubKey,
    pub coin: Coin,
    pub memo: String,
    pub max_gas: Gas,
    /// Inbound this outbound answers, blank for internal transfers.
    pub in_hash: TxId,
    pub out_hash: Option<TxId>,
    pub cancelled: bool,
}

impl TxOutItem {
    pub fn new(chain: Chain, to_address: Address, coin: Coin, in_hash: TxId) -> Self {
        Self {
            chain,
            to_address,
            coin,
            in_hash,
            ..Default::default()
        }
    }

    /// Neither signed nor cancelled.
    pub fn is_pending(&self) -> bool {
        self.out_hash.is_none() && !self.cancelled
    }
}

/// Everything queued at one block height.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct TxOut {
    pub height: u64,
    pub tx_array: Vec<TxOutItem>,
}

impl TxOut {
    pub fn new(height: u64) -> Self {
        Self {
            height,
            tx_array: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.tx_array.is_empty()
    }
}

/// Correlates a queued outbound memo with the height it was queued at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct TxMarker {
    pub height: u64,
    pub memo: String,
}
