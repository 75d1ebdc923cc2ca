//! # Observed Transactions
//!
//! Observers report external transactions touching a vault. Reports of the
//! same tx are merged into an [`ObservedTxVoter`] keyed by tx id; the first
//! variant reaching a super-majority of active operators wins and is acted
//! on exactly once.

use serde::{Deserialize, Serialize};
use shared_types::{Address, PubKey, Tx, TxId};

use super::node_account::NodeAccount;
use super::tx_out::TxOutItem;
use super::voter::{count_active_signers, has_super_majority};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ObservedTxStatus {
    #[default]
    Incomplete,
    Done,
}

/// One variant of an observation plus who reported it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ObservedTx {
    pub tx: Tx,
    pub status: ObservedTxStatus,
    pub out_hashes: Vec<TxId>,
    /// Height on the external chain.
    pub block_height: u64,
    pub signers: Vec<Address>,
    /// Vault the tx was sent to or from.
    pub observed_pub_key: PubKey,
}

impl ObservedTx {
    pub fn new(tx: Tx, block_height: u64, observed_pub_key: PubKey) -> Self {
        Self {
            tx,
            block_height,
            observed_pub_key,
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.tx.id.as_str().is_empty()
    }

    /// Same report, ignoring who signed it.
    pub fn same_observation(&self, other: &ObservedTx) -> bool {
        self.tx == other.tx
            && self.block_height == other.block_height
            && self.observed_pub_key == other.observed_pub_key
    }

    pub fn has_signed(&self, signer: &Address) -> bool {
        self.signers.contains(signer)
    }
}

/// Aggregates reports of one external tx.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ObservedTxVoter {
    pub tx_id: TxId,
    /// Height consensus was reached, zero while open.
    pub height: u64,
    pub txs: Vec<ObservedTx>,
    /// Winning variant, empty until consensus.
    pub tx: ObservedTx,
    /// Outbounds queued in response.
    pub actions: Vec<TxOutItem>,
    /// Outbounds observed as sent.
    pub out_txs: Vec<Tx>,
}

impl ObservedTxVoter {
    pub fn new(tx_id: TxId) -> Self {
        Self {
            tx_id,
            ..Default::default()
        }
    }

    /// Merge a report. A signer contributes to at most one variant; repeat
    /// reports return false and change nothing.
    pub fn add(&mut self, observed: ObservedTx, signer: &Address) -> bool {
        if self.txs.iter().any(|t| t.has_signed(signer)) {
            return false;
        }
        match self.txs.iter_mut().find(|t| t.same_observation(&observed)) {
            Some(existing) => existing.signers.push(signer.clone()),
            None => {
                let mut observed = observed;
                observed.signers = vec![signer.clone()];
                self.txs.push(observed);
            }
        }
        true
    }

    /// The variant with a super-majority, if any.
    pub fn consensus_tx(&self, active: &[NodeAccount]) -> Option<&ObservedTx> {
        self.txs
            .iter()
            .find(|t| has_super_majority(count_active_signers(&t.signers, active), active.len()))
    }

    pub fn has_consensus(&self, active: &[NodeAccount]) -> bool {
        self.consensus_tx(active).is_some()
    }

    /// On the edge transition, record the winner and return it.
    pub fn try_commit(&mut self, height: u64, active: &[NodeAccount]) -> Option<ObservedTx> {
        if self.height > 0 {
            return None;
        }
        let winner = self.consensus_tx(active)?.clone();
        self.height = height;
        self.tx = winner.clone();
        Some(winner)
    }

    /// Record a sent outbound; duplicates are ignored.
    pub fn add_out_tx(&mut self, tx: Tx) -> bool {
        if self.out_txs.iter().any(|t| t.id == tx.id) {
            return false;
        }
        self.tx.out_hashes.push(tx.id.clone());
        self.out_txs.push(tx);
        if self.is_done() {
            self.tx.status = ObservedTxStatus::Done;
        }
        true
    }

    /// Every queued action has been observed on its way out.
    pub fn is_done(&self) -> bool {
        !self.actions.is_empty() && self.out_txs.len() >= self.actions.len()
    }
}
