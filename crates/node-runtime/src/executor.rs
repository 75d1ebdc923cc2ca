//! # Block Executor
//!
//! Runs blocks handed over by the consensus engine against the committed
//! store.
//!
//! ```text
//! committed store
//!   └── block CacheKvStore      (commit at end_block, discard on failure)
//!         └── tx CacheKvStore   (commit on Ok, discard on Err)
//! ```
//!
//! A rejected message leaves no writes behind and does not fail the block.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use shared_types::TxId;
use tc_01_keeper::{CacheKvStore, KvKeeper, KvStore, StoreSupply};
use tc_03_state_machine::{HandlerError, Msg, StateMachine, ValidatorUpdate};
use tracing::{debug, error, info, warn};

use crate::errors::{RuntimeError, RuntimeResult};

/// Outcome of one delivered message as reported to the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxResult {
    pub tx_id: TxId,
    /// Zero on success, otherwise the stable error code.
    pub code: u32,
    pub log: String,
}

impl TxResult {
    pub fn is_ok(&self) -> bool {
        self.code == 0
    }
}

/// Everything a finished block reports back.
#[derive(Debug, Clone, Default)]
pub struct BlockOutcome {
    pub height: u64,
    pub tx_results: Vec<TxResult>,
    pub validator_updates: Vec<ValidatorUpdate>,
}

pub struct BlockExecutor {
    store: Arc<dyn KvStore>,
    state_machine: StateMachine,
    block_store: Option<Arc<CacheKvStore>>,
    last_height: u64,
}

impl BlockExecutor {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self {
            store,
            state_machine: StateMachine::new(),
            block_store: None,
            last_height: 0,
        }
    }

    /// Keeper over the committed state.
    pub fn keeper(&self) -> KvKeeper {
        KvKeeper::new(self.store.clone())
    }

    /// Supply ledger over the committed state.
    pub fn supply(&self) -> StoreSupply {
        StoreSupply::new(self.store.clone())
    }

    /// Height of the last committed block.
    pub fn last_height(&self) -> u64 {
        self.last_height
    }

    /// Engine-level identity of a message: hash of its encoded bytes.
    pub fn tx_id(msg: &Msg) -> RuntimeResult<TxId> {
        let bytes = bincode::serialize(msg).map_err(|e| RuntimeError::Encoding(e.to_string()))?;
        Ok(TxId::from_bytes(&bytes))
    }

    pub fn begin_block(&mut self, height: u64) -> RuntimeResult<()> {
        if let Some(open) = self.state_machine.height() {
            return Err(RuntimeError::BlockInProgress(open));
        }
        let block_store = Arc::new(CacheKvStore::new(self.store.clone()));
        let keeper = KvKeeper::new(block_store.clone());
        let supply = StoreSupply::new(block_store.clone());
        if let Err(source) = self.state_machine.begin_block(&keeper, &supply, height) {
            error!(height, %source, "[runtime] begin block failed");
            self.state_machine = StateMachine::new();
            return Err(RuntimeError::Block { height, source });
        }
        self.block_store = Some(block_store);
        Ok(())
    }

    /// Execute one message in its own transaction.
    pub fn deliver(&mut self, msg: &Msg) -> RuntimeResult<TxResult> {
        let block_store = self.block_store.clone().ok_or(RuntimeError::NoBlockInProgress)?;
        let tx_id = Self::tx_id(msg)?;

        let tx_store = Arc::new(CacheKvStore::new(block_store));
        let keeper = KvKeeper::new(tx_store.clone());
        let supply = StoreSupply::new(tx_store.clone());
        let result = self
            .state_machine
            .deliver(&keeper, &supply, Some(tx_id.clone()), msg);

        match result {
            Ok(()) => {
                tx_store.commit()?;
                debug!(tx = %tx_id, kind = %msg.msg_type(), "[runtime] message committed");
                Ok(TxResult {
                    tx_id,
                    code: 0,
                    log: String::new(),
                })
            }
            Err(err) => {
                tx_store.discard();
                warn!(tx = %tx_id, kind = %msg.msg_type(), code = err.code().as_u32(), %err, "[runtime] message rejected");
                Ok(Self::rejected(tx_id, &err))
            }
        }
    }

    fn rejected(tx_id: TxId, err: &HandlerError) -> TxResult {
        TxResult {
            tx_id,
            code: err.code().as_u32(),
            log: err.to_string(),
        }
    }

    /// Close the block and commit it to the underlying store.
    pub fn end_block(&mut self) -> RuntimeResult<Vec<ValidatorUpdate>> {
        let block_store = self.block_store.take().ok_or(RuntimeError::NoBlockInProgress)?;
        let height = self.state_machine.height().unwrap_or_default();
        let keeper = KvKeeper::new(block_store.clone());
        let supply = StoreSupply::new(block_store.clone());
        match self.state_machine.end_block(&keeper, &supply) {
            Ok(updates) => {
                let writes = block_store.pending();
                block_store.commit()?;
                self.last_height = height;
                info!(height, writes, updates = updates.len(), "[runtime] block committed");
                Ok(updates)
            }
            Err(source) => {
                block_store.discard();
                error!(height, %source, "[runtime] end block failed, block discarded");
                Err(RuntimeError::Block { height, source })
            }
        }
    }

    /// Run a whole block.
    pub fn execute_block(&mut self, height: u64, msgs: &[Msg]) -> RuntimeResult<BlockOutcome> {
        self.begin_block(height)?;
        let mut tx_results = Vec::with_capacity(msgs.len());
        for msg in msgs {
            match self.deliver(msg) {
                Ok(result) => tx_results.push(result),
                Err(err) => {
                    self.abort();
                    return Err(err);
                }
            }
        }
        let validator_updates = self.end_block()?;
        Ok(BlockOutcome {
            height,
            tx_results,
            validator_updates,
        })
    }

    /// Drop the open block and all of its writes.
    fn abort(&mut self) {
        if let Some(block_store) = self.block_store.take() {
            block_store.discard();
        }
        self.state_machine = StateMachine::new();
    }
}
