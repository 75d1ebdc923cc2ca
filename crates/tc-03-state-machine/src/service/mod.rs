//! # Block Service
//!
//! Drives one block through the state machine:
//!
//! ```text
//! begin_block ──► deliver (per message) ──► end_block ──► ValidatorUpdates
//! ```
//!
//! The service owns the block-scoped state (event buffer, gas, observers,
//! derived work, the constants of the block's protocol version). Storage is
//! passed in on every call, so the caller decides how writes are buffered
//! and when they are committed.

use std::collections::VecDeque;

use shared_types::{ProtocolVersion, TxId};
use tc_01_keeper::{Event, Keeper, Supply};
use tracing::{debug, error, info};

use crate::constants::{ConstantName, ConstantValues};
use crate::domain::{Context, HandlerError, HandlerResult, Msg};
use crate::handlers::{dispatch, enable_next_pool, process_derived};
use crate::managers::{BlockManagers, Derived, Env, Slasher, ValidatorManager, ValidatorUpdate, VaultManager};

/// State that lives between `begin_block` and `end_block`.
struct BlockState {
    height: u64,
    version: ProtocolVersion,
    constants: ConstantValues,
    managers: BlockManagers,
    derived: VecDeque<Derived>,
}

impl BlockState {
    fn env<'a>(&'a mut self, keeper: &'a dyn Keeper, supply: &'a dyn Supply) -> Env<'a> {
        Env {
            keeper,
            supply,
            managers: &mut self.managers,
            derived: &mut self.derived,
            version: self.version,
            constants: &self.constants,
        }
    }
}

#[derive(Default)]
pub struct StateMachine {
    block: Option<BlockState>,
}

impl StateMachine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Height of the block in progress.
    pub fn height(&self) -> Option<u64> {
        self.block.as_ref().map(|b| b.height)
    }

    /// Protocol version the block in progress runs at.
    pub fn version(&self) -> Option<ProtocolVersion> {
        self.block.as_ref().map(|b| b.version)
    }

    /// Events emitted so far in the block in progress.
    pub fn pending_events(&self) -> &[Event] {
        self.block.as_ref().map(|b| b.managers.events.events()).unwrap_or_default()
    }

    /// Open block `height`. The protocol version is the lowest one declared
    /// by an active operator.
    pub fn begin_block(&mut self, keeper: &dyn Keeper, supply: &dyn Supply, height: u64) -> HandlerResult<()> {
        let version = keeper.get_lowest_active_version()?;
        let constants = ConstantValues::for_version(version)
            .cloned()
            .ok_or(HandlerError::ConstantsNotAvailable(version))?;
        debug!(height, %version, "[runtime] begin block");

        let block = self.block.insert(BlockState {
            height,
            version,
            constants,
            managers: BlockManagers::new(height),
            derived: VecDeque::new(),
        });
        let ctx = Context::new(height);
        let mut env = block.env(keeper, supply);
        ValidatorManager::for_version(version)?.begin_block(&ctx, &mut env)?;
        process_derived(&ctx, &mut env)
    }

    /// Run one message and everything it derives. On failure the block
    /// state is restored to what it was before the message; the caller
    /// discards the message's storage writes.
    pub fn deliver(
        &mut self,
        keeper: &dyn Keeper,
        supply: &dyn Supply,
        tx_id: Option<TxId>,
        msg: &Msg,
    ) -> HandlerResult<()> {
        let block = self.open_block()?;
        let mut ctx = Context::new(block.height);
        ctx.tx_id = tx_id;

        let snapshot = block.managers.clone();
        let mut env = block.env(keeper, supply);
        let result = dispatch(&ctx, &mut env, msg).and_then(|()| process_derived(&ctx, &mut env));
        if result.is_err() {
            block.managers = snapshot;
            block.derived.clear();
        }
        result
    }

    /// Close the block. Penalties and pool enabling run first, then the
    /// managers in a fixed order: gas, observers, events, validators, vaults.
    /// Events emitted by the validator and vault steps are persisted by a
    /// second flush. A step that fails with a non-fatal error is logged and
    /// the block carries on; a fatal error aborts it.
    pub fn end_block(&mut self, keeper: &dyn Keeper, supply: &dyn Supply) -> HandlerResult<Vec<ValidatorUpdate>> {
        let mut block = self
            .block
            .take()
            .ok_or_else(|| HandlerError::internal("end_block without begin_block"))?;
        let height = block.height;
        let version = block.version;
        let ctx = Context::new(height);

        let updates = {
            let mut env = block.env(keeper, supply);
            let slasher = Slasher::for_version(version)?;
            settle(height, "lack observing", slasher.lack_observing(&ctx, &mut env))?;
            settle(height, "lack signing", slasher.lack_signing(&ctx, &mut env))?;
            settle(height, "enable pool", enable_next_pool(&ctx, &mut env))?;

            let managers = &mut *env.managers;
            let gas = managers.gas.end_block(height, keeper, &mut managers.events);
            settle(height, "gas", gas.map_err(HandlerError::from))?;
            let observers = env.managers.observers.end_block(keeper);
            settle(height, "observers", observers.map_err(HandlerError::from))?;

            let max_age = env.blocks(ConstantName::SigningTransactionPeriod)?.saturating_mul(2);
            let expired = env.managers.events.expire_stale(keeper, max_age);
            settle(height, "expire events", expired.map_err(HandlerError::from))?;
            env.managers.events.end_block(keeper)?;

            let validators = ValidatorManager::for_version(version)?;
            settle(height, "vault data", validators.update_vault_data(&ctx, &mut env))?;
            let updates = settle(height, "validators", validators.end_block(&ctx, &mut env))?;
            let vaults = VaultManager::for_version(version)?;
            settle(height, "vaults", vaults.end_block(&ctx, &mut env))?;
            settle(height, "derived work", process_derived(&ctx, &mut env))?;
            updates
        };

        block.managers.events.end_block(keeper)?;
        info!(height, updates = updates.len(), "[runtime] end block");
        Ok(updates)
    }

    fn open_block(&mut self) -> HandlerResult<&mut BlockState> {
        self.block
            .as_mut()
            .ok_or_else(|| HandlerError::internal("no block in progress"))
    }
}

/// Log a rejected end-block step and continue with its default output.
fn settle<T: Default>(height: u64, step: &'static str, result: HandlerResult<T>) -> HandlerResult<T> {
    match result {
        Err(err) if !err.is_fatal() => {
            error!(height, step, error = %err, "[runtime] end block step failed");
            Ok(T::default())
        }
        other => other,
    }
}
