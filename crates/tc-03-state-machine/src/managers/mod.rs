//! # Managers
//!
//! Services that live for one block (events, gas, observers) and the
//! versioned collaborators handlers call into (tx-out store, vault manager,
//! validator manager, slasher).
//!
//! Collaborators hold no references to each other. Every call receives an
//! [`Env`] carrying the keeper, the supply ledger, the block-scoped managers
//! and the queue of derived work, so the dependency graph has no cycles:
//!
//! ```text
//! handler ──► Env ──► TxOutStore ──► Derived queue ──► dispatcher
//!                └──► VaultManager / ValidatorManager / Slasher
//! ```

pub mod events;
pub mod gas;
pub mod observer;
pub mod slasher;
pub mod tx_out;
pub mod validator;
pub mod vault;

use std::collections::VecDeque;

use shared_types::{Address, Amount, ProtocolVersion};
use tc_01_keeper::{Event, Keeper, ObservedTx, Supply};

use crate::constants::{ConstantName, ConstantValues};
use crate::domain::{HandlerResult, Msg};

pub use events::EventManager;
pub use gas::GasManager;
pub use observer::ObserverManager;
pub use slasher::Slasher;
pub use tx_out::{TxOutStore, TxOutStoreV1};
pub use validator::{ValidatorManager, ValidatorManagerV1};
pub use vault::{VaultManager, VaultManagerV1};

/// First protocol version served by the V1 implementations.
pub const V1: ProtocolVersion = ProtocolVersion::new(0, 1, 0);

/// Managers whose state is scoped to the current block.
#[derive(Debug, Clone, Default)]
pub struct BlockManagers {
    pub events: EventManager,
    pub gas: GasManager,
    pub observers: ObserverManager,
}

impl BlockManagers {
    pub fn new(height: u64) -> Self {
        Self {
            events: EventManager::new(height),
            gas: GasManager::new(),
            observers: ObserverManager::new(),
        }
    }
}

/// Work produced while handling a message, executed by the dispatcher after
/// the producing handler returns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Derived {
    /// A committed observation whose memo still has to be turned into a
    /// message. A failure is answered with a refund.
    Observed { tx: ObservedTx, signer: Address },
    /// A synthesised message; a failure is logged and dropped.
    Msg(Msg),
}

/// Voting power change handed back to the consensus engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatorUpdate {
    pub cons_pub_key: String,
    pub power: i64,
}

/// Everything a handler or manager may touch while processing one message.
pub struct Env<'a> {
    pub keeper: &'a dyn Keeper,
    pub supply: &'a dyn Supply,
    pub managers: &'a mut BlockManagers,
    pub derived: &'a mut VecDeque<Derived>,
    pub version: ProtocolVersion,
    pub constants: &'a ConstantValues,
}

impl<'a> Env<'a> {
    /// Constant value, shadowed by a non-negative mimir of the same name.
    /// A keeper failure is an error, not a fallback to the table.
    pub fn int(&self, name: ConstantName) -> HandlerResult<i64> {
        Ok(match self.keeper.get_mimir(name.as_str())? {
            Some(value) if value >= 0 => value,
            _ => self.constants.int(name),
        })
    }

    /// [`Env::int`] clamped to zero, for block counts.
    pub fn blocks(&self, name: ConstantName) -> HandlerResult<u64> {
        Ok(self.int(name)?.max(0) as u64)
    }

    /// [`Env::int`] clamped to zero, for amounts.
    pub fn amount(&self, name: ConstantName) -> HandlerResult<Amount> {
        Ok(self.int(name)?.max(0) as Amount)
    }

    pub fn emit(&mut self, event: Event) {
        self.managers.events.add_event(event);
    }

    pub fn push_derived(&mut self, work: Derived) {
        self.derived.push_back(work);
    }
}
