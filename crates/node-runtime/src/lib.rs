//! # Node Runtime
//!
//! Hosts the state machine behind a consensus engine.
//!
//! ## Modular Structure
//!
//! - `config` - node configuration and validation
//! - `logging` - tracing subscriber bootstrap
//! - `genesis` - JSON genesis import and export
//! - `executor` - block execution with per-message store transactions
//!
//! ## Startup Sequence
//!
//! 1. Load configuration (from file/env)
//! 2. Validate configuration
//! 3. Import genesis state into the empty store
//! 4. Execute blocks handed over by the engine

pub mod config;
pub mod errors;
pub mod executor;
pub mod genesis;
pub mod logging;

use std::sync::Arc;

use tc_01_keeper::{KvStore, MemoryKvStore};
use tracing::info;

pub use config::{ChainConfig, ConfigError, GenesisConfig, LoggingConfig, NodeConfig};
pub use errors::{RuntimeError, RuntimeResult};
pub use executor::{BlockExecutor, BlockOutcome, TxResult};
pub use genesis::{GenesisBalance, GenesisState};
pub use logging::init_tracing;

/// A configured node: validated settings plus the executor over its store.
pub struct NodeRuntime {
    config: NodeConfig,
    executor: BlockExecutor,
}

impl NodeRuntime {
    /// Validate `config`, apply it to `genesis` and import the result into
    /// a fresh in-memory store.
    pub fn new(config: NodeConfig, mut genesis: GenesisState) -> RuntimeResult<Self> {
        config.validate()?;
        genesis.apply_chain_config(&config.chain)?;

        let store: Arc<dyn KvStore> = Arc::new(MemoryKvStore::new());
        let executor = BlockExecutor::new(store);
        genesis.import(&executor.keeper(), &executor.supply())?;
        info!(
            admins = genesis.admins.len(),
            initial_height = config.genesis.initial_height,
            "[runtime] node initialised"
        );
        Ok(Self { config, executor })
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    pub fn executor(&mut self) -> &mut BlockExecutor {
        &mut self.executor
    }

    /// Height the engine should execute next.
    pub fn next_height(&self) -> u64 {
        match self.executor.last_height() {
            0 => self.config.genesis.initial_height,
            h => h + 1,
        }
    }

    pub fn export_genesis(&self) -> RuntimeResult<GenesisState> {
        GenesisState::export(&self.executor.keeper())
    }
}
