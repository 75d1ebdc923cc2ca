//! Runtime errors.

use shared_types::ProtocolVersion;
use tc_01_keeper::KeeperError;
use tc_03_state_machine::HandlerError;
use thiserror::Error;

use crate::config::ConfigError;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Storage error: {0}")]
    Keeper(#[from] KeeperError),

    /// BeginBlock or EndBlock failed; the block's writes were discarded.
    #[error("Block {height} failed: {source}")]
    Block {
        height: u64,
        #[source]
        source: HandlerError,
    },

    #[error("Block {0} is already open")]
    BlockInProgress(u64),

    #[error("No block in progress")]
    NoBlockInProgress,

    #[error("Genesis rejected: {0}")]
    Genesis(String),

    #[error("Operator {operator} runs {version}, below the minimum join version {min}")]
    VersionTooLow {
        operator: String,
        version: ProtocolVersion,
        min: ProtocolVersion,
    },

    #[error("Encoding error: {0}")]
    Encoding(String),
}

pub type RuntimeResult<T> = Result<T, RuntimeError>;
