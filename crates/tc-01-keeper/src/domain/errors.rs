//! Error types for the keeper.

use thiserror::Error;

/// Failures of the persistence layer and of entity state tables.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeeperError {
    /// Encoding or decoding of a stored entity failed.
    #[error("Codec error for {key}: {reason}")]
    Codec { key: String, reason: String },

    /// A required entity does not exist.
    #[error("{kind} not found: {key}")]
    NotFound { kind: &'static str, key: String },

    /// A status change not allowed by the entity's transition table.
    #[error("Invalid {entity} status transition: {from} -> {to}")]
    InvalidStatusTransition {
        entity: &'static str,
        from: String,
        to: String,
    },

    /// Another operator already registered one of these keys.
    #[error("Node keys already in use: {0}")]
    DuplicateNodeKeys(String),

    /// A module or account balance is too small.
    #[error("Insufficient funds in {account}: need {needed}, have {available}")]
    InsufficientFunds {
        account: String,
        needed: u128,
        available: u128,
    },

    /// Ragnarok height is write-once.
    #[error("Ragnarok already started at height {0}")]
    RagnarokAlreadyStarted(u64),

    /// The underlying store failed.
    #[error("Storage error: {0}")]
    Storage(String),
}

/// Result alias for keeper operations.
pub type KeeperResult<T> = Result<T, KeeperError>;
