//! # Error Types
//!
//! Parse and validation failures of the shared primitives.

use thiserror::Error;

/// Errors raised while constructing or validating a primitive.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TypeError {
    /// Chain identifier is empty or contains invalid characters.
    #[error("Invalid chain: {0}")]
    InvalidChain(String),

    /// Asset string could not be parsed.
    #[error("Invalid asset: {0}")]
    InvalidAsset(String),

    /// Address is empty or malformed.
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    /// Public key is empty or malformed.
    #[error("Invalid public key: {0}")]
    InvalidPubKey(String),

    /// Transaction id is not 64 hex characters.
    #[error("Invalid tx id: {0}")]
    InvalidTxId(String),

    /// Protocol version is not `major.minor.patch`.
    #[error("Invalid version: {0}")]
    InvalidVersion(String),

    /// Coin set violates a structural rule.
    #[error("Invalid coins: {0}")]
    InvalidCoins(String),

    /// Transaction failed its static checks.
    #[error("Invalid tx: {0}")]
    InvalidTx(String),
}

/// Result alias for primitive construction.
pub type TypeResult<T> = Result<T, TypeError>;
