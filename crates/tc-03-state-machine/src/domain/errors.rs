//! Handler errors and the codes surfaced to the consensus engine.

use std::fmt;

use shared_types::{ProtocolVersion, TypeError};
use tc_01_keeper::KeeperError;
use tc_02_liquidity::LiquidityError;
use thiserror::Error;

/// Result code reported for a failed message. Values are stable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    Internal,
    UnknownRequest,
    Unauthorized,
    InsufficientCoins,
    InvalidCoins,
    BadVersion,
    InvalidMessage,
    ConstantsNotAvailable,
    InvalidMemo,
    InvalidVault,
    FailAddOutboundTx,
    StakeFailValidation,
    NoStakeUnitLeft,
    UnstakeWithinLockup,
    SwapFailed,
    NotEnoughFunds,
}

impl ErrorCode {
    pub fn as_u32(self) -> u32 {
        match self {
            ErrorCode::Internal => 1,
            ErrorCode::UnknownRequest => 6,
            ErrorCode::Unauthorized => 4,
            ErrorCode::InsufficientCoins => 5,
            ErrorCode::InvalidCoins => 10,
            ErrorCode::BadVersion => 101,
            ErrorCode::InvalidMessage => 102,
            ErrorCode::ConstantsNotAvailable => 103,
            ErrorCode::InvalidVault => 104,
            ErrorCode::InvalidMemo => 105,
            ErrorCode::FailAddOutboundTx => 106,
            ErrorCode::StakeFailValidation => 120,
            ErrorCode::NoStakeUnitLeft => 135,
            ErrorCode::UnstakeWithinLockup => 136,
            ErrorCode::SwapFailed => 108,
            ErrorCode::NotEnoughFunds => 150,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}({})", self, self.as_u32())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HandlerError {
    #[error("Bad version: {0}")]
    BadVersion(ProtocolVersion),

    #[error("Invalid message: {0}")]
    InvalidMessage(String),

    #[error("Constants not available for version {0}")]
    ConstantsNotAvailable(ProtocolVersion),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Unknown request: {0}")]
    UnknownRequest(String),

    #[error("Invalid coins: {0}")]
    InvalidCoins(String),

    #[error("Insufficient coins: {0}")]
    InsufficientCoins(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Invalid memo: {0}")]
    InvalidMemo(String),

    #[error("Invalid vault: {0}")]
    InvalidVault(String),

    #[error("Fail to add outbound tx: {0}")]
    FailAddOutboundTx(String),

    #[error("Stake failed validation: {0}")]
    StakeFailValidation(String),

    #[error("No stake units left")]
    NoStakeUnitLeft,

    #[error("Unstake within lock-up: {0}")]
    UnstakeWithinLockup(String),

    #[error("Swap failed: {0}")]
    SwapFailed(String),

    #[error("Not enough funds: {0}")]
    NotEnoughFunds(String),
}

impl HandlerError {
    pub fn code(&self) -> ErrorCode {
        match self {
            HandlerError::BadVersion(_) => ErrorCode::BadVersion,
            HandlerError::InvalidMessage(_) => ErrorCode::InvalidMessage,
            HandlerError::ConstantsNotAvailable(_) => ErrorCode::ConstantsNotAvailable,
            HandlerError::Unauthorized(_) => ErrorCode::Unauthorized,
            HandlerError::UnknownRequest(_) => ErrorCode::UnknownRequest,
            HandlerError::InvalidCoins(_) => ErrorCode::InvalidCoins,
            HandlerError::InsufficientCoins(_) => ErrorCode::InsufficientCoins,
            HandlerError::Internal(_) => ErrorCode::Internal,
            HandlerError::InvalidMemo(_) => ErrorCode::InvalidMemo,
            HandlerError::InvalidVault(_) => ErrorCode::InvalidVault,
            HandlerError::FailAddOutboundTx(_) => ErrorCode::FailAddOutboundTx,
            HandlerError::StakeFailValidation(_) => ErrorCode::StakeFailValidation,
            HandlerError::NoStakeUnitLeft => ErrorCode::NoStakeUnitLeft,
            HandlerError::UnstakeWithinLockup(_) => ErrorCode::UnstakeWithinLockup,
            HandlerError::SwapFailed(_) => ErrorCode::SwapFailed,
            HandlerError::NotEnoughFunds(_) => ErrorCode::NotEnoughFunds,
        }
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        HandlerError::Unauthorized(msg.into())
    }

    pub fn unknown_request(msg: impl Into<String>) -> Self {
        HandlerError::UnknownRequest(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        HandlerError::Internal(msg.into())
    }

    /// Storage or invariant failure; anything else is a rejected operation.
    pub fn is_fatal(&self) -> bool {
        matches!(self, HandlerError::Internal(_))
    }
}

impl From<KeeperError> for HandlerError {
    fn from(err: KeeperError) -> Self {
        match err {
            KeeperError::InsufficientFunds { .. } => HandlerError::InsufficientCoins(err.to_string()),
            KeeperError::DuplicateNodeKeys(_) | KeeperError::InvalidStatusTransition { .. } => {
                HandlerError::UnknownRequest(err.to_string())
            }
            _ => HandlerError::Internal(err.to_string()),
        }
    }
}

impl From<LiquidityError> for HandlerError {
    fn from(err: LiquidityError) -> Self {
        match err {
            LiquidityError::NoStakeUnitLeft => HandlerError::NoStakeUnitLeft,
            LiquidityError::WithinLockup { .. } => HandlerError::UnstakeWithinLockup(err.to_string()),
            LiquidityError::InvalidStake(_) | LiquidityError::AssetAddressMismatch => {
                HandlerError::StakeFailValidation(err.to_string())
            }
            LiquidityError::SlipLimitExceeded { .. }
            | LiquidityError::TradeTargetNotMet { .. }
            | LiquidityError::InsufficientLiquidity
            | LiquidityError::SameAsset(_) => HandlerError::SwapFailed(err.to_string()),
            _ => HandlerError::UnknownRequest(err.to_string()),
        }
    }
}

impl From<TypeError> for HandlerError {
    fn from(err: TypeError) -> Self {
        match err {
            TypeError::InvalidCoins(_) => HandlerError::InvalidCoins(err.to_string()),
            _ => HandlerError::UnknownRequest(err.to_string()),
        }
    }
}

pub type HandlerResult<T> = Result<T, HandlerError>;
