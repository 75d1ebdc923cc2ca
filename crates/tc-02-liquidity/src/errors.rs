//! Error types for liquidity math.

use shared_types::{Amount, Asset};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LiquidityError {
    #[error("Pool {0} does not exist")]
    PoolNotFound(Asset),

    #[error("Pool {0} is not enabled")]
    PoolNotEnabled(Asset),

    #[error("Pool balance is empty")]
    EmptyPoolBalance,

    #[error("Amount must be greater than zero")]
    ZeroAmount,

    #[error("Invalid stake: {0}")]
    InvalidStake(String),

    #[error("Asset address does not match the staker's recorded address")]
    AssetAddressMismatch,

    #[error("Unstake basis points {0} out of range")]
    InvalidBasisPoints(u64),

    #[error("Nothing to withdraw")]
    NoStakeUnitLeft,

    #[error("Cannot unstake before block {until}")]
    WithinLockup { until: u64 },

    #[error("Cannot swap {0} to itself")]
    SameAsset(Asset),

    #[error("Pool slip {slip} bp exceeds global slip limit {limit} bp")]
    SlipLimitExceeded { slip: Amount, limit: Amount },

    #[error("Emitted {emit} is below trade target {target}")]
    TradeTargetNotMet { emit: Amount, target: Amount },

    #[error("Emission exceeds pool depth")]
    InsufficientLiquidity,
}

pub type LiquidityResult<T> = Result<T, LiquidityError>;
