//! # Liquidity
//!
//! Continuous-product pool arithmetic used by the stake, unstake and swap
//! handlers. Every function takes pools and stakers by reference and leaves
//! persistence to the caller.

pub mod errors;
pub mod stake;
pub mod swap;
pub mod unstake;

pub use errors::{LiquidityError, LiquidityResult};
pub use stake::{calculate_pool_units, stake, StakeOutcome};
pub use swap::{swap, swap_one, SwapLeg, SwapResult};
pub use unstake::{calculate_unstake, unstake, UnstakeOutcome, UnstakeParams, MAX_UNSTAKE_BASIS_POINTS};
