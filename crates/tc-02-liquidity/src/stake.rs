//! # Staking
//!
//! Units issued for a deposit of `r` rune and `a` asset into a pool that
//! holds `R` rune and `A` asset after the deposit:
//!
//! ```text
//! units = ((R + A) * (r*A + R*a)) / (4 * R * A)
//! ```

use primitive_types::U256;
use shared_types::{math::to_amount, Address, Amount};
use tc_01_keeper::{Pool, PoolStatus, Staker};
use tracing::debug;

use crate::errors::{LiquidityError, LiquidityResult};

/// Result of a stake.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StakeOutcome {
    /// Units issued by this deposit; zero when rune was parked.
    pub units: Amount,
    /// Rune was parked as pending, waiting for the asset leg.
    pub pending: bool,
}

/// New pool units and staker units for a deposit.
pub fn calculate_pool_units(
    old_pool_units: Amount,
    pool_rune: Amount,
    pool_asset: Amount,
    stake_rune: Amount,
    stake_asset: Amount,
) -> LiquidityResult<(Amount, Amount)> {
    let rune_after = U256::from(pool_rune) + U256::from(stake_rune);
    let asset_after = U256::from(pool_asset) + U256::from(stake_asset);
    if rune_after.is_zero() {
        return Err(LiquidityError::InvalidStake("total rune in the pool is zero".into()));
    }
    if asset_after.is_zero() {
        return Err(LiquidityError::InvalidStake("total asset in the pool is zero".into()));
    }
    let n1 = rune_after + asset_after;
    let n2 = U256::from(stake_rune) * asset_after + rune_after * U256::from(stake_asset);
    let denominator = U256::from(4u8) * rune_after * asset_after;
    let units = to_amount(n1 * n2 / denominator);
    Ok((old_pool_units.saturating_add(units), units))
}

/// Deposit into `pool` on behalf of `staker`.
///
/// Pools whose asset does not live on the rune-carrying chain receive the two
/// legs in separate transactions: a rune-only deposit is parked as
/// `pending_rune` and joins the next asset deposit.
pub fn stake(
    pool: &mut Pool,
    staker: &mut Staker,
    rune: Amount,
    asset: Amount,
    asset_address: &Address,
    height: u64,
    default_status: PoolStatus,
) -> LiquidityResult<StakeOutcome> {
    if rune == 0 && asset == 0 {
        return Err(LiquidityError::InvalidStake("both rune and asset are zero".into()));
    }
    if staker.rune_address.is_empty() {
        return Err(LiquidityError::InvalidStake("rune address cannot be empty".into()));
    }
    if !staker.asset_address.is_empty() && !asset_address.is_empty() && &staker.asset_address != asset_address {
        return Err(LiquidityError::AssetAddressMismatch);
    }
    if staker.asset_address.is_empty() {
        staker.asset_address = asset_address.clone();
    }
    staker.last_stake_height = height;

    if pool.balance_rune == 0 && pool.balance_asset == 0 {
        pool.status = default_status;
    }

    let mut rune = rune;
    if !pool.asset.chain.is_bnb() {
        if asset == 0 {
            staker.pending_rune = staker.pending_rune.saturating_add(rune);
            return Ok(StakeOutcome { units: 0, pending: true });
        }
        rune = rune.saturating_add(staker.pending_rune);
        staker.pending_rune = 0;
    }

    let (pool_units, units) =
        calculate_pool_units(pool.pool_units, pool.balance_rune, pool.balance_asset, rune, asset)?;
    pool.pool_units = pool_units;
    pool.balance_rune = pool.balance_rune.saturating_add(rune);
    pool.balance_asset = pool.balance_asset.saturating_add(asset);
    staker.units = staker.units.saturating_add(units);
    debug!(pool = %pool.asset, rune, asset, units, "[liquidity] staked");
    Ok(StakeOutcome { units, pending: false })
}
