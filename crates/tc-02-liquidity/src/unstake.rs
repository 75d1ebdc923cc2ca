//! Withdrawal of a share of a staker's position.

use shared_types::{get_share, safe_sub, Amount};
use tc_01_keeper::{Pool, PoolStatus, Staker};
use tracing::debug;

use crate::errors::{LiquidityError, LiquidityResult};

/// Upper bound for unstake basis points.
pub const MAX_UNSTAKE_BASIS_POINTS: u64 = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UnstakeOutcome {
    /// Rune to pay out, pending rune included.
    pub rune: Amount,
    /// Asset to pay out, net of any gas withheld.
    pub asset: Amount,
    /// Units redeemed.
    pub units: Amount,
    /// Asset withheld to cover the final outbound's gas.
    pub gas_asset: Amount,
}

/// Parameters that depend on constants and network state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UnstakeParams {
    pub basis_points: u64,
    pub height: u64,
    /// Blocks after the last stake during which an off-BNB pool cannot be
    /// withdrawn from. Zero disables the check.
    pub lockup_blocks: u64,
    /// Asset to withhold when this withdrawal empties a gas-asset pool.
    pub gas_reserve: Amount,
}

/// `(rune, asset, units_after)` for redeeming `basis_points` of `staker_units`.
pub fn calculate_unstake(
    pool_units: Amount,
    pool_rune: Amount,
    pool_asset: Amount,
    staker_units: Amount,
    basis_points: u64,
) -> LiquidityResult<(Amount, Amount, Amount)> {
    if pool_units == 0 || pool_rune == 0 || pool_asset == 0 {
        return Err(LiquidityError::EmptyPoolBalance);
    }
    if staker_units == 0 {
        return Err(LiquidityError::NoStakeUnitLeft);
    }
    if basis_points > MAX_UNSTAKE_BASIS_POINTS {
        return Err(LiquidityError::InvalidBasisPoints(basis_points));
    }
    let claim = get_share(basis_points as Amount, MAX_UNSTAKE_BASIS_POINTS as Amount, staker_units);
    let rune = get_share(claim, pool_units, pool_rune);
    let asset = get_share(claim, pool_units, pool_asset);
    Ok((rune, asset, safe_sub(staker_units, claim)))
}

/// Withdraw from `pool` on behalf of `staker`. Emptied pools fall back to
/// Bootstrap.
pub fn unstake(pool: &mut Pool, staker: &mut Staker, params: UnstakeParams) -> LiquidityResult<UnstakeOutcome> {
    if params.basis_points == 0 || params.basis_points > MAX_UNSTAKE_BASIS_POINTS {
        return Err(LiquidityError::InvalidBasisPoints(params.basis_points));
    }
    if staker.units == 0 {
        return Err(LiquidityError::NoStakeUnitLeft);
    }
    if params.lockup_blocks > 0 && !pool.asset.chain.is_bnb() {
        let until = staker.last_stake_height.saturating_add(params.lockup_blocks);
        if params.height < until {
            return Err(LiquidityError::WithinLockup { until });
        }
    }

    let staker_units = staker.units;
    let (mut rune, mut asset, units_after) = calculate_unstake(
        pool.pool_units,
        pool.balance_rune,
        pool.balance_asset,
        staker_units,
        params.basis_points,
    )?;
    let pool_units_after = safe_sub(pool.pool_units, staker_units).saturating_add(units_after);

    let mut gas_asset = 0;
    if pool_units_after == 0 && pool.asset.is_gas_asset() {
        let withheld = asset.min(params.gas_reserve);
        asset -= withheld;
        gas_asset = withheld;
    }

    rune = rune.saturating_add(staker.pending_rune);
    staker.pending_rune = 0;

    pool.pool_units = pool_units_after;
    pool.balance_rune = safe_sub(pool.balance_rune, rune);
    pool.balance_asset = safe_sub(pool.balance_asset, asset);
    if pool.balance_rune == 0 || pool.balance_asset == 0 {
        pool.status = PoolStatus::Bootstrap;
    }
    staker.units = units_after;
    staker.last_unstake_height = params.height;

    debug!(pool = %pool.asset, rune, asset, units_left = units_after, "[liquidity] unstaked");
    Ok(UnstakeOutcome {
        rune,
        asset,
        units: safe_sub(staker_units, units_after),
        gas_asset,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stake::stake;
    use shared_types::{Address, Asset};

    fn setup(asset: &str) -> (Pool, Staker) {
        let mut pool = Pool::new(asset.parse::<Asset>().unwrap());
        let mut staker = Staker::new(pool.asset.clone(), Address::new("bnb1rune"));
        stake(&mut pool, &mut staker, 10_000, 20_000, &Address::new("x1asset"), 10, PoolStatus::Enabled).unwrap();
        (pool, staker)
    }

    fn params(bp: u64, height: u64) -> UnstakeParams {
        UnstakeParams {
            basis_points: bp,
            height,
            ..Default::default()
        }
    }

    #[test]
    fn test_full_unstake_returns_everything() {
        let (mut pool, mut staker) = setup("BNB.TCAN-014");
        let out = unstake(&mut pool, &mut staker, params(10_000, 11)).unwrap();
        assert_eq!(out.rune, 10_000);
        assert_eq!(out.asset, 20_000);
        assert_eq!(staker.units, 0);
        assert_eq!(pool.pool_units, 0);
        assert_eq!(pool.status, PoolStatus::Bootstrap);
    }

    #[test]
    fn test_half_unstake() {
        let (mut pool, mut staker) = setup("BNB.TCAN-014");
        let units = staker.units;
        let out = unstake(&mut pool, &mut staker, params(5_000, 11)).unwrap();
        assert_eq!(out.units, units / 2);
        assert_eq!(out.rune, 5_000);
        assert_eq!(pool.status, PoolStatus::Enabled);
    }

    #[test]
    fn test_basis_points_bounds() {
        let (mut pool, mut staker) = setup("BNB.TCAN-014");
        assert_eq!(
            unstake(&mut pool, &mut staker, params(0, 11)),
            Err(LiquidityError::InvalidBasisPoints(0))
        );
        assert_eq!(
            unstake(&mut pool, &mut staker, params(10_001, 11)),
            Err(LiquidityError::InvalidBasisPoints(10_001))
        );
    }

    #[test]
    fn test_lockup_applies_off_bnb() {
        let (mut pool, mut staker) = setup("BTC.BTC");
        let mut p = params(10_000, 15);
        p.lockup_blocks = 10;
        assert_eq!(
            unstake(&mut pool, &mut staker, p),
            Err(LiquidityError::WithinLockup { until: 20 })
        );
        p.height = 20;
        p.gas_reserve = 7;
        let out = unstake(&mut pool, &mut staker, p).unwrap();
        assert_eq!(out.gas_asset, 7);
        assert_eq!(out.asset, 20_000 - 7);
        assert_eq!(pool.balance_asset, 7);
    }

    #[test]
    fn test_nothing_to_withdraw() {
        let mut pool = Pool::new(Asset::rune());
        let mut staker = Staker::new(pool.asset.clone(), Address::new("bnb1rune"));
        assert_eq!(
            unstake(&mut pool, &mut staker, params(10_000, 1)),
            Err(LiquidityError::NoStakeUnitLeft)
        );
    }
}
