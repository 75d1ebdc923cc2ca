//! # Swaps
//!
//! For an input `x` into a side of depth `X`, paying out of the other side
//! of depth `Y`:
//!
//! ```text
//! emit      = x * X * Y / (x + X)^2
//! fee       = x^2 * Y   / (x + X)^2
//! tradeSlip = x * (2X + x) / X^2
//! poolSlip  = x * (x^2 + 2xX + 2X^2) / (X * (x^2 + xX + X^2))
//! ```
//!
//! Slips are expressed in basis points. An asset-to-asset swap routes through
//! rune and touches two pools.

use primitive_types::U256;
use shared_types::{math::to_amount, Amount, Asset, Coin};
use tc_01_keeper::Pool;
use tracing::debug;

use crate::errors::{LiquidityError, LiquidityResult};

const BASIS: u64 = 10_000;

/// One pool's side of a swap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapLeg {
    /// Pool after the swap.
    pub pool: Pool,
    pub source: Asset,
    pub emit: Amount,
    /// Fee in units of the emitted asset.
    pub liquidity_fee: Amount,
    pub liquidity_fee_in_rune: Amount,
    pub trade_slip: Amount,
    pub pool_slip: Amount,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapResult {
    pub emit: Amount,
    pub legs: Vec<SwapLeg>,
}

pub fn calc_asset_emission(x_depth: Amount, x: Amount, y_depth: Amount) -> Amount {
    let (big_x, x, y) = (U256::from(x_depth), U256::from(x), U256::from(y_depth));
    let denominator = (x + big_x) * (x + big_x);
    if denominator.is_zero() {
        return 0;
    }
    to_amount(x * big_x * y / denominator)
}

pub fn calc_liquidity_fee(x_depth: Amount, x: Amount, y_depth: Amount) -> Amount {
    let (big_x, x, y) = (U256::from(x_depth), U256::from(x), U256::from(y_depth));
    let denominator = (x + big_x) * (x + big_x);
    if denominator.is_zero() {
        return 0;
    }
    to_amount(x * x * y / denominator)
}

/// Trade slip in basis points.
pub fn calc_trade_slip(x_depth: Amount, x: Amount) -> Amount {
    let (big_x, x) = (U256::from(x_depth), U256::from(x));
    if big_x.is_zero() {
        return 0;
    }
    to_amount(x * (U256::from(2u8) * big_x + x) * U256::from(BASIS) / (big_x * big_x))
}

/// Pool slip in basis points.
pub fn calc_pool_slip(x_depth: Amount, x: Amount) -> Amount {
    let (big_x, x) = (U256::from(x_depth), U256::from(x));
    let denominator = big_x * (x * x + x * big_x + big_x * big_x);
    if denominator.is_zero() {
        return 0;
    }
    let numerator = x * (x * x + U256::from(2u8) * x * big_x + U256::from(2u8) * big_x * big_x);
    to_amount(numerator * U256::from(BASIS) / denominator)
}

/// Swap `amount` of `source` across `pool`, which must hold the non-rune
/// side of the pair.
pub fn swap_one(pool: &Pool, source: &Asset, amount: Amount, global_slip_limit: Amount) -> LiquidityResult<SwapLeg> {
    if !pool.is_enabled() {
        return Err(LiquidityError::PoolNotEnabled(pool.asset.clone()));
    }
    if amount == 0 {
        return Err(LiquidityError::ZeroAmount);
    }
    let from_rune = source.is_rune();
    let (x_depth, y_depth) = if from_rune {
        (pool.balance_rune, pool.balance_asset)
    } else {
        (pool.balance_asset, pool.balance_rune)
    };
    if x_depth == 0 || y_depth == 0 {
        return Err(LiquidityError::EmptyPoolBalance);
    }

    let liquidity_fee = calc_liquidity_fee(x_depth, amount, y_depth);
    let trade_slip = calc_trade_slip(x_depth, amount);
    let pool_slip = calc_pool_slip(x_depth, amount);
    let emit = calc_asset_emission(x_depth, amount, y_depth);
    if emit > y_depth {
        return Err(LiquidityError::InsufficientLiquidity);
    }
    if pool_slip > global_slip_limit {
        return Err(LiquidityError::SlipLimitExceeded {
            slip: pool_slip,
            limit: global_slip_limit,
        });
    }

    let mut after = pool.clone();
    // fee is paid in the emitted asset; price it in rune before the pool moves
    let liquidity_fee_in_rune = if from_rune {
        pool.asset_value_in_rune(liquidity_fee)
    } else {
        liquidity_fee
    };
    if from_rune {
        after.balance_rune = x_depth.saturating_add(amount);
        after.balance_asset = y_depth - emit;
    } else {
        after.balance_asset = x_depth.saturating_add(amount);
        after.balance_rune = y_depth - emit;
    }
    debug!(pool = %pool.asset, %source, amount, emit, pool_slip, "[liquidity] swap leg");
    Ok(SwapLeg {
        pool: after,
        source: source.clone(),
        emit,
        liquidity_fee,
        liquidity_fee_in_rune,
        trade_slip,
        pool_slip,
    })
}

/// Swap `source` into `target`. `lookup` resolves the pool of each non-rune
/// asset involved. A non-zero `trade_target` is the minimum acceptable
/// emission.
pub fn swap(
    source: &Coin,
    target: &Asset,
    trade_target: Amount,
    global_slip_limit: Amount,
    lookup: impl Fn(&Asset) -> Option<Pool>,
) -> LiquidityResult<SwapResult> {
    if source.asset == *target {
        return Err(LiquidityError::SameAsset(target.clone()));
    }
    let pool_for = |asset: &Asset| lookup(asset).ok_or_else(|| LiquidityError::PoolNotFound(asset.clone()));

    let mut legs = Vec::with_capacity(2);
    let mut amount = source.amount;
    let mut from = source.asset.clone();

    if !from.is_rune() && !target.is_rune() {
        let leg = swap_one(&pool_for(&from)?, &from, amount, global_slip_limit)?;
        amount = leg.emit;
        from = Asset::rune();
        legs.push(leg);
    }
    let pool_asset = if from.is_rune() { target } else { &from };
    let leg = swap_one(&pool_for(pool_asset)?, &from, amount, global_slip_limit)?;
    let emit = leg.emit;
    legs.push(leg);

    if trade_target > 0 && emit < trade_target {
        return Err(LiquidityError::TradeTargetNotMet {
            emit,
            target: trade_target,
        });
    }
    Ok(SwapResult { emit, legs })
}
