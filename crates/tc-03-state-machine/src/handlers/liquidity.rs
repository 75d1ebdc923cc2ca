//! # Liquidity Handlers
//!
//! Stake, unstake, swap and add. Pool math lives in `tc_02_liquidity`;
//! these handlers load and persist pools and stakers, emit events and queue
//! whatever has to be paid out.

use shared_types::{Address, Asset, Chain, Coin};
use tc_01_keeper::{Event, EventPayload, EventStatus, Pool, PoolStatus, TxOutItem};
use tc_02_liquidity::UnstakeParams;
use tracing::{info, warn};

use super::helpers::require_active_signer;
use super::Handler;
use crate::constants::ConstantName;
use crate::domain::{Context, HandlerError, HandlerResult, Msg, MsgAdd, MsgStake, MsgSwap, MsgUnstake};
use crate::managers::{Env, TxOutStore};

fn pending_or_done(queued: bool) -> EventStatus {
    if queued {
        EventStatus::Pending
    } else {
        EventStatus::Success
    }
}

/// Rune is paid out natively to native addresses, as BEP2 otherwise.
fn rune_for(address: &Address) -> Asset {
    if address.is_chain(&Chain::thor()) {
        Asset::rune_native()
    } else {
        Asset::rune()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct StakeHandler;

impl Handler for StakeHandler {
    type Msg = MsgStake;

    fn unwrap_msg<'m>(&self, msg: &'m Msg) -> Option<&'m Self::Msg> {
        match msg {
            Msg::Stake(m) => Some(m),
            _ => None,
        }
    }

    fn validate(&self, _ctx: &Context, env: &Env<'_>, msg: &Self::Msg) -> HandlerResult<()> {
        require_active_signer(env, &msg.signer)?;
        if env.keeper.ragnarok_in_progress()? {
            return Err(HandlerError::StakeFailValidation("ragnarok in progress".into()));
        }
        if msg.rune_amount == 0 && msg.asset_amount == 0 {
            return Err(HandlerError::StakeFailValidation("both rune and asset are zero".into()));
        }
        Ok(())
    }

    fn handle(&self, ctx: &Context, env: &mut Env<'_>, msg: &Self::Msg) -> HandlerResult<()> {
        let mut pool = env.keeper.get_pool(&msg.asset)?;
        let created = pool.is_empty();
        if created {
            pool = Pool::new(msg.asset.clone());
        }
        let mut staker = env.keeper.get_staker(&msg.asset, &msg.rune_address)?;
        let default_status = env
            .constants
            .string(ConstantName::DefaultPoolStatus)
            .parse::<PoolStatus>()
            .unwrap_or_default();

        let outcome = tc_02_liquidity::stake(
            &mut pool,
            &mut staker,
            msg.rune_amount,
            msg.asset_amount,
            &msg.asset_address,
            ctx.block_height,
            default_status,
        )?;
        env.keeper.set_pool(&pool)?;
        env.keeper.set_staker(&staker)?;

        if created {
            env.emit(Event::new(
                ctx.block_height,
                msg.tx.clone(),
                EventPayload::Pool {
                    pool: pool.asset.clone(),
                    status: pool.status,
                },
                EventStatus::Success,
            ));
        }
        if outcome.pending {
            info!(pool = %msg.asset, staker = %msg.rune_address, "[dispatch] rune parked until the asset arrives");
            return Ok(());
        }
        env.emit(Event::new(
            ctx.block_height,
            msg.tx.clone(),
            EventPayload::Stake {
                pool: pool.asset.clone(),
                stake_units: outcome.units,
            },
            EventStatus::Success,
        ));
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct UnstakeHandler;

impl Handler for UnstakeHandler {
    type Msg = MsgUnstake;

    fn unwrap_msg<'m>(&self, msg: &'m Msg) -> Option<&'m Self::Msg> {
        match msg {
            Msg::Unstake(m) => Some(m),
            _ => None,
        }
    }

    fn validate(&self, _ctx: &Context, env: &Env<'_>, msg: &Self::Msg) -> HandlerResult<()> {
        require_active_signer(env, &msg.signer)?;
        if !env.keeper.pool_exists(&msg.asset)? {
            return Err(HandlerError::unknown_request(format!("pool {} does not exist", msg.asset)));
        }
        Ok(())
    }

    fn handle(&self, ctx: &Context, env: &mut Env<'_>, msg: &Self::Msg) -> HandlerResult<()> {
        let mut pool = env.keeper.get_pool(&msg.asset)?;
        let mut staker = env.keeper.get_staker(&msg.asset, &msg.rune_address)?;
        let ragnarok = env.keeper.ragnarok_in_progress()?;
        let params = UnstakeParams {
            basis_points: msg.basis_points,
            height: ctx.block_height,
            lockup_blocks: if ragnarok {
                0
            } else {
                env.blocks(ConstantName::StakeLockUpBlocks)?
            },
            gas_reserve: pool.rune_value_in_asset(env.amount(ConstantName::TransactionFee)? / 2),
        };
        let outcome = tc_02_liquidity::unstake(&mut pool, &mut staker, params)?;

        env.keeper.set_pool(&pool)?;
        if staker.units == 0 && staker.pending_rune == 0 {
            env.keeper.remove_staker(&staker.asset, &staker.rune_address)?;
        } else {
            env.keeper.set_staker(&staker)?;
        }

        let asset_to = if staker.asset_address.is_empty() {
            msg.rune_address.clone()
        } else {
            staker.asset_address.clone()
        };
        let rune_asset = rune_for(&msg.rune_address);
        let payouts = [
            TxOutItem::new(
                rune_asset.chain.clone(),
                msg.rune_address.clone(),
                Coin::new(rune_asset, outcome.rune),
                msg.tx.id.clone(),
            ),
            TxOutItem::new(
                msg.asset.chain.clone(),
                asset_to,
                Coin::new(msg.asset.clone(), outcome.asset),
                msg.tx.id.clone(),
            ),
        ];

        let store = TxOutStore::for_version(env.version)?;
        let mut queued = false;
        for item in payouts.into_iter().filter(|i| i.coin.amount > 0) {
            match store.try_add(ctx, env, item) {
                Ok(added) => queued |= added,
                Err(err) if ragnarok => warn!(tx = %msg.tx.id, error = %err, "[txout] ragnarok payout not queued"),
                Err(err) => return Err(err),
            }
        }

        env.emit(Event::new(
            ctx.block_height,
            msg.tx.clone(),
            EventPayload::Unstake {
                pool: msg.asset.clone(),
                stake_units: outcome.units,
                basis_points: msg.basis_points,
            },
            pending_or_done(queued),
        ));
        info!(pool = %msg.asset, staker = %msg.rune_address, units = outcome.units as u64, "[dispatch] unstaked");
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SwapHandler;

impl Handler for SwapHandler {
    type Msg = MsgSwap;

    fn unwrap_msg<'m>(&self, msg: &'m Msg) -> Option<&'m Self::Msg> {
        match msg {
            Msg::Swap(m) => Some(m),
            _ => None,
        }
    }

    fn validate(&self, _ctx: &Context, env: &Env<'_>, msg: &Self::Msg) -> HandlerResult<()> {
        require_active_signer(env, &msg.signer)?;
        if !msg.destination.is_chain(&msg.target_asset.chain) {
            return Err(HandlerError::unknown_request(format!(
                "destination {} is not on chain {}",
                msg.destination, msg.target_asset.chain
            )));
        }
        Ok(())
    }

    fn handle(&self, ctx: &Context, env: &mut Env<'_>, msg: &Self::Msg) -> HandlerResult<()> {
        let source = msg
            .tx
            .coins
            .first()
            .ok_or_else(|| HandlerError::InvalidCoins("swap without a source coin".into()))?;
        let keeper = env.keeper;
        let result = tc_02_liquidity::swap(
            source,
            &msg.target_asset,
            msg.trade_target,
            env.amount(ConstantName::GlobalSlipLimit)?,
            |asset| keeper.get_pool(asset).ok().filter(|p| !p.is_empty()),
        )?;

        let mut events = Vec::with_capacity(result.legs.len());
        for leg in &result.legs {
            env.keeper.set_pool(&leg.pool)?;
            env.keeper
                .add_liquidity_fee(ctx.block_height, &leg.pool.asset, leg.liquidity_fee_in_rune)?;
            events.push(EventPayload::Swap {
                pool: leg.pool.asset.clone(),
                price_target: msg.trade_target,
                trade_slip: leg.trade_slip,
                liquidity_fee: leg.liquidity_fee,
                liquidity_fee_in_rune: leg.liquidity_fee_in_rune,
            });
        }

        let item = TxOutItem::new(
            msg.target_asset.chain.clone(),
            msg.destination.clone(),
            Coin::new(msg.target_asset.clone(), result.emit),
            msg.tx.id.clone(),
        );
        let queued = TxOutStore::for_version(env.version)?.try_add(ctx, env, item)?;

        for payload in events {
            env.emit(Event::new(ctx.block_height, msg.tx.clone(), payload, pending_or_done(queued)));
        }
        info!(from = %source, to = %msg.target_asset, emit = result.emit as u64, "[dispatch] swapped");
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AddHandler;

impl Handler for AddHandler {
    type Msg = MsgAdd;

    fn unwrap_msg<'m>(&self, msg: &'m Msg) -> Option<&'m Self::Msg> {
        match msg {
            Msg::Add(m) => Some(m),
            _ => None,
        }
    }

    fn validate(&self, _ctx: &Context, env: &Env<'_>, msg: &Self::Msg) -> HandlerResult<()> {
        require_active_signer(env, &msg.signer)?;
        if !env.keeper.pool_exists(&msg.asset)? {
            return Err(HandlerError::unknown_request(format!("pool {} does not exist", msg.asset)));
        }
        Ok(())
    }

    fn handle(&self, ctx: &Context, env: &mut Env<'_>, msg: &Self::Msg) -> HandlerResult<()> {
        let mut pool = env.keeper.get_pool(&msg.asset)?;
        pool.balance_rune += msg.rune_amount;
        pool.balance_asset += msg.asset_amount;
        env.keeper.set_pool(&pool)?;
        env.emit(Event::new(
            ctx.block_height,
            msg.tx.clone(),
            EventPayload::Add { pool: pool.asset },
            EventStatus::Success,
        ));
        Ok(())
    }
}
