//! # Slasher
//!
//! Slash points for operators that did not observe or did not sign, and
//! bond slashes for funds that left a vault without being asked for.

use shared_types::{safe_sub, Address, Amount, Asset, ProtocolVersion, PubKey, Tx, TxId};
use tc_01_keeper::{Event, EventPayload, EventStatus, NodeStatus, PoolAmt, VaultsExt};
use tracing::{info, warn};

use super::tx_out::outbound_hash;
use super::{Env, TxOutStore, V1};
use crate::constants::ConstantName;
use crate::domain::{Context, HandlerError, HandlerResult};

#[derive(Debug, Clone, Copy)]
pub struct Slasher {
    version: ProtocolVersion,
}

impl Slasher {
    pub fn for_version(version: ProtocolVersion) -> HandlerResult<Self> {
        if version >= V1 {
            Ok(Self { version })
        } else {
            Err(HandlerError::BadVersion(version))
        }
    }

    /// Penalise active operators that observed nothing since the last call,
    /// then reset the observer list.
    pub fn lack_observing(&self, ctx: &Context, env: &mut Env<'_>) -> HandlerResult<()> {
        let observers = env.keeper.get_active_observers()?;
        if observers.is_empty() {
            return Ok(());
        }
        let penalty = env.blocks(ConstantName::LackOfObservationPenalty)?;
        for mut na in env.keeper.list_active_node_accounts()? {
            if observers.contains(&na.node_address) {
                continue;
            }
            na.slash_points += penalty;
            env.keeper.set_node_account(&na)?;
            info!(height = ctx.block_height, node = %na.node_address, penalty, "[validator] lack of observation");
        }
        env.keeper.set_active_observers(&[])?;
        Ok(())
    }

    /// Items queued `SigningTransactionPeriod` blocks ago and still unsigned
    /// are handed to the active asgard. A yggdrasil owner that sat on one
    /// pays `2 * SigningTransactionPeriod` slash points.
    pub fn lack_signing(&self, ctx: &Context, env: &mut Env<'_>) -> HandlerResult<()> {
        let period = env.blocks(ConstantName::SigningTransactionPeriod)?;
        if period == 0 || ctx.block_height <= period {
            return Ok(());
        }
        let height = ctx.block_height - period;
        let mut tx_out = env.keeper.get_tx_out(height)?;
        if !tx_out.tx_array.iter().any(|item| item.is_pending()) {
            return Ok(());
        }
        let asgards = env.keeper.list_active_asgards()?;
        let store = TxOutStore::for_version(self.version)?;

        for idx in 0..tx_out.tx_array.len() {
            if !tx_out.tx_array[idx].is_pending() {
                continue;
            }
            let stale = tx_out.tx_array[idx].clone();

            if env.keeper.vault_exists(&stale.vault_pub_key)? && env.keeper.get_vault(&stale.vault_pub_key)?.is_yggdrasil() {
                if let Some(mut na) = env.keeper.get_node_account_by_pub_key(&stale.vault_pub_key)? {
                    na.slash_points += period * 2;
                    env.keeper.set_node_account(&na)?;
                    info!(node = %na.node_address, in_hash = %stale.in_hash, "[validator] lack of signing");
                }
            }

            let Some(target) = asgards.least_of(&stale.coin.asset) else {
                return Err(HandlerError::InvalidVault("unable to determine asgard vault".into()));
            };
            let mut item = stale.clone();
            item.vault_pub_key = target.pub_key.clone();

            let mut voter = env.keeper.get_observed_tx_voter(&stale.in_hash)?;
            for action in voter.actions.iter_mut().filter(|a| **a == stale) {
                action.vault_pub_key = target.pub_key.clone();
            }
            env.keeper.set_observed_tx_voter(&voter)?;

            // the replacement registers its own marker
            let hash = outbound_hash(&stale.chain, &stale.to_address, &stale.coin, &stale.memo);
            env.keeper.pop_tx_marker(&hash)?;
            tx_out.tx_array[idx].cancelled = true;
            store.unsafe_add(ctx, env, item)?;
            info!(from = %stale.vault_pub_key, to = %target.pub_key, "[validator] unsigned outbound reassigned");
        }
        env.keeper.set_tx_out(&tx_out)?;
        Ok(())
    }

    /// Take 1.5x the value of `amount` of `asset` from the bond of the
    /// operator behind `pub_key`. Rune: a third of the slash goes to the
    /// reserve. Other assets: the pool is made whole in rune.
    pub fn slash_node_account(
        &self,
        ctx: &Context,
        env: &mut Env<'_>,
        pub_key: &PubKey,
        asset: &Asset,
        amount: Amount,
    ) -> HandlerResult<()> {
        if amount == 0 {
            return Ok(());
        }
        let mut na = env
            .keeper
            .get_node_account_by_pub_key(pub_key)?
            .ok_or_else(|| HandlerError::unknown_request(format!("no node account for {pub_key}")))?;
        if na.status == NodeStatus::Unknown {
            return Ok(());
        }

        if asset.is_rune() {
            let mut data = env.keeper.get_vault_data()?;
            data.total_reserve += amount / 2;
            env.keeper.set_vault_data(&data)?;
            na.bond = safe_sub(na.bond, amount * 3 / 2);
            env.keeper.set_node_account(&na)?;
            warn!(node = %na.node_address, amount = amount as u64, "[validator] bond slashed for rune");
            return Ok(());
        }

        let mut pool = env.keeper.get_pool(asset)?;
        if pool.is_empty() {
            return Ok(());
        }
        let rune_value = pool.asset_value_in_rune(amount) * 3 / 2;
        pool.balance_asset = safe_sub(pool.balance_asset, amount);
        pool.balance_rune += rune_value;
        na.bond = safe_sub(na.bond, rune_value);
        env.keeper.set_pool(&pool)?;
        env.keeper.set_node_account(&na)?;
        warn!(node = %na.node_address, %asset, rune_value = rune_value as u64, "[validator] bond slashed");

        let in_tx = Tx {
            id: TxId::blank(),
            ..Default::default()
        };
        env.emit(Event::new(
            ctx.block_height,
            in_tx,
            EventPayload::Slash {
                pool: pool.asset.clone(),
                slash_amount: vec![
                    PoolAmt::new(pool.asset.clone(), -(amount as i128)),
                    PoolAmt::new(Asset::rune(), rune_value as i128),
                ],
            },
            EventStatus::Success,
        ));
        Ok(())
    }

    /// Add `points` to each listed operator. Unknown addresses are skipped.
    pub fn inc_slash_points(&self, env: &mut Env<'_>, points: u64, addrs: &[Address]) -> HandlerResult<()> {
        for addr in addrs {
            let mut na = env.keeper.get_node_account(addr)?;
            if na.is_empty() {
                continue;
            }
            na.slash_points += points;
            env.keeper.set_node_account(&na)?;
        }
        Ok(())
    }
}
