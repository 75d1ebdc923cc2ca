//! # Validator Manager
//!
//! Owns the active operator set.
//!
//! - **BeginBlock**: marks bad and old actors for removal, and on a churn
//!   window computes the next set and asks the vault manager for a keygen.
//! - **EndBlock**: once the new asgard is installed, promotes the operators
//!   in its membership and demotes the rest, paying out their bond rewards.
//! - **Ragnarok**: when the set can no longer stay BFT, winds the network
//!   down in ten rounds, returning bonds, reserve contributions and stakes.

use std::cmp::Reverse;

use shared_types::{get_share, safe_sub, Address, Amount, Asset, Chain, Coin, Coins, ProtocolVersion, Tx, TxId};
use tc_01_keeper::{
    Event, EventPayload, EventStatus, NodeAccount, NodeStatus, PoolAmt, PoolStatus, TxOutItem, Vault,
    VaultsExt,
};
use tracing::{debug, info, warn};

use super::vault::GENESIS_BLOCK_HEIGHT;
use super::{Derived, Env, TxOutStore, ValidatorUpdate, VaultManager, V1};
use crate::constants::ConstantName;
use crate::domain::{Context, HandlerError, HandlerResult, Memo, Msg, MsgUnstake, MAX_BASIS_POINTS};

/// Operators younger than this are never scored as bad actors.
const MIN_SCORED_AGE: u64 = 720;

/// Fixed-point scale of bad-actor scores.
const SCORE_SCALE: u128 = 100_000;

/// Ragnarok refunds `nth / RAGNAROK_ROUNDS` per round.
const RAGNAROK_ROUNDS: u64 = 10;

/// Voting power of an active validator.
pub const ACTIVE_POWER: i64 = 100;

#[derive(Debug, Clone, Copy)]
pub enum ValidatorManager {
    V1(ValidatorManagerV1),
}

impl ValidatorManager {
    pub fn for_version(version: ProtocolVersion) -> HandlerResult<Self> {
        if version >= V1 {
            Ok(ValidatorManager::V1(ValidatorManagerV1))
        } else {
            Err(HandlerError::BadVersion(version))
        }
    }

    pub fn begin_block(&self, ctx: &Context, env: &mut Env<'_>) -> HandlerResult<()> {
        match self {
            ValidatorManager::V1(m) => m.begin_block(ctx, env),
        }
    }

    pub fn end_block(&self, ctx: &Context, env: &mut Env<'_>) -> HandlerResult<Vec<ValidatorUpdate>> {
        match self {
            ValidatorManager::V1(m) => m.end_block(ctx, env),
        }
    }

    pub fn request_ygg_return(&self, ctx: &Context, env: &mut Env<'_>, na: &NodeAccount) -> HandlerResult<()> {
        match self {
            ValidatorManager::V1(m) => m.request_ygg_return(ctx, env, na),
        }
    }

    pub fn process_ragnarok(&self, ctx: &Context, env: &mut Env<'_>) -> HandlerResult<()> {
        match self {
            ValidatorManager::V1(m) => m.process_ragnarok(ctx, env),
        }
    }

    pub fn update_vault_data(&self, ctx: &Context, env: &mut Env<'_>) -> HandlerResult<()> {
        match self {
            ValidatorManager::V1(m) => m.update_vault_data(ctx, env),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ValidatorManagerV1;

impl ValidatorManagerV1 {
    pub fn begin_block(&self, ctx: &Context, env: &mut Env<'_>) -> HandlerResult<()> {
        let height = ctx.block_height;
        if height == GENESIS_BLOCK_HEIGHT {
            self.setup_validator_nodes(ctx, env)?;
        }
        if env.keeper.ragnarok_in_progress()? {
            return Ok(());
        }

        let active = env.keeper.list_active_node_accounts()?;
        let min_bft = env.blocks(ConstantName::MinimumNodesForBFT)? as usize;
        let artificial = artificial_ragnarok_reached(height, env)?;
        if active.len() >= min_bft + 2 || artificial {
            self.mark_bad_actors(ctx, env, &active)?;
            self.mark_old_actor(ctx, env, &active)?;
        }

        let last_churn = env
            .keeper
            .list_active_asgards()?
            .iter()
            .map(|v| v.block_height)
            .max()
            .unwrap_or_default();
        let rotate = env.blocks(ConstantName::RotatePerBlockHeight)?;
        let retry_every = env.blocks(ConstantName::RotateRetryBlocks)?;
        if rotate == 0 {
            return Ok(());
        }
        let since = height.saturating_sub(last_churn);
        let retry = since > rotate && retry_every > 0 && (since + rotate) % retry_every == 0;
        if height % rotate != 0 && !retry {
            return Ok(());
        }
        info!(height, retry, "[validator] checking for node account rotation");

        if env.keeper.list_retiring_asgards()?.iter().any(Vault::has_funds) {
            info!(height, "[validator] retiring vaults still hold funds, rotation skipped");
            return Ok(());
        }

        let target = env.blocks(ConstantName::DesireValidatorSet)? as usize;
        let (next, rotated) = self.next_vault_node_accounts(ctx, env, target)?;
        if artificial || (next.len() < min_bft && active.len() >= min_bft) {
            warn!(height, next = next.len(), "[validator] active set cannot stay BFT, starting ragnarok");
            return self.process_ragnarok(ctx, env);
        }
        if rotated && !next.is_empty() {
            VaultManager::for_version(env.version)?.trigger_keygen(ctx, env, &next)?;
        }
        Ok(())
    }

    pub fn end_block(&self, ctx: &Context, env: &mut Env<'_>) -> HandlerResult<Vec<ValidatorUpdate>> {
        let height = ctx.block_height;
        if env.keeper.ragnarok_in_progress()? {
            self.process_ragnarok(ctx, env)?;
            return Ok(Vec::new());
        }

        let active = env.keeper.list_active_node_accounts()?;
        let Some((promoted, demoted)) = self.changed_nodes(env, &active)? else {
            return Ok(Vec::new());
        };
        if promoted.is_empty() && demoted.is_empty() {
            return Ok(Vec::new());
        }

        let min_bft = env.blocks(ConstantName::MinimumNodesForBFT)? as usize;
        let after = (active.len() + promoted.len()).saturating_sub(demoted.len());
        if active.len() >= min_bft && after < min_bft {
            warn!(height, after, "[validator] churn would break BFT, starting ragnarok");
            self.process_ragnarok(ctx, env)?;
            return Ok(Vec::new());
        }

        let mut updates = Vec::with_capacity(promoted.len() + demoted.len());
        for mut na in promoted {
            na.update_status(NodeStatus::Active, height)?;
            na.active_block_height = height;
            na.slash_points = 0;
            na.leave_height = 0;
            env.keeper.set_node_account(&na)?;
            info!(height, node = %na.node_address, "[validator] node account activated");
            updates.push(ValidatorUpdate {
                cons_pub_key: na.validator_cons_pub_key.clone(),
                power: ACTIVE_POWER,
            });
        }
        for mut na in demoted {
            let status = if na.requested_to_leave || na.forced_to_leave {
                NodeStatus::Disabled
            } else {
                NodeStatus::Standby
            };
            na.update_status(status, height)?;
            self.pay_bond_award(ctx, env, &mut na)?;
            env.keeper.set_node_account(&na)?;
            self.request_ygg_return(ctx, env, &na)?;
            info!(height, node = %na.node_address, %status, "[validator] node account churned out");
            updates.push(ValidatorUpdate {
                cons_pub_key: na.validator_cons_pub_key.clone(),
                power: 0,
            });
        }
        Ok(updates)
    }

    /// Promotions and demotions implied by the active asgard membership.
    /// `None` while no asgard is active.
    fn changed_nodes(
        &self,
        env: &Env<'_>,
        active: &[NodeAccount],
    ) -> HandlerResult<Option<(Vec<NodeAccount>, Vec<NodeAccount>)>> {
        let asgards = env.keeper.list_active_asgards()?;
        if asgards.is_empty() {
            return Ok(None);
        }
        let membership: Vec<_> = asgards.iter().flat_map(|v| v.membership.iter().cloned()).collect();
        if membership.is_empty() {
            return Ok(Some((Vec::new(), Vec::new())));
        }

        let demoted = active
            .iter()
            .filter(|na| !asgards.iter().any(|v| v.contains(&na.pub_key_set.secp256k1)))
            .cloned()
            .collect();
        let promoted = env
            .keeper
            .list_node_accounts_by_status(NodeStatus::Ready)?
            .into_iter()
            .filter(|na| membership.iter().any(|m| na.pub_key_set.contains(m)))
            .collect();
        Ok(Some((promoted, demoted)))
    }

    /// Credit `na` with its share of the bond reward bucket and close its
    /// active period. The caller persists `na`.
    fn pay_bond_award(&self, ctx: &Context, env: &mut Env<'_>, na: &mut NodeAccount) -> HandlerResult<()> {
        if na.active_block_height == 0 || na.bond == 0 {
            return Ok(());
        }
        let mut data = env.keeper.get_vault_data()?;
        let active_blocks = Amount::from(ctx.block_height.saturating_sub(na.active_block_height));
        let earned = safe_sub(active_blocks, Amount::from(na.slash_points));
        let reward = data.calc_node_rewards(earned);

        na.bond += reward;
        data.bond_reward_rune = safe_sub(data.bond_reward_rune, reward);
        data.total_bond_units = safe_sub(data.total_bond_units, active_blocks);
        env.keeper.set_vault_data(&data)?;
        na.active_block_height = 0;
        debug!(node = %na.node_address, reward = reward as u64, "[validator] bond reward paid");
        Ok(())
    }

    /// Queue a full return of the operator's yggdrasil funds, one item per
    /// chain, to the active asgard holding the least rune.
    pub fn request_ygg_return(&self, ctx: &Context, env: &mut Env<'_>, na: &NodeAccount) -> HandlerResult<()> {
        let Some(ygg) = env.keeper.get_yggdrasil(na)? else {
            return Ok(());
        };
        if !ygg.has_funds() {
            return Ok(());
        }
        let asgards = env.keeper.list_active_asgards()?;
        let target = asgards
            .least_of(&Asset::rune())
            .ok_or_else(|| HandlerError::InvalidVault("unable to determine asgard vault".into()))?
            .clone();
        let chains = if ygg.chains.is_empty() {
            env.keeper.get_chains()?
        } else {
            ygg.chains.clone()
        };

        let store = TxOutStore::for_version(env.version)?;
        for chain in chains.into_iter().filter(|c| !c.is_native()) {
            let mut item = TxOutItem::new(
                chain.clone(),
                target.address(&chain),
                Coin::new(chain.gas_asset(), 0),
                TxId::blank(),
            );
            item.vault_pub_key = ygg.pub_key.clone();
            item.memo = Memo::YggdrasilReturn {
                block_height: ctx.block_height,
            }
            .to_string();
            store.try_add(ctx, env, item)?;
        }
        info!(node = %na.node_address, vault = %ygg.pub_key, "[validator] yggdrasil return requested");
        Ok(())
    }

    /// Called once to start ragnarok and then every block while it runs.
    pub fn process_ragnarok(&self, ctx: &Context, env: &mut Env<'_>) -> HandlerResult<()> {
        let height = ctx.block_height;
        let started = env.keeper.ragnarok_height()?;
        if started == 0 {
            env.keeper.set_ragnarok_height(height)?;
            warn!(height, "[validator] ragnarok started");
            let active = env.keeper.list_active_node_accounts()?;
            for na in &active {
                self.request_ygg_return(ctx, env, na)?;
            }
            for mut na in active {
                self.pay_bond_award(ctx, env, &mut na)?;
                env.keeper.set_node_account(&na)?;
            }
            return Ok(());
        }

        let interval = env.blocks(ConstantName::FundMigrationInterval)?;
        let elapsed = height.saturating_sub(started);
        if interval == 0 || elapsed == 0 || elapsed % interval != 0 {
            return Ok(());
        }
        let nth = (elapsed / interval).min(RAGNAROK_ROUNDS);
        info!(height, round = nth, "[validator] ragnarok round");
        self.ragnarok_bond(ctx, env, nth)?;
        self.ragnarok_reserve(ctx, env, nth)?;
        self.ragnarok_pools(ctx, env, nth)
    }

    fn ragnarok_bond(&self, ctx: &Context, env: &mut Env<'_>, nth: u64) -> HandlerResult<()> {
        let store = TxOutStore::for_version(env.version)?;
        for mut na in env.keeper.list_node_accounts()? {
            if na.bond == 0 {
                continue;
            }
            if env.keeper.get_yggdrasil(&na)?.is_some_and(|ygg| ygg.has_funds()) {
                info!(node = %na.node_address, "[validator] bond refund waits for yggdrasil return");
                continue;
            }
            let amount = get_share(Amount::from(nth), Amount::from(RAGNAROK_ROUNDS), na.bond);
            let item = ragnarok_item(ctx, na.bond_address.clone(), amount);
            match store.try_add(ctx, env, item) {
                Ok(true) => {
                    na.bond = safe_sub(na.bond, amount);
                    env.keeper.set_node_account(&na)?;
                }
                Ok(false) => {}
                Err(err) => warn!(node = %na.node_address, %err, "[validator] bond refund not queued"),
            }
        }
        Ok(())
    }

    fn ragnarok_reserve(&self, ctx: &Context, env: &mut Env<'_>, nth: u64) -> HandlerResult<()> {
        let mut contributors = env.keeper.get_reserve_contributors()?;
        let total_reserve = env.keeper.get_vault_data()?.total_reserve;
        if contributors.is_empty() || total_reserve == 0 {
            return Ok(());
        }
        let total_contributed = contributors.total();
        let store = TxOutStore::for_version(env.version)?;

        for contributor in contributors.0.iter_mut() {
            let share = get_share(contributor.amount, total_contributed, total_reserve);
            let amount = get_share(Amount::from(nth), Amount::from(RAGNAROK_ROUNDS), share);
            let item = ragnarok_item(ctx, contributor.address.clone(), amount);
            match store.try_add(ctx, env, item) {
                Ok(_) => {
                    // re-read: the fee of the item just queued went to the reserve
                    let mut data = env.keeper.get_vault_data()?;
                    data.total_reserve = safe_sub(data.total_reserve, amount);
                    env.keeper.set_vault_data(&data)?;
                    contributor.amount = safe_sub(contributor.amount, amount);
                }
                Err(err) => warn!(address = %contributor.address, %err, "[validator] reserve refund not queued"),
            }
        }
        env.keeper.set_reserve_contributors(&contributors)?;
        Ok(())
    }

    fn ragnarok_pools(&self, ctx: &Context, env: &mut Env<'_>, nth: u64) -> HandlerResult<()> {
        let active = env.keeper.list_active_node_accounts()?;
        let Some(signer) = active.first().map(|na| na.node_address.clone()) else {
            warn!(height = ctx.block_height, "[validator] no active node account to sign ragnarok unstakes");
            return Ok(());
        };
        let basis_points = (nth * (MAX_BASIS_POINTS / RAGNAROK_ROUNDS)).min(MAX_BASIS_POINTS);

        for mut pool in env.keeper.list_pools()? {
            if pool.status != PoolStatus::Bootstrap {
                pool.status = PoolStatus::Bootstrap;
                env.keeper.set_pool(&pool)?;
                env.emit(Event::new(
                    ctx.block_height,
                    Tx::default(),
                    EventPayload::Pool {
                        pool: pool.asset.clone(),
                        status: PoolStatus::Bootstrap,
                    },
                    EventStatus::Success,
                ));
            }
            for staker in env.keeper.list_stakers(&pool.asset)? {
                if staker.units == 0 {
                    continue;
                }
                let tx = ragnarok_tx(ctx, &pool.asset.chain, &staker.rune_address, &pool.asset);
                env.push_derived(Derived::Msg(Msg::Unstake(MsgUnstake {
                    tx,
                    rune_address: staker.rune_address.clone(),
                    basis_points,
                    asset: pool.asset.clone(),
                    signer: signer.clone(),
                })));
            }
        }
        Ok(())
    }

    /// Block rewards: a slice of the reserve goes to bonders (accrued in the
    /// bond reward bucket) and a third of it to pools, split by this block's
    /// liquidity fees or, with no fees, by depth.
    pub fn update_vault_data(&self, ctx: &Context, env: &mut Env<'_>) -> HandlerResult<()> {
        let height = ctx.block_height;
        let mut data = env.keeper.get_vault_data()?;
        let active = env.keeper.list_active_node_accounts()?;
        data.total_bond_units += active.len() as Amount;

        let curve = env.amount(ConstantName::EmissionCurve)?;
        let blocks_per_year = env.amount(ConstantName::BlocksPerYear)?;
        let pools: Vec<_> = env
            .keeper
            .list_pools()?
            .into_iter()
            .filter(|p| p.is_enabled() && p.balance_rune > 0)
            .collect();
        let total_staked: Amount = pools.iter().map(|p| p.balance_rune).sum();

        if data.total_reserve == 0
            || total_staked == 0
            || curve == 0
            || blocks_per_year == 0
            || env.keeper.ragnarok_in_progress()?
        {
            env.keeper.set_vault_data(&data)?;
            return Ok(());
        }

        let block_reward = data.total_reserve / curve / blocks_per_year;
        let pool_reward = block_reward / 3;
        let bond_reward = block_reward - pool_reward;
        data.total_reserve -= block_reward;
        data.bond_reward_rune += bond_reward;

        let total_fees = env.keeper.get_total_liquidity_fees(height)?;
        let mut paid: Amount = 0;
        let mut pool_rewards = Vec::with_capacity(pools.len());
        for mut pool in pools {
            let amount = if total_fees > 0 {
                let fees = env.keeper.get_pool_liquidity_fees(height, &pool.asset)?;
                get_share(fees, total_fees, pool_reward)
            } else {
                get_share(pool.balance_rune, total_staked, pool_reward)
            };
            pool.balance_rune += amount;
            paid += amount;
            env.keeper.set_pool(&pool)?;
            pool_rewards.push(PoolAmt::new(pool.asset.clone(), amount as i128));
        }
        // rounding dust stays in the reserve
        data.total_reserve += pool_reward - paid;
        env.keeper.set_vault_data(&data)?;

        env.emit(Event::new(
            height,
            Tx::default(),
            EventPayload::Rewards {
                bond_reward,
                pool_rewards,
            },
            EventStatus::Success,
        ));
        Ok(())
    }

    /// First block: the first `DesireValidatorSet` of the active and ready
    /// operators become active, the rest wait on standby.
    fn setup_validator_nodes(&self, ctx: &Context, env: &mut Env<'_>) -> HandlerResult<()> {
        let height = ctx.block_height;
        let all = env.keeper.list_node_accounts()?;
        let mut active: Vec<_> = all.iter().filter(|na| na.status == NodeStatus::Active).cloned().collect();
        let mut ready: Vec<_> = all.iter().filter(|na| na.status == NodeStatus::Ready).cloned().collect();
        if active.is_empty() && ready.is_empty() {
            return Err(HandlerError::internal("no validators available"));
        }
        active.sort_by(|a, b| a.node_address.cmp(&b.node_address));
        sort_by_bond(&mut ready);

        let desired = env.blocks(ConstantName::DesireValidatorSet)? as usize;
        for (idx, mut na) in active.into_iter().chain(ready).enumerate() {
            if idx < desired {
                na.update_status(NodeStatus::Active, height)?;
                if na.active_block_height == 0 {
                    na.active_block_height = height;
                }
            } else {
                na.update_status(NodeStatus::Standby, height)?;
            }
            env.keeper.set_node_account(&na)?;
        }
        Ok(())
    }

    fn mark_bad_actors(&self, ctx: &Context, env: &mut Env<'_>, active: &[NodeAccount]) -> HandlerResult<()> {
        let rate = env.blocks(ConstantName::BadValidatorRate)?;
        if rate == 0 || ctx.block_height % rate != 0 {
            return Ok(());
        }
        for na in find_bad_actors(ctx.block_height, active) {
            self.mark_actor(ctx, env, &na.node_address)?;
        }
        Ok(())
    }

    fn mark_old_actor(&self, ctx: &Context, env: &mut Env<'_>, active: &[NodeAccount]) -> HandlerResult<()> {
        let rate = env.blocks(ConstantName::OldValidatorRate)?;
        if rate == 0 || ctx.block_height % rate != 0 {
            return Ok(());
        }
        if let Some(na) = find_old_actor(ctx.block_height, active) {
            self.mark_actor(ctx, env, &na.node_address)?;
        }
        Ok(())
    }

    fn mark_actor(&self, ctx: &Context, env: &mut Env<'_>, addr: &Address) -> HandlerResult<()> {
        // re-read: the same operator can be both a bad and the old actor
        let mut na = env.keeper.get_node_account(addr)?;
        if na.leave_height > 0 {
            return Ok(());
        }
        na.mark_leave(ctx.block_height);
        env.keeper.set_node_account(&na)?;
        info!(height = ctx.block_height, node = %na.node_address, "[validator] marked to be churned out");
        Ok(())
    }

    /// Re-evaluate standby and ready operators against the join criteria.
    fn mark_ready_actors(&self, ctx: &Context, env: &mut Env<'_>) -> HandlerResult<()> {
        let height = ctx.block_height;
        let min_version = env.keeper.get_min_join_version()?;
        let min_bond = env.amount(ConstantName::MinimumBondInRune)?;
        let frozen = artificial_ragnarok_reached(height, env)? || env.keeper.ragnarok_in_progress()?;

        for mut na in env.keeper.list_node_accounts()? {
            if !matches!(na.status, NodeStatus::Standby | NodeStatus::Ready) {
                continue;
            }
            let eligible = !frozen
                && na.version >= min_version
                && !na.requested_to_leave
                && !na.forced_to_leave
                && !na.ip_address.is_empty()
                && na.bond >= min_bond;
            let status = if eligible {
                NodeStatus::Ready
            } else {
                NodeStatus::Standby
            };
            if na.status != status {
                na.update_status(status, height)?;
                env.keeper.set_node_account(&na)?;
            }
        }
        Ok(())
    }

    /// Next active set and whether it differs from the current one.
    fn next_vault_node_accounts(
        &self,
        ctx: &Context,
        env: &mut Env<'_>,
        target: usize,
    ) -> HandlerResult<(Vec<NodeAccount>, bool)> {
        self.mark_ready_actors(ctx, env)?;

        let mut ready = env.keeper.list_node_accounts_by_status(NodeStatus::Ready)?;
        sort_by_bond(&mut ready);
        let mut active = env.keeper.list_active_node_accounts()?;
        sort_by_leave_priority(&mut active);

        let artificial = env.blocks(ConstantName::ArtificialRagnarokBlockHeight)?;
        let to_remove = find_count_to_remove(ctx.block_height, artificial, &active);
        let mut rotated = false;
        if to_remove > 0 {
            rotated = true;
            active.drain(..to_remove);
        }

        let min_bft = env.blocks(ConstantName::MinimumNodesForBFT)? as usize;
        let limit = (to_remove + 1).max(min_bft.saturating_sub(active.len()));
        for na in ready.into_iter().take(limit) {
            if active.len() >= target {
                break;
            }
            rotated = true;
            active.push(na);
        }
        Ok((active, rotated))
    }
}

fn artificial_ragnarok_reached(height: u64, env: &Env<'_>) -> HandlerResult<bool> {
    let at = env.blocks(ConstantName::ArtificialRagnarokBlockHeight)?;
    Ok(at > 0 && height >= at)
}

fn ragnarok_item(ctx: &Context, to: Address, amount: Amount) -> TxOutItem {
    let mut item = TxOutItem::new(Chain::bnb(), to, Coin::new(Asset::rune(), amount), TxId::blank());
    item.memo = Memo::Ragnarok {
        block_height: ctx.block_height,
    }
    .to_string();
    item
}

/// Synthetic inbound a ragnarok unstake answers to.
fn ragnarok_tx(ctx: &Context, chain: &Chain, rune_address: &Address, asset: &Asset) -> Tx {
    let id = TxId::from_bytes(format!("ragnarok:{}:{asset}:{rune_address}", ctx.block_height).as_bytes());
    Tx::new(
        id,
        chain.clone(),
        rune_address.clone(),
        rune_address.clone(),
        Coins::default(),
        Coins::default(),
        Memo::Ragnarok {
            block_height: ctx.block_height,
        }
        .to_string(),
    )
}

/// Bond descending, address as tie-break.
fn sort_by_bond(nodes: &mut [NodeAccount]) {
    nodes.sort_by(|a, b| b.bond.cmp(&a.bond).then_with(|| a.node_address.cmp(&b.node_address)));
}

/// Forced first, then requested, then the earliest marked.
pub fn sort_by_leave_priority(nodes: &mut [NodeAccount]) {
    nodes.sort_by_key(|na| {
        (
            Reverse(na.forced_to_leave),
            Reverse(na.requested_to_leave),
            na.leave_height == 0,
            na.leave_height,
        )
    });
}

/// Operators whose slash rate is well below the mean age-per-slash-point.
/// Falls back to the single worst offender.
pub fn find_bad_actors(height: u64, active: &[NodeAccount]) -> Vec<&NodeAccount> {
    let mut scored: Vec<(u128, &NodeAccount)> = active
        .iter()
        .filter_map(|na| {
            if na.slash_points == 0 {
                return None;
            }
            let age = height.saturating_sub(na.status_since);
            if age < MIN_SCORED_AGE {
                return None;
            }
            Some((u128::from(age) * SCORE_SCALE / u128::from(na.slash_points), na))
        })
        .collect();
    if scored.is_empty() {
        return Vec::new();
    }
    scored.sort_by_key(|(score, _)| *score);

    let total: u128 = scored.iter().map(|(score, _)| *score).sum();
    let redline = total / active.len() as u128 / 3;
    let bad: Vec<_> = scored
        .iter()
        .filter(|(score, _)| *score <= redline)
        .map(|(_, na)| *na)
        .collect();
    if bad.is_empty() {
        vec![scored[0].1]
    } else {
        bad
    }
}

/// The operator that has held its status longest.
pub fn find_old_actor(height: u64, active: &[NodeAccount]) -> Option<&NodeAccount> {
    active
        .iter()
        .filter(|na| na.status_since < height)
        .min_by_key(|na| na.status_since)
}

/// How many operators may leave a set of `count` without losing a two
/// thirds majority or dropping under four members.
pub fn find_max_able_to_leave(count: usize) -> usize {
    let majority = count * 2 / 3 + 1;
    let max = count.saturating_sub(majority);
    if count - max < 4 {
        count.saturating_sub(4)
    } else {
        max
    }
}

/// Number of leading operators of `active` (sorted by leave priority) to
/// drop this churn. One requested or forced leave is always honoured.
pub fn find_count_to_remove(height: u64, artificial_ragnarok: u64, active: &[NodeAccount]) -> usize {
    let Some(first) = active.first() else {
        return 0;
    };
    let candidates = active.iter().take_while(|na| na.is_leaving()).count();
    let max = find_max_able_to_leave(active.len());
    if max == 0 {
        let artificial = artificial_ragnarok > 0 && height >= artificial_ragnarok;
        usize::from(first.requested_to_leave || first.forced_to_leave || artificial)
    } else {
        candidates.min(max)
    }
}
