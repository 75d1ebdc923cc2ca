//! # Vault Manager
//!
//! Requests keygens, installs the resulting asgard and retires the ones it
//! replaces, then drains retiring vaults into the active set in growing
//! slices every `FundMigrationInterval` blocks.

use shared_types::{get_share, Coin, ProtocolVersion, TxId};
use tc_01_keeper::{Keygen, NodeAccount, TxOutItem, Vault, VaultStatus, VaultType, VaultsExt};
use tracing::{info, warn};

use super::{Env, TxOutStore, V1};
use crate::constants::ConstantName;
use crate::domain::{Context, HandlerError, HandlerResult, Memo};

/// Height at which the first asgard is created when none exists.
pub const GENESIS_BLOCK_HEIGHT: u64 = 1;

/// Migration rounds needed to move a full balance.
const MIGRATION_ROUNDS: u128 = 10;

#[derive(Debug, Clone, Copy)]
pub enum VaultManager {
    V1(VaultManagerV1),
}

impl VaultManager {
    pub fn for_version(version: ProtocolVersion) -> HandlerResult<Self> {
        if version >= V1 {
            Ok(VaultManager::V1(VaultManagerV1))
        } else {
            Err(HandlerError::BadVersion(version))
        }
    }

    pub fn trigger_keygen(&self, ctx: &Context, env: &mut Env<'_>, nodes: &[NodeAccount]) -> HandlerResult<()> {
        match self {
            VaultManager::V1(m) => m.trigger_keygen(ctx, env, nodes),
        }
    }

    pub fn rotate_vault(&self, ctx: &Context, env: &mut Env<'_>, vault: Vault) -> HandlerResult<()> {
        match self {
            VaultManager::V1(m) => m.rotate_vault(ctx, env, vault),
        }
    }

    pub fn end_block(&self, ctx: &Context, env: &mut Env<'_>) -> HandlerResult<()> {
        match self {
            VaultManager::V1(m) => m.end_block(ctx, env),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct VaultManagerV1;

impl VaultManagerV1 {
    /// Record an asgard keygen request for `nodes` at this height.
    pub fn trigger_keygen(&self, ctx: &Context, env: &mut Env<'_>, nodes: &[NodeAccount]) -> HandlerResult<()> {
        if env.keeper.ragnarok_in_progress()? {
            warn!(height = ctx.block_height, "[vault] ragnarok in progress, keygen suppressed");
            return Ok(());
        }
        let members = nodes.iter().map(|na| na.pub_key_set.secp256k1.clone()).collect();
        let keygen = Keygen::new(VaultType::Asgard, members);
        let mut block = env.keeper.get_keygen_block(ctx.block_height)?;
        block.height = ctx.block_height;
        if block.add(keygen) {
            info!(height = ctx.block_height, members = nodes.len(), "[vault] keygen requested");
        }
        env.keeper.set_keygen_block(&block)?;
        Ok(())
    }

    /// Install `vault` as active. Active asgards sharing a member with it
    /// start retiring.
    pub fn rotate_vault(&self, ctx: &Context, env: &mut Env<'_>, vault: Vault) -> HandlerResult<()> {
        for mut asgard in env.keeper.list_active_asgards()? {
            if asgard.pub_key == vault.pub_key {
                continue;
            }
            if asgard.membership.iter().any(|m| vault.contains(m)) {
                asgard.update_status(VaultStatus::Retiring, ctx.block_height)?;
                env.keeper.set_vault(&asgard)?;
                info!(vault = %asgard.pub_key, "[vault] asgard retiring");
            }
        }

        for member in &vault.membership {
            if let Some(mut na) = env.keeper.get_node_account_by_pub_key(member)? {
                na.try_add_signer_pub_key(vault.pub_key.clone());
                env.keeper.set_node_account(&na)?;
            }
        }
        env.keeper.set_vault(&vault)?;
        info!(vault = %vault.pub_key, members = vault.membership.len(), "[vault] asgard activated");
        Ok(())
    }

    pub fn end_block(&self, ctx: &Context, env: &mut Env<'_>) -> HandlerResult<()> {
        if ctx.block_height == GENESIS_BLOCK_HEIGHT {
            return self.genesis_setup(ctx, env);
        }

        let interval = env.blocks(ConstantName::FundMigrationInterval)?;
        let active = env.keeper.list_active_asgards()?;
        if active.is_empty() || interval == 0 {
            return Ok(());
        }
        let store = TxOutStore::for_version(env.version)?;

        for mut vault in env.keeper.list_retiring_asgards()? {
            if !vault.has_funds() {
                vault.update_status(VaultStatus::Inactive, ctx.block_height)?;
                env.keeper.set_vault(&vault)?;
                info!(vault = %vault.pub_key, "[vault] retired vault emptied");
                continue;
            }

            let elapsed = ctx.block_height.saturating_sub(vault.status_since);
            if elapsed % interval != 0 {
                continue;
            }
            if elapsed >= interval && self.has_pending(env, &vault, ctx.block_height - interval)? {
                info!(vault = %vault.pub_key, "[vault] previous migration still pending");
                continue;
            }

            let nth = u128::from(elapsed / interval + 1).min(MIGRATION_ROUNDS);
            for coin in vault.coins.iter().filter(|c| !c.is_empty()) {
                let Some(target) = active.least_of(&coin.asset) else {
                    continue;
                };
                let amount = get_share(nth, MIGRATION_ROUNDS, coin.amount);
                let mut item = TxOutItem::new(
                    coin.asset.chain.clone(),
                    target.address(&coin.asset.chain),
                    Coin::new(coin.asset.clone(), amount),
                    TxId::blank(),
                );
                item.vault_pub_key = vault.pub_key.clone();
                item.memo = Memo::Migrate {
                    block_height: ctx.block_height,
                }
                .to_string();
                store.unsafe_add(ctx, env, item)?;
            }
            info!(vault = %vault.pub_key, round = nth as u64, "[vault] migration queued");
        }
        Ok(())
    }

    fn has_pending(&self, env: &Env<'_>, vault: &Vault, height: u64) -> HandlerResult<bool> {
        Ok(env
            .keeper
            .get_tx_out(height)?
            .tx_array
            .iter()
            .any(|item| item.vault_pub_key == vault.pub_key && item.is_pending()))
    }

    /// First block: a lone operator gets a vault keyed by itself; a larger
    /// set runs a keygen.
    fn genesis_setup(&self, ctx: &Context, env: &mut Env<'_>) -> HandlerResult<()> {
        let has_asgard = env.keeper.list_vaults()?.iter().any(Vault::is_asgard);
        if has_asgard {
            return Ok(());
        }
        let active = env.keeper.list_active_node_accounts()?;
        match active.as_slice() {
            [] => Err(HandlerError::internal("no active node accounts at genesis")),
            [only] => {
                let pk = only.pub_key_set.secp256k1.clone();
                let mut vault = Vault::new(0, VaultStatus::Active, VaultType::Asgard, pk.clone());
                vault.membership = vec![pk];
                vault.add_chain(shared_types::Asset::rune().chain);
                env.keeper.set_vault(&vault)?;
                Ok(())
            }
            _ => self.trigger_keygen(ctx, env, &active),
        }
    }
}
