//! Keygen and keysign outcome votes.

use shared_types::{Address, PubKey};
use tc_01_keeper::{ConsensusVoter, TssKeysignFailVoter, TssVoter, Vault, VaultStatus};
use tracing::{debug, info, warn};

use super::helpers::require_active_signer;
use super::Handler;
use crate::constants::ConstantName;
use crate::domain::{Context, HandlerResult, Msg, MsgTssKeysignFail, MsgTssPool};
use crate::managers::{Env, Slasher, VaultManager};

/// Operator addresses behind the blamed keys; unknown keys are skipped.
fn blamed_addresses(env: &Env<'_>, blame: &[PubKey]) -> HandlerResult<Vec<Address>> {
    let mut addrs = Vec::with_capacity(blame.len());
    for pk in blame {
        match env.keeper.get_node_account_by_pub_key(pk)? {
            Some(na) => addrs.push(na.node_address),
            None => warn!(%pk, "[vault] blamed key belongs to no operator"),
        }
    }
    Ok(addrs)
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TssPoolHandler;

impl Handler for TssPoolHandler {
    type Msg = MsgTssPool;

    fn unwrap_msg<'m>(&self, msg: &'m Msg) -> Option<&'m Self::Msg> {
        match msg {
            Msg::TssPool(m) => Some(m),
            _ => None,
        }
    }

    fn validate(&self, _ctx: &Context, env: &Env<'_>, msg: &Self::Msg) -> HandlerResult<()> {
        require_active_signer(env, &msg.signer)
    }

    fn handle(&self, ctx: &Context, env: &mut Env<'_>, msg: &Self::Msg) -> HandlerResult<()> {
        let mut voter = env.keeper.get_tss_voter(&msg.id)?;
        if voter.id.is_empty() {
            voter = TssVoter::new(
                msg.id.clone(),
                msg.pool_pub_key.clone(),
                msg.pub_keys.clone(),
                msg.keygen_type,
                msg.height,
            );
        }
        if !voter.sign(msg.signer.clone()) {
            debug!(id = %msg.id, signer = %msg.signer, "[vault] duplicate keygen vote");
            return Ok(());
        }

        let active = env.keeper.list_active_node_accounts()?;
        if voter.commit(ctx.block_height, &active) {
            if msg.is_success() {
                let mut vault = Vault::new(ctx.block_height, VaultStatus::Active, msg.keygen_type, msg.pool_pub_key.clone());
                vault.membership = msg.pub_keys.clone();
                vault.chains = msg.chains.clone();
                if vault.is_asgard() {
                    VaultManager::for_version(env.version)?.rotate_vault(ctx, env, vault)?;
                } else {
                    env.keeper.set_vault(&vault)?;
                    info!(vault = %vault.pub_key, "[vault] yggdrasil created");
                }
            } else {
                let blamed = blamed_addresses(env, &msg.blame)?;
                warn!(id = %msg.id, blamed = blamed.len(), "[vault] keygen failed");
                let points = env.int(ConstantName::FailKeygenSlashPoints)?.max(0) as u64;
                Slasher::for_version(env.version)?.inc_slash_points(env, points, &blamed)?;
            }
        }
        env.keeper.set_tss_voter(&voter)?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TssKeysignFailHandler;

impl Handler for TssKeysignFailHandler {
    type Msg = MsgTssKeysignFail;

    fn unwrap_msg<'m>(&self, msg: &'m Msg) -> Option<&'m Self::Msg> {
        match msg {
            Msg::TssKeysignFail(m) => Some(m),
            _ => None,
        }
    }

    fn validate(&self, _ctx: &Context, env: &Env<'_>, msg: &Self::Msg) -> HandlerResult<()> {
        require_active_signer(env, &msg.signer)
    }

    fn handle(&self, ctx: &Context, env: &mut Env<'_>, msg: &Self::Msg) -> HandlerResult<()> {
        let mut voter = env.keeper.get_keysign_fail_voter(&msg.id)?;
        if voter.id.is_empty() {
            voter = TssKeysignFailVoter::new(msg.id.clone());
        }
        if !voter.sign(msg.signer.clone()) {
            return Ok(());
        }

        let active = env.keeper.list_active_node_accounts()?;
        if voter.commit(ctx.block_height, &active) {
            let blamed = blamed_addresses(env, &msg.blame)?;
            warn!(id = %msg.id, height = msg.height, blamed = blamed.len(), "[vault] keysign failed");
            let points = env.int(ConstantName::FailKeySignSlashPoints)?.max(0) as u64;
            Slasher::for_version(env.version)?.inc_slash_points(env, points, &blamed)?;
        }
        env.keeper.set_keysign_fail_voter(&voter)?;
        Ok(())
    }
}
