//! # Yggdrasil Handler
//!
//! Settles the internal transfers between asgard and yggdrasil vaults. The
//! sending leg must answer an item the network queued itself; a return that
//! does not land in an active asgard is theft and is slashed.

use tc_01_keeper::{Keeper, VaultsExt};
use tracing::{info, warn};

use super::helpers::{refund_bond, require_active_signer};
use super::outbound::slash_vault;
use super::Handler;
use crate::domain::{Context, HandlerResult, Msg, MsgYggdrasil};
use crate::managers::tx_out::outbound_hash;
use crate::managers::Env;

#[derive(Debug, Clone, Copy, Default)]
pub struct YggdrasilHandler;

impl YggdrasilHandler {
    /// Mark the network-initiated item this transfer answers. Returns false
    /// when nothing queued at `msg.block_height` matches.
    fn settle_item(&self, keeper: &dyn Keeper, msg: &MsgYggdrasil) -> HandlerResult<bool> {
        let mut tx_out = keeper.get_tx_out(msg.block_height)?;
        let Some(item) = tx_out.tx_array.iter_mut().find(|item| {
            item.is_pending()
                && item.in_hash.is_blank()
                && item.chain == msg.tx.chain
                && item.to_address == msg.tx.to_address
                && item.vault_pub_key == msg.pub_key
                && (!msg.add_funds || msg.tx.coins.contains(&item.coin))
        }) else {
            return Ok(false);
        };
        item.out_hash = Some(msg.tx.id.clone());
        let hash = outbound_hash(&item.chain, &item.to_address, &item.coin, &item.memo);
        keeper.set_tx_out(&tx_out)?;
        keeper.pop_tx_marker(&hash)?;
        Ok(true)
    }

    fn slash(&self, ctx: &Context, env: &mut Env<'_>, msg: &MsgYggdrasil) -> HandlerResult<()> {
        for coin in msg.tx.coins.iter() {
            slash_vault(ctx, env, &msg.pub_key, &coin.asset, coin.amount)?;
        }
        Ok(())
    }
}

impl Handler for YggdrasilHandler {
    type Msg = MsgYggdrasil;

    fn unwrap_msg<'m>(&self, msg: &'m Msg) -> Option<&'m Self::Msg> {
        match msg {
            Msg::Yggdrasil(m) => Some(m),
            _ => None,
        }
    }

    fn validate(&self, _ctx: &Context, env: &Env<'_>, msg: &Self::Msg) -> HandlerResult<()> {
        require_active_signer(env, &msg.signer)
    }

    fn handle(&self, ctx: &Context, env: &mut Env<'_>, msg: &Self::Msg) -> HandlerResult<()> {
        if !env.keeper.vault_exists(&msg.pub_key)? {
            warn!(vault = %msg.pub_key, tx = %msg.tx.id, "[vault] yggdrasil transfer on unknown vault");
            return Ok(());
        }
        let vault = env.keeper.get_vault(&msg.pub_key)?;
        let sending = vault.address(&msg.tx.chain) == msg.tx.from_address;
        if !sending {
            // arrival leg, funds were credited by the inbound observation
            info!(vault = %vault.pub_key, tx = %msg.tx.id, add_funds = msg.add_funds, "[vault] yggdrasil transfer received");
            return Ok(());
        }

        let matched = self.settle_item(env.keeper, msg)?;
        if msg.add_funds || !vault.is_yggdrasil() {
            if !matched {
                warn!(vault = %vault.pub_key, tx = %msg.tx.id, "[vault] unrequested yggdrasil funding");
                self.slash(ctx, env, msg)?;
            }
            return Ok(());
        }

        let asgards = env.keeper.list_active_asgards()?;
        let to_asgard = asgards.has_address(&msg.tx.chain, &msg.tx.to_address);
        if !matched || !to_asgard {
            warn!(vault = %vault.pub_key, to = %msg.tx.to_address, matched, "[vault] yggdrasil funds left for a non-asgard address");
            self.slash(ctx, env, msg)?;
        } else {
            info!(vault = %vault.pub_key, tx = %msg.tx.id, "[vault] yggdrasil funds returned");
        }

        let Some(na) = env.keeper.get_node_account_by_pub_key(&msg.pub_key)? else {
            return Ok(());
        };
        if na.is_active() {
            return Ok(());
        }
        // re-read, the outbound observation already took the funds out
        let vault = env.keeper.get_vault(&msg.pub_key)?;
        if !vault.has_funds() {
            refund_bond(ctx, env, &msg.tx, na)?;
        }
        Ok(())
    }
}
