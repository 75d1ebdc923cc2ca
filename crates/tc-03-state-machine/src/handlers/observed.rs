//! # Observation Handlers
//!
//! Operators report external-chain transfers into and out of vaults. Each
//! report is a vote; the first time one version of a transfer gathers a
//! supermajority of active operators it is committed, vault balances are
//! updated and the transfer is queued for memo processing.

use tc_01_keeper::{ObservedTx, VaultStatus};
use tracing::{debug, info, warn};

use super::helpers::{refund_tx, require_active_signer};
use super::outbound::slash_vault;
use super::Handler;
use crate::domain::{Context, ErrorCode, HandlerResult, Memo, Msg, MsgObservedTxIn, MsgObservedTxOut};
use crate::managers::{Derived, Env};

/// Which leg of a transfer an observation reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Leg {
    In,
    Out,
}

/// Vote on `observed`. Returns the committed transfer on the voting edge.
/// Late signers are still credited as observers.
fn vote(
    ctx: &Context,
    env: &mut Env<'_>,
    leg: Leg,
    observed: &ObservedTx,
    signer: &shared_types::Address,
) -> HandlerResult<Option<ObservedTx>> {
    let mut voter = match leg {
        Leg::In => env.keeper.get_observed_tx_voter(&observed.tx.id)?,
        Leg::Out => env.keeper.get_observed_tx_out_voter(&observed.tx.id)?,
    };
    if !voter.add(observed.clone(), signer) {
        debug!(tx = %observed.tx.id, %signer, ?leg, "[dispatch] duplicate observation");
        return Ok(None);
    }
    let active = env.keeper.list_active_node_accounts()?;
    let committed = voter.try_commit(ctx.block_height, &active);
    match leg {
        Leg::In => env.keeper.set_observed_tx_voter(&voter)?,
        Leg::Out => env.keeper.set_observed_tx_out_voter(&voter)?,
    }

    if committed.is_none() && voter.height > 0 {
        env.managers
            .observers
            .append_observer(observed.tx.chain.clone(), [signer.clone()]);
    }
    Ok(committed)
}

fn record_chain_height(env: &Env<'_>, observed: &ObservedTx) -> HandlerResult<()> {
    let chain = &observed.tx.chain;
    if observed.block_height > env.keeper.get_last_chain_height(chain)? {
        env.keeper.set_last_chain_height(chain, observed.block_height)?;
    }
    let mut chains = env.keeper.get_chains()?;
    if !chains.contains(chain) {
        chains.push(chain.clone());
        env.keeper.set_chains(&chains)?;
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ObservedTxInHandler;

impl Handler for ObservedTxInHandler {
    type Msg = MsgObservedTxIn;

    fn unwrap_msg<'m>(&self, msg: &'m Msg) -> Option<&'m Self::Msg> {
        match msg {
            Msg::ObservedTxIn(m) => Some(m),
            _ => None,
        }
    }

    fn validate(&self, _ctx: &Context, env: &Env<'_>, msg: &Self::Msg) -> HandlerResult<()> {
        require_active_signer(env, &msg.signer)
    }

    fn handle(&self, ctx: &Context, env: &mut Env<'_>, msg: &Self::Msg) -> HandlerResult<()> {
        for observed in &msg.txs {
            let Some(committed) = vote(ctx, env, Leg::In, observed, &msg.signer)? else {
                continue;
            };
            info!(height = ctx.block_height, tx = %committed.tx.id, chain = %committed.tx.chain, "[dispatch] inbound committed");

            record_chain_height(env, &committed)?;
            env.managers
                .observers
                .append_observer(committed.tx.chain.clone(), committed.signers.iter().cloned());

            let vault_pk = &committed.observed_pub_key;
            if !env.keeper.vault_exists(vault_pk)? {
                refund_tx(ctx, env, &committed, ErrorCode::InvalidVault, "unknown vault")?;
                continue;
            }
            let mut vault = env.keeper.get_vault(vault_pk)?;
            vault.add_funds(&committed.tx.coins);
            env.keeper.set_vault(&vault)?;
            if vault.status == VaultStatus::Inactive {
                refund_tx(ctx, env, &committed, ErrorCode::InvalidVault, "vault is inactive")?;
                continue;
            }

            env.push_derived(Derived::Observed {
                tx: committed,
                signer: msg.signer.clone(),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ObservedTxOutHandler;

impl Handler for ObservedTxOutHandler {
    type Msg = MsgObservedTxOut;

    fn unwrap_msg<'m>(&self, msg: &'m Msg) -> Option<&'m Self::Msg> {
        match msg {
            Msg::ObservedTxOut(m) => Some(m),
            _ => None,
        }
    }

    fn validate(&self, _ctx: &Context, env: &Env<'_>, msg: &Self::Msg) -> HandlerResult<()> {
        require_active_signer(env, &msg.signer)
    }

    fn handle(&self, ctx: &Context, env: &mut Env<'_>, msg: &Self::Msg) -> HandlerResult<()> {
        for observed in &msg.txs {
            let Some(committed) = vote(ctx, env, Leg::Out, observed, &msg.signer)? else {
                continue;
            };
            info!(height = ctx.block_height, tx = %committed.tx.id, chain = %committed.tx.chain, "[dispatch] outbound committed");

            record_chain_height(env, &committed)?;
            env.managers
                .observers
                .append_observer(committed.tx.chain.clone(), committed.signers.iter().cloned());

            let vault_pk = &committed.observed_pub_key;
            if !env.keeper.vault_exists(vault_pk)? {
                warn!(tx = %committed.tx.id, vault = %vault_pk, "[vault] outbound from unknown vault");
                continue;
            }
            let mut vault = env.keeper.get_vault(vault_pk)?;
            vault.sub_funds(&committed.tx.coins);
            vault.sub_funds(&committed.tx.gas);
            env.keeper.set_vault(&vault)?;
            env.managers.gas.add_gas(&committed.tx.gas);

            let expected = Memo::parse(&committed.tx.memo).is_ok_and(|m| m.is_outbound() || m.is_internal());
            if !expected {
                warn!(tx = %committed.tx.id, memo = %committed.tx.memo, "[vault] funds left without a valid memo");
                for coin in committed.tx.coins.iter() {
                    slash_vault(ctx, env, vault_pk, &coin.asset, coin.amount)?;
                }
                continue;
            }

            env.push_derived(Derived::Observed {
                tx: committed,
                signer: msg.signer.clone(),
            });
        }
        Ok(())
    }
}
