//! # Native Ledger Handlers
//!
//! Transfers of coins that live on this chain's own ledger. A native
//! transaction with a memo is settled against the asgard module and then
//! fed back through the observation path, as if the transfer had been seen
//! on an external chain.

use shared_types::{Address, Asset, Chain, Coin, Coins, Tx};
use tc_01_keeper::{ModuleName, ObservedTx, TxOutItem};
use tracing::info;

use super::helpers::require_active_signer;
use super::Handler;
use crate::constants::ConstantName;
use crate::domain::{Context, HandlerError, HandlerResult, Memo, Msg, MsgNativeTx, MsgSend, MsgSwitch};
use crate::managers::{Derived, Env, TxOutStore};

fn fee_coins(env: &Env<'_>) -> HandlerResult<Coins> {
    Ok(Coins::new(vec![Coin::new(Asset::rune_native(), env.amount(ConstantName::TransactionFee)?)]))
}

/// Fails with `InsufficientCoins` unless `owner` can pay `coins` plus the
/// transaction fee.
fn require_balance(env: &Env<'_>, owner: &Address, coins: &Coins) -> HandlerResult<()> {
    let mut total = coins.clone();
    for fee in fee_coins(env)?.iter() {
        total.add(fee.clone());
    }
    if !env.supply.has_coins(owner, &total)? {
        return Err(HandlerError::InsufficientCoins(format!("{owner} cannot pay {total}")));
    }
    Ok(())
}

fn charge_fee(env: &Env<'_>, owner: &Address) -> HandlerResult<()> {
    let fee = fee_coins(env)?;
    if fee.has_funds() {
        env.supply.send_account_to_module(owner, ModuleName::Reserve, &fee)?;
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NativeTxHandler;

impl Handler for NativeTxHandler {
    type Msg = MsgNativeTx;

    fn unwrap_msg<'m>(&self, msg: &'m Msg) -> Option<&'m Self::Msg> {
        match msg {
            Msg::NativeTx(m) => Some(m),
            _ => None,
        }
    }

    fn validate(&self, _ctx: &Context, env: &Env<'_>, msg: &Self::Msg) -> HandlerResult<()> {
        let memo = Memo::parse(&msg.memo)?;
        if !memo.tx_type().is_inbound() {
            return Err(HandlerError::InvalidMemo(format!("{} is not accepted from users", msg.memo)));
        }
        require_balance(env, &msg.signer, &msg.coins)
    }

    fn handle(&self, ctx: &Context, env: &mut Env<'_>, msg: &Self::Msg) -> HandlerResult<()> {
        let in_hash = ctx
            .tx_id
            .clone()
            .ok_or_else(|| HandlerError::unknown_request("native tx without an enclosing tx id"))?;

        charge_fee(env, &msg.signer)?;
        env.supply
            .send_account_to_module(&msg.signer, ModuleName::Asgard, &msg.coins)?;

        let asgard = env.supply.module_address(ModuleName::Asgard);
        let tx = Tx::new(
            in_hash,
            Chain::thor(),
            msg.signer.clone(),
            asgard.clone(),
            msg.coins.clone(),
            fee_coins(env)?,
            msg.memo.clone(),
        );
        let vault_pk = env
            .keeper
            .list_active_asgards()?
            .first()
            .map(|v| v.pub_key.clone())
            .unwrap_or_default();
        info!(tx = %tx.id, from = %msg.signer, memo = %msg.memo, "[dispatch] native tx");
        env.push_derived(Derived::Observed {
            tx: ObservedTx::new(tx, ctx.block_height, vault_pk),
            signer: asgard,
        });
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SendHandler;

impl Handler for SendHandler {
    type Msg = MsgSend;

    fn unwrap_msg<'m>(&self, msg: &'m Msg) -> Option<&'m Self::Msg> {
        match msg {
            Msg::Send(m) => Some(m),
            _ => None,
        }
    }

    fn validate(&self, _ctx: &Context, env: &Env<'_>, msg: &Self::Msg) -> HandlerResult<()> {
        require_balance(env, &msg.from_address, &msg.coins)
    }

    fn handle(&self, _ctx: &Context, env: &mut Env<'_>, msg: &Self::Msg) -> HandlerResult<()> {
        charge_fee(env, &msg.from_address)?;
        env.supply
            .send_account_to_account(&msg.from_address, &msg.to_address, &msg.coins)?;
        Ok(())
    }
}

/// Moves rune between its BEP2 token and the native coin. The total of
/// BEP2 rune still outstanding is tracked in the vault data.
#[derive(Debug, Clone, Copy, Default)]
pub struct SwitchHandler;

impl Handler for SwitchHandler {
    type Msg = MsgSwitch;

    fn unwrap_msg<'m>(&self, msg: &'m Msg) -> Option<&'m Self::Msg> {
        match msg {
            Msg::Switch(m) => Some(m),
            _ => None,
        }
    }

    fn validate(&self, _ctx: &Context, env: &Env<'_>, msg: &Self::Msg) -> HandlerResult<()> {
        require_active_signer(env, &msg.signer)?;
        if msg.tx.coins.len() != 1 {
            return Err(HandlerError::InvalidCoins("switch takes exactly one coin".into()));
        }
        let coin = msg.tx.coins.first().ok_or_else(|| HandlerError::InvalidCoins("no coin".into()))?;
        if !coin.asset.is_rune() {
            return Err(HandlerError::InvalidCoins(format!("cannot switch {}", coin.asset)));
        }
        if !coin.is_native() && !msg.destination.is_chain(&Chain::thor()) {
            return Err(HandlerError::unknown_request(format!(
                "{} is not a native address",
                msg.destination
            )));
        }
        Ok(())
    }

    fn handle(&self, ctx: &Context, env: &mut Env<'_>, msg: &Self::Msg) -> HandlerResult<()> {
        let coin = msg.tx.coins.first().cloned().ok_or_else(|| HandlerError::InvalidCoins("no coin".into()))?;
        let mut data = env.keeper.get_vault_data()?;

        if coin.is_native() {
            // native to BEP2
            if data.total_bep2_rune < coin.amount {
                return Err(HandlerError::InsufficientCoins(format!(
                    "only {} BEP2 rune outstanding",
                    data.total_bep2_rune
                )));
            }
            env.supply.burn(ModuleName::Asgard, &coin)?;
            data.total_bep2_rune -= coin.amount;
            env.keeper.set_vault_data(&data)?;

            let rune = Asset::rune();
            let item = TxOutItem::new(
                rune.chain.clone(),
                msg.destination.clone(),
                Coin::new(rune, coin.amount),
                msg.tx.id.clone(),
            );
            if !TxOutStore::for_version(env.version)?.try_add(ctx, env, item)? {
                return Err(HandlerError::FailAddOutboundTx(format!("switch {} to BEP2", msg.tx.id)));
            }
        } else {
            // BEP2 to native
            let native = Coin::new(Asset::rune_native(), coin.amount);
            env.supply.mint(ModuleName::Asgard, &native)?;
            env.supply
                .send_module_to_account(ModuleName::Asgard, &msg.destination, &Coins::new(vec![native]))?;
            data.total_bep2_rune += coin.amount;
            env.keeper.set_vault_data(&data)?;
        }
        info!(tx = %msg.tx.id, coin = %coin, to = %msg.destination, "[dispatch] rune switched");
        Ok(())
    }
}
