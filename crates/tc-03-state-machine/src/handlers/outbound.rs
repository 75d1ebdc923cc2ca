//! # Outbound Handler
//!
//! Matches a committed outbound observation against the queued item it
//! fulfils. Whatever a vault sent beyond what it was asked to send is
//! slashed from its operators' bonds.

use shared_types::{Amount, Asset, Coin, PubKey, Tx};
use tc_01_keeper::{Event, EventPayload, EventStatus};
use tracing::{debug, info, warn};

use super::helpers::require_active_signer;
use super::Handler;
use crate::domain::{Context, HandlerResult, Memo, Msg, MsgNoOp, MsgOutbound};
use crate::managers::tx_out::outbound_hash;
use crate::managers::{Env, Slasher};

/// Slash `amount` of `asset` from whoever controls `pub_key`: the owner of
/// an yggdrasil, or every member of an asgard in equal parts.
pub(crate) fn slash_vault(
    ctx: &Context,
    env: &mut Env<'_>,
    pub_key: &PubKey,
    asset: &Asset,
    amount: Amount,
) -> HandlerResult<()> {
    let slasher = Slasher::for_version(env.version)?;
    if env.keeper.get_node_account_by_pub_key(pub_key)?.is_some() {
        return slasher.slash_node_account(ctx, env, pub_key, asset, amount);
    }
    if !env.keeper.vault_exists(pub_key)? {
        warn!(vault = %pub_key, "[vault] nobody to slash for unknown vault");
        return Ok(());
    }
    let vault = env.keeper.get_vault(pub_key)?;
    let mut members = Vec::new();
    for member in &vault.membership {
        if env.keeper.get_node_account_by_pub_key(member)?.is_some() {
            members.push(member.clone());
        }
    }
    if members.is_empty() {
        warn!(vault = %pub_key, "[vault] vault has no known members to slash");
        return Ok(());
    }
    let share = amount / members.len() as Amount;
    for member in &members {
        slasher.slash_node_account(ctx, env, member, asset, share)?;
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, Default)]
pub struct OutboundHandler;

impl OutboundHandler {
    /// Mark the queued item the external transfer fulfils and slash what
    /// it does not account for.
    fn settle_external(&self, ctx: &Context, env: &mut Env<'_>, msg: &MsgOutbound, fallback_height: u64) -> HandlerResult<()> {
        let tx = &msg.tx.tx;
        let vault_pk = &msg.tx.observed_pub_key;
        let internal = Memo::parse(&tx.memo).is_ok_and(|m| m.is_internal());

        if internal && vault_pk.address(&tx.chain) != tx.from_address {
            // arrival leg of a migration or ragnarok transfer
            for coin in tx.coins.iter() {
                env.keeper
                    .pop_tx_marker(&outbound_hash(&tx.chain, &tx.to_address, coin, &tx.memo))?;
            }
            debug!(tx = %tx.id, "[txout] internal transfer arrived");
            return Ok(());
        }

        for coin in tx.coins.iter() {
            let sent = self.match_item(env, msg, coin, fallback_height)?;
            let excess = coin.amount.saturating_sub(sent);
            if excess > 0 {
                warn!(tx = %tx.id, coin = %coin, excess = excess as u64, "[txout] vault sent more than queued");
                slash_vault(ctx, env, vault_pk, &coin.asset, excess)?;
            }
        }
        Ok(())
    }

    /// Amount the matched item asked for, zero when nothing matched.
    fn match_item(&self, env: &Env<'_>, msg: &MsgOutbound, coin: &Coin, fallback_height: u64) -> HandlerResult<Amount> {
        let tx = &msg.tx.tx;
        let hash = outbound_hash(&tx.chain, &tx.to_address, coin, &tx.memo);
        let height = match env.keeper.list_tx_markers(&hash)?.first() {
            Some(marker) => marker.height,
            None => fallback_height,
        };
        if height == 0 {
            return Ok(0);
        }

        let mut tx_out = env.keeper.get_tx_out(height)?;
        let Some(item) = tx_out.tx_array.iter_mut().find(|item| {
            item.is_pending()
                && item.in_hash == msg.in_tx_id
                && item.chain == tx.chain
                && item.to_address == tx.to_address
                && item.coin.asset == coin.asset
                && item.vault_pub_key == msg.tx.observed_pub_key
        }) else {
            warn!(tx = %tx.id, coin = %coin, height, "[txout] no queued item matches the outbound");
            return Ok(0);
        };

        item.out_hash = Some(tx.id.clone());
        let asked = item.coin.amount;
        let item_hash = outbound_hash(&item.chain, &item.to_address, &item.coin, &item.memo);
        env.keeper.set_tx_out(&tx_out)?;
        env.keeper.pop_tx_marker(&item_hash)?;
        info!(tx = %tx.id, in_hash = %msg.in_tx_id, height, "[txout] outbound matched");
        Ok(asked)
    }
}

impl Handler for OutboundHandler {
    type Msg = MsgOutbound;

    fn unwrap_msg<'m>(&self, msg: &'m Msg) -> Option<&'m Self::Msg> {
        match msg {
            Msg::Outbound(m) => Some(m),
            _ => None,
        }
    }

    fn validate(&self, _ctx: &Context, env: &Env<'_>, msg: &Self::Msg) -> HandlerResult<()> {
        require_active_signer(env, &msg.signer)
    }

    fn handle(&self, ctx: &Context, env: &mut Env<'_>, msg: &Self::Msg) -> HandlerResult<()> {
        let tx = &msg.tx.tx;
        let mut completed: Option<Tx> = None;
        let mut fallback_height = 0;

        if !msg.in_tx_id.is_blank() {
            let mut voter = env.keeper.get_observed_tx_voter(&msg.in_tx_id)?;
            if !voter.add_out_tx(tx.clone()) {
                debug!(tx = %tx.id, "[txout] outbound already recorded");
                return Ok(());
            }
            env.keeper.set_observed_tx_voter(&voter)?;
            fallback_height = voter.height;
            if voter.is_done() {
                let mut in_tx = voter.tx.tx.clone();
                in_tx.id = msg.in_tx_id.clone();
                completed = Some(in_tx);
            }
        }

        if !tx.chain.is_native() {
            self.settle_external(ctx, env, msg, fallback_height)?;
        }

        if let Some(in_tx) = completed {
            env.emit(Event::new(
                ctx.block_height,
                in_tx,
                EventPayload::Outbound {
                    in_tx_id: msg.in_tx_id.clone(),
                    tx: tx.clone(),
                },
                EventStatus::Success,
            ));
        }
        Ok(())
    }
}

/// Transfers that need no processing, such as gas top-ups.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpHandler;

impl Handler for NoOpHandler {
    type Msg = MsgNoOp;

    fn unwrap_msg<'m>(&self, msg: &'m Msg) -> Option<&'m Self::Msg> {
        match msg {
            Msg::NoOp(m) => Some(m),
            _ => None,
        }
    }

    fn validate(&self, _ctx: &Context, env: &Env<'_>, msg: &Self::Msg) -> HandlerResult<()> {
        require_active_signer(env, &msg.signer)
    }

    fn handle(&self, _ctx: &Context, _env: &mut Env<'_>, msg: &Self::Msg) -> HandlerResult<()> {
        debug!(tx = %msg.tx.tx.id, memo = %msg.tx.tx.memo, "[dispatch] no-op");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::managers::testing::Fixture;
    use crate::managers::{TxOutStore, V1};
    use shared_types::{Address, Chain, Coins, TxId};
    use tc_01_keeper::{Keeper, ObservedTx, Pool, PoolStatus, TxOutItem, Vault, VaultStatus, VaultType};

    fn bnb() -> Asset {
        "BNB.BNB".parse().unwrap()
    }

    struct Setup {
        fx: Fixture,
        asgard: Vault,
        in_hash: TxId,
    }

    /// Two members back the asgard; one refund of 5 BNB is queued at height 3.
    fn setup() -> Setup {
        let mut fx = Fixture::new();
        let n1 = fx.active_node(1, 10_000_000_000);
        let n2 = fx.active_node(2, 10_000_000_000);
        let mut asgard = Vault::new(1, VaultStatus::Active, VaultType::Asgard, PubKey::new("asgardpk"));
        asgard.membership = vec![n1.pub_key_set.secp256k1.clone(), n2.pub_key_set.secp256k1.clone()];
        asgard.add_funds(&Coins::new(vec![Coin::new(bnb(), 100_000_000_000)]));
        fx.keeper.set_vault(&asgard).unwrap();
        fx.keeper
            .set_pool(&Pool {
                balance_rune: 10_000_000_000,
                balance_asset: 10_000_000_000,
                asset: bnb(),
                pool_units: 10_000_000_000,
                status: PoolStatus::Enabled,
            })
            .unwrap();

        let in_hash = TxId::from_bytes(b"inbound");
        let mut item = TxOutItem::new(Chain::bnb(), Address::new("bnb1user"), Coin::new(bnb(), 600_000_000), in_hash.clone());
        item.vault_pub_key = asgard.pub_key.clone();
        TxOutStore::for_version(V1)
            .unwrap()
            .try_add(&Context::new(3), &mut fx.env(), item)
            .unwrap();
        Setup { fx, asgard, in_hash }
    }

    fn outbound(s: &Setup, amount: u128, id: &[u8]) -> Msg {
        let tx = Tx::new(
            TxId::from_bytes(id),
            Chain::bnb(),
            s.asgard.address(&Chain::bnb()),
            Address::new("bnb1user"),
            Coins::new(vec![Coin::new(bnb(), amount)]),
            Coins::default(),
            format!("OUTBOUND:{}", s.in_hash),
        );
        Msg::Outbound(MsgOutbound {
            tx: ObservedTx::new(tx, 60, s.asgard.pub_key.clone()),
            in_tx_id: s.in_hash.clone(),
            signer: Address::new("thor1"),
        })
    }

    #[test]
    fn test_exact_outbound_completes_inbound() {
        let mut s = setup();
        let msg = outbound(&s, 500_000_000, b"out1");
        OutboundHandler.run(&Context::new(8), &mut s.fx.env(), &msg).unwrap();

        let item = &s.fx.keeper.get_tx_out(3).unwrap().tx_array[0];
        assert_eq!(item.out_hash, Some(TxId::from_bytes(b"out1")));
        let last = s.fx.managers.events.events().last().unwrap().clone();
        assert_eq!(last.kind(), "outbound");
        assert_eq!(last.status, EventStatus::Success);
        assert_eq!(s.fx.keeper.get_node_account(&Address::new("thor1")).unwrap().bond, 10_000_000_000);

        // replay is a no-op
        let before = s.fx.managers.events.events().len();
        OutboundHandler.run(&Context::new(9), &mut s.fx.env(), &msg).unwrap();
        assert_eq!(s.fx.managers.events.events().len(), before);
    }

    #[test]
    fn test_overpayment_is_slashed_across_members() {
        let mut s = setup();
        let msg = outbound(&s, 700_000_000, b"out2");
        OutboundHandler.run(&Context::new(8), &mut s.fx.env(), &msg).unwrap();

        // the 2 BNB excess is split between both members
        for node in ["thor1", "thor2"] {
            let bond = s.fx.keeper.get_node_account(&Address::new(node)).unwrap().bond;
            assert!(bond < 10_000_000_000);
            assert!(bond > 10_000_000_000 - 150_000_000);
        }
        assert_eq!(s.fx.keeper.get_tx_out(3).unwrap().tx_array[0].out_hash, Some(TxId::from_bytes(b"out2")));
    }

    #[test]
    fn test_unknown_outbound_slashes_everything() {
        let mut s = setup();
        let tx = Tx::new(
            TxId::from_bytes(b"rogue"),
            Chain::bnb(),
            s.asgard.address(&Chain::bnb()),
            Address::new("bnb1other"),
            Coins::new(vec![Coin::new(bnb(), 200_000_000)]),
            Coins::default(),
            "OUTBOUND:nothing",
        );
        let msg = Msg::Outbound(MsgOutbound {
            tx: ObservedTx::new(tx, 60, s.asgard.pub_key.clone()),
            in_tx_id: TxId::from_bytes(b"nothing"),
            signer: Address::new("thor1"),
        });
        OutboundHandler.run(&Context::new(8), &mut s.fx.env(), &msg).unwrap();
        let bond = s.fx.keeper.get_node_account(&Address::new("thor1")).unwrap().bond;
        assert!(bond < 10_000_000_000);
        assert!(s.fx.keeper.get_tx_out(3).unwrap().tx_array[0].is_pending());
    }
}
