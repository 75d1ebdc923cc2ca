//! Building blocks shared by several handlers: signer checks, turning an
//! observed transfer into a message, refunds and bond settlement.

use shared_types::{get_share, safe_sub, Address, Amount, Asset, Coin, Coins, Tx, TxId};
use tc_01_keeper::{
    BondType, Event, EventPayload, EventStatus, ModuleName, NodeAccount, NodeStatus, ObservedTx, Pool, PoolStatus,
    ReserveContributor, TxOutItem, Vault, VaultsExt,
};
use tracing::{info, warn};

use crate::constants::ConstantName;
use crate::domain::{
    Context, ErrorCode, HandlerError, HandlerResult, Memo, Msg, MsgAdd, MsgBond, MsgLeave, MsgNoOp, MsgOutbound,
    MsgReserveContributor, MsgStake, MsgSwap, MsgSwitch, MsgUnstake, MsgYggdrasil, MAX_BASIS_POINTS,
};
use crate::managers::{Env, TxOutStore};

/// The asgard module counts as an active signer: it signs observations of
/// transfers the native ledger already settled.
pub fn is_signed_by_active_node(env: &Env<'_>, signer: &Address) -> HandlerResult<bool> {
    if signer.is_empty() {
        return Ok(false);
    }
    if *signer == env.supply.module_address(ModuleName::Asgard) {
        return Ok(true);
    }
    Ok(env.keeper.get_node_account(signer)?.is_active())
}

pub fn require_active_signer(env: &Env<'_>, signer: &Address) -> HandlerResult<()> {
    if is_signed_by_active_node(env, signer)? {
        Ok(())
    } else {
        Err(HandlerError::unauthorized(format!("{signer} is not an active node account")))
    }
}

fn rune_amount(coins: &Coins) -> Amount {
    coins.iter().filter(|c| c.asset.is_rune()).map(|c| c.amount).sum()
}

fn only_rune(coins: &Coins, what: &str) -> HandlerResult<Amount> {
    if coins.iter().any(|c| !c.asset.is_rune()) {
        return Err(HandlerError::InvalidCoins(format!("{what} only accepts rune")));
    }
    Ok(rune_amount(coins))
}

/// Translate a committed observation into the message its memo asks for.
pub fn process_one_tx_in(env: &Env<'_>, observed: &ObservedTx, signer: &Address) -> HandlerResult<Msg> {
    let tx = &observed.tx;
    if tx.coins.is_empty() {
        return Err(HandlerError::InvalidCoins("no coin found".into()));
    }
    let memo = Memo::parse(&tx.memo)?;
    let signer = signer.clone();

    let msg = match memo {
        Memo::Stake { asset, address } => {
            if tx.coins.len() > 2 {
                return Err(HandlerError::InvalidCoins("stake takes at most two coins".into()));
            }
            if tx.coins.iter().any(|c| !c.asset.is_rune() && c.asset != asset) {
                return Err(HandlerError::InvalidCoins(format!("stake into {asset} carries a foreign coin")));
            }
            let (rune_address, asset_address) = if tx.chain.is_bnb() || tx.chain.is_native() {
                let asset_address = if address.is_empty() && asset.chain == tx.chain {
                    tx.from_address.clone()
                } else {
                    address
                };
                (tx.from_address.clone(), asset_address)
            } else {
                (address, tx.from_address.clone())
            };
            Msg::Stake(MsgStake {
                tx: tx.clone(),
                rune_amount: rune_amount(&tx.coins),
                asset_amount: tx.coins.amount_of(&asset),
                asset,
                rune_address,
                asset_address,
                signer,
            })
        }
        Memo::Unstake { asset, basis_points } => Msg::Unstake(MsgUnstake {
            tx: tx.clone(),
            rune_address: tx.from_address.clone(),
            basis_points: basis_points.unwrap_or(MAX_BASIS_POINTS),
            asset,
            signer,
        }),
        Memo::Swap {
            asset,
            destination,
            trade_target,
        } => {
            let destination = if destination.is_empty() {
                tx.from_address.clone()
            } else {
                destination
            };
            Msg::Swap(MsgSwap {
                tx: tx.clone(),
                target_asset: asset,
                destination,
                trade_target,
                signer,
            })
        }
        Memo::Add { asset } => {
            if tx.coins.iter().any(|c| !c.asset.is_rune() && c.asset != asset) {
                return Err(HandlerError::InvalidCoins(format!("add to {asset} carries a foreign coin")));
            }
            Msg::Add(MsgAdd {
                tx: tx.clone(),
                rune_amount: rune_amount(&tx.coins),
                asset_amount: tx.coins.amount_of(&asset),
                asset,
                signer,
            })
        }
        Memo::Gas => Msg::NoOp(MsgNoOp {
            tx: observed.clone(),
            signer,
        }),
        Memo::Outbound { tx_id } | Memo::Refund { tx_id } => Msg::Outbound(MsgOutbound {
            tx: observed.clone(),
            in_tx_id: tx_id,
            signer,
        }),
        Memo::Migrate { .. } | Memo::Ragnarok { .. } => Msg::Outbound(MsgOutbound {
            tx: observed.clone(),
            in_tx_id: TxId::blank(),
            signer,
        }),
        Memo::Bond { node_address } => Msg::Bond(MsgBond {
            tx: tx.clone(),
            node_address,
            bond: only_rune(&tx.coins, "bond")?,
            bond_address: tx.from_address.clone(),
            signer,
        }),
        Memo::Leave => {
            let na = env
                .keeper
                .list_node_accounts()?
                .into_iter()
                .find(|na| na.bond_address == tx.from_address)
                .ok_or_else(|| HandlerError::unknown_request(format!("no node account bonded from {}", tx.from_address)))?;
            Msg::Leave(MsgLeave {
                tx: tx.clone(),
                node_address: na.node_address,
                signer,
            })
        }
        Memo::YggdrasilFund { block_height } => yggdrasil_msg(observed, true, block_height, signer),
        Memo::YggdrasilReturn { block_height } => yggdrasil_msg(observed, false, block_height, signer),
        Memo::Reserve => Msg::ReserveContributor(MsgReserveContributor {
            tx: tx.clone(),
            contributor: ReserveContributor::new(tx.from_address.clone(), only_rune(&tx.coins, "reserve")?),
            signer,
        }),
        Memo::Switch { destination } => Msg::Switch(MsgSwitch {
            tx: tx.clone(),
            destination,
            signer,
        }),
    };
    msg.validate_basic()?;
    Ok(msg)
}

fn yggdrasil_msg(observed: &ObservedTx, add_funds: bool, block_height: u64, signer: Address) -> Msg {
    Msg::Yggdrasil(MsgYggdrasil {
        tx: observed.tx.clone(),
        pub_key: observed.observed_pub_key.clone(),
        add_funds,
        coins: observed.tx.coins.clone(),
        block_height,
        signer,
    })
}

/// Send every refundable coin of `observed` back to its sender. A coin is
/// refundable when it is rune or its pool holds rune to pay the fee.
pub fn refund_tx(
    ctx: &Context,
    env: &mut Env<'_>,
    observed: &ObservedTx,
    code: ErrorCode,
    reason: &str,
) -> HandlerResult<()> {
    let tx = &observed.tx;
    let store = TxOutStore::for_version(env.version)?;
    let memo = Memo::Refund { tx_id: tx.id.clone() }.to_string();

    let mut queued = 0usize;
    for coin in tx.coins.iter() {
        if !coin.asset.is_rune() && env.keeper.get_pool(&coin.asset)?.balance_rune == 0 {
            info!(tx = %tx.id, coin = %coin, "[dispatch] coin kept, no pool to charge the refund fee");
            continue;
        }
        let mut item = TxOutItem::new(tx.chain.clone(), tx.from_address.clone(), coin.clone(), tx.id.clone());
        item.vault_pub_key = observed.observed_pub_key.clone();
        item.memo = memo.clone();
        if store.try_add(ctx, env, item)? {
            queued += 1;
        }
    }

    let status = if queued > 0 {
        EventStatus::Pending
    } else {
        EventStatus::Success
    };
    env.emit(Event::new(
        ctx.block_height,
        tx.clone(),
        EventPayload::Refund {
            code: code.as_u32(),
            reason: reason.to_string(),
        },
        status,
    ));
    info!(tx = %tx.id, code = %code, queued, "[dispatch] refunded");
    Ok(())
}

/// Rune value of everything an yggdrasil vault holds.
pub fn total_ygg_value_in_rune(env: &Env<'_>, ygg: &Vault) -> HandlerResult<Amount> {
    let mut total = 0;
    for coin in ygg.coins.iter() {
        if coin.asset.is_rune() {
            total += coin.amount;
        } else {
            total += env.keeper.get_pool(&coin.asset)?.asset_value_in_rune(coin.amount);
        }
    }
    Ok(total)
}

/// Return the bond of a departing operator, less 1.5x whatever its
/// yggdrasil still holds, and disable the account. Active operators are
/// left alone; they leave through churn.
pub fn refund_bond(ctx: &Context, env: &mut Env<'_>, tx: &Tx, mut na: NodeAccount) -> HandlerResult<()> {
    if na.is_active() {
        info!(node = %na.node_address, "[validator] active node keeps its bond until churned out");
        return Ok(());
    }

    let ygg = env.keeper.get_yggdrasil(&na)?;
    let ygg_rune = match &ygg {
        Some(vault) => total_ygg_value_in_rune(env, vault)?,
        None => 0,
    };
    if na.bond < ygg_rune {
        warn!(node = %na.node_address, bond = na.bond as u64, held = ygg_rune as u64, "[validator] bond below yggdrasil holdings");
    }

    let bond_before = na.bond;
    let mut slash_rune = ygg_rune * 3 / 2;
    na.bond = safe_sub(na.bond, slash_rune);

    if na.bond > 0 {
        let asgards = env.keeper.list_active_asgards()?;
        let vault = asgards
            .least_of(&Asset::rune())
            .ok_or_else(|| HandlerError::InvalidVault("no active asgard to return the bond from".into()))?;
        env.emit(Event::new(
            ctx.block_height,
            tx.clone(),
            EventPayload::Bond {
                amount: na.bond,
                bond_type: BondType::Returned,
            },
            EventStatus::Success,
        ));
        let mut item = TxOutItem::new(
            Asset::rune().chain,
            na.bond_address.clone(),
            Coin::new(Asset::rune(), na.bond),
            tx.id.clone(),
        );
        item.vault_pub_key = vault.pub_key.clone();
        TxOutStore::for_version(env.version)?.try_add(ctx, env, item)?;
    } else {
        slash_rune = bond_before;
    }

    na.bond = 0;
    na.update_status(NodeStatus::Disabled, ctx.block_height)?;
    env.keeper.set_node_account(&na)?;
    info!(node = %na.node_address, slashed = slash_rune as u64, "[validator] bond refunded");

    if let Some(ygg) = ygg {
        subsidize_pools_with_slash(env, &ygg, ygg_rune, slash_rune)?;
        if !ygg.has_funds() {
            env.keeper.delete_vault(&ygg.pub_key)?;
        }
    }
    Ok(())
}

/// Every `NewPoolCycle` blocks the bootstrap pool holding the most rune,
/// with both sides funded, is enabled for swaps.
pub fn enable_next_pool(ctx: &Context, env: &mut Env<'_>) -> HandlerResult<Option<Asset>> {
    let cycle = env.blocks(ConstantName::NewPoolCycle)?;
    if cycle == 0 || ctx.block_height % cycle != 0 {
        return Ok(None);
    }
    let candidate = env
        .keeper
        .list_pools()?
        .into_iter()
        .filter(|p| p.status == PoolStatus::Bootstrap && p.balance_asset > 0 && p.balance_rune > 0)
        .fold(None::<Pool>, |best, p| match best {
            Some(b) if b.balance_rune >= p.balance_rune => Some(b),
            _ => Some(p),
        });
    let Some(mut pool) = candidate else {
        return Ok(None);
    };

    pool.status = PoolStatus::Enabled;
    env.keeper.set_pool(&pool)?;
    env.emit(Event::new(
        ctx.block_height,
        Tx::default(),
        EventPayload::Pool {
            pool: pool.asset.clone(),
            status: PoolStatus::Enabled,
        },
        EventStatus::Success,
    ));
    info!(pool = %pool.asset, rune = pool.balance_rune, "[dispatch] pool enabled");
    Ok(Some(pool.asset))
}

/// Pools whose assets an yggdrasil kept are compensated from the slash,
/// pro rata to the rune value taken from each.
fn subsidize_pools_with_slash(env: &Env<'_>, ygg: &Vault, total_stolen: Amount, slash_rune: Amount) -> HandlerResult<()> {
    if slash_rune == 0 {
        return Ok(());
    }
    let stolen_rune = ygg.amount_of(&Asset::rune());
    let slash_rune = safe_sub(slash_rune, stolen_rune);
    let total_stolen = safe_sub(total_stolen, stolen_rune);
    if total_stolen == 0 {
        return Ok(());
    }

    for coin in ygg.coins.iter().filter(|c| !c.asset.is_rune() && c.amount > 0) {
        let mut pool = env.keeper.get_pool(&coin.asset)?;
        if pool.is_empty() {
            continue;
        }
        let stolen_value = pool.asset_value_in_rune(coin.amount);
        pool.balance_rune += get_share(stolen_value, total_stolen, slash_rune);
        pool.balance_asset = safe_sub(pool.balance_asset, coin.amount);
        env.keeper.set_pool(&pool)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::managers::testing::{node, Fixture};
    use shared_types::{Chain, PubKey};
    use tc_01_keeper::{Keeper, Supply, VaultStatus, VaultType};

    fn bnb() -> Asset {
        "BNB.BNB".parse().unwrap()
    }

    fn btc() -> Asset {
        "BTC.BTC".parse().unwrap()
    }

    fn observed(chain: Chain, from: &str, coins: Vec<Coin>, memo: &str) -> ObservedTx {
        let tx = Tx::new(
            TxId::from_bytes(memo.as_bytes()),
            chain,
            Address::new(from),
            Address::new("vaultaddr"),
            Coins::new(coins),
            Coins::default(),
            memo,
        );
        ObservedTx::new(tx, 1, PubKey::new("asgardpk"))
    }

    fn seed_pool(fx: &Fixture, asset: Asset) {
        fx.keeper
            .set_pool(&Pool {
                balance_rune: 1_000_000_000,
                balance_asset: 1_000_000_000,
                asset,
                pool_units: 1_000_000_000,
                status: PoolStatus::Enabled,
            })
            .unwrap();
    }

    fn seed_asgard(fx: &Fixture) -> Vault {
        let mut asgard = Vault::new(1, VaultStatus::Active, VaultType::Asgard, PubKey::new("asgardpk"));
        asgard.add_funds(&Coins::new(vec![
            Coin::new(bnb(), 10_000_000_000),
            Coin::new(Asset::rune(), 10_000_000_000),
        ]));
        fx.keeper.set_vault(&asgard).unwrap();
        asgard
    }

    #[test]
    fn test_asgard_module_is_an_active_signer() {
        let mut fx = Fixture::new();
        fx.keeper.set_node_account(&node(1, NodeStatus::Standby, 0)).unwrap();
        let asgard = fx.supply.module_address(ModuleName::Asgard);
        let env = fx.env();
        assert!(is_signed_by_active_node(&env, &asgard).unwrap());
        assert!(!is_signed_by_active_node(&env, &Address::new("thor1")).unwrap());
        assert!(!is_signed_by_active_node(&env, &Address::default()).unwrap());
    }

    #[test]
    fn test_stake_addresses_follow_the_chain() {
        let mut fx = Fixture::new();
        let signer = Address::new("thor1");

        let on_bnb = observed(
            Chain::bnb(),
            "bnb1staker",
            vec![Coin::new(Asset::rune(), 10), Coin::new(bnb(), 10)],
            "STAKE:BNB.BNB",
        );
        let Msg::Stake(msg) = process_one_tx_in(&fx.env(), &on_bnb, &signer).unwrap() else {
            panic!("expected a stake");
        };
        assert_eq!(msg.rune_address, Address::new("bnb1staker"));
        assert_eq!(msg.asset_address, Address::new("bnb1staker"));
        assert_eq!(msg.rune_amount, 10);
        assert_eq!(msg.asset_amount, 10);

        let on_btc = observed(Chain::btc(), "bc1staker", vec![Coin::new(btc(), 5)], "STAKE:BTC.BTC:bnb1staker");
        let Msg::Stake(msg) = process_one_tx_in(&fx.env(), &on_btc, &signer).unwrap() else {
            panic!("expected a stake");
        };
        assert_eq!(msg.rune_address, Address::new("bnb1staker"));
        assert_eq!(msg.asset_address, Address::new("bc1staker"));
    }

    #[test]
    fn test_swap_destination_defaults_to_sender() {
        let mut fx = Fixture::new();
        let tx = observed(Chain::bnb(), "bnb1user", vec![Coin::new(bnb(), 10)], "SWAP:BNB.RUNE-A1F");
        let Msg::Swap(msg) = process_one_tx_in(&fx.env(), &tx, &Address::new("thor1")).unwrap() else {
            panic!("expected a swap");
        };
        assert_eq!(msg.destination, Address::new("bnb1user"));
    }

    #[test]
    fn test_leave_resolves_node_by_bond_address() {
        let mut fx = Fixture::new();
        fx.keeper.set_node_account(&node(3, NodeStatus::Standby, 100)).unwrap();
        let tx = observed(Chain::bnb(), "bnb1bond3", vec![Coin::new(Asset::rune(), 1)], "LEAVE");
        let Msg::Leave(msg) = process_one_tx_in(&fx.env(), &tx, &Address::new("thor1")).unwrap() else {
            panic!("expected a leave");
        };
        assert_eq!(msg.node_address, Address::new("thor3"));

        let stranger = observed(Chain::bnb(), "bnb1nobody", vec![Coin::new(Asset::rune(), 1)], "LEAVE");
        assert!(process_one_tx_in(&fx.env(), &stranger, &Address::new("thor1")).is_err());
    }

    #[test]
    fn test_bond_rejects_non_rune() {
        let mut fx = Fixture::new();
        let tx = observed(Chain::bnb(), "bnb1user", vec![Coin::new(bnb(), 10)], "BOND:thor5");
        let err = process_one_tx_in(&fx.env(), &tx, &Address::new("thor1")).unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidCoins);
    }

    #[test]
    fn test_bad_memo_is_an_error() {
        let mut fx = Fixture::new();
        let tx = observed(Chain::bnb(), "bnb1user", vec![Coin::new(bnb(), 10)], "WHATEVER");
        let err = process_one_tx_in(&fx.env(), &tx, &Address::new("thor1")).unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidMemo);
    }

    #[test]
    fn test_refund_skips_coins_without_pool() {
        let mut fx = Fixture::new();
        seed_asgard(&fx);
        seed_pool(&fx, bnb());
        let tx = observed(
            Chain::bnb(),
            "bnb1user",
            vec![Coin::new(bnb(), 500_000_000), Coin::new("BNB.LOK-3C0".parse().unwrap(), 10)],
            "bogus",
        );
        refund_tx(&Context::new(3), &mut fx.env(), &tx, ErrorCode::InvalidMemo, "bad memo").unwrap();

        let out = fx.keeper.get_tx_out(3).unwrap();
        assert_eq!(out.tx_array.len(), 1);
        assert_eq!(out.tx_array[0].to_address, Address::new("bnb1user"));
        assert_eq!(out.tx_array[0].memo, format!("REFUND:{}", tx.tx.id));
        let refund = fx.managers.events.events().iter().find(|e| e.kind() == "refund").unwrap();
        assert_eq!(refund.status, EventStatus::Pending);
    }

    #[test]
    fn test_refund_with_nothing_to_send_completes() {
        let mut fx = Fixture::new();
        seed_asgard(&fx);
        let tx = observed(Chain::bnb(), "bnb1user", vec![Coin::new("BNB.LOK-3C0".parse().unwrap(), 10)], "bogus");
        refund_tx(&Context::new(3), &mut fx.env(), &tx, ErrorCode::InvalidMemo, "bad memo").unwrap();
        assert!(fx.keeper.get_tx_out(3).unwrap().is_empty());
        assert_eq!(fx.managers.events.events()[0].status, EventStatus::Success);
    }

    #[test]
    fn test_refund_bond_without_yggdrasil() {
        let mut fx = Fixture::new();
        seed_asgard(&fx);
        let na = node(4, NodeStatus::Standby, 500_000_000);
        fx.keeper.set_node_account(&na).unwrap();
        let leave = observed(Chain::bnb(), "bnb1bond4", vec![Coin::new(Asset::rune(), 1)], "LEAVE").tx;

        refund_bond(&Context::new(9), &mut fx.env(), &leave, na.clone()).unwrap();

        let stored = fx.keeper.get_node_account(&na.node_address).unwrap();
        assert_eq!(stored.bond, 0);
        assert_eq!(stored.status, NodeStatus::Disabled);
        let out = fx.keeper.get_tx_out(9).unwrap();
        assert_eq!(out.tx_array[0].to_address, na.bond_address);
        assert_eq!(out.tx_array[0].coin.amount, 400_000_000);
    }

    #[test]
    fn test_refund_bond_slashes_what_yggdrasil_kept() {
        let mut fx = Fixture::new();
        seed_asgard(&fx);
        seed_pool(&fx, bnb());
        let na = node(4, NodeStatus::Standby, 1_000_000_000);
        fx.keeper.set_node_account(&na).unwrap();
        let mut ygg = Vault::new(1, VaultStatus::Active, VaultType::Yggdrasil, na.pub_key_set.secp256k1.clone());
        ygg.add_funds(&Coins::new(vec![Coin::new(bnb(), 100_000_000)]));
        fx.keeper.set_vault(&ygg).unwrap();
        let leave = observed(Chain::bnb(), "bnb1bond4", vec![Coin::new(Asset::rune(), 1)], "LEAVE").tx;

        refund_bond(&Context::new(9), &mut fx.env(), &leave, na.clone()).unwrap();

        // 100 BNB worth 100 rune, slashed at 1.5x
        let out = fx.keeper.get_tx_out(9).unwrap();
        assert_eq!(out.tx_array[0].coin.amount, 1_000_000_000 - 150_000_000 - 100_000_000);
        let pool = fx.keeper.get_pool(&bnb()).unwrap();
        assert_eq!(pool.balance_rune, 1_150_000_000);
        assert_eq!(pool.balance_asset, 900_000_000);
        // still holds funds, so the vault is kept
        assert!(fx.keeper.vault_exists(&ygg.pub_key).unwrap());
    }

    #[test]
    fn test_refund_bond_leaves_active_node_alone() {
        let mut fx = Fixture::new();
        let na = fx.active_node(1, 100);
        let leave = observed(Chain::bnb(), "bnb1bond1", vec![Coin::new(Asset::rune(), 1)], "LEAVE").tx;
        refund_bond(&Context::new(9), &mut fx.env(), &leave, na.clone()).unwrap();
        assert_eq!(fx.keeper.get_node_account(&na.node_address).unwrap().bond, 100);
    }

    fn bootstrap_pool(fx: &Fixture, asset: Asset, rune: Amount, balance_asset: Amount) {
        fx.keeper
            .set_pool(&Pool {
                balance_rune: rune,
                balance_asset,
                asset,
                pool_units: rune,
                status: PoolStatus::Bootstrap,
            })
            .unwrap();
    }

    #[test]
    fn test_new_pool_cycle_enables_deepest_bootstrap_pool() {
        let mut fx = Fixture::new();
        fx.keeper.set_mimir("NewPoolCycle", 10).unwrap();
        let eth: Asset = "ETH.ETH".parse().unwrap();
        bootstrap_pool(&fx, bnb(), 500, 500);
        bootstrap_pool(&fx, btc(), 900, 10);
        // deepest rune side but no asset yet
        bootstrap_pool(&fx, eth.clone(), 5_000, 0);

        assert_eq!(enable_next_pool(&Context::new(9), &mut fx.env()).unwrap(), None);
        assert!(fx.managers.events.is_empty());

        assert_eq!(enable_next_pool(&Context::new(10), &mut fx.env()).unwrap(), Some(btc()));
        assert_eq!(fx.keeper.get_pool(&btc()).unwrap().status, PoolStatus::Enabled);
        assert_eq!(fx.keeper.get_pool(&bnb()).unwrap().status, PoolStatus::Bootstrap);
        assert_eq!(fx.keeper.get_pool(&eth).unwrap().status, PoolStatus::Bootstrap);
        let event = &fx.managers.events.events()[0];
        assert_eq!(event.status, EventStatus::Success);
        assert_eq!(
            event.payload,
            EventPayload::Pool {
                pool: btc(),
                status: PoolStatus::Enabled,
            }
        );

        // one pool per cycle
        assert_eq!(enable_next_pool(&Context::new(20), &mut fx.env()).unwrap(), Some(bnb()));
        assert_eq!(enable_next_pool(&Context::new(30), &mut fx.env()).unwrap(), None);
    }
}
