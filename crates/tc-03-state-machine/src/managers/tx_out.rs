//! # TxOut Store
//!
//! Queues outbound transfers. [`TxOutStoreV1::try_add`] picks the signing
//! vault (an yggdrasil that observed the inbound if one can cover the coin,
//! otherwise the richest active asgard), charges the protocol fee and
//! records the item against its inbound voter. Native coins settle at once
//! and re-enter the dispatcher as an observation.

use shared_types::{safe_sub, Asset, Chain, Coin, Coins, ProtocolVersion, Tx, TxId};
use tc_01_keeper::{
    Event, EventPayload, EventStatus, Fee, ModuleName, ObservedTx, TxMarker, TxOutItem, Vault,
    VaultsExt,
};
use tracing::{debug, info};

use super::{Derived, Env, V1};
use crate::constants::ConstantName;
use crate::domain::{Context, HandlerError, HandlerResult, Memo};

/// Versioned outbound queue.
#[derive(Debug, Clone, Copy)]
pub enum TxOutStore {
    V1(TxOutStoreV1),
}

impl TxOutStore {
    pub fn for_version(version: ProtocolVersion) -> HandlerResult<Self> {
        if version >= V1 {
            Ok(TxOutStore::V1(TxOutStoreV1))
        } else {
            Err(HandlerError::BadVersion(version))
        }
    }

    /// Prepare and queue `item`. `Ok(false)` means the item was dropped
    /// (nothing left after fees, or a self-transfer).
    pub fn try_add(&self, ctx: &Context, env: &mut Env<'_>, item: TxOutItem) -> HandlerResult<bool> {
        match self {
            TxOutStore::V1(store) => store.try_add(ctx, env, item),
        }
    }

    /// Queue `item` as is: no vault selection and no fee.
    pub fn unsafe_add(&self, ctx: &Context, env: &mut Env<'_>, item: TxOutItem) -> HandlerResult<()> {
        match self {
            TxOutStore::V1(store) => store.add_to_block_out(ctx, env, item),
        }
    }
}

/// Hash under which the marker of an outbound is stored. Observations of
/// the signed outbound recompute it from the external tx.
pub fn outbound_hash(chain: &Chain, to: &shared_types::Address, coin: &Coin, memo: &str) -> String {
    TxId::from_bytes(format!("{chain}|{to}|{coin}|{memo}").as_bytes()).to_string()
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TxOutStoreV1;

impl TxOutStoreV1 {
    pub fn try_add(&self, ctx: &Context, env: &mut Env<'_>, mut item: TxOutItem) -> HandlerResult<bool> {
        if item.memo.is_empty() {
            item.memo = Memo::Outbound {
                tx_id: item.in_hash.clone(),
            }
            .to_string();
        }

        if item.vault_pub_key.is_empty() {
            self.select_vault(ctx, env, &mut item)?;
        }

        let from = item.vault_pub_key.address(&item.chain);
        if from == item.to_address {
            debug!(to = %item.to_address, "[txout] source and destination are the same");
            return Ok(false);
        }

        let fee = env.amount(ConstantName::TransactionFee)?;
        if item.max_gas.is_empty() {
            let gas_asset = item.chain.gas_asset();
            let pool = env.keeper.get_pool(&gas_asset)?;
            let max = pool.rune_value_in_asset(fee / 2);
            item.max_gas = Coins::new(vec![Coin::new(gas_asset, max)]);
        }

        let memo = Memo::parse(&item.memo).ok();
        if memo.as_ref().is_some_and(|m| !m.is_internal()) {
            self.deduct_fee(ctx, env, &mut item, fee)?;
        }

        let yggdrasil_return = matches!(memo, Some(Memo::YggdrasilReturn { .. }));
        if item.coin.is_empty() && !yggdrasil_return {
            info!(in_hash = %item.in_hash, "[txout] nothing left to send");
            return Ok(false);
        }

        let mut voter = env.keeper.get_observed_tx_voter(&item.in_hash)?;
        if !item.in_hash.is_blank() && voter.is_done() {
            info!(in_hash = %item.in_hash, "[txout] inbound already fully answered");
            return Ok(false);
        }
        voter.actions.push(item.clone());
        env.keeper.set_observed_tx_voter(&voter)?;

        self.add_to_block_out(ctx, env, item)?;
        Ok(true)
    }

    fn select_vault(&self, ctx: &Context, env: &mut Env<'_>, item: &mut TxOutItem) -> HandlerResult<()> {
        let asgards = env.keeper.list_active_asgards()?;
        if item.coin.is_native() {
            // settled by the supply ledger; the vault only names the sender
            let vault = asgards
                .first()
                .ok_or_else(|| HandlerError::NotEnoughFunds("no active asgard vault".into()))?;
            item.vault_pub_key = vault.pub_key.clone();
            return Ok(());
        }

        let active = env.keeper.list_active_node_accounts()?;
        if !active.is_empty() {
            let voter = env.keeper.get_observed_tx_voter(&item.in_hash)?;
            let observed = voter.consensus_tx(&active).cloned().unwrap_or(voter.tx);
            let yggs = self.collect_yggdrasil(ctx, env, &observed, &item.chain.gas_asset())?;
            if let Some(vault) = yggs.most_of(&item.coin.asset) {
                if item.coin.amount < vault.amount_of(&item.coin.asset) {
                    item.vault_pub_key = vault.pub_key.clone();
                    return Ok(());
                }
            }
        }

        let vault = asgards
            .most_of(&item.coin.asset)
            .ok_or_else(|| HandlerError::NotEnoughFunds("no active asgard vault".into()))?;
        let available = vault.amount_of(&item.coin.asset);
        if item.coin.amount > available {
            return Err(HandlerError::NotEnoughFunds(format!(
                "vault {} has {} {}, requires {}",
                vault.pub_key, available, item.coin.asset, item.coin
            )));
        }
        item.vault_pub_key = vault.pub_key.clone();
        Ok(())
    }

    /// Yggdrasil vaults that hold the chain's gas asset and whose operator
    /// signed `observed`, net of what is already queued on them this block.
    fn collect_yggdrasil(
        &self,
        ctx: &Context,
        env: &Env<'_>,
        observed: &ObservedTx,
        gas_asset: &Asset,
    ) -> HandlerResult<Vec<Vault>> {
        let queued = env.keeper.get_tx_out(ctx.block_height)?;
        let mut vaults = Vec::new();
        for mut vault in env.keeper.list_vaults()? {
            if !vault.is_yggdrasil() || vault.amount_of(gas_asset) == 0 {
                continue;
            }
            let Some(owner) = env.keeper.get_node_account_by_pub_key(&vault.pub_key)? else {
                continue;
            };
            if !observed.has_signed(&owner.node_address) {
                continue;
            }
            let pub_key = vault.pub_key.clone();
            for pending in queued.tx_array.iter().filter(|t| t.vault_pub_key == pub_key) {
                vault.sub_coin(&pending.coin);
            }
            vaults.push(vault);
        }
        Ok(vaults)
    }

    fn deduct_fee(&self, ctx: &Context, env: &mut Env<'_>, item: &mut TxOutItem, fee: u128) -> HandlerResult<()> {
        let mut vault_data = env.keeper.get_vault_data()?;
        let charged = if item.coin.asset.is_rune() {
            let rune_fee = item.coin.amount.min(fee);
            item.coin.amount -= rune_fee;
            vault_data.total_reserve += rune_fee;
            Fee {
                coins: Coins::new(vec![Coin::new(item.coin.asset.clone(), rune_fee)]),
                pool_deduct: 0,
            }
        } else {
            let mut pool = env.keeper.get_pool(&item.coin.asset)?;
            if pool.is_empty() {
                return Ok(());
            }
            let mut asset_fee = pool.rune_value_in_asset(fee);
            let rune_fee = if item.coin.amount <= asset_fee {
                asset_fee = item.coin.amount;
                pool.asset_value_in_rune(asset_fee)
            } else {
                fee
            };
            item.coin.amount = safe_sub(item.coin.amount, asset_fee);
            pool.balance_asset += asset_fee;
            let pool_deduct = rune_fee.min(pool.balance_rune);
            pool.balance_rune -= pool_deduct;
            env.keeper.set_pool(&pool)?;
            vault_data.total_reserve += pool_deduct;
            Fee {
                coins: Coins::new(vec![Coin::new(item.coin.asset.clone(), asset_fee)]),
                pool_deduct,
            }
        };
        env.keeper.set_vault_data(&vault_data)?;

        let in_tx = Tx {
            id: item.in_hash.clone(),
            ..Default::default()
        };
        env.emit(Event::new(
            ctx.block_height,
            in_tx,
            EventPayload::Fee {
                tx_id: item.in_hash.clone(),
                fee: charged,
            },
            EventStatus::Success,
        ));
        Ok(())
    }

    pub fn add_to_block_out(&self, ctx: &Context, env: &mut Env<'_>, item: TxOutItem) -> HandlerResult<()> {
        if item.coin.is_native() {
            return self.native_tx_out(ctx, env, item);
        }

        let hash = outbound_hash(&item.chain, &item.to_address, &item.coin, &item.memo);
        let marker = TxMarker {
            height: ctx.block_height,
            memo: item.memo.clone(),
        };
        // internal transfers are observed twice: leaving one vault and
        // arriving at another
        if Memo::parse(&item.memo).is_ok_and(|m| m.is_internal()) {
            env.keeper.append_tx_marker(&hash, marker.clone())?;
        }
        env.keeper.append_tx_marker(&hash, marker)?;

        debug!(
            height = ctx.block_height,
            chain = %item.chain,
            to = %item.to_address,
            coin = %item.coin,
            "[txout] queued"
        );
        env.keeper.append_tx_out(ctx.block_height, item)?;
        Ok(())
    }

    fn native_tx_out(&self, ctx: &Context, env: &mut Env<'_>, item: TxOutItem) -> HandlerResult<()> {
        let coins = Coins::new(vec![item.coin.clone()]);
        env.supply
            .send_module_to_account(ModuleName::Asgard, &item.to_address, &coins)?;

        let tx_id = TxId::from_bytes(
            format!(
                "{}:{}:{}:{}:{}",
                ctx.block_height, item.in_hash, item.to_address, item.coin, item.memo
            )
            .as_bytes(),
        );
        let asgard = env.supply.module_address(ModuleName::Asgard);
        let tx = Tx::new(
            tx_id,
            Chain::thor(),
            asgard.clone(),
            item.to_address.clone(),
            coins,
            Coins::default(),
            item.memo.clone(),
        );
        let observed = ObservedTx::new(tx, ctx.block_height, item.vault_pub_key.clone());
        info!(to = %item.to_address, coin = %item.coin, "[txout] native outbound settled");
        env.push_derived(Derived::Observed {
            tx: observed,
            signer: asgard,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::managers::testing::Fixture;
    use shared_types::{Address, PubKey};
    use tc_01_keeper::{Keeper, Pool, PoolStatus, VaultStatus, VaultType};

    fn bnb() -> Asset {
        "BNB.BNB".parse().unwrap()
    }

    fn seed(fx: &Fixture) -> Vault {
        let mut asgard = Vault::new(1, VaultStatus::Active, VaultType::Asgard, PubKey::new("asgardpk"));
        asgard.add_funds(&Coins::new(vec![
            Coin::new(bnb(), 1_000_000_000),
            Coin::new(Asset::rune(), 1_000_000_000),
        ]));
        fx.keeper.set_vault(&asgard).unwrap();
        fx.keeper
            .set_pool(&Pool {
                balance_rune: 1_000_000_000,
                balance_asset: 1_000_000_000,
                asset: bnb(),
                pool_units: 1_000_000_000,
                status: PoolStatus::Enabled,
            })
            .unwrap();
        asgard
    }

    fn item(coin: Coin) -> TxOutItem {
        TxOutItem::new(Chain::bnb(), Address::new("bnb1dest"), coin, TxId::from_bytes(b"inbound"))
    }

    #[test]
    fn test_rune_fee_goes_to_reserve() {
        let mut fx = Fixture::new();
        let asgard = seed(&fx);
        let ctx = Context::new(5);
        let store = TxOutStore::for_version(V1).unwrap();
        let queued = store
            .try_add(&ctx, &mut fx.env(), item(Coin::new(Asset::rune(), 300_000_000)))
            .unwrap();
        assert!(queued);

        let out = fx.keeper.get_tx_out(5).unwrap();
        assert_eq!(out.tx_array.len(), 1);
        assert_eq!(out.tx_array[0].coin.amount, 200_000_000);
        assert_eq!(out.tx_array[0].vault_pub_key, asgard.pub_key);
        assert_eq!(fx.keeper.get_vault_data().unwrap().total_reserve, 100_000_000);
        let voter = fx.keeper.get_observed_tx_voter(&TxId::from_bytes(b"inbound")).unwrap();
        assert_eq!(voter.actions.len(), 1);
        assert_eq!(fx.managers.events.events()[0].kind(), "fee");
    }

    #[test]
    fn test_amount_below_fee_is_dropped() {
        let mut fx = Fixture::new();
        seed(&fx);
        let store = TxOutStore::for_version(V1).unwrap();
        let queued = store
            .try_add(&Context::new(5), &mut fx.env(), item(Coin::new(Asset::rune(), 40_000_000)))
            .unwrap();
        assert!(!queued);
        assert_eq!(fx.keeper.get_vault_data().unwrap().total_reserve, 40_000_000);
        assert!(fx.keeper.get_tx_out(5).unwrap().is_empty());
    }

    #[test]
    fn test_asset_fee_moves_rune_from_pool_to_reserve() {
        let mut fx = Fixture::new();
        seed(&fx);
        let store = TxOutStore::for_version(V1).unwrap();
        store
            .try_add(&Context::new(5), &mut fx.env(), item(Coin::new(bnb(), 500_000_000)))
            .unwrap();
        let pool = fx.keeper.get_pool(&bnb()).unwrap();
        assert_eq!(pool.balance_asset, 1_100_000_000);
        assert_eq!(pool.balance_rune, 900_000_000);
        assert_eq!(fx.keeper.get_tx_out(5).unwrap().tx_array[0].coin.amount, 400_000_000);
    }

    #[test]
    fn test_insufficient_asgard_funds() {
        let mut fx = Fixture::new();
        seed(&fx);
        let store = TxOutStore::for_version(V1).unwrap();
        let err = store
            .try_add(&Context::new(5), &mut fx.env(), item(Coin::new(bnb(), 5_000_000_000)))
            .unwrap_err();
        assert_eq!(err.code(), crate::domain::ErrorCode::NotEnoughFunds);
    }

    #[test]
    fn test_internal_memo_skips_fee_and_marks_twice() {
        let mut fx = Fixture::new();
        seed(&fx);
        let store = TxOutStore::for_version(V1).unwrap();
        let mut migrate = item(Coin::new(bnb(), 100_000_000));
        migrate.memo = Memo::Migrate { block_height: 5 }.to_string();
        assert!(store.try_add(&Context::new(5), &mut fx.env(), migrate.clone()).unwrap());
        assert_eq!(fx.keeper.get_vault_data().unwrap().total_reserve, 0);
        let hash = outbound_hash(&migrate.chain, &migrate.to_address, &migrate.coin, &migrate.memo);
        assert_eq!(fx.keeper.list_tx_markers(&hash).unwrap().len(), 2);
    }

    #[test]
    fn test_yggdrasil_that_signed_is_preferred() {
        let mut fx = Fixture::new();
        seed(&fx);
        let na = fx.active_node(1, 100);
        let mut ygg = Vault::new(1, VaultStatus::Active, VaultType::Yggdrasil, na.pub_key_set.secp256k1.clone());
        ygg.add_funds(&Coins::new(vec![Coin::new(bnb(), 900_000_000)]));
        fx.keeper.set_vault(&ygg).unwrap();

        let in_hash = TxId::from_bytes(b"inbound");
        let mut voter = fx.keeper.get_observed_tx_voter(&in_hash).unwrap();
        let tx = Tx::new(
            in_hash.clone(),
            Chain::bnb(),
            Address::new("bnb1user"),
            Address::new("bnb1vault"),
            Coins::new(vec![Coin::new(bnb(), 1)]),
            Coins::default(),
            "",
        );
        voter.add(ObservedTx::new(tx, 1, PubKey::new("asgardpk")), &na.node_address);
        fx.keeper.set_observed_tx_voter(&voter).unwrap();

        let store = TxOutStore::for_version(V1).unwrap();
        store
            .try_add(&Context::new(5), &mut fx.env(), item(Coin::new(bnb(), 200_000_000)))
            .unwrap();
        let out = fx.keeper.get_tx_out(5).unwrap();
        assert_eq!(out.tx_array[0].vault_pub_key, ygg.pub_key);
    }

    #[test]
    fn test_yggdrasil_is_netted_against_queued_outbounds() {
        let mut fx = Fixture::new();
        seed(&fx);
        let na = fx.active_node(1, 100);
        let mut ygg = Vault::new(1, VaultStatus::Active, VaultType::Yggdrasil, na.pub_key_set.secp256k1.clone());
        ygg.add_funds(&Coins::new(vec![Coin::new(bnb(), 300_000_000)]));
        fx.keeper.set_vault(&ygg).unwrap();

        let in_hash = TxId::from_bytes(b"inbound");
        let mut voter = fx.keeper.get_observed_tx_voter(&in_hash).unwrap();
        let tx = Tx::new(
            in_hash,
            Chain::bnb(),
            Address::new("bnb1user"),
            Address::new("bnb1vault"),
            Coins::new(vec![Coin::new(bnb(), 1)]),
            Coins::default(),
            "",
        );
        voter.add(ObservedTx::new(tx, 1, PubKey::new("asgardpk")), &na.node_address);
        fx.keeper.set_observed_tx_voter(&voter).unwrap();

        let store = TxOutStore::for_version(V1).unwrap();
        let ctx = Context::new(5);
        store.try_add(&ctx, &mut fx.env(), item(Coin::new(bnb(), 200_000_000))).unwrap();
        // 100 BNB already queued leaves 200, too little for the next 250
        store.try_add(&ctx, &mut fx.env(), item(Coin::new(bnb(), 250_000_000))).unwrap();

        let out = fx.keeper.get_tx_out(5).unwrap();
        assert_eq!(out.tx_array[0].vault_pub_key, ygg.pub_key);
        assert_eq!(out.tx_array[1].vault_pub_key, PubKey::new("asgardpk"));
    }

    #[test]
    fn test_version_below_v1_rejected() {
        assert!(TxOutStore::for_version(ProtocolVersion::new(0, 0, 1)).is_err());
    }
}
