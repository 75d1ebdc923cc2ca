//! # Vault Scenarios
//!
//! Gas reimbursement from the reserve, a failed keygen that blames one
//! member, a retiring vault migrating funds to its successor, and yggdrasil
//! funds that leave for an address outside the network.

#[cfg(test)]
mod tests {
    use shared_types::{Asset, Chain, Coin, Coins, PubKey, Tx, TxId};
    use tc_01_keeper::{
        EventPayload, Keeper, NodeStatus, ObservedTx, PoolStatus, VaultData, VaultStatus, VaultType,
    };
    use tc_03_state_machine::domain::{MsgObservedTxIn, MsgObservedTxOut, MsgTssPool};
    use tc_03_state_machine::managers::{EventManager, GasManager};
    use tc_03_state_machine::{ConstantName, Msg};

    use crate::harness::{address, bnb, pub_key, TestNet};

    fn btc() -> Asset {
        "BTC.BTC".parse().unwrap()
    }

    // =========================================================================
    // GAS
    // =========================================================================

    #[test]
    fn test_gas_subsidy_reimburses_pools_once_per_block() {
        let net = TestNet::new();
        net.pool(&bnb(), 10_000, 20_000, PoolStatus::Enabled);
        net.pool(&btc(), 5_000, 1_000, PoolStatus::Enabled);
        net.keeper
            .set_vault_data(&VaultData {
                total_reserve: 1_000_000_000,
                ..Default::default()
            })
            .unwrap();

        let mut gas = GasManager::new();
        let mut events = EventManager::new(20);
        gas.add_gas(&Coins::new(vec![Coin::new(bnb(), 37_500), Coin::new(btc(), 1_000)]));
        gas.add_gas(&Coins::new(vec![Coin::new(bnb(), 38_500), Coin::new(btc(), 2_000)]));
        gas.end_block(20, &net.keeper, &mut events).unwrap();

        // 76_000 BNB at 1:2 is 38_000 rune, 3_000 BTC at 5:1 is 15_000 rune
        let bnb_pool = net.keeper.get_pool(&bnb()).unwrap();
        assert_eq!(bnb_pool.balance_rune, 48_000);
        assert_eq!(bnb_pool.balance_asset, 0);
        let btc_pool = net.keeper.get_pool(&btc()).unwrap();
        assert_eq!(btc_pool.balance_rune, 20_000);
        assert_eq!(btc_pool.balance_asset, 0);
        assert_eq!(net.reserve(), 1_000_000_000 - 38_000 - 15_000);

        let gas_events: Vec<_> = events.events().iter().filter(|e| e.kind() == "gas").collect();
        assert_eq!(gas_events.len(), 1);
        match &gas_events[0].payload {
            EventPayload::Gas { pools } => {
                assert_eq!(pools.len(), 2);
                assert!(pools.iter().all(|p| p.count == 2));
                assert_eq!(pools[0].rune_amt, 38_000);
                assert_eq!(pools[1].rune_amt, 15_000);
            }
            other => panic!("unexpected payload {other:?}"),
        }
    }

    #[test]
    fn test_gas_shortfall_is_recorded() {
        let net = TestNet::new();
        net.pool(&bnb(), 10_000, 20_000, PoolStatus::Enabled);
        net.keeper
            .set_vault_data(&VaultData {
                total_reserve: 1_000,
                ..Default::default()
            })
            .unwrap();

        let mut gas = GasManager::new();
        let mut events = EventManager::new(20);
        gas.add_gas(&Coins::new(vec![Coin::new(bnb(), 4_000)]));
        gas.end_block(20, &net.keeper, &mut events).unwrap();

        let data = net.keeper.get_vault_data().unwrap();
        assert_eq!(data.total_reserve, 0);
        assert_eq!(data.gas_shortfall, 1_000);
        assert_eq!(net.keeper.get_pool(&bnb()).unwrap().balance_rune, 11_000);
    }

    // =========================================================================
    // KEYGEN FAILURE
    // =========================================================================

    #[test]
    fn test_failed_keygen_slashes_blamed_member() {
        let mut net = TestNet::new();
        net.mimir(ConstantName::FailKeygenSlashPoints, 720);
        let active: Vec<_> = (1..=3).map(|i| net.operator(i, NodeStatus::Active, 1_000_000_000)).collect();
        net.asgard("asgard", 1, &active.iter().collect::<Vec<_>>(), vec![]);
        let members: Vec<_> = (11..=18)
            .map(|i| net.operator(i, NodeStatus::Standby, 1_000_000_000).pub_key_set.secp256k1)
            .collect();

        net.begin(10).unwrap();
        for signer in 1..=2 {
            net.deliver(&Msg::TssPool(MsgTssPool::new(
                members.clone(),
                PubKey::new(""),
                VaultType::Asgard,
                10,
                vec![pub_key(14)],
                vec![Chain::bnb()],
                address(signer),
            )))
            .unwrap();
        }
        net.end().unwrap();

        assert_eq!(net.node(14).slash_points, 720);
        assert_eq!(net.node(13).slash_points, 0);
        assert_eq!(net.keeper.list_vaults().unwrap().len(), 1);
    }

    // =========================================================================
    // MIGRATION
    // =========================================================================

    #[test]
    fn test_retiring_vault_migrates_to_active_vault() {
        let mut net = TestNet::new();
        let nodes: Vec<_> = (1..=3).map(|i| net.operator(i, NodeStatus::Active, 1_000_000_000)).collect();
        let members: Vec<_> = nodes.iter().collect();
        let next = net.asgard("asgard-next", 1, &members, vec![]);
        let mut old = net.asgard("asgard-old", 1, &members, vec![Coin::new(bnb(), 1_000_000_000)]);
        old.status = VaultStatus::Retiring;
        net.keeper.set_vault(&old).unwrap();
        net.mimir(ConstantName::FundMigrationInterval, 5);

        net.empty_block(6).unwrap();
        let queued = net.keeper.get_tx_out(6).unwrap();
        assert_eq!(queued.tx_array.len(), 1);
        let item = queued.tx_array[0].clone();
        assert_eq!(item.vault_pub_key, old.pub_key);
        assert_eq!(item.to_address, next.address(&Chain::bnb()));

        let transfer = Tx::new(
            TxId::from_bytes(b"migrate-6"),
            Chain::bnb(),
            old.address(&Chain::bnb()),
            item.to_address.clone(),
            Coins::new(vec![item.coin.clone()]),
            Coins::default(),
            &item.memo,
        );
        let sent = ObservedTx::new(transfer.clone(), 2, old.pub_key.clone());
        let arrived = ObservedTx::new(transfer, 2, next.pub_key.clone());

        net.begin(7).unwrap();
        for signer in 1..=2 {
            net.deliver(&Msg::ObservedTxOut(MsgObservedTxOut {
                txs: vec![sent.clone()],
                signer: address(signer),
            }))
            .unwrap();
        }
        assert_eq!(net.keeper.get_vault(&next.pub_key).unwrap().amount_of(&bnb()), 0);
        for signer in 1..=2 {
            net.deliver(&Msg::ObservedTxIn(MsgObservedTxIn {
                txs: vec![arrived.clone()],
                signer: address(signer),
            }))
            .unwrap();
        }
        net.end().unwrap();

        let moved = item.coin.amount;
        assert!(moved > 0);
        assert_eq!(
            net.keeper.get_vault(&old.pub_key).unwrap().amount_of(&bnb()),
            1_000_000_000 - moved
        );
        assert_eq!(net.keeper.get_vault(&next.pub_key).unwrap().amount_of(&bnb()), moved);
        assert!(!net.keeper.get_tx_out(6).unwrap().tx_array[0].is_pending());
        for i in 1..=3 {
            assert_eq!(net.node(i).bond, 1_000_000_000);
        }
    }

    // =========================================================================
    // YGGDRASIL THEFT
    // =========================================================================

    #[test]
    fn test_yggdrasil_theft_is_slashed_from_bond() {
        let mut net = TestNet::new();
        let a = net.operator(1, NodeStatus::Active, 1_000_000_000);
        let b = net.operator(2, NodeStatus::Active, 1_000_000_000);
        let owner = net.operator(3, NodeStatus::Active, 100_000_000_000);
        net.asgard("asgard", 1, &[&a, &b, &owner], vec![]);
        net.pool(&bnb(), 100_000_000_000, 100_000_000_000, PoolStatus::Enabled);
        let ygg = net.yggdrasil(&owner, vec![Coin::new(bnb(), 20_000_000_000)]);

        let tx = Tx::new(
            TxId::from_bytes(b"ygg-theft"),
            Chain::bnb(),
            ygg.address(&Chain::bnb()),
            shared_types::Address::new("bnb1thief"),
            Coins::new(vec![
                Coin::new(bnb(), 10_000_000_000),
                Coin::new(Asset::rune(), 10_000_000_000),
            ]),
            Coins::default(),
            "YGGDRASIL-:5",
        );
        let observed = ObservedTx::new(tx, 1, ygg.pub_key.clone());

        net.begin(6).unwrap();
        for signer in 1..=2 {
            net.deliver(&Msg::ObservedTxOut(MsgObservedTxOut {
                txs: vec![observed.clone()],
                signer: address(signer),
            }))
            .unwrap();
        }

        // 1.5x of 1e10 rune plus 1.5x the pool value of 1e10 BNB
        assert_eq!(net.node(3).bond, 70_000_000_000);
        assert_eq!(net.reserve(), 5_000_000_000);
        let pool = net.keeper.get_pool(&bnb()).unwrap();
        assert_eq!(pool.balance_rune, 115_000_000_000);
        assert_eq!(pool.balance_asset, 90_000_000_000);
        assert_eq!(net.keeper.get_vault(&ygg.pub_key).unwrap().amount_of(&bnb()), 10_000_000_000);
        assert!(net.machine.pending_events().iter().any(|e| e.kind() == "slash"));
        // honest operators keep their bond
        assert_eq!(net.node(1).bond, 1_000_000_000);
    }
}
