//! # Ragnarok
//!
//! Network shutdown at the artificial ragnarok height: ten rounds, one every
//! `FundMigrationInterval` blocks, each refunding a growing share of bonds,
//! the reserve and pool stakes.

#[cfg(test)]
mod tests {
    use shared_types::{Address, Amount, Asset, Coin};
    use tc_01_keeper::{
        Keeper, NodeStatus, PoolStatus, ReserveContributor, ReserveContributors, Staker, VaultData,
    };
    use tc_03_state_machine::ConstantName;

    use crate::harness::{bnb, TestNet};

    const BOND: Amount = 1_000_000_000;
    const RESERVE: Amount = 10_000_000_000;
    const UNITS: Amount = 1_000_000_000;
    const START: u64 = 10;
    const INTERVAL: u64 = 10;

    fn shutting_down() -> TestNet {
        let net = TestNet::new();
        net.mimir(ConstantName::ArtificialRagnarokBlockHeight, START as i64);
        net.mimir(ConstantName::RotatePerBlockHeight, INTERVAL as i64);
        net.mimir(ConstantName::FundMigrationInterval, INTERVAL as i64);
        net.mimir(ConstantName::TransactionFee, 0);
        net.mimir(ConstantName::MinimumBondInRune, 100_000_000);

        let nodes: Vec<_> = (1..=4).map(|i| net.operator(i, NodeStatus::Active, BOND)).collect();
        net.asgard(
            "asgard",
            1,
            &nodes.iter().collect::<Vec<_>>(),
            vec![Coin::new(Asset::rune(), 10_000_000_000_000), Coin::new(bnb(), 10_000_000_000_000)],
        );
        net.pool(&bnb(), UNITS, UNITS, PoolStatus::Enabled);
        let mut staker = Staker::new(bnb(), Address::new("bnb1staker"));
        staker.units = UNITS;
        net.keeper.set_staker(&staker).unwrap();

        net.keeper
            .set_reserve_contributors(&ReserveContributors(vec![ReserveContributor::new(
                Address::new("bnb1donor"),
                RESERVE,
            )]))
            .unwrap();
        net.keeper
            .set_vault_data(&VaultData {
                total_reserve: RESERVE,
                ..Default::default()
            })
            .unwrap();
        net
    }

    /// Sum of everything queued to `to` over `heights`.
    fn queued_to(net: &TestNet, to: &Address, heights: impl Iterator<Item = u64>) -> Amount {
        heights
            .map(|h| {
                net.keeper
                    .get_tx_out(h)
                    .unwrap()
                    .tx_array
                    .iter()
                    .filter(|item| &item.to_address == to)
                    .map(|item| item.coin.amount)
                    .sum::<Amount>()
            })
            .sum()
    }

    #[test]
    fn test_ragnarok_refunds_everything_in_ten_rounds() {
        let mut net = shutting_down();
        let last = START + 10 * INTERVAL;
        for height in START..=last {
            net.empty_block(height).unwrap();
        }
        assert_eq!(net.keeper.ragnarok_height().unwrap(), START);

        // reserve: the donor gets the whole reserve back
        assert_eq!(queued_to(&net, &Address::new("bnb1donor"), START..=last), RESERVE);
        assert_eq!(net.reserve(), 0);

        // bonds: paid back to the bond address, nothing left on the operator
        for i in 1..=4 {
            let na = net.node(i);
            assert_eq!(na.bond, 0);
            assert_eq!(queued_to(&net, &na.bond_address, START..=last), BOND);
        }

        // pools: bootstrapped and fully unstaked
        let pool = net.keeper.get_pool(&bnb()).unwrap();
        assert_eq!(pool.status, PoolStatus::Bootstrap);
        assert_eq!(pool.pool_units, 0);
        assert!(net.keeper.list_stakers(&bnb()).unwrap().iter().all(|s| s.units == 0));
    }

    #[test]
    fn test_first_round_refunds_a_tenth() {
        let mut net = shutting_down();
        for height in START..=START + INTERVAL {
            net.empty_block(height).unwrap();
        }
        let round = START + INTERVAL;
        assert_eq!(queued_to(&net, &Address::new("bnb1donor"), round..=round), RESERVE / 10);
        assert_eq!(net.reserve(), RESERVE - RESERVE / 10);
        assert_eq!(net.node(1).bond, BOND - BOND / 10);

        let staker = net.keeper.get_staker(&bnb(), &Address::new("bnb1staker")).unwrap();
        assert_eq!(staker.units, UNITS - UNITS / 10);
        assert_eq!(net.keeper.get_pool(&bnb()).unwrap().status, PoolStatus::Bootstrap);
    }

    #[test]
    fn test_no_keygen_once_ragnarok_started() {
        let mut net = shutting_down();
        net.operator(5, NodeStatus::Standby, 2 * BOND);
        for height in START..=START + 5 * INTERVAL {
            net.empty_block(height).unwrap();
        }
        for height in (START..=START + 5 * INTERVAL).step_by(INTERVAL as usize) {
            assert!(net.keeper.get_keygen_block(height).unwrap().is_empty());
        }
        // no churn either
        assert_ne!(net.node(5).status, NodeStatus::Active);
        assert_eq!(net.keeper.list_active_node_accounts().unwrap().len(), 4);
    }
}
