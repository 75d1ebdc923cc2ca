//! # Pool Conservation
//!
//! A stake followed by a full unstake leaves the pool where it was, both
//! through the liquidity math alone and through observed inbounds.

#[cfg(test)]
mod tests {
    use shared_types::{Address, Asset, Coin};
    use tc_01_keeper::{Keeper, NodeStatus, Pool, PoolStatus, Staker};
    use tc_02_liquidity::{stake, unstake, UnstakeParams, MAX_UNSTAKE_BASIS_POINTS};

    use crate::harness::{address, bnb, observed_in, TestNet};

    #[test]
    fn test_stake_then_full_unstake_restores_pool() {
        let mut pool = Pool::new(bnb());
        let mut first = Staker::new(bnb(), Address::new("bnb1first"));
        stake(&mut pool, &mut first, 100_000_000, 100_000_000, &Address::new("bnb1first"), 1, PoolStatus::Enabled)
            .unwrap();
        let before = pool.clone();

        let mut second = Staker::new(bnb(), Address::new("bnb1second"));
        let outcome = stake(
            &mut pool,
            &mut second,
            10_000_000,
            10_000_000,
            &Address::new("bnb1second"),
            2,
            PoolStatus::Enabled,
        )
        .unwrap();
        assert_eq!(outcome.units, 10_000_000);

        let out = unstake(
            &mut pool,
            &mut second,
            UnstakeParams {
                basis_points: MAX_UNSTAKE_BASIS_POINTS,
                height: 3,
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(second.units, 0);
        assert_eq!((out.rune, out.asset), (10_000_000, 10_000_000));
        assert_eq!(pool.balance_rune, before.balance_rune);
        assert_eq!(pool.balance_asset, before.balance_asset);
        assert_eq!(pool.pool_units, before.pool_units);
    }

    #[test]
    fn test_observed_stakes_accumulate_units() {
        let mut net = TestNet::new();
        let na = net.operator(1, NodeStatus::Active, 100_000_000);
        let asgard = net.asgard("asgard", 1, &[&na], vec![]);
        let coins = |amount| vec![Coin::new(bnb(), amount), Coin::new(Asset::rune(), amount)];

        net.begin(5).unwrap();
        net.deliver(&observed_in("stake-1", "bnb1alice", &asgard, coins(100_000_000), "STAKE:BNB.BNB", &address(1)))
            .unwrap();
        net.deliver(&observed_in("stake-2", "bnb1bob", &asgard, coins(10_000_000), "STAKE:BNB.BNB", &address(1)))
            .unwrap();
        net.end().unwrap();

        let pool = net.keeper.get_pool(&bnb()).unwrap();
        assert_eq!(pool.balance_rune, 110_000_000);
        assert_eq!(pool.balance_asset, 110_000_000);
        let alice = net.keeper.get_staker(&bnb(), &Address::new("bnb1alice")).unwrap();
        let bob = net.keeper.get_staker(&bnb(), &Address::new("bnb1bob")).unwrap();
        assert_eq!(alice.units, 100_000_000);
        assert_eq!(bob.units, 10_000_000);
        assert_eq!(pool.pool_units, alice.units + bob.units);
        assert_eq!(net.keeper.get_vault(&asgard.pub_key).unwrap().amount_of(&bnb()), 110_000_000);
    }
}
