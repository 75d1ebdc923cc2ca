//! # Operator Lifecycle
//!
//! Ban consensus with its bond fee, and a full churn: keygen request at the
//! rotation height, keygen vote, then the validator set update at EndBlock.

#[cfg(test)]
mod tests {
    use shared_types::{Chain, PubKey};
    use tc_01_keeper::{Keeper, NodeStatus, VaultStatus, VaultType};
    use tc_03_state_machine::domain::{MsgBan, MsgTssPool};
    use tc_03_state_machine::{ConstantName, Msg, ValidatorUpdate};

    use crate::harness::{address, pub_key, TestNet};

    const BOND: u128 = 100_000_000;

    fn ban(target: usize, signer: usize) -> Msg {
        Msg::Ban(MsgBan {
            node_address: address(target),
            signer: address(signer),
        })
    }

    // =========================================================================
    // BAN
    // =========================================================================

    #[test]
    fn test_ban_consensus_charges_every_banner() {
        let mut net = TestNet::new();
        net.mimir(ConstantName::MinimumBondInRune, BOND as i64);
        for i in 1..=3 {
            net.operator(i, NodeStatus::Active, BOND);
        }
        net.begin(12).unwrap();

        net.deliver(&ban(1, 2)).unwrap();
        assert_eq!(net.node(2).bond, 99_900_000);
        assert_eq!(net.reserve(), 100_000);
        assert!(!net.node(1).forced_to_leave);

        // a repeated vote changes nothing
        net.deliver(&ban(1, 2)).unwrap();
        assert_eq!(net.node(2).bond, 99_900_000);
        assert_eq!(net.reserve(), 100_000);

        net.deliver(&ban(1, 3)).unwrap();
        assert_eq!(net.node(3).bond, 99_900_000);
        assert_eq!(net.reserve(), 200_000);
        let target = net.node(1);
        assert!(target.forced_to_leave);
        assert_eq!(target.leave_height, 12);
        assert_eq!(target.bond, BOND);

        // votes after consensus are free
        net.deliver(&ban(1, 1)).unwrap();
        assert_eq!(net.node(1).bond, BOND);
        assert_eq!(net.reserve(), 200_000);
        net.end().unwrap();
    }

    #[test]
    fn test_ban_by_non_operator_is_rejected() {
        let mut net = TestNet::new();
        for i in 1..=3 {
            net.operator(i, NodeStatus::Active, BOND);
        }
        net.begin(12).unwrap();
        assert!(net.deliver(&ban(1, 9)).is_err());
        assert_eq!(net.reserve(), 0);
    }

    #[test]
    fn test_ban_disables_standby_target() {
        let mut net = TestNet::new();
        net.mimir(ConstantName::MinimumBondInRune, BOND as i64);
        for i in 1..=3 {
            net.operator(i, NodeStatus::Active, BOND);
        }
        net.operator(4, NodeStatus::Standby, BOND);
        net.begin(12).unwrap();
        net.deliver(&ban(4, 1)).unwrap();
        net.deliver(&ban(4, 2)).unwrap();
        let target = net.node(4);
        assert_eq!(target.status, NodeStatus::Disabled);
        assert!(target.forced_to_leave);

        // a disabled operator cannot be banned again
        assert!(net.deliver(&ban(4, 3)).is_err());
    }

    // =========================================================================
    // CHURN
    // =========================================================================

    #[test]
    fn test_churn_window_rotates_validator_set() {
        let mut net = TestNet::new();
        net.mimir(ConstantName::RotatePerBlockHeight, 10);
        net.mimir(ConstantName::MinimumBondInRune, BOND as i64);

        let active: Vec<_> = (1..=4)
            .map(|i| net.operator(i, NodeStatus::Active, 1_000_000_000 + i as u128))
            .collect();
        let mut leaving = active[0].clone();
        leaving.requested_to_leave = true;
        leaving.slash_points = 50;
        net.save(&leaving);
        let mut joining = net.operator(5, NodeStatus::Standby, 2_000_000_000);
        joining.slash_points = 9;
        net.save(&joining);
        let old = net.asgard("oldasgard", 0, &active.iter().collect::<Vec<_>>(), vec![]);

        // rotation height: keygen for the set without the leaver plus the newcomer
        net.begin(10).unwrap();
        assert_eq!(net.node(5).status, NodeStatus::Ready);
        let block = net.keeper.get_keygen_block(10).unwrap();
        assert_eq!(block.keygens.len(), 1);
        let members = block.keygens[0].members.clone();
        assert_eq!(members.len(), 4);
        assert!(!members.contains(&pub_key(1)));
        assert!(members.contains(&pub_key(5)));

        // three of four active operators agree on the keygen outcome
        for signer in 2..=4 {
            net.deliver(&Msg::TssPool(MsgTssPool::new(
                members.clone(),
                PubKey::new("newasgard"),
                VaultType::Asgard,
                10,
                vec![],
                vec![Chain::bnb()],
                address(signer),
            )))
            .unwrap();
        }
        assert_eq!(net.keeper.get_vault(&old.pub_key).unwrap().status, VaultStatus::Retiring);
        let new = net.keeper.get_vault(&PubKey::new("newasgard")).unwrap();
        assert_eq!(new.status, VaultStatus::Active);
        assert_eq!(new.membership, members);

        let updates = net.end().unwrap();
        assert_eq!(
            updates,
            vec![
                ValidatorUpdate {
                    cons_pub_key: "cons5".into(),
                    power: 100
                },
                ValidatorUpdate {
                    cons_pub_key: "cons1".into(),
                    power: 0
                },
            ]
        );
        let joined = net.node(5);
        assert_eq!(joined.status, NodeStatus::Active);
        assert_eq!(joined.slash_points, 0);
        assert_eq!(net.node(1).status, NodeStatus::Disabled);
        // the empty retiring vault is closed in the same EndBlock
        assert_eq!(net.keeper.get_vault(&old.pub_key).unwrap().status, VaultStatus::Inactive);
    }

    #[test]
    fn test_no_rotation_outside_churn_window() {
        let mut net = TestNet::new();
        net.mimir(ConstantName::RotatePerBlockHeight, 10);
        net.mimir(ConstantName::MinimumBondInRune, BOND as i64);
        let active: Vec<_> = (1..=4).map(|i| net.operator(i, NodeStatus::Active, 1_000_000_000)).collect();
        net.operator(5, NodeStatus::Standby, 2_000_000_000);
        net.asgard("asgard", 0, &active.iter().collect::<Vec<_>>(), vec![]);

        let updates = net.empty_block(7).unwrap();
        assert!(updates.is_empty());
        assert!(net.keeper.get_keygen_block(7).unwrap().is_empty());
        assert_eq!(net.node(5).status, NodeStatus::Standby);
    }
}
