//! # Node Runtime
//!
//! Configuration, genesis import, block execution through the executor and
//! state export, wired together the way the binary runs them.

#[cfg(test)]
mod tests {
    use shared_types::{Address, Chain};
    use tc_01_keeper::{Keeper, NodeStatus};
    use tc_03_state_machine::domain::{MsgBan, MsgSetMimir};
    use tc_03_state_machine::Msg;

    use node_runtime::{GenesisState, NodeConfig, NodeRuntime, RuntimeError};

    use crate::harness::{address, operator};

    fn config() -> NodeConfig {
        let mut config = NodeConfig::default();
        config.chain.admins.push(Address::new("thor1admin"));
        config.chain.constant_overrides.insert("RotatePerBlockHeight".into(), 20);
        config
    }

    fn genesis() -> GenesisState {
        GenesisState {
            node_accounts: vec![operator(1, NodeStatus::Active, 100_000_000)],
            chains: vec![Chain::bnb()],
            ..Default::default()
        }
    }

    #[test]
    fn test_node_runs_blocks_and_exports_state() {
        let mut node = NodeRuntime::new(config(), genesis()).unwrap();
        assert_eq!(node.next_height(), 1);

        let outcome = node.executor().execute_block(1, &[]).unwrap();
        assert!(outcome.tx_results.is_empty());
        assert_eq!(node.next_height(), 2);

        let msgs = [
            Msg::SetMimir(MsgSetMimir {
                key: "FundMigrationInterval".into(),
                value: 30,
                signer: Address::new("thor1admin"),
            }),
            // not an operator
            Msg::Ban(MsgBan {
                node_address: address(1),
                signer: Address::new("thor1stranger"),
            }),
        ];
        let outcome = node.executor().execute_block(2, &msgs).unwrap();
        assert!(outcome.tx_results[0].is_ok());
        assert!(!outcome.tx_results[1].is_ok());
        assert!(!outcome.tx_results[1].log.is_empty());

        let keeper = node.executor().keeper();
        assert_eq!(keeper.get_mimir("FundMigrationInterval").unwrap(), Some(30));
        assert_eq!(keeper.get_mimir("RotatePerBlockHeight").unwrap(), Some(20));

        let exported = node.export_genesis().unwrap();
        assert_eq!(exported.node_accounts.len(), 1);
        assert_eq!(exported.admins, vec![Address::new("thor1admin")]);
        // the genesis block created the single operator's asgard
        assert_eq!(exported.vaults.len(), 1);
        assert_eq!(exported.mimir.len(), 2);
    }

    #[test]
    fn test_exported_state_boots_a_new_node() {
        let mut node = NodeRuntime::new(config(), genesis()).unwrap();
        node.executor().execute_block(1, &[]).unwrap();
        let exported = node.export_genesis().unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("genesis.json");
        exported.save(&path).unwrap();
        let restored = NodeRuntime::new(config(), GenesisState::load(&path).unwrap()).unwrap();
        assert_eq!(restored.export_genesis().unwrap(), exported);
    }

    #[test]
    fn test_invalid_config_is_refused() {
        let mut config = config();
        config.chain.admins.clear();
        assert!(matches!(
            NodeRuntime::new(config, genesis()),
            Err(RuntimeError::Config(_))
        ));
    }
}
