//! Persisted entities of the state machine.

pub mod errors;
pub mod event;
pub mod keygen;
pub mod node_account;
pub mod observed_tx;
pub mod pool;
pub mod staker;
pub mod tx_out;
pub mod vault;
pub mod vault_data;
pub mod voter;

pub use errors::{KeeperError, KeeperResult};
pub use event::{BondType, Event, EventPayload, EventStatus, Fee, GasPool, IncompleteEvent, PoolAmt};
pub use keygen::{Keygen, KeygenBlock};
pub use node_account::{NodeAccount, NodeStatus};
pub use observed_tx::{ObservedTx, ObservedTxStatus, ObservedTxVoter};
pub use pool::{Pool, PoolStatus};
pub use staker::Staker;
pub use tx_out::{TxMarker, TxOut, TxOutItem};
pub use vault::{Vault, VaultStatus, VaultType, VaultsExt};
pub use vault_data::{ReserveContributor, ReserveContributors, VaultData};
pub use voter::{
    count_active_signers, has_super_majority, BanVoter, ConsensusVoter, TssKeysignFailVoter,
    TssVoter,
};
