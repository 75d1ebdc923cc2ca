//! Ports: the store, typed keeper and supply ledger contracts.

pub mod keeper;
pub mod store;
pub mod supply;

pub use keeper::{Keeper, DEFAULT_PROTOCOL_VERSION};
pub use store::KvStore;
pub use supply::{ModuleName, Supply};
