//! # Keeper
//!
//! Persistence contract of the state machine: the entities every handler
//! reads and writes, the [`KvStore`](ports::KvStore),
//! [`Keeper`](ports::Keeper) and [`Supply`](ports::Supply) ports, the key
//! schema, and in-memory adapters.
//!
//! ```text
//! handlers ──► Keeper (typed) ──► KvStore (bytes) ◄── Supply (balances)
//!                                     ▲
//!                          CacheKvStore (per message)
//! ```

pub mod adapters;
pub mod domain;
pub mod keys;
pub mod ports;

pub use adapters::{CacheKvStore, KvKeeper, MemoryKvStore, StoreSupply};
pub use domain::*;
pub use ports::{Keeper, KvStore, ModuleName, Supply, DEFAULT_PROTOCOL_VERSION};
