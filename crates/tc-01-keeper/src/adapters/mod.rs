//! Adapters: in-memory store, cache-wrapped store, KV-backed keeper and
//! store-backed supply.

pub mod cache_store;
pub mod kv_keeper;
pub mod memory_store;
pub mod store_supply;

pub use cache_store::CacheKvStore;
pub use kv_keeper::KvKeeper;
pub use memory_store::MemoryKvStore;
pub use store_supply::StoreSupply;
