//! Raw key/value store port.

use crate::domain::KeeperResult;

/// Ordered byte store. Implementations use interior mutability so a single
/// handle can be shared by the keeper and the supply ledger.
pub trait KvStore: Send + Sync {
    fn get(&self, key: &str) -> KeeperResult<Option<Vec<u8>>>;
    fn set(&self, key: &str, value: Vec<u8>) -> KeeperResult<()>;
    fn delete(&self, key: &str) -> KeeperResult<()>;
    /// All entries whose key starts with `prefix`, in key order.
    fn scan_prefix(&self, prefix: &str) -> KeeperResult<Vec<(String, Vec<u8>)>>;

    fn has(&self, key: &str) -> KeeperResult<bool> {
        Ok(self.get(key)?.is_some())
    }
}
