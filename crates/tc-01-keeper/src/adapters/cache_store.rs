//! # Cache-Wrapped Store
//!
//! Buffers writes over a parent store. Reads see the buffered writes
//! first. `commit` flushes the buffer to the parent; `discard` drops it.
//! The block executor wraps every delivered message in one of these so a
//! failed handler leaves no partial state behind.

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::domain::KeeperResult;
use crate::ports::KvStore;

pub struct CacheKvStore {
    parent: Arc<dyn KvStore>,
    /// `None` marks a pending delete.
    writes: RwLock<BTreeMap<String, Option<Vec<u8>>>>,
}

impl CacheKvStore {
    pub fn new(parent: Arc<dyn KvStore>) -> Self {
        Self {
            parent,
            writes: RwLock::new(BTreeMap::new()),
        }
    }

    /// Number of buffered writes and deletes.
    pub fn pending(&self) -> usize {
        self.writes.read().len()
    }

    pub fn commit(&self) -> KeeperResult<()> {
        let writes = std::mem::take(&mut *self.writes.write());
        for (key, value) in writes {
            match value {
                Some(v) => self.parent.set(&key, v)?,
                None => self.parent.delete(&key)?,
            }
        }
        Ok(())
    }

    pub fn discard(&self) {
        self.writes.write().clear();
    }
}

impl KvStore for CacheKvStore {
    fn get(&self, key: &str) -> KeeperResult<Option<Vec<u8>>> {
        if let Some(buffered) = self.writes.read().get(key) {
            return Ok(buffered.clone());
        }
        self.parent.get(key)
    }

    fn set(&self, key: &str, value: Vec<u8>) -> KeeperResult<()> {
        self.writes.write().insert(key.to_string(), Some(value));
        Ok(())
    }

    fn delete(&self, key: &str) -> KeeperResult<()> {
        self.writes.write().insert(key.to_string(), None);
        Ok(())
    }

    fn scan_prefix(&self, prefix: &str) -> KeeperResult<Vec<(String, Vec<u8>)>> {
        let mut merged: BTreeMap<String, Vec<u8>> = self.parent.scan_prefix(prefix)?.into_iter().collect();
        let writes = self.writes.read();
        for (key, value) in writes
            .range(prefix.to_string()..)
            .take_while(|(k, _)| k.starts_with(prefix))
        {
            match value {
                Some(v) => {
                    merged.insert(key.clone(), v.clone());
                }
                None => {
                    merged.remove(key);
                }
            }
        }
        Ok(merged.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::MemoryKvStore;

    fn setup() -> (Arc<MemoryKvStore>, CacheKvStore) {
        let parent = Arc::new(MemoryKvStore::new());
        parent.set("p_a", vec![1]).unwrap();
        parent.set("p_b", vec![2]).unwrap();
        let cache = CacheKvStore::new(parent.clone());
        (parent, cache)
    }

    #[test]
    fn test_reads_see_buffered_writes() {
        let (parent, cache) = setup();
        cache.set("p_a", vec![9]).unwrap();
        cache.delete("p_b").unwrap();
        cache.set("p_c", vec![3]).unwrap();
        assert_eq!(cache.get("p_a").unwrap(), Some(vec![9]));
        assert_eq!(cache.get("p_b").unwrap(), None);
        let scanned = cache.scan_prefix("p_").unwrap();
        assert_eq!(scanned, vec![("p_a".to_string(), vec![9]), ("p_c".to_string(), vec![3])]);
        // parent untouched until commit
        assert_eq!(parent.get("p_a").unwrap(), Some(vec![1]));
    }

    #[test]
    fn test_commit_and_discard() {
        let (parent, cache) = setup();
        cache.set("p_a", vec![9]).unwrap();
        cache.discard();
        assert_eq!(cache.pending(), 0);
        assert_eq!(cache.get("p_a").unwrap(), Some(vec![1]));

        cache.delete("p_b").unwrap();
        cache.commit().unwrap();
        assert_eq!(parent.get("p_b").unwrap(), None);
        assert_eq!(cache.pending(), 0);
    }
}
