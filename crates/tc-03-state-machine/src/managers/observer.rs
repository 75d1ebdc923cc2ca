//! Tracks which operators had an observation accepted on each chain during
//! the block.

use std::collections::{BTreeMap, BTreeSet};

use shared_types::{Address, Chain};
use tc_01_keeper::{Keeper, KeeperResult};
use tracing::debug;

#[derive(Debug, Clone, Default)]
pub struct ObserverManager {
    chains: BTreeMap<Chain, BTreeSet<Address>>,
}

impl ObserverManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append_observer(&mut self, chain: Chain, addresses: impl IntoIterator<Item = Address>) {
        self.chains.entry(chain).or_default().extend(addresses);
    }

    /// Addresses that observed on every chain seen this block, sorted.
    pub fn list(&self) -> Vec<Address> {
        let mut sets = self.chains.values();
        let Some(first) = sets.next() else {
            return Vec::new();
        };
        let mut common = first.clone();
        for set in sets {
            common = common.intersection(set).cloned().collect();
        }
        common.into_iter().collect()
    }

    /// Merge this block's observers into the keeper list.
    pub fn end_block(&mut self, keeper: &dyn Keeper) -> KeeperResult<()> {
        let observed = self.list();
        self.chains.clear();
        if observed.is_empty() {
            return Ok(());
        }
        let mut all: BTreeSet<Address> = keeper.get_active_observers()?.into_iter().collect();
        all.extend(observed);
        debug!(count = all.len(), "[observer] active observers");
        keeper.set_active_observers(&all.into_iter().collect::<Vec<_>>())
    }
}
