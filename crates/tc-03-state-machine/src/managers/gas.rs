//! # Gas Manager
//!
//! Outbound observations report the gas they burned. At EndBlock the reserve
//! reimburses each gas-asset pool in rune for the asset it lost, and a single
//! aggregated gas event is emitted.

use shared_types::{safe_sub, Gas, Tx};
use tc_01_keeper::{Event, EventPayload, EventStatus, GasPool, Keeper, KeeperResult};
use tracing::{info, warn};

use super::events::EventManager;

#[derive(Debug, Clone, Default)]
pub struct GasManager {
    gas: Vec<GasPool>,
}

impl GasManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record gas spent by one outbound.
    pub fn add_gas(&mut self, gas: &Gas) {
        for coin in gas {
            if coin.is_empty() {
                continue;
            }
            match self.gas.iter_mut().find(|g| g.asset == coin.asset) {
                Some(entry) => {
                    entry.asset_amt += coin.amount;
                    entry.count += 1;
                }
                None => self.gas.push(GasPool {
                    asset: coin.asset.clone(),
                    asset_amt: coin.amount,
                    rune_amt: 0,
                    count: 1,
                }),
            }
        }
    }

    pub fn gas(&self) -> &[GasPool] {
        &self.gas
    }

    /// Reimburse pools from the reserve. Any part the reserve cannot cover is
    /// recorded as a shortfall on the vault data.
    pub fn end_block(&mut self, height: u64, keeper: &dyn Keeper, events: &mut EventManager) -> KeeperResult<()> {
        if self.gas.is_empty() {
            return Ok(());
        }
        let mut vault_data = keeper.get_vault_data()?;
        let mut paid = Vec::with_capacity(self.gas.len());

        for mut entry in self.gas.drain(..) {
            let mut pool = keeper.get_pool(&entry.asset)?;
            if pool.is_empty() {
                warn!(asset = %entry.asset, "[gas] no pool for gas asset");
                continue;
            }
            let owed = pool.asset_value_in_rune(entry.asset_amt);
            let covered = owed.min(vault_data.total_reserve);
            if covered < owed {
                vault_data.gas_shortfall += owed - covered;
                warn!(asset = %entry.asset, owed, covered, "[gas] reserve cannot cover gas");
            }
            vault_data.total_reserve -= covered;
            pool.balance_rune += covered;
            pool.balance_asset = safe_sub(pool.balance_asset, entry.asset_amt);
            keeper.set_pool(&pool)?;

            entry.rune_amt = covered;
            paid.push(entry);
        }

        keeper.set_vault_data(&vault_data)?;
        if !paid.is_empty() {
            info!(height, pools = paid.len(), "[gas] reimbursed pools");
            events.add_event(Event::new(
                height,
                Tx::default(),
                EventPayload::Gas { pools: paid },
                EventStatus::Success,
            ));
        }
        Ok(())
    }
}
