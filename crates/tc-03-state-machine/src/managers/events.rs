//! # Event Manager
//!
//! Collects the block's domain events. Ids are assigned and the list is
//! persisted at EndBlock; pending swap/unstake events are indexed so their
//! completion can be matched later, or expired once they outlive the signing
//! window.

use shared_types::{Tx, TxId};
use tc_01_keeper::{Event, EventPayload, EventStatus, IncompleteEvent, Keeper, KeeperResult};
use tracing::{debug, warn};

#[derive(Debug, Clone, Default)]
pub struct EventManager {
    height: u64,
    events: Vec<Event>,
}

impl EventManager {
    pub fn new(height: u64) -> Self {
        Self {
            height,
            events: Vec::new(),
        }
    }

    pub fn height(&self) -> u64 {
        self.height
    }

    pub fn add_event(&mut self, event: Event) {
        debug!(kind = event.kind(), height = self.height, "[events] queued");
        self.events.push(event);
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Queue an `Expired` event for every indexed inbound whose pending event
    /// is more than `max_age` blocks old. Returns how many expired.
    pub fn expire_stale(&mut self, keeper: &dyn Keeper, max_age: u64) -> KeeperResult<usize> {
        let stale: Vec<IncompleteEvent> = keeper
            .get_incomplete_events()?
            .into_iter()
            .filter(|entry| entry.height.saturating_add(max_age) < self.height)
            .collect();
        for entry in &stale {
            warn!(in_tx = %entry.in_tx_id, pending_height = entry.height, "[events] pending event expired");
            let in_tx = Tx {
                id: entry.in_tx_id.clone(),
                ..Default::default()
            };
            self.add_event(Event::new(
                self.height,
                in_tx,
                EventPayload::Expired {
                    in_tx_id: entry.in_tx_id.clone(),
                    pending_height: entry.height,
                },
                EventStatus::Fail,
            ));
        }
        Ok(stale.len())
    }

    /// Persist the block's events and maintain the incomplete index.
    pub fn end_block(&mut self, keeper: &dyn Keeper) -> KeeperResult<()> {
        if self.events.is_empty() {
            return Ok(());
        }
        let mut next_id = keeper.get_last_event_id()?;
        let mut incomplete = keeper.get_incomplete_events()?;
        let mut stored = keeper.get_block_events(self.height)?;

        for mut event in self.events.drain(..) {
            next_id += 1;
            event.id = next_id;
            match (&event.payload, event.status) {
                (EventPayload::Outbound { in_tx_id, .. }, EventStatus::Success)
                | (EventPayload::Expired { in_tx_id, .. }, _) => {
                    incomplete.retain(|entry| &entry.in_tx_id != in_tx_id);
                }
                (_, EventStatus::Pending) if !event.in_tx.id.is_blank() => {
                    if !incomplete.iter().any(|entry| entry.in_tx_id == event.in_tx.id) {
                        incomplete.push(IncompleteEvent {
                            in_tx_id: event.in_tx.id.clone(),
                            height: self.height,
                        });
                    }
                }
                _ => {}
            }
            stored.push(event);
        }

        keeper.set_block_events(self.height, &stored)?;
        keeper.set_incomplete_events(&incomplete)?;
        keeper.set_last_event_id(next_id)?;
        debug!(height = self.height, count = stored.len(), "[events] flushed");
        Ok(())
    }
}

/// Whether `in_tx_id` still waits for outbounds.
pub fn is_incomplete(keeper: &dyn Keeper, in_tx_id: &TxId) -> KeeperResult<bool> {
    Ok(keeper
        .get_incomplete_events()?
        .iter()
        .any(|entry| &entry.in_tx_id == in_tx_id))
}
