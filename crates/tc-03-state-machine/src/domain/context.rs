//! Per-message execution context supplied by the consensus engine.

use shared_types::TxId;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Context {
    pub block_height: u64,
    /// Opaque identity of the enclosing engine transaction; native messages
    /// use it as the in-hash of the transfer they describe.
    pub tx_id: Option<TxId>,
}

impl Context {
    pub fn new(block_height: u64) -> Self {
        Self {
            block_height,
            tx_id: None,
        }
    }

    pub fn with_tx_id(mut self, tx_id: TxId) -> Self {
        self.tx_id = Some(tx_id);
        self
    }
}
