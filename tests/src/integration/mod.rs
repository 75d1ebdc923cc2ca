//! End-to-end scenarios. Each module drives the state machine over the
//! in-memory [`crate::harness::TestNet`] and checks the stored state.

pub mod liquidity;
pub mod node_lifecycle;
pub mod ragnarok;
pub mod runtime;
pub mod vaults;
