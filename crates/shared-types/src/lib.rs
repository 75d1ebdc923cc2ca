//! # Shared Types Crate
//!
//! Primitives used by every subsystem of the liquidity network.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: chains, assets, coins and addresses are
//!   defined once here and re-used by the keeper, the liquidity math and the
//!   state machine.
//! - **Validated Construction**: every identifier has a `FromStr` that
//!   normalises case and rejects malformed input, so downstream code never
//!   re-validates.
//! - **No Floating Point**: all amounts are integer base units; ratios are
//!   computed through [`math::get_share`] with 256-bit intermediates.

pub mod address;
pub mod asset;
pub mod chain;
pub mod coin;
pub mod errors;
pub mod math;
pub mod tx;
pub mod version;

pub use address::{Address, PubKey, PubKeySet};
pub use asset::Asset;
pub use chain::Chain;
pub use coin::{Coin, Coins};
pub use errors::{TypeError, TypeResult};
pub use math::{get_share, safe_sub, Amount, ONE};
pub use tx::{Gas, Tx, TxId};
pub use version::ProtocolVersion;
