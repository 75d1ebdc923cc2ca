//! # State Machine
//!
//! Replicated state machine of the liquidity network. Each block runs
//! through the [`StateMachine`] block service:
//!
//! ```text
//! begin_block ──► ValidatorManager::begin_block (genesis, churn triggers)
//!      │
//! deliver(msg) ──► Handler::run ──► derived work (observations, refunds)
//!      │
//! end_block ──► Slasher ──► ObserverManager ──► GasManager
//!               ──► vault data ──► ValidatorManager ──► VaultManager
//!               ──► EventManager flush ──► Vec<ValidatorUpdate>
//! ```
//!
//! ## Handler Pipeline
//!
//! | Step | Failure |
//! |------|---------|
//! | version gate | `BadVersion` |
//! | message routing | `UnknownRequest` |
//! | `validate_basic` | `InvalidMessage` / `InvalidMemo` |
//! | `validate` | `Unauthorized` and friends |
//! | `handle` | handler-specific |
//!
//! ## Invariants
//!
//! - Votes commit once, when the signers reach two thirds of the active set.
//! - An outbound item is never settled twice.
//! - Pool balances never go negative; slashes are clamped by the bond.
//!
//! Storage is reached only through the [`Keeper`](tc_01_keeper::Keeper) and
//! [`Supply`](tc_01_keeper::Supply) ports.

pub mod constants;
pub mod domain;
pub mod handlers;
pub mod managers;
pub mod service;

pub use constants::{ConstantName, ConstantValues};
pub use domain::{Context, ErrorCode, HandlerError, HandlerResult, Memo, Msg, TxType};
pub use handlers::{dispatch, process_derived, Handler};
pub use managers::{BlockManagers, Derived, Env, ValidatorUpdate};
pub use service::StateMachine;
