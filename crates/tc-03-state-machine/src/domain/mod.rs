//! Messages, memos, execution context and error codes.

pub mod context;
pub mod errors;
pub mod memo;
pub mod msgs;

pub use context::Context;
pub use errors::{ErrorCode, HandlerError, HandlerResult};
pub use memo::{Memo, TxType, MAX_BASIS_POINTS};
pub use msgs::*;
