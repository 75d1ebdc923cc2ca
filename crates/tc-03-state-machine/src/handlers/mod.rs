//! # Message Handlers
//!
//! One handler per message type. Every handler runs the same pipeline:
//!
//! ```text
//! version gate ──► unwrap ──► validate_basic ──► validate ──► handle
//! ```
//!
//! [`dispatch`] routes a [`Msg`] to its handler. [`process_derived`] drains
//! the work queued by handlers (committed observations and synthesised
//! messages) until nothing is left.

pub mod helpers;
pub mod liquidity;
pub mod mimir;
pub mod native;
pub mod node;
pub mod observed;
pub mod outbound;
pub mod reserve;
pub mod tss;
pub mod yggdrasil;

use shared_types::ProtocolVersion;
use tracing::{debug, warn};

use crate::domain::{Context, HandlerError, HandlerResult, Msg};
use crate::managers::{Derived, Env, V1};

pub use helpers::{enable_next_pool, is_signed_by_active_node, process_one_tx_in, refund_bond, refund_tx};

/// Upper bound on derived work drained after a single message.
pub const MAX_DERIVED_PER_MESSAGE: usize = 10_000;

/// Shared handler pipeline.
pub trait Handler {
    type Msg;

    /// Lowest protocol version the handler serves.
    fn min_version(&self) -> ProtocolVersion {
        V1
    }

    fn unwrap_msg<'m>(&self, msg: &'m Msg) -> Option<&'m Self::Msg>;

    /// Stateful checks. Must not write.
    fn validate(&self, ctx: &Context, env: &Env<'_>, msg: &Self::Msg) -> HandlerResult<()>;

    fn handle(&self, ctx: &Context, env: &mut Env<'_>, msg: &Self::Msg) -> HandlerResult<()>;

    fn run(&self, ctx: &Context, env: &mut Env<'_>, msg: &Msg) -> HandlerResult<()> {
        if env.version < self.min_version() {
            return Err(HandlerError::BadVersion(env.version));
        }
        let inner = self
            .unwrap_msg(msg)
            .ok_or_else(|| HandlerError::InvalidMessage(format!("unexpected message {}", msg.msg_type())))?;
        msg.validate_basic()?;
        self.validate(ctx, env, inner)?;
        self.handle(ctx, env, inner)
    }
}

/// Route `msg` to its handler. Does not drain derived work.
pub fn dispatch(ctx: &Context, env: &mut Env<'_>, msg: &Msg) -> HandlerResult<()> {
    let result = match msg {
        Msg::ObservedTxIn(_) => observed::ObservedTxInHandler.run(ctx, env, msg),
        Msg::ObservedTxOut(_) => observed::ObservedTxOutHandler.run(ctx, env, msg),
        Msg::Stake(_) => liquidity::StakeHandler.run(ctx, env, msg),
        Msg::Unstake(_) => liquidity::UnstakeHandler.run(ctx, env, msg),
        Msg::Swap(_) => liquidity::SwapHandler.run(ctx, env, msg),
        Msg::Add(_) => liquidity::AddHandler.run(ctx, env, msg),
        Msg::Bond(_) => node::BondHandler.run(ctx, env, msg),
        Msg::Leave(_) => node::LeaveHandler.run(ctx, env, msg),
        Msg::Ban(_) => node::BanHandler.run(ctx, env, msg),
        Msg::SetNodeKeys(_) => node::SetNodeKeysHandler.run(ctx, env, msg),
        Msg::SetIpAddress(_) => node::SetIpAddressHandler.run(ctx, env, msg),
        Msg::SetVersion(_) => node::SetVersionHandler.run(ctx, env, msg),
        Msg::TssPool(_) => tss::TssPoolHandler.run(ctx, env, msg),
        Msg::TssKeysignFail(_) => tss::TssKeysignFailHandler.run(ctx, env, msg),
        Msg::Yggdrasil(_) => yggdrasil::YggdrasilHandler.run(ctx, env, msg),
        Msg::ReserveContributor(_) => reserve::ReserveContributorHandler.run(ctx, env, msg),
        Msg::NativeTx(_) => native::NativeTxHandler.run(ctx, env, msg),
        Msg::Send(_) => native::SendHandler.run(ctx, env, msg),
        Msg::Switch(_) => native::SwitchHandler.run(ctx, env, msg),
        Msg::Outbound(_) => outbound::OutboundHandler.run(ctx, env, msg),
        Msg::SetMimir(_) => mimir::SetMimirHandler.run(ctx, env, msg),
        Msg::NoOp(_) => outbound::NoOpHandler.run(ctx, env, msg),
    };
    if let Err(err) = &result {
        warn!(
            height = ctx.block_height,
            msg = %msg.msg_type(),
            code = %err.code(),
            error = %err,
            "[dispatch] message rejected"
        );
    }
    result
}

/// Drain the derived queue. Failures of derived work never fail the
/// message that produced it: observations are refunded, messages dropped.
pub fn process_derived(ctx: &Context, env: &mut Env<'_>) -> HandlerResult<()> {
    let mut processed = 0usize;
    while let Some(work) = env.derived.pop_front() {
        processed += 1;
        if processed > MAX_DERIVED_PER_MESSAGE {
            env.derived.clear();
            return Err(HandlerError::internal("derived work did not settle"));
        }
        match work {
            Derived::Observed { tx, signer } => process_observed(ctx, env, &tx, &signer)?,
            Derived::Msg(msg) => {
                if let Err(err) = dispatch(ctx, env, &msg) {
                    debug!(msg = %msg.msg_type(), error = %err, "[dispatch] derived message dropped");
                }
            }
        }
    }
    Ok(())
}

fn process_observed(
    ctx: &Context,
    env: &mut Env<'_>,
    observed: &tc_01_keeper::ObservedTx,
    signer: &shared_types::Address,
) -> HandlerResult<()> {
    let ctx = ctx.clone().with_tx_id(observed.tx.id.clone());
    let result = process_one_tx_in(env, observed, signer).and_then(|msg| dispatch(&ctx, env, &msg));
    let Err(err) = result else {
        return Ok(());
    };

    let refundable = match crate::domain::Memo::parse(&observed.tx.memo) {
        Ok(memo) => memo.tx_type().is_inbound(),
        Err(_) => true,
    };
    if !refundable {
        warn!(tx = %observed.tx.id, error = %err, "[dispatch] observed outbound not processed");
        return Ok(());
    }
    if let Err(refund_err) = refund_tx(&ctx, env, observed, err.code(), &err.to_string()) {
        warn!(tx = %observed.tx.id, error = %refund_err, "[dispatch] refund failed");
    }
    Ok(())
}
