use tracing::info;

use super::Handler;
use crate::domain::{Context, HandlerError, HandlerResult, Msg, MsgSetMimir};
use crate::managers::Env;

/// Admin override of a named constant. A negative value clears the
/// override.
#[derive(Debug, Clone, Copy, Default)]
pub struct SetMimirHandler;

impl Handler for SetMimirHandler {
    type Msg = MsgSetMimir;

    fn unwrap_msg<'m>(&self, msg: &'m Msg) -> Option<&'m Self::Msg> {
        match msg {
            Msg::SetMimir(m) => Some(m),
            _ => None,
        }
    }

    fn validate(&self, _ctx: &Context, env: &Env<'_>, msg: &Self::Msg) -> HandlerResult<()> {
        if !env.keeper.is_admin(&msg.signer)? {
            return Err(HandlerError::unauthorized(format!("{} is not an admin", msg.signer)));
        }
        Ok(())
    }

    fn handle(&self, ctx: &Context, env: &mut Env<'_>, msg: &Self::Msg) -> HandlerResult<()> {
        env.keeper.set_mimir(&msg.key, msg.value)?;
        info!(height = ctx.block_height, key = %msg.key, value = msg.value, "[dispatch] mimir set");
        Ok(())
    }
}
