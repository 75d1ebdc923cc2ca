use tc_01_keeper::{Event, EventPayload, EventStatus};
use tracing::info;

use super::helpers::require_active_signer;
use super::Handler;
use crate::domain::{Context, HandlerResult, Msg, MsgReserveContributor};
use crate::managers::Env;

/// Books a donation to the reserve. The coins themselves were credited to
/// the receiving vault by the inbound observation.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReserveContributorHandler;

impl Handler for ReserveContributorHandler {
    type Msg = MsgReserveContributor;

    fn unwrap_msg<'m>(&self, msg: &'m Msg) -> Option<&'m Self::Msg> {
        match msg {
            Msg::ReserveContributor(m) => Some(m),
            _ => None,
        }
    }

    fn validate(&self, _ctx: &Context, env: &Env<'_>, msg: &Self::Msg) -> HandlerResult<()> {
        require_active_signer(env, &msg.signer)
    }

    fn handle(&self, ctx: &Context, env: &mut Env<'_>, msg: &Self::Msg) -> HandlerResult<()> {
        let mut contributors = env.keeper.get_reserve_contributors()?;
        contributors.add(msg.contributor.clone());
        env.keeper.set_reserve_contributors(&contributors)?;

        let mut data = env.keeper.get_vault_data()?;
        data.total_reserve += msg.contributor.amount;
        env.keeper.set_vault_data(&data)?;

        env.emit(Event::new(
            ctx.block_height,
            msg.tx.clone(),
            EventPayload::Reserve {
                contributor: msg.contributor.clone(),
            },
            EventStatus::Success,
        ));
        info!(from = %msg.contributor.address, amount = msg.contributor.amount as u64, "[dispatch] reserve contribution");
        Ok(())
    }
}
