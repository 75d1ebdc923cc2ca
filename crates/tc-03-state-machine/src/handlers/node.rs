//! # Operator Handlers
//!
//! Bonding, leaving, banning and the metadata an operator maintains about
//! itself.

use shared_types::PubKeySet;
use tc_01_keeper::{BondType, ConsensusVoter, Event, EventPayload, EventStatus, NodeAccount, NodeStatus};
use tracing::{debug, info};

use super::helpers::{refund_bond, require_active_signer};
use super::Handler;
use crate::constants::ConstantName;
use crate::domain::{
    Context, HandlerError, HandlerResult, Msg, MsgBan, MsgBond, MsgLeave, MsgSetIpAddress, MsgSetNodeKeys,
    MsgSetVersion,
};
use crate::managers::{Env, ValidatorManager};

/// Operators may only edit their metadata while outside the active set.
fn require_editable(na: &NodeAccount) -> HandlerResult<()> {
    if na.is_empty() {
        return Err(HandlerError::unauthorized(format!("{} is not a node account", na.node_address)));
    }
    match na.status {
        NodeStatus::Active | NodeStatus::Disabled => Err(HandlerError::unauthorized(format!(
            "node account {} is {}",
            na.node_address, na.status
        ))),
        _ => Ok(()),
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct BondHandler;

impl Handler for BondHandler {
    type Msg = MsgBond;

    fn unwrap_msg<'m>(&self, msg: &'m Msg) -> Option<&'m Self::Msg> {
        match msg {
            Msg::Bond(m) => Some(m),
            _ => None,
        }
    }

    fn validate(&self, _ctx: &Context, env: &Env<'_>, msg: &Self::Msg) -> HandlerResult<()> {
        require_active_signer(env, &msg.signer)?;
        let minimum = env.amount(ConstantName::MinimumBondInRune)?;
        if msg.bond < minimum {
            return Err(HandlerError::unknown_request(format!(
                "bond {} is below the minimum of {minimum}",
                msg.bond
            )));
        }
        let na = env.keeper.get_node_account(&msg.node_address)?;
        if !na.is_empty() && na.bond_address != msg.bond_address {
            return Err(HandlerError::unauthorized(format!(
                "{} is bonded from {}",
                na.node_address, na.bond_address
            )));
        }
        if na.status == NodeStatus::Disabled {
            return Err(HandlerError::unknown_request(format!("{} is disabled", na.node_address)));
        }
        Ok(())
    }

    fn handle(&self, ctx: &Context, env: &mut Env<'_>, msg: &Self::Msg) -> HandlerResult<()> {
        let mut na = env.keeper.get_node_account(&msg.node_address)?;
        if na.is_empty() {
            na = NodeAccount::new(
                msg.node_address.clone(),
                NodeStatus::WhiteListed,
                PubKeySet::default(),
                String::new(),
                0,
                msg.bond_address.clone(),
                ctx.block_height,
            );
        }
        na.bond += msg.bond;
        env.keeper.set_node_account(&na)?;
        env.emit(Event::new(
            ctx.block_height,
            msg.tx.clone(),
            EventPayload::Bond {
                amount: msg.bond,
                bond_type: BondType::Paid,
            },
            EventStatus::Success,
        ));
        info!(node = %na.node_address, bond = na.bond as u64, "[validator] bond paid");
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LeaveHandler;

impl Handler for LeaveHandler {
    type Msg = MsgLeave;

    fn unwrap_msg<'m>(&self, msg: &'m Msg) -> Option<&'m Self::Msg> {
        match msg {
            Msg::Leave(m) => Some(m),
            _ => None,
        }
    }

    fn validate(&self, _ctx: &Context, env: &Env<'_>, msg: &Self::Msg) -> HandlerResult<()> {
        require_active_signer(env, &msg.signer)?;
        let na = env.keeper.get_node_account(&msg.node_address)?;
        if na.is_empty() {
            return Err(HandlerError::unknown_request(format!("{} is not a node account", msg.node_address)));
        }
        if na.bond_address != msg.tx.from_address {
            return Err(HandlerError::unauthorized(format!(
                "{} is not the bond address of {}",
                msg.tx.from_address, na.node_address
            )));
        }
        if na.status == NodeStatus::Disabled {
            return Err(HandlerError::unknown_request(format!("{} already left", na.node_address)));
        }
        Ok(())
    }

    fn handle(&self, ctx: &Context, env: &mut Env<'_>, msg: &Self::Msg) -> HandlerResult<()> {
        let mut na = env.keeper.get_node_account(&msg.node_address)?;
        na.requested_to_leave = true;
        env.keeper.set_node_account(&na)?;
        if na.is_active() {
            info!(node = %na.node_address, "[validator] leave requested, waiting for churn");
            return Ok(());
        }

        match env.keeper.get_yggdrasil(&na)? {
            Some(ygg) if ygg.has_funds() => {
                ValidatorManager::for_version(env.version)?.request_ygg_return(ctx, env, &na)?;
                info!(node = %na.node_address, "[validator] leave waits for yggdrasil return");
            }
            _ => refund_bond(ctx, env, &msg.tx, na)?,
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct BanHandler;

impl Handler for BanHandler {
    type Msg = MsgBan;

    fn unwrap_msg<'m>(&self, msg: &'m Msg) -> Option<&'m Self::Msg> {
        match msg {
            Msg::Ban(m) => Some(m),
            _ => None,
        }
    }

    fn validate(&self, _ctx: &Context, env: &Env<'_>, msg: &Self::Msg) -> HandlerResult<()> {
        require_active_signer(env, &msg.signer)?;
        let target = env.keeper.get_node_account(&msg.node_address)?;
        if target.is_empty() {
            return Err(HandlerError::unknown_request(format!("{} is not a node account", msg.node_address)));
        }
        if target.status == NodeStatus::Disabled {
            return Err(HandlerError::unknown_request(format!("{} is already disabled", msg.node_address)));
        }
        Ok(())
    }

    fn handle(&self, ctx: &Context, env: &mut Env<'_>, msg: &Self::Msg) -> HandlerResult<()> {
        let mut voter = env.keeper.get_ban_voter(&msg.node_address)?;
        if voter.consensus_height() > 0 || !voter.sign(msg.signer.clone()) {
            debug!(target = %msg.node_address, signer = %msg.signer, "[validator] ban vote ignored");
            return Ok(());
        }

        // every banner pays a small fee into the reserve
        let mut banner = env.keeper.get_node_account(&msg.signer)?;
        if !banner.is_empty() {
            let cost = (env.amount(ConstantName::MinimumBondInRune)? / 1_000).min(banner.bond);
            banner.bond -= cost;
            env.keeper.set_node_account(&banner)?;
            let mut data = env.keeper.get_vault_data()?;
            data.total_reserve += cost;
            env.keeper.set_vault_data(&data)?;
        }

        let active = env.keeper.list_active_node_accounts()?;
        if voter.commit(ctx.block_height, &active) {
            let mut target = env.keeper.get_node_account(&msg.node_address)?;
            target.forced_to_leave = true;
            target.leave_height = ctx.block_height;
            if !target.is_active() {
                target.update_status(NodeStatus::Disabled, ctx.block_height)?;
            }
            env.keeper.set_node_account(&target)?;
            info!(target = %target.node_address, height = ctx.block_height, "[validator] node banned");
        }
        env.keeper.set_ban_voter(&voter)?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SetNodeKeysHandler;

impl Handler for SetNodeKeysHandler {
    type Msg = MsgSetNodeKeys;

    fn unwrap_msg<'m>(&self, msg: &'m Msg) -> Option<&'m Self::Msg> {
        match msg {
            Msg::SetNodeKeys(m) => Some(m),
            _ => None,
        }
    }

    fn validate(&self, _ctx: &Context, env: &Env<'_>, msg: &Self::Msg) -> HandlerResult<()> {
        let na = env.keeper.get_node_account(&msg.signer)?;
        require_editable(&na)?;
        env.keeper
            .ensure_node_keys_unique(&na.node_address, &msg.pub_key_set, &msg.validator_cons_pub_key)?;
        Ok(())
    }

    fn handle(&self, ctx: &Context, env: &mut Env<'_>, msg: &Self::Msg) -> HandlerResult<()> {
        let mut na = env.keeper.get_node_account(&msg.signer)?;
        na.pub_key_set = msg.pub_key_set.clone();
        na.validator_cons_pub_key = msg.validator_cons_pub_key.clone();
        na.version = msg.version;
        na.update_status(NodeStatus::Standby, ctx.block_height)?;
        env.keeper.set_node_account(&na)?;
        info!(node = %na.node_address, "[validator] node keys set");
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SetIpAddressHandler;

impl Handler for SetIpAddressHandler {
    type Msg = MsgSetIpAddress;

    fn unwrap_msg<'m>(&self, msg: &'m Msg) -> Option<&'m Self::Msg> {
        match msg {
            Msg::SetIpAddress(m) => Some(m),
            _ => None,
        }
    }

    fn validate(&self, _ctx: &Context, env: &Env<'_>, msg: &Self::Msg) -> HandlerResult<()> {
        require_editable(&env.keeper.get_node_account(&msg.signer)?)
    }

    fn handle(&self, _ctx: &Context, env: &mut Env<'_>, msg: &Self::Msg) -> HandlerResult<()> {
        let mut na = env.keeper.get_node_account(&msg.signer)?;
        na.ip_address = msg.ip_address.clone();
        env.keeper.set_node_account(&na)?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SetVersionHandler;

impl Handler for SetVersionHandler {
    type Msg = MsgSetVersion;

    fn unwrap_msg<'m>(&self, msg: &'m Msg) -> Option<&'m Self::Msg> {
        match msg {
            Msg::SetVersion(m) => Some(m),
            _ => None,
        }
    }

    fn validate(&self, _ctx: &Context, env: &Env<'_>, msg: &Self::Msg) -> HandlerResult<()> {
        let na = env.keeper.get_node_account(&msg.signer)?;
        if na.is_empty() {
            return Err(HandlerError::unauthorized(format!("{} is not a node account", msg.signer)));
        }
        if msg.version < na.version {
            return Err(HandlerError::unknown_request(format!(
                "cannot downgrade from {} to {}",
                na.version, msg.version
            )));
        }
        Ok(())
    }

    fn handle(&self, _ctx: &Context, env: &mut Env<'_>, msg: &Self::Msg) -> HandlerResult<()> {
        let mut na = env.keeper.get_node_account(&msg.signer)?;
        na.version = msg.version;
        env.keeper.set_node_account(&na)?;
        Ok(())
    }
}
