//! # Node Runtime
//!
//! Entry point of the liquidity network node.
//!
//! ## Environment
//!
//! - `TC_CONFIG` - JSON node configuration (defaults apply when unset)
//! - `TC_GENESIS` - JSON genesis state, overrides `genesis.genesis_file`
//! - `TC_BLOCKS` - JSON list of `{ "height", "msgs" }` blocks to replay
//! - `TC_EXPORT` - write the resulting state as genesis JSON to this path

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use node_runtime::{init_tracing, GenesisState, NodeConfig, NodeRuntime};
use serde::Deserialize;
use tc_03_state_machine::Msg;
use tracing::{info, warn};

#[derive(Debug, Deserialize)]
struct ReplayBlock {
    height: u64,
    #[serde(default)]
    msgs: Vec<Msg>,
}

fn load_config() -> Result<NodeConfig> {
    let mut config = match std::env::var("TC_CONFIG") {
        Ok(path) => NodeConfig::load(&PathBuf::from(path))?,
        Err(_) => NodeConfig::default(),
    };
    if let Ok(path) = std::env::var("TC_GENESIS") {
        config.genesis.genesis_file = Some(PathBuf::from(path));
    }
    Ok(config)
}

fn load_blocks() -> Result<Vec<ReplayBlock>> {
    let Ok(path) = std::env::var("TC_BLOCKS") else {
        return Ok(Vec::new());
    };
    let raw = std::fs::read_to_string(&path).with_context(|| format!("reading blocks file {path}"))?;
    serde_json::from_str(&raw).with_context(|| format!("parsing blocks file {path}"))
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = load_config()?;
    init_tracing(&config.logging);

    let Some(genesis_file) = config.genesis.genesis_file.clone() else {
        bail!("no genesis file configured, set TC_GENESIS or genesis.genesis_file");
    };
    let genesis = GenesisState::load(&genesis_file)?;
    let mut node = NodeRuntime::new(config, genesis)?;

    for block in load_blocks()? {
        let expected = node.next_height();
        if block.height != expected {
            bail!("block {} out of order, expected {expected}", block.height);
        }
        let outcome = node.executor().execute_block(block.height, &block.msgs)?;
        let rejected = outcome.tx_results.iter().filter(|r| !r.is_ok()).count();
        info!(
            height = outcome.height,
            txs = outcome.tx_results.len(),
            rejected,
            updates = outcome.validator_updates.len(),
            "[runtime] block executed"
        );
        if rejected > 0 {
            warn!(height = outcome.height, rejected, "[runtime] block carried rejected messages");
        }
    }

    if let Ok(path) = std::env::var("TC_EXPORT") {
        node.export_genesis()?.save(&PathBuf::from(&path))?;
        info!(path, "[runtime] state exported");
        return Ok(());
    }

    info!("Node is running. Press Ctrl+C to stop.");
    tokio::signal::ctrl_c().await?;
    info!("[runtime] shutting down");
    Ok(())
}
