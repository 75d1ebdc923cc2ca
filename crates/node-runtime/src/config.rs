//! # Node Configuration
//!
//! Unified configuration for the chain parameters, logging and genesis.
//!
//! ## Validation Rules
//!
//! - At least one admin address must be configured
//! - Constant overrides must name a known constant
//! - Interval constants cannot be overridden to zero

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use shared_types::{Address, ProtocolVersion};
use tc_03_state_machine::ConstantName;

/// Constants the state machine divides or takes a modulo by.
const INTERVAL_CONSTANTS: [ConstantName; 6] = [
    ConstantName::FundMigrationInterval,
    ConstantName::RotatePerBlockHeight,
    ConstantName::RotateRetryBlocks,
    ConstantName::BadValidatorRate,
    ConstantName::OldValidatorRate,
    ConstantName::SigningTransactionPeriod,
];

/// Complete node configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    /// Chain parameters.
    pub chain: ChainConfig,
    /// Logging configuration.
    pub logging: LoggingConfig,
    /// Genesis configuration.
    pub genesis: GenesisConfig,
}

impl NodeConfig {
    /// Parse a JSON document; missing sections take their defaults.
    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(raw).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(format!("{}: {e}", path.display())))?;
        Self::from_json(&raw)
    }

    /// Validate configuration before the node starts.
    ///
    /// # Returns
    ///
    /// Returns `Err` if:
    /// - the admin list is empty
    /// - an override names an unknown constant
    /// - an interval constant is overridden to zero
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.chain.admins.is_empty() {
            return Err(ConfigError::NoAdmins);
        }
        for (name, value) in &self.chain.constant_overrides {
            let constant: ConstantName = name
                .parse()
                .map_err(|_| ConfigError::UnknownConstant(name.clone()))?;
            if *value == 0 && INTERVAL_CONSTANTS.contains(&constant) {
                return Err(ConfigError::ZeroInterval(constant.as_str().to_string()));
            }
        }
        Ok(())
    }
}

/// Configuration errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// No admin identity is configured.
    NoAdmins,
    /// Override of a constant that does not exist.
    UnknownConstant(String),
    /// Interval constant overridden to zero.
    ZeroInterval(String),
    /// Malformed configuration document.
    Parse(String),
    /// Configuration file could not be read.
    Io(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::NoAdmins => write!(
                f,
                "No admin addresses configured. Set chain.admins in the node configuration."
            ),
            ConfigError::UnknownConstant(name) => write!(f, "Unknown constant override: {name}"),
            ConfigError::ZeroInterval(name) => write!(f, "Interval constant {name} cannot be zero"),
            ConfigError::Parse(reason) => write!(f, "Invalid configuration: {reason}"),
            ConfigError::Io(reason) => write!(f, "Cannot read configuration: {reason}"),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Chain parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChainConfig {
    /// Identities allowed to set mimir values.
    pub admins: Vec<Address>,
    /// Lowest version a genesis operator may run.
    pub min_join_version: ProtocolVersion,
    /// Constant overrides installed as mimir values at genesis. Test
    /// networks use them to shorten churn and migration intervals.
    pub constant_overrides: BTreeMap<String, i64>,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            admins: Vec::new(),
            min_join_version: ProtocolVersion::new(0, 1, 0),
            constant_overrides: BTreeMap::new(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive used when `RUST_LOG` is unset.
    pub level: String,
    /// Print the module target of each record.
    pub with_target: bool,
    /// Colored output.
    pub ansi: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            with_target: true,
            ansi: true,
        }
    }
}

/// Genesis configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenesisConfig {
    /// JSON genesis state to import into an empty store.
    pub genesis_file: Option<PathBuf>,
    /// Height of the first executed block.
    pub initial_height: u64,
}

impl Default for GenesisConfig {
    fn default() -> Self {
        Self {
            genesis_file: None,
            initial_height: 1,
        }
    }
}
