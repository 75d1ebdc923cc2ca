//! Assets are `CHAIN.SYMBOL` pairs; the ticker is the symbol up to the first `-`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::chain::Chain;
use crate::errors::{TypeError, TypeResult};

/// A token on a specific chain.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(try_from = "String", into = "String")]
pub struct Asset {
    /// Chain the asset lives on.
    pub chain: Chain,
    /// Full symbol including any issuer suffix (`RUNE-A1F`).
    pub symbol: String,
    /// Symbol without suffix (`RUNE`).
    pub ticker: String,
}

impl Asset {
    /// Build an asset from already-normalised parts.
    pub fn new(chain: Chain, symbol: &str, ticker: &str) -> Self {
        Self {
            chain,
            symbol: symbol.to_uppercase(),
            ticker: ticker.to_uppercase(),
        }
    }

    /// The BEP2 rune token used by external pools.
    pub fn rune() -> Self {
        Self::new(Chain::bnb(), "RUNE-A1F", "RUNE")
    }

    /// Rune on the native ledger.
    pub fn rune_native() -> Self {
        Self::new(Chain::thor(), "RUNE", "RUNE")
    }

    pub fn is_rune(&self) -> bool {
        self.ticker == "RUNE" && (self.chain.is_bnb() || self.chain.is_native())
    }

    /// True when the asset lives on the native ledger.
    pub fn is_native(&self) -> bool {
        self.chain.is_native()
    }

    pub fn is_bnb(&self) -> bool {
        self.chain.is_bnb() && self.ticker == "BNB"
    }

    pub fn is_empty(&self) -> bool {
        self.chain.is_empty() || self.symbol.is_empty()
    }

    /// True when this is the fee asset of its own chain.
    pub fn is_gas_asset(&self) -> bool {
        self.chain.gas_asset() == *self
    }
}

impl FromStr for Asset {
    type Err = TypeError;

    fn from_str(s: &str) -> TypeResult<Self> {
        let s = s.trim();
        let (chain, symbol) = match s.split_once('.') {
            Some((chain, symbol)) => (chain.parse::<Chain>()?, symbol),
            // bare symbols default to the BNB chain
            None => (Chain::bnb(), s),
        };
        if symbol.is_empty() || !symbol.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
            return Err(TypeError::InvalidAsset(s.to_string()));
        }
        let ticker = symbol.split('-').next().unwrap_or(symbol);
        Ok(Self::new(chain, symbol, ticker))
    }
}

/// Decoding accepts the empty asset written by `Asset::default()`.
impl TryFrom<String> for Asset {
    type Error = TypeError;

    fn try_from(value: String) -> TypeResult<Self> {
        if value.is_empty() {
            return Ok(Self::default());
        }
        value.parse()
    }
}

impl From<Asset> for String {
    fn from(asset: Asset) -> Self {
        if asset == Asset::default() {
            return String::new();
        }
        asset.to_string()
    }
}

impl fmt::Display for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.chain, self.symbol)
    }
}
