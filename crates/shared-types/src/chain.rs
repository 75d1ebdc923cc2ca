//! External chain identifiers.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::asset::Asset;
use crate::errors::{TypeError, TypeResult};

/// Ticker of an external (or the native) chain, always upper case.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(try_from = "String", into = "String")]
pub struct Chain(String);

impl Chain {
    /// The network's own ledger.
    pub const THOR: &'static str = "THOR";
    /// Binance chain.
    pub const BNB: &'static str = "BNB";
    /// Bitcoin.
    pub const BTC: &'static str = "BTC";
    /// Ethereum.
    pub const ETH: &'static str = "ETH";

    /// Native chain.
    pub fn thor() -> Self {
        Self(Self::THOR.to_string())
    }

    /// Binance chain.
    pub fn bnb() -> Self {
        Self(Self::BNB.to_string())
    }

    /// Bitcoin.
    pub fn btc() -> Self {
        Self(Self::BTC.to_string())
    }

    /// Ethereum.
    pub fn eth() -> Self {
        Self(Self::ETH.to_string())
    }

    /// True for the network's own ledger, whose outbounds settle immediately.
    pub fn is_native(&self) -> bool {
        self.0 == Self::THOR
    }

    pub fn is_bnb(&self) -> bool {
        self.0 == Self::BNB
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The asset used to pay fees on this chain.
    pub fn gas_asset(&self) -> Asset {
        match self.0.as_str() {
            Self::THOR => Asset::rune_native(),
            other => Asset::new(self.clone(), other, other),
        }
    }

    /// Short prefix used when rendering addresses derived from public keys.
    pub fn address_prefix(&self) -> String {
        match self.0.as_str() {
            Self::THOR => "thor".to_string(),
            Self::BNB => "bnb".to_string(),
            Self::BTC => "bc1".to_string(),
            Self::ETH => "0x".to_string(),
            other => other.to_lowercase(),
        }
    }
}

impl FromStr for Chain {
    type Err = TypeError;

    fn from_str(s: &str) -> TypeResult<Self> {
        let upper = s.trim().to_uppercase();
        if upper.is_empty() || upper.len() > 10 || !upper.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(TypeError::InvalidChain(s.to_string()));
        }
        Ok(Self(upper))
    }
}

/// Decoding accepts the empty chain written by `Chain::default()`.
impl TryFrom<String> for Chain {
    type Error = TypeError;

    fn try_from(value: String) -> TypeResult<Self> {
        if value.is_empty() {
            return Ok(Self::default());
        }
        value.parse()
    }
}

impl From<Chain> for String {
    fn from(chain: Chain) -> Self {
        chain.0
    }
}

impl fmt::Display for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_normalises_case() {
        let chain: Chain = "bnb".parse().unwrap();
        assert_eq!(chain, Chain::bnb());
        assert!(chain.is_bnb());
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!("".parse::<Chain>().is_err());
        assert!("B-N".parse::<Chain>().is_err());
    }

    #[test]
    fn test_gas_asset() {
        assert_eq!(Chain::btc().gas_asset().to_string(), "BTC.BTC");
        assert!(Chain::thor().gas_asset().is_rune());
    }
}
