//! External transactions as reported by observers.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::address::Address;
use crate::chain::Chain;
use crate::coin::Coins;
use crate::errors::{TypeError, TypeResult};

/// Fees paid on the external chain.
pub type Gas = Coins;

/// Hash of an external transaction, upper-case hex.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(try_from = "String", into = "String")]
pub struct TxId(String);

impl TxId {
    /// Placeholder id used by outbounds that answer no inbound.
    pub fn blank() -> Self {
        Self("0".repeat(64))
    }

    /// Id derived from arbitrary bytes (used for native and synthetic txs).
    pub fn from_bytes(data: &[u8]) -> Self {
        Self(hex::encode_upper(Sha256::digest(data)))
    }

    pub fn is_blank(&self) -> bool {
        self.0.chars().all(|c| c == '0')
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for TxId {
    type Err = TypeError;

    fn from_str(s: &str) -> TypeResult<Self> {
        let s = s.trim();
        if s.len() != 64 || !s.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(TypeError::InvalidTxId(s.to_string()));
        }
        Ok(Self(s.to_uppercase()))
    }
}

/// Decoding accepts the empty id written by `TxId::default()`.
impl TryFrom<String> for TxId {
    type Error = TypeError;

    fn try_from(value: String) -> TypeResult<Self> {
        if value.is_empty() {
            return Ok(Self::default());
        }
        value.parse()
    }
}

impl From<TxId> for String {
    fn from(id: TxId) -> Self {
        id.0
    }
}

impl fmt::Display for TxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A transaction on an external chain.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct Tx {
    pub id: TxId,
    pub chain: Chain,
    pub from_address: Address,
    pub to_address: Address,
    pub coins: Coins,
    pub gas: Gas,
    pub memo: String,
}

impl Tx {
    pub fn new(
        id: TxId,
        chain: Chain,
        from_address: Address,
        to_address: Address,
        coins: Coins,
        gas: Gas,
        memo: impl Into<String>,
    ) -> Self {
        Self {
            id,
            chain,
            from_address,
            to_address,
            coins,
            gas,
            memo: memo.into(),
        }
    }

    /// Static checks shared by every message carrying a tx.
    pub fn validate(&self) -> TypeResult<()> {
        if self.id.is_blank() {
            return Err(TypeError::InvalidTx("tx id cannot be blank".into()));
        }
        if self.chain.is_empty() {
            return Err(TypeError::InvalidTx("chain cannot be empty".into()));
        }
        if self.from_address.is_empty() {
            return Err(TypeError::InvalidTx("from address cannot be empty".into()));
        }
        if self.to_address.is_empty() {
            return Err(TypeError::InvalidTx("to address cannot be empty".into()));
        }
        self.coins.validate()?;
        if self.coins.iter().any(|c| c.asset.chain != self.chain) {
            return Err(TypeError::InvalidTx(format!("coins must all be on chain {}", self.chain)));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coin::Coin;

    fn sample() -> Tx {
        Tx::new(
            TxId::from_bytes(b"sample"),
            Chain::bnb(),
            Address::new("bnb1from"),
            Address::new("bnb1to"),
            Coins::new(vec![Coin::new("BNB.BNB".parse().unwrap(), 10)]),
            Coins::default(),
            "swap:BNB.BNB",
        )
    }

    #[test]
    fn test_tx_id_parse_uppercases() {
        let lower = "ab".repeat(32);
        let id: TxId = lower.parse().unwrap();
        assert_eq!(id.as_str(), "AB".repeat(32));
        assert!("xyz".parse::<TxId>().is_err());
        assert!(TxId::blank().is_blank());
    }

    #[test]
    fn test_validate_ok() {
        assert!(sample().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_cross_chain_coins() {
        let mut tx = sample();
        tx.coins.add(Coin::new("BTC.BTC".parse().unwrap(), 1));
        assert!(tx.validate().is_err());
    }

    #[test]
    fn test_default_tx_decodes() {
        let json = serde_json::to_string(&Tx::default()).unwrap();
        let back: Tx = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Tx::default());
        assert!("".parse::<TxId>().is_err());
    }

    #[test]
    fn test_validate_rejects_blank_id() {
        let mut tx = sample();
        tx.id = TxId::blank();
        assert!(tx.validate().is_err());
    }
}
