//! # Memo Grammar
//!
//! Transactions observed on external chains describe their intent in the
//! memo field: `TYPE:ARG1:ARG2:...`. Opcodes are case-insensitive and most
//! have short aliases (`+` for stake, `=` for swap and so on).

use std::fmt;
use std::str::FromStr;

use shared_types::{Address, Amount, Asset, TxId};

use super::errors::{HandlerError, HandlerResult};

/// Largest unstake share, in basis points.
pub const MAX_BASIS_POINTS: u64 = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TxType {
    Stake,
    Unstake,
    Swap,
    Outbound,
    Refund,
    Add,
    Gas,
    Bond,
    Leave,
    YggdrasilFund,
    YggdrasilReturn,
    Reserve,
    Migrate,
    Ragnarok,
    Switch,
}

impl TxType {
    pub fn is_inbound(self) -> bool {
        matches!(
            self,
            TxType::Stake
                | TxType::Unstake
                | TxType::Swap
                | TxType::Add
                | TxType::Bond
                | TxType::Leave
                | TxType::Switch
                | TxType::Reserve
        )
    }

    pub fn is_outbound(self) -> bool {
        matches!(self, TxType::Outbound | TxType::Refund)
    }

    /// Vault-to-vault movements; these carry no protocol fee.
    pub fn is_internal(self) -> bool {
        matches!(
            self,
            TxType::YggdrasilFund | TxType::YggdrasilReturn | TxType::Migrate | TxType::Ragnarok
        )
    }
}

impl FromStr for TxType {
    type Err = HandlerError;

    fn from_str(s: &str) -> HandlerResult<Self> {
        let t = match s.to_ascii_lowercase().as_str() {
            "stake" | "st" | "+" | "create" => TxType::Stake,
            "withdraw" | "unstake" | "wd" | "-" => TxType::Unstake,
            "swap" | "s" | "=" => TxType::Swap,
            "outbound" => TxType::Outbound,
            "refund" => TxType::Refund,
            "add" | "a" | "%" => TxType::Add,
            "gas" => TxType::Gas,
            "bond" => TxType::Bond,
            "leave" => TxType::Leave,
            "yggdrasil+" => TxType::YggdrasilFund,
            "yggdrasil-" => TxType::YggdrasilReturn,
            "reserve" => TxType::Reserve,
            "migrate" => TxType::Migrate,
            "ragnarok" => TxType::Ragnarok,
            "switch" => TxType::Switch,
            other => return Err(HandlerError::InvalidMemo(format!("invalid tx type: {other}"))),
        };
        Ok(t)
    }
}

/// A parsed memo.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Memo {
    /// `address` is the staker's address on the asset chain; required off BNB.
    Stake { asset: Asset, address: Address },
    /// `basis_points` absent means everything.
    Unstake { asset: Asset, basis_points: Option<u64> },
    Swap {
        asset: Asset,
        /// Empty means back to the sender.
        destination: Address,
        /// Minimum emission, zero for no protection.
        trade_target: Amount,
    },
    Add { asset: Asset },
    Gas,
    Outbound { tx_id: TxId },
    Refund { tx_id: TxId },
    Bond { node_address: Address },
    Leave,
    YggdrasilFund { block_height: u64 },
    YggdrasilReturn { block_height: u64 },
    Reserve,
    Migrate { block_height: u64 },
    Ragnarok { block_height: u64 },
    Switch { destination: Address },
}

fn invalid(msg: impl Into<String>) -> HandlerError {
    HandlerError::InvalidMemo(msg.into())
}

fn part<'a>(parts: &[&'a str], i: usize) -> HandlerResult<&'a str> {
    parts
        .get(i)
        .copied()
        .filter(|p| !p.is_empty())
        .ok_or_else(|| invalid("not enough parameters"))
}

fn height(parts: &[&str]) -> HandlerResult<u64> {
    let raw = part(parts, 1)?;
    raw.parse()
        .map_err(|_| invalid(format!("fail to convert ({raw}) to a valid block height")))
}

impl Memo {
    pub fn parse(memo: &str) -> HandlerResult<Memo> {
        let memo = memo.trim();
        if memo.is_empty() {
            return Err(invalid("memo can't be empty"));
        }
        let parts: Vec<&str> = memo.split(':').collect();
        let tx_type: TxType = parts[0].parse()?;
        let asset = || -> HandlerResult<Asset> {
            let raw = part(&parts, 1)?;
            raw.parse::<Asset>().map_err(|e| invalid(e.to_string()))
        };

        let parsed = match tx_type {
            TxType::Leave => Memo::Leave,
            TxType::Gas => Memo::Gas,
            TxType::Reserve => Memo::Reserve,
            TxType::Add => Memo::Add { asset: asset()? },
            TxType::Stake => {
                let asset = asset()?;
                let address = if asset.chain.is_bnb() {
                    Address::default()
                } else {
                    let raw = parts.get(2).copied().unwrap_or_default();
                    if raw.is_empty() {
                        return Err(invalid(
                            "cannot stake to a non BNB-based pool without an associated address",
                        ));
                    }
                    raw.parse::<Address>().map_err(|e| invalid(e.to_string()))?
                };
                Memo::Stake { asset, address }
            }
            TxType::Unstake => {
                let asset = asset()?;
                let basis_points = match parts.get(2).copied().filter(|p| !p.is_empty()) {
                    None => None,
                    Some(raw) => {
                        let bp: u64 = raw
                            .parse()
                            .map_err(|_| invalid(format!("withdraw amount: {raw} is invalid")))?;
                        if bp == 0 || bp > MAX_BASIS_POINTS {
                            return Err(invalid(format!("withdraw amount: {raw} is invalid")));
                        }
                        Some(bp)
                    }
                };
                Memo::Unstake { asset, basis_points }
            }
            TxType::Swap => {
                let asset = asset()?;
                let destination = match parts.get(2).copied().filter(|p| !p.is_empty()) {
                    Some(raw) => raw.parse::<Address>().map_err(|e| invalid(e.to_string()))?,
                    None => Address::default(),
                };
                let trade_target = match parts.get(3).copied().filter(|p| !p.is_empty()) {
                    Some(raw) => raw
                        .parse::<Amount>()
                        .map_err(|_| invalid(format!("swap price limit: {raw} is invalid")))?,
                    None => 0,
                };
                Memo::Swap {
                    asset,
                    destination,
                    trade_target,
                }
            }
            TxType::Outbound | TxType::Refund => {
                let raw = part(&parts, 1)?;
                let tx_id: TxId = raw.parse().map_err(|e: shared_types::TypeError| invalid(e.to_string()))?;
                if tx_type == TxType::Outbound {
                    Memo::Outbound { tx_id }
                } else {
                    Memo::Refund { tx_id }
                }
            }
            TxType::Bond => {
                let raw = part(&parts, 1)?;
                Memo::Bond {
                    node_address: raw.parse::<Address>().map_err(|e| invalid(e.to_string()))?,
                }
            }
            TxType::YggdrasilFund => Memo::YggdrasilFund {
                block_height: height(&parts)?,
            },
            TxType::YggdrasilReturn => Memo::YggdrasilReturn {
                block_height: height(&parts)?,
            },
            TxType::Migrate => Memo::Migrate {
                block_height: height(&parts)?,
            },
            TxType::Ragnarok => Memo::Ragnarok {
                block_height: height(&parts)?,
            },
            TxType::Switch => {
                let raw = part(&parts, 1).map_err(|_| invalid("address cannot be empty"))?;
                Memo::Switch {
                    destination: raw.parse::<Address>().map_err(|e| invalid(e.to_string()))?,
                }
            }
        };
        Ok(parsed)
    }

    pub fn tx_type(&self) -> TxType {
        match self {
            Memo::Stake { .. } => TxType::Stake,
            Memo::Unstake { .. } => TxType::Unstake,
            Memo::Swap { .. } => TxType::Swap,
            Memo::Add { .. } => TxType::Add,
            Memo::Gas => TxType::Gas,
            Memo::Outbound { .. } => TxType::Outbound,
            Memo::Refund { .. } => TxType::Refund,
            Memo::Bond { .. } => TxType::Bond,
            Memo::Leave => TxType::Leave,
            Memo::YggdrasilFund { .. } => TxType::YggdrasilFund,
            Memo::YggdrasilReturn { .. } => TxType::YggdrasilReturn,
            Memo::Reserve => TxType::Reserve,
            Memo::Migrate { .. } => TxType::Migrate,
            Memo::Ragnarok { .. } => TxType::Ragnarok,
            Memo::Switch { .. } => TxType::Switch,
        }
    }

    pub fn is_internal(&self) -> bool {
        self.tx_type().is_internal()
    }

    pub fn is_outbound(&self) -> bool {
        self.tx_type().is_outbound()
    }
}

/// Canonical rendering of the memos the state machine writes itself.
impl fmt::Display for Memo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Memo::Outbound { tx_id } => write!(f, "OUTBOUND:{tx_id}"),
            Memo::Refund { tx_id } => write!(f, "REFUND:{tx_id}"),
            Memo::YggdrasilFund { block_height } => write!(f, "YGGDRASIL+:{block_height}"),
            Memo::YggdrasilReturn { block_height } => write!(f, "YGGDRASIL-:{block_height}"),
            Memo::Migrate { block_height } => write!(f, "MIGRATE:{block_height}"),
            Memo::Ragnarok { block_height } => write!(f, "RAGNAROK:{block_height}"),
            Memo::Stake { asset, address } => write!(f, "STAKE:{asset}:{address}"),
            Memo::Unstake { asset, basis_points } => match basis_points {
                Some(bp) => write!(f, "WITHDRAW:{asset}:{bp}"),
                None => write!(f, "WITHDRAW:{asset}"),
            },
            Memo::Swap {
                asset,
                destination,
                trade_target,
            } => write!(f, "SWAP:{asset}:{destination}:{trade_target}"),
            Memo::Add { asset } => write!(f, "ADD:{asset}"),
            Memo::Gas => f.write_str("GAS"),
            Memo::Bond { node_address } => write!(f, "BOND:{node_address}"),
            Memo::Leave => f.write_str("LEAVE"),
            Memo::Reserve => f.write_str("RESERVE"),
            Memo::Switch { destination } => write!(f, "SWITCH:{destination}"),
        }
    }
}
