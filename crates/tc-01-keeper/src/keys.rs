//! # Key Schema
//!
//! Every key is `{prefix}_{schema}_{ID}` where `ID` is the upper-cased
//! logical identifier, so prefix iteration over the ordered store is
//! lexicographic and identical on every replica.

use std::fmt;

/// Version of the key layout, embedded in every key.
pub const SCHEMA_VERSION: u32 = 1;

/// Key namespaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Prefix {
    ObservedTxVoter,
    Pool,
    TxOut,
    TotalLiquidityFee,
    PoolLiquidityFee,
    PoolStaker,
    StakerPool,
    Admin,
    TxInIndex,
    IncompleteEvents,
    CompleteEvent,
    LastEventId,
    LastChainHeight,
    LastSignedHeight,
    NodeAccount,
    ActiveObserver,
    PoolAddresses,
    ValidatorMeta,
    SupportedChains,
    Yggdrasil,
    VaultData,
    ObservingAddresses,
    Reserves,
    BlockEvents,
    BlockGas,
    Keygen,
    // Entities the original prefix list folds into others.
    ObservedTxOutVoter,
    Vault,
    BanVoter,
    TssVoter,
    KeysignFailVoter,
    TxMarker,
    Mimir,
    Ragnarok,
    Balance,
    ModuleBalance,
}

impl Prefix {
    pub fn as_str(self) -> &'static str {
        match self {
            Prefix::ObservedTxVoter => "tx",
            Prefix::Pool => "pool",
            Prefix::TxOut => "txout",
            Prefix::TotalLiquidityFee => "total_liquidity_fee",
            Prefix::PoolLiquidityFee => "pool_liquidityfee",
            Prefix::PoolStaker => "pool_staker",
            Prefix::StakerPool => "staker_pool",
            Prefix::Admin => "admin",
            Prefix::TxInIndex => "txin_index",
            Prefix::IncompleteEvents => "incomplete_events",
            Prefix::CompleteEvent => "complete_event",
            Prefix::LastEventId => "last_event_id",
            Prefix::LastChainHeight => "last_chain_height",
            Prefix::LastSignedHeight => "last_signed_height",
            Prefix::NodeAccount => "node_account",
            Prefix::ActiveObserver => "active_observer",
            Prefix::PoolAddresses => "pool_addresses",
            Prefix::ValidatorMeta => "validator_meta",
            Prefix::SupportedChains => "supported_chains",
            Prefix::Yggdrasil => "yggdrasil",
            Prefix::VaultData => "vault_data",
            Prefix::ObservingAddresses => "observing_addresses",
            Prefix::Reserves => "reserves",
            Prefix::BlockEvents => "block_events",
            Prefix::BlockGas => "block_gas",
            Prefix::Keygen => "keygen",
            Prefix::ObservedTxOutVoter => "observed_txout",
            Prefix::Vault => "vault",
            Prefix::BanVoter => "ban",
            Prefix::TssVoter => "tss",
            Prefix::KeysignFailVoter => "tss_keysign_fail",
            Prefix::TxMarker => "txmarker",
            Prefix::Mimir => "mimir",
            Prefix::Ragnarok => "ragnarok",
            Prefix::Balance => "balance",
            Prefix::ModuleBalance => "module_balance",
        }
    }

    /// Iteration prefix: every key of this namespace starts with it.
    pub fn scan(self) -> String {
        format!("{}_{}_", self.as_str(), SCHEMA_VERSION)
    }

    /// Key of the entity identified by `id`.
    pub fn key(self, id: impl fmt::Display) -> String {
        format!("{}{}", self.scan(), id.to_string().to_uppercase())
    }

    /// Key of a singleton entry.
    pub fn singleton(self) -> String {
        self.key("")
    }
}

/// Zero-padded height so numeric order equals lexicographic order.
pub fn height_id(height: u64) -> String {
    format!("{height:020}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_embeds_schema_and_uppercases() {
        assert_eq!(Prefix::Pool.key("bnb.bnb"), "pool_1_BNB.BNB");
        assert!(Prefix::Pool.key("x").starts_with(&Prefix::Pool.scan()));
    }

    #[test]
    fn test_prefixes_do_not_overlap() {
        // "pool" must not be a scan prefix of "pool_staker".
        assert!(!Prefix::PoolStaker.key("a").starts_with(&Prefix::Pool.scan()));
        assert!(!Prefix::KeysignFailVoter.key("a").starts_with(&Prefix::TssVoter.scan()));
        assert!(!Prefix::ObservedTxOutVoter.key("a").starts_with(&Prefix::TxOut.scan()));
    }

    #[test]
    fn test_height_ids_sort_numerically() {
        assert!(height_id(9) < height_id(10));
    }
}
