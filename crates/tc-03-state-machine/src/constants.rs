//! # Protocol Constants
//!
//! One table per protocol version band. Handlers read constants through
//! [`crate::managers::Env::int`], which lets an admin-set mimir value of the
//! same name shadow the table.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use lazy_static::lazy_static;
use shared_types::ProtocolVersion;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ConstantName {
    EmissionCurve,
    BlocksPerYear,
    TransactionFee,
    MinimumNodesForYggdrasil,
    MinimumNodesForBFT,
    DesireValidatorSet,
    FundMigrationInterval,
    RotatePerBlockHeight,
    RotateRetryBlocks,
    BadValidatorRate,
    OldValidatorRate,
    LackOfObservationPenalty,
    SigningTransactionPeriod,
    MinimumBondInRune,
    ArtificialRagnarokBlockHeight,
    FailKeygenSlashPoints,
    FailKeySignSlashPoints,
    StakeLockUpBlocks,
    GlobalSlipLimit,
    MaxUnstakeBasisPoints,
    NewPoolCycle,
    DefaultPoolStatus,
}

impl ConstantName {
    pub const ALL: [ConstantName; 22] = [
        ConstantName::EmissionCurve,
        ConstantName::BlocksPerYear,
        ConstantName::TransactionFee,
        ConstantName::MinimumNodesForYggdrasil,
        ConstantName::MinimumNodesForBFT,
        ConstantName::DesireValidatorSet,
        ConstantName::FundMigrationInterval,
        ConstantName::RotatePerBlockHeight,
        ConstantName::RotateRetryBlocks,
        ConstantName::BadValidatorRate,
        ConstantName::OldValidatorRate,
        ConstantName::LackOfObservationPenalty,
        ConstantName::SigningTransactionPeriod,
        ConstantName::MinimumBondInRune,
        ConstantName::ArtificialRagnarokBlockHeight,
        ConstantName::FailKeygenSlashPoints,
        ConstantName::FailKeySignSlashPoints,
        ConstantName::StakeLockUpBlocks,
        ConstantName::GlobalSlipLimit,
        ConstantName::MaxUnstakeBasisPoints,
        ConstantName::NewPoolCycle,
        ConstantName::DefaultPoolStatus,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ConstantName::EmissionCurve => "EmissionCurve",
            ConstantName::BlocksPerYear => "BlocksPerYear",
            ConstantName::TransactionFee => "TransactionFee",
            ConstantName::MinimumNodesForYggdrasil => "MinimumNodesForYggdrasil",
            ConstantName::MinimumNodesForBFT => "MinimumNodesForBFT",
            ConstantName::DesireValidatorSet => "DesireValidatorSet",
            ConstantName::FundMigrationInterval => "FundMigrationInterval",
            ConstantName::RotatePerBlockHeight => "RotatePerBlockHeight",
            ConstantName::RotateRetryBlocks => "RotateRetryBlocks",
            ConstantName::BadValidatorRate => "BadValidatorRate",
            ConstantName::OldValidatorRate => "OldValidatorRate",
            ConstantName::LackOfObservationPenalty => "LackOfObservationPenalty",
            ConstantName::SigningTransactionPeriod => "SigningTransactionPeriod",
            ConstantName::MinimumBondInRune => "MinimumBondInRune",
            ConstantName::ArtificialRagnarokBlockHeight => "ArtificialRagnarokBlockHeight",
            ConstantName::FailKeygenSlashPoints => "FailKeygenSlashPoints",
            ConstantName::FailKeySignSlashPoints => "FailKeySignSlashPoints",
            ConstantName::StakeLockUpBlocks => "StakeLockUpBlocks",
            ConstantName::GlobalSlipLimit => "GlobalSlipLimit",
            ConstantName::MaxUnstakeBasisPoints => "MaxUnstakeBasisPoints",
            ConstantName::NewPoolCycle => "NewPoolCycle",
            ConstantName::DefaultPoolStatus => "DefaultPoolStatus",
        }
    }
}

impl fmt::Display for ConstantName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConstantName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ConstantName::ALL
            .iter()
            .copied()
            .find(|c| c.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown constant: {s}"))
    }
}

/// Constant table of one protocol version band.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstantValues {
    /// Lowest protocol version this table serves.
    pub min_version: ProtocolVersion,
    ints: BTreeMap<ConstantName, i64>,
    strings: BTreeMap<ConstantName, String>,
}

impl ConstantValues {
    fn v1() -> Self {
        use ConstantName::*;
        let ints = BTreeMap::from([
            (EmissionCurve, 6),
            (BlocksPerYear, 6_311_390),
            (TransactionFee, 100_000_000),
            (MinimumNodesForYggdrasil, 6),
            (MinimumNodesForBFT, 4),
            (DesireValidatorSet, 33),
            (FundMigrationInterval, 360),
            (RotatePerBlockHeight, 51_840),
            (RotateRetryBlocks, 720),
            (BadValidatorRate, 51_840),
            (OldValidatorRate, 51_840),
            (LackOfObservationPenalty, 2),
            (SigningTransactionPeriod, 300),
            (MinimumBondInRune, 100_000_000_000_000),
            (ArtificialRagnarokBlockHeight, 0),
            (FailKeygenSlashPoints, 720),
            (FailKeySignSlashPoints, 2),
            (StakeLockUpBlocks, 17_280),
            (GlobalSlipLimit, 3_000),
            (MaxUnstakeBasisPoints, 10_000),
            (NewPoolCycle, 50_000),
        ]);
        let strings = BTreeMap::from([(DefaultPoolStatus, "Bootstrap".to_string())]);
        Self {
            min_version: ProtocolVersion::new(0, 1, 0),
            ints,
            strings,
        }
    }

    /// Table serving `version`, `None` below the first band.
    pub fn for_version(version: ProtocolVersion) -> Option<&'static ConstantValues> {
        TABLES.iter().rev().find(|t| version >= t.min_version)
    }

    /// Table value, zero when the name has no integer entry.
    pub fn int(&self, name: ConstantName) -> i64 {
        self.ints.get(&name).copied().unwrap_or_default()
    }

    pub fn string(&self, name: ConstantName) -> &str {
        self.strings.get(&name).map(String::as_str).unwrap_or_default()
    }

    /// Replace a table value; used by test networks to shorten intervals.
    pub fn set_int(&mut self, name: ConstantName, value: i64) {
        self.ints.insert(name, value);
    }

    pub fn ints(&self) -> impl Iterator<Item = (ConstantName, i64)> + '_ {
        self.ints.iter().map(|(k, v)| (*k, *v))
    }
}

lazy_static! {
    /// Ordered by `min_version` ascending.
    static ref TABLES: Vec<ConstantValues> = vec![ConstantValues::v1()];
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_v1_table_for_released_versions() {
        let cv = ConstantValues::for_version(ProtocolVersion::new(0, 1, 0)).unwrap();
        assert_eq!(cv.int(ConstantName::TransactionFee), 100_000_000);
        assert_eq!(cv.int(ConstantName::MinimumNodesForBFT), 4);
        assert_eq!(cv.string(ConstantName::DefaultPoolStatus), "Bootstrap");
        assert!(ConstantValues::for_version(ProtocolVersion::new(2, 0, 0)).is_some());
    }

    #[test]
    fn test_no_table_below_first_band() {
        assert!(ConstantValues::for_version(ProtocolVersion::new(0, 0, 9)).is_none());
    }

    #[test]
    fn test_names_round_trip_case_insensitively() {
        for name in ConstantName::ALL {
            assert_eq!(name.as_str().to_lowercase().parse::<ConstantName>().unwrap(), name);
        }
    }
}
