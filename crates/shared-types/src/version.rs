//! Protocol version declared by operators (`major.minor.patch`).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::{TypeError, TypeResult};

/// Semantic protocol version. Ordering is lexicographic over the triple.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(try_from = "String", into = "String")]
pub struct ProtocolVersion {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
}

impl ProtocolVersion {
    pub const fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self { major, minor, patch }
    }

    /// True for the zero version assigned to accounts that never declared one.
    pub fn is_zero(&self) -> bool {
        *self == Self::default()
    }
}

impl FromStr for ProtocolVersion {
    type Err = TypeError;

    fn from_str(s: &str) -> TypeResult<Self> {
        let parts: Vec<&str> = s.trim().trim_start_matches('v').split('.').collect();
        if parts.len() != 3 {
            return Err(TypeError::InvalidVersion(s.to_string()));
        }
        let parse = |p: &str| p.parse::<u64>().map_err(|_| TypeError::InvalidVersion(s.to_string()));
        Ok(Self::new(parse(parts[0])?, parse(parts[1])?, parse(parts[2])?))
    }
}

impl TryFrom<String> for ProtocolVersion {
    type Error = TypeError;

    fn try_from(value: String) -> TypeResult<Self> {
        value.parse()
    }
}

impl From<ProtocolVersion> for String {
    fn from(v: ProtocolVersion) -> Self {
        v.to_string()
    }
}

impl fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}
