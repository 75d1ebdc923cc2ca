//! # Amount Arithmetic
//!
//! Amounts are unsigned base units (1e8 per whole coin). Products of two
//! amounts overflow `u128` for large pools, so every ratio goes through a
//! 256-bit intermediate.

use primitive_types::U256;

/// Base-unit quantity of any coin.
pub type Amount = u128;

/// One whole coin in base units.
pub const ONE: Amount = 100_000_000;

/// `allocation * part / total`, rounded down. Zero when `total` is zero.
pub fn get_share(part: Amount, total: Amount, allocation: Amount) -> Amount {
    mul_div(allocation, part, total)
}

/// `a * b / c` with a 256-bit intermediate, saturating at `Amount::MAX`.
pub fn mul_div(a: Amount, b: Amount, c: Amount) -> Amount {
    if c == 0 {
        return 0;
    }
    let result = U256::from(a) * U256::from(b) / U256::from(c);
    to_amount(result)
}

/// Narrow a 256-bit value back to an [`Amount`], saturating.
pub fn to_amount(value: U256) -> Amount {
    if value > U256::from(Amount::MAX) {
        Amount::MAX
    } else {
        value.low_u128()
    }
}

/// Subtraction that floors at zero.
pub fn safe_sub(a: Amount, b: Amount) -> Amount {
    a.saturating_sub(b)
}
