//! Exact-integer fixed-point helpers.
//!
//! Every product of two wei-scale values is computed in 256 bits so that
//! `amount * ratio` never overflows before the division brings it back into
//! `u128` range.

use crate::WAD;

#[allow(clippy::all, clippy::unwrap_used, clippy::panic)]
mod u256 {
    uint::construct_uint! {
        /// 256-bit unsigned integer for intermediate products.
        pub struct U256(4);
    }
}

pub use u256::U256;

/// Rounding direction of a division.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rounding {
    /// Floor.
    Down,
    /// Ceiling.
    Up,
}

/// Arithmetic failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MathError {
    /// Division by zero.
    #[error("division by zero")]
    DivisionByZero,

    /// Result does not fit in 128 bits.
    #[error("arithmetic overflow")]
    Overflow,

    /// Subtraction went below zero.
    #[error("arithmetic underflow")]
    Underflow,
}

/// Compute `x * y / denominator` with the requested rounding.
///
/// # Errors
///
/// - [`MathError::DivisionByZero`] if `denominator` is zero
/// - [`MathError::Overflow`] if the quotient exceeds `u128::MAX`
pub fn mul_div(x: u128, y: u128, denominator: u128, rounding: Rounding) -> Result<u128, MathError> {
    if denominator == 0 {
        return Err(MathError::DivisionByZero);
    }
    let product = U256::from(x) * U256::from(y);
    let denominator = U256::from(denominator);
    let mut quotient = product / denominator;
    if rounding == Rounding::Up && !(product % denominator).is_zero() {
        quotient += U256::one();
    }
    if quotient > U256::from(u128::MAX) {
        return Err(MathError::Overflow);
    }
    Ok(quotient.low_u128())
}

/// `amount * ratio / WAD`, floored. `ratio` is 1e18-scaled.
pub fn wad_mul(amount: u128, ratio: u128) -> Result<u128, MathError> {
    mul_div(amount, ratio, WAD, Rounding::Down)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ONE_ETHER;
    use proptest::prelude::*;

    #[test]
    fn test_mul_div_floor_and_ceil() {
        assert_eq!(mul_div(10, 1, 3, Rounding::Down), Ok(3));
        assert_eq!(mul_div(10, 1, 3, Rounding::Up), Ok(4));
        assert_eq!(mul_div(9, 1, 3, Rounding::Up), Ok(3));
    }

    #[test]
    fn test_mul_div_wide_intermediate() {
        // 1e30 * 1e18 overflows u128 but the quotient does not.
        let amount = 1_000_000_000_000 * ONE_ETHER;
        assert_eq!(mul_div(amount, WAD, WAD, Rounding::Down), Ok(amount));
    }

    #[test]
    fn test_mul_div_division_by_zero() {
        assert_eq!(
            mul_div(1, 1, 0, Rounding::Down),
            Err(MathError::DivisionByZero)
        );
    }

    #[test]
    fn test_mul_div_overflow() {
        assert_eq!(
            mul_div(u128::MAX, 2, 1, Rounding::Down),
            Err(MathError::Overflow)
        );
    }

    #[test]
    fn test_wad_mul() {
        // 10% of 5 ETH
        assert_eq!(wad_mul(5 * ONE_ETHER, WAD / 10), Ok(ONE_ETHER / 2));
        assert_eq!(wad_mul(7, WAD / 2), Ok(3));
        assert_eq!(wad_mul(7, 0), Ok(0));
    }

    proptest! {
        #[test]
        fn prop_ceil_is_floor_or_floor_plus_one(
            x in 0u128..u128::from(u64::MAX),
            y in 0u128..u128::from(u64::MAX),
            d in 1u128..u128::from(u64::MAX),
        ) {
            let down = mul_div(x, y, d, Rounding::Down).expect("floor");
            let up = mul_div(x, y, d, Rounding::Up).expect("ceil");
            prop_assert!(up == down || up == down + 1);
        }
    }
}
