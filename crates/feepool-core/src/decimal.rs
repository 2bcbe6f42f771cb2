//! 18-decimal fixed-point arithmetic
//!
//! All products go through a 256-bit intermediate so that
//! `amount * ratio` never overflows before the rescale, even for amounts
//! near `u128::MAX / UNIT`.

use crate::error::{FeePoolError, Result};
use crate::types::Amount;

pub use primitive_types::U256;

/// Decimal places of every amount and ratio
pub const DECIMALS: u8 = 18;

/// 1.0 in fixed-point
pub const UNIT: u128 = 1_000_000_000_000_000_000;

/// `a * b / denominator`, rounded down
pub fn mul_div(a: u128, b: u128, denominator: u128) -> Result<u128> {
    if denominator == 0 {
        return Err(FeePoolError::InvalidInput("division by zero".into()));
    }
    to_amount(U256::from(a) * U256::from(b) / U256::from(denominator))
}

/// Narrow a 256-bit intermediate back to an amount
pub fn to_amount(value: U256) -> Result<Amount> {
    if value > U256::from(u128::MAX) {
        return Err(FeePoolError::Overflow);
    }
    Ok(value.as_u128())
}

/// `x * y` where both are 18-decimal values
pub fn multiply_decimal(x: u128, y: u128) -> Result<u128> {
    mul_div(x, y, UNIT)
}

/// `x / y` where both are 18-decimal values
pub fn divide_decimal(x: u128, y: u128) -> Result<u128> {
    mul_div(x, UNIT, y)
}

pub fn checked_add(a: Amount, b: Amount) -> Result<Amount> {
    a.checked_add(b).ok_or(FeePoolError::Overflow)
}

pub fn checked_sub(a: Amount, b: Amount) -> Result<Amount> {
    a.checked_sub(b).ok_or(FeePoolError::Overflow)
}

/// Convert a whole number of tokens to fixed-point
pub const fn units(whole: u128) -> Amount {
    whole * UNIT
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_multiply_decimal_half() {
        let half = UNIT / 2;
        assert_eq!(multiply_decimal(units(1000), half).unwrap(), units(500));
    }

    #[test]
    fn test_divide_decimal() {
        assert_eq!(divide_decimal(units(1), units(4)).unwrap(), UNIT / 4);
    }

    #[test]
    fn test_large_product_does_not_overflow() {
        // 1e30 * 1e18 would overflow u128 without the wide intermediate
        let amount = 1_000_000_000_000 * UNIT;
        assert_eq!(multiply_decimal(amount, UNIT).unwrap(), amount);
    }

    #[test]
    fn test_result_overflow_detected() {
        let err = multiply_decimal(u128::MAX, 2 * UNIT).unwrap_err();
        assert_eq!(err, FeePoolError::Overflow);
    }

    #[test]
    fn test_to_amount_bounds() {
        assert_eq!(to_amount(U256::from(u128::MAX)).unwrap(), u128::MAX);
        assert_eq!(
            to_amount(U256::from(u128::MAX) + 1),
            Err(FeePoolError::Overflow)
        );
    }

    #[test]
    fn test_divide_by_zero() {
        assert!(matches!(
            divide_decimal(UNIT, 0),
            Err(FeePoolError::InvalidInput(_))
        ));
    }

    proptest! {
        #[test]
        fn prop_multiply_by_fraction_never_exceeds_amount(
            amount in 0u128..u128::MAX / 4,
            share in 0u128..=UNIT,
        ) {
            let part = multiply_decimal(amount, share).unwrap();
            prop_assert!(part <= amount);
        }

        #[test]
        fn prop_complementary_shares_sum_within_one(
            amount in 0u128..1_000_000_000 * UNIT,
            share in 0u128..=UNIT,
        ) {
            let a = multiply_decimal(amount, share).unwrap();
            let b = multiply_decimal(amount, UNIT - share).unwrap();
            prop_assert!(a + b <= amount);
            prop_assert!(amount - (a + b) <= 1);
        }
    }
}
