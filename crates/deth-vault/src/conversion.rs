//! Share/asset conversion.
//!
//! ```text
//! shares = assets * (total_shares + 1) / (total_assets + 1)
//! assets = shares * (total_assets + 1) / (total_shares + 1)
//! ```
//!
//! The `+1` on both sides keeps the empty vault at a 1:1 price and makes a
//! first-depositor donation attack cost as much as it could ever steal.

use deth_types::{mul_div, MathError, Rounding, Wei};

/// Convert `assets` to shares at the given totals.
pub fn convert_to_shares(
    assets: Wei,
    total_shares: Wei,
    total_assets: Wei,
    rounding: Rounding,
) -> Result<Wei, MathError> {
    mul_div(
        assets,
        total_shares.checked_add(1).ok_or(MathError::Overflow)?,
        total_assets.checked_add(1).ok_or(MathError::Overflow)?,
        rounding,
    )
}

/// Convert `shares` to assets at the given totals.
pub fn convert_to_assets(
    shares: Wei,
    total_shares: Wei,
    total_assets: Wei,
    rounding: Rounding,
) -> Result<Wei, MathError> {
    mul_div(
        shares,
        total_assets.checked_add(1).ok_or(MathError::Overflow)?,
        total_shares.checked_add(1).ok_or(MathError::Overflow)?,
        rounding,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use deth_types::ONE_ETHER;
    use proptest::prelude::*;

    #[test]
    fn test_empty_vault_is_one_to_one() {
        assert_eq!(
            convert_to_shares(ONE_ETHER, 0, 0, Rounding::Down),
            Ok(ONE_ETHER)
        );
        assert_eq!(
            convert_to_assets(ONE_ETHER, 0, 0, Rounding::Down),
            Ok(ONE_ETHER)
        );
    }

    #[test]
    fn test_rounding_direction() {
        // 3 shares backed by 4 assets: price 5/4.
        assert_eq!(convert_to_shares(2, 3, 4, Rounding::Down), Ok(1));
        assert_eq!(convert_to_shares(2, 3, 4, Rounding::Up), Ok(2));
        assert_eq!(convert_to_assets(3, 3, 4, Rounding::Down), Ok(3));
        assert_eq!(convert_to_assets(3, 3, 4, Rounding::Up), Ok(4));
    }

    #[test]
    fn test_donation_does_not_zero_out_depositor() {
        // Attacker holds 1 share and donates 1 ETH directly to the vault.
        // A 2 ETH deposit still mints a non-zero share amount.
        let shares = convert_to_shares(2 * ONE_ETHER, 1, ONE_ETHER + 1, Rounding::Down)
            .expect("convert");
        assert!(shares > 0);
    }

    proptest! {
        #[test]
        fn prop_round_trip_never_favors_depositor(
            total_shares in 0u128..1_000_000 * ONE_ETHER,
            total_assets in 0u128..1_000_000 * ONE_ETHER,
            amount in 0u128..10_000 * ONE_ETHER,
        ) {
            let down = convert_to_shares(amount, total_shares, total_assets, Rounding::Down)
                .expect("shares down");
            let back_down = convert_to_assets(down, total_shares, total_assets, Rounding::Down)
                .expect("assets down");
            prop_assert!(back_down <= amount);

            let up = convert_to_shares(amount, total_shares, total_assets, Rounding::Up)
                .expect("shares up");
            let back_up = convert_to_assets(up, total_shares, total_assets, Rounding::Up)
                .expect("assets up");
            prop_assert!(amount <= back_up);
        }
    }
}
