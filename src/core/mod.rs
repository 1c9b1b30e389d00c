//! Foundational domain types shared by every pipeline stage.

pub mod condition;
pub mod currency;
pub mod entity;
pub mod error;
pub mod order;
pub mod result;

use rust_decimal::{Decimal, RoundingStrategy};

/// Round a monetary amount to 2 decimal places, midpoint away from zero.
///
/// Every derived amount in the pipeline (retention, profit shares, segment
/// splits) is rounded through here so all stages agree on the convention.
pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_round_money_half_up() {
        assert_eq!(round_money(dec!(1.005)), dec!(1.01));
        assert_eq!(round_money(dec!(1.004)), dec!(1.00));
        assert_eq!(round_money(dec!(-1.005)), dec!(-1.01));
    }
}
