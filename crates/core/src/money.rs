//! Monetary arithmetic on `rust_decimal::Decimal`.
//!
//! All amounts are finalized with the same rule: two decimal places,
//! round-half-up (midpoint away from zero). Callers round once, at the point a
//! value is final, and never re-round an already finalized amount.

use rust_decimal::{Decimal, RoundingStrategy};

/// Number of decimal places carried by finalized monetary amounts.
pub const MONEY_SCALE: u32 = 2;

/// Round to [`MONEY_SCALE`] places, half-up, and pin the scale so `1200`
/// renders as `1200.00`.
pub fn round_money(value: Decimal) -> Decimal {
    let mut rounded =
        value.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(MONEY_SCALE);
    rounded
}

/// `amount * percent / 100`, unrounded. `None` on overflow.
pub fn percent_of(amount: Decimal, percent: Decimal) -> Option<Decimal> {
    amount
        .checked_mul(percent)?
        .checked_div(Decimal::ONE_HUNDRED)
}
