//! Decimal arithmetic utilities for order sizing and pricing.
//!
//! Every rounding here is half-up (midpoint away from zero). `Decimal::round_dp`
//! defaults to banker's rounding and must not be used for exchange values.

use rust_decimal::{Decimal, RoundingStrategy};

/// Round to a number of decimal places, half-up.
pub fn round_half_up(value: Decimal, decimals: u32) -> Decimal {
    value.round_dp_with_strategy(decimals, RoundingStrategy::MidpointAwayFromZero)
}

/// Snap a price to the nearest multiple of the tick size.
pub fn round_to_tick(value: Decimal, tick_size: Decimal) -> Decimal {
    if tick_size == Decimal::ZERO {
        return value;
    }
    round_half_up(value / tick_size, 0) * tick_size
}

/// Quantity bought with `notional` at `price`, rounded to `precision` places.
pub fn quantity_for_notional(notional: Decimal, price: Decimal, precision: u32) -> Option<Decimal> {
    if price <= Decimal::ZERO {
        return None;
    }
    Some(round_half_up(notional / price, precision))
}

/// Price `percentage` percent above `price`.
pub fn apply_percentage(price: Decimal, percentage: Decimal) -> Decimal {
    price * (Decimal::ONE + percentage / Decimal::ONE_HUNDRED)
}
