//! Decimal helpers shared by the alert rules and the projections.
//!
//! Everything here works on [`Decimal`] so threshold comparisons never see
//! binary floating point drift.

use rust_decimal::{Decimal, RoundingStrategy};

/// One hundred, for ratio <-> percent conversions
pub const HUNDRED: Decimal = Decimal::ONE_HUNDRED;

/// Convert a ratio (0.25) to a percentage (25)
pub fn to_percent(ratio: Decimal) -> Decimal {
    ratio * HUNDRED
}

/// Relative drop from `previous` to `current`.
///
/// Returns `None` when `previous` is not strictly positive, because a drop
/// relative to zero or a negative base is meaningless. A rise yields a
/// negative drop.
pub fn relative_drop(previous: Decimal, current: Decimal) -> Option<Decimal> {
    if previous <= Decimal::ZERO {
        return None;
    }
    previous
        .checked_sub(current)
        .and_then(|delta| delta.checked_div(previous))
}

/// Render with exactly two decimal places, rounding half to even
pub fn format_2dp(value: Decimal) -> String {
    let rounded = value.round_dp_with_strategy(2, RoundingStrategy::MidpointNearestEven);
    format!("{:.2}", rounded)
}

/// Render without trailing zeros (`20.00` -> `20`, `2.50` -> `2.5`)
pub fn format_compact(value: Decimal) -> String {
    value.normalize().to_string()
}
