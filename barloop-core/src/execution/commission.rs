//! Tiered per-share commission, applied when a fill arrives without one.

/// Per-share rate up to and including [`TIER_SHARES`].
pub const SMALL_LOT_RATE: f64 = 0.013;
/// Per-share rate above [`TIER_SHARES`].
pub const LARGE_LOT_RATE: f64 = 0.008;
pub const TIER_SHARES: u64 = 500;
/// Floor per fill.
pub const MIN_COMMISSION: f64 = 1.3;
/// Cap as a fraction of trade value.
pub const MAX_FRACTION_OF_VALUE: f64 = 0.005;

/// Commission for `quantity` shares traded at `price`.
///
/// The cap only applies when the trade has a positive value; an unpriced
/// trade pays the per-share amount (at least the floor).
pub fn tiered_commission(quantity: u64, price: f64) -> f64 {
    let rate = if quantity <= TIER_SHARES {
        SMALL_LOT_RATE
    } else {
        LARGE_LOT_RATE
    };
    let cost = (rate * quantity as f64).max(MIN_COMMISSION);
    let value = quantity as f64 * price;
    if value > 0.0 {
        cost.min(MAX_FRACTION_OF_VALUE * value)
    } else {
        cost
    }
}
