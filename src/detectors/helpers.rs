//! Shared thresholds and geometry helpers for kline classification
//!
//! Fixed policy thresholds used by the single-bar classifier and the signal engine.

// ============================================================
// SHAPE THRESHOLDS (ratios of the bar's high-low range)
// ============================================================

/// Body is doji-like: body_ratio <= DOJI_BODY_RATIO
pub const DOJI_BODY_RATIO: f64 = 0.1;
/// Small body for spinning tops and hammer family
pub const SMALL_BODY_RATIO: f64 = 0.3;
/// Both shadows above this make a spinning top
pub const SPINNING_SHADOW_RATIO: f64 = 0.3;
/// Dominant shadow of hammer / shooting star
pub const LONG_SHADOW_RATIO: f64 = 0.6;
/// Opposite shadow of hammer / shooting star must stay below this
pub const SHORT_SHADOW_RATIO: f64 = 0.1;
/// Marubozu: body covers nearly the whole range
pub const MARUBOZU_BODY_RATIO: f64 = 0.9;

// ============================================================
// STRENGTH TIERS (body size in price steps)
// ============================================================

pub const VERY_STRONG_POINTS: f64 = 20.0;
pub const STRONG_POINTS: f64 = 15.0;
pub const MODERATE_POINTS: f64 = 10.0;
pub const WEAK_POINTS: f64 = 5.0;

// ============================================================
// ENGULFING
// ============================================================

/// Engulf ratio used when the engulfed body is zero
pub const DEFAULT_ENGULF_RATIO: f64 = 2.0;
/// Engulf ratio at or above which a match is "strong"
pub const STRONG_ENGULF_RATIO: f64 = 2.0;

// ============================================================
// PRICE COMPARISON
// ============================================================

/// Absolute tolerance for "price sits at the period extreme"
pub const EXTREME_TOLERANCE: f64 = 1e-6;

/// Tolerance-based equality for prices. Never compare extremes with `==`.
#[inline]
pub fn at_extreme(price: f64, extreme: f64) -> bool {
    (price - extreme).abs() < EXTREME_TOLERANCE
}

/// `part / range`, or 0 when the range is not positive.
#[inline]
pub fn ratio_of_range(part: f64, range: f64) -> f64 {
    if range > 0.0 {
        part / range
    } else {
        0.0
    }
}

/// Range spanned by two adjacent bars: max(high) - min(low).
#[inline]
pub fn combined_range<T: crate::OHLCV>(prev: &T, curr: &T) -> f64 {
    curr.high().max(prev.high()) - curr.low().min(prev.low())
}
