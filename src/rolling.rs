//! Windowed period extremes and volatility series
//!
//! All series have the same length as the bar sequence. Windows at the start of the
//! sequence are partial: `window = min(period, index + 1)`.

use crate::{OHLCVExt, Period, OHLCV};

/// Precomputed rolling series, built once per analysis and read-only afterwards
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize)]
pub struct RollingStatistics {
    /// Lowest low over the trailing window ending at each bar
    pub period_lows: Vec<f64>,
    /// Highest high over the trailing window ending at each bar
    pub period_highs: Vec<f64>,
    /// Per-bar true range
    pub true_range: Vec<f64>,
    /// Rolling mean of true range (ATR-style)
    pub volatility: Vec<f64>,
}

impl RollingStatistics {
    /// Compute every series. `extreme_period` is the window K for highs/lows.
    pub fn compute<T: OHLCV>(bars: &[T], extreme_period: Period, volatility_period: Period) -> Self {
        let k = extreme_period.get();
        let len = bars.len();

        let mut period_lows = Vec::with_capacity(len);
        let mut period_highs = Vec::with_capacity(len);
        for i in 0..len {
            let window = &bars[trailing_start(i, k)..=i];
            let (low, high) = window
                .iter()
                .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), b| {
                    (lo.min(b.low()), hi.max(b.high()))
                });
            period_lows.push(low);
            period_highs.push(high);
        }

        let true_range = true_range_series(bars);
        let volatility = rolling_mean(&true_range, volatility_period.get());

        Self {
            period_lows,
            period_highs,
            true_range,
            volatility,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.period_lows.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.period_lows.is_empty()
    }

    #[inline]
    pub fn period_low(&self, index: usize) -> f64 {
        self.period_lows[index]
    }

    #[inline]
    pub fn period_high(&self, index: usize) -> f64 {
        self.period_highs[index]
    }

    #[inline]
    pub fn volatility_at(&self, index: usize) -> f64 {
        self.volatility[index]
    }
}

#[inline]
fn trailing_start(index: usize, period: usize) -> usize {
    (index + 1).saturating_sub(period)
}

/// max(high - low, |high - prev close|, |low - prev close|); the first bar uses high - low.
pub fn true_range_series<T: OHLCV>(bars: &[T]) -> Vec<f64> {
    bars.iter()
        .enumerate()
        .map(|(i, bar)| {
            let hl = bar.range();
            if i == 0 {
                return hl;
            }
            let prev_close = bars[i - 1].close();
            hl.max((bar.high() - prev_close).abs())
                .max((bar.low() - prev_close).abs())
        })
        .collect()
}

/// Simple trailing mean with partial windows at the start
pub fn rolling_mean(values: &[f64], period: usize) -> Vec<f64> {
    let period = period.max(1);
    let mut out = Vec::with_capacity(values.len());
    let mut sum = 0.0;
    for i in 0..values.len() {
        sum += values[i];
        if i >= period {
            sum -= values[i - period];
        }
        let window = period.min(i + 1);
        out.push(sum / window as f64);
    }
    out
}
