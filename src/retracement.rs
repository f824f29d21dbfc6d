//! Delayed entries at a fractional pullback from an engulfing bar
//!
//! Levels are measured from the engulfing bar's extreme: a bullish bar retraces down
//! from its high (checking each forward bar's low), a bearish bar retraces up from its
//! low (checking each forward bar's high).

use crate::{config::AnalysisConfig, detectors::EngulfingMatch, Direction, OHLCVExt, OHLCV};

/// Price geometry derived from one engulfing bar
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct RetracementLevels {
    pub direction: Direction,
    /// Price at the target retracement fraction
    pub target_level: f64,
    pub entry_upper: f64,
    pub entry_lower: f64,
    pub invalidation_level: f64,
    pub engulfing_high: f64,
    pub engulfing_low: f64,
    pub range: f64,
    pub range_points: f64,
}

impl RetracementLevels {
    /// Price retraced by `fraction` of the range
    fn price_at(direction: Direction, high: f64, low: f64, fraction: f64) -> f64 {
        match direction {
            Direction::Bearish => low + fraction * (high - low),
            _ => high - fraction * (high - low),
        }
    }

    #[inline]
    pub fn in_band(&self, price: f64) -> bool {
        price >= self.entry_lower && price <= self.entry_upper
    }

    /// Whether `price` has moved past the invalidation level
    #[inline]
    pub fn is_invalidated_by(&self, price: f64) -> bool {
        match self.direction {
            Direction::Bearish => price > self.invalidation_level,
            _ => price < self.invalidation_level,
        }
    }

    /// Fraction of the range retraced at `price`
    pub fn retracement_of(&self, price: f64) -> f64 {
        match self.direction {
            Direction::Bearish => (price - self.engulfing_low) / self.range,
            _ => (self.engulfing_high - price) / self.range,
        }
    }
}

/// A touched entry band
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct EntryOpportunity {
    /// Target retracement price
    pub entry_price: f64,
    /// Price that touched the band
    pub actual_entry_price: f64,
    /// 1-based index of the touching bar
    pub entry_index: usize,
    pub actual_retracement: f64,
    pub bars_waited: usize,
}

/// Result of the forward scan
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum EntryStatus {
    EntryOpportunity(EntryOpportunity),
    /// Price crossed the invalidation level before touching the band
    Invalidated { index: usize, bars_waited: usize },
    /// Wait window exhausted, or the sequence ended
    Waiting,
}

impl EntryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryStatus::EntryOpportunity(_) => "entry_opportunity",
            EntryStatus::Invalidated { .. } => "invalidated",
            EntryStatus::Waiting => "waiting",
        }
    }

    pub fn entry(&self) -> Option<&EntryOpportunity> {
        match self {
            EntryStatus::EntryOpportunity(e) => Some(e),
            _ => None,
        }
    }
}

/// Engulfing match, its levels and the scan result
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct RetracementSignal {
    pub engulfing: EngulfingMatch,
    pub levels: RetracementLevels,
    pub status: EntryStatus,
}

/// Scans for retracement entries after engulfing matches
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetracementEngine {
    pub target: f64,
    pub tolerance: f64,
    pub invalidation: f64,
    pub max_wait_bars: usize,
    pub pip_size: f64,
}

impl RetracementEngine {
    pub fn from_config(config: &AnalysisConfig) -> Self {
        Self {
            target: config.retracement_target.get(),
            tolerance: config.retracement_tolerance.get(),
            invalidation: config.retracement_invalidation.get(),
            max_wait_bars: config.max_retracement_wait_bars.get(),
            pip_size: config.pip_size,
        }
    }

    /// Levels for the engulfing bar of `m`. `None` for a zero range.
    pub fn levels<T: OHLCV>(&self, bars: &[T], m: &EngulfingMatch) -> Option<RetracementLevels> {
        let bar = bars.get(m.later_position()?)?;
        let (high, low) = (bar.high(), bar.low());
        let range = bar.range();
        if range.is_nan() || range <= 0.0 {
            return None;
        }

        let at = |fraction| RetracementLevels::price_at(m.direction, high, low, fraction);
        let near = at(self.target - self.tolerance);
        let far = at(self.target + self.tolerance);

        Some(RetracementLevels {
            direction: m.direction,
            target_level: at(self.target),
            entry_upper: near.max(far),
            entry_lower: near.min(far),
            invalidation_level: at(self.invalidation),
            engulfing_high: high,
            engulfing_low: low,
            range,
            range_points: range / self.pip_size,
        })
    }

    /// Scan forward bars for a band touch. Band membership is checked before invalidation.
    pub fn scan<T: OHLCV>(&self, bars: &[T], m: &EngulfingMatch) -> Option<RetracementSignal> {
        let levels = self.levels(bars, m)?;
        let start = m.later_position()?;
        let end = start.saturating_add(1).saturating_add(self.max_wait_bars).min(bars.len());

        let mut status = EntryStatus::Waiting;
        for j in (start + 1)..end {
            let touch = match levels.direction {
                Direction::Bearish => bars[j].high(),
                _ => bars[j].low(),
            };
            if levels.in_band(touch) {
                status = EntryStatus::EntryOpportunity(EntryOpportunity {
                    entry_price: levels.target_level,
                    actual_entry_price: touch,
                    entry_index: j + 1,
                    actual_retracement: levels.retracement_of(touch),
                    bars_waited: j - start,
                });
                break;
            }
            if levels.is_invalidated_by(touch) {
                status = EntryStatus::Invalidated { index: j + 1, bars_waited: j - start };
                break;
            }
        }

        tracing::debug!(
            bar = m.later_index,
            status = status.as_str(),
            "retracement scan finished"
        );
        Some(RetracementSignal { engulfing: *m, levels, status })
    }

    pub fn scan_all<T: OHLCV>(&self, bars: &[T], matches: &[EngulfingMatch]) -> Vec<RetracementSignal> {
        matches.iter().filter_map(|m| self.scan(bars, m)).collect()
    }
}
