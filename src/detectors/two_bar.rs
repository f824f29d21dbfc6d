//! Two-bar reversal detector: engulfing pattern
//!
//! Bullish engulfing: bearish bar followed by a bullish bar that opens below the earlier
//! close and closes above the earlier open. Bearish engulfing is the mirror image.

use super::helpers::{DEFAULT_ENGULF_RATIO, STRONG_ENGULF_RATIO};
use crate::{Direction, OHLCVExt, PatternDetector, PatternId, PatternMatch, OHLCV};

/// Strength of an engulfing match
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngulfStrength {
    Moderate,
    Strong,
}

impl EngulfStrength {
    pub fn from_ratio(ratio: f64) -> Self {
        if ratio >= STRONG_ENGULF_RATIO {
            EngulfStrength::Strong
        } else {
            EngulfStrength::Moderate
        }
    }
}

/// A detected engulfing pair
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct EngulfingMatch {
    /// 1-based index of the engulfed (earlier) bar
    pub earlier_index: usize,
    /// 1-based index of the engulfing (later) bar
    pub later_index: usize,
    pub direction: Direction,
    /// later.body / earlier.body, [`DEFAULT_ENGULF_RATIO`] when the earlier body is zero
    pub engulf_ratio: f64,
    pub strength: EngulfStrength,
    /// High - low of the engulfing bar
    pub range: f64,
}

impl EngulfingMatch {
    /// 0-based position of the engulfing bar, `None` for an index of 0
    #[inline]
    pub fn later_position(&self) -> Option<usize> {
        self.later_index.checked_sub(1)
    }
}

/// Engulfing pattern detector
#[derive(Debug, Clone, Copy, Default)]
pub struct EngulfingDetector;

impl EngulfingDetector {
    pub fn with_defaults() -> Self {
        Self
    }

    /// Match the pair (`index - 1`, `index`). `index` is 0-based.
    pub fn match_at<T: OHLCV>(&self, bars: &[T], index: usize) -> Option<EngulfingMatch> {
        if index < 1 {
            return None;
        }
        let prev = bars.get(index - 1)?;
        let curr = bars.get(index)?;

        let direction = if prev.is_bearish()
            && curr.is_bullish()
            && curr.open() < prev.close()
            && curr.close() > prev.open()
        {
            Direction::Bullish
        } else if prev.is_bullish()
            && curr.is_bearish()
            && curr.open() > prev.close()
            && curr.close() < prev.open()
        {
            Direction::Bearish
        } else {
            return None;
        };

        let prev_body = prev.body();
        let engulf_ratio = if prev_body > 0.0 {
            curr.body() / prev_body
        } else {
            DEFAULT_ENGULF_RATIO
        };

        Some(EngulfingMatch {
            earlier_index: index,
            later_index: index + 1,
            direction,
            engulf_ratio,
            strength: EngulfStrength::from_ratio(engulf_ratio),
            range: curr.range(),
        })
    }

    /// All engulfing pairs in the sequence, in order
    pub fn match_all<T: OHLCV>(&self, bars: &[T]) -> Vec<EngulfingMatch> {
        (1..bars.len())
            .filter_map(|i| self.match_at(bars, i))
            .collect()
    }
}

impl PatternDetector for EngulfingDetector {
    fn id(&self) -> PatternId {
        PatternId("ENGULFING")
    }

    fn min_bars(&self) -> usize {
        2
    }

    fn detect<T: OHLCV>(&self, bars: &[T], index: usize) -> Option<PatternMatch> {
        let m = self.match_at(bars, index)?;
        let strength = match m.strength {
            EngulfStrength::Strong => 0.8,
            EngulfStrength::Moderate => 0.6,
        };
        Some(PatternMatch {
            pattern_id: PatternDetector::id(self),
            direction: m.direction,
            strength,
            start_index: m.earlier_index,
            end_index: m.later_index,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Bar;

    fn bar(o: f64, h: f64, l: f64, c: f64) -> Bar {
        Bar::new(0, 0, o, h, l, c)
    }

    #[test]
    fn test_bullish_engulfing() {
        let bars = vec![bar(10.0, 10.5, 8.5, 9.0), bar(8.8, 12.0, 8.6, 11.5)];
        let m = EngulfingDetector.match_at(&bars, 1).unwrap();
        assert_eq!(m.direction, Direction::Bullish);
        assert_eq!(m.earlier_index, 1);
        assert_eq!(m.later_index, 2);
        // body 2.7 vs 1.0
        assert!((m.engulf_ratio - 2.7).abs() < 1e-9);
        assert_eq!(m.strength, EngulfStrength::Strong);
        assert!((m.range - 3.4).abs() < 1e-9);
    }

    #[test]
    fn test_bearish_engulfing_moderate() {
        let bars = vec![bar(9.0, 10.5, 8.5, 10.0), bar(10.2, 10.4, 8.0, 8.5)];
        let m = EngulfingDetector.match_at(&bars, 1).unwrap();
        assert_eq!(m.direction, Direction::Bearish);
        assert!((m.engulf_ratio - 1.7).abs() < 1e-9);
        assert_eq!(m.strength, EngulfStrength::Moderate);
    }

    #[test]
    fn test_touching_open_is_not_engulfing() {
        // later close equals earlier open: no strict engulf
        let bars = vec![bar(10.0, 10.5, 8.5, 9.0), bar(8.8, 10.5, 8.6, 10.0)];
        assert!(EngulfingDetector.match_at(&bars, 1).is_none());
    }

    #[test]
    fn test_same_colour_is_not_engulfing() {
        let bars = vec![bar(9.0, 10.0, 8.9, 9.5), bar(8.8, 12.0, 8.6, 11.5)];
        assert!(EngulfingDetector.match_at(&bars, 1).is_none());
    }

    #[test]
    fn test_first_bar_has_no_pair() {
        let bars = vec![bar(10.0, 10.5, 8.5, 9.0)];
        assert!(EngulfingDetector.match_at(&bars, 0).is_none());
        assert!(EngulfingDetector.match_all(&bars).is_empty());
    }

    #[test]
    fn test_pattern_detector_indices() {
        let bars = vec![
            bar(10.0, 10.2, 9.9, 10.1),
            bar(10.0, 10.5, 8.5, 9.0),
            bar(8.8, 12.0, 8.6, 11.5),
        ];
        let m = PatternDetector::detect(&EngulfingDetector, &bars, 2).unwrap();
        assert_eq!(m.pattern_id.as_str(), "ENGULFING");
        assert_eq!((m.start_index, m.end_index), (2, 3));
    }
}
