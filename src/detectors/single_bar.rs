//! Single-bar kline classifier
//!
//! Maps each bar to a shape ([`BarKind`]) and a strength tier ([`BarStrength`]) from its
//! body/shadow geometry. Thresholds live in [`super::helpers`] and are fixed policy values.

use super::helpers::{
    self, ratio_of_range, LONG_SHADOW_RATIO, MARUBOZU_BODY_RATIO, SHORT_SHADOW_RATIO,
    SMALL_BODY_RATIO, SPINNING_SHADOW_RATIO,
};
use crate::{Direction, OHLCVExt, OHLCV};

/// Shape taxonomy of a single bar
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BarKind {
    Bullish,
    Bearish,
    Doji,
    Hammer,
    HangingMan,
    ShootingStar,
    InvertedHammer,
    SpinningTop,
    MarubozuBull,
    MarubozuBear,
}

impl BarKind {
    pub fn as_str(self) -> &'static str {
        match self {
            BarKind::Bullish => "bullish",
            BarKind::Bearish => "bearish",
            BarKind::Doji => "doji",
            BarKind::Hammer => "hammer",
            BarKind::HangingMan => "hanging_man",
            BarKind::ShootingStar => "shooting_star",
            BarKind::InvertedHammer => "inverted_hammer",
            BarKind::SpinningTop => "spinning_top",
            BarKind::MarubozuBull => "marubozu_bull",
            BarKind::MarubozuBear => "marubozu_bear",
        }
    }
}

/// Strength tier by body size in price steps
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum BarStrength {
    VeryWeak,
    Weak,
    Moderate,
    Strong,
    VeryStrong,
}

impl BarStrength {
    /// Tier for a body measured in price steps
    pub fn from_points(body_points: f64) -> Self {
        match body_points {
            p if p >= helpers::VERY_STRONG_POINTS => BarStrength::VeryStrong,
            p if p >= helpers::STRONG_POINTS => BarStrength::Strong,
            p if p >= helpers::MODERATE_POINTS => BarStrength::Moderate,
            p if p >= helpers::WEAK_POINTS => BarStrength::Weak,
            _ => BarStrength::VeryWeak,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BarStrength::VeryWeak => "very_weak",
            BarStrength::Weak => "weak",
            BarStrength::Moderate => "moderate",
            BarStrength::Strong => "strong",
            BarStrength::VeryStrong => "very_strong",
        }
    }
}

/// Derived per-bar classification
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct BarFeature {
    /// 1-based position in the analyzed sequence
    pub index: usize,
    pub timestamp: Option<i64>,
    pub kind: BarKind,
    pub strength: BarStrength,
    /// Body size in price steps
    pub body_size: f64,
    /// Upper shadow in price steps
    pub upper_shadow: f64,
    /// Lower shadow in price steps
    pub lower_shadow: f64,
    pub body_ratio: f64,
    pub upper_shadow_ratio: f64,
    pub lower_shadow_ratio: f64,
    pub direction: Direction,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

impl BarFeature {
    #[inline]
    pub fn is_bullish(&self) -> bool {
        self.direction.is_bullish()
    }
}

/// Classifies single bars. `pip_size` converts price distances into price steps.
#[derive(Debug, Clone, Copy)]
pub struct SingleBarClassifier {
    pub pip_size: f64,
}

impl Default for SingleBarClassifier {
    fn default() -> Self {
        Self { pip_size: 0.0001 }
    }
}

impl SingleBarClassifier {
    pub fn new(pip_size: f64) -> Self {
        Self { pip_size }
    }

    /// Classify the bar at `position` (0-based) of the sequence.
    pub fn classify<T: OHLCV>(&self, bar: &T, position: usize) -> BarFeature {
        let range = bar.range();
        let body = bar.body();
        let upper = bar.upper_shadow();
        let lower = bar.lower_shadow();

        let body_ratio = ratio_of_range(body, range);
        let upper_ratio = ratio_of_range(upper, range);
        let lower_ratio = ratio_of_range(lower, range);

        let kind = Self::kind_of(body_ratio, upper_ratio, lower_ratio, bar.is_bullish());
        let body_points = body / self.pip_size;

        BarFeature {
            index: position + 1,
            timestamp: bar.timestamp(),
            kind,
            strength: BarStrength::from_points(body_points),
            body_size: body_points,
            upper_shadow: upper / self.pip_size,
            lower_shadow: lower / self.pip_size,
            body_ratio,
            upper_shadow_ratio: upper_ratio,
            lower_shadow_ratio: lower_ratio,
            direction: Direction::of_bar(bar),
            open: bar.open(),
            high: bar.high(),
            low: bar.low(),
            close: bar.close(),
        }
    }

    /// Classify a whole sequence
    pub fn classify_all<T: OHLCV>(&self, bars: &[T]) -> Vec<BarFeature> {
        bars.iter()
            .enumerate()
            .map(|(i, bar)| self.classify(bar, i))
            .collect()
    }

    /// First matching rule wins.
    pub fn kind_of(body_ratio: f64, upper_ratio: f64, lower_ratio: f64, bullish: bool) -> BarKind {
        if body_ratio <= helpers::DOJI_BODY_RATIO {
            return BarKind::Doji;
        }

        if body_ratio <= SMALL_BODY_RATIO
            && upper_ratio > SPINNING_SHADOW_RATIO
            && lower_ratio > SPINNING_SHADOW_RATIO
        {
            return BarKind::SpinningTop;
        }

        if lower_ratio >= LONG_SHADOW_RATIO
            && upper_ratio <= SHORT_SHADOW_RATIO
            && body_ratio <= SMALL_BODY_RATIO
        {
            return if bullish {
                BarKind::Hammer
            } else {
                BarKind::HangingMan
            };
        }

        if upper_ratio >= LONG_SHADOW_RATIO
            && lower_ratio <= SHORT_SHADOW_RATIO
            && body_ratio <= SMALL_BODY_RATIO
        {
            return if bullish {
                BarKind::InvertedHammer
            } else {
                BarKind::ShootingStar
            };
        }

        if body_ratio >= MARUBOZU_BODY_RATIO {
            return if bullish {
                BarKind::MarubozuBull
            } else {
                BarKind::MarubozuBear
            };
        }

        if bullish {
            BarKind::Bullish
        } else {
            BarKind::Bearish
        }
    }
}
