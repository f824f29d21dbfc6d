//! # pa-kline - price-action kline analyzer
//!
//! Breakout signals at period extremes, wick and volatility filters, engulfing-based
//! retracement entries and forward outcome statistics over OHLC bar sequences.
//!
//! ## Quick Start
//!
//! ```rust
//! use pa_kline::prelude::*;
//!
//! let bars = vec![
//!     Bar::new(1, 0, 1.1000, 1.1010, 1.0980, 1.0985),
//!     Bar::new(2, 60, 1.0980, 1.1030, 1.0975, 1.1025),
//! ];
//!
//! let analyzer = KlineAnalyzer::new(AnalysisConfig::unfiltered()).unwrap();
//! let result = analyzer.analyze(&bars);
//! assert_eq!(result.signals.len(), 1);
//! assert_eq!(result.signals[0].condition, ConditionKind::BullCombo);
//! ```
//!
//! Callers with their own bar type implement [`OHLCV`] instead of converting to [`Bar`].

pub mod config;
pub mod detectors;
pub mod filters;
pub mod outcome;
pub mod retracement;
pub mod rolling;
pub mod signals;
pub mod stats;
pub mod sweep;

pub mod prelude {
    pub use crate::{
        // Parallel
        analyze_parallel,
        // Config
        config::{param_meta, param_meta_for, AnalysisConfig, FilterPolicy, ParamMeta, ParamType, VolatilityMode},
        // Detectors
        detectors::*,
        filters::{FilterPipeline, FilterVerdict},
        outcome::{Outcome, OutcomeEvaluator, SignalOutcome, WinRateSummary},
        retracement::{EntryOpportunity, EntryStatus, RetracementEngine, RetracementLevels, RetracementSignal},
        rolling::RollingStatistics,
        signals::{BreakoutType, ConditionKind, SignalEngine, SubConditions, TradeSignal},
        stats::{ConditionCounts, FilterStats, RetracementStats},
        sweep::{sweep, sweep_grid, SweepPoint},
        // Errors
        AnalysisError,
        // Engine
        AnalysisResult,
        AnalyzerBuilder,
        // Types
        Bar,
        BuiltinDetector,
        Direction,
        InstrumentReport,
        KlineAnalyzer,
        OHLCVExt,
        PatternDetector,
        PatternId,
        PatternMatch,
        Period,
        Ratio,
        Result,
        OHLCV,
    };
}

// ============================================================
// ERRORS
// ============================================================

pub type Result<T> = std::result::Result<T, AnalysisError>;

/// Errors raised while building an analyzer or its configuration
#[derive(Debug, Clone, thiserror::Error)]
pub enum AnalysisError {
    #[error("Invalid value: {0}")]
    InvalidValue(&'static str),

    #[error("{field} = {value} out of range [{min}, {max}]")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Unknown parameter: {0}")]
    UnknownParameter(String),

    #[error("Invalid override token: {0}")]
    InvalidToken(String),

    #[error("Invalid OHLC at index {index}: {reason}")]
    InvalidOHLC { index: usize, reason: &'static str },
}

// ============================================================
// VALIDATED TYPES
// ============================================================

/// Fraction in range 0.0..=1.0
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Ratio(f64);

impl Ratio {
    /// Create a new Ratio, validating the value is in [0.0, 1.0]
    pub fn new(value: f64) -> Result<Self> {
        if value.is_nan() || value.is_infinite() {
            return Err(AnalysisError::InvalidValue("Ratio cannot be NaN or infinite"));
        }
        if !(0.0..=1.0).contains(&value) {
            return Err(AnalysisError::OutOfRange {
                field: "Ratio",
                value,
                min: 0.0,
                max: 1.0,
            });
        }
        Ok(Self(value))
    }

    #[doc(hidden)]
    pub const fn new_const(value: f64) -> Self {
        Self(value)
    }

    #[inline]
    pub fn get(self) -> f64 {
        self.0
    }
}

impl serde::Serialize for Ratio {
    fn serialize<S: serde::Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        self.0.serialize(s)
    }
}

impl<'de> serde::Deserialize<'de> for Ratio {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
        let value = f64::deserialize(d)?;
        Ratio::new(value).map_err(serde::de::Error::custom)
    }
}

/// Window length or bar count (must be > 0)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Period(usize);

impl Period {
    pub fn new(value: usize) -> Result<Self> {
        if value == 0 {
            return Err(AnalysisError::InvalidValue("Period must be > 0"));
        }
        Ok(Self(value))
    }

    #[doc(hidden)]
    pub const fn new_const(value: usize) -> Self {
        Self(value)
    }

    #[inline]
    pub fn get(self) -> usize {
        self.0
    }
}

impl serde::Serialize for Period {
    fn serialize<S: serde::Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        self.0.serialize(s)
    }
}

impl<'de> serde::Deserialize<'de> for Period {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
        let value = usize::deserialize(d)?;
        Period::new(value).map_err(serde::de::Error::custom)
    }
}

// ============================================================
// OHLC TRAITS
// ============================================================

/// Core price data trait
pub trait OHLCV {
    fn open(&self) -> f64;
    fn high(&self) -> f64;
    fn low(&self) -> f64;
    fn close(&self) -> f64;

    fn timestamp(&self) -> Option<i64> {
        None
    }
}

/// Computed properties for price data
pub trait OHLCVExt: OHLCV {
    #[inline]
    fn body(&self) -> f64 {
        (self.close() - self.open()).abs()
    }

    #[inline]
    fn range(&self) -> f64 {
        self.high() - self.low()
    }

    #[inline]
    fn upper_shadow(&self) -> f64 {
        self.high() - self.open().max(self.close())
    }

    #[inline]
    fn lower_shadow(&self) -> f64 {
        self.open().min(self.close()) - self.low()
    }

    #[inline]
    fn is_bullish(&self) -> bool {
        self.close() > self.open()
    }

    #[inline]
    fn is_bearish(&self) -> bool {
        self.close() < self.open()
    }

    /// Finite prices with high >= low
    fn validate(&self) -> Result<()> {
        let prices = [self.open(), self.high(), self.low(), self.close()];
        if prices.iter().any(|p| p.is_nan()) {
            return Err(AnalysisError::InvalidOHLC {
                index: 0,
                reason: "NaN in OHLC",
            });
        }
        if prices.iter().any(|p| p.is_infinite()) {
            return Err(AnalysisError::InvalidOHLC {
                index: 0,
                reason: "Infinite value in OHLC",
            });
        }
        if self.high() < self.low() {
            return Err(AnalysisError::InvalidOHLC {
                index: 0,
                reason: "high < low",
            });
        }
        Ok(())
    }
}

impl<T: OHLCV> OHLCVExt for T {}

/// One OHLC bar. `index` is 1-based and increases with time.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Bar {
    pub index: usize,
    pub timestamp: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

impl Bar {
    pub fn new(index: usize, timestamp: i64, open: f64, high: f64, low: f64, close: f64) -> Self {
        Self {
            index,
            timestamp,
            open,
            high,
            low,
            close,
        }
    }
}

impl OHLCV for Bar {
    fn open(&self) -> f64 {
        self.open
    }

    fn high(&self) -> f64 {
        self.high
    }

    fn low(&self) -> f64 {
        self.low
    }

    fn close(&self) -> f64 {
        self.close
    }

    fn timestamp(&self) -> Option<i64> {
        Some(self.timestamp)
    }
}

/// Direction of a bar, pattern or signal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Bullish,
    Neutral,
    Bearish,
}

impl Direction {
    #[inline]
    pub fn is_bullish(self) -> bool {
        matches!(self, Direction::Bullish)
    }

    #[inline]
    pub fn is_bearish(self) -> bool {
        matches!(self, Direction::Bearish)
    }

    /// Bullish when close > open, bearish when close < open
    pub fn of_bar<T: OHLCV>(bar: &T) -> Self {
        if bar.is_bullish() {
            Direction::Bullish
        } else if bar.is_bearish() {
            Direction::Bearish
        } else {
            Direction::Neutral
        }
    }

    /// +1, 0 or -1
    #[inline]
    pub fn sign(self) -> f64 {
        match self {
            Direction::Bullish => 1.0,
            Direction::Neutral => 0.0,
            Direction::Bearish => -1.0,
        }
    }
}

// ============================================================
// PATTERN MATCH
// ============================================================

/// Unique identifier for a pattern type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PatternId(pub &'static str);

impl PatternId {
    #[inline]
    pub fn as_str(&self) -> &'static str {
        self.0
    }
}

impl serde::Serialize for PatternId {
    fn serialize<S: serde::Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        s.serialize_str(self.0)
    }
}

/// Result of a combination detector. Indices are 1-based.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct PatternMatch {
    pub pattern_id: PatternId,
    pub direction: Direction,
    /// Quality score 0.0..=1.0
    pub strength: f64,
    pub start_index: usize,
    pub end_index: usize,
}

/// Multi-bar combination detector
pub trait PatternDetector: Send + Sync {
    fn id(&self) -> PatternId;
    fn min_bars(&self) -> usize;
    /// Match ending at `index` (0-based)
    fn detect<T: OHLCV>(&self, bars: &[T], index: usize) -> Option<PatternMatch>;
}

// ============================================================
// BUILTIN DETECTORS
// ============================================================

use detectors::{EngulfingDetector, StarDetector};

macro_rules! define_builtin_detectors {
    (
        $(
            $variant:ident($detector:ty)
        ),* $(,)?
    ) => {
        /// Builtin combination detectors, dispatched by enum
        #[derive(Debug, Clone)]
        pub enum BuiltinDetector {
            $($variant($detector)),*
        }

        impl BuiltinDetector {
            #[inline]
            pub fn detect<T: OHLCV>(&self, bars: &[T], index: usize) -> Option<PatternMatch> {
                match self {
                    $(Self::$variant(d) => PatternDetector::detect(d, bars, index)),*
                }
            }

            #[inline]
            pub fn id(&self) -> PatternId {
                match self {
                    $(Self::$variant(d) => PatternDetector::id(d)),*
                }
            }

            #[inline]
            pub fn min_bars(&self) -> usize {
                match self {
                    $(Self::$variant(d) => PatternDetector::min_bars(d)),*
                }
            }
        }
    };
}

define_builtin_detectors! {
    Engulfing(EngulfingDetector),
    Star(StarDetector),
}

// ============================================================
// ANALYZER
// ============================================================

use config::AnalysisConfig;
use detectors::{BarFeature, EngulfingMatch, SingleBarClassifier};
use outcome::{OutcomeEvaluator, SignalOutcome, WinRateSummary};
use retracement::{RetracementEngine, RetracementSignal};
use rolling::RollingStatistics;
use signals::{SignalEngine, SignalScan, TradeSignal};
use stats::{ConditionCounts, FilterStats, RetracementStats};

/// Everything one analysis call produces
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize)]
pub struct AnalysisResult {
    pub total_bars: usize,
    pub features: Vec<BarFeature>,
    pub patterns: Vec<PatternMatch>,
    pub signals: Vec<TradeSignal>,
    /// One per signal, same order
    pub outcomes: Vec<SignalOutcome>,
    pub win_rate: WinRateSummary,
    pub condition_counts: ConditionCounts,
    pub filter_stats: FilterStats,
    pub engulfing: Vec<EngulfingMatch>,
    pub retracements: Vec<RetracementSignal>,
    pub retracement_stats: RetracementStats,
    pub bullish_count: usize,
    /// Strictly bearish bars; unchanged closes count in neither total
    pub bearish_count: usize,
}

impl AnalysisResult {
    pub fn latest_feature(&self) -> Option<&BarFeature> {
        self.features.last()
    }

    /// Timestamp of the bar with 1-based `index`
    pub fn timestamp_of(&self, index: usize) -> Option<i64> {
        self.features.get(index.checked_sub(1)?)?.timestamp
    }

    /// Signals paired with their outcomes
    pub fn signals_with_outcomes(&self) -> impl Iterator<Item = (&TradeSignal, &SignalOutcome)> {
        self.signals.iter().zip(self.outcomes.iter())
    }
}

/// Immutable analyzer: a validated configuration plus combination detectors.
///
/// Holds no per-call state, so one instance can serve concurrent callers.
#[derive(Debug, Clone)]
pub struct KlineAnalyzer {
    config: AnalysisConfig,
    detectors: Vec<BuiltinDetector>,
    min_strength: Option<f64>,
}

impl KlineAnalyzer {
    /// Analyzer with the default detectors. Fails if `config` is invalid.
    pub fn new(config: AnalysisConfig) -> Result<Self> {
        AnalyzerBuilder::new().config(config).with_default_detectors().build()
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    // ===========================================
    // LOW-LEVEL: Primitives
    // ===========================================

    pub fn features<T: OHLCV>(&self, bars: &[T]) -> Vec<BarFeature> {
        SingleBarClassifier::new(self.config.pip_size).classify_all(bars)
    }

    pub fn rolling<T: OHLCV>(&self, bars: &[T]) -> RollingStatistics {
        RollingStatistics::compute(bars, self.config.k_line_value, self.config.volatility_period)
    }

    pub fn signals<T: OHLCV>(&self, bars: &[T], stats: &RollingStatistics) -> SignalScan {
        SignalEngine::new(&self.config).scan(bars, stats)
    }

    pub fn outcomes<T: OHLCV>(&self, bars: &[T], signals: &[TradeSignal]) -> Vec<SignalOutcome> {
        OutcomeEvaluator::new(self.config.risk_reward_ratio, self.config.outcome_lookahead.get())
            .evaluate_all(bars, signals)
    }

    /// Combination patterns from every registered detector
    pub fn patterns<T: OHLCV>(&self, bars: &[T]) -> Vec<PatternMatch> {
        let mut results = Vec::new();
        for i in 0..bars.len() {
            for detector in &self.detectors {
                if i + 1 < detector.min_bars() {
                    continue;
                }
                if let Some(m) = detector.detect(bars, i) {
                    if self.should_include(&m) {
                        results.push(m);
                    }
                }
            }
        }
        results
    }

    /// Empty when retracement entries are disabled
    pub fn retracements<T: OHLCV>(&self, bars: &[T], engulfing: &[EngulfingMatch]) -> Vec<RetracementSignal> {
        if !self.config.enable_retracement_entry {
            return Vec::new();
        }
        RetracementEngine::from_config(&self.config).scan_all(bars, engulfing)
    }

    // ===========================================
    // HIGH-LEVEL: Full analysis
    // ===========================================

    /// Run every stage over `bars`. Never fails; short input gives empty lists.
    pub fn analyze<T: OHLCV>(&self, bars: &[T]) -> AnalysisResult {
        let features = self.features(bars);
        let bullish_count = features.iter().filter(|f| f.direction.is_bullish()).count();
        let bearish_count = features.iter().filter(|f| f.direction.is_bearish()).count();

        if bars.len() < 2 {
            return AnalysisResult {
                total_bars: bars.len(),
                features,
                bullish_count,
                bearish_count,
                ..AnalysisResult::default()
            };
        }

        let stats = self.rolling(bars);
        let SignalScan { signals, filter_stats } = self.signals(bars, &stats);
        let outcomes = self.outcomes(bars, &signals);
        let win_rate = WinRateSummary::from_outcomes(&outcomes, self.config.risk_reward_ratio);

        let mut condition_counts = ConditionCounts::default();
        for s in &signals {
            condition_counts.record(s.condition);
        }

        let engulfing = EngulfingDetector.match_all(bars);
        let retracements = self.retracements(bars, &engulfing);
        let retracement_stats = if self.config.enable_retracement_entry {
            RetracementStats::from_signals(&retracements, engulfing.len())
        } else {
            RetracementStats::default()
        };

        tracing::info!(
            bars = bars.len(),
            signals = signals.len(),
            candidates = filter_stats.total_signals_before_filter,
            win_rate = win_rate.win_rate,
            engulfing = engulfing.len(),
            retracement_entries = retracement_stats.retracement_entries_executed,
            "analysis complete"
        );

        AnalysisResult {
            total_bars: bars.len(),
            patterns: self.patterns(bars),
            features,
            signals,
            outcomes,
            win_rate,
            condition_counts,
            filter_stats,
            engulfing,
            retracements,
            retracement_stats,
            bullish_count,
            bearish_count,
        }
    }

    fn should_include(&self, m: &PatternMatch) -> bool {
        self.min_strength.map_or(true, |min| m.strength >= min)
    }
}

// ============================================================
// BUILDER
// ============================================================

/// Builder for [`KlineAnalyzer`]
#[derive(Debug, Clone, Default)]
pub struct AnalyzerBuilder {
    config: AnalysisConfig,
    detectors: Vec<BuiltinDetector>,
    min_strength: Option<f64>,
}

impl AnalyzerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn config(mut self, config: AnalysisConfig) -> Self {
        self.config = config;
        self
    }

    /// Register the engulfing and three-bar detectors
    pub fn with_default_detectors(mut self) -> Self {
        self.detectors.extend([
            BuiltinDetector::Engulfing(EngulfingDetector::with_defaults()),
            BuiltinDetector::Star(StarDetector::with_defaults()),
        ]);
        self
    }

    #[allow(clippy::should_implement_trait)]
    pub fn add(mut self, detector: BuiltinDetector) -> Self {
        self.detectors.push(detector);
        self
    }

    /// Drop patterns weaker than `strength`
    pub fn min_strength(mut self, strength: f64) -> Self {
        self.min_strength = Some(strength);
        self
    }

    pub fn build(self) -> Result<KlineAnalyzer> {
        self.config.validate()?;
        if let Some(min) = self.min_strength {
            Ratio::new(min)?;
        }
        Ok(KlineAnalyzer {
            config: self.config,
            detectors: self.detectors,
            min_strength: self.min_strength,
        })
    }
}

// ============================================================
// PARALLEL ANALYSIS
// ============================================================

use rayon::prelude::*;

/// Result for one instrument
#[derive(Debug, Clone, serde::Serialize)]
pub struct InstrumentReport {
    pub symbol: String,
    pub result: AnalysisResult,
}

/// Analyze independent instruments on the rayon pool. Reports keep the input order.
pub fn analyze_parallel<'a, T, I>(analyzer: &KlineAnalyzer, instruments: I) -> Vec<InstrumentReport>
where
    T: OHLCV + Sync + 'a,
    I: IntoParallelIterator<Item = (&'a str, &'a [T])>,
    I::Iter: IndexedParallelIterator,
{
    instruments
        .into_par_iter()
        .map(|(symbol, bars)| InstrumentReport {
            symbol: symbol.to_string(),
            result: analyzer.analyze(bars),
        })
        .collect()
}

// ============================================================
// TESTS
// ============================================================
