//! Breakout signal engine
//!
//! For every bar after the first, a direction's *base* must hold before any of its
//! breakouts are considered:
//!
//! - **bull base**: previous bar bearish, current bar bullish, and the previous or
//!   current low sits at its period low
//! - **bear base**: previous bar bullish, current bar bearish, and the previous or
//!   current high sits at its period high
//!
//! Three breakouts per direction (close, open, extreme) are then checked against the
//! previous bar and gated by the [`FilterPipeline`]. The highest-priority satisfied
//! condition becomes the bar's only signal; see [`PRIORITY`].

use crate::{
    config::AnalysisConfig,
    detectors::at_extreme,
    filters::FilterPipeline,
    rolling::RollingStatistics,
    stats::FilterStats,
    Direction, OHLCVExt, OHLCV,
};

/// Breakout family of a condition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BreakoutType {
    /// Close beyond the previous extreme
    Close,
    /// Close beyond the previous open
    Open,
    /// Extreme beyond the previous extreme
    Extreme,
    /// Open and extreme breakouts together
    Combo,
}

/// The eight directional trade conditions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionKind {
    BullCloseHigh,
    BullCloseOpen,
    BullHighHigh,
    BullCombo,
    BearCloseLow,
    BearCloseOpen,
    BearLowLow,
    BearCombo,
}

impl ConditionKind {
    pub const ALL: [ConditionKind; 8] = [
        ConditionKind::BullCloseHigh,
        ConditionKind::BullCloseOpen,
        ConditionKind::BullHighHigh,
        ConditionKind::BullCombo,
        ConditionKind::BearCloseLow,
        ConditionKind::BearCloseOpen,
        ConditionKind::BearLowLow,
        ConditionKind::BearCombo,
    ];

    pub fn direction(self) -> Direction {
        match self {
            ConditionKind::BullCloseHigh
            | ConditionKind::BullCloseOpen
            | ConditionKind::BullHighHigh
            | ConditionKind::BullCombo => Direction::Bullish,
            _ => Direction::Bearish,
        }
    }

    pub fn breakout(self) -> BreakoutType {
        match self {
            ConditionKind::BullCloseHigh | ConditionKind::BearCloseLow => BreakoutType::Close,
            ConditionKind::BullCloseOpen | ConditionKind::BearCloseOpen => BreakoutType::Open,
            ConditionKind::BullHighHigh | ConditionKind::BearLowLow => BreakoutType::Extreme,
            ConditionKind::BullCombo | ConditionKind::BearCombo => BreakoutType::Combo,
        }
    }

    #[inline]
    pub fn is_combo(self) -> bool {
        self.breakout() == BreakoutType::Combo
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ConditionKind::BullCloseHigh => "bull_close_high",
            ConditionKind::BullCloseOpen => "bull_close_open",
            ConditionKind::BullHighHigh => "bull_high_high",
            ConditionKind::BullCombo => "bull_combo",
            ConditionKind::BearCloseLow => "bear_close_low",
            ConditionKind::BearCloseOpen => "bear_close_open",
            ConditionKind::BearLowLow => "bear_low_low",
            ConditionKind::BearCombo => "bear_combo",
        }
    }

    /// Label fragment for single conditions; combos have none
    pub fn label(self) -> Option<&'static str> {
        match self {
            ConditionKind::BullCloseHigh => Some("close>prev_high"),
            ConditionKind::BullCloseOpen => Some("close>prev_open"),
            ConditionKind::BullHighHigh => Some("high>prev_high"),
            ConditionKind::BearCloseLow => Some("close<prev_low"),
            ConditionKind::BearCloseOpen => Some("close<prev_open"),
            ConditionKind::BearLowLow => Some("low<prev_low"),
            ConditionKind::BullCombo | ConditionKind::BearCombo => None,
        }
    }
}

/// Highest priority first. Combos outrank singles; bull singles outrank bear singles.
pub const PRIORITY: [ConditionKind; 8] = [
    ConditionKind::BullCombo,
    ConditionKind::BearCombo,
    ConditionKind::BullCloseHigh,
    ConditionKind::BullCloseOpen,
    ConditionKind::BullHighHigh,
    ConditionKind::BearCloseLow,
    ConditionKind::BearCloseOpen,
    ConditionKind::BearLowLow,
];

/// Sub-conditions satisfied at one bar (base, breakout and filter all held)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct SubConditions {
    pub bull_close: bool,
    pub bull_open: bool,
    pub bull_extreme: bool,
    pub bear_close: bool,
    pub bear_open: bool,
    pub bear_extreme: bool,
}

impl SubConditions {
    /// Whether `kind` is satisfied
    pub fn holds(&self, kind: ConditionKind) -> bool {
        match kind {
            ConditionKind::BullCloseHigh => self.bull_close,
            ConditionKind::BullCloseOpen => self.bull_open,
            ConditionKind::BullHighHigh => self.bull_extreme,
            ConditionKind::BullCombo => self.bull_open && self.bull_extreme,
            ConditionKind::BearCloseLow => self.bear_close,
            ConditionKind::BearCloseOpen => self.bear_open,
            ConditionKind::BearLowLow => self.bear_extreme,
            ConditionKind::BearCombo => self.bear_open && self.bear_extreme,
        }
    }

    /// Number of true sub-conditions
    pub fn count(&self) -> usize {
        [
            self.bull_close,
            self.bull_open,
            self.bull_extreme,
            self.bear_close,
            self.bear_open,
            self.bear_extreme,
        ]
        .iter()
        .filter(|b| **b)
        .count()
    }

    /// Highest-priority satisfied condition
    pub fn resolve(&self) -> Option<ConditionKind> {
        PRIORITY.iter().copied().find(|k| self.holds(*k))
    }

    /// '+'-joined labels of every satisfied single condition
    pub fn label(&self) -> String {
        ConditionKind::ALL
            .iter()
            .filter(|k| !k.is_combo() && self.holds(**k))
            .filter_map(|k| k.label())
            .collect::<Vec<_>>()
            .join("+")
    }
}

/// An emitted trade signal
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct TradeSignal {
    /// 1-based index of the signal bar
    pub index: usize,
    pub timestamp: Option<i64>,
    pub direction: Direction,
    pub entry_price: f64,
    pub stop_price: f64,
    /// |entry - stop|, always > 0
    pub risk: f64,
    /// Risk in price steps
    pub risk_points: f64,
    pub condition: ConditionKind,
    pub breakout: BreakoutType,
    pub is_combo: bool,
    pub label: String,
    pub conditions: SubConditions,
}

impl TradeSignal {
    /// 0-based position of the signal bar, `None` for an index of 0
    #[inline]
    pub fn position(&self) -> Option<usize> {
        self.index.checked_sub(1)
    }

    /// Price at `rr` multiples of risk in the signal's direction
    pub fn target_price(&self, rr: f64) -> f64 {
        self.entry_price + self.direction.sign() * rr * self.risk
    }
}

/// Signals plus the filter counters gathered while producing them
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SignalScan {
    pub signals: Vec<TradeSignal>,
    pub filter_stats: FilterStats,
}

/// Evaluates breakout conditions bar by bar
#[derive(Debug, Clone, Copy)]
pub struct SignalEngine {
    pub filters: FilterPipeline,
    pub pip_size: f64,
}

impl SignalEngine {
    pub fn new(config: &AnalysisConfig) -> Self {
        Self {
            filters: FilterPipeline::from_config(config),
            pip_size: config.pip_size,
        }
    }

    /// Scan every bar. `stats` must be computed over the same `bars`.
    pub fn scan<T: OHLCV>(&self, bars: &[T], stats: &RollingStatistics) -> SignalScan {
        let mut scan = SignalScan::default();
        if bars.len() < 2 || stats.len() != bars.len() {
            return scan;
        }
        for i in 1..bars.len() {
            if let Some(signal) = self.evaluate_at(bars, stats, i, &mut scan.filter_stats) {
                scan.signals.push(signal);
            }
        }
        scan
    }

    /// Structurally true sub-conditions at `index`, before filtering
    pub fn structural_conditions<T: OHLCV>(
        &self,
        bars: &[T],
        stats: &RollingStatistics,
        index: usize,
    ) -> SubConditions {
        if index < 1 || index >= bars.len() {
            return SubConditions::default();
        }
        let prev = &bars[index - 1];
        let curr = &bars[index];

        let bull_base = prev.is_bearish()
            && curr.is_bullish()
            && (at_extreme(prev.low(), stats.period_low(index - 1))
                || at_extreme(curr.low(), stats.period_low(index)));
        let bear_base = prev.is_bullish()
            && curr.is_bearish()
            && (at_extreme(prev.high(), stats.period_high(index - 1))
                || at_extreme(curr.high(), stats.period_high(index)));

        SubConditions {
            bull_close: bull_base && curr.close() > prev.high(),
            bull_open: bull_base && curr.close() > prev.open(),
            bull_extreme: bull_base && curr.high() > prev.high(),
            bear_close: bear_base && curr.close() < prev.low(),
            bear_open: bear_base && curr.close() < prev.open(),
            bear_extreme: bear_base && curr.low() < prev.low(),
        }
    }

    /// Signal at `index` (0-based), if any. Updates `filter_stats` for every candidate.
    pub fn evaluate_at<T: OHLCV>(
        &self,
        bars: &[T],
        stats: &RollingStatistics,
        index: usize,
        filter_stats: &mut FilterStats,
    ) -> Option<TradeSignal> {
        if index < 1 || index >= bars.len() {
            return None;
        }
        let prev = &bars[index - 1];
        let curr = &bars[index];

        for (position, bar) in [(index - 1, prev), (index, curr)] {
            if let Err(e) = bar.validate() {
                tracing::warn!(bar = position + 1, error = %e, "skipping signal evaluation");
                return None;
            }
        }

        let structural = self.structural_conditions(bars, stats, index);
        let candidates = structural.count();
        if candidates == 0 {
            return None;
        }

        let verdict = self.filters.evaluate(bars, stats, index)?;
        for _ in 0..candidates {
            filter_stats.record(&verdict);
        }
        if !verdict.passed {
            return None;
        }

        let condition = structural.resolve()?;
        let direction = condition.direction();
        let entry_price = curr.close();
        let stop_price = match direction {
            Direction::Bullish => curr.low().min(prev.low()),
            _ => curr.high().max(prev.high()),
        };
        let risk = (entry_price - stop_price).abs();
        if risk <= 0.0 {
            tracing::debug!(bar = index + 1, "discarding zero-risk signal");
            return None;
        }

        Some(TradeSignal {
            index: index + 1,
            timestamp: curr.timestamp(),
            direction,
            entry_price,
            stop_price,
            risk,
            risk_points: risk / self.pip_size,
            condition,
            breakout: condition.breakout(),
            is_combo: condition.is_combo(),
            label: structural.label(),
            conditions: structural,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Bar, Period};

    fn run(bars: &[Bar], config: &AnalysisConfig) -> SignalScan {
        let stats = RollingStatistics::compute(bars, config.k_line_value, config.volatility_period);
        SignalEngine::new(config).scan(bars, &stats)
    }

    /// Bearish bar at a fresh low followed by a bullish breakout bar
    fn bull_pair() -> Vec<Bar> {
        vec![
            Bar::new(1, 0, 10.0, 10.2, 9.0, 9.2),
            Bar::new(2, 0, 9.3, 10.6, 9.1, 10.5),
        ]
    }

    #[test]
    fn test_priority_order() {
        assert_eq!(PRIORITY[0], ConditionKind::BullCombo);
        assert_eq!(PRIORITY[1], ConditionKind::BearCombo);
        let only_close = SubConditions { bull_close: true, ..Default::default() };
        assert_eq!(only_close.resolve(), Some(ConditionKind::BullCloseHigh));
        let open_and_extreme = SubConditions {
            bull_close: true,
            bull_open: true,
            bull_extreme: true,
            ..Default::default()
        };
        assert_eq!(open_and_extreme.resolve(), Some(ConditionKind::BullCombo));
        let bear_only = SubConditions { bear_open: true, ..Default::default() };
        assert_eq!(bear_only.resolve(), Some(ConditionKind::BearCloseOpen));
        assert_eq!(SubConditions::default().resolve(), None);
    }

    #[test]
    fn test_label_lists_single_conditions() {
        let c = SubConditions {
            bull_close: true,
            bull_open: true,
            bull_extreme: true,
            ..Default::default()
        };
        assert_eq!(c.label(), "close>prev_high+close>prev_open+high>prev_high");
        let c = SubConditions { bear_extreme: true, ..Default::default() };
        assert_eq!(c.label(), "low<prev_low");
    }

    #[test]
    fn test_bull_combo_signal() {
        let scan = run(&bull_pair(), &AnalysisConfig::unfiltered());
        assert_eq!(scan.signals.len(), 1);

        let s = &scan.signals[0];
        assert_eq!(s.index, 2);
        assert_eq!(s.condition, ConditionKind::BullCombo);
        assert!(s.is_combo);
        assert_eq!(s.breakout, BreakoutType::Combo);
        assert_eq!(s.direction, Direction::Bullish);
        assert_eq!(s.entry_price, 10.5);
        assert_eq!(s.stop_price, 9.0);
        assert!((s.risk - 1.5).abs() < 1e-12);
        assert_eq!(s.label, "close>prev_high+close>prev_open+high>prev_high");
        assert_eq!(scan.filter_stats.total_signals_before_filter, 3);
        assert_eq!(scan.filter_stats.final_signals, 3);
    }

    #[test]
    fn test_open_breakout_without_extreme() {
        // close above previous open but high below previous high
        let bars = vec![
            Bar::new(1, 0, 10.0, 11.0, 9.0, 9.2),
            Bar::new(2, 0, 9.3, 10.8, 9.1, 10.5),
        ];
        let scan = run(&bars, &AnalysisConfig::unfiltered());
        assert_eq!(scan.signals.len(), 1);
        assert_eq!(scan.signals[0].condition, ConditionKind::BullCloseOpen);
        assert_eq!(scan.signals[0].label, "close>prev_open");
    }

    #[test]
    fn test_bear_mirror() {
        let bars = vec![
            Bar::new(1, 0, 10.0, 11.0, 9.8, 10.8),
            Bar::new(2, 0, 10.7, 10.9, 9.4, 9.5),
        ];
        let scan = run(&bars, &AnalysisConfig::unfiltered());
        assert_eq!(scan.signals.len(), 1);
        let s = &scan.signals[0];
        assert_eq!(s.condition, ConditionKind::BearCombo);
        assert_eq!(s.direction, Direction::Bearish);
        assert_eq!(s.stop_price, 11.0);
        assert!((s.target_price(2.0) - (9.5 - 2.0 * 1.5)).abs() < 1e-12);
    }

    #[test]
    fn test_no_base_away_from_period_low() {
        let mut bars = vec![Bar::new(1, 0, 8.0, 8.5, 7.0, 8.2)];
        bars.extend(bull_pair());
        let config = AnalysisConfig { k_line_value: Period::new(5).unwrap(), ..AnalysisConfig::unfiltered() };
        assert!(run(&bars, &config).signals.is_empty());

        // a one-bar window no longer sees the 7.0 low
        let config = AnalysisConfig { k_line_value: Period::new(1).unwrap(), ..AnalysisConfig::unfiltered() };
        assert_eq!(run(&bars, &config).signals.len(), 1);
    }

    #[test]
    fn test_filter_rejection_blocks_signal() {
        // bull bar with a long upper wick
        let bars = vec![
            Bar::new(1, 0, 10.0, 10.2, 9.0, 9.2),
            Bar::new(2, 0, 9.3, 12.0, 9.1, 10.5),
        ];
        let config = AnalysisConfig { wick_ratio: 0.3, ..AnalysisConfig::unfiltered() };
        let scan = run(&bars, &config);
        assert!(scan.signals.is_empty());
        assert_eq!(scan.filter_stats.total_signals_before_filter, 3);
        assert_eq!(scan.filter_stats.wick_filter_failed, 3);
        assert_eq!(scan.filter_stats.final_signals, 0);
    }

    #[test]
    fn test_short_and_invalid_input() {
        let config = AnalysisConfig::unfiltered();
        assert!(run(&[], &config).signals.is_empty());
        assert!(run(&bull_pair()[..1], &config).signals.is_empty());

        let mut bars = bull_pair();
        bars[1] = Bar::new(2, 0, 9.3, f64::NAN, 9.1, 10.5);
        assert!(run(&bars, &config).signals.is_empty());
    }
}
