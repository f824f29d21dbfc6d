//! Forward outcome evaluation and win-rate aggregation
//!
//! A signal resolves on the first forward bar that touches its stop or its target.
//! When one bar touches both, the stop wins.

use crate::{signals::TradeSignal, Direction, OHLCV};

/// How a signal resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Target,
    StopLoss,
    /// Full lookahead window scanned without a touch
    TimeLimit,
    /// Sequence ended before the window was complete
    Pending,
}

impl Outcome {
    #[inline]
    pub fn is_completed(self) -> bool {
        matches!(self, Outcome::Target | Outcome::StopLoss)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Outcome::Target => "target",
            Outcome::StopLoss => "stop_loss",
            Outcome::TimeLimit => "time_limit",
            Outcome::Pending => "pending",
        }
    }
}

/// Verdict for one signal
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct SignalOutcome {
    /// 1-based index of the signal bar
    pub signal_index: usize,
    pub outcome: Outcome,
    pub target_price: f64,
    /// 1-based index of the resolving bar
    pub exit_index: Option<usize>,
    pub exit_price: Option<f64>,
    /// Forward bars scanned
    pub bars_held: usize,
    /// Result in units of initial risk; 0 when unresolved
    pub r_multiple: f64,
}

/// Aggregate over a run's outcomes
#[derive(Debug, Clone, Copy, Default, PartialEq, serde::Serialize)]
pub struct WinRateSummary {
    pub signals: usize,
    pub wins: usize,
    pub losses: usize,
    pub time_limit: usize,
    pub pending: usize,
    /// wins / (wins + losses) × 100
    pub win_rate: f64,
    /// Mean R over completed trades
    pub avg_r: f64,
    /// Gross R won / gross R lost
    pub profit_factor: f64,
    pub risk_reward_ratio: f64,
}

impl WinRateSummary {
    pub fn from_outcomes(outcomes: &[SignalOutcome], rr: f64) -> Self {
        let mut summary = Self {
            signals: outcomes.len(),
            risk_reward_ratio: rr,
            ..Self::default()
        };
        for o in outcomes {
            match o.outcome {
                Outcome::Target => summary.wins += 1,
                Outcome::StopLoss => summary.losses += 1,
                Outcome::TimeLimit => summary.time_limit += 1,
                Outcome::Pending => summary.pending += 1,
            }
        }

        let completed = summary.completed();
        if completed > 0 {
            let gross_win = summary.wins as f64 * rr;
            let gross_loss = summary.losses as f64;
            summary.win_rate = summary.wins as f64 / completed as f64 * 100.0;
            summary.avg_r = (gross_win - gross_loss) / completed as f64;
            summary.profit_factor = if summary.losses == 0 { gross_win } else { gross_win / gross_loss };
        }
        summary
    }

    #[inline]
    pub fn completed(&self) -> usize {
        self.wins + self.losses
    }
}

/// Scans forward bars to classify signals
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OutcomeEvaluator {
    pub risk_reward_ratio: f64,
    pub lookahead: usize,
}

impl OutcomeEvaluator {
    pub fn new(risk_reward_ratio: f64, lookahead: usize) -> Self {
        Self { risk_reward_ratio, lookahead }
    }

    pub fn evaluate<T: OHLCV>(&self, bars: &[T], signal: &TradeSignal) -> SignalOutcome {
        let target = signal.target_price(self.risk_reward_ratio);
        let Some(position) = signal.position() else {
            return unresolved(signal, Outcome::Pending, target, 0);
        };
        let window_end = position.saturating_add(1).saturating_add(self.lookahead);
        let scan_end = window_end.min(bars.len());

        for j in (position + 1)..scan_end {
            let bar = &bars[j];
            let (stopped, reached) = match signal.direction {
                Direction::Bearish => (bar.high() >= signal.stop_price, bar.low() <= target),
                _ => (bar.low() <= signal.stop_price, bar.high() >= target),
            };
            let resolved = if stopped {
                Some((Outcome::StopLoss, signal.stop_price, -1.0))
            } else if reached {
                Some((Outcome::Target, target, self.risk_reward_ratio))
            } else {
                None
            };
            if let Some((outcome, exit_price, r_multiple)) = resolved {
                return SignalOutcome {
                    signal_index: signal.index,
                    outcome,
                    target_price: target,
                    exit_index: Some(j + 1),
                    exit_price: Some(exit_price),
                    bars_held: j - position,
                    r_multiple,
                };
            }
        }

        let outcome = if window_end <= bars.len() { Outcome::TimeLimit } else { Outcome::Pending };
        unresolved(signal, outcome, target, scan_end.saturating_sub(position + 1))
    }

    pub fn evaluate_all<T: OHLCV>(&self, bars: &[T], signals: &[TradeSignal]) -> Vec<SignalOutcome> {
        signals.iter().map(|s| self.evaluate(bars, s)).collect()
    }
}

fn unresolved(signal: &TradeSignal, outcome: Outcome, target: f64, bars_held: usize) -> SignalOutcome {
    SignalOutcome {
        signal_index: signal.index,
        outcome,
        target_price: target,
        exit_index: None,
        exit_price: None,
        bars_held,
        r_multiple: 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        signals::{BreakoutType, ConditionKind, SubConditions},
        Bar,
    };

    fn long_signal(position: usize, entry: f64, stop: f64) -> TradeSignal {
        TradeSignal {
            index: position + 1,
            timestamp: None,
            direction: Direction::Bullish,
            entry_price: entry,
            stop_price: stop,
            risk: (entry - stop).abs(),
            risk_points: (entry - stop).abs() / 0.0001,
            condition: ConditionKind::BullCombo,
            breakout: BreakoutType::Combo,
            is_combo: true,
            label: String::new(),
            conditions: SubConditions::default(),
        }
    }

    fn flat(n: usize, price: f64) -> Vec<Bar> {
        (0..n).map(|i| Bar::new(i + 1, 0, price, price + 0.001, price - 0.001, price)).collect()
    }

    #[test]
    fn test_stop_checked_before_target() {
        let mut bars = flat(1, 1.00);
        bars.push(Bar::new(2, 0, 1.00, 1.025, 0.985, 1.01));
        let evaluator = OutcomeEvaluator::new(2.0, 50);
        let signal = long_signal(0, 1.00, 0.99);
        assert!((signal.target_price(2.0) - 1.02).abs() < 1e-12);

        let o = evaluator.evaluate(&bars, &signal);
        assert_eq!(o.outcome, Outcome::StopLoss);
        assert_eq!(o.exit_index, Some(2));
        assert_eq!(o.bars_held, 1);
        assert_eq!(o.r_multiple, -1.0);
    }

    #[test]
    fn test_target_hit() {
        let mut bars = flat(3, 1.00);
        bars.push(Bar::new(4, 0, 1.00, 1.03, 0.995, 1.02));
        let o = OutcomeEvaluator::new(2.0, 50).evaluate(&bars, &long_signal(0, 1.00, 0.99));
        assert_eq!(o.outcome, Outcome::Target);
        assert_eq!(o.exit_index, Some(4));
        assert_eq!(o.r_multiple, 2.0);
    }

    #[test]
    fn test_bearish_mirror() {
        let mut signal = long_signal(0, 1.00, 1.01);
        signal.direction = Direction::Bearish;
        let mut bars = flat(1, 1.00);
        bars.push(Bar::new(2, 0, 1.00, 1.005, 0.975, 0.98));
        let o = OutcomeEvaluator::new(2.0, 50).evaluate(&bars, &signal);
        assert_eq!(o.outcome, Outcome::Target);
    }

    #[test]
    fn test_time_limit_versus_pending() {
        let evaluator = OutcomeEvaluator::new(2.0, 3);
        let signal = long_signal(0, 1.00, 0.99);

        // 1 + 3 forward bars available
        let o = evaluator.evaluate(&flat(4, 1.00), &signal);
        assert_eq!(o.outcome, Outcome::TimeLimit);
        assert_eq!(o.bars_held, 3);

        let o = evaluator.evaluate(&flat(3, 1.00), &signal);
        assert_eq!(o.outcome, Outcome::Pending);
        assert_eq!(o.bars_held, 2);
    }

    #[test]
    fn test_unbounded_lookahead_stays_pending() {
        let evaluator = OutcomeEvaluator::new(2.0, usize::MAX);
        let o = evaluator.evaluate(&flat(5, 1.00), &long_signal(1, 1.00, 0.99));
        assert_eq!(o.outcome, Outcome::Pending);
        assert_eq!(o.bars_held, 3);
    }

    #[test]
    fn test_zero_index_signal_is_pending() {
        let mut signal = long_signal(0, 1.00, 0.99);
        signal.index = 0;
        assert_eq!(signal.position(), None);
        let o = OutcomeEvaluator::new(2.0, 50).evaluate(&flat(3, 1.00), &signal);
        assert_eq!(o.outcome, Outcome::Pending);
        assert_eq!(o.exit_index, None);
        assert_eq!(o.bars_held, 0);
    }

    #[test]
    fn test_summary_metrics() {
        let make = |outcome| SignalOutcome {
            signal_index: 1,
            outcome,
            target_price: 0.0,
            exit_index: None,
            exit_price: None,
            bars_held: 0,
            r_multiple: 0.0,
        };
        let outcomes = vec![
            make(Outcome::Target),
            make(Outcome::Target),
            make(Outcome::StopLoss),
            make(Outcome::TimeLimit),
            make(Outcome::Pending),
        ];
        let s = WinRateSummary::from_outcomes(&outcomes, 2.0);
        assert_eq!(s.signals, 5);
        assert_eq!(s.completed(), 3);
        assert!((s.win_rate - 200.0 / 3.0).abs() < 1e-9);
        assert!((s.avg_r - 1.0).abs() < 1e-12);
        assert!((s.profit_factor - 4.0).abs() < 1e-12);
        assert_eq!(s.time_limit, 1);
        assert_eq!(s.pending, 1);
    }

    #[test]
    fn test_summary_without_completed_trades() {
        let s = WinRateSummary::from_outcomes(&[], 2.0);
        assert_eq!(s.win_rate, 0.0);
        assert_eq!(s.avg_r, 0.0);
        assert_eq!(s.profit_factor, 0.0);
    }
}
