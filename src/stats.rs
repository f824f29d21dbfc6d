//! Per-run counters
//!
//! Collectors are created inside one analysis call and handed back as values in the
//! result; nothing here outlives the call.

use crate::{
    filters::FilterVerdict,
    retracement::{EntryStatus, RetracementSignal},
    signals::ConditionKind,
};

/// Filter pass/fail counters.
///
/// One candidate is counted for every structurally true sub-condition, so a bar with
/// three satisfied breakouts contributes three candidates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct FilterStats {
    pub total_signals_before_filter: usize,
    pub wick_filter_passed: usize,
    pub wick_filter_failed: usize,
    pub volatility_filter_passed: usize,
    pub volatility_filter_failed: usize,
    pub combined_filter_passed: usize,
    pub final_signals: usize,
}

impl FilterStats {
    /// Record one candidate sub-condition and the filter verdict it received
    pub fn record(&mut self, verdict: &FilterVerdict) {
        self.total_signals_before_filter += 1;
        match verdict.wick {
            Some(true) => self.wick_filter_passed += 1,
            Some(false) => self.wick_filter_failed += 1,
            None => {}
        }
        match verdict.volatility {
            Some(true) => self.volatility_filter_passed += 1,
            Some(false) => self.volatility_filter_failed += 1,
            None => {}
        }
        if verdict.passed {
            self.combined_filter_passed += 1;
            self.final_signals += 1;
        }
    }

    pub fn wick_pass_rate(&self) -> f64 {
        percentage(self.wick_filter_passed, self.wick_filter_passed + self.wick_filter_failed)
    }

    pub fn volatility_pass_rate(&self) -> f64 {
        percentage(
            self.volatility_filter_passed,
            self.volatility_filter_passed + self.volatility_filter_failed,
        )
    }

    pub fn overall_pass_rate(&self) -> f64 {
        percentage(self.final_signals, self.total_signals_before_filter)
    }

    /// Candidates removed by the filters
    pub fn rejected(&self) -> usize {
        self.total_signals_before_filter - self.final_signals
    }
}

/// Retracement entry counters
#[derive(Debug, Clone, Copy, Default, PartialEq, serde::Serialize)]
pub struct RetracementStats {
    pub engulfing_patterns_detected: usize,
    pub retracement_opportunities_found: usize,
    pub retracement_entries_executed: usize,
    pub retracement_invalidations: usize,
    pub retracement_waiting: usize,
    /// Mean actual retracement fraction over entries
    pub avg_retracement_percentage: f64,
    /// Entries per detected engulfing pattern, in percent
    pub retracement_success_rate: f64,
}

impl RetracementStats {
    pub fn from_signals(signals: &[RetracementSignal], engulfing_detected: usize) -> Self {
        let mut stats = Self {
            engulfing_patterns_detected: engulfing_detected,
            ..Self::default()
        };
        let mut retracement_sum = 0.0;

        for signal in signals {
            match &signal.status {
                EntryStatus::EntryOpportunity(entry) => {
                    stats.retracement_opportunities_found += 1;
                    stats.retracement_entries_executed += 1;
                    retracement_sum += entry.actual_retracement;
                }
                EntryStatus::Invalidated { .. } => stats.retracement_invalidations += 1,
                EntryStatus::Waiting => stats.retracement_waiting += 1,
            }
        }

        if stats.retracement_entries_executed > 0 {
            stats.avg_retracement_percentage =
                retracement_sum / stats.retracement_entries_executed as f64;
        }
        stats.retracement_success_rate =
            percentage(stats.retracement_entries_executed, engulfing_detected);
        stats
    }
}

/// Emitted signals per condition kind
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct ConditionCounts {
    pub bull_close_high: usize,
    pub bull_close_open: usize,
    pub bull_high_high: usize,
    pub bull_combo: usize,
    pub bear_close_low: usize,
    pub bear_close_open: usize,
    pub bear_low_low: usize,
    pub bear_combo: usize,
}

impl ConditionCounts {
    pub fn record(&mut self, kind: ConditionKind) {
        let slot = match kind {
            ConditionKind::BullCloseHigh => &mut self.bull_close_high,
            ConditionKind::BullCloseOpen => &mut self.bull_close_open,
            ConditionKind::BullHighHigh => &mut self.bull_high_high,
            ConditionKind::BullCombo => &mut self.bull_combo,
            ConditionKind::BearCloseLow => &mut self.bear_close_low,
            ConditionKind::BearCloseOpen => &mut self.bear_close_open,
            ConditionKind::BearLowLow => &mut self.bear_low_low,
            ConditionKind::BearCombo => &mut self.bear_combo,
        };
        *slot += 1;
    }

    pub fn get(&self, kind: ConditionKind) -> usize {
        match kind {
            ConditionKind::BullCloseHigh => self.bull_close_high,
            ConditionKind::BullCloseOpen => self.bull_close_open,
            ConditionKind::BullHighHigh => self.bull_high_high,
            ConditionKind::BullCombo => self.bull_combo,
            ConditionKind::BearCloseLow => self.bear_close_low,
            ConditionKind::BearCloseOpen => self.bear_close_open,
            ConditionKind::BearLowLow => self.bear_low_low,
            ConditionKind::BearCombo => self.bear_combo,
        }
    }

    pub fn total(&self) -> usize {
        ConditionKind::ALL.iter().map(|k| self.get(*k)).sum()
    }
}

#[inline]
pub(crate) fn percentage(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_stats_record() {
        let mut stats = FilterStats::default();
        stats.record(&FilterVerdict { wick: Some(true), volatility: None, passed: true });
        stats.record(&FilterVerdict { wick: Some(false), volatility: None, passed: false });
        stats.record(&FilterVerdict { wick: None, volatility: None, passed: true });

        assert_eq!(stats.total_signals_before_filter, 3);
        assert_eq!(stats.wick_filter_passed, 1);
        assert_eq!(stats.wick_filter_failed, 1);
        assert_eq!(stats.volatility_filter_passed, 0);
        assert_eq!(stats.final_signals, 2);
        assert_eq!(stats.rejected(), 1);
        assert!((stats.wick_pass_rate() - 50.0).abs() < 1e-9);
        assert!((stats.overall_pass_rate() - 200.0 / 3.0).abs() < 1e-9);
        assert_eq!(stats.volatility_pass_rate(), 0.0);
    }

    #[test]
    fn test_condition_counts() {
        let mut counts = ConditionCounts::default();
        counts.record(ConditionKind::BullCombo);
        counts.record(ConditionKind::BullCombo);
        counts.record(ConditionKind::BearLowLow);
        assert_eq!(counts.get(ConditionKind::BullCombo), 2);
        assert_eq!(counts.get(ConditionKind::BearLowLow), 1);
        assert_eq!(counts.total(), 3);
    }

    #[test]
    fn test_percentage_of_zero() {
        assert_eq!(percentage(3, 0), 0.0);
    }
}
