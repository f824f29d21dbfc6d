//! One-parameter sweeps
//!
//! Every value produces its own validated configuration; the analyses then run on the
//! rayon pool. Points come back in the order of the input values.

use rayon::prelude::*;

use crate::{
    config::{param_meta_for, AnalysisConfig},
    outcome::WinRateSummary,
    AnalysisError, KlineAnalyzer, Result, OHLCV,
};

/// Result of one sweep value
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct SweepPoint {
    pub value: f64,
    pub signals: usize,
    /// Final signals per filter candidate, in percent
    pub overall_pass_rate: f64,
    pub win_rate: WinRateSummary,
}

/// Analyze `bars` once per value of `key`, on top of `base`.
///
/// Fails before any analysis runs if a value is invalid for `key`.
pub fn sweep<T>(bars: &[T], base: &AnalysisConfig, key: &str, values: &[f64]) -> Result<Vec<SweepPoint>>
where
    T: OHLCV + Sync,
{
    let analyzers = values
        .iter()
        .map(|&value| {
            let config = base.clone().with_param(key, value)?;
            Ok((value, KlineAnalyzer::new(config)?))
        })
        .collect::<Result<Vec<_>>>()?;

    tracing::debug!(key, points = analyzers.len(), "running parameter sweep");

    Ok(analyzers
        .par_iter()
        .map(|(value, analyzer)| {
            let result = analyzer.analyze(bars);
            SweepPoint {
                value: *value,
                signals: result.signals.len(),
                overall_pass_rate: result.filter_stats.overall_pass_rate(),
                win_rate: result.win_rate,
            }
        })
        .collect())
}

/// Sweep `key` over its metadata grid
pub fn sweep_grid<T>(bars: &[T], base: &AnalysisConfig, key: &str) -> Result<Vec<SweepPoint>>
where
    T: OHLCV + Sync,
{
    let meta = param_meta_for(key).ok_or_else(|| AnalysisError::UnknownParameter(key.to_string()))?;
    sweep(bars, base, key, &meta.generate_grid())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Bar;

    fn bars() -> Vec<Bar> {
        vec![
            Bar::new(1, 0, 10.0, 10.2, 9.0, 9.2),
            Bar::new(2, 0, 9.3, 10.6, 9.1, 10.5),
            Bar::new(3, 0, 10.5, 14.0, 10.4, 13.9),
        ]
    }

    #[test]
    fn test_sweep_preserves_value_order() {
        let points = sweep(&bars(), &AnalysisConfig::unfiltered(), "rr", &[1.0, 2.0, 3.0]).unwrap();
        let values: Vec<f64> = points.iter().map(|p| p.value).collect();
        assert_eq!(values, vec![1.0, 2.0, 3.0]);
        assert!(points.iter().all(|p| p.signals == 1));
        assert_eq!(points[0].win_rate.risk_reward_ratio, 1.0);
        // target 10.5 + 3 * 1.5 = 15.0 is never reached
        assert_eq!(points[2].win_rate.wins, 0);
        assert_eq!(points[0].win_rate.wins, 1);
    }

    #[test]
    fn test_sweep_rejects_invalid_value() {
        let base = AnalysisConfig::unfiltered();
        assert!(sweep(&bars(), &base, "rr", &[2.0, 9.0]).is_err());
        assert!(sweep(&bars(), &base, "k_line_value", &[0.5]).is_err());
        assert!(sweep_grid(&bars(), &base, "nope").is_err());
    }

    #[test]
    fn test_sweep_grid_covers_metadata() {
        let points = sweep_grid(&bars(), &AnalysisConfig::unfiltered(), "lookahead").unwrap();
        assert_eq!(points.len(), 10);
    }
}
