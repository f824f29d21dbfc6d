//! Signal quality filters: wick ratio and volatility
//!
//! Combination rules as a decision table over which filters are enabled:
//!
//! | wick | volatility | result                         |
//! |------|------------|--------------------------------|
//! | off  | off        | pass                           |
//! | on   | off        | wick verdict                   |
//! | off  | on         | volatility verdict             |
//! | on   | on         | `And`: both pass, `Or`: either |

use crate::{
    config::{AnalysisConfig, FilterPolicy, VolatilityMode},
    detectors::{combined_range, ratio_of_range},
    rolling::RollingStatistics,
    OHLCVExt, OHLCV,
};

/// Wick-ratio thresholds
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WickFilter {
    Disabled,
    /// Both shadows against one threshold
    Unified(f64),
    /// Upper and lower shadows against their own thresholds
    Independent { upper: f64, lower: f64 },
}

impl WickFilter {
    pub fn from_config(config: &AnalysisConfig) -> Self {
        if !config.wick_filter_enabled() {
            WickFilter::Disabled
        } else if config.separate_wick_filter {
            WickFilter::Independent {
                upper: config.max_upper_wick_ratio.get(),
                lower: config.max_lower_wick_ratio.get(),
            }
        } else {
            WickFilter::Unified(config.wick_ratio)
        }
    }

    #[inline]
    pub fn is_enabled(&self) -> bool {
        !matches!(self, WickFilter::Disabled)
    }

    /// Returns `None` when disabled
    pub fn check<T: OHLCV>(&self, bar: &T) -> Option<bool> {
        let (max_upper, max_lower) = match *self {
            WickFilter::Disabled => return None,
            WickFilter::Unified(r) => (r, r),
            WickFilter::Independent { upper, lower } => (upper, lower),
        };
        let range = bar.range();
        let upper = ratio_of_range(bar.upper_shadow(), range);
        let lower = ratio_of_range(bar.lower_shadow(), range);
        Some(upper <= max_upper && lower <= max_lower)
    }
}

/// Two-bar range versus scaled volatility
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum VolatilityFilter {
    Disabled,
    Enabled { multiplier: f64, mode: VolatilityMode },
}

impl VolatilityFilter {
    pub fn from_config(config: &AnalysisConfig) -> Self {
        if config.enable_volatility_filter {
            VolatilityFilter::Enabled {
                multiplier: config.volatility_multiplier,
                mode: config.volatility_mode,
            }
        } else {
            VolatilityFilter::Disabled
        }
    }

    #[inline]
    pub fn is_enabled(&self) -> bool {
        !matches!(self, VolatilityFilter::Disabled)
    }

    /// Returns `None` when disabled. The first bar has no predecessor and passes;
    /// an index past the data fails.
    pub fn check<T: OHLCV>(&self, bars: &[T], stats: &RollingStatistics, index: usize) -> Option<bool> {
        let VolatilityFilter::Enabled { multiplier, mode } = *self else {
            return None;
        };
        if index < 1 {
            return Some(true);
        }
        let (Some(prev), Some(curr), Some(volatility)) =
            (bars.get(index - 1), bars.get(index), stats.volatility.get(index))
        else {
            return Some(false);
        };
        let threshold = volatility * multiplier * mode.factor();
        Some(combined_range(prev, curr) > threshold)
    }
}

/// Per-bar result of the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterVerdict {
    /// `None` when the wick filter is disabled
    pub wick: Option<bool>,
    /// `None` when the volatility filter is disabled
    pub volatility: Option<bool>,
    pub passed: bool,
}

/// Wick and volatility filters plus their combination policy
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilterPipeline {
    pub wick: WickFilter,
    pub volatility: VolatilityFilter,
    pub policy: FilterPolicy,
}

impl FilterPipeline {
    pub fn from_config(config: &AnalysisConfig) -> Self {
        Self {
            wick: WickFilter::from_config(config),
            volatility: VolatilityFilter::from_config(config),
            policy: config.filter_policy,
        }
    }

    /// Pipeline that passes every bar
    pub fn pass_through() -> Self {
        Self {
            wick: WickFilter::Disabled,
            volatility: VolatilityFilter::Disabled,
            policy: FilterPolicy::Or,
        }
    }

    /// Verdict for the bar at `index` (0-based), `None` past the end of `bars`
    pub fn evaluate<T: OHLCV>(
        &self,
        bars: &[T],
        stats: &RollingStatistics,
        index: usize,
    ) -> Option<FilterVerdict> {
        let wick = self.wick.check(bars.get(index)?);
        let volatility = self.volatility.check(bars, stats, index);
        let passed = combine(self.policy, wick, volatility);

        if !passed {
            tracing::debug!(
                bar = index + 1,
                wick = ?wick,
                volatility = ?volatility,
                policy = ?self.policy,
                "filter rejected bar"
            );
        }

        Some(FilterVerdict {
            wick,
            volatility,
            passed,
        })
    }
}

/// Decision table for enabled filters
#[inline]
pub fn combine(policy: FilterPolicy, wick: Option<bool>, volatility: Option<bool>) -> bool {
    match (wick, volatility, policy) {
        (None, None, _) => true,
        (Some(w), None, _) => w,
        (None, Some(v), _) => v,
        (Some(w), Some(v), FilterPolicy::And) => w && v,
        (Some(w), Some(v), FilterPolicy::Or) => w || v,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Bar, Period, Ratio};

    fn stats_for(bars: &[Bar], period: usize) -> RollingStatistics {
        RollingStatistics::compute(bars, Period::new(15).unwrap(), Period::new(period).unwrap())
    }

    #[test]
    fn test_decision_table() {
        use FilterPolicy::*;
        assert!(combine(And, None, None));
        assert!(combine(Or, None, None));
        assert!(!combine(And, Some(false), None));
        assert!(!combine(Or, Some(false), None));
        assert!(combine(And, None, Some(true)));
        assert!(!combine(Or, None, Some(false)));
        assert!(!combine(And, Some(true), Some(false)));
        assert!(combine(Or, Some(true), Some(false)));
        assert!(combine(And, Some(true), Some(true)));
        assert!(!combine(Or, Some(false), Some(false)));
    }

    #[test]
    fn test_unified_wick_filter() {
        let filter = WickFilter::Unified(0.3);
        // range 10, upper 2, lower 1
        assert_eq!(filter.check(&Bar::new(1, 0, 11.0, 20.0, 10.0, 18.0)), Some(true));
        // upper 4
        assert_eq!(filter.check(&Bar::new(1, 0, 11.0, 20.0, 10.0, 16.0)), Some(false));
        // zero range passes
        assert_eq!(filter.check(&Bar::new(1, 0, 5.0, 5.0, 5.0, 5.0)), Some(true));
    }

    #[test]
    fn test_independent_wick_filter() {
        let config = AnalysisConfig {
            wick_ratio: 0.3,
            separate_wick_filter: true,
            max_upper_wick_ratio: Ratio::new(0.5).unwrap(),
            max_lower_wick_ratio: Ratio::new(0.05).unwrap(),
            ..AnalysisConfig::default()
        };
        let filter = WickFilter::from_config(&config);
        assert!(matches!(filter, WickFilter::Independent { .. }));
        // upper 0.4 ok, lower 0.0 ok
        assert_eq!(filter.check(&Bar::new(1, 0, 10.0, 20.0, 10.0, 16.0)), Some(true));
        // lower 0.1 too long
        assert_eq!(filter.check(&Bar::new(1, 0, 11.0, 20.0, 10.0, 16.0)), Some(false));
    }

    #[test]
    fn test_wick_ratio_zero_disables() {
        let config = AnalysisConfig { wick_ratio: 0.0, separate_wick_filter: true, ..AnalysisConfig::default() };
        assert_eq!(WickFilter::from_config(&config), WickFilter::Disabled);
    }

    #[test]
    fn test_volatility_filter() {
        let bars = vec![
            Bar::new(1, 0, 10.0, 10.5, 9.5, 10.2),
            Bar::new(2, 0, 10.2, 10.6, 9.8, 10.4),
            Bar::new(3, 0, 10.4, 12.5, 10.3, 12.4),
        ];
        let stats = stats_for(&bars, 3);
        let strict = VolatilityFilter::Enabled { multiplier: 1.0, mode: VolatilityMode::Strict };

        assert_eq!(strict.check(&bars, &stats, 0), Some(true));
        // combined 10.6-9.5 = 1.1, atr mean(1.0, 0.8) = 0.9
        assert_eq!(strict.check(&bars, &stats, 1), Some(true));

        let wide = VolatilityFilter::Enabled { multiplier: 1.5, mode: VolatilityMode::Strict };
        assert_eq!(wide.check(&bars, &stats, 1), Some(false));
        // loose mode scales 1.5 down to 0.9 -> threshold 0.81
        let loose = VolatilityFilter::Enabled { multiplier: 1.5, mode: VolatilityMode::Loose };
        assert_eq!(loose.check(&bars, &stats, 1), Some(true));

        assert_eq!(VolatilityFilter::Disabled.check(&bars, &stats, 2), None);
    }

    #[test]
    fn test_pass_through_passes_everything() {
        let bars = vec![
            Bar::new(1, 0, 10.0, 30.0, 0.0, 10.1),
            Bar::new(2, 0, 10.0, 10.0, 10.0, 10.0),
        ];
        let stats = stats_for(&bars, 14);
        let pipeline = FilterPipeline::from_config(&AnalysisConfig::unfiltered());
        assert_eq!(pipeline, FilterPipeline::pass_through());
        for i in 0..bars.len() {
            let verdict = pipeline.evaluate(&bars, &stats, i).unwrap();
            assert!(verdict.passed);
            assert_eq!(verdict.wick, None);
            assert_eq!(verdict.volatility, None);
        }
    }

    #[test]
    fn test_index_past_end_has_no_verdict() {
        let bars = vec![Bar::new(1, 0, 11.0, 20.0, 10.0, 16.0)];
        let stats = stats_for(&bars, 14);
        let pipeline = FilterPipeline::from_config(&AnalysisConfig::default());
        assert!(pipeline.evaluate(&bars, &stats, 0).is_some());
        assert_eq!(pipeline.evaluate(&bars, &stats, 1), None);

        let volatility = VolatilityFilter::Enabled { multiplier: 1.0, mode: VolatilityMode::Strict };
        assert_eq!(volatility.check(&bars, &stats, 3), Some(false));
    }

    #[test]
    fn test_single_enabled_filter_governs_regardless_of_policy() {
        let bars = vec![
            Bar::new(1, 0, 11.0, 20.0, 10.0, 16.0),
            Bar::new(2, 0, 11.0, 20.0, 10.0, 16.0),
        ];
        let stats = stats_for(&bars, 14);
        for policy in [FilterPolicy::And, FilterPolicy::Or] {
            let pipeline = FilterPipeline {
                wick: WickFilter::Unified(0.3),
                volatility: VolatilityFilter::Disabled,
                policy,
            };
            assert!(!pipeline.evaluate(&bars, &stats, 1).unwrap().passed);
        }
    }
}
