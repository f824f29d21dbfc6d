//! Analysis configuration and parameter metadata
//!
//! [`AnalysisConfig`] is the immutable parameter set of one analysis call. It can be built
//! in code, deserialized from JSON, or derived from `key=value` override tokens:
//!
//! ```rust
//! use pa_kline::config::AnalysisConfig;
//!
//! let config = AnalysisConfig::from_tokens(["wick=0.3", "atr_mult=1.5", "retracement=on"]).unwrap();
//! assert!(config.enable_volatility_filter);
//! assert!((config.wick_ratio - 0.3).abs() < f64::EPSILON);
//! ```
//!
//! Numeric parameters are described by [`ParamMeta`], which also generates sweep grids.

use std::str::FromStr;

use crate::{AnalysisError, Period, Ratio, Result};

// ============================================================
// ENUMS
// ============================================================

/// Volatility filter preset. Scales the configured multiplier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VolatilityMode {
  #[default]
  Strict,
  Moderate,
  Loose,
}

impl VolatilityMode {
  /// Factor applied to the configured multiplier
  pub fn factor(self) -> f64 {
    match self {
      VolatilityMode::Strict => 1.0,
      VolatilityMode::Moderate => 0.8,
      VolatilityMode::Loose => 0.6,
    }
  }

  pub fn as_str(self) -> &'static str {
    match self {
      VolatilityMode::Strict => "strict",
      VolatilityMode::Moderate => "moderate",
      VolatilityMode::Loose => "loose",
    }
  }
}

impl FromStr for VolatilityMode {
  type Err = AnalysisError;

  fn from_str(s: &str) -> Result<Self> {
    match s.to_ascii_lowercase().as_str() {
      "strict" => Ok(VolatilityMode::Strict),
      "moderate" => Ok(VolatilityMode::Moderate),
      "loose" => Ok(VolatilityMode::Loose),
      _ => Err(AnalysisError::InvalidToken(format!("mode={s}"))),
    }
  }
}

/// How the wick and volatility filters combine when both are enabled
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterPolicy {
  /// Both filters must pass
  And,
  /// Either filter passing is enough
  #[default]
  Or,
}

// ============================================================
// CONFIG
// ============================================================

/// Parameter set of one analysis call
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AnalysisConfig {
  /// Window K for period highs/lows
  pub k_line_value: Period,
  pub risk_reward_ratio: f64,
  /// Price step used for "points" (body sizes, strength tiers, risk in points)
  pub pip_size: f64,

  /// Unified wick threshold; <= 0 disables the wick filter
  pub wick_ratio: f64,
  /// Check upper/lower shadows against their own thresholds
  pub separate_wick_filter: bool,
  pub max_upper_wick_ratio: Ratio,
  pub max_lower_wick_ratio: Ratio,

  pub enable_volatility_filter: bool,
  pub volatility_period: Period,
  pub volatility_multiplier: f64,
  pub volatility_mode: VolatilityMode,

  pub filter_policy: FilterPolicy,

  pub enable_retracement_entry: bool,
  pub retracement_target: Ratio,
  pub retracement_tolerance: Ratio,
  pub max_retracement_wait_bars: Period,
  pub retracement_invalidation: Ratio,

  /// Forward bars scanned when evaluating a signal's outcome
  pub outcome_lookahead: Period,
}

impl Default for AnalysisConfig {
  fn default() -> Self {
    Self {
      k_line_value: Period::new_const(15),
      risk_reward_ratio: 2.0,
      pip_size: 0.0001,
      wick_ratio: 0.33,
      separate_wick_filter: false,
      max_upper_wick_ratio: Ratio::new_const(0.4),
      max_lower_wick_ratio: Ratio::new_const(0.4),
      enable_volatility_filter: false,
      volatility_period: Period::new_const(14),
      volatility_multiplier: 1.0,
      volatility_mode: VolatilityMode::Strict,
      filter_policy: FilterPolicy::Or,
      enable_retracement_entry: true,
      retracement_target: Ratio::new_const(0.50),
      retracement_tolerance: Ratio::new_const(0.05),
      max_retracement_wait_bars: Period::new_const(10),
      retracement_invalidation: Ratio::new_const(0.786),
      outcome_lookahead: Period::new_const(50),
    }
  }
}

pub const RISK_REWARD_RANGE: (f64, f64) = (0.5, 5.0);
pub const VOLATILITY_MULTIPLIER_MAX: f64 = 10.0;

impl AnalysisConfig {
  /// Configuration with both filters disabled
  pub fn unfiltered() -> Self {
    Self { wick_ratio: 0.0, enable_volatility_filter: false, ..Self::default() }
  }

  /// Check cross-field and range constraints
  pub fn validate(&self) -> Result<()> {
    let (rr_min, rr_max) = RISK_REWARD_RANGE;
    check_range("risk_reward_ratio", self.risk_reward_ratio, rr_min, rr_max)?;

    if !self.pip_size.is_finite() || self.pip_size <= 0.0 {
      return Err(AnalysisError::InvalidValue("pip_size must be > 0"));
    }

    check_range("wick_ratio", self.wick_ratio, 0.0, 1.0)?;

    if !self.volatility_multiplier.is_finite() || self.volatility_multiplier <= 0.0 {
      return Err(AnalysisError::InvalidValue("volatility_multiplier must be > 0"));
    }
    check_range(
      "volatility_multiplier",
      self.volatility_multiplier,
      0.0,
      VOLATILITY_MULTIPLIER_MAX,
    )?;

    let target = self.retracement_target.get();
    let tolerance = self.retracement_tolerance.get();
    if target - tolerance < 0.0 || target + tolerance > 1.0 {
      return Err(AnalysisError::InvalidConfig(format!(
        "retracement band {target} ± {tolerance} leaves [0, 1]"
      )));
    }
    if self.retracement_invalidation.get() <= target {
      return Err(AnalysisError::InvalidConfig(format!(
        "retracement_invalidation {} must exceed retracement_target {target}",
        self.retracement_invalidation.get()
      )));
    }

    Ok(())
  }

  #[inline]
  pub fn wick_filter_enabled(&self) -> bool {
    self.wick_ratio > 0.0
  }

  /// Configured multiplier scaled by the volatility mode
  #[inline]
  pub fn effective_volatility_multiplier(&self) -> f64 {
    self.volatility_multiplier * self.volatility_mode.factor()
  }

  /// Parse `key=value` tokens on top of the defaults
  pub fn from_tokens<'a, I>(tokens: I) -> Result<Self>
  where
    I: IntoIterator<Item = &'a str>,
  {
    Self::default().with_overrides(tokens)
  }

  /// Apply `key=value` tokens left to right, then validate.
  ///
  /// Setting `atr_mult` or `atr_period` enables the volatility filter, `ret_target` enables
  /// retracement entries and `wick_upper`/`wick_lower` switch to independent wick checks.
  pub fn with_overrides<'a, I>(mut self, tokens: I) -> Result<Self>
  where
    I: IntoIterator<Item = &'a str>,
  {
    for token in tokens {
      let token = token.trim();
      if token.is_empty() {
        continue;
      }
      let (key, value) =
        token.split_once('=').ok_or_else(|| AnalysisError::InvalidToken(token.to_string()))?;
      self.apply(key.trim(), value.trim())?;
    }
    self.validate()?;
    Ok(self)
  }

  /// Set one numeric parameter by its override key, then validate.
  pub fn with_param(mut self, key: &str, value: f64) -> Result<Self> {
    let meta = param_meta_for(key).ok_or_else(|| AnalysisError::UnknownParameter(key.into()))?;
    if meta.param_type == ParamType::Period && (value < 1.0 || value.fract() != 0.0) {
      return Err(AnalysisError::InvalidValue("Period must be a positive integer"));
    }
    self.apply(key, &value.to_string())?;
    self.validate()?;
    Ok(self)
  }

  fn apply(&mut self, key: &str, value: &str) -> Result<()> {
    match key {
      "wick" => self.wick_ratio = parse_f64(key, value)?,
      "wick_upper" => {
        self.max_upper_wick_ratio = Ratio::new(parse_f64(key, value)?)?;
        self.separate_wick_filter = true;
      },
      "wick_lower" => {
        self.max_lower_wick_ratio = Ratio::new(parse_f64(key, value)?)?;
        self.separate_wick_filter = true;
      },
      "atr" => self.enable_volatility_filter = parse_on_off(key, value)?,
      "atr_mult" => {
        self.volatility_multiplier = parse_f64(key, value)?;
        self.enable_volatility_filter = true;
      },
      "atr_period" => {
        self.volatility_period = parse_period(key, value)?;
        self.enable_volatility_filter = true;
      },
      "mode" => self.volatility_mode = value.parse()?,
      "both" => {
        self.filter_policy =
          if parse_on_off(key, value)? { FilterPolicy::And } else { FilterPolicy::Or };
      },
      "rr" => self.risk_reward_ratio = parse_f64(key, value)?,
      "k_line_value" => self.k_line_value = parse_period(key, value)?,
      "pip" => self.pip_size = parse_f64(key, value)?,
      "lookahead" => self.outcome_lookahead = parse_period(key, value)?,
      "retracement" => self.enable_retracement_entry = parse_on_off(key, value)?,
      "ret_target" => {
        self.retracement_target = Ratio::new(parse_f64(key, value)?)?;
        self.enable_retracement_entry = true;
      },
      "ret_tolerance" => self.retracement_tolerance = Ratio::new(parse_f64(key, value)?)?,
      "ret_wait" => self.max_retracement_wait_bars = parse_period(key, value)?,
      "ret_invalidation" => {
        self.retracement_invalidation = Ratio::new(parse_f64(key, value)?)?;
      },
      _ => return Err(AnalysisError::UnknownParameter(key.to_string())),
    }
    Ok(())
  }
}

fn check_range(field: &'static str, value: f64, min: f64, max: f64) -> Result<()> {
  if value.is_nan() || value.is_infinite() {
    return Err(AnalysisError::InvalidValue("NaN or infinite parameter"));
  }
  if value < min || value > max {
    return Err(AnalysisError::OutOfRange { field, value, min, max });
  }
  Ok(())
}

fn parse_f64(key: &str, value: &str) -> Result<f64> {
  value.parse::<f64>().map_err(|_| AnalysisError::InvalidToken(format!("{key}={value}")))
}

fn parse_period(key: &str, value: &str) -> Result<Period> {
  let n = value.parse::<usize>().map_err(|_| AnalysisError::InvalidToken(format!("{key}={value}")))?;
  Period::new(n)
}

fn parse_on_off(key: &str, value: &str) -> Result<bool> {
  match value.to_ascii_lowercase().as_str() {
    "on" | "true" | "1" => Ok(true),
    "off" | "false" | "0" => Ok(false),
    _ => Err(AnalysisError::InvalidToken(format!("{key}={value}"))),
  }
}

// ============================================================
// PARAMETER METADATA
// ============================================================

/// Type of parameter value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamType {
  /// Fraction in 0.0..=1.0
  Ratio,
  /// Positive integer
  Period,
  /// Positive real number
  Float,
}

/// Metadata for a single numeric parameter
#[derive(Debug, Clone)]
pub struct ParamMeta {
  /// Override key (e.g. "atr_mult")
  pub name: &'static str,
  pub param_type: ParamType,
  pub default: f64,
  /// Range for sweeps: (min, max, step)
  pub range: (f64, f64, f64),
  pub description: &'static str,
}

impl ParamMeta {
  pub const fn ratio(
    name: &'static str,
    default: f64,
    range: (f64, f64, f64),
    description: &'static str,
  ) -> Self {
    Self { name, param_type: ParamType::Ratio, default, range, description }
  }

  pub const fn period(
    name: &'static str,
    default: f64,
    range: (f64, f64, f64),
    description: &'static str,
  ) -> Self {
    Self { name, param_type: ParamType::Period, default, range, description }
  }

  pub const fn float(
    name: &'static str,
    default: f64,
    range: (f64, f64, f64),
    description: &'static str,
  ) -> Self {
    Self { name, param_type: ParamType::Float, default, range, description }
  }

  /// Generate all values for a sweep. Values are rounded to the step's precision.
  pub fn generate_grid(&self) -> Vec<f64> {
    let (min, max, step) = self.range;
    if step <= 0.0 {
      return vec![min];
    }
    let count = ((max - min) / step + 1e-9).floor() as usize + 1;
    (0..count).map(|i| round_to_step(min + i as f64 * step, step)).collect()
  }

  /// Validate a value for this parameter
  pub fn validate(&self, value: f64) -> Result<()> {
    let (min, max, _) = self.range;
    if value < min || value > max {
      return Err(AnalysisError::OutOfRange { field: self.name, value, min, max });
    }
    match self.param_type {
      ParamType::Ratio | ParamType::Float => Ok(()),
      ParamType::Period => {
        if value < 1.0 || value.fract() != 0.0 {
          return Err(AnalysisError::InvalidValue("Period must be a positive integer"));
        }
        Ok(())
      },
    }
  }
}

fn round_to_step(value: f64, step: f64) -> f64 {
  let decimals = (-step.log10()).ceil().max(0.0) as i32 + 1;
  let scale = 10f64.powi(decimals);
  (value * scale).round() / scale
}

const PARAMS: &[ParamMeta] = &[
  ParamMeta::ratio("wick", 0.33, (0.0, 0.5, 0.05), "Max shadow/range ratio, 0 disables"),
  ParamMeta::ratio("wick_upper", 0.4, (0.1, 0.6, 0.05), "Max upper shadow ratio (independent)"),
  ParamMeta::ratio("wick_lower", 0.4, (0.1, 0.6, 0.05), "Max lower shadow ratio (independent)"),
  ParamMeta::float("atr_mult", 1.0, (0.5, 2.0, 0.1), "Volatility threshold multiplier"),
  ParamMeta::period("atr_period", 14.0, (5.0, 30.0, 1.0), "Volatility averaging period"),
  ParamMeta::float("rr", 2.0, (1.0, 3.0, 0.5), "Risk:reward ratio of the target"),
  ParamMeta::period("k_line_value", 15.0, (5.0, 30.0, 5.0), "Window for period highs/lows"),
  ParamMeta::period("lookahead", 50.0, (10.0, 100.0, 10.0), "Bars scanned for outcomes"),
  ParamMeta::ratio("ret_target", 0.5, (0.382, 0.618, 0.118), "Retracement entry fraction"),
  ParamMeta::ratio("ret_tolerance", 0.05, (0.01, 0.1, 0.01), "Half-width of the entry band"),
  ParamMeta::period("ret_wait", 10.0, (5.0, 20.0, 5.0), "Max bars to wait for a retracement"),
  ParamMeta::ratio("ret_invalidation", 0.786, (0.618, 1.0, 0.1), "Retracement that voids entry"),
];

/// Metadata for every numeric override key
pub fn param_meta() -> &'static [ParamMeta] {
  PARAMS
}

/// Metadata for one override key
pub fn param_meta_for(name: &str) -> Option<&'static ParamMeta> {
  PARAMS.iter().find(|p| p.name == name)
}

// ============================================================
// TESTS
// ============================================================
