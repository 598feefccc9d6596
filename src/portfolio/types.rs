//! # Portfolio Types
//!
//! $$
//! \text{DD}_t = \frac{V_t}{\max_{s \le t} V_s} - 1
//! $$
//!
//! Weight inputs, metric values and backtest outputs.

use std::collections::BTreeMap;
use std::fmt::Display;

use chrono::NaiveDate;
use ndarray::Array1;
use serde::Serialize;

use crate::data::TimeTable;

/// Portfolio weights: one allocation for every date, or a schedule of
/// allocations carried forward between its dates.
#[derive(Clone, Debug)]
pub enum WeightSpec {
  Static(BTreeMap<String, f64>),
  TimeVarying(TimeTable),
}

impl WeightSpec {
  /// Static weights from `(asset, weight)` pairs.
  pub fn fixed<I, S>(pairs: I) -> Self
  where
    I: IntoIterator<Item = (S, f64)>,
    S: Into<String>,
  {
    Self::Static(pairs.into_iter().map(|(k, v)| (k.into(), v)).collect())
  }
}

impl From<TimeTable> for WeightSpec {
  fn from(table: TimeTable) -> Self {
    Self::TimeVarying(table)
  }
}

/// Why a metric has no value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum UndefinedReason {
  /// The value curve has no periods.
  EmptySeries,
  /// Too few observations for a sample statistic.
  InsufficientData,
  /// The denominator's dispersion is zero.
  ZeroVariance,
  /// No period had a negative return.
  NoDownside,
  /// The formula produced a non-finite number.
  NonFinite,
}

/// A metric that is either a number or explicitly undefined.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub enum Metric {
  Value(f64),
  Undefined(UndefinedReason),
}

impl Metric {
  pub fn value(&self) -> Option<f64> {
    match self {
      Self::Value(v) => Some(*v),
      Self::Undefined(_) => None,
    }
  }

  pub fn is_defined(&self) -> bool {
    matches!(self, Self::Value(_))
  }

  pub fn reason(&self) -> Option<UndefinedReason> {
    match self {
      Self::Value(_) => None,
      Self::Undefined(r) => Some(*r),
    }
  }
}

impl Display for Metric {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      Self::Value(v) => write!(f, "{v}"),
      Self::Undefined(_) => write!(f, "n/a"),
    }
  }
}

/// Performance snapshot of one backtest run.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MetricsRecord {
  /// Compound annual growth rate.
  pub cagr: Metric,
  /// Annualized volatility of the reconciled daily returns.
  pub volatility: Metric,
  pub sharpe: Metric,
  pub sortino: Metric,
  /// Largest peak-to-trough decline, always `<= 0`.
  pub max_drawdown: Metric,
  pub final_value: Option<f64>,
  pub total_periods: usize,
  /// First date of each rebalancing period with defined weights.
  pub rebalance_dates: Vec<NaiveDate>,
}

/// Value curve of a backtest with its derived series.
#[derive(Clone, Debug, PartialEq)]
pub struct PerformanceCurve {
  pub index: Vec<NaiveDate>,
  pub value: Array1<f64>,
  /// Returns re-derived from `value`; the first entry is 0.
  pub daily_return: Array1<f64>,
  pub drawdown: Array1<f64>,
}

impl PerformanceCurve {
  pub fn len(&self) -> usize {
    self.index.len()
  }

  pub fn is_empty(&self) -> bool {
    self.index.is_empty()
  }
}

/// Everything a backtest run produces.
#[derive(Clone, Debug, PartialEq)]
pub struct BacktestResult {
  pub metrics: MetricsRecord,
  pub performance: PerformanceCurve,
}
