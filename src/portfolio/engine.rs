//! # Backtest Engine
//!
//! $$
//! (R, W) \mapsto \big(V,\ \text{metrics}(V)\big)
//! $$
//!
//! Orchestrates weight alignment, compounding and metrics for one run.

use tracing::debug;

use crate::config::BacktestConfig;
use crate::data::TimeTable;
use crate::error::Result;
use super::compounder::compound;
use super::compounder::drawdown;
use super::compounder::lagged_portfolio_returns;
use super::compounder::reconcile_returns;
use super::metrics::compute_metrics;
use super::types::BacktestResult;
use super::types::PerformanceCurve;
use super::types::WeightSpec;
use super::weights::align_weights;

/// Backtest runner holding the injected configuration.
#[derive(Clone, Debug, Default)]
pub struct Backtester {
  config: BacktestConfig,
}

impl Backtester {
  pub fn new(config: BacktestConfig) -> Self {
    Self { config }
  }

  pub fn config(&self) -> &BacktestConfig {
    &self.config
  }

  /// Run a backtest of `weights` over `returns`.
  ///
  /// Missing returns are forward then backward filled first. The result is
  /// a pure function of the inputs and the configuration.
  pub fn run(&self, returns: &TimeTable, weights: &WeightSpec) -> Result<BacktestResult> {
    self.config.validate()?;

    let missing = returns.missing_count();
    let returns = if missing > 0 {
      debug!("Filling {} missing return cells", missing);
      returns.fill_missing()
    } else {
      returns.clone()
    };

    let aligned = align_weights(&returns, weights)?;
    let raw = lagged_portfolio_returns(aligned.values(), returns.values());
    let value = compound(&raw, self.config.initial_capital);
    // Metrics read the returns implied by the value curve, not `raw`.
    let daily_return = reconcile_returns(&value);
    let drawdown = drawdown(&value);

    let performance = PerformanceCurve {
      index: returns.index().to_vec(),
      value,
      daily_return,
      drawdown,
    };
    let metrics = compute_metrics(&performance, &aligned, &self.config);

    debug!(
      "Backtest over {} periods: final value {:?}, {} rebalance events",
      metrics.total_periods,
      metrics.final_value,
      metrics.rebalance_dates.len()
    );

    Ok(BacktestResult {
      metrics,
      performance,
    })
  }
}

/// Run a backtest with an explicit configuration.
pub fn backtest(
  returns: &TimeTable,
  weights: &WeightSpec,
  config: &BacktestConfig,
) -> Result<BacktestResult> {
  Backtester::new(config.clone()).run(returns, weights)
}

#[cfg(test)]
mod tests {
  use chrono::NaiveDate;
  use ndarray::Array2;
  use ndarray::array;

  use crate::config::RebalanceFrequency;
  use crate::error::PortfolioError;
  use crate::portfolio::types::Metric;
  use crate::portfolio::types::UndefinedReason;
  use super::*;

  fn dates(n: usize) -> Vec<NaiveDate> {
    let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
    (0..n)
      .map(|i| start + chrono::Days::new(i as u64))
      .collect()
  }

  fn table(values: Array2<f64>) -> TimeTable {
    TimeTable::new(
      dates(values.nrows()),
      vec!["A".into(), "B".into()],
      values,
    )
    .unwrap()
  }

  #[test]
  fn constant_prices_give_flat_curve() {
    let returns = table(Array2::zeros((30, 2)));
    let result = Backtester::default()
      .run(&returns, &WeightSpec::fixed([("A", 0.5), ("B", 0.5)]))
      .unwrap();

    assert!(result.performance.value.iter().all(|&v| v == 10_000.0));
    assert_eq!(result.metrics.cagr, Metric::Value(0.0));
    assert_eq!(result.metrics.volatility, Metric::Value(0.0));
    assert_eq!(
      result.metrics.sharpe,
      Metric::Undefined(UndefinedReason::ZeroVariance)
    );
    assert_eq!(
      result.metrics.sortino,
      Metric::Undefined(UndefinedReason::NoDownside)
    );
    assert_eq!(result.metrics.max_drawdown, Metric::Value(0.0));
  }

  #[test]
  fn missing_returns_are_filled_before_compounding() {
    let nan = f64::NAN;
    let returns = table(array![[nan, 0.0], [0.1, 0.0], [nan, 0.0]]);
    let result = backtest(
      &returns,
      &WeightSpec::fixed([("A", 1.0)]),
      &BacktestConfig::default(),
    )
    .unwrap();

    let v = &result.performance.value;
    assert!((v[1] - 11_000.0).abs() < 1e-9);
    assert!((v[2] - 12_100.0).abs() < 1e-9);
  }

  #[test]
  fn empty_returns_leave_metrics_undefined() {
    let returns = table(Array2::zeros((0, 2)));
    let result = Backtester::default()
      .run(&returns, &WeightSpec::fixed([("A", 1.0)]))
      .unwrap();

    assert!(result.performance.is_empty());
    assert_eq!(
      result.metrics.cagr,
      Metric::Undefined(UndefinedReason::EmptySeries)
    );
    assert_eq!(result.metrics.final_value, None);
  }

  #[test]
  fn invalid_configuration_surfaces_immediately() {
    let returns = table(Array2::zeros((3, 2)));
    let config = BacktestConfig {
      periods_per_year: 0.0,
      ..BacktestConfig::default()
    };
    let err = backtest(&returns, &WeightSpec::fixed([("A", 1.0)]), &config).unwrap_err();
    assert!(matches!(err, PortfolioError::Configuration(_)));
  }

  #[test]
  fn rebalance_events_follow_configured_frequency() {
    let returns = table(Array2::zeros((40, 2)));
    let config = BacktestConfig {
      rebalance: RebalanceFrequency::MonthEnd,
      ..BacktestConfig::default()
    };
    let result = backtest(&returns, &WeightSpec::fixed([("A", 1.0)]), &config).unwrap();

    // 2024-01-01 .. 2024-02-09
    assert_eq!(
      result.metrics.rebalance_dates,
      vec![
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        NaiveDate::from_ymd_opt(2024, 2, 1).unwrap()
      ]
    );
  }
}
