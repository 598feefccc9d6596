//! # Metrics Engine
//!
//! $$
//! \text{CAGR} = \left(\frac{V_T}{V_0}\right)^{P/T} - 1,\qquad
//! \text{Sharpe} = \frac{\bar r - r_f/P}{s_r}\sqrt{P},\qquad
//! \text{Sortino} = \frac{\text{CAGR} - r_f}{s_{r^-}\sqrt{P}}
//! $$
//!
//! Every metric is a [`Metric`]: a number, or an explicit reason it has none.

use ndarray::Array1;

use crate::config::BacktestConfig;
use crate::data::TimeTable;
use super::rebalance::rebalance_dates;
use super::types::Metric;
use super::types::MetricsRecord;
use super::types::PerformanceCurve;
use super::types::UndefinedReason;

const ZERO_DISPERSION: f64 = 1e-15;

fn finite(v: f64) -> Metric {
  if v.is_finite() {
    Metric::Value(v)
  } else {
    Metric::Undefined(UndefinedReason::NonFinite)
  }
}

/// Compound annual growth rate of `value` relative to `initial_capital`.
pub fn cagr(value: &Array1<f64>, initial_capital: f64, periods_per_year: f64) -> Metric {
  if value.is_empty() {
    return Metric::Undefined(UndefinedReason::EmptySeries);
  }
  let last = value[value.len() - 1];
  let total_periods = value.len() as f64;
  finite((last / initial_capital).powf(periods_per_year / total_periods) - 1.0)
}

/// Annualized sample standard deviation.
pub fn volatility(returns: &Array1<f64>, periods_per_year: f64) -> Metric {
  if returns.len() < 2 {
    return Metric::Undefined(UndefinedReason::InsufficientData);
  }
  finite(returns.std(1.0) * periods_per_year.sqrt())
}

/// Annualized Sharpe ratio against an annual risk-free rate.
pub fn sharpe_ratio(returns: &Array1<f64>, risk_free_rate: f64, periods_per_year: f64) -> Metric {
  if returns.len() < 2 {
    return Metric::Undefined(UndefinedReason::InsufficientData);
  }

  let std = returns.std(1.0);
  if std <= ZERO_DISPERSION {
    return Metric::Undefined(UndefinedReason::ZeroVariance);
  }

  let mean = returns.sum() / returns.len() as f64;
  finite((mean - risk_free_rate / periods_per_year) / std * periods_per_year.sqrt())
}

/// Sortino ratio: excess CAGR over the annualized deviation of the negative
/// returns. Undefined with [`UndefinedReason::NoDownside`] when no return is
/// negative.
pub fn sortino_ratio(
  cagr: Metric,
  returns: &Array1<f64>,
  risk_free_rate: f64,
  periods_per_year: f64,
) -> Metric {
  let downside: Array1<f64> = returns.iter().copied().filter(|&r| r < 0.0).collect();
  match downside.len() {
    0 => return Metric::Undefined(UndefinedReason::NoDownside),
    1 => return Metric::Undefined(UndefinedReason::InsufficientData),
    _ => {}
  }

  let downside_dev = downside.std(1.0) * periods_per_year.sqrt();
  if downside_dev <= ZERO_DISPERSION {
    return Metric::Undefined(UndefinedReason::ZeroVariance);
  }

  match cagr {
    Metric::Value(g) => finite((g - risk_free_rate) / downside_dev),
    undefined => undefined,
  }
}

/// Largest decline from a running peak, from a precomputed drawdown series.
pub fn max_drawdown(drawdown: &Array1<f64>) -> Metric {
  if drawdown.is_empty() {
    return Metric::Undefined(UndefinedReason::EmptySeries);
  }
  Metric::Value(drawdown.iter().copied().fold(0.0, f64::min))
}

/// Full metrics record for one backtest run.
pub fn compute_metrics(
  curve: &PerformanceCurve,
  weights: &TimeTable,
  config: &BacktestConfig,
) -> MetricsRecord {
  let periods = config.periods_per_year;
  let rf = config.risk_free_rate;
  let growth = cagr(&curve.value, config.initial_capital, periods);

  MetricsRecord {
    cagr: growth,
    volatility: volatility(&curve.daily_return, periods),
    sharpe: sharpe_ratio(&curve.daily_return, rf, periods),
    sortino: sortino_ratio(growth, &curve.daily_return, rf, periods),
    max_drawdown: max_drawdown(&curve.drawdown),
    final_value: curve.value.iter().next_back().copied(),
    total_periods: curve.len(),
    rebalance_dates: rebalance_dates(weights, config.rebalance),
  }
}

#[cfg(test)]
mod tests {
  use ndarray::array;

  use super::*;

  #[test]
  fn cagr_of_empty_curve_is_undefined() {
    assert_eq!(
      cagr(&Array1::zeros(0), 100.0, 252.0),
      Metric::Undefined(UndefinedReason::EmptySeries)
    );
  }

  #[test]
  fn cagr_annualizes_total_growth() {
    let value = Array1::from_elem(126, 100.0);
    let mut grown = value.clone();
    grown[125] = 110.0;
    let g = cagr(&grown, 100.0, 252.0).value().unwrap();
    assert!((g - (1.1_f64.powi(2) - 1.0)).abs() < 1e-12);
  }

  #[test]
  fn sharpe_matches_formula_and_is_undefined_without_variance() {
    let r = array![0.01, -0.01, 0.02, 0.0];
    let mean = 0.005;
    let std = r.std(1.0);
    let expected = (mean - 0.02 / 252.0) / std * 252.0_f64.sqrt();
    assert!((sharpe_ratio(&r, 0.02, 252.0).value().unwrap() - expected).abs() < 1e-12);

    assert_eq!(
      sharpe_ratio(&array![0.0, 0.0, 0.0], 0.02, 252.0),
      Metric::Undefined(UndefinedReason::ZeroVariance)
    );
    assert_eq!(
      sharpe_ratio(&array![0.01], 0.0, 252.0),
      Metric::Undefined(UndefinedReason::InsufficientData)
    );
  }

  #[test]
  fn sortino_distinguishes_no_downside() {
    let up_only = array![0.0, 0.01, 0.02, 0.0];
    assert_eq!(
      sortino_ratio(Metric::Value(0.1), &up_only, 0.02, 252.0),
      Metric::Undefined(UndefinedReason::NoDownside)
    );

    let one_loss = array![0.0, -0.01, 0.02];
    assert_eq!(
      sortino_ratio(Metric::Value(0.1), &one_loss, 0.02, 252.0),
      Metric::Undefined(UndefinedReason::InsufficientData)
    );
  }

  #[test]
  fn sortino_uses_cagr_over_downside_deviation() {
    let r = array![0.0, -0.01, 0.02, -0.03];
    let downside = array![-0.01, -0.03];
    let dd = downside.std(1.0) * 252.0_f64.sqrt();
    let s = sortino_ratio(Metric::Value(0.1), &r, 0.02, 252.0)
      .value()
      .unwrap();
    assert!((s - 0.08 / dd).abs() < 1e-12);
  }

  #[test]
  fn max_drawdown_is_never_positive() {
    assert_eq!(max_drawdown(&array![0.0, 0.0]), Metric::Value(0.0));
    assert_eq!(max_drawdown(&array![0.0, -0.2, -0.05]), Metric::Value(-0.2));
  }
}
