//! # Configuration
//!
//! $$
//! \text{annualized}(x) = x \cdot P,\qquad P = \text{periods per year}
//! $$
//!
//! Injected settings for backtests and frontier sweeps.

use std::fmt::Display;
use std::str::FromStr;

use impl_new_derive::ImplNew;
use serde::Deserialize;
use serde::Serialize;

use crate::error::PortfolioError;
use crate::error::Result;

/// Recognized rebalancing frequencies.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RebalanceFrequency {
  /// Every trading day.
  Daily,
  /// ISO weeks, Monday to Sunday.
  Weekly,
  /// Calendar months.
  MonthEnd,
  /// Calendar quarters.
  #[default]
  QuarterEnd,
  /// Calendar years.
  YearEnd,
}

impl RebalanceFrequency {
  /// Approximate number of rebalancing periods in a trading year.
  pub fn periods_per_year(&self) -> usize {
    match self {
      Self::Daily => 252,
      Self::Weekly => 52,
      Self::MonthEnd => 12,
      Self::QuarterEnd => 4,
      Self::YearEnd => 1,
    }
  }
}

impl FromStr for RebalanceFrequency {
  type Err = PortfolioError;

  fn from_str(s: &str) -> Result<Self> {
    match s.trim().to_lowercase().as_str() {
      "d" | "daily" | "day" => Ok(Self::Daily),
      "w" | "weekly" | "week" => Ok(Self::Weekly),
      "me" | "m" | "monthly" | "month-end" | "monthend" => Ok(Self::MonthEnd),
      "qe" | "q" | "quarterly" | "quarter-end" | "quarterend" => Ok(Self::QuarterEnd),
      "ye" | "y" | "a" | "yearly" | "annual" | "year-end" | "yearend" => Ok(Self::YearEnd),
      other => Err(PortfolioError::config(format!(
        "unknown rebalancing frequency '{other}' (expected D, W, ME, QE or YE)"
      ))),
    }
  }
}

impl Display for RebalanceFrequency {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      Self::Daily => write!(f, "D"),
      Self::Weekly => write!(f, "W"),
      Self::MonthEnd => write!(f, "ME"),
      Self::QuarterEnd => write!(f, "QE"),
      Self::YearEnd => write!(f, "YE"),
    }
  }
}

/// Settings for a single backtest run.
#[derive(ImplNew, Clone, Debug, Serialize, Deserialize)]
pub struct BacktestConfig {
  /// Frequency used to report rebalance events.
  pub rebalance: RebalanceFrequency,
  /// Portfolio value at the first timestamp.
  pub initial_capital: f64,
  /// Annualized risk-free rate.
  pub risk_free_rate: f64,
  /// Trading periods per year used for annualization.
  pub periods_per_year: f64,
}

impl Default for BacktestConfig {
  fn default() -> Self {
    Self {
      rebalance: RebalanceFrequency::QuarterEnd,
      initial_capital: 10_000.0,
      risk_free_rate: 0.02,
      periods_per_year: 252.0,
    }
  }
}

impl BacktestConfig {
  /// Reject values that would make every metric meaningless.
  pub fn validate(&self) -> Result<()> {
    if !self.initial_capital.is_finite() || self.initial_capital <= 0.0 {
      return Err(PortfolioError::config(format!(
        "initial capital must be positive and finite, got {}",
        self.initial_capital
      )));
    }
    if !self.periods_per_year.is_finite() || self.periods_per_year <= 0.0 {
      return Err(PortfolioError::config(format!(
        "periods per year must be positive and finite, got {}",
        self.periods_per_year
      )));
    }
    if !self.risk_free_rate.is_finite() {
      return Err(PortfolioError::config("risk-free rate must be finite"));
    }
    Ok(())
  }
}

/// Iteration cap and tolerance handed to the numerical optimizers.
#[derive(ImplNew, Clone, Copy, Debug, Serialize, Deserialize)]
pub struct SolverConfig {
  pub max_iterations: u64,
  pub tolerance: f64,
}

impl Default for SolverConfig {
  fn default() -> Self {
    Self {
      max_iterations: 200,
      tolerance: 1e-10,
    }
  }
}

/// Settings for an efficient-frontier sweep.
#[derive(ImplNew, Clone, Copy, Debug, Serialize, Deserialize)]
pub struct FrontierConfig {
  /// Number of target returns on the grid.
  pub points: usize,
  /// Risk-free rate used by every Sharpe ratio of the sweep.
  pub risk_free_rate: f64,
  pub solver: SolverConfig,
}

impl Default for FrontierConfig {
  fn default() -> Self {
    Self {
      points: 50,
      risk_free_rate: 0.02,
      solver: SolverConfig::default(),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parses_pandas_aliases_and_words() {
    assert_eq!(
      "QE".parse::<RebalanceFrequency>().unwrap(),
      RebalanceFrequency::QuarterEnd
    );
    assert_eq!(
      "month-end".parse::<RebalanceFrequency>().unwrap(),
      RebalanceFrequency::MonthEnd
    );
    assert_eq!(
      " w ".parse::<RebalanceFrequency>().unwrap(),
      RebalanceFrequency::Weekly
    );
    assert_eq!(
      "A".parse::<RebalanceFrequency>().unwrap(),
      RebalanceFrequency::YearEnd
    );
  }

  #[test]
  fn unknown_frequency_is_configuration_error() {
    let err = "fortnightly".parse::<RebalanceFrequency>().unwrap_err();
    assert!(matches!(err, PortfolioError::Configuration(_)));
  }

  #[test]
  fn display_round_trips_through_parse() {
    for freq in [
      RebalanceFrequency::Daily,
      RebalanceFrequency::Weekly,
      RebalanceFrequency::MonthEnd,
      RebalanceFrequency::QuarterEnd,
      RebalanceFrequency::YearEnd,
    ] {
      assert_eq!(freq.to_string().parse::<RebalanceFrequency>().unwrap(), freq);
    }
  }

  #[test]
  fn periods_per_year_by_frequency() {
    let periods: Vec<usize> = [
      RebalanceFrequency::Daily,
      RebalanceFrequency::Weekly,
      RebalanceFrequency::MonthEnd,
      RebalanceFrequency::QuarterEnd,
      RebalanceFrequency::YearEnd,
    ]
    .iter()
    .map(RebalanceFrequency::periods_per_year)
    .collect();
    assert_eq!(periods, vec![252, 52, 12, 4, 1]);
  }

  #[test]
  fn backtest_config_rejects_non_positive_capital() {
    let cfg = BacktestConfig {
      initial_capital: 0.0,
      ..BacktestConfig::default()
    };
    assert!(cfg.validate().is_err());
    assert!(BacktestConfig::default().validate().is_ok());
  }
}
