//! # Optimization Types
//!
//! $$
//! \mathbf{w}^\*(\tau) = \arg\min_{\mathbf{w} \in \Delta,\ \mu^\top \mathbf{w} = \tau} \mathbf{w}^\top \Sigma \mathbf{w}
//! $$
//!
//! Solver outcomes and frontier points.

use ndarray::Array1;
use serde::Serialize;

use crate::portfolio::Metric;

/// Whether the solver met its tolerance. A non-converged result still
/// carries the last iterate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum SolverStatus {
  Converged { iterations: u64 },
  NotConverged { iterations: u64 },
}

impl SolverStatus {
  pub fn is_converged(&self) -> bool {
    matches!(self, Self::Converged { .. })
  }

  pub fn iterations(&self) -> u64 {
    match self {
      Self::Converged { iterations } | Self::NotConverged { iterations } => *iterations,
    }
  }
}

/// Allocation returned by an optimizer.
#[derive(Clone, Debug, PartialEq)]
pub struct OptimizedPortfolio {
  pub weights: Array1<f64>,
  pub status: SolverStatus,
}

/// One point of the efficient frontier.
#[derive(Clone, Debug, PartialEq)]
pub struct FrontierPoint {
  /// Target return requested from the solver; `None` for unconstrained
  /// solutions such as the maximum-Sharpe portfolio.
  pub target_return: Option<f64>,
  pub weights: Array1<f64>,
  pub expected_return: f64,
  pub volatility: f64,
  pub sharpe: Metric,
  pub status: SolverStatus,
}

/// Frontier grid sorted by ascending target return, plus the separately
/// solved maximum-Sharpe portfolio.
#[derive(Clone, Debug, PartialEq)]
pub struct EfficientFrontier {
  pub points: Vec<FrontierPoint>,
  pub max_sharpe: FrontierPoint,
}

impl EfficientFrontier {
  /// Grid point with the highest defined Sharpe ratio.
  pub fn best_on_grid(&self) -> Option<&FrontierPoint> {
    self
      .points
      .iter()
      .filter_map(|p| p.sharpe.value().map(|s| (p, s)))
      .max_by(|a, b| a.1.total_cmp(&b.1))
      .map(|(p, _)| p)
  }

  /// Number of grid points that did not meet the solver tolerance.
  pub fn non_converged(&self) -> usize {
    self.points.iter().filter(|p| !p.status.is_converged()).count()
  }
}
