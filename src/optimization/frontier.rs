//! # Efficient Frontier
//!
//! $$
//! \tau_k = \mu_{\min} + \frac{k}{N-1}\left(\mu_{\max} - \mu_{\min}\right),\qquad k = 0, \dots, N-1
//! $$
//!
//! Sweeps minimum-volatility portfolios over a target-return grid and solves
//! the maximum-Sharpe portfolio separately.

use ndarray::Array1;
use ndarray::Array2;
use tracing::debug;
use tracing::warn;

use crate::config::FrontierConfig;
use crate::config::SolverConfig;
use crate::error::Result;
use crate::portfolio::Metric;
use crate::portfolio::UndefinedReason;
use super::optimizers::maximize_sharpe;
use super::optimizers::minimize_volatility;
use super::optimizers::portfolio_performance;
use super::optimizers::validate_inputs;
use super::types::EfficientFrontier;
use super::types::FrontierPoint;
use super::types::OptimizedPortfolio;

const ZERO_VOLATILITY: f64 = 1e-15;

/// `points` evenly spaced targets from the lowest to the highest expected
/// return. The last target is exactly the highest return.
pub fn target_returns(mu: &Array1<f64>, points: usize) -> Vec<f64> {
  if points == 0 || mu.is_empty() {
    return Vec::new();
  }

  let lo = mu.iter().copied().fold(f64::INFINITY, f64::min);
  let hi = mu.iter().copied().fold(f64::NEG_INFINITY, f64::max);
  if points == 1 {
    return vec![lo];
  }

  let step = (hi - lo) / (points - 1) as f64;
  (0..points)
    .map(|k| if k == points - 1 { hi } else { lo + step * k as f64 })
    .collect()
}

/// Frontier sweep with an injected [`FrontierConfig`].
#[derive(Clone, Debug, Default)]
pub struct FrontierBuilder {
  config: FrontierConfig,
}

impl FrontierBuilder {
  pub fn new(config: FrontierConfig) -> Self {
    Self { config }
  }

  pub fn config(&self) -> &FrontierConfig {
    &self.config
  }

  fn solver(&self) -> &SolverConfig {
    &self.config.solver
  }

  /// Minimum-volatility portfolio at one target return.
  pub fn point(&self, mu: &Array1<f64>, cov: &Array2<f64>, target: f64) -> Result<FrontierPoint> {
    let solved = minimize_volatility(mu, cov, Some(target), self.solver())?;
    Ok(self.describe(Some(target), solved, mu, cov))
  }

  /// Global minimum-variance portfolio.
  pub fn min_volatility(&self, mu: &Array1<f64>, cov: &Array2<f64>) -> Result<FrontierPoint> {
    let solved = minimize_volatility(mu, cov, None, self.solver())?;
    Ok(self.describe(None, solved, mu, cov))
  }

  pub fn max_sharpe(&self, mu: &Array1<f64>, cov: &Array2<f64>) -> Result<FrontierPoint> {
    let solved = maximize_sharpe(mu, cov, self.config.risk_free_rate, self.solver())?;
    Ok(self.describe(None, solved, mu, cov))
  }

  /// Solve every grid target and the maximum-Sharpe portfolio.
  ///
  /// A non-converged target keeps its last iterate and is logged; the sweep
  /// carries on.
  pub fn build(&self, mu: &Array1<f64>, cov: &Array2<f64>) -> Result<EfficientFrontier> {
    validate_inputs(mu, cov)?;

    let targets = target_returns(mu, self.config.points);
    let mut points = Vec::with_capacity(targets.len());
    for target in targets {
      let point = self.point(mu, cov, target)?;
      if !point.status.is_converged() {
        warn!(
          "Frontier point at target return {:.6} did not converge after {} iterations",
          target,
          point.status.iterations()
        );
      }
      points.push(point);
    }

    let max_sharpe = self.max_sharpe(mu, cov)?;
    if !max_sharpe.status.is_converged() {
      warn!(
        "Maximum-Sharpe portfolio did not converge after {} iterations",
        max_sharpe.status.iterations()
      );
    }

    let frontier = EfficientFrontier { points, max_sharpe };
    debug!(
      "Efficient frontier with {} points, {} not converged",
      frontier.points.len(),
      frontier.non_converged()
    );

    Ok(frontier)
  }

  fn describe(
    &self,
    target_return: Option<f64>,
    solved: OptimizedPortfolio,
    mu: &Array1<f64>,
    cov: &Array2<f64>,
  ) -> FrontierPoint {
    let (expected_return, volatility) = portfolio_performance(&solved.weights, mu, cov);
    let sharpe = if volatility <= ZERO_VOLATILITY {
      Metric::Undefined(UndefinedReason::ZeroVariance)
    } else {
      Metric::Value((expected_return - self.config.risk_free_rate) / volatility)
    };

    FrontierPoint {
      target_return,
      weights: solved.weights,
      expected_return,
      volatility,
      sharpe,
      status: solved.status,
    }
  }
}

/// Frontier with `points` targets and default solver settings.
pub fn efficient_frontier(
  mu: &Array1<f64>,
  cov: &Array2<f64>,
  points: usize,
  risk_free: f64,
) -> Result<EfficientFrontier> {
  FrontierBuilder::new(FrontierConfig {
    points,
    risk_free_rate: risk_free,
    ..FrontierConfig::default()
  })
  .build(mu, cov)
}

#[cfg(test)]
mod tests {
  use ndarray::array;
  use tracing_test::traced_test;

  use super::*;

  fn three_assets() -> (Array1<f64>, Array2<f64>) {
    (
      array![0.08, 0.12, 0.18],
      array![
        [0.0225, 0.006, 0.003],
        [0.006, 0.04, 0.012],
        [0.003, 0.012, 0.0625]
      ],
    )
  }

  #[test]
  fn grid_spans_min_to_max() {
    let mu = array![0.3, 0.1, 0.2];
    let grid = target_returns(&mu, 5);
    assert_eq!(grid.len(), 5);
    assert_eq!(grid[0], 0.1);
    assert_eq!(grid[4], 0.3);
    assert!((grid[2] - 0.2).abs() < 1e-15);

    assert_eq!(target_returns(&mu, 1), vec![0.1]);
    assert!(target_returns(&mu, 0).is_empty());
  }

  #[test]
  fn three_point_frontier_meets_targets() {
    let (mu, cov) = three_assets();
    let frontier = efficient_frontier(&mu, &cov, 3, 0.02).unwrap();

    assert_eq!(frontier.points.len(), 3);
    for point in &frontier.points {
      let target = point.target_return.unwrap();
      assert!(point.status.is_converged());
      assert!((point.expected_return - target).abs() < 1e-6);
      assert!((point.weights.sum() - 1.0).abs() < 1e-9);
      assert!(point.weights.iter().all(|&w| (0.0..=1.0).contains(&w)));
    }
    assert!(frontier
      .points
      .windows(2)
      .all(|w| w[0].target_return < w[1].target_return));
  }

  #[test]
  fn max_sharpe_dominates_the_grid() {
    let (mu, cov) = three_assets();
    let frontier = FrontierBuilder::new(FrontierConfig {
      points: 25,
      ..FrontierConfig::default()
    })
    .build(&mu, &cov)
    .unwrap();

    let best = frontier.best_on_grid().unwrap().sharpe.value().unwrap();
    let tangency = frontier.max_sharpe.sharpe.value().unwrap();
    assert!(tangency >= best - 1e-6);
    assert_eq!(frontier.max_sharpe.target_return, None);
  }

  #[test]
  fn global_minimum_sits_below_every_grid_point() {
    let (mu, cov) = three_assets();
    let builder = FrontierBuilder::default();
    let gmv = builder.min_volatility(&mu, &cov).unwrap();
    let frontier = builder.build(&mu, &cov).unwrap();

    assert!(frontier
      .points
      .iter()
      .all(|p| p.volatility >= gmv.volatility - 1e-9));
  }

  #[test]
  #[traced_test]
  fn iteration_cap_keeps_every_point() {
    let (mu, cov) = three_assets();
    let frontier = FrontierBuilder::new(FrontierConfig {
      points: 5,
      solver: SolverConfig {
        max_iterations: 1,
        ..SolverConfig::default()
      },
      ..FrontierConfig::default()
    })
    .build(&mu, &cov)
    .unwrap();

    assert_eq!(frontier.points.len(), 5);
    assert!(frontier.non_converged() >= 1);
    for point in &frontier.points {
      assert!((point.weights.sum() - 1.0).abs() < 1e-9);
      assert!(point.weights.iter().all(|&w| w >= 0.0));
      assert!(point.status.iterations() <= 1);
    }
    assert!(logs_contain("did not converge"));
  }

  #[test]
  fn mismatched_covariance_is_rejected() {
    let mu = array![0.1, 0.2];
    assert!(efficient_frontier(&mu, &Array2::eye(3), 5, 0.0).is_err());
  }
}
