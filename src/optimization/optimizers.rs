//! # Mean-Variance Optimizers
//!
//! $$
//! \min_{\mathbf{w} \in \Delta} \mathbf{w}^\top \Sigma \mathbf{w}
//! \quad \text{s.t.}\quad \mu^\top \mathbf{w} = \tau,
//! \qquad
//! \max_{\mathbf{w} \in \Delta} \frac{\mu^\top \mathbf{w} - r_f}{\sqrt{\mathbf{w}^\top \Sigma \mathbf{w}}}
//! $$
//!
//! Long-only allocations on the simplex $\Delta$.

use argmin::core::CostFunction;
use argmin::core::Executor;
use argmin::core::Gradient;
use argmin::core::State;
use argmin::core::TerminationReason;
use argmin::solver::linesearch::MoreThuenteLineSearch;
use argmin::solver::quasinewton::LBFGS;
use nalgebra::DMatrix;
use nalgebra::DVector;
use ndarray::Array1;
use ndarray::Array2;
use tracing::debug;
use tracing::warn;

use crate::config::SolverConfig;
use crate::error::PortfolioError;
use crate::error::Result;
use super::qp::solve_active_set;
use super::types::OptimizedPortfolio;
use super::types::SolverStatus;

const ZERO_VOLATILITY: f64 = 1e-15;

/// Expected return and volatility of `weights`.
pub fn portfolio_performance(
  weights: &Array1<f64>,
  mu: &Array1<f64>,
  cov: &Array2<f64>,
) -> (f64, f64) {
  let expected_return = weights.dot(mu);
  let variance = weights.dot(&cov.dot(weights));
  (expected_return, variance.max(0.0).sqrt())
}

pub(crate) fn validate_inputs(mu: &Array1<f64>, cov: &Array2<f64>) -> Result<()> {
  if mu.is_empty() {
    return Err(PortfolioError::config("expected returns are empty"));
  }
  if cov.nrows() != mu.len() || cov.ncols() != mu.len() {
    return Err(PortfolioError::config(format!(
      "covariance shape {:?} does not match {} assets",
      cov.shape(),
      mu.len()
    )));
  }
  if mu.iter().chain(cov.iter()).any(|v| !v.is_finite()) {
    return Err(PortfolioError::config(
      "expected returns and covariance must be finite",
    ));
  }
  Ok(())
}

fn equal_weights(n: usize) -> Array1<f64> {
  Array1::from_elem(n, 1.0 / n as f64)
}

/// Long-only minimum-volatility portfolio, optionally at a fixed expected
/// return. `None` gives the global minimum-variance portfolio.
///
/// A target outside `[min μ, max μ]` has no feasible portfolio; equal
/// weights come back tagged [`SolverStatus::NotConverged`].
pub fn minimize_volatility(
  mu: &Array1<f64>,
  cov: &Array2<f64>,
  target: Option<f64>,
  solver: &SolverConfig,
) -> Result<OptimizedPortfolio> {
  validate_inputs(mu, cov)?;

  let n = mu.len();
  let lo = mu.iter().copied().fold(f64::INFINITY, f64::min);
  let hi = mu.iter().copied().fold(f64::NEG_INFINITY, f64::max);
  let eps = 1e-12 * (1.0 + lo.abs().max(hi.abs()));

  let ones = DMatrix::from_element(1, n, 1.0);
  let mut pinned = vec![false; n];

  let (x0, equality) = match target {
    None => (DVector::from_element(n, 1.0 / n as f64), ones),
    Some(t) if !t.is_finite() || t < lo - eps || t > hi + eps => {
      warn!(
        "Target return {} is outside the attainable range [{}, {}]",
        t, lo, hi
      );
      return Ok(OptimizedPortfolio {
        weights: equal_weights(n),
        status: SolverStatus::NotConverged { iterations: 0 },
      });
    }
    Some(t) if hi - t <= eps || t - lo <= eps => {
      // Only the assets attaining the extreme return may hold weight, which
      // makes the return constraint implied by the budget.
      let extreme = if hi - t <= eps { hi } else { lo };
      for (i, p) in pinned.iter_mut().enumerate() {
        *p = (mu[i] - extreme).abs() > eps;
      }
      let tied = pinned.iter().filter(|p| !**p).count();
      let x0 = DVector::from_fn(n, |i, _| if pinned[i] { 0.0 } else { 1.0 / tied as f64 });
      (x0, ones)
    }
    Some(t) => {
      // Move from equal weights towards the best (or worst) asset until
      // the target return is met.
      let base = 1.0 / n as f64;
      let base_return = mu.sum() * base;
      let k = if t >= base_return {
        argmax(mu)
      } else {
        argmin(mu)
      };
      let alpha = (t - base_return) / (mu[k] - base_return);
      let x0 = DVector::from_fn(n, |i, _| {
        (1.0 - alpha) * base + if i == k { alpha } else { 0.0 }
      });
      let equality = DMatrix::from_fn(2, n, |r, c| if r == 0 { 1.0 } else { mu[c] });
      (x0, equality)
    }
  };

  let hessian = DMatrix::from_fn(n, n, |i, j| cov[[i, j]] + cov[[j, i]]);
  let solution = solve_active_set(
    &hessian,
    &equality,
    x0,
    &pinned,
    solver.max_iterations,
    solver.tolerance,
  );

  debug!(
    "Minimum-volatility solve (target {:?}) finished after {} iterations, converged: {}",
    target, solution.iterations, solution.converged
  );

  let weights = solution.x.iter().map(|&w| w.max(0.0)).collect();
  let status = if solution.converged {
    SolverStatus::Converged {
      iterations: solution.iterations,
    }
  } else {
    SolverStatus::NotConverged {
      iterations: solution.iterations,
    }
  };

  Ok(OptimizedPortfolio { weights, status })
}

fn argmax(v: &Array1<f64>) -> usize {
  v.iter()
    .enumerate()
    .max_by(|a, b| a.1.total_cmp(b.1))
    .map_or(0, |(i, _)| i)
}

fn argmin(v: &Array1<f64>) -> usize {
  v.iter()
    .enumerate()
    .min_by(|a, b| a.1.total_cmp(b.1))
    .map_or(0, |(i, _)| i)
}

fn softmax(x: &[f64]) -> Array1<f64> {
  let max_x = x.iter().copied().fold(f64::NEG_INFINITY, f64::max);
  let exps: Array1<f64> = x.iter().map(|&v| (v - max_x).exp()).collect();
  let sum = exps.sum();
  exps / sum
}

/// Negative Sharpe ratio over softmax logits, so every iterate is a
/// long-only fully invested portfolio.
#[derive(Clone)]
struct NegativeSharpe {
  mu: Array1<f64>,
  cov: Array2<f64>,
  risk_free: f64,
}

impl NegativeSharpe {
  /// `(Σw, σ, μᵀw - r_f)`
  fn moments(
    &self,
    w: &Array1<f64>,
  ) -> std::result::Result<(Array1<f64>, f64, f64), argmin::core::Error> {
    let cov_w = self.cov.dot(w);
    let sigma = w.dot(&cov_w).max(0.0).sqrt();
    if sigma <= ZERO_VOLATILITY {
      return Err(argmin::core::Error::msg("portfolio volatility is zero"));
    }
    Ok((cov_w, sigma, w.dot(&self.mu) - self.risk_free))
  }
}

impl CostFunction for NegativeSharpe {
  type Param = Vec<f64>;
  type Output = f64;

  fn cost(&self, x: &Self::Param) -> std::result::Result<Self::Output, argmin::core::Error> {
    let w = softmax(x);
    let (_, sigma, excess) = self.moments(&w)?;
    Ok(-excess / sigma)
  }
}

impl Gradient for NegativeSharpe {
  type Param = Vec<f64>;
  type Gradient = Vec<f64>;

  fn gradient(&self, x: &Self::Param) -> std::result::Result<Self::Gradient, argmin::core::Error> {
    let w = softmax(x);
    let (cov_w, sigma, excess) = self.moments(&w)?;

    // d/dw of -(excess / sigma), then through the softmax Jacobian.
    let grad_w = -(&self.mu * sigma - &cov_w * (excess / sigma)) / (sigma * sigma);
    let centered = grad_w.dot(&w);
    Ok(w.iter().zip(grad_w.iter()).map(|(&wi, &gi)| wi * (gi - centered)).collect())
  }
}

/// Long-only maximum-Sharpe portfolio.
///
/// L-BFGS over softmax logits from equal weights. If the solver stops with
/// an error the equal-weight start is returned as non-converged.
pub fn maximize_sharpe(
  mu: &Array1<f64>,
  cov: &Array2<f64>,
  risk_free: f64,
  solver: &SolverConfig,
) -> Result<OptimizedPortfolio> {
  validate_inputs(mu, cov)?;
  let n = mu.len();

  let problem = NegativeSharpe {
    mu: mu.clone(),
    cov: cov.clone(),
    risk_free,
  };

  match run_lbfgs(problem, n, solver) {
    Ok((logits, iterations, converged)) => {
      debug!(
        "Maximum-Sharpe solve finished after {} iterations, converged: {}",
        iterations, converged
      );
      let weights = softmax(&logits);
      let status = if converged {
        SolverStatus::Converged { iterations }
      } else {
        SolverStatus::NotConverged { iterations }
      };
      Ok(OptimizedPortfolio { weights, status })
    }
    Err(err) => {
      warn!("Maximum-Sharpe solve failed: {}", err);
      Ok(OptimizedPortfolio {
        weights: equal_weights(n),
        status: SolverStatus::NotConverged { iterations: 0 },
      })
    }
  }
}

fn run_lbfgs(
  problem: NegativeSharpe,
  n: usize,
  solver: &SolverConfig,
) -> std::result::Result<(Vec<f64>, u64, bool), argmin::core::Error> {
  let x0 = vec![0.0; n];
  let linesearch = MoreThuenteLineSearch::new().with_c(1e-4, 0.9)?;
  let lbfgs = LBFGS::new(linesearch, 7).with_tolerance_grad(solver.tolerance.max(1e-8))?;

  let res = Executor::new(problem, lbfgs)
    .configure(|state| state.param(x0.clone()).max_iters(solver.max_iterations))
    .run()?;

  let state = res.state();
  let converged = matches!(
    state.get_termination_reason(),
    Some(TerminationReason::SolverConverged) | Some(TerminationReason::TargetCostReached)
  );
  let logits = state.get_best_param().cloned().unwrap_or(x0);

  Ok((logits, state.get_iter(), converged))
}
