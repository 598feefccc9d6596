//! # Active-Set Quadratic Program
//!
//! $$
//! \min_{\mathbf{x}} \tfrac12 \mathbf{x}^\top H \mathbf{x}
//! \quad \text{s.t.}\quad A\mathbf{x} = \mathbf{b},\ \mathbf{x} \ge 0
//! $$
//!
//! Primal active-set method started from a feasible point. Each iteration
//! solves the equality-constrained subproblem on the free variables:
//!
//! $$
//! \begin{bmatrix} H_{FF} & A_F^\top \\ A_F & 0 \end{bmatrix}
//! \begin{bmatrix} \mathbf{p}_F \\ \boldsymbol\lambda \end{bmatrix}
//! =
//! \begin{bmatrix} -\mathbf{g}_F \\ \mathbf{0} \end{bmatrix}
//! $$

use nalgebra::DMatrix;
use nalgebra::DVector;

/// Result of an active-set solve. `x` is the last iterate either way.
#[derive(Clone, Debug)]
pub struct ActiveSetSolution {
  pub x: DVector<f64>,
  pub iterations: u64,
  pub converged: bool,
}

/// Solve the long-only QP from the feasible start `x0`.
///
/// `equality` holds the rows of `A`; every step keeps `A p = 0`, so `b` is
/// whatever `x0` satisfies. Variables flagged in `pinned` stay at zero.
pub fn solve_active_set(
  hessian: &DMatrix<f64>,
  equality: &DMatrix<f64>,
  x0: DVector<f64>,
  pinned: &[bool],
  max_iterations: u64,
  tolerance: f64,
) -> ActiveSetSolution {
  let n = x0.len();
  let mut x = x0;
  let mut active: Vec<bool> = (0..n).map(|i| pinned[i] || x[i] <= 0.0).collect();
  for i in (0..n).filter(|&i| active[i]) {
    x[i] = 0.0;
  }

  let mut iterations = 0;
  let mut converged = false;

  while iterations < max_iterations {
    iterations += 1;

    let free: Vec<usize> = (0..n).filter(|&i| !active[i]).collect();
    let gradient = hessian * &x;
    let Some((step, lambda)) = kkt_step(hessian, equality, &free, &gradient) else {
      break;
    };

    let step_size = step.iter().fold(0.0_f64, |m, v| m.max(v.abs()));
    if step_size <= tolerance {
      // Stationary on this face. A negative bound multiplier means the
      // objective still decreases by releasing that variable.
      let correction = equality.transpose() * &lambda;
      let release = (0..n)
        .filter(|&i| active[i] && !pinned[i])
        .map(|i| (i, gradient[i] + correction[i]))
        .min_by(|a, b| a.1.total_cmp(&b.1));

      match release {
        Some((i, multiplier)) if multiplier < -tolerance => active[i] = false,
        _ => {
          converged = true;
          break;
        }
      }
      continue;
    }

    let mut alpha = 1.0;
    let mut blocking = None;
    for (k, &i) in free.iter().enumerate() {
      if step[k] < 0.0 {
        let ratio = -x[i] / step[k];
        if ratio < alpha {
          alpha = ratio;
          blocking = Some(i);
        }
      }
    }

    for (k, &i) in free.iter().enumerate() {
      x[i] += alpha * step[k];
    }
    if let Some(i) = blocking {
      x[i] = 0.0;
      active[i] = true;
    }
  }

  ActiveSetSolution {
    x,
    iterations,
    converged,
  }
}

fn kkt_step(
  hessian: &DMatrix<f64>,
  equality: &DMatrix<f64>,
  free: &[usize],
  gradient: &DVector<f64>,
) -> Option<(DVector<f64>, DVector<f64>)> {
  let nf = free.len();
  let m = equality.nrows();
  let dim = nf + m;

  let mut kkt = DMatrix::zeros(dim, dim);
  let mut rhs = DVector::zeros(dim);
  for (r, &i) in free.iter().enumerate() {
    for (c, &j) in free.iter().enumerate() {
      kkt[(r, c)] = hessian[(i, j)];
    }
    for k in 0..m {
      kkt[(r, nf + k)] = equality[(k, i)];
      kkt[(nf + k, r)] = equality[(k, i)];
    }
    rhs[r] = -gradient[i];
  }

  let solution = solve_linear(kkt, &rhs)?;
  Some((
    solution.rows(0, nf).into_owned(),
    solution.rows(nf, m).into_owned(),
  ))
}

/// LU first; least-squares SVD when the system is singular, which happens
/// when the free assets make the equality rows linearly dependent.
fn solve_linear(kkt: DMatrix<f64>, rhs: &DVector<f64>) -> Option<DVector<f64>> {
  if let Some(solution) = kkt.clone().lu().solve(rhs) {
    let residual = (&kkt * &solution - rhs).norm();
    if solution.iter().all(|v| v.is_finite()) && residual <= 1e-9 * (1.0 + rhs.norm()) {
      return Some(solution);
    }
  }

  kkt.svd(true, true).solve(rhs, 1e-12).ok()
}
