//! # Portfolio Compounder
//!
//! $$
//! r^p_t = \sum_i w_{t-1,i}\, r_{t,i},\qquad V_t = V_0 \prod_{s \le t} (1 + r^p_s)
//! $$
//!
//! Weights are lagged one period so a return is never earned with same-day
//! information. The first period has no prior weight and returns 0.

use ndarray::Array1;
use ndarray::Array2;

/// Lagged-weight portfolio return per period. Products with a missing weight
/// or return contribute nothing, so a period without any defined weight
/// returns 0.
pub fn lagged_portfolio_returns(weights: &Array2<f64>, returns: &Array2<f64>) -> Array1<f64> {
  debug_assert_eq!(weights.dim(), returns.dim());
  let n = returns.nrows();
  let mut out = Array1::zeros(n);

  for t in 1..n {
    let w = weights.row(t - 1);
    let r = returns.row(t);
    out[t] = w.iter().zip(r.iter()).fold(0.0, |acc, (&wi, &ri)| {
      let c = wi * ri;
      if c.is_nan() {
        acc
      } else {
        acc + c
      }
    });
  }

  out
}

/// `initial_capital` times the running product of `1 + r`.
pub fn compound(returns: &Array1<f64>, initial_capital: f64) -> Array1<f64> {
  let mut growth = 1.0;
  let mut out = Array1::zeros(returns.len());
  for (t, &r) in returns.iter().enumerate() {
    growth *= 1.0 + r;
    out[t] = initial_capital * growth;
  }
  out
}

/// Percentage change of the value curve. The first entry, and any entry
/// whose previous value makes the ratio non-finite, is 0.
pub fn reconcile_returns(value: &Array1<f64>) -> Array1<f64> {
  let mut out = Array1::zeros(value.len());
  for t in 1..value.len() {
    let r = value[t] / value[t - 1] - 1.0;
    out[t] = if r.is_finite() { r } else { 0.0 };
  }
  out
}

/// Decline from the running peak at every period.
pub fn drawdown(value: &Array1<f64>) -> Array1<f64> {
  let mut peak = f64::NEG_INFINITY;
  let mut out = Array1::zeros(value.len());
  for (t, &v) in value.iter().enumerate() {
    peak = peak.max(v);
    let dd = v / peak - 1.0;
    out[t] = if dd.is_finite() { dd } else { 0.0 };
  }
  out
}
