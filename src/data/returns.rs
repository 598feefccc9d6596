//! # Returns
//!
//! $$
//! \hat\mu_i = P\,\bar r_i,\qquad \hat\Sigma = P\,\frac{1}{T-1}\sum_t (r_t-\bar r)(r_t-\bar r)^\top
//! $$
//!
//! Price-to-return conversion and the return statistics fed to the optimizers.

use ndarray::Array1;
use ndarray::Array2;
use ndarray::s;
use ndarray_stats::CorrelationExt;

use crate::error::PortfolioError;
use crate::error::Result;
use super::frame::TimeTable;

fn changes(prices: &TimeTable, f: impl Fn(f64, f64) -> f64) -> TimeTable {
  let p = prices.values();
  let mut out = Array2::from_elem(p.dim(), f64::NAN);
  for i in 1..p.nrows() {
    for j in 0..p.ncols() {
      out[[i, j]] = f(p[[i - 1, j]], p[[i, j]]);
    }
  }
  prices.with_values(out).drop_incomplete_rows()
}

/// Period-over-period percentage change. The first row and any row with a
/// missing value are dropped.
pub fn simple_returns(prices: &TimeTable) -> TimeTable {
  changes(prices, |prev, cur| cur / prev - 1.0)
}

/// Log returns. Non-positive prices give missing values, which drop their row.
pub fn log_returns(prices: &TimeTable) -> TimeTable {
  changes(prices, |prev, cur| {
    if prev > 0.0 && cur > 0.0 {
      (cur / prev).ln()
    } else {
      f64::NAN
    }
  })
}

/// Rolling annualized volatility: sample standard deviation over `window`
/// rows times `sqrt(periods_per_year)`. The first `window - 1` rows, and any
/// window containing a missing value, are missing.
pub fn rolling_volatility(
  returns: &TimeTable,
  window: usize,
  periods_per_year: f64,
) -> Result<TimeTable> {
  if window < 2 {
    return Err(PortfolioError::config(format!(
      "rolling window must be at least 2, got {window}"
    )));
  }

  let r = returns.values();
  let scale = periods_per_year.sqrt();
  let mut out = Array2::from_elem(r.dim(), f64::NAN);

  for i in (window - 1)..r.nrows() {
    for j in 0..r.ncols() {
      let win = r.slice(s![i + 1 - window..=i, j]);
      if win.iter().all(|v| !v.is_nan()) {
        out[[i, j]] = win.std(1.0) * scale;
      }
    }
  }

  Ok(returns.with_values(out))
}

/// Annualized mean return per column, ignoring missing values.
pub fn expected_returns(returns: &TimeTable, periods_per_year: f64) -> Result<Array1<f64>> {
  let r = returns.values();
  let mut mu = Array1::zeros(r.ncols());

  for (j, col) in r.columns().into_iter().enumerate() {
    let (sum, n) = col
      .iter()
      .filter(|v| !v.is_nan())
      .fold((0.0, 0usize), |(s, n), &v| (s + v, n + 1));
    if n == 0 {
      return Err(PortfolioError::config(format!(
        "column '{}' has no observations",
        returns.columns()[j]
      )));
    }
    mu[j] = sum / n as f64 * periods_per_year;
  }

  Ok(mu)
}

/// Annualized sample covariance (ddof = 1) over the rows without missing values.
pub fn covariance_matrix(returns: &TimeTable, periods_per_year: f64) -> Result<Array2<f64>> {
  let complete = returns.drop_incomplete_rows();
  if complete.n_rows() < 2 {
    return Err(PortfolioError::config(
      "covariance needs at least two complete observations",
    ));
  }

  let cov = complete
    .values()
    .t()
    .cov(1.0)
    .map_err(|e| PortfolioError::config(e.to_string()))?;

  Ok(cov * periods_per_year)
}

/// Pearson correlation over the rows without missing values.
pub fn correlation_matrix(returns: &TimeTable) -> Result<Array2<f64>> {
  let complete = returns.drop_incomplete_rows();
  if complete.n_rows() < 2 {
    return Err(PortfolioError::config(
      "correlation needs at least two complete observations",
    ));
  }

  complete
    .values()
    .t()
    .pearson_correlation()
    .map_err(|e| PortfolioError::config(e.to_string()))
}
