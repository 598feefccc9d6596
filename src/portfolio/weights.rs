//! # Weight Normalizer
//!
//! $$
//! W_t = W^{\text{table}}_{\max\{s \le t\}}
//! $$
//!
//! Resolves a [`WeightSpec`] into a weight table on the return series' dates
//! and columns, so compounding never branches on the weight representation.

use std::collections::HashSet;

use ndarray::Array2;
use tracing::debug;

use crate::data::TimeTable;
use crate::error::PortfolioError;
use crate::error::Result;
use super::types::WeightSpec;

/// Align `weights` to the dates and columns of `returns`.
///
/// Static weights are replicated over every date; return columns missing
/// from the mapping hold 0. A time-varying table is carried forward onto
/// the return dates; dates before its first row stay missing and return
/// columns it does not mention hold 0.
pub fn align_weights(returns: &TimeTable, weights: &WeightSpec) -> Result<TimeTable> {
  let aligned = match weights {
    WeightSpec::Static(map) => {
      check_known(returns, map.keys().map(String::as_str))?;
      if let Some((asset, w)) = map.iter().find(|(_, w)| !w.is_finite()) {
        return Err(PortfolioError::config(format!(
          "weight for '{asset}' is not finite: {w}"
        )));
      }

      let row: Vec<f64> = returns
        .columns()
        .iter()
        .map(|c| map.get(c).copied().unwrap_or(0.0))
        .collect();
      TimeTable::constant(returns.index().to_vec(), returns.columns().to_vec(), &row)?
    }
    WeightSpec::TimeVarying(table) => {
      check_known(returns, table.columns().iter().map(String::as_str))?;

      let reindexed = table.reindex_forward(returns.index())?;
      let mut values = Array2::zeros((returns.n_rows(), returns.n_cols()));
      for (j, name) in returns.columns().iter().enumerate() {
        if let Some(col) = reindexed.column(name) {
          values.column_mut(j).assign(&col);
        }
      }
      returns.with_values(values)
    }
  };

  debug!(
    "Aligned weights to {} dates x {} assets",
    aligned.n_rows(),
    aligned.n_cols()
  );

  Ok(aligned)
}

fn check_known<'a>(returns: &TimeTable, names: impl Iterator<Item = &'a str>) -> Result<()> {
  let known: HashSet<&str> = returns.columns().iter().map(String::as_str).collect();
  let unknown: Vec<&str> = names.filter(|n| !known.contains(n)).collect();

  if unknown.is_empty() {
    Ok(())
  } else {
    Err(PortfolioError::config(format!(
      "weight keys must match returns columns, unknown: {}",
      unknown.join(", ")
    )))
  }
}
