//! # Time Table
//!
//! $$
//! X \in \mathbb{R}^{T \times N},\qquad t_0 < t_1 < \dots < t_{T-1}
//! $$
//!
//! Rows are dates, columns are assets. Missing observations are `NaN`.

use std::collections::HashSet;

use chrono::NaiveDate;
use ndarray::Array2;
use ndarray::ArrayView1;
use ndarray::Axis;

use crate::error::PortfolioError;
use crate::error::Result;

/// Date-indexed table of per-asset values (prices, returns or weights).
#[derive(Clone, Debug, PartialEq)]
pub struct TimeTable {
  index: Vec<NaiveDate>,
  columns: Vec<String>,
  values: Array2<f64>,
}

impl TimeTable {
  /// Build a table, checking that dates strictly increase, column names are
  /// unique and `values` is `index.len() x columns.len()`.
  pub fn new(index: Vec<NaiveDate>, columns: Vec<String>, values: Array2<f64>) -> Result<Self> {
    if values.nrows() != index.len() || values.ncols() != columns.len() {
      return Err(PortfolioError::config(format!(
        "table shape {:?} does not match {} dates x {} columns",
        values.shape(),
        index.len(),
        columns.len()
      )));
    }

    if let Some(w) = index.windows(2).find(|w| w[1] <= w[0]) {
      return Err(PortfolioError::config(format!(
        "dates must be strictly increasing, found {} followed by {}",
        w[0], w[1]
      )));
    }

    let mut seen = HashSet::with_capacity(columns.len());
    for c in &columns {
      if !seen.insert(c.as_str()) {
        return Err(PortfolioError::config(format!("duplicate column '{c}'")));
      }
    }

    Ok(Self {
      index,
      columns,
      values,
    })
  }

  /// Table with every value of column `j` equal to `row[j]`.
  pub fn constant(index: Vec<NaiveDate>, columns: Vec<String>, row: &[f64]) -> Result<Self> {
    if row.len() != columns.len() {
      return Err(PortfolioError::config(format!(
        "row has {} values for {} columns",
        row.len(),
        columns.len()
      )));
    }
    let values = Array2::from_shape_fn((index.len(), columns.len()), |(_, j)| row[j]);
    Self::new(index, columns, values)
  }

  pub fn index(&self) -> &[NaiveDate] {
    &self.index
  }

  pub fn columns(&self) -> &[String] {
    &self.columns
  }

  pub fn values(&self) -> &Array2<f64> {
    &self.values
  }

  pub fn n_rows(&self) -> usize {
    self.index.len()
  }

  pub fn n_cols(&self) -> usize {
    self.columns.len()
  }

  pub fn is_empty(&self) -> bool {
    self.index.is_empty()
  }

  pub fn column_position(&self, name: &str) -> Option<usize> {
    self.columns.iter().position(|c| c == name)
  }

  pub fn column(&self, name: &str) -> Option<ArrayView1<'_, f64>> {
    self
      .column_position(name)
      .map(|j| self.values.index_axis(Axis(1), j))
  }

  /// Number of missing cells.
  pub fn missing_count(&self) -> usize {
    self.values.iter().filter(|v| v.is_nan()).count()
  }

  /// Carry the last observed value of each column forward into gaps.
  pub fn forward_fill(&self) -> Self {
    let mut values = self.values.clone();
    for mut col in values.columns_mut() {
      let mut last = f64::NAN;
      for v in col.iter_mut() {
        if v.is_nan() {
          *v = last;
        } else {
          last = *v;
        }
      }
    }
    self.with_values(values)
  }

  /// Carry the next observed value of each column backward into gaps.
  pub fn backward_fill(&self) -> Self {
    let mut values = self.values.clone();
    for mut col in values.columns_mut() {
      let mut next = f64::NAN;
      for v in col.iter_mut().rev() {
        if v.is_nan() {
          *v = next;
        } else {
          next = *v;
        }
      }
    }
    self.with_values(values)
  }

  /// Forward fill, then backward fill what is still missing at the start.
  pub fn fill_missing(&self) -> Self {
    self.forward_fill().backward_fill()
  }

  /// Reindex onto `index`: each target date takes the last row dated on or
  /// before it. Dates preceding the first row are missing.
  pub fn reindex_forward(&self, index: &[NaiveDate]) -> Result<Self> {
    let mut values = Array2::from_elem((index.len(), self.n_cols()), f64::NAN);
    let mut src = 0usize;
    let mut current: Option<usize> = None;

    for (i, date) in index.iter().enumerate() {
      while src < self.index.len() && self.index[src] <= *date {
        current = Some(src);
        src += 1;
      }
      if let Some(k) = current {
        values.row_mut(i).assign(&self.values.row(k));
      }
    }

    Self::new(index.to_vec(), self.columns.clone(), values)
  }

  /// Drop every row that contains at least one missing value.
  pub fn drop_incomplete_rows(&self) -> Self {
    let keep: Vec<usize> = (0..self.n_rows())
      .filter(|&i| self.values.row(i).iter().all(|v| !v.is_nan()))
      .collect();
    self.select_rows(&keep)
  }

  /// Keep the named columns, in the given order.
  pub fn select_columns(&self, names: &[&str]) -> Result<Self> {
    let positions = names
      .iter()
      .map(|name| {
        self
          .column_position(name)
          .ok_or_else(|| PortfolioError::config(format!("unknown column '{name}'")))
      })
      .collect::<Result<Vec<_>>>()?;

    let values = self.values.select(Axis(1), &positions);
    Self::new(
      self.index.clone(),
      names.iter().map(|s| s.to_string()).collect(),
      values,
    )
  }

  pub(crate) fn select_rows(&self, rows: &[usize]) -> Self {
    Self {
      index: rows.iter().map(|&i| self.index[i]).collect(),
      columns: self.columns.clone(),
      values: self.values.select(Axis(0), rows),
    }
  }

  pub(crate) fn with_values(&self, values: Array2<f64>) -> Self {
    debug_assert_eq!(values.dim(), self.values.dim());
    Self {
      index: self.index.clone(),
      columns: self.columns.clone(),
      values,
    }
  }
}
