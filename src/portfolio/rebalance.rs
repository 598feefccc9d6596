//! # Rebalancing
//!
//! $$
//! \mathcal{R} = \{\min\{t \in p\} : p \in \text{periods},\ W_p \text{ defined}\}
//! $$
//!
//! Rebalance events are the first date of each calendar period in which every
//! weight column has at least one defined value.

use chrono::Datelike;
use chrono::NaiveDate;

use crate::config::RebalanceFrequency;
use crate::data::TimeTable;

/// Calendar period containing `date`. Equal keys mean the same period.
pub fn period_key(freq: RebalanceFrequency, date: NaiveDate) -> (i32, u32) {
  match freq {
    RebalanceFrequency::Daily => (date.year(), date.ordinal()),
    RebalanceFrequency::Weekly => {
      let week = date.iso_week();
      (week.year(), week.week())
    }
    RebalanceFrequency::MonthEnd => (date.year(), date.month()),
    RebalanceFrequency::QuarterEnd => (date.year(), (date.month() - 1) / 3),
    RebalanceFrequency::YearEnd => (date.year(), 0),
  }
}

/// Rebalance event dates of an aligned weight table.
pub fn rebalance_dates(weights: &TimeTable, freq: RebalanceFrequency) -> Vec<NaiveDate> {
  let index = weights.index();
  let values = weights.values();
  let mut events = Vec::new();
  let mut start = 0usize;

  while start < index.len() {
    let key = period_key(freq, index[start]);
    let mut end = start + 1;
    while end < index.len() && period_key(freq, index[end]) == key {
      end += 1;
    }

    let defined = (0..weights.n_cols())
      .all(|j| (start..end).any(|i| !values[[i, j]].is_nan()));
    if defined {
      events.push(index[start]);
    }

    start = end;
  }

  events
}
