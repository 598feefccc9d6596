//! # Price Cleaning
//!
//! $$
//! \tilde P_{t} = \text{bfill}\left(\text{ffill}(P)\right)_{t},\qquad
//! M_{t,k} = \tilde P^{(k)}_{t,\text{Adj Close}}
//! $$
//!
//! Per-ticker OHLCV files are gap-filled, saved as `<TICKER>_cleaned.csv`,
//! and their adjusted closes merged into one price table.

use std::path::Path;

use ndarray::Array2;
use ndarray::Axis;
use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::error::PortfolioError;
use crate::error::Result;
use super::frame::TimeTable;
use super::io::read_table;
use super::io::write_table;
use super::returns::simple_returns;

/// Price columns tried in order when a ticker file is reduced to one series.
pub const PRICE_COLUMNS: [&str; 2] = ["Adj Close", "Close"];

/// File name of the merged price table.
pub const MERGED_FILE: &str = "merged_data.csv";

/// Simple returns after gap-filling `prices`, so a single missing price
/// does not drop whole rows.
pub fn returns_from_prices(prices: &TimeTable) -> TimeTable {
  let missing = prices.missing_count();
  if missing > 0 {
    debug!("Filling {} missing prices before computing returns", missing);
    simple_returns(&prices.fill_missing())
  } else {
    simple_returns(prices)
  }
}

/// The adjusted close of a cleaned ticker table (falling back to `Close`),
/// as a one-column table named `ticker`.
pub fn price_series(table: &TimeTable, ticker: &str) -> Result<TimeTable> {
  let column = PRICE_COLUMNS
    .iter()
    .find_map(|name| table.column(name))
    .ok_or_else(|| {
      PortfolioError::config(format!(
        "{ticker} has neither an 'Adj Close' nor a 'Close' column"
      ))
    })?;

  let values = column.to_owned().insert_axis(Axis(1));
  TimeTable::new(table.index().to_vec(), vec![ticker.to_string()], values)
}

/// Merge one-column price tables on the dates of the first one. Dates a
/// later series lacks are missing; its extra dates are dropped.
pub fn merge_prices(series: &[TimeTable]) -> Result<TimeTable> {
  let Some(first) = series.first() else {
    return Err(PortfolioError::config("no price series to merge"));
  };

  let index = first.index().to_vec();
  let mut columns = Vec::with_capacity(series.len());
  let mut values = Array2::from_elem((index.len(), series.len()), f64::NAN);

  for (k, s) in series.iter().enumerate() {
    if s.n_cols() != 1 {
      return Err(PortfolioError::config(format!(
        "expected one price column per series, got {}",
        s.n_cols()
      )));
    }
    columns.push(s.columns()[0].clone());
    for (i, date) in index.iter().enumerate() {
      if let Ok(row) = s.index().binary_search(date) {
        values[[i, k]] = s.values()[[row, 0]];
      }
    }
  }

  TimeTable::new(index, columns, values)
}

/// Clean `<raw_dir>/<TICKER>.csv` for every ticker, write the cleaned files
/// and `merged_data.csv` into `out_dir`, and return the merged prices.
///
/// A ticker whose file cannot be read or has no price column is logged and
/// left out of the merge.
pub fn prepare_prices<S: AsRef<str>>(
  tickers: &[S],
  raw_dir: impl AsRef<Path>,
  out_dir: impl AsRef<Path>,
) -> Result<TimeTable> {
  let raw_dir = raw_dir.as_ref();
  let out_dir = out_dir.as_ref();

  let mut series = Vec::with_capacity(tickers.len());
  for ticker in tickers {
    let ticker: &str = ticker.as_ref();
    let cleaned = match read_table(raw_dir.join(format!("{ticker}.csv"))) {
      Ok(raw) => raw.fill_missing(),
      Err(err) => {
        warn!("Skipping {}: {}", ticker, err);
        continue;
      }
    };
    let prices = match price_series(&cleaned, ticker) {
      Ok(prices) => prices,
      Err(err) => {
        warn!("Skipping {}: {}", ticker, err);
        continue;
      }
    };
    write_table(out_dir.join(format!("{ticker}_cleaned.csv")), &cleaned)?;
    series.push(prices);
  }

  let merged = merge_prices(&series)?;
  write_table(out_dir.join(MERGED_FILE), &merged)?;
  info!(
    "Merged {} of {} tickers over {} dates",
    merged.n_cols(),
    tickers.len(),
    merged.n_rows()
  );

  Ok(merged)
}
