//! # CSV
//!
//! $$
//! \texttt{date},\ x_{t,1},\ \dots,\ x_{t,N}
//! $$
//!
//! Plain delimited text, one row per date, one column per asset. Empty or
//! unparsable cells read as missing and missing cells are written empty.

use std::fs::File;
use std::io::Read;
use std::io::Write;
use std::path::Path;

use chrono::NaiveDate;
use csv::ReaderBuilder;
use csv::WriterBuilder;
use ndarray::Array2;
use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::error::PortfolioError;
use crate::error::Result;
use super::frame::TimeTable;

const DATE_FORMAT: &str = "%Y-%m-%d";

fn parse_date(raw: &str) -> Result<NaiveDate> {
  let day = raw
    .trim()
    .split(|c: char| c == ' ' || c == 'T')
    .next()
    .unwrap_or_default();
  Ok(NaiveDate::parse_from_str(day, DATE_FORMAT)?)
}

/// Read a table from a CSV file whose first column holds dates.
pub fn read_table(path: impl AsRef<Path>) -> Result<TimeTable> {
  let path = path.as_ref();
  info!("Loading table from: {}", path.display());
  read_table_from_reader(File::open(path)?)
}

/// Read a table from any CSV source. Rows are sorted by date; a repeated date
/// is a configuration error.
pub fn read_table_from_reader<R: Read>(source: R) -> Result<TimeTable> {
  let mut reader = ReaderBuilder::new()
    .has_headers(true)
    .trim(csv::Trim::All)
    .from_reader(source);

  let headers = reader.headers()?.clone();
  if headers.len() < 2 {
    return Err(PortfolioError::config(
      "csv needs a date column and at least one value column",
    ));
  }
  let columns: Vec<String> = headers.iter().skip(1).map(|h| h.to_string()).collect();

  let mut rows: Vec<(NaiveDate, Vec<f64>)> = Vec::new();
  let mut missing = 0usize;
  let mut unparsable = 0usize;
  for record in reader.records() {
    let record = record?;
    let date = parse_date(record.get(0).unwrap_or_default())?;
    let values: Vec<f64> = (1..=columns.len())
      .map(|j| match record.get(j).unwrap_or_default() {
        "" => {
          missing += 1;
          f64::NAN
        }
        cell => cell.parse::<f64>().unwrap_or_else(|_| {
          unparsable += 1;
          f64::NAN
        }),
      })
      .collect();
    rows.push((date, values));
  }

  rows.sort_by_key(|(date, _)| *date);
  if unparsable > 0 {
    warn!(
      "{} cells could not be parsed as numbers and were read as missing",
      unparsable
    );
  }
  debug!(
    "Read {} rows x {} columns ({} missing cells)",
    rows.len(),
    columns.len(),
    missing + unparsable
  );

  let n_cols = columns.len();
  let index: Vec<NaiveDate> = rows.iter().map(|(d, _)| *d).collect();
  let values = Array2::from_shape_fn((rows.len(), n_cols), |(i, j)| rows[i].1[j]);

  TimeTable::new(index, columns, values)
}

/// Write a table to a CSV file with a `datetime` date column.
pub fn write_table(path: impl AsRef<Path>, table: &TimeTable) -> Result<()> {
  let path = path.as_ref();
  let file = File::create(path)?;
  write_table_to_writer(file, table)?;
  info!("Wrote {} rows to {}", table.n_rows(), path.display());
  Ok(())
}

pub fn write_table_to_writer<W: Write>(sink: W, table: &TimeTable) -> Result<()> {
  let mut writer = WriterBuilder::new().from_writer(sink);

  let mut header = Vec::with_capacity(table.n_cols() + 1);
  header.push("datetime".to_string());
  header.extend(table.columns().iter().cloned());
  writer.write_record(&header)?;

  for (i, date) in table.index().iter().enumerate() {
    let mut record = Vec::with_capacity(table.n_cols() + 1);
    record.push(date.format(DATE_FORMAT).to_string());
    for &v in table.values().row(i) {
      record.push(if v.is_nan() { String::new() } else { v.to_string() });
    }
    writer.write_record(&record)?;
  }

  writer.flush()?;
  Ok(())
}
