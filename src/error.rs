//! # Errors
//!
//! $$
//! \text{input} \mapsto \text{Ok}(\cdot) \mid \text{Err}(\text{PortfolioError})
//! $$
//!
//! Shape and configuration failures surface immediately. Mathematically
//! undefined metrics and non-converged optimizations are not errors, see
//! [`crate::portfolio::Metric`] and [`crate::optimization::SolverStatus`].

use thiserror::Error;

/// Error type shared by the library.
#[derive(Error, Debug)]
pub enum PortfolioError {
  /// Malformed input shape, type or configuration.
  #[error("configuration error: {0}")]
  Configuration(String),

  #[error("csv error: {0}")]
  Csv(#[from] csv::Error),

  #[error("io error: {0}")]
  Io(#[from] std::io::Error),

  #[error("date parse error: {0}")]
  DateParse(#[from] chrono::ParseError),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),
}

impl PortfolioError {
  pub(crate) fn config(msg: impl Into<String>) -> Self {
    Self::Configuration(msg.into())
  }
}

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, PortfolioError>;
