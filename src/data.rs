//! # Data
//!
//! $$
//! r_t = \frac{P_t}{P_{t-1}} - 1
//! $$
//!
//! Date-indexed tables, return preprocessing and CSV exchange.

pub mod clean;
pub mod frame;
pub mod io;
pub mod returns;

pub use clean::merge_prices;
pub use clean::prepare_prices;
pub use clean::price_series;
pub use clean::returns_from_prices;
pub use frame::TimeTable;
pub use io::read_table;
pub use io::read_table_from_reader;
pub use io::write_table;
pub use io::write_table_to_writer;
pub use returns::correlation_matrix;
pub use returns::covariance_matrix;
pub use returns::expected_returns;
pub use returns::log_returns;
pub use returns::rolling_volatility;
pub use returns::simple_returns;
