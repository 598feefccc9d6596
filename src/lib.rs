//! # portfolio-rs
//!
//! $$
//! V_t = V_0 \prod_{s \le t} \left(1 + \mathbf{w}_{s-1}^\top \mathbf{r}_s\right)
//! $$
//!
//! Portfolio backtesting, performance metrics and mean-variance efficient frontiers.

pub mod config;
pub mod data;
pub mod error;
pub mod optimization;
pub mod portfolio;
pub mod visualization;

pub use config::BacktestConfig;
pub use config::FrontierConfig;
pub use config::RebalanceFrequency;
pub use config::SolverConfig;
pub use data::TimeTable;
pub use error::PortfolioError;
pub use error::Result;
