//! # Portfolio Backtesting
//!
//! $$
//! V_t = V_0 \prod_{s=1}^{t}\Big(1 + \sum_i w_{s-1,i}\, r_{s,i}\Big)
//! $$
//!
//! Weight alignment, compounding, rebalance events and performance metrics.

pub mod compounder;
pub mod engine;
pub mod metrics;
pub mod rebalance;
pub mod types;
pub mod weights;

pub use engine::Backtester;
pub use engine::backtest;
pub use metrics::compute_metrics;
pub use rebalance::rebalance_dates;
pub use types::BacktestResult;
pub use types::Metric;
pub use types::MetricsRecord;
pub use types::PerformanceCurve;
pub use types::UndefinedReason;
pub use types::WeightSpec;
pub use weights::align_weights;
