//! # Portfolio Optimization
//!
//! $$
//! \sigma^\*(\tau) = \min \left\{ \sqrt{\mathbf{w}^\top \Sigma \mathbf{w}} :
//! \mathbf{1}^\top \mathbf{w} = 1,\ \mu^\top \mathbf{w} = \tau,\ \mathbf{w} \ge 0 \right\}
//! $$
//!
//! Long-only mean-variance optimizers and the efficient-frontier sweep.

pub mod frontier;
pub mod optimizers;
pub mod qp;
pub mod types;

pub use frontier::FrontierBuilder;
pub use frontier::efficient_frontier;
pub use frontier::target_returns;
pub use optimizers::maximize_sharpe;
pub use optimizers::minimize_volatility;
pub use optimizers::portfolio_performance;
pub use types::EfficientFrontier;
pub use types::FrontierPoint;
pub use types::OptimizedPortfolio;
pub use types::SolverStatus;
