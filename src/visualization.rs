//! # Visualization
//!
//! $$
//! (V_t, \text{DD}_t) \mapsto \text{report},\qquad (\sigma_k, \mu_k) \mapsto \text{frontier chart}
//! $$
//!
//! Text reports and plotly figures for backtests and efficient frontiers.
//! Nothing here feeds back into the computations.

use std::fs;
use std::path::Path;

use plotly::Layout;
use plotly::Plot;
use plotly::Scatter;
use plotly::common::Anchor;
use plotly::common::Fill;
use plotly::common::Font;
use plotly::common::Line;
use plotly::common::Marker;
use plotly::common::MarkerSymbol;
use plotly::common::Mode;
use plotly::layout::Annotation;
use plotly::layout::Axis;
use plotly::layout::GridPattern;
use plotly::layout::LayoutGrid;
use plotly::layout::Margin;
use prettytable::Table;
use prettytable::row;

use crate::error::Result;
use crate::optimization::EfficientFrontier;
use crate::portfolio::BacktestResult;
use crate::portfolio::Metric;
use crate::portfolio::MetricsRecord;

fn percent(m: &Metric) -> String {
  m.value()
    .map_or_else(|| "n/a".to_string(), |v| format!("{:.2}%", v * 100.0))
}

fn ratio(m: &Metric) -> String {
  m.value()
    .map_or_else(|| "n/a".to_string(), |v| format!("{v:.2}"))
}

/// Printable performance table. Sortino appears only when it is defined.
pub fn performance_report(metrics: &MetricsRecord) -> String {
  let mut table = Table::new();
  table.set_titles(row!["Portfolio Performance", ""]);
  table.add_row(row!["CAGR", percent(&metrics.cagr)]);
  table.add_row(row!["Volatility", percent(&metrics.volatility)]);
  table.add_row(row!["Sharpe Ratio", ratio(&metrics.sharpe)]);
  table.add_row(row!["Max Drawdown", percent(&metrics.max_drawdown)]);
  if metrics.sortino.is_defined() {
    table.add_row(row!["Sortino Ratio", ratio(&metrics.sortino)]);
  }
  let final_value = metrics
    .final_value
    .map_or_else(|| "n/a".to_string(), |v| format!("{v:.2}"));
  let events = format!("{} events", metrics.rebalance_dates.len());
  table.add_row(row!["Final Value", final_value]);
  table.add_row(row!["Periods", metrics.total_periods]);
  table.add_row(row!["Rebalancing", events]);

  table.to_string()
}

/// Frontier grid as a table, followed by the maximum-Sharpe allocation.
pub fn frontier_report(frontier: &EfficientFrontier, assets: &[String]) -> String {
  let mut grid = Table::new();
  grid.set_titles(row!["Return", "Volatility", "Sharpe", "Converged"]);
  for p in &frontier.points {
    let expected = format!("{:.2}%", p.expected_return * 100.0);
    let volatility = format!("{:.2}%", p.volatility * 100.0);
    let converged = if p.status.is_converged() { "yes" } else { "no" };
    grid.add_row(row![expected, volatility, ratio(&p.sharpe), converged]);
  }

  let best = &frontier.max_sharpe;
  let mut allocation = Table::new();
  allocation.set_titles(row!["Asset", "Weight"]);
  for (asset, w) in assets.iter().zip(best.weights.iter()) {
    let weight = format!("{:.2}%", w * 100.0);
    allocation.add_row(row![asset, weight]);
  }

  format!(
    "{grid}\nMax Sharpe portfolio: return {:.2}%, volatility {:.2}%, Sharpe {}\n{allocation}",
    best.expected_return * 100.0,
    best.volatility * 100.0,
    ratio(&best.sharpe)
  )
}

/// Write a rendered report to `path`.
pub fn save_report<P: AsRef<Path>>(path: P, report: &str) -> Result<()> {
  fs::write(path, report)?;
  Ok(())
}

/// Write `metrics` as pretty-printed JSON to `path`.
pub fn save_metrics_json<P: AsRef<Path>>(path: P, metrics: &MetricsRecord) -> Result<()> {
  let body = serde_json::to_string_pretty(metrics)?;
  fs::write(path, body)?;
  Ok(())
}

fn subplot_title(text: &str, y_axis: &str) -> Annotation {
  let x_axis = y_axis.replacen('y', "x", 1);
  Annotation::new()
    .text(format!("<b>{text}</b>"))
    .x_ref(format!("{x_axis} domain"))
    .y_ref(format!("{y_axis} domain"))
    .x(0.5)
    .y(1.0)
    .x_anchor(Anchor::Center)
    .y_anchor(Anchor::Bottom)
    .font(Font::new().size(13))
    .show_arrow(false)
}

/// Portfolio value on top, drawdown in percent below, with an optional
/// benchmark curve.
pub fn backtest_plot(result: &BacktestResult, benchmark: Option<&BacktestResult>) -> Plot {
  let dates = |r: &BacktestResult| -> Vec<String> {
    r.performance.index.iter().map(|d| d.to_string()).collect()
  };

  let mut plot = Plot::new();
  plot.add_trace(
    Scatter::new(dates(result), result.performance.value.to_vec())
      .mode(Mode::Lines)
      .line(Line::new().width(1.5))
      .name("Strategy"),
  );

  if let Some(bench) = benchmark {
    plot.add_trace(
      Scatter::new(dates(bench), bench.performance.value.to_vec())
        .mode(Mode::Lines)
        .line(Line::new().width(1.0))
        .name("Benchmark"),
    );
  }

  let drawdown_pct: Vec<f64> = result.performance.drawdown.iter().map(|d| d * 100.0).collect();
  plot.add_trace(
    Scatter::new(dates(result), drawdown_pct)
      .mode(Mode::Lines)
      .fill(Fill::ToZeroY)
      .fill_color("rgba(220,38,38,0.3)")
      .line(Line::new().width(0.5).color("rgb(220,38,38)"))
      .name("Drawdown")
      .show_legend(false)
      .x_axis("x2")
      .y_axis("y2"),
  );

  plot.set_layout(
    Layout::new()
      .title("Backtest")
      .auto_size(true)
      .height(720)
      .margin(Margin::new().left(64).right(24).top(84).bottom(44))
      .annotations(vec![
        subplot_title("Portfolio Growth", "y"),
        subplot_title("Drawdown", "y2"),
      ])
      .grid(
        LayoutGrid::new()
          .rows(2)
          .columns(1)
          .y_gap(0.12)
          .pattern(GridPattern::Independent),
      )
      .y_axis(Axis::new().title("Value ($)"))
      .y_axis2(Axis::new().title("Drawdown (%)")),
  );

  plot
}

/// Volatility against expected return along the grid, with the
/// maximum-Sharpe portfolio marked.
pub fn frontier_plot(frontier: &EfficientFrontier) -> Plot {
  let vols: Vec<f64> = frontier.points.iter().map(|p| p.volatility).collect();
  let rets: Vec<f64> = frontier.points.iter().map(|p| p.expected_return).collect();
  let best = &frontier.max_sharpe;

  let mut plot = Plot::new();
  plot.add_trace(
    Scatter::new(vols, rets)
      .mode(Mode::Lines)
      .line(Line::new().width(2.0).color("rgb(37,99,235)"))
      .name("Efficient Frontier"),
  );
  plot.add_trace(
    Scatter::new(vec![best.volatility], vec![best.expected_return])
      .mode(Mode::Markers)
      .marker(
        Marker::new()
          .size(12)
          .color("rgb(220,38,38)")
          .symbol(MarkerSymbol::Star),
      )
      .name(format!("Max Sharpe ({})", ratio(&best.sharpe)).as_str()),
  );

  plot.set_layout(
    Layout::new()
      .title("Efficient Frontier")
      .x_axis(Axis::new().title("Volatility (Std. Deviation)"))
      .y_axis(Axis::new().title("Expected Return")),
  );

  plot
}
