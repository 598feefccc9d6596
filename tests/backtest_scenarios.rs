use approx::assert_abs_diff_eq;
use approx::assert_relative_eq;
use chrono::NaiveDate;
use ndarray::Array2;
use ndarray::array;
use portfolio_rs::BacktestConfig;
use portfolio_rs::PortfolioError;
use portfolio_rs::RebalanceFrequency;
use portfolio_rs::data::TimeTable;
use portfolio_rs::data::expected_returns;
use portfolio_rs::data::read_table_from_reader;
use portfolio_rs::data::returns_from_prices;
use portfolio_rs::data::simple_returns;
use portfolio_rs::optimization::efficient_frontier;
use portfolio_rs::portfolio::Backtester;
use portfolio_rs::portfolio::Metric;
use portfolio_rs::portfolio::UndefinedReason;
use portfolio_rs::portfolio::WeightSpec;
use portfolio_rs::portfolio::backtest;

fn business_days(n: usize) -> Vec<NaiveDate> {
  let mut d = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
  let mut out = Vec::with_capacity(n);
  while out.len() < n {
    if chrono::Datelike::weekday(&d).number_from_monday() <= 5 {
      out.push(d);
    }
    d = d.succ_opt().unwrap();
  }
  out
}

fn table(names: &[&str], values: Array2<f64>) -> TimeTable {
  TimeTable::new(
    business_days(values.nrows()),
    names.iter().map(|s| s.to_string()).collect(),
    values,
  )
  .unwrap()
}

#[test]
fn constant_prices_give_zero_growth_and_undefined_sharpe() {
  let prices = table(&["A", "B", "C"], Array2::from_elem((60, 3), 42.0));
  let returns = simple_returns(&prices);

  for weights in [
    WeightSpec::fixed([("A", 1.0)]),
    WeightSpec::fixed([("A", 0.2), ("B", 0.3), ("C", 0.5)]),
  ] {
    let result = Backtester::default().run(&returns, &weights).unwrap();

    assert!(result.performance.value.iter().all(|&v| v == 10_000.0));
    assert_eq!(result.metrics.cagr, Metric::Value(0.0));
    assert_eq!(result.metrics.volatility, Metric::Value(0.0));
    assert_eq!(
      result.metrics.sharpe,
      Metric::Undefined(UndefinedReason::ZeroVariance)
    );
  }
}

#[test]
fn mapping_and_replicated_table_are_equivalent() {
  let returns = table(&["A", "B"], array![[0.0, 0.0], [0.03, -0.01]]);
  let mapping = WeightSpec::fixed([("A", 0.7), ("B", 0.3)]);
  let replicated = TimeTable::constant(
    returns.index().to_vec(),
    returns.columns().to_vec(),
    &[0.7, 0.3],
  )
  .unwrap();

  let config = BacktestConfig::default();
  let a = backtest(&returns, &mapping, &config).unwrap();
  let b = backtest(&returns, &replicated.into(), &config).unwrap();

  assert_eq!(a.performance, b.performance);
  assert_eq!(a.metrics, b.metrics);
}

#[test]
fn max_drawdown_is_largest_peak_to_trough_decline() {
  // Values: 10000, 10500, 9450, 8505, 9355.5, 12162.15
  let returns = table(&["A"], array![[0.0], [0.05], [-0.1], [-0.1], [0.1], [0.3]]);
  let result = backtest(
    &returns,
    &WeightSpec::fixed([("A", 1.0)]),
    &BacktestConfig::default(),
  )
  .unwrap();

  let mdd = result.metrics.max_drawdown.value().unwrap();
  assert_abs_diff_eq!(mdd, 0.9 * 0.9 - 1.0, epsilon = 1e-12);
  assert!(result.performance.drawdown.iter().all(|&d| d <= 0.0));
  assert_eq!(result.performance.drawdown[5], 0.0);
}

#[test]
fn sortino_is_undefined_without_losses() {
  let returns = table(
    &["A", "B"],
    array![[0.0, 0.0], [0.01, 0.02], [0.0, 0.01], [0.03, 0.0]],
  );
  let result = backtest(
    &returns,
    &WeightSpec::fixed([("A", 0.5), ("B", 0.5)]),
    &BacktestConfig::default(),
  )
  .unwrap();

  assert_eq!(
    result.metrics.sortino,
    Metric::Undefined(UndefinedReason::NoDownside)
  );
  assert!(result.metrics.sharpe.is_defined());

  let json = serde_json::to_string(&result.metrics).unwrap();
  assert!(json.contains("NoDownside"));
}

#[test]
fn unknown_weight_key_surfaces_immediately() {
  let returns = table(&["A", "B"], Array2::zeros((3, 2)));
  let err = backtest(
    &returns,
    &WeightSpec::fixed([("A", 0.5), ("ZZZ", 0.5)]),
    &BacktestConfig::default(),
  )
  .unwrap_err();
  assert!(matches!(err, PortfolioError::Configuration(_)));
}

#[test]
fn three_point_frontier_hits_targets() {
  let mu = array![0.06, 0.11, 0.16];
  let cov = array![
    [0.0144, 0.0036, -0.0012],
    [0.0036, 0.0400, 0.0090],
    [-0.0012, 0.0090, 0.0729]
  ];
  let frontier = efficient_frontier(&mu, &cov, 3, 0.02).unwrap();

  let targets: Vec<f64> = frontier
    .points
    .iter()
    .map(|p| p.target_return.unwrap())
    .collect();
  assert_eq!(targets[0], 0.06);
  assert_eq!(targets[2], 0.16);

  for point in &frontier.points {
    assert_abs_diff_eq!(
      point.weights.dot(&mu),
      point.target_return.unwrap(),
      epsilon = 1e-6
    );
    assert_abs_diff_eq!(point.weights.sum(), 1.0, epsilon = 1e-9);
    assert!(point.weights.iter().all(|&w| (0.0..=1.0).contains(&w)));
  }
}

#[test]
fn five_day_scenario_matches_manual_compounding() {
  let a = [0.01, -0.02, 0.03, 0.00, 0.01];
  let b = [0.00, 0.01, -0.01, 0.02, 0.00];
  let returns = table(
    &["A", "B"],
    Array2::from_shape_fn((5, 2), |(t, j)| if j == 0 { a[t] } else { b[t] }),
  );
  let result = backtest(
    &returns,
    &WeightSpec::fixed([("A", 0.6), ("B", 0.4)]),
    &BacktestConfig::default(),
  )
  .unwrap();

  let mut growth = 1.0;
  let mut expected = Vec::with_capacity(5);
  for t in 0..5 {
    let r = if t == 0 {
      0.0
    } else {
      0.0 + 0.6 * a[t] + 0.4 * b[t]
    };
    growth *= 1.0 + r;
    expected.push(10_000.0 * growth);
  }

  let value = &result.performance.value;
  assert_eq!(value.len(), 5);
  assert_eq!(result.performance.daily_return[0], 0.0);
  assert_eq!(value.to_vec(), expected);
  assert_relative_eq!(
    value[4],
    10_000.0 * 0.992 * 1.014 * 1.008 * 1.006,
    max_relative = 1e-12
  );
  assert_eq!(result.metrics.final_value, Some(expected[4]));
  assert_eq!(result.metrics.total_periods, 5);
}

#[test]
fn csv_prices_flow_through_backtest_and_expected_returns() {
  let csv = "\
date,SPY,TLT
2024-01-02,100.0,50.0
2024-01-03,101.0,50.5
2024-01-04,99.0,51.0
2024-01-05,102.0,50.0
2024-04-01,104.0,50.5
2024-04-02,103.0,51.5
";
  let prices = read_table_from_reader(csv.as_bytes()).unwrap();
  let returns = simple_returns(&prices);
  assert_eq!(returns.n_rows(), 5);

  let config = BacktestConfig {
    rebalance: RebalanceFrequency::QuarterEnd,
    ..BacktestConfig::default()
  };
  let weights = WeightSpec::fixed([("SPY", 0.5), ("TLT", 0.5)]);
  let result = backtest(&returns, &weights, &config).unwrap();
  assert_eq!(result.metrics.rebalance_dates.len(), 2);
  assert!(result.metrics.max_drawdown.value().unwrap() <= 0.0);

  let mu = expected_returns(&returns, 252.0).unwrap();
  assert_eq!(mu.len(), 2);
}

#[test]
fn weight_table_from_csv_against_buy_and_hold_benchmark() {
  let prices = read_table_from_reader(
    "datetime,SPY,TLT\n\
     2024-01-02,100,50\n\
     2024-01-03,101,\n\
     2024-01-04,99,51\n\
     2024-01-05,102,50\n"
      .as_bytes(),
  )
  .unwrap();
  let returns = returns_from_prices(&prices);
  assert_eq!(returns.n_rows(), 3);

  let table = read_table_from_reader(
    "datetime,SPY,TLT\n2024-01-02,1.0,0.0\n2024-01-04,0.0,1.0\n".as_bytes(),
  )
  .unwrap();
  let backtester = Backtester::default();
  let strategy = backtester.run(&returns, &WeightSpec::from(table)).unwrap();
  let benchmark = backtester
    .run(&returns, &WeightSpec::fixed([("SPY", 1.0)]))
    .unwrap();

  assert_relative_eq!(
    strategy.metrics.final_value.unwrap(),
    10_000.0 * (99.0 / 101.0) * (50.0 / 51.0),
    max_relative = 1e-12
  );
  assert_relative_eq!(
    benchmark.metrics.final_value.unwrap(),
    10_000.0 * 102.0 / 101.0,
    max_relative = 1e-12
  );
  assert_eq!(strategy.performance.index, benchmark.performance.index);
}
