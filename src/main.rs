use std::fs;
use std::path::Path;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use clap::Subcommand;
use portfolio_rs::BacktestConfig;
use portfolio_rs::FrontierConfig;
use portfolio_rs::RebalanceFrequency;
use portfolio_rs::SolverConfig;
use portfolio_rs::data::TimeTable;
use portfolio_rs::data::covariance_matrix;
use portfolio_rs::data::expected_returns;
use portfolio_rs::data::prepare_prices;
use portfolio_rs::data::read_table;
use portfolio_rs::data::returns_from_prices;
use portfolio_rs::data::rolling_volatility;
use portfolio_rs::data::write_table;
use portfolio_rs::optimization::FrontierBuilder;
use portfolio_rs::portfolio::Backtester;
use portfolio_rs::portfolio::WeightSpec;
use portfolio_rs::visualization::backtest_plot;
use portfolio_rs::visualization::frontier_plot;
use portfolio_rs::visualization::frontier_report;
use portfolio_rs::visualization::performance_report;
use portfolio_rs::visualization::save_metrics_json;
use portfolio_rs::visualization::save_report;
use tracing::info;
use tracing_subscriber::EnvFilter;

const TRADING_DAYS: f64 = 252.0;

#[derive(Parser, Debug)]
#[command(
  author,
  version,
  about = "Portfolio backtesting, performance metrics and efficient frontiers",
  after_help = "EXAMPLES:
    # Clean per-ticker OHLCV files and merge their adjusted closes
    portfolio-rs prepare --tickers TSLA,BND,SPY --raw-dir data/raw --out-dir data/processed

    # Daily returns and 21-day rolling volatility
    portfolio-rs features --prices data/merged.csv --out-dir data/features

    # Quarterly-rebalanced 60/40 portfolio
    portfolio-rs backtest --prices data/merged.csv --weights SPY=0.6,TLT=0.4 --report report.txt

    # Time-varying weights against a buy-and-hold benchmark
    portfolio-rs backtest --prices data/merged.csv --weights-csv weights.csv --benchmark SPY=1.0

    # 50-point efficient frontier
    portfolio-rs frontier --prices data/merged.csv --plot frontier.html"
)]
struct Args {
  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Gap-fill per-ticker OHLCV files and merge their adjusted closes
  Prepare {
    /// Comma-separated tickers, read from <RAW_DIR>/<TICKER>.csv
    #[arg(long, value_delimiter = ',', required = true)]
    tickers: Vec<String>,

    #[arg(long)]
    raw_dir: PathBuf,

    /// Directory receiving <TICKER>_cleaned.csv and merged_data.csv
    #[arg(long)]
    out_dir: PathBuf,
  },

  /// Derive daily returns and rolling volatility from a price table
  Features {
    /// Price CSV: a date column followed by one column per asset
    #[arg(long)]
    prices: PathBuf,

    /// Directory receiving daily_returns.csv and rolling_volatility.csv
    #[arg(long)]
    out_dir: PathBuf,

    /// Rolling volatility window in trading days
    #[arg(long, default_value_t = 21)]
    window: usize,
  },

  /// Backtest a static or time-varying allocation
  Backtest {
    #[arg(long)]
    prices: PathBuf,

    /// Comma-separated ASSET=WEIGHT pairs, e.g. SPY=0.6,TLT=0.4
    #[arg(
      long,
      value_delimiter = ',',
      value_parser = parse_weight,
      required_unless_present = "weights_csv",
      conflicts_with = "weights_csv"
    )]
    weights: Vec<(String, f64)>,

    /// Weight table CSV: a date column followed by one column per asset.
    /// Each row holds until the next one.
    #[arg(long)]
    weights_csv: Option<PathBuf>,

    /// Static ASSET=WEIGHT pairs backtested alongside as a benchmark
    #[arg(long, value_delimiter = ',', value_parser = parse_weight)]
    benchmark: Vec<(String, f64)>,

    /// Rebalancing frequency (D, W, ME, QE, YE)
    #[arg(long, default_value = "QE")]
    rebalance: RebalanceFrequency,

    #[arg(long, default_value_t = 10_000.0)]
    capital: f64,

    /// Annualized risk-free rate
    #[arg(long, default_value_t = 0.02)]
    risk_free: f64,

    /// Write the text report here
    #[arg(long)]
    report: Option<PathBuf>,

    /// Write the metrics as JSON here
    #[arg(long)]
    json: Option<PathBuf>,

    /// Write an HTML chart of value and drawdown here
    #[arg(long)]
    plot: Option<PathBuf>,
  },

  /// Build the long-only efficient frontier
  Frontier {
    #[arg(long)]
    prices: PathBuf,

    /// Number of target returns on the grid
    #[arg(long, default_value_t = 50)]
    points: usize,

    #[arg(long, default_value_t = 0.02)]
    risk_free: f64,

    /// Write an HTML chart of the frontier here
    #[arg(long)]
    plot: Option<PathBuf>,
  },
}

fn parse_weight(s: &str) -> Result<(String, f64), String> {
  let (asset, weight) = s
    .split_once('=')
    .ok_or_else(|| format!("expected ASSET=WEIGHT, got '{s}'"))?;
  let weight = weight
    .trim()
    .parse::<f64>()
    .map_err(|e| format!("invalid weight for '{asset}': {e}"))?;
  Ok((asset.trim().to_string(), weight))
}

fn load_returns(prices: &Path) -> anyhow::Result<TimeTable> {
  let prices =
    read_table(prices).with_context(|| format!("reading prices from {}", prices.display()))?;
  let returns = returns_from_prices(&prices);
  info!(
    "Loaded {} assets, {} return periods",
    returns.n_cols(),
    returns.n_rows()
  );
  Ok(returns)
}

fn main() -> anyhow::Result<()> {
  let env_filter =
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("portfolio_rs=info"));
  tracing_subscriber::fmt().with_env_filter(env_filter).init();

  match Args::parse().command {
    Command::Prepare {
      tickers,
      raw_dir,
      out_dir,
    } => {
      fs::create_dir_all(&out_dir)
        .with_context(|| format!("creating {}", out_dir.display()))?;
      let merged = prepare_prices(tickers.as_slice(), &raw_dir, &out_dir)?;
      info!(
        "Prepared {} tickers over {} dates in {}",
        merged.n_cols(),
        merged.n_rows(),
        out_dir.display()
      );
    }
    Command::Features {
      prices,
      out_dir,
      window,
    } => {
      let returns = load_returns(&prices)?;
      let volatility = rolling_volatility(&returns, window, TRADING_DAYS)?;

      fs::create_dir_all(&out_dir)
        .with_context(|| format!("creating {}", out_dir.display()))?;
      write_table(out_dir.join("daily_returns.csv"), &returns)?;
      write_table(out_dir.join("rolling_volatility.csv"), &volatility)?;
      info!("Features written to {}", out_dir.display());
    }
    Command::Backtest {
      prices,
      weights,
      weights_csv,
      benchmark,
      rebalance,
      capital,
      risk_free,
      report,
      json,
      plot,
    } => {
      let returns = load_returns(&prices)?;
      let config = BacktestConfig::new(rebalance, capital, risk_free, TRADING_DAYS);
      let backtester = Backtester::new(config);

      let spec = match weights_csv {
        Some(path) => WeightSpec::from(
          read_table(&path).with_context(|| format!("reading weights from {}", path.display()))?,
        ),
        None => WeightSpec::fixed(weights),
      };
      let result = backtester.run(&returns, &spec)?;

      let text = performance_report(&result.metrics);
      println!("{text}");

      let bench = if benchmark.is_empty() {
        None
      } else {
        let bench = backtester.run(&returns, &WeightSpec::fixed(benchmark))?;
        println!("Benchmark\n{}", performance_report(&bench.metrics));
        Some(bench)
      };

      if let Some(path) = report {
        save_report(&path, &text).with_context(|| format!("writing {}", path.display()))?;
      }
      if let Some(path) = json {
        save_metrics_json(&path, &result.metrics)
          .with_context(|| format!("writing {}", path.display()))?;
      }
      if let Some(path) = plot {
        backtest_plot(&result, bench.as_ref()).write_html(&path);
        info!("Backtest chart written to {}", path.display());
      }
    }
    Command::Frontier {
      prices,
      points,
      risk_free,
      plot,
    } => {
      let returns = load_returns(&prices)?;
      let mu = expected_returns(&returns, TRADING_DAYS)?;
      let cov = covariance_matrix(&returns, TRADING_DAYS)?;

      let config = FrontierConfig::new(points, risk_free, SolverConfig::default());
      let builder = FrontierBuilder::new(config);
      let frontier = builder.build(&mu, &cov)?;
      println!("{}", frontier_report(&frontier, returns.columns()));

      if let Some(path) = plot {
        frontier_plot(&frontier).write_html(&path);
        info!("Frontier chart written to {}", path.display());
      }
    }
  }

  Ok(())
}
