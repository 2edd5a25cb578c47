//! CLI definition and dispatch.

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use tracing::{info, warn};

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::csv_report_adapter::CsvReportAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::backtest::{self as backtest_engine, BacktestConfig, BacktestResult};
use crate::domain::config_validation::{parse_date, validate_all};
use crate::domain::error::SignalTraderError;
use crate::domain::indicator::{
    IndicatorProvider, IndicatorSet, IndicatorType, IndicatorValue, TechnicalIndicators,
};
use crate::domain::metrics::Metrics;
use crate::domain::ohlcv::PriceBar;
use crate::domain::signal::{Decision, RuleWeights, SignalConfig, SignalRule, WarmupPolicy};
use crate::domain::sizing::{SizingMode, DEFAULT_FIXED_FRACTION, DEFAULT_RISK_FRACTION};
use crate::domain::strategy::{
    CrossoverSource, IndicatorWindows, MovingAverage, OscillatorSource, Strategy,
};
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;
use crate::ports::report_port::ReportPort;

const DEFAULT_STOP_LOSS_PCT: f64 = 5.0;

#[derive(Parser, Debug)]
#[command(name = "signaltrader", about = "Signal-to-portfolio backtester")]
pub struct Cli {
    /// Log level used when RUST_LOG is not set
    #[arg(long, global = true, default_value = "info")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a backtest and print a performance summary
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        symbol: Option<String>,
        #[arg(long)]
        data_dir: Option<PathBuf>,
        /// Write the per-step trajectory (and a summary) as CSV
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Print indicator values and the decision for every bar as CSV
    Signals {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        symbol: Option<String>,
        #[arg(long)]
        data_dir: Option<PathBuf>,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// List symbols available in a data directory
    ListSymbols {
        #[arg(long)]
        data_dir: Option<PathBuf>,
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    let result = match cli.command {
        Command::Backtest {
            config,
            symbol,
            data_dir,
            output,
        } => run_backtest(&config, symbol, data_dir, output.as_deref()),
        Command::Signals {
            config,
            symbol,
            data_dir,
        } => run_signals(&config, symbol, data_dir),
        Command::Validate { config } => run_validate(&config),
        Command::ListSymbols { data_dir, config } => run_list_symbols(data_dir, config.as_deref()),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

/// Where price data comes from for one run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSettings {
    pub symbol: String,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub data_dir: PathBuf,
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, SignalTraderError> {
    info!(path = %path.display(), "loading config");
    let config = FileConfigAdapter::from_file(path)?;
    validate_all(&config)?;
    Ok(config)
}

pub fn build_run_settings(
    config: &dyn ConfigPort,
    symbol_override: Option<String>,
    data_dir_override: Option<PathBuf>,
) -> Result<RunSettings, SignalTraderError> {
    let symbol = match symbol_override {
        Some(s) => s,
        None => config.require_string("backtest", "symbol")?,
    };
    let data_dir = data_dir_override
        .or_else(|| config.get_string("backtest", "data_dir").map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("."));

    Ok(RunSettings {
        symbol,
        start_date: parse_date(config, "start_date")?,
        end_date: parse_date(config, "end_date")?,
        data_dir,
    })
}

pub fn build_backtest_config(config: &dyn ConfigPort) -> Result<BacktestConfig, SignalTraderError> {
    let defaults = BacktestConfig::default();
    Ok(BacktestConfig {
        initial_capital: config
            .get_f64("backtest", "initial_capital")?
            .unwrap_or(defaults.initial_capital),
        risk_free_rate: config
            .get_f64("backtest", "risk_free_rate")?
            .unwrap_or(defaults.risk_free_rate),
    })
}

/// Lower-cased value of `key` if it is set.
fn choice(config: &dyn ConfigPort, section: &str, key: &str) -> Option<String> {
    config.get_string(section, key).map(|v| v.to_lowercase())
}

fn unknown_choice(section: &str, key: &str, value: &str) -> SignalTraderError {
    SignalTraderError::invalid(section, key, format!("unknown value '{value}'"))
}

pub fn build_windows(config: &dyn ConfigPort) -> Result<IndicatorWindows, SignalTraderError> {
    let d = IndicatorWindows::default();
    let window = |key: &str, default: usize| -> Result<usize, SignalTraderError> {
        Ok(config.get_usize("strategy", key)?.unwrap_or(default))
    };

    let moving_average = match choice(config, "strategy", "moving_average").as_deref() {
        None => d.moving_average,
        Some("sma") => MovingAverage::Sma,
        Some("ema") => MovingAverage::Ema,
        Some(other) => return Err(unknown_choice("strategy", "moving_average", other)),
    };
    let oscillator = match choice(config, "strategy", "oscillator").as_deref() {
        None => d.oscillator,
        Some("rsi") => OscillatorSource::Rsi,
        Some("stochastic") => OscillatorSource::Stochastic,
        Some(other) => return Err(unknown_choice("strategy", "oscillator", other)),
    };
    let crossover = match choice(config, "strategy", "crossover").as_deref() {
        None => d.crossover,
        Some("macd") => CrossoverSource::Macd,
        Some("stochastic") => CrossoverSource::Stochastic,
        Some(other) => return Err(unknown_choice("strategy", "crossover", other)),
    };

    Ok(IndicatorWindows {
        moving_average,
        fast_ma: window("fast_ma", d.fast_ma)?,
        slow_ma: window("slow_ma", d.slow_ma)?,
        oscillator,
        rsi: window("rsi", d.rsi)?,
        crossover,
        macd_fast: window("macd_fast", d.macd_fast)?,
        macd_slow: window("macd_slow", d.macd_slow)?,
        macd_signal: window("macd_signal", d.macd_signal)?,
        bollinger: window("bollinger", d.bollinger)?,
        bollinger_width: config
            .get_f64("strategy", "bollinger_width")?
            .unwrap_or(d.bollinger_width),
        stochastic: window("stochastic", d.stochastic)?,
        stochastic_smooth: window("stochastic_smooth", d.stochastic_smooth)?,
    })
}

pub fn build_sizing(config: &dyn ConfigPort) -> Result<SizingMode, SignalTraderError> {
    match choice(config, "strategy", "sizing").as_deref() {
        None | Some("fixed") => Ok(SizingMode::Fixed {
            fraction: config
                .get_f64("strategy", "position_size")?
                .unwrap_or(DEFAULT_FIXED_FRACTION),
        }),
        Some("risk") => Ok(SizingMode::Risk {
            risk_fraction: config
                .get_f64("strategy", "risk_fraction")?
                .unwrap_or(DEFAULT_RISK_FRACTION),
            stop_loss_pct: config
                .get_f64("strategy", "stop_loss_pct")?
                .unwrap_or(DEFAULT_STOP_LOSS_PCT),
        }),
        Some(other) => Err(unknown_choice("strategy", "sizing", other)),
    }
}

pub fn build_signal_config(config: &dyn ConfigPort) -> Result<SignalConfig, SignalTraderError> {
    let d = SignalConfig::default();
    let dw = RuleWeights::default();
    let number = |key: &str, default: f64| -> Result<f64, SignalTraderError> {
        Ok(config.get_f64("signal", key)?.unwrap_or(default))
    };

    let warmup = match choice(config, "signal", "warmup").as_deref() {
        None => d.warmup,
        Some("flat") => WarmupPolicy::Flat,
        Some("reject") => WarmupPolicy::Reject,
        Some(other) => return Err(unknown_choice("signal", "warmup", other)),
    };

    Ok(SignalConfig {
        weights: RuleWeights {
            trend: number("trend_weight", dw.trend)?,
            overbought: number("overbought_weight", dw.overbought)?,
            oversold: number("oversold_weight", dw.oversold)?,
            crossover: number("crossover_weight", dw.crossover)?,
        },
        overbought_level: number("overbought_level", d.overbought_level)?,
        oversold_level: number("oversold_level", d.oversold_level)?,
        long_threshold: number("long_threshold", d.long_threshold)?,
        exit_threshold: number("exit_threshold", d.exit_threshold)?,
        warmup,
    })
}

pub fn build_strategy(config: &dyn ConfigPort) -> Result<Strategy, SignalTraderError> {
    Ok(Strategy {
        name: config
            .get_string("strategy", "name")
            .unwrap_or_else(|| "Default".to_string()),
        windows: build_windows(config)?,
        signal: build_signal_config(config)?,
        sizing: build_sizing(config)?,
    })
}

fn load_bars(
    data_port: &dyn DataPort,
    settings: &RunSettings,
) -> Result<Vec<PriceBar>, SignalTraderError> {
    let bars = data_port.fetch_bars(&settings.symbol, settings.start_date, settings.end_date)?;
    info!(symbol = %settings.symbol, bars = bars.len(), "loaded price data");
    Ok(bars)
}

/// Fetch bars, derive decisions, replay them and summarise the run.
pub fn run_backtest_pipeline(
    data_port: &dyn DataPort,
    provider: &dyn IndicatorProvider,
    strategy: &Strategy,
    bt_config: &BacktestConfig,
    settings: &RunSettings,
) -> Result<(BacktestResult, Metrics), SignalTraderError> {
    let bars = load_bars(data_port, settings)?;

    let decisions = strategy.decisions(&bars, provider)?;
    let longs = decisions.iter().filter(|d| **d == Decision::Long).count();
    let exits = decisions.iter().filter(|d| **d == Decision::Exit).count();
    info!(strategy = %strategy.name, longs, exits, "generated decisions");

    let sizer = strategy.sizing.sizer();
    let result = backtest_engine::run_backtest(&bars, &decisions, bt_config, sizer.as_ref())?;
    if !result.ledger.overdrafts.is_empty() {
        warn!(
            count = result.ledger.overdrafts.len(),
            "some long decisions were capped at available cash"
        );
    }

    let metrics = Metrics::from_result(&result, bt_config.risk_free_rate);
    Ok((result, metrics))
}

fn run_backtest(
    config_path: &Path,
    symbol: Option<String>,
    data_dir: Option<PathBuf>,
    output_path: Option<&Path>,
) -> Result<(), SignalTraderError> {
    let config = load_config(config_path)?;
    let strategy = build_strategy(&config)?;
    let bt_config = build_backtest_config(&config)?;
    let settings = build_run_settings(&config, symbol, data_dir)?;
    info!(strategy = %strategy.name, symbol = %settings.symbol, "running backtest");

    let data_port = CsvAdapter::new(settings.data_dir.clone());
    let (result, metrics) =
        run_backtest_pipeline(&data_port, &TechnicalIndicators, &strategy, &bt_config, &settings)?;

    print_summary(&strategy, &settings, &metrics);

    if let Some(path) = output_path {
        CsvReportAdapter::new().write(&result, &metrics, path)?;
        eprintln!("\nReport written to: {}", path.display());
    }
    Ok(())
}

fn print_summary(strategy: &Strategy, settings: &RunSettings, metrics: &Metrics) {
    eprintln!("\n=== {} on {} ===", strategy.name, settings.symbol);
    eprintln!("Initial Capital:  {:.2}", metrics.initial_capital);
    eprintln!("Final Value:      {:.2}", metrics.final_value);
    eprintln!("Total Return:     {:.2}%", metrics.total_return * 100.0);
    eprintln!(
        "Annualized:       {:.2}%",
        metrics.annualized_return * 100.0
    );
    eprintln!("Sharpe Ratio:     {:.2}", metrics.sharpe_ratio);
    eprintln!("Sortino Ratio:    {:.2}", metrics.sortino_ratio);
    eprintln!(
        "Max Drawdown:     -{:.1}% over {} steps",
        metrics.max_drawdown * 100.0,
        metrics.max_drawdown_duration
    );
    eprintln!("Fills:            {}", metrics.fills);
    eprintln!(
        "Round Trips:      {} ({:.1}% won)",
        metrics.round_trips,
        metrics.win_rate * 100.0
    );
    if metrics.overdrafts > 0 {
        eprintln!("Capped Longs:     {}", metrics.overdrafts);
    }
}

fn run_signals(
    config_path: &Path,
    symbol: Option<String>,
    data_dir: Option<PathBuf>,
) -> Result<(), SignalTraderError> {
    let config = load_config(config_path)?;
    let strategy = build_strategy(&config)?;
    let settings = build_run_settings(&config, symbol, data_dir)?;

    let data_port = CsvAdapter::new(settings.data_dir.clone());
    let bars = load_bars(&data_port, &settings)?;
    let set = strategy.compute_indicators(&bars, &TechnicalIndicators);
    let decisions = strategy.decide_all(&set, bars.len())?;

    write_signal_table(&strategy, &bars, &set, &decisions, io::stdout().lock())
}

fn value_columns(value: Option<IndicatorValue>) -> Vec<String> {
    let fmt = |v: f64| format!("{v:.4}");
    match value {
        None => vec![String::new()],
        Some(IndicatorValue::Simple(v)) => vec![fmt(v)],
        Some(IndicatorValue::Macd { line, signal, .. }) => vec![fmt(line), fmt(signal)],
        Some(IndicatorValue::Stochastic { k, d }) => vec![fmt(k), fmt(d)],
        Some(IndicatorValue::Bollinger {
            upper,
            middle,
            lower,
        }) => vec![fmt(upper), fmt(middle), fmt(lower)],
    }
}

/// Number of CSV columns an indicator occupies.
fn column_count(indicator: &IndicatorType) -> usize {
    match indicator {
        IndicatorType::Macd { .. } | IndicatorType::Stochastic { .. } => 2,
        IndicatorType::Bollinger { .. } => 3,
        _ => 1,
    }
}

fn column_names(indicator: &IndicatorType) -> Vec<String> {
    let name = indicator.to_string();
    match column_count(indicator) {
        2 => vec![format!("{name}.fast"), format!("{name}.slow")],
        3 => vec![
            format!("{name}.upper"),
            format!("{name}.middle"),
            format!("{name}.lower"),
        ],
        _ => vec![name],
    }
}

/// One CSV row per bar: timestamp, close, every computed series, decision.
pub fn write_signal_table<W: Write>(
    strategy: &Strategy,
    bars: &[PriceBar],
    set: &IndicatorSet,
    decisions: &[Decision],
    writer: W,
) -> Result<(), SignalTraderError> {
    let indicators = strategy.required_indicators();
    let csv_err = |e: csv::Error| SignalTraderError::Io(io::Error::other(e));
    let mut wtr = csv::Writer::from_writer(writer);

    let mut header = vec!["timestamp".to_string(), "close".to_string()];
    for indicator in &indicators {
        header.extend(column_names(indicator));
    }
    header.push("decision".to_string());
    wtr.write_record(&header).map_err(csv_err)?;

    for (i, (bar, decision)) in bars.iter().zip(decisions).enumerate() {
        let mut row = vec![bar.timestamp.to_string(), bar.close.to_string()];
        for indicator in &indicators {
            let value = set.get(indicator).and_then(|s| s.value_at(i));
            let mut cols = value_columns(value);
            cols.resize(column_count(indicator), String::new());
            row.extend(cols);
        }
        row.push(decision.to_string());
        wtr.write_record(&row).map_err(csv_err)?;
    }
    wtr.flush()?;
    Ok(())
}

fn run_validate(config_path: &Path) -> Result<(), SignalTraderError> {
    let config = load_config(config_path)?;
    for section in ["backtest", "strategy", "signal"] {
        if !config.has_section(section) {
            warn!(section, "section not present, using defaults");
        }
    }
    let strategy = build_strategy(&config)?;
    build_backtest_config(&config)?;

    eprintln!("Configuration is valid");
    eprintln!("  Strategy:   {}", strategy.name);
    for indicator in strategy.required_indicators() {
        eprintln!("  Indicator:  {} (defined from bar {})", indicator, indicator.warmup());
    }
    let weights: Vec<String> = SignalRule::ALL
        .iter()
        .map(|rule| format!("{}={}", rule.name(), strategy.signal.weights.get(*rule)))
        .collect();
    eprintln!("  Weights:    {}", weights.join(" "));
    match strategy.sizing {
        SizingMode::Fixed { fraction } => eprintln!("  Sizing:     fixed {fraction}"),
        SizingMode::Risk {
            risk_fraction,
            stop_loss_pct,
        } => eprintln!("  Sizing:     risk {risk_fraction} with {stop_loss_pct}% stop"),
    }
    if let Some(symbol) = config.get_string("backtest", "symbol") {
        eprintln!("  Symbol:     {symbol}");
    }
    Ok(())
}

fn run_list_symbols(
    data_dir: Option<PathBuf>,
    config_path: Option<&Path>,
) -> Result<(), SignalTraderError> {
    let data_dir = match (data_dir, config_path) {
        (Some(dir), _) => dir,
        (None, Some(path)) => load_config(path)?
            .get_string("backtest", "data_dir")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(".")),
        (None, None) => PathBuf::from("."),
    };

    let symbols = CsvAdapter::new(data_dir).list_symbols()?;
    let mut out = io::stdout().lock();
    for symbol in symbols {
        writeln!(out, "{symbol}")?;
    }
    Ok(())
}
