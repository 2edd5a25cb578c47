//! Configuration validation.
//!
//! Checks every recognised key before a run starts. Absent keys fall back to
//! defaults and pass; present keys must parse and lie in range.

use chrono::NaiveDate;

use crate::domain::error::SignalTraderError;
use crate::domain::strategy::IndicatorWindows;
use crate::ports::config_port::ConfigPort;

pub const WINDOW_KEYS: [&str; 9] = [
    "fast_ma",
    "slow_ma",
    "rsi",
    "macd_fast",
    "macd_slow",
    "macd_signal",
    "bollinger",
    "stochastic",
    "stochastic_smooth",
];

pub const WEIGHT_KEYS: [&str; 4] = [
    "trend_weight",
    "overbought_weight",
    "oversold_weight",
    "crossover_weight",
];

pub fn validate_all(config: &dyn ConfigPort) -> Result<(), SignalTraderError> {
    validate_backtest_config(config)?;
    validate_strategy_config(config)?;
    validate_signal_config(config)?;
    Ok(())
}

pub fn validate_backtest_config(config: &dyn ConfigPort) -> Result<(), SignalTraderError> {
    if let Some(capital) = config.get_f64("backtest", "initial_capital")? {
        if capital <= 0.0 {
            return Err(SignalTraderError::invalid(
                "backtest",
                "initial_capital",
                "initial_capital must be positive",
            ));
        }
    }
    if let Some(rate) = config.get_f64("backtest", "risk_free_rate")? {
        if !(0.0..1.0).contains(&rate) {
            return Err(SignalTraderError::invalid(
                "backtest",
                "risk_free_rate",
                "risk_free_rate must be between 0 and 1",
            ));
        }
    }
    validate_dates(config)?;
    Ok(())
}

fn validate_dates(config: &dyn ConfigPort) -> Result<(), SignalTraderError> {
    let start = parse_date(config, "start_date")?;
    let end = parse_date(config, "end_date")?;
    if let (Some(start), Some(end)) = (start, end) {
        if start > end {
            return Err(SignalTraderError::invalid(
                "backtest",
                "start_date",
                "start_date must not be after end_date",
            ));
        }
    }
    Ok(())
}

pub fn parse_date(
    config: &dyn ConfigPort,
    key: &str,
) -> Result<Option<NaiveDate>, SignalTraderError> {
    config
        .get_string("backtest", key)
        .map(|s| {
            NaiveDate::parse_from_str(&s, "%Y-%m-%d").map_err(|_| {
                SignalTraderError::invalid(
                    "backtest",
                    key,
                    format!("invalid {key} format, expected YYYY-MM-DD"),
                )
            })
        })
        .transpose()
}

pub fn validate_strategy_config(config: &dyn ConfigPort) -> Result<(), SignalTraderError> {
    for key in WINDOW_KEYS {
        if config.get_usize("strategy", key)? == Some(0) {
            return Err(SignalTraderError::invalid(
                "strategy",
                key,
                format!("{key} must be at least 1"),
            ));
        }
    }
    let defaults = IndicatorWindows::default();
    validate_window_order(
        config,
        ("fast_ma", defaults.fast_ma),
        ("slow_ma", defaults.slow_ma),
    )?;
    validate_window_order(
        config,
        ("macd_fast", defaults.macd_fast),
        ("macd_slow", defaults.macd_slow),
    )?;

    if let Some(width) = config.get_f64("strategy", "bollinger_width")? {
        if width <= 0.0 {
            return Err(SignalTraderError::invalid(
                "strategy",
                "bollinger_width",
                "bollinger_width must be positive",
            ));
        }
    }

    check_choice(config, "strategy", "moving_average", &["sma", "ema"])?;
    check_choice(config, "strategy", "oscillator", &["rsi", "stochastic"])?;
    check_choice(config, "strategy", "crossover", &["macd", "stochastic"])?;
    check_choice(config, "strategy", "sizing", &["fixed", "risk"])?;

    if let Some(size) = config.get_f64("strategy", "position_size")? {
        if size <= 0.0 || size > 1.0 {
            return Err(SignalTraderError::invalid(
                "strategy",
                "position_size",
                "position_size must be between 0 and 1",
            ));
        }
    }
    if let Some(fraction) = config.get_f64("strategy", "risk_fraction")? {
        if fraction <= 0.0 || fraction > 1.0 {
            return Err(SignalTraderError::invalid(
                "strategy",
                "risk_fraction",
                "risk_fraction must be between 0 and 1",
            ));
        }
    }
    if let Some(pct) = config.get_f64("strategy", "stop_loss_pct")? {
        if pct <= 0.0 || pct >= 100.0 {
            return Err(SignalTraderError::invalid(
                "strategy",
                "stop_loss_pct",
                "stop_loss_pct must be between 0 and 100",
            ));
        }
    }
    Ok(())
}

/// `fast` must be shorter than `slow`. A missing key takes its default, and
/// the error names whichever key was set.
fn validate_window_order(
    config: &dyn ConfigPort,
    (fast, default_fast): (&str, usize),
    (slow, default_slow): (&str, usize),
) -> Result<(), SignalTraderError> {
    let set_fast = config.get_usize("strategy", fast)?;
    let set_slow = config.get_usize("strategy", slow)?;
    if set_fast.is_none() && set_slow.is_none() {
        return Ok(());
    }
    let f = set_fast.unwrap_or(default_fast);
    let s = set_slow.unwrap_or(default_slow);
    if f >= s {
        let key = if set_fast.is_some() { fast } else { slow };
        return Err(SignalTraderError::invalid(
            "strategy",
            key,
            format!("{fast} ({f}) must be shorter than {slow} ({s})"),
        ));
    }
    Ok(())
}

fn check_choice(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    allowed: &[&str],
) -> Result<(), SignalTraderError> {
    match config.get_string(section, key) {
        Some(value) if !allowed.contains(&value.to_lowercase().as_str()) => {
            Err(SignalTraderError::invalid(
                section,
                key,
                format!("expected one of {}, got '{value}'", allowed.join("|")),
            ))
        }
        _ => Ok(()),
    }
}

pub fn validate_signal_config(config: &dyn ConfigPort) -> Result<(), SignalTraderError> {
    for key in WEIGHT_KEYS {
        if let Some(weight) = config.get_f64("signal", key)? {
            if weight < 0.0 {
                return Err(SignalTraderError::invalid(
                    "signal",
                    key,
                    format!("{key} must be non-negative"),
                ));
            }
        }
    }

    let overbought = config.get_f64("signal", "overbought_level")?;
    let oversold = config.get_f64("signal", "oversold_level")?;
    for (key, level) in [("overbought_level", overbought), ("oversold_level", oversold)] {
        if level.is_some_and(|l| !(0.0..=100.0).contains(&l)) {
            return Err(SignalTraderError::invalid(
                "signal",
                key,
                format!("{key} must be between 0 and 100"),
            ));
        }
    }
    if let (Some(high), Some(low)) = (overbought, oversold) {
        if low >= high {
            return Err(SignalTraderError::invalid(
                "signal",
                "oversold_level",
                "oversold_level must be below overbought_level",
            ));
        }
    }

    let long = config.get_f64("signal", "long_threshold")?;
    let exit = config.get_f64("signal", "exit_threshold")?;
    if let (Some(long), Some(exit)) = (long, exit) {
        if exit >= long {
            return Err(SignalTraderError::invalid(
                "signal",
                "exit_threshold",
                "exit_threshold must be below long_threshold",
            ));
        }
    }

    check_choice(config, "signal", "warmup", &["flat", "reject"])?;
    Ok(())
}
