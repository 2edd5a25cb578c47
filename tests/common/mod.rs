#![allow(dead_code)]

use chrono::{NaiveDate, NaiveDateTime};
use signaltrader::domain::error::SignalTraderError;
pub use signaltrader::domain::ohlcv::PriceBar;
use signaltrader::domain::signal::SignalConfig;
use signaltrader::domain::strategy::{IndicatorWindows, Strategy};
use signaltrader::ports::data_port::DataPort;
use std::collections::HashMap;
use std::io::Write;

pub struct MockDataPort {
    pub data: HashMap<String, Vec<PriceBar>>,
    pub errors: HashMap<String, String>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_bars(mut self, symbol: &str, bars: Vec<PriceBar>) -> Self {
        self.data.insert(symbol.to_string(), bars);
        self
    }

    pub fn with_error(mut self, symbol: &str, reason: &str) -> Self {
        self.errors.insert(symbol.to_string(), reason.to_string());
        self
    }
}

impl DataPort for MockDataPort {
    fn fetch_bars(
        &self,
        symbol: &str,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<Vec<PriceBar>, SignalTraderError> {
        if let Some(reason) = self.errors.get(symbol) {
            return Err(SignalTraderError::Data {
                reason: reason.clone(),
            });
        }
        let bars: Vec<PriceBar> = self
            .data
            .get(symbol)
            .map(|bars| {
                bars.iter()
                    .filter(|b| start.is_none_or(|s| b.timestamp.date() >= s))
                    .filter(|b| end.is_none_or(|e| b.timestamp.date() <= e))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        if bars.is_empty() {
            return Err(SignalTraderError::NoData {
                symbol: symbol.to_string(),
            });
        }
        Ok(bars)
    }

    fn list_symbols(&self) -> Result<Vec<String>, SignalTraderError> {
        let mut symbols: Vec<String> = self.data.keys().cloned().collect();
        symbols.sort();
        Ok(symbols)
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn day(offset: usize) -> NaiveDateTime {
    date(2024, 1, 1).and_hms_opt(0, 0, 0).unwrap() + chrono::Duration::days(offset as i64)
}

/// Daily bars with the given closes; high/low one point either side.
pub fn make_bars(closes: &[f64]) -> Vec<PriceBar> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| PriceBar {
            timestamp: day(i),
            open: close,
            high: close + 1.0,
            low: (close - 1.0).max(0.01),
            close,
            volume: 1000.0,
        })
        .collect()
}

/// A dip, a long rally, then a slide: enough movement for every rule to fire.
pub fn swing_closes(count: usize) -> Vec<f64> {
    (0..count)
        .map(|i| {
            let t = i as f64;
            100.0 + 15.0 * (t / 12.0).sin() + 0.2 * t
        })
        .collect()
}

/// Strategy with windows short enough for a few dozen bars. The thresholds
/// let trend and crossover agreement alone open a position, since a smooth
/// rally pins the oscillator above the overbought level.
pub fn short_window_strategy() -> Strategy {
    Strategy {
        name: "Short Windows".into(),
        windows: IndicatorWindows {
            fast_ma: 3,
            slow_ma: 8,
            rsi: 5,
            macd_fast: 3,
            macd_slow: 6,
            macd_signal: 3,
            bollinger: 5,
            stochastic: 5,
            stochastic_smooth: 2,
            ..IndicatorWindows::default()
        },
        signal: SignalConfig {
            long_threshold: 0.5,
            exit_threshold: -0.5,
            ..SignalConfig::default()
        },
        ..Strategy::default()
    }
}

pub fn write_temp_file(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

pub fn bars_csv(bars: &[PriceBar]) -> String {
    let mut out = String::from("timestamp,open,high,low,close,volume\n");
    for bar in bars {
        out.push_str(&format!(
            "{},{},{},{},{},{}\n",
            bar.timestamp.format("%Y-%m-%d"),
            bar.open,
            bar.high,
            bar.low,
            bar.close,
            bar.volume
        ));
    }
    out
}
