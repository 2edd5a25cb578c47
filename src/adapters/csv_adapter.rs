//! CSV file price data adapter.
//!
//! Each symbol lives in `<base>/<SYMBOL>.csv` with a header row naming at
//! least `timestamp,open,high,low,close,volume` (any column order). A
//! timestamp is either `YYYY-MM-DD` (read as midnight) or
//! `YYYY-MM-DD HH:MM:SS`.

use std::fs;
use std::path::PathBuf;

use chrono::{NaiveDate, NaiveDateTime};
use csv::StringRecord;
use tracing::debug;

use crate::domain::error::SignalTraderError;
use crate::domain::ohlcv::{self, PriceBar};
use crate::ports::data_port::DataPort;

const COLUMNS: [&str; 6] = ["timestamp", "open", "high", "low", "close", "volume"];

pub struct CsvAdapter {
    base_path: PathBuf,
}

impl CsvAdapter {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    fn csv_path(&self, symbol: &str) -> PathBuf {
        self.base_path.join(format!("{symbol}.csv"))
    }
}

pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

fn data_error(reason: String) -> SignalTraderError {
    SignalTraderError::Data { reason }
}

/// Position of each required column in the header.
fn column_indices(headers: &StringRecord) -> Result<[usize; 6], SignalTraderError> {
    let mut indices = [0usize; 6];
    for (slot, name) in indices.iter_mut().zip(COLUMNS) {
        *slot = headers
            .iter()
            .position(|h| h.trim().eq_ignore_ascii_case(name))
            .ok_or_else(|| data_error(format!("missing {name} column")))?;
    }
    Ok(indices)
}

fn field<'r>(
    record: &'r StringRecord,
    index: usize,
    name: &str,
    line: u64,
) -> Result<&'r str, SignalTraderError> {
    record
        .get(index)
        .map(str::trim)
        .ok_or_else(|| data_error(format!("line {line}: missing {name} value")))
}

fn number(
    record: &StringRecord,
    index: usize,
    name: &str,
    line: u64,
) -> Result<f64, SignalTraderError> {
    let raw = field(record, index, name, line)?;
    raw.parse()
        .map_err(|e| data_error(format!("line {line}: invalid {name} value '{raw}': {e}")))
}

fn parse_record(
    record: &StringRecord,
    columns: &[usize; 6],
) -> Result<PriceBar, SignalTraderError> {
    let line = record.position().map(|p| p.line()).unwrap_or(0);
    let raw_ts = field(record, columns[0], "timestamp", line)?;
    let timestamp = parse_timestamp(raw_ts)
        .ok_or_else(|| data_error(format!("line {line}: invalid timestamp '{raw_ts}'")))?;

    Ok(PriceBar {
        timestamp,
        open: number(record, columns[1], "open", line)?,
        high: number(record, columns[2], "high", line)?,
        low: number(record, columns[3], "low", line)?,
        close: number(record, columns[4], "close", line)?,
        volume: number(record, columns[5], "volume", line)?,
    })
}

impl DataPort for CsvAdapter {
    fn fetch_bars(
        &self,
        symbol: &str,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<Vec<PriceBar>, SignalTraderError> {
        let path = self.csv_path(symbol);
        let content = fs::read_to_string(&path)
            .map_err(|e| data_error(format!("failed to read {}: {}", path.display(), e)))?;

        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(content.as_bytes());
        let headers = rdr
            .headers()
            .map_err(|e| data_error(format!("CSV header error: {e}")))?
            .clone();
        let columns = column_indices(&headers)?;

        let mut bars = Vec::new();
        for result in rdr.records() {
            let record = result.map_err(|e| data_error(format!("CSV parse error: {e}")))?;
            let bar = parse_record(&record, &columns)?;
            let date = bar.timestamp.date();
            if start.is_some_and(|s| date < s) || end.is_some_and(|e| date > e) {
                continue;
            }
            bars.push(bar);
        }

        bars.sort_by_key(|b| b.timestamp);
        ohlcv::validate_bars(&bars)?;

        if bars.is_empty() {
            return Err(SignalTraderError::NoData {
                symbol: symbol.to_string(),
            });
        }
        debug!(symbol, bars = bars.len(), path = %path.display(), "loaded price bars");
        Ok(bars)
    }

    fn list_symbols(&self) -> Result<Vec<String>, SignalTraderError> {
        let entries = fs::read_dir(&self.base_path).map_err(|e| {
            data_error(format!(
                "failed to read directory {}: {}",
                self.base_path.display(),
                e
            ))
        })?;

        let mut symbols = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| data_error(format!("directory entry error: {e}")))?;
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "csv") {
                if let Some(stem) = path.file_stem() {
                    symbols.push(stem.to_string_lossy().into_owned());
                }
            }
        }

        symbols.sort();
        Ok(symbols)
    }
}
