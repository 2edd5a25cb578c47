//! CSV report adapter: one row per backtest step plus a key/value summary.

use std::io;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::domain::backtest::BacktestResult;
use crate::domain::error::SignalTraderError;
use crate::domain::metrics::Metrics;
use crate::ports::report_port::ReportPort;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, Copy, Default)]
pub struct CsvReportAdapter;

impl CsvReportAdapter {
    pub fn new() -> Self {
        CsvReportAdapter
    }

    /// `<dir>/<stem>_summary.csv` next to the trajectory file.
    pub fn summary_path(output_path: &Path) -> PathBuf {
        let stem = output_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "report".to_string());
        output_path.with_file_name(format!("{stem}_summary.csv"))
    }

    pub fn write_steps<W: io::Write>(
        &self,
        result: &BacktestResult,
        writer: W,
    ) -> Result<(), SignalTraderError> {
        let mut wtr = csv::Writer::from_writer(writer);
        wtr.write_record([
            "timestamp",
            "decision",
            "close",
            "cash",
            "position_units",
            "total_value",
        ])
        .map_err(csv_error)?;

        for (point, step) in result.equity_curve.iter().zip(&result.steps) {
            wtr.write_record([
                point.timestamp.format(TIMESTAMP_FORMAT).to_string(),
                step.decision.to_string(),
                step.price.to_string(),
                step.cash.to_string(),
                step.position_units.to_string(),
                step.total_value.to_string(),
            ])
            .map_err(csv_error)?;
        }
        wtr.flush()?;
        Ok(())
    }

    pub fn write_summary<W: io::Write>(
        &self,
        metrics: &Metrics,
        writer: W,
    ) -> Result<(), SignalTraderError> {
        let rows: [(&str, String); 14] = [
            ("initial_capital", metrics.initial_capital.to_string()),
            ("final_value", metrics.final_value.to_string()),
            ("total_return", metrics.total_return.to_string()),
            ("annualized_return", metrics.annualized_return.to_string()),
            ("sharpe_ratio", metrics.sharpe_ratio.to_string()),
            ("sortino_ratio", metrics.sortino_ratio.to_string()),
            ("max_drawdown", metrics.max_drawdown.to_string()),
            (
                "max_drawdown_duration",
                metrics.max_drawdown_duration.to_string(),
            ),
            ("fills", metrics.fills.to_string()),
            ("round_trips", metrics.round_trips.to_string()),
            ("trades_won", metrics.trades_won.to_string()),
            ("trades_lost", metrics.trades_lost.to_string()),
            ("win_rate", metrics.win_rate.to_string()),
            ("overdrafts", metrics.overdrafts.to_string()),
        ];

        let mut wtr = csv::Writer::from_writer(writer);
        wtr.write_record(["metric", "value"]).map_err(csv_error)?;
        for (name, value) in rows {
            wtr.write_record([name, value.as_str()]).map_err(csv_error)?;
        }
        wtr.flush()?;
        Ok(())
    }
}

fn csv_error(err: csv::Error) -> SignalTraderError {
    SignalTraderError::Io(io::Error::other(err))
}

impl ReportPort for CsvReportAdapter {
    fn write(
        &self,
        result: &BacktestResult,
        metrics: &Metrics,
        output_path: &Path,
    ) -> Result<(), SignalTraderError> {
        self.write_steps(result, std::fs::File::create(output_path)?)?;
        let summary = Self::summary_path(output_path);
        self.write_summary(metrics, std::fs::File::create(&summary)?)?;
        info!(
            report = %output_path.display(),
            summary = %summary.display(),
            "wrote report"
        );
        Ok(())
    }
}
