//! Domain error types.

/// Structural problems with backtest inputs, or a ledger fault mid-run.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BacktestError {
    #[error("length mismatch: {prices} prices but {decisions} decisions")]
    LengthMismatch { prices: usize, decisions: usize },

    #[error("invalid close price at step {index}: {price}")]
    InvalidPrice { index: usize, price: f64 },

    #[error("timestamps not strictly increasing at step {index}")]
    UnorderedTimestamps { index: usize },

    #[error("initial capital must be positive and finite, got {0}")]
    InvalidCapital(f64),

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

/// Rejected ledger update. The ledger state is untouched when one is returned.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LedgerError {
    #[error("invalid price at step {index}: {price}")]
    InvalidPrice { index: usize, price: f64 },

    #[error("invalid position fraction at step {index}: {fraction}")]
    InvalidFraction { index: usize, fraction: f64 },
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SignalError {
    #[error("insufficient history for {indicator} at step {index}")]
    InsufficientHistory { index: usize, indicator: String },

    #[error("indicator series {0} was not computed")]
    MissingSeries(String),

    #[error("indicator series {indicator} has {actual} points, expected {expected}")]
    MisalignedSeries {
        indicator: String,
        expected: usize,
        actual: usize,
    },

    #[error("indicator {indicator} cannot be used as {input}")]
    UnsupportedSource { indicator: String, input: String },
}

/// Top-level error type for signaltrader.
#[derive(Debug, thiserror::Error)]
pub enum SignalTraderError {
    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("data error: {reason}")]
    Data { reason: String },

    #[error("no data for {symbol}")]
    NoData { symbol: String },

    #[error(transparent)]
    Signal(#[from] SignalError),

    #[error(transparent)]
    Backtest(#[from] BacktestError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl SignalTraderError {
    pub fn invalid(section: &str, key: &str, reason: impl Into<String>) -> Self {
        SignalTraderError::ConfigInvalid {
            section: section.to_string(),
            key: key.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<&SignalTraderError> for std::process::ExitCode {
    fn from(err: &SignalTraderError) -> Self {
        let code: u8 = match err {
            SignalTraderError::Io(_) => 1,
            SignalTraderError::ConfigParse { .. }
            | SignalTraderError::ConfigMissing { .. }
            | SignalTraderError::ConfigInvalid { .. } => 2,
            SignalTraderError::Data { .. } | SignalTraderError::NoData { .. } => 3,
            SignalTraderError::Signal(_) | SignalTraderError::Backtest(_) => 4,
        };
        std::process::ExitCode::from(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ledger_error_lifts_into_backtest_error() {
        let err: BacktestError = LedgerError::InvalidFraction {
            index: 3,
            fraction: -0.5,
        }
        .into();
        assert_eq!(
            err.to_string(),
            "invalid position fraction at step 3: -0.5"
        );
    }

    #[test]
    fn length_mismatch_message() {
        let err = BacktestError::LengthMismatch {
            prices: 3,
            decisions: 2,
        };
        assert_eq!(err.to_string(), "length mismatch: 3 prices but 2 decisions");
    }

    #[test]
    fn invalid_helper_builds_config_error() {
        let err = SignalTraderError::invalid("strategy", "fast_ma", "must be positive");
        assert_eq!(
            err.to_string(),
            "invalid config value [strategy] fast_ma: must be positive"
        );
    }
}
