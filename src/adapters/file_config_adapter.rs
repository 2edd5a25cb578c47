//! INI file configuration adapter.

use std::path::Path;

use configparser::ini::Ini;

use crate::domain::error::SignalTraderError;
use crate::ports::config_port::ConfigPort;

/// INI-backed configuration. Section and key lookups are case-insensitive.
#[derive(Debug)]
pub struct FileConfigAdapter {
    config: Ini,
}

impl FileConfigAdapter {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, SignalTraderError> {
        let path = path.as_ref();
        let mut config = Ini::new();
        config
            .load(path)
            .map_err(|reason| SignalTraderError::ConfigParse {
                file: path.display().to_string(),
                reason,
            })?;
        Ok(Self { config })
    }

    pub fn from_string(content: &str) -> Result<Self, SignalTraderError> {
        let mut config = Ini::new();
        config
            .read(content.to_string())
            .map_err(|reason| SignalTraderError::ConfigParse {
                file: "<string>".to_string(),
                reason,
            })?;
        Ok(Self { config })
    }
}

impl ConfigPort for FileConfigAdapter {
    fn get_string(&self, section: &str, key: &str) -> Option<String> {
        self.config
            .get(section, key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn has_section(&self, section: &str) -> bool {
        let section = section.to_lowercase();
        self.config.sections().iter().any(|s| *s == section)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{}", content).unwrap();
        file
    }

    #[test]
    fn from_string_parses_config() {
        let content = r#"
[backtest]
initial_capital = 100000.0
symbol = SPY

[strategy]
name = Trend Vote
fast_ma = 20
"#;
        let adapter = FileConfigAdapter::from_string(content).unwrap();
        assert_eq!(adapter.get_string("backtest", "symbol"), Some("SPY".to_string()));
        assert_eq!(
            adapter.get_string("strategy", "name"),
            Some("Trend Vote".to_string())
        );
        assert!(adapter.has_section("strategy"));
        assert!(adapter.has_section("Backtest"));
        assert!(!adapter.has_section("signal"));
    }

    #[test]
    fn get_string_returns_none_for_missing_or_blank_key() {
        let adapter =
            FileConfigAdapter::from_string("[backtest]\ninitial_capital = 100\nsymbol =\n").unwrap();
        assert_eq!(adapter.get_string("backtest", "missing"), None);
        assert_eq!(adapter.get_string("backtest", "symbol"), None);
        assert_eq!(adapter.get_string("missing_section", "key"), None);
    }

    #[test]
    fn require_string_reports_missing_key() {
        let adapter = FileConfigAdapter::from_string("[backtest]\n").unwrap();
        let err = adapter.require_string("backtest", "symbol").unwrap_err();
        assert!(
            matches!(err, SignalTraderError::ConfigMissing { section, key } if section == "backtest" && key == "symbol")
        );
    }

    #[test]
    fn get_usize_parses_value() {
        let adapter = FileConfigAdapter::from_string("[strategy]\nfast_ma = 5\n").unwrap();
        assert_eq!(adapter.get_usize("strategy", "fast_ma").unwrap(), Some(5));
        assert_eq!(adapter.get_usize("strategy", "slow_ma").unwrap(), None);
    }

    #[test]
    fn get_usize_rejects_non_numeric_and_negative() {
        let adapter =
            FileConfigAdapter::from_string("[strategy]\nfast_ma = abc\nslow_ma = -3\n").unwrap();
        for key in ["fast_ma", "slow_ma"] {
            let err = adapter.get_usize("strategy", key).unwrap_err();
            assert!(matches!(err, SignalTraderError::ConfigInvalid { key: k, .. } if k == key));
        }
    }

    #[test]
    fn get_f64_parses_value() {
        let adapter =
            FileConfigAdapter::from_string("[backtest]\ninitial_capital = 100000.5\n").unwrap();
        assert_eq!(
            adapter.get_f64("backtest", "initial_capital").unwrap(),
            Some(100000.5)
        );
    }

    #[test]
    fn get_f64_rejects_non_numeric_and_non_finite() {
        let adapter = FileConfigAdapter::from_string(
            "[backtest]\ninitial_capital = not_a_number\nrisk_free_rate = inf\n",
        )
        .unwrap();
        assert!(adapter.get_f64("backtest", "initial_capital").is_err());
        assert!(adapter.get_f64("backtest", "risk_free_rate").is_err());
    }

    #[test]
    fn get_bool_values() {
        let adapter = FileConfigAdapter::from_string(
            "[signal]\na = true\nb = yes\nc = 1\nd = FALSE\ne = no\nf = 0\ng = maybe\n",
        )
        .unwrap();
        for key in ["a", "b", "c"] {
            assert_eq!(adapter.get_bool("signal", key).unwrap(), Some(true));
        }
        for key in ["d", "e", "f"] {
            assert_eq!(adapter.get_bool("signal", key).unwrap(), Some(false));
        }
        assert!(adapter.get_bool("signal", "g").is_err());
        assert_eq!(adapter.get_bool("signal", "missing").unwrap(), None);
    }

    #[test]
    fn from_file_reads_config() {
        let file = create_temp_config("[backtest]\ndata_dir = /path/to/data\n");
        let adapter = FileConfigAdapter::from_file(file.path()).unwrap();
        assert_eq!(
            adapter.get_string("backtest", "data_dir"),
            Some("/path/to/data".to_string())
        );
    }

    #[test]
    fn from_file_returns_parse_error_for_missing_file() {
        let err = FileConfigAdapter::from_file("/nonexistent/path/config.ini").unwrap_err();
        assert!(matches!(err, SignalTraderError::ConfigParse { .. }));
    }

    #[test]
    fn handles_all_config_sections() {
        let content = r#"
[backtest]
initial_capital = 100000.0
risk_free_rate = 0.02

[strategy]
sizing = risk
stop_loss_pct = 5

[signal]
warmup = reject
trend_weight = 2
"#;
        let adapter = FileConfigAdapter::from_string(content).unwrap();

        assert_eq!(adapter.get_f64("backtest", "risk_free_rate").unwrap(), Some(0.02));
        assert_eq!(adapter.get_string("strategy", "sizing"), Some("risk".to_string()));
        assert_eq!(adapter.get_f64("strategy", "stop_loss_pct").unwrap(), Some(5.0));
        assert_eq!(adapter.get_string("signal", "warmup"), Some("reject".to_string()));
        assert_eq!(adapter.get_f64("signal", "trend_weight").unwrap(), Some(2.0));
    }
}
