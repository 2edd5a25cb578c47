//! Configuration access port trait.

use std::str::FromStr;

use crate::domain::error::SignalTraderError;

/// Read access to sectioned key/value configuration.
///
/// Implementors provide raw string lookup; the typed getters parse on top of
/// it and report unparsable values as `ConfigInvalid` rather than falling
/// back to a default.
pub trait ConfigPort {
    /// Trimmed value of `key`, or `None` if absent or blank.
    fn get_string(&self, section: &str, key: &str) -> Option<String>;

    fn has_section(&self, section: &str) -> bool;

    fn require_string(&self, section: &str, key: &str) -> Result<String, SignalTraderError> {
        self.get_string(section, key)
            .ok_or_else(|| SignalTraderError::ConfigMissing {
                section: section.to_string(),
                key: key.to_string(),
            })
    }

    fn get_f64(&self, section: &str, key: &str) -> Result<Option<f64>, SignalTraderError> {
        let value: Option<f64> = parse_value(self, section, key, "a number")?;
        match value {
            Some(v) if !v.is_finite() => Err(SignalTraderError::invalid(
                section,
                key,
                format!("expected a finite number, got {v}"),
            )),
            other => Ok(other),
        }
    }

    fn get_usize(&self, section: &str, key: &str) -> Result<Option<usize>, SignalTraderError> {
        parse_value(self, section, key, "a non-negative integer")
    }

    fn get_bool(&self, section: &str, key: &str) -> Result<Option<bool>, SignalTraderError> {
        let Some(raw) = self.get_string(section, key) else {
            return Ok(None);
        };
        match raw.to_lowercase().as_str() {
            "true" | "yes" | "1" => Ok(Some(true)),
            "false" | "no" | "0" => Ok(Some(false)),
            _ => Err(SignalTraderError::invalid(
                section,
                key,
                format!("expected a boolean, got '{raw}'"),
            )),
        }
    }
}

fn parse_value<T: FromStr, C: ConfigPort + ?Sized>(
    config: &C,
    section: &str,
    key: &str,
    expected: &str,
) -> Result<Option<T>, SignalTraderError> {
    config
        .get_string(section, key)
        .map(|raw| {
            raw.parse::<T>().map_err(|_| {
                SignalTraderError::invalid(section, key, format!("expected {expected}, got '{raw}'"))
            })
        })
        .transpose()
}
