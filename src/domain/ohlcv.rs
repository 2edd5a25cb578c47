//! Price bar representation.

use chrono::NaiveDateTime;

use super::error::SignalTraderError;

#[derive(Debug, Clone, PartialEq)]
pub struct PriceBar {
    pub timestamp: NaiveDateTime,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl PriceBar {
    /// A bar whose every price field equals `close`.
    pub fn flat(timestamp: NaiveDateTime, close: f64) -> Self {
        PriceBar {
            timestamp,
            open: close,
            high: close,
            low: close,
            close,
            volume: 0.0,
        }
    }

    pub fn range(&self) -> f64 {
        self.high - self.low
    }
}

pub fn closes(bars: &[PriceBar]) -> Vec<f64> {
    bars.iter().map(|b| b.close).collect()
}

/// Index of the first bar whose timestamp does not strictly follow its predecessor.
pub fn first_unordered(bars: &[PriceBar]) -> Option<usize> {
    bars.windows(2)
        .position(|w| w[1].timestamp <= w[0].timestamp)
        .map(|i| i + 1)
}

/// Check ordering and field sanity of a loaded series.
pub fn validate_bars(bars: &[PriceBar]) -> Result<(), SignalTraderError> {
    if let Some(index) = first_unordered(bars) {
        return Err(SignalTraderError::Data {
            reason: format!(
                "bar {index} ({}) does not follow {}",
                bars[index].timestamp,
                bars[index - 1].timestamp
            ),
        });
    }
    for bar in bars {
        let prices = [bar.open, bar.high, bar.low, bar.close];
        if prices.iter().any(|p| !p.is_finite() || *p <= 0.0) {
            return Err(SignalTraderError::Data {
                reason: format!("non-positive or non-finite price at {}", bar.timestamp),
            });
        }
        if bar.high < bar.low {
            return Err(SignalTraderError::Data {
                reason: format!("high below low at {}", bar.timestamp),
            });
        }
        if !bar.volume.is_finite() || bar.volume < 0.0 {
            return Err(SignalTraderError::Data {
                reason: format!("invalid volume at {}", bar.timestamp),
            });
        }
    }
    Ok(())
}
