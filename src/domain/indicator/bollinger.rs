//! Bollinger Bands indicator.
//!
//! - Middle: Simple Moving Average (SMA) over n periods
//! - Upper: Middle + (width × StdDev)
//! - Lower: Middle - (width × StdDev)
//!
//! StdDev is the sample standard deviation (divides by N-1); a one-bar
//! window has zero spread.
//!
//! Default parameters: period=20, width=2.0
//! Warmup: first (period-1) bars are undefined.

use crate::domain::indicator::{series_from, IndicatorSeries, IndicatorType, IndicatorValue};
use crate::domain::ohlcv::PriceBar;

pub const DEFAULT_PERIOD: usize = 20;
pub const DEFAULT_WIDTH: f64 = 2.0;

pub fn calculate_bollinger(bars: &[PriceBar], period: usize, width: f64) -> IndicatorSeries {
    let values = (0..bars.len()).map(|i| {
        if period == 0 || i + 1 < period {
            return None;
        }
        let window = &bars[i + 1 - period..=i];

        let middle: f64 = window.iter().map(|b| b.close).sum::<f64>() / period as f64;
        let stddev = if period > 1 {
            let sum_sq: f64 = window
                .iter()
                .map(|b| {
                    let diff = b.close - middle;
                    diff * diff
                })
                .sum();
            (sum_sq / (period - 1) as f64).sqrt()
        } else {
            0.0
        };

        Some(IndicatorValue::Bollinger {
            upper: middle + width * stddev,
            middle,
            lower: middle - width * stddev,
        })
    });

    series_from(IndicatorType::bollinger(period, width), bars, values)
}
