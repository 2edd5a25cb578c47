//! RSI (Relative Strength Index) indicator.
//!
//! Average gain/loss are simple means of the last n close-to-close changes
//! (a rolling window, not Wilder's smoothing).
//!
//! Formula: RSI = 100 - (100 / (1 + avg_gain / avg_loss))
//! If avg_loss == 0: RSI = 100, unless avg_gain == 0 too. A window with no
//! movement at all reads neutral 50, so neither level rule votes on it.
//!
//! Warmup: first n bars are undefined (need n price changes).

use crate::domain::indicator::{series_from, IndicatorSeries, IndicatorType, IndicatorValue};
use crate::domain::ohlcv::PriceBar;

pub fn calculate_rsi(bars: &[PriceBar], period: usize) -> IndicatorSeries {
    let mut values: Vec<Option<IndicatorValue>> = vec![None; bars.len()];

    if period > 0 && bars.len() > period {
        let changes: Vec<f64> = bars.windows(2).map(|w| w[1].close - w[0].close).collect();
        let gains: Vec<f64> = changes.iter().map(|&c| c.max(0.0)).collect();
        let losses: Vec<f64> = changes.iter().map(|&c| (-c).max(0.0)).collect();

        let mut gain_sum: f64 = gains[..period].iter().sum();
        let mut loss_sum: f64 = losses[..period].iter().sum();

        for i in period..bars.len() {
            // change index i-1 is the newest in the window ending at bar i
            let newest = i - 1;
            if newest >= period {
                gain_sum += gains[newest] - gains[newest - period];
                loss_sum += losses[newest] - losses[newest - period];
            }
            let avg_gain = gain_sum.max(0.0) / period as f64;
            let avg_loss = loss_sum.max(0.0) / period as f64;
            values[i] = Some(IndicatorValue::Simple(rsi_from_averages(avg_gain, avg_loss)));
        }
    }

    series_from(IndicatorType::Rsi(period), bars, values)
}

pub const FLAT_WINDOW_RSI: f64 = 50.0;

fn rsi_from_averages(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 && avg_gain == 0.0 {
        FLAT_WINDOW_RSI
    } else if avg_loss == 0.0 {
        100.0
    } else {
        100.0 - (100.0 / (1.0 + avg_gain / avg_loss))
    }
}
