//! Stochastic oscillator.
//!
//! %K = 100 * (C - LL(n)) / (HH(n) - LL(n)) over the last n highs/lows.
//! %D = SMA(d) of %K.
//!
//! A bar whose n-bar high equals its n-bar low has no %K, and every %D
//! window containing it is undefined too.
//! Warmup: first (n-1) + (d-1) bars are undefined.

use crate::domain::indicator::{series_from, IndicatorSeries, IndicatorType, IndicatorValue};
use crate::domain::ohlcv::PriceBar;

pub const DEFAULT_K_PERIOD: usize = 14;
pub const DEFAULT_D_PERIOD: usize = 3;

pub fn calculate_stochastic(bars: &[PriceBar], k_period: usize, d_period: usize) -> IndicatorSeries {
    let indicator_type = IndicatorType::Stochastic { k_period, d_period };
    if k_period == 0 || d_period == 0 {
        return series_from(indicator_type, bars, vec![None; bars.len()]);
    }

    let k_values: Vec<Option<f64>> = (0..bars.len())
        .map(|i| {
            if i + 1 < k_period {
                return None;
            }
            let window = &bars[i + 1 - k_period..=i];
            let highest = window.iter().map(|b| b.high).fold(f64::MIN, f64::max);
            let lowest = window.iter().map(|b| b.low).fold(f64::MAX, f64::min);
            let range = highest - lowest;
            if range > 0.0 {
                Some(100.0 * (bars[i].close - lowest) / range)
            } else {
                None
            }
        })
        .collect();

    let d_values: Vec<Option<f64>> = (0..bars.len())
        .map(|i| {
            if i + 1 < d_period {
                return None;
            }
            let window = &k_values[i + 1 - d_period..=i];
            let sum = window.iter().try_fold(0.0, |acc, k| k.map(|k| acc + k))?;
            Some(sum / d_period as f64)
        })
        .collect();

    let values = k_values
        .iter()
        .zip(&d_values)
        .map(|(k, d)| Some(IndicatorValue::Stochastic { k: (*k)?, d: (*d)? }));

    series_from(indicator_type, bars, values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn make_hlc(rows: &[(f64, f64, f64)]) -> Vec<PriceBar> {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        rows.iter()
            .enumerate()
            .map(|(i, &(high, low, close))| PriceBar {
                timestamp: start + chrono::Duration::days(i as i64),
                open: close,
                high,
                low,
                close,
                volume: 1000.0,
            })
            .collect()
    }

    fn kd(series: &IndicatorSeries, i: usize) -> (f64, f64) {
        match series.value_at(i) {
            Some(IndicatorValue::Stochastic { k, d }) => (k, d),
            other => panic!("Expected Stochastic value, got {other:?}"),
        }
    }

    #[test]
    fn stochastic_warmup() {
        let rows: Vec<(f64, f64, f64)> = (0..8)
            .map(|i| (110.0 + i as f64, 90.0 + i as f64, 100.0 + i as f64))
            .collect();
        let series = calculate_stochastic(&make_hlc(&rows), 3, 2);
        assert_eq!(series.undefined_prefix(), 3);
    }

    #[test]
    fn stochastic_close_at_extremes() {
        let rows = [
            (110.0, 90.0, 100.0),
            (120.0, 95.0, 120.0),
            (115.0, 80.0, 80.0),
        ];
        let series = calculate_stochastic(&make_hlc(&rows), 2, 1);

        // bar 1: HH 120, LL 90, close 120 -> 100
        assert!((kd(&series, 1).0 - 100.0).abs() < 1e-9);
        // bar 2: HH 120, LL 80, close 80 -> 0
        assert!(kd(&series, 2).0.abs() < 1e-9);
    }

    #[test]
    fn stochastic_d_is_mean_of_k() {
        let rows = [
            (10.0, 0.0, 5.0),
            (10.0, 0.0, 2.0),
            (10.0, 0.0, 8.0),
            (10.0, 0.0, 10.0),
        ];
        let series = calculate_stochastic(&make_hlc(&rows), 1, 3);
        let (k, d) = kd(&series, 3);
        assert!((k - 100.0).abs() < 1e-9);
        assert!((d - (20.0 + 80.0 + 100.0) / 3.0).abs() < 1e-9);
    }

    #[test]
    fn stochastic_flat_range_is_undefined() {
        let rows = [(100.0, 100.0, 100.0); 4];
        let series = calculate_stochastic(&make_hlc(&rows), 2, 1);
        assert_eq!(series.undefined_prefix(), 4);
    }

    #[test]
    fn stochastic_zero_period() {
        let rows = [(110.0, 90.0, 100.0); 3];
        let series = calculate_stochastic(&make_hlc(&rows), 0, 3);
        assert_eq!(series.undefined_prefix(), 3);
    }
}
