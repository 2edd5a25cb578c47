//! Exponential Moving Average indicator.
//!
//! k = 2/(n+1), seed with first SMA, then EMA[i] = C[i]*k + EMA[i-1]*(1-k).
//! Warmup: first (n-1) bars are undefined.

use crate::domain::indicator::{series_from, IndicatorSeries, IndicatorType, IndicatorValue};
use crate::domain::ohlcv::PriceBar;

pub fn calculate_ema(bars: &[PriceBar], period: usize) -> IndicatorSeries {
    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    let values = ema_values(&closes, period)
        .into_iter()
        .map(|v| v.map(IndicatorValue::Simple));
    series_from(IndicatorType::Ema(period), bars, values)
}

/// EMA over the defined tail of `values`.
///
/// Leading `None`s are skipped; the first `period` defined inputs seed the
/// average. A gap after the seed is not expected and yields `None` onwards.
pub(crate) fn ema_of(values: &[Option<f64>], period: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; values.len()];
    if period == 0 {
        return out;
    }
    let Some(start) = values.iter().position(|v| v.is_some()) else {
        return out;
    };

    let k = 2.0 / (period as f64 + 1.0);
    let mut sum = 0.0;
    let mut ema: Option<f64> = None;

    for (offset, value) in values[start..].iter().enumerate() {
        let i = start + offset;
        let Some(v) = *value else {
            break;
        };
        match ema {
            None if offset + 1 < period => sum += v,
            None => {
                sum += v;
                ema = Some(sum / period as f64);
            }
            Some(prev) => ema = Some(v * k + prev * (1.0 - k)),
        }
        out[i] = ema;
    }

    out
}

pub(crate) fn ema_values(closes: &[f64], period: usize) -> Vec<Option<f64>> {
    let wrapped: Vec<Option<f64>> = closes.iter().copied().map(Some).collect();
    ema_of(&wrapped, period)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicator::test_bars::make_bars;

    fn simple(series: &IndicatorSeries, i: usize) -> f64 {
        series.value_at(i).expect("defined").primary()
    }

    #[test]
    fn ema_warmup() {
        let bars = make_bars(&[10.0, 20.0, 30.0, 40.0, 50.0]);
        let series = calculate_ema(&bars, 3);

        assert!(series.values[0].value.is_none());
        assert!(series.values[1].value.is_none());
        assert!(series.values[2].value.is_some());
        assert!(series.values[3].value.is_some());
        assert!(series.values[4].value.is_some());
    }

    #[test]
    fn ema_period_1() {
        let bars = make_bars(&[10.0, 20.0, 30.0]);
        let series = calculate_ema(&bars, 1);

        assert_eq!(series.undefined_prefix(), 0);
        assert!((simple(&series, 0) - 10.0).abs() < f64::EPSILON);
        assert!((simple(&series, 1) - 20.0).abs() < f64::EPSILON);
    }

    #[test]
    fn ema_seed_is_sma() {
        let bars = make_bars(&[10.0, 20.0, 30.0]);
        let series = calculate_ema(&bars, 3);
        let expected_sma = (10.0 + 20.0 + 30.0) / 3.0;
        assert!((simple(&series, 2) - expected_sma).abs() < f64::EPSILON);
    }

    #[test]
    fn ema_recursive_calculation() {
        let bars = make_bars(&[10.0, 20.0, 30.0, 40.0, 50.0]);
        let series = calculate_ema(&bars, 3);

        let k = 2.0 / 4.0;
        let sma = (10.0 + 20.0 + 30.0) / 3.0;
        let ema_3 = 40.0 * k + sma * (1.0 - k);
        let ema_4 = 50.0 * k + ema_3 * (1.0 - k);

        assert!((simple(&series, 3) - ema_3).abs() < f64::EPSILON);
        assert!((simple(&series, 4) - ema_4).abs() < f64::EPSILON);
    }

    #[test]
    fn ema_equal_prices() {
        let bars = make_bars(&[100.0, 100.0, 100.0, 100.0, 100.0]);
        let series = calculate_ema(&bars, 3);
        for i in 2..5 {
            assert!((simple(&series, i) - 100.0).abs() < f64::EPSILON);
        }
    }

    #[test]
    fn ema_of_skips_leading_gap() {
        let values = [None, None, Some(1.0), Some(3.0), Some(5.0)];
        let out = ema_of(&values, 2);
        assert_eq!(out[0], None);
        assert_eq!(out[1], None);
        assert_eq!(out[2], None);
        assert_eq!(out[3], Some(2.0));
        let k = 2.0 / 3.0;
        assert_eq!(out[4], Some(5.0 * k + 2.0 * (1.0 - k)));
    }

    #[test]
    fn ema_empty_and_zero_period() {
        assert!(calculate_ema(&[], 3).is_empty());
        let series = calculate_ema(&make_bars(&[10.0, 20.0]), 0);
        assert_eq!(series.undefined_prefix(), 2);
    }

    #[test]
    fn ema_indicator_type() {
        let series = calculate_ema(&make_bars(&[10.0]), 5);
        assert_eq!(series.indicator_type, IndicatorType::Ema(5));
    }
}
