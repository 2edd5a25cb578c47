//! Technical indicator implementations.
//!
//! This module provides types for representing indicator values and series:
//! - `IndicatorPoint`: A single point in an indicator time series; `None` during warm-up
//! - `IndicatorValue`: Enum for different indicator output shapes
//! - `IndicatorType`: Enum for indicator identity + parameters (serves as HashMap key)
//! - `IndicatorSeries`: A time series of indicator values, index-aligned with the bars
//! - `IndicatorProvider`: Anything that can turn bars into a set of named series

pub mod bollinger;
pub mod ema;
pub mod macd;
pub mod rsi;
pub mod sma;
pub mod stochastic;

use chrono::NaiveDateTime;
use std::collections::HashMap;
use std::fmt;

use crate::domain::ohlcv::PriceBar;

pub use bollinger::calculate_bollinger;
pub use ema::calculate_ema;
pub use macd::calculate_macd;
pub use rsi::calculate_rsi;
pub use sma::calculate_sma;
pub use stochastic::calculate_stochastic;

#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorPoint {
    pub timestamp: NaiveDateTime,
    pub value: Option<IndicatorValue>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum IndicatorValue {
    Simple(f64),
    Macd {
        line: f64,
        signal: f64,
        histogram: f64,
    },
    Bollinger {
        upper: f64,
        middle: f64,
        lower: f64,
    },
    Stochastic {
        k: f64,
        d: f64,
    },
}

impl IndicatorValue {
    /// The headline number of a value: the MACD line, the Bollinger middle band, %K.
    pub fn primary(&self) -> f64 {
        match *self {
            IndicatorValue::Simple(v) => v,
            IndicatorValue::Macd { line, .. } => line,
            IndicatorValue::Bollinger { middle, .. } => middle,
            IndicatorValue::Stochastic { k, .. } => k,
        }
    }

    /// A fast line and the slower line it is compared against, if the value has one.
    pub fn crossover_pair(&self) -> Option<(f64, f64)> {
        match *self {
            IndicatorValue::Macd { line, signal, .. } => Some((line, signal)),
            IndicatorValue::Stochastic { k, d } => Some((k, d)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndicatorType {
    Sma(usize),
    Ema(usize),
    Rsi(usize),
    Macd {
        fast: usize,
        slow: usize,
        signal: usize,
    },
    Bollinger {
        period: usize,
        width_x100: u32,
    },
    Stochastic {
        k_period: usize,
        d_period: usize,
    },
}

impl IndicatorType {
    pub fn bollinger(period: usize, width: f64) -> Self {
        IndicatorType::Bollinger {
            period,
            width_x100: (width * 100.0).round().max(0.0) as u32,
        }
    }

    /// Index of the first bar at which the indicator can be defined.
    pub fn warmup(&self) -> usize {
        match *self {
            IndicatorType::Sma(n) | IndicatorType::Ema(n) => n.saturating_sub(1),
            IndicatorType::Rsi(n) => n,
            IndicatorType::Macd { fast, slow, signal } => {
                fast.max(slow).saturating_sub(1) + signal.saturating_sub(1)
            }
            IndicatorType::Bollinger { period, .. } => period.saturating_sub(1),
            IndicatorType::Stochastic { k_period, d_period } => {
                k_period.saturating_sub(1) + d_period.saturating_sub(1)
            }
        }
    }
}

impl fmt::Display for IndicatorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndicatorType::Sma(period) => write!(f, "SMA({})", period),
            IndicatorType::Ema(period) => write!(f, "EMA({})", period),
            IndicatorType::Rsi(period) => write!(f, "RSI({})", period),
            IndicatorType::Macd { fast, slow, signal } => {
                write!(f, "MACD({},{},{})", fast, slow, signal)
            }
            IndicatorType::Bollinger { period, width_x100 } => {
                let width = *width_x100 as f64 / 100.0;
                write!(f, "BOLLINGER({},{})", period, width)
            }
            IndicatorType::Stochastic { k_period, d_period } => {
                write!(f, "STOCHASTIC({},{})", k_period, d_period)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorSeries {
    pub indicator_type: IndicatorType,
    pub values: Vec<IndicatorPoint>,
}

impl IndicatorSeries {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn value_at(&self, index: usize) -> Option<IndicatorValue> {
        self.values.get(index).and_then(|p| p.value)
    }

    /// Number of leading points without a value.
    pub fn undefined_prefix(&self) -> usize {
        self.values.iter().take_while(|p| p.value.is_none()).count()
    }
}

/// Build a series of one point per bar from per-bar optional values.
pub(crate) fn series_from(
    indicator_type: IndicatorType,
    bars: &[PriceBar],
    values: impl IntoIterator<Item = Option<IndicatorValue>>,
) -> IndicatorSeries {
    let values = bars
        .iter()
        .zip(values)
        .map(|(bar, value)| IndicatorPoint {
            timestamp: bar.timestamp,
            value,
        })
        .collect();
    IndicatorSeries {
        indicator_type,
        values,
    }
}

/// Series keyed by their indicator identity.
pub type IndicatorSet = HashMap<IndicatorType, IndicatorSeries>;

pub trait IndicatorProvider {
    fn compute(&self, bars: &[PriceBar], indicators: &[IndicatorType]) -> IndicatorSet;
}

/// Built-in indicator library working on closing prices (and high/low for the stochastic).
#[derive(Debug, Clone, Copy, Default)]
pub struct TechnicalIndicators;

impl TechnicalIndicators {
    pub fn calculate(bars: &[PriceBar], indicator: &IndicatorType) -> IndicatorSeries {
        match *indicator {
            IndicatorType::Sma(period) => calculate_sma(bars, period),
            IndicatorType::Ema(period) => calculate_ema(bars, period),
            IndicatorType::Rsi(period) => calculate_rsi(bars, period),
            IndicatorType::Macd { fast, slow, signal } => calculate_macd(bars, fast, slow, signal),
            IndicatorType::Bollinger { period, width_x100 } => {
                calculate_bollinger(bars, period, width_x100 as f64 / 100.0)
            }
            IndicatorType::Stochastic { k_period, d_period } => {
                calculate_stochastic(bars, k_period, d_period)
            }
        }
    }
}

impl IndicatorProvider for TechnicalIndicators {
    fn compute(&self, bars: &[PriceBar], indicators: &[IndicatorType]) -> IndicatorSet {
        let mut set = IndicatorSet::with_capacity(indicators.len());
        for indicator in indicators {
            if !set.contains_key(indicator) {
                set.insert(*indicator, Self::calculate(bars, indicator));
            }
        }
        set
    }
}


#[cfg(test)]
mod tests {
    use super::test_bars::make_bars;
    use super::*;

    #[test]
    fn indicator_type_display_sma() {
        assert_eq!(IndicatorType::Sma(20).to_string(), "SMA(20)");
    }

    #[test]
    fn indicator_type_display_macd() {
        let macd = IndicatorType::Macd {
            fast: 12,
            slow: 26,
            signal: 9,
        };
        assert_eq!(macd.to_string(), "MACD(12,26,9)");
    }

    #[test]
    fn indicator_type_display_bollinger() {
        assert_eq!(IndicatorType::bollinger(20, 2.0).to_string(), "BOLLINGER(20,2)");
        assert_eq!(IndicatorType::bollinger(20, 2.5).to_string(), "BOLLINGER(20,2.5)");
    }

    #[test]
    fn warmup_lengths() {
        assert_eq!(IndicatorType::Sma(50).warmup(), 49);
        assert_eq!(IndicatorType::Rsi(14).warmup(), 14);
        let macd = IndicatorType::Macd {
            fast: 12,
            slow: 26,
            signal: 9,
        };
        assert_eq!(macd.warmup(), 33);
        let stoch = IndicatorType::Stochastic {
            k_period: 14,
            d_period: 3,
        };
        assert_eq!(stoch.warmup(), 15);
    }

    #[test]
    fn primary_and_crossover_pair() {
        let macd = IndicatorValue::Macd {
            line: 5.0,
            signal: 3.0,
            histogram: 2.0,
        };
        assert_eq!(macd.primary(), 5.0);
        assert_eq!(macd.crossover_pair(), Some((5.0, 3.0)));
        assert_eq!(IndicatorValue::Simple(70.0).crossover_pair(), None);
    }

    #[test]
    fn provider_computes_each_requested_series() {
        let bars = make_bars(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        let requested = [
            IndicatorType::Sma(3),
            IndicatorType::Ema(2),
            IndicatorType::Sma(3),
        ];
        let set = TechnicalIndicators.compute(&bars, &requested);

        assert_eq!(set.len(), 2);
        for series in set.values() {
            assert_eq!(series.len(), bars.len());
        }
        let sma = &set[&IndicatorType::Sma(3)];
        assert_eq!(sma.undefined_prefix(), 2);
        assert_eq!(sma.value_at(2), Some(IndicatorValue::Simple(2.0)));
    }

    #[test]
    fn provider_output_matches_declared_warmup() {
        let prices: Vec<f64> = (0..60).map(|i| 100.0 + (i as f64 * 0.7).sin() * 5.0).collect();
        let bars = make_bars(&prices);
        let requested = [
            IndicatorType::Sma(10),
            IndicatorType::Ema(10),
            IndicatorType::Rsi(14),
            IndicatorType::Macd {
                fast: 12,
                slow: 26,
                signal: 9,
            },
            IndicatorType::bollinger(20, 2.0),
        ];
        let set = TechnicalIndicators.compute(&bars, &requested);
        for indicator in &requested {
            assert_eq!(
                set[indicator].undefined_prefix(),
                indicator.warmup(),
                "{indicator}"
            );
        }
    }

    #[test]
    fn indicator_type_hash_eq() {
        let mut map = HashMap::new();
        map.insert(IndicatorType::Sma(20), "sma20");
        map.insert(IndicatorType::Sma(50), "sma50");
        assert_eq!(map.get(&IndicatorType::Sma(20)), Some(&"sma20"));
        assert_eq!(map.get(&IndicatorType::Ema(20)), None);
    }
}
