//! Strategy configuration and composition.
//!
//! A [`Strategy`] names the indicator windows feeding the signal generator,
//! the voting configuration, and how LONG decisions are sized.

use crate::domain::error::SignalError;
use crate::domain::indicator::{IndicatorProvider, IndicatorSet, IndicatorType};
use crate::domain::ohlcv::PriceBar;
use crate::domain::signal::{Decision, SignalConfig, SignalGenerator, SignalSources};
use crate::domain::sizing::SizingMode;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MovingAverage {
    #[default]
    Sma,
    Ema,
}

/// Series read as the oscillator input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OscillatorSource {
    #[default]
    Rsi,
    Stochastic,
}

/// Series read as the crossover pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CrossoverSource {
    #[default]
    Macd,
    Stochastic,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IndicatorWindows {
    pub moving_average: MovingAverage,
    pub fast_ma: usize,
    pub slow_ma: usize,
    pub oscillator: OscillatorSource,
    pub rsi: usize,
    pub crossover: CrossoverSource,
    pub macd_fast: usize,
    pub macd_slow: usize,
    pub macd_signal: usize,
    pub bollinger: usize,
    pub bollinger_width: f64,
    pub stochastic: usize,
    pub stochastic_smooth: usize,
}

impl Default for IndicatorWindows {
    fn default() -> Self {
        IndicatorWindows {
            moving_average: MovingAverage::Sma,
            fast_ma: 50,
            slow_ma: 200,
            oscillator: OscillatorSource::Rsi,
            rsi: 14,
            crossover: CrossoverSource::Macd,
            macd_fast: 12,
            macd_slow: 26,
            macd_signal: 9,
            bollinger: 20,
            bollinger_width: 2.0,
            stochastic: 14,
            stochastic_smooth: 3,
        }
    }
}

impl IndicatorWindows {
    fn moving_average(&self, period: usize) -> IndicatorType {
        match self.moving_average {
            MovingAverage::Sma => IndicatorType::Sma(period),
            MovingAverage::Ema => IndicatorType::Ema(period),
        }
    }

    fn stochastic(&self) -> IndicatorType {
        IndicatorType::Stochastic {
            k_period: self.stochastic,
            d_period: self.stochastic_smooth,
        }
    }

    pub fn sources(&self) -> SignalSources {
        SignalSources {
            fast_ma: self.moving_average(self.fast_ma),
            slow_ma: self.moving_average(self.slow_ma),
            oscillator: match self.oscillator {
                OscillatorSource::Rsi => IndicatorType::Rsi(self.rsi),
                OscillatorSource::Stochastic => self.stochastic(),
            },
            crossover: match self.crossover {
                CrossoverSource::Macd => IndicatorType::Macd {
                    fast: self.macd_fast,
                    slow: self.macd_slow,
                    signal: self.macd_signal,
                },
                CrossoverSource::Stochastic => self.stochastic(),
            },
        }
    }

    pub fn bands(&self) -> IndicatorType {
        IndicatorType::bollinger(self.bollinger, self.bollinger_width)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Strategy {
    pub name: String,
    pub windows: IndicatorWindows,
    pub signal: SignalConfig,
    pub sizing: SizingMode,
}

impl Default for Strategy {
    fn default() -> Self {
        Strategy {
            name: "Default".into(),
            windows: IndicatorWindows::default(),
            signal: SignalConfig::default(),
            sizing: SizingMode::default(),
        }
    }
}

impl Strategy {
    pub fn sources(&self) -> SignalSources {
        self.windows.sources()
    }

    /// Every series the strategy computes: the four voting inputs, then the
    /// Bollinger bands, without duplicates.
    pub fn required_indicators(&self) -> Vec<IndicatorType> {
        let mut indicators = Vec::with_capacity(5);
        for indicator in self
            .sources()
            .indicators()
            .into_iter()
            .chain([self.windows.bands()])
        {
            if !indicators.contains(&indicator) {
                indicators.push(indicator);
            }
        }
        indicators
    }

    pub fn compute_indicators(
        &self,
        bars: &[PriceBar],
        provider: &dyn IndicatorProvider,
    ) -> IndicatorSet {
        provider.compute(bars, &self.required_indicators())
    }

    pub fn decide_all(&self, set: &IndicatorSet, len: usize) -> Result<Vec<Decision>, SignalError> {
        SignalGenerator::new(self.signal.clone()).generate(set, &self.sources(), len)
    }

    /// One decision per bar.
    pub fn decisions(
        &self,
        bars: &[PriceBar],
        provider: &dyn IndicatorProvider,
    ) -> Result<Vec<Decision>, SignalError> {
        let set = self.compute_indicators(bars, provider);
        self.decide_all(&set, bars.len())
    }
}
