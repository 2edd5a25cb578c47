//! Multi-indicator voting: per-bar indicator values in, one position decision out.
//!
//! Four rules each cast a vote in {-1, 0, +1}:
//! - trend: fast MA above slow MA is bullish, otherwise bearish (never neutral)
//! - overbought: oscillator above the overbought level is bearish
//! - oversold: oscillator below the oversold level is bullish
//! - crossover: fast line above its signal line is bullish, otherwise bearish
//!
//! The weighted vote total is compared against the long/exit thresholds.
//! Every step is decided on its own; there is no memory between steps.

use std::fmt;

use crate::domain::error::SignalError;
use crate::domain::indicator::{IndicatorSet, IndicatorType, IndicatorValue};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Vote {
    Bearish,
    Neutral,
    Bullish,
}

impl Vote {
    pub fn value(self) -> i32 {
        match self {
            Vote::Bearish => -1,
            Vote::Neutral => 0,
            Vote::Bullish => 1,
        }
    }
}

/// Aggregated decision for one step.
///
/// `Exit` carries the bearish value (-1) but only ever liquidates a held
/// position to cash; the ledger never holds negative units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Decision {
    Long,
    Flat,
    Exit,
}

impl Decision {
    pub fn value(self) -> i8 {
        match self {
            Decision::Long => 1,
            Decision::Flat => 0,
            Decision::Exit => -1,
        }
    }

    pub fn from_value(value: i8) -> Option<Decision> {
        match value {
            1 => Some(Decision::Long),
            0 => Some(Decision::Flat),
            -1 => Some(Decision::Exit),
            _ => None,
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Decision::Long => write!(f, "LONG"),
            Decision::Flat => write!(f, "FLAT"),
            Decision::Exit => write!(f, "EXIT"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignalRule {
    Trend,
    Overbought,
    Oversold,
    Crossover,
}

impl SignalRule {
    pub const ALL: [SignalRule; 4] = [
        SignalRule::Trend,
        SignalRule::Overbought,
        SignalRule::Oversold,
        SignalRule::Crossover,
    ];

    pub fn name(self) -> &'static str {
        match self {
            SignalRule::Trend => "trend",
            SignalRule::Overbought => "overbought",
            SignalRule::Oversold => "oversold",
            SignalRule::Crossover => "crossover",
        }
    }
}

/// Weight applied to each rule's vote before summing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RuleWeights {
    pub trend: f64,
    pub overbought: f64,
    pub oversold: f64,
    pub crossover: f64,
}

impl Default for RuleWeights {
    fn default() -> Self {
        RuleWeights {
            trend: 1.0,
            overbought: 1.0,
            oversold: 1.0,
            crossover: 1.0,
        }
    }
}

impl RuleWeights {
    pub fn get(&self, rule: SignalRule) -> f64 {
        match rule {
            SignalRule::Trend => self.trend,
            SignalRule::Overbought => self.overbought,
            SignalRule::Oversold => self.oversold,
            SignalRule::Crossover => self.crossover,
        }
    }
}

/// What to do when an input is still inside its warm-up window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WarmupPolicy {
    #[default]
    Flat,
    Reject,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SignalConfig {
    pub weights: RuleWeights,
    pub overbought_level: f64,
    pub oversold_level: f64,
    pub long_threshold: f64,
    pub exit_threshold: f64,
    pub warmup: WarmupPolicy,
}

impl Default for SignalConfig {
    fn default() -> Self {
        SignalConfig {
            weights: RuleWeights::default(),
            overbought_level: 70.0,
            oversold_level: 30.0,
            long_threshold: 2.0,
            exit_threshold: -2.0,
            warmup: WarmupPolicy::Flat,
        }
    }
}

/// The four inputs the rules read, as named slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalInput {
    FastMa,
    SlowMa,
    Oscillator,
    Crossover,
}

impl fmt::Display for SignalInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SignalInput::FastMa => "fast moving average",
            SignalInput::SlowMa => "slow moving average",
            SignalInput::Oscillator => "oscillator",
            SignalInput::Crossover => "crossover pair",
        };
        f.write_str(name)
    }
}

/// Indicator values at a single step. `None` marks a warm-up gap.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Snapshot {
    pub fast_ma: Option<f64>,
    pub slow_ma: Option<f64>,
    pub oscillator: Option<f64>,
    /// Fast trend-following line and its signal line.
    pub crossover: Option<(f64, f64)>,
}

impl Snapshot {
    pub fn new(fast_ma: f64, slow_ma: f64, oscillator: f64, line: f64, signal: f64) -> Self {
        Snapshot {
            fast_ma: Some(fast_ma),
            slow_ma: Some(slow_ma),
            oscillator: Some(oscillator),
            crossover: Some((line, signal)),
        }
    }

    /// First input without a value, if any.
    pub fn missing(&self) -> Option<SignalInput> {
        if self.fast_ma.is_none() {
            Some(SignalInput::FastMa)
        } else if self.slow_ma.is_none() {
            Some(SignalInput::SlowMa)
        } else if self.oscillator.is_none() {
            Some(SignalInput::Oscillator)
        } else if self.crossover.is_none() {
            Some(SignalInput::Crossover)
        } else {
            None
        }
    }
}

/// Which computed series feeds each input slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignalSources {
    pub fast_ma: IndicatorType,
    pub slow_ma: IndicatorType,
    pub oscillator: IndicatorType,
    pub crossover: IndicatorType,
}

impl SignalSources {
    pub fn get(&self, input: SignalInput) -> IndicatorType {
        match input {
            SignalInput::FastMa => self.fast_ma,
            SignalInput::SlowMa => self.slow_ma,
            SignalInput::Oscillator => self.oscillator,
            SignalInput::Crossover => self.crossover,
        }
    }

    pub fn indicators(&self) -> [IndicatorType; 4] {
        [self.fast_ma, self.slow_ma, self.oscillator, self.crossover]
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RuleVote {
    pub rule: SignalRule,
    pub vote: Vote,
}

#[derive(Debug, Clone, Default)]
pub struct SignalGenerator {
    config: SignalConfig,
}

impl SignalGenerator {
    pub fn new(config: SignalConfig) -> Self {
        SignalGenerator { config }
    }

    pub fn config(&self) -> &SignalConfig {
        &self.config
    }

    /// Per-rule votes, or `None` if any input is undefined.
    pub fn votes(&self, snapshot: &Snapshot) -> Option<[RuleVote; 4]> {
        let fast = snapshot.fast_ma?;
        let slow = snapshot.slow_ma?;
        let osc = snapshot.oscillator?;
        let (line, signal) = snapshot.crossover?;

        let trend = if fast > slow { Vote::Bullish } else { Vote::Bearish };
        let overbought = if osc > self.config.overbought_level {
            Vote::Bearish
        } else {
            Vote::Neutral
        };
        let oversold = if osc < self.config.oversold_level {
            Vote::Bullish
        } else {
            Vote::Neutral
        };
        let crossover = if line > signal { Vote::Bullish } else { Vote::Bearish };

        Some([
            RuleVote { rule: SignalRule::Trend, vote: trend },
            RuleVote { rule: SignalRule::Overbought, vote: overbought },
            RuleVote { rule: SignalRule::Oversold, vote: oversold },
            RuleVote { rule: SignalRule::Crossover, vote: crossover },
        ])
    }

    pub fn total(&self, votes: &[RuleVote]) -> f64 {
        votes
            .iter()
            .map(|rv| self.config.weights.get(rv.rule) * rv.vote.value() as f64)
            .sum()
    }

    pub fn threshold(&self, total: f64) -> Decision {
        if total > self.config.long_threshold {
            Decision::Long
        } else if total < self.config.exit_threshold {
            Decision::Exit
        } else {
            Decision::Flat
        }
    }

    /// Decide one step, applying the warm-up policy to undefined inputs.
    pub fn decide(&self, index: usize, snapshot: &Snapshot) -> Result<Decision, SignalError> {
        match self.votes(snapshot) {
            Some(votes) => Ok(self.threshold(self.total(&votes))),
            None => match self.config.warmup {
                WarmupPolicy::Flat => Ok(Decision::Flat),
                WarmupPolicy::Reject => Err(SignalError::InsufficientHistory {
                    index,
                    indicator: snapshot
                        .missing()
                        .map(|input| input.to_string())
                        .unwrap_or_default(),
                }),
            },
        }
    }

    /// Decide every step of a computed indicator set, in order.
    ///
    /// Every source series must be present and hold exactly `len` points.
    pub fn generate(
        &self,
        set: &IndicatorSet,
        sources: &SignalSources,
        len: usize,
    ) -> Result<Vec<Decision>, SignalError> {
        for indicator in sources.indicators() {
            let series = set
                .get(&indicator)
                .ok_or_else(|| SignalError::MissingSeries(indicator.to_string()))?;
            if series.len() != len {
                return Err(SignalError::MisalignedSeries {
                    indicator: indicator.to_string(),
                    expected: len,
                    actual: series.len(),
                });
            }
        }
        let crossover = sources.crossover;
        if !matches!(
            crossover,
            IndicatorType::Macd { .. } | IndicatorType::Stochastic { .. }
        ) {
            return Err(SignalError::UnsupportedSource {
                indicator: crossover.to_string(),
                input: SignalInput::Crossover.to_string(),
            });
        }

        let at = |input: SignalInput, i: usize| -> Option<IndicatorValue> {
            set.get(&sources.get(input)).and_then(|s| s.value_at(i))
        };

        (0..len)
            .map(|i| {
                let snapshot = Snapshot {
                    fast_ma: at(SignalInput::FastMa, i).map(|v| v.primary()),
                    slow_ma: at(SignalInput::SlowMa, i).map(|v| v.primary()),
                    oscillator: at(SignalInput::Oscillator, i).map(|v| v.primary()),
                    crossover: at(SignalInput::Crossover, i).and_then(|v| v.crossover_pair()),
                };
                self.decide(i, &snapshot).map_err(|err| match err {
                    SignalError::InsufficientHistory { index, .. } => {
                        let indicator = snapshot
                            .missing()
                            .map(|input| sources.get(input).to_string())
                            .unwrap_or_default();
                        SignalError::InsufficientHistory { index, indicator }
                    }
                    other => other,
                })
            })
            .collect()
    }
}
