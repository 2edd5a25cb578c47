//! Backtest runner: replays decisions against prices through a [`Ledger`].
//!
//! Inputs are checked up front (matching lengths, positive finite closes,
//! strictly increasing timestamps, usable capital) so that a run either
//! completes every step or never starts. Steps are applied strictly in input
//! order; each depends on the ledger state the previous one left behind.

use chrono::NaiveDateTime;
use tracing::info;

use super::error::BacktestError;
use super::ledger::{Ledger, StepRecord};
use super::ohlcv::{self, PriceBar};
use super::signal::Decision;
use super::sizing::{PositionSizer, SizingContext};

pub const DEFAULT_INITIAL_CAPITAL: f64 = 100_000.0;

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestConfig {
    pub initial_capital: f64,
    pub risk_free_rate: f64,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        BacktestConfig {
            initial_capital: DEFAULT_INITIAL_CAPITAL,
            risk_free_rate: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EquityPoint {
    pub timestamp: NaiveDateTime,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestResult {
    pub equity_curve: Vec<EquityPoint>,
    pub steps: Vec<StepRecord>,
    pub ledger: Ledger,
}

impl BacktestResult {
    /// Total account value after each step, in input order.
    pub fn values(&self) -> &[f64] {
        &self.ledger.trajectory
    }

    pub fn final_value(&self) -> f64 {
        self.values()
            .last()
            .copied()
            .unwrap_or(self.ledger.initial_capital)
    }

    pub fn total_return(&self) -> f64 {
        (self.final_value() - self.ledger.initial_capital) / self.ledger.initial_capital
    }
}

/// Replay `decisions` over `closes` and return the value trajectory.
pub fn run(
    closes: &[f64],
    decisions: &[Decision],
    initial_capital: f64,
    sizer: &dyn PositionSizer,
) -> Result<Vec<f64>, BacktestError> {
    let (ledger, _) = simulate(closes, decisions, initial_capital, sizer)?;
    Ok(ledger.trajectory)
}

/// Replay `decisions` over timestamped bars, keeping per-step ledger records.
pub fn run_backtest(
    bars: &[PriceBar],
    decisions: &[Decision],
    config: &BacktestConfig,
    sizer: &dyn PositionSizer,
) -> Result<BacktestResult, BacktestError> {
    if let Some(index) = ohlcv::first_unordered(bars) {
        return Err(BacktestError::UnorderedTimestamps { index });
    }

    let closes = ohlcv::closes(bars);
    let (ledger, steps) = simulate(&closes, decisions, config.initial_capital, sizer)?;

    let equity_curve = bars
        .iter()
        .zip(&ledger.trajectory)
        .map(|(bar, &value)| EquityPoint {
            timestamp: bar.timestamp,
            value,
        })
        .collect();

    Ok(BacktestResult {
        equity_curve,
        steps,
        ledger,
    })
}

pub fn validate_inputs(
    closes: &[f64],
    decisions: &[Decision],
    initial_capital: f64,
) -> Result<(), BacktestError> {
    if closes.len() != decisions.len() {
        return Err(BacktestError::LengthMismatch {
            prices: closes.len(),
            decisions: decisions.len(),
        });
    }
    if !initial_capital.is_finite() || initial_capital <= 0.0 {
        return Err(BacktestError::InvalidCapital(initial_capital));
    }
    if let Some((index, &price)) = closes
        .iter()
        .enumerate()
        .find(|(_, p)| !p.is_finite() || **p <= 0.0)
    {
        return Err(BacktestError::InvalidPrice { index, price });
    }
    Ok(())
}

fn simulate(
    closes: &[f64],
    decisions: &[Decision],
    initial_capital: f64,
    sizer: &dyn PositionSizer,
) -> Result<(Ledger, Vec<StepRecord>), BacktestError> {
    validate_inputs(closes, decisions, initial_capital)?;
    info!(steps = closes.len(), initial_capital, "starting backtest");

    let mut ledger = Ledger::new(initial_capital);
    let mut steps = Vec::with_capacity(closes.len());

    for (index, (&price, &decision)) in closes.iter().zip(decisions).enumerate() {
        let fraction = match decision {
            Decision::Long => sizer.fraction(&SizingContext {
                index,
                price,
                cash: ledger.cash,
                equity: ledger.equity_at(price),
            }),
            Decision::Flat | Decision::Exit => 0.0,
        };
        steps.push(ledger.apply(index, decision, price, fraction)?);
    }

    info!(
        final_value = ledger.total_value(),
        fills = ledger.fills.len(),
        overdrafts = ledger.overdrafts.len(),
        "backtest complete"
    );
    Ok((ledger, steps))
}
