//! Performance summary of a backtest trajectory.

use super::backtest::{BacktestResult, EquityPoint};
use super::ledger::{Fill, Side};

const TRADING_DAYS_PER_YEAR: f64 = 252.0;

#[derive(Debug, Clone, PartialEq)]
pub struct Metrics {
    pub initial_capital: f64,
    pub final_value: f64,
    pub total_return: f64,
    pub annualized_return: f64,
    pub sharpe_ratio: f64,
    pub sortino_ratio: f64,
    pub max_drawdown: f64,
    pub max_drawdown_duration: usize,
    pub fills: usize,
    pub round_trips: usize,
    pub trades_won: usize,
    pub trades_lost: usize,
    pub win_rate: f64,
    pub overdrafts: usize,
}

impl Metrics {
    pub fn compute(
        equity_curve: &[EquityPoint],
        initial_capital: f64,
        risk_free_rate: f64,
        fills: &[Fill],
    ) -> Self {
        let values: Vec<f64> = equity_curve.iter().map(|p| p.value).collect();
        let final_value = values.last().copied().unwrap_or(initial_capital);

        let total_return = if initial_capital > 0.0 {
            (final_value - initial_capital) / initial_capital
        } else {
            0.0
        };

        let years = values.len() as f64 / TRADING_DAYS_PER_YEAR;
        let annualized_return = if years > 0.0 && total_return.is_finite() && total_return > -1.0
        {
            (1.0 + total_return).powf(1.0 / years) - 1.0
        } else {
            0.0
        };

        let (max_drawdown, max_drawdown_duration) = compute_drawdown(&values);

        let daily_rf = risk_free_rate / TRADING_DAYS_PER_YEAR;
        let (sharpe_ratio, sortino_ratio) = compute_risk_adjusted(&values, daily_rf);

        let pnls = round_trip_pnls(fills);
        let trades_won = pnls.iter().filter(|&&p| p > 0.0).count();
        let trades_lost = pnls.iter().filter(|&&p| p < 0.0).count();
        let win_rate = if pnls.is_empty() {
            0.0
        } else {
            trades_won as f64 / pnls.len() as f64
        };

        Metrics {
            initial_capital,
            final_value,
            total_return,
            annualized_return,
            sharpe_ratio,
            sortino_ratio,
            max_drawdown,
            max_drawdown_duration,
            fills: fills.len(),
            round_trips: pnls.len(),
            trades_won,
            trades_lost,
            win_rate,
            overdrafts: 0,
        }
    }

    pub fn from_result(result: &BacktestResult, risk_free_rate: f64) -> Self {
        let mut metrics = Metrics::compute(
            &result.equity_curve,
            result.ledger.initial_capital,
            risk_free_rate,
            &result.ledger.fills,
        );
        metrics.overdrafts = result.ledger.overdrafts.len();
        metrics
    }
}

/// Profit of every buy sequence closed by a sell. A position still open at
/// the end of the fills is not counted.
fn round_trip_pnls(fills: &[Fill]) -> Vec<f64> {
    let mut pnls = Vec::new();
    let mut cost = 0.0;
    for fill in fills {
        match fill.side {
            Side::Buy => cost += fill.notional(),
            Side::Sell => {
                pnls.push(fill.notional() - cost);
                cost = 0.0;
            }
        }
    }
    pnls
}

fn compute_drawdown(values: &[f64]) -> (f64, usize) {
    let Some(&first) = values.first() else {
        return (0.0, 0);
    };

    let mut peak = first;
    let mut max_dd = 0.0_f64;
    let mut max_dd_duration = 0usize;
    let mut current_dd_duration = 0usize;

    for &value in values {
        if value >= peak {
            peak = value;
            current_dd_duration = 0;
        } else if peak > 0.0 && value < peak {
            max_dd = max_dd.max((peak - value) / peak);
            current_dd_duration += 1;
            max_dd_duration = max_dd_duration.max(current_dd_duration);
        }
    }

    (max_dd, max_dd_duration)
}

fn compute_risk_adjusted(values: &[f64], daily_rf: f64) -> (f64, f64) {
    if values.len() < 2 {
        return (0.0, 0.0);
    }

    let returns: Vec<f64> = values
        .windows(2)
        .map(|w| if w[0] > 0.0 { (w[1] - w[0]) / w[0] } else { 0.0 })
        .collect();

    let n = returns.len() as f64;
    let mean: f64 = returns.iter().sum::<f64>() / n;
    let variance: f64 = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / n;
    let stddev = variance.sqrt();

    let excess_return = mean - daily_rf;

    let sharpe = if stddev > 0.0 {
        (excess_return / stddev) * TRADING_DAYS_PER_YEAR.sqrt()
    } else {
        0.0
    };

    let downside_sq: f64 = returns
        .iter()
        .filter(|&&r| r < daily_rf)
        .map(|&r| (r - daily_rf).powi(2))
        .sum();
    let downside_stddev = (downside_sq / n).sqrt();

    let sortino = if downside_stddev > 0.0 {
        (excess_return / downside_stddev) * TRADING_DAYS_PER_YEAR.sqrt()
    } else {
        0.0
    };

    (sharpe, sortino)
}
