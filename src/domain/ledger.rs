//! Single-instrument cash/units ledger and its value trajectory.
//!
//! The ledger is either flat (`position_units == 0`) or long. A LONG decision
//! spends a fraction of the remaining cash on units, an EXIT sells every unit
//! back to cash, and FLAT leaves holdings alone. Every applied step marks the
//! holdings to the step's price and appends `cash + units * price` to the
//! trajectory.

use tracing::{debug, warn};

use super::error::LedgerError;
use super::signal::Decision;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Buy,
    Sell,
}

/// A change of held units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fill {
    pub index: usize,
    pub side: Side,
    pub units: f64,
    pub price: f64,
}

impl Fill {
    pub fn notional(&self) -> f64 {
        self.units * self.price
    }
}

/// A LONG that asked for more cash than was available and was capped.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Overdraft {
    pub index: usize,
    pub requested: f64,
    pub available: f64,
}

/// Ledger state right after one step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepRecord {
    pub index: usize,
    pub decision: Decision,
    pub price: f64,
    pub cash: f64,
    pub position_units: f64,
    pub total_value: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Ledger {
    pub initial_capital: f64,
    pub cash: f64,
    pub position_units: f64,
    pub position_value: f64,
    pub trajectory: Vec<f64>,
    pub fills: Vec<Fill>,
    pub overdrafts: Vec<Overdraft>,
}

impl Ledger {
    pub fn new(initial_capital: f64) -> Self {
        Ledger {
            initial_capital,
            cash: initial_capital,
            position_units: 0.0,
            position_value: 0.0,
            trajectory: Vec::new(),
            fills: Vec::new(),
            overdrafts: Vec::new(),
        }
    }

    pub fn is_long(&self) -> bool {
        self.position_units > 0.0
    }

    /// Cash plus the last mark-to-market value of held units.
    pub fn total_value(&self) -> f64 {
        self.cash + self.position_value
    }

    /// Cash plus held units marked at `price`.
    pub fn equity_at(&self, price: f64) -> f64 {
        self.cash + self.position_units * price
    }

    /// Apply one decision at `price`, investing `fraction` of cash on LONG.
    ///
    /// `fraction` is only read for LONG. Nothing is mutated when an error is
    /// returned.
    pub fn apply(
        &mut self,
        index: usize,
        decision: Decision,
        price: f64,
        fraction: f64,
    ) -> Result<StepRecord, LedgerError> {
        if !price.is_finite() || price <= 0.0 {
            return Err(LedgerError::InvalidPrice { index, price });
        }

        match decision {
            Decision::Long => {
                if !fraction.is_finite() || fraction < 0.0 {
                    return Err(LedgerError::InvalidFraction { index, fraction });
                }
                self.buy(index, price, fraction);
            }
            Decision::Exit => self.sell_all(index, price),
            Decision::Flat => {}
        }

        self.position_value = self.position_units * price;
        let total_value = self.cash + self.position_value;
        self.trajectory.push(total_value);

        Ok(StepRecord {
            index,
            decision,
            price,
            cash: self.cash,
            position_units: self.position_units,
            total_value,
        })
    }

    fn buy(&mut self, index: usize, price: f64, fraction: f64) {
        let available = self.cash.max(0.0);
        let requested = self.cash * fraction;
        let investment = if requested > available {
            warn!(
                step = index,
                requested, available, "long signal exceeds available cash; capping investment"
            );
            self.overdrafts.push(Overdraft {
                index,
                requested,
                available,
            });
            available
        } else {
            requested
        };

        if investment <= 0.0 {
            return;
        }

        let units = investment / price;
        self.position_units += units;
        self.cash -= investment;
        debug!(step = index, units, price, cash = self.cash, "buy");
        self.fills.push(Fill {
            index,
            side: Side::Buy,
            units,
            price,
        });
    }

    fn sell_all(&mut self, index: usize, price: f64) {
        if self.position_units <= 0.0 {
            return;
        }
        let units = self.position_units;
        self.cash += units * price;
        self.position_units = 0.0;
        debug!(step = index, units, price, cash = self.cash, "sell");
        self.fills.push(Fill {
            index,
            side: Side::Sell,
            units,
            price,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn new_ledger() {
        let ledger = Ledger::new(100_000.0);
        assert!((ledger.cash - 100_000.0).abs() < f64::EPSILON);
        assert!((ledger.initial_capital - 100_000.0).abs() < f64::EPSILON);
        assert_eq!(ledger.position_units, 0.0);
        assert!(!ledger.is_long());
        assert!(ledger.trajectory.is_empty());
        assert!(ledger.fills.is_empty());
    }

    #[test]
    fn long_buys_fraction_of_cash() {
        let mut ledger = Ledger::new(100_000.0);
        let step = ledger.apply(0, Decision::Long, 100.0, 0.01).unwrap();

        assert_relative_eq!(step.position_units, 10.0, epsilon = 1e-9);
        assert_relative_eq!(step.cash, 99_000.0, epsilon = 1e-9);
        assert_relative_eq!(step.total_value, 100_000.0, epsilon = 1e-9);
        assert!(ledger.is_long());
        assert_eq!(ledger.fills.len(), 1);
        assert_eq!(ledger.fills[0].side, Side::Buy);
        assert_relative_eq!(ledger.fills[0].notional(), 1_000.0, epsilon = 1e-9);
    }

    #[test]
    fn repeated_longs_compound_from_remaining_cash() {
        let mut ledger = Ledger::new(100_000.0);
        ledger.apply(0, Decision::Long, 100.0, 0.5).unwrap();
        ledger.apply(1, Decision::Long, 100.0, 0.5).unwrap();

        assert_relative_eq!(ledger.cash, 25_000.0, epsilon = 1e-9);
        assert_relative_eq!(ledger.position_units, 750.0, epsilon = 1e-9);
        assert_eq!(ledger.fills.len(), 2);
    }

    #[test]
    fn exit_liquidates_to_cash() {
        let mut ledger = Ledger::new(100_000.0);
        ledger.apply(0, Decision::Long, 100.0, 0.1).unwrap();
        let step = ledger.apply(1, Decision::Exit, 120.0, 0.0).unwrap();

        assert_eq!(step.position_units, 0.0);
        assert_relative_eq!(step.cash, 90_000.0 + 100.0 * 120.0, epsilon = 1e-9);
        assert_relative_eq!(step.total_value, 102_000.0, epsilon = 1e-9);
        assert_eq!(ledger.fills[1].side, Side::Sell);
    }

    #[test]
    fn exit_while_flat_is_a_no_op() {
        let mut ledger = Ledger::new(1_000.0);
        ledger.apply(0, Decision::Exit, 50.0, 0.0).unwrap();
        assert_eq!(ledger.cash, 1_000.0);
        assert!(ledger.fills.is_empty());
    }

    #[test]
    fn flat_marks_to_market_only() {
        let mut ledger = Ledger::new(100_000.0);
        ledger.apply(0, Decision::Long, 100.0, 0.1).unwrap();
        let cash = ledger.cash;
        let units = ledger.position_units;

        let step = ledger.apply(1, Decision::Flat, 110.0, 0.5).unwrap();

        assert_eq!(step.cash, cash);
        assert_eq!(step.position_units, units);
        assert_relative_eq!(ledger.position_value, 100.0 * 110.0, epsilon = 1e-9);
        assert_relative_eq!(step.total_value, 101_000.0, epsilon = 1e-9);
    }

    #[test]
    fn round_trip_at_same_price_restores_cash() {
        let mut ledger = Ledger::new(100_000.0);
        ledger.apply(0, Decision::Long, 37.5, 0.3).unwrap();
        ledger.apply(1, Decision::Exit, 37.5, 0.0).unwrap();
        assert_relative_eq!(ledger.cash, 100_000.0, epsilon = 1e-6);
        assert_eq!(ledger.position_units, 0.0);
    }

    #[test]
    fn fraction_above_one_is_capped_and_reported() {
        let mut ledger = Ledger::new(10_000.0);
        let step = ledger.apply(3, Decision::Long, 50.0, 1.5).unwrap();

        assert_eq!(step.cash, 0.0);
        assert_relative_eq!(step.position_units, 200.0, epsilon = 1e-9);
        assert_eq!(
            ledger.overdrafts,
            vec![Overdraft {
                index: 3,
                requested: 15_000.0,
                available: 10_000.0
            }]
        );
    }

    #[test]
    fn long_with_no_cash_buys_nothing() {
        let mut ledger = Ledger::new(10_000.0);
        ledger.apply(0, Decision::Long, 50.0, 1.0).unwrap();
        ledger.apply(1, Decision::Long, 50.0, 1.0).unwrap();

        assert_eq!(ledger.cash, 0.0);
        assert_eq!(ledger.fills.len(), 1);
        assert!(ledger.overdrafts.is_empty());
    }

    #[test]
    fn invalid_price_rejected_without_mutation() {
        let mut ledger = Ledger::new(10_000.0);
        for price in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            let err = ledger.apply(7, Decision::Flat, price, 0.1).unwrap_err();
            assert!(matches!(err, LedgerError::InvalidPrice { index: 7, .. }));
        }
        assert!(ledger.trajectory.is_empty());
    }

    #[test]
    fn invalid_fraction_rejected_on_long() {
        let mut ledger = Ledger::new(10_000.0);
        let err = ledger.apply(2, Decision::Long, 10.0, -0.1).unwrap_err();
        assert_eq!(
            err,
            LedgerError::InvalidFraction {
                index: 2,
                fraction: -0.1
            }
        );
        assert!(ledger.trajectory.is_empty());
        // ignored when not buying
        assert!(ledger.apply(2, Decision::Flat, 10.0, f64::NAN).is_ok());
    }

    #[test]
    fn equity_at_marks_units() {
        let mut ledger = Ledger::new(1_000.0);
        ledger.apply(0, Decision::Long, 10.0, 0.5).unwrap();
        assert_relative_eq!(ledger.equity_at(20.0), 500.0 + 50.0 * 20.0, epsilon = 1e-9);
        assert_relative_eq!(ledger.total_value(), 1_000.0, epsilon = 1e-9);
    }
}
