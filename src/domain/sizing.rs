//! Position sizing.
//!
//! [`risk_position_size`] is the classic fixed-risk formula. The backtest
//! runner does not call it directly; it asks a [`PositionSizer`] for the
//! fraction of available cash to commit on each LONG decision.

pub const DEFAULT_RISK_FRACTION: f64 = 0.01;
pub const DEFAULT_FIXED_FRACTION: f64 = 0.01;

/// Units to buy so that a move from `entry_price` to `stop_price` loses
/// `capital * risk_fraction`. Zero when the two prices coincide.
pub fn risk_position_size(
    capital: f64,
    risk_fraction: f64,
    entry_price: f64,
    stop_price: f64,
) -> f64 {
    let price_risk = (entry_price - stop_price).abs();
    if price_risk == 0.0 {
        return 0.0;
    }
    capital * risk_fraction / price_risk
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RiskSizer {
    pub risk_fraction: f64,
}

impl Default for RiskSizer {
    fn default() -> Self {
        RiskSizer {
            risk_fraction: DEFAULT_RISK_FRACTION,
        }
    }
}

impl RiskSizer {
    pub fn new(risk_fraction: f64) -> Self {
        RiskSizer { risk_fraction }
    }

    pub fn size(&self, capital: f64, entry_price: f64, stop_price: f64) -> f64 {
        risk_position_size(capital, self.risk_fraction, entry_price, stop_price)
    }
}

/// Ledger state visible to a sizer when a LONG decision is about to be applied.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SizingContext {
    pub index: usize,
    pub price: f64,
    pub cash: f64,
    /// Cash plus the held units marked at `price`.
    pub equity: f64,
}

pub trait PositionSizer {
    /// Fraction of current cash to invest.
    fn fraction(&self, ctx: &SizingContext) -> f64;
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedFraction(pub f64);

impl Default for FixedFraction {
    fn default() -> Self {
        FixedFraction(DEFAULT_FIXED_FRACTION)
    }
}

impl PositionSizer for FixedFraction {
    fn fraction(&self, _ctx: &SizingContext) -> f64 {
        self.0
    }
}

/// Sizes each buy so that hitting a stop `stop_loss_pct` percent below the
/// entry loses `risk_fraction` of equity, then converts the unit count into a
/// fraction of cash capped at 1.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RiskBased {
    pub sizer: RiskSizer,
    pub stop_loss_pct: f64,
}

impl RiskBased {
    pub fn new(risk_fraction: f64, stop_loss_pct: f64) -> Self {
        RiskBased {
            sizer: RiskSizer::new(risk_fraction),
            stop_loss_pct,
        }
    }

    pub fn stop_price(&self, entry_price: f64) -> f64 {
        entry_price * (1.0 - self.stop_loss_pct / 100.0)
    }
}

impl PositionSizer for RiskBased {
    fn fraction(&self, ctx: &SizingContext) -> f64 {
        if ctx.cash <= 0.0 {
            return 0.0;
        }
        let units = self
            .sizer
            .size(ctx.equity, ctx.price, self.stop_price(ctx.price));
        (units * ctx.price / ctx.cash).clamp(0.0, 1.0)
    }
}

/// Sizing choice as it appears in configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SizingMode {
    Fixed { fraction: f64 },
    Risk { risk_fraction: f64, stop_loss_pct: f64 },
}

impl Default for SizingMode {
    fn default() -> Self {
        SizingMode::Fixed {
            fraction: DEFAULT_FIXED_FRACTION,
        }
    }
}

impl SizingMode {
    pub fn sizer(&self) -> Box<dyn PositionSizer> {
        match *self {
            SizingMode::Fixed { fraction } => Box::new(FixedFraction(fraction)),
            SizingMode::Risk {
                risk_fraction,
                stop_loss_pct,
            } => Box::new(RiskBased::new(risk_fraction, stop_loss_pct)),
        }
    }
}
