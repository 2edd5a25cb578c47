//! Price data access port trait.

use chrono::NaiveDate;

use crate::domain::error::SignalTraderError;
use crate::domain::ohlcv::PriceBar;

pub trait DataPort {
    /// Bars for `symbol` with timestamps on or between the two dates, in
    /// strictly increasing timestamp order. Either bound may be open.
    fn fetch_bars(
        &self,
        symbol: &str,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<Vec<PriceBar>, SignalTraderError>;

    fn list_symbols(&self) -> Result<Vec<String>, SignalTraderError>;
}
