//! Quote payload exchanged between server and client.
//!
//! A `Quote` is derived on demand from an instrument snapshot; it is never stored.
//! The day change fields are computed from the open price at construction time.
use serde::{Deserialize, Serialize};

/// Currency tag attached to every quote.
pub const CURRENCY: &str = "USD";
/// Source tag attached to every quote.
pub const SOURCE: &str = "simulator";

/// Market quote for a single symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    /// Symbol identifier (e.g., `AAPL`).
    pub symbol: String,
    /// Last traded price.
    pub last: f64,
    /// Session open.
    pub open: f64,
    /// Session high.
    pub high: f64,
    /// Session low.
    pub low: f64,
    /// Cumulative session volume.
    pub volume: u64,
    /// `last - open`.
    pub day_change: f64,
    /// `day_change / open * 100`, or `0` when `open` is zero.
    pub day_change_percent: f64,
    /// Event timestamp in milliseconds since the UNIX epoch.
    pub event_ts: i64,
    /// Always [`CURRENCY`].
    pub currency: String,
    /// Always [`SOURCE`].
    pub source: String,
}

impl Quote {
    /// Build a quote from raw OHLC values, deriving the day change fields.
    pub fn from_ohlc(
        symbol: &str,
        open: f64,
        high: f64,
        low: f64,
        last: f64,
        volume: u64,
        event_ts: i64,
    ) -> Self {
        let day_change = last - open;
        let day_change_percent = if open != 0.0 {
            day_change / open * 100.0
        } else {
            0.0
        };
        Quote {
            symbol: symbol.to_string(),
            last,
            open,
            high,
            low,
            volume,
            day_change,
            day_change_percent,
            event_ts,
            currency: CURRENCY.to_string(),
            source: SOURCE.to_string(),
        }
    }
}
