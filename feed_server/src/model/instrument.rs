//! Per-symbol OHLC/volume state.
//!
//! The store is built once from the seed table and never gains or loses symbols.
//! Readers only ever receive copies; in-place mutation goes through
//! [`InstrumentStore::apply_tick`], which keeps `low <= open, close <= high`.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};

use chrono::NaiveDate;
use feed_common::FeedError;
use feed_common::quote::Quote;
use feed_common::symbols::SeedTable;

/// Store shared between the broadcast loop (writer) and session handlers (readers).
pub type SharedStore = Arc<RwLock<InstrumentStore>>;

/// Current state of one instrument.
#[derive(Debug, Clone, PartialEq)]
pub struct Instrument {
    /// Unique key.
    pub symbol: String,
    /// Trading date.
    pub date: NaiveDate,
    /// Session open.
    pub open: f64,
    /// Session high.
    pub high: f64,
    /// Session low.
    pub low: f64,
    /// Last price.
    pub close: f64,
    /// Cumulative session volume.
    pub volume: u64,
    /// Last update, epoch milliseconds.
    pub updated_at: i64,
}

impl Instrument {
    /// Format the outbound quote for this snapshot.
    pub fn to_quote(&self) -> Quote {
        Quote::from_ohlc(
            &self.symbol,
            self.open,
            self.high,
            self.low,
            self.close,
            self.volume,
            self.updated_at,
        )
    }
}

/// One mutation produced by the tick generator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickDelta {
    /// New last price.
    pub price: f64,
    /// Volume added to the running total.
    pub volume: u64,
    /// Generation instant, epoch milliseconds.
    pub timestamp: i64,
}

/// Owner of every instrument's state.
#[derive(Debug, Clone)]
pub struct InstrumentStore {
    instruments: HashMap<String, Instrument>,
    symbols: Vec<String>,
}

impl InstrumentStore {
    /// Build the store from seed rows; `now_ms` becomes every instrument's timestamp.
    pub fn from_seed(table: &SeedTable, now_ms: i64) -> Self {
        let mut instruments = HashMap::with_capacity(table.len());
        let mut symbols = Vec::with_capacity(table.len());
        for (symbol, row) in table.iter() {
            symbols.push(symbol.clone());
            instruments.insert(
                symbol.clone(),
                Instrument {
                    symbol: symbol.clone(),
                    date: row.date,
                    open: row.open,
                    high: row.high,
                    low: row.low,
                    close: row.close,
                    volume: row.volume,
                    updated_at: now_ms,
                },
            );
        }
        Self {
            instruments,
            symbols,
        }
    }

    /// Wrap in the lock shared across threads.
    pub fn into_shared(self) -> SharedStore {
        Arc::new(RwLock::new(self))
    }

    /// Copy of one instrument.
    pub fn get(&self, symbol: &str) -> Option<Instrument> {
        self.instruments.get(symbol).cloned()
    }

    /// The fixed symbol universe, in seed order.
    pub fn symbols(&self) -> &[String] {
        &self.symbols
    }

    /// Copies of every instrument in `wanted`, in seed order.
    pub fn snapshot(&self, wanted: &HashSet<String>) -> Vec<Instrument> {
        self.symbols
            .iter()
            .filter(|symbol| wanted.contains(*symbol))
            .filter_map(|symbol| self.instruments.get(symbol).cloned())
            .collect()
    }

    /// Apply one tick in place and return the post-mutation copy.
    pub fn apply_tick(&mut self, symbol: &str, delta: TickDelta) -> Result<Instrument, FeedError> {
        let instrument = self
            .instruments
            .get_mut(symbol)
            .ok_or_else(|| FeedError::SymbolNotFound(symbol.to_string()))?;

        instrument.close = delta.price;
        if delta.price > instrument.high {
            instrument.high = delta.price;
        }
        if delta.price < instrument.low {
            instrument.low = delta.price;
        }
        instrument.volume = instrument.volume.saturating_add(delta.volume);
        instrument.updated_at = delta.timestamp;
        Ok(instrument.clone())
    }
}
