//! Random-walk tick generation.
//!
//! Each cycle moves a small random subset of the universe: between
//! [`MIN_BATCH`] and [`MAX_BATCH`] distinct symbols, each by at most
//! [`MAX_MOVE`] of its last price, with a fresh volume increment. Symbols are
//! picked with `rand::seq::index::sample`, so selection cost is bounded by the
//! batch size regardless of how large the universe grows.

use rand::Rng;
use rand::rngs::StdRng;
use rand::seq::index;

use crate::model::instrument::{Instrument, InstrumentStore, TickDelta};
use feed_common::FeedError;

/// Fewest symbols moved per cycle.
pub const MIN_BATCH: usize = 3;
/// Most symbols moved per cycle.
pub const MAX_BATCH: usize = 6;
/// Largest relative price move per tick (0.4%).
pub const MAX_MOVE: f64 = 0.004;
/// Smallest volume increment per tick.
pub const MIN_VOLUME_STEP: u64 = 5_000;
/// Exclusive upper bound for the volume increment.
pub const MAX_VOLUME_STEP: u64 = 25_000;

/// Round a price to 4 decimal places.
pub fn round_price(price: f64) -> f64 {
    (price * 10_000.0).round() / 10_000.0
}

/// Advances instrument state with a bounded random walk.
pub struct TickGenerator<R: Rng = StdRng> {
    rng: R,
}

impl<R: Rng> TickGenerator<R> {
    /// Generator drawing from `rng`.
    pub fn new(rng: R) -> Self {
        Self { rng }
    }

    /// Move a random batch of symbols and return post-mutation copies in
    /// selection order.
    pub fn generate(
        &mut self,
        store: &mut InstrumentStore,
        now_ms: i64,
    ) -> Result<Vec<Instrument>, FeedError> {
        let universe = store.symbols().len();
        if universe == 0 {
            return Ok(Vec::new());
        }
        let count = self.rng.random_range(MIN_BATCH..=MAX_BATCH).min(universe);
        let picked: Vec<String> = index::sample(&mut self.rng, universe, count)
            .into_iter()
            .map(|i| store.symbols()[i].clone())
            .collect();
        self.tick_symbols(store, &picked, now_ms)
    }

    /// Move exactly the given symbols, in the given order.
    pub fn tick_symbols(
        &mut self,
        store: &mut InstrumentStore,
        symbols: &[String],
        now_ms: i64,
    ) -> Result<Vec<Instrument>, FeedError> {
        let mut batch = Vec::with_capacity(symbols.len());
        for symbol in symbols {
            let close = store
                .get(symbol)
                .ok_or_else(|| FeedError::SymbolNotFound(symbol.clone()))?
                .close;
            let change: f64 = self.rng.random_range(-MAX_MOVE..=MAX_MOVE);
            let delta = TickDelta {
                price: round_price(close * (1.0 + change)),
                volume: self.rng.random_range(MIN_VOLUME_STEP..MAX_VOLUME_STEP),
                timestamp: now_ms,
            };
            batch.push(store.apply_tick(symbol, delta)?);
        }
        Ok(batch)
    }
}
