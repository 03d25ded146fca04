//! Domain models for the feed server.
//!
//! - `instrument`: per-symbol OHLC/volume state and the shared store.
//! - `tick_generator`: random-walk mutation of a batch of instruments.
//! - `market_gate`: trading-hours check at a fixed UTC offset.
//! - `registry`: live connections and their subscription sets.
//! - `rate_limiter`: fixed-window send cap per connection.

pub mod instrument;
pub mod market_gate;
pub mod rate_limiter;
pub mod registry;
pub mod tick_generator;
