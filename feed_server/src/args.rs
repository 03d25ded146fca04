//! Command-line arguments for the feed server.
//!
//! Parsed with `clap` and converted into a validated `FeedConfig`.
use std::path::PathBuf;

use clap::Parser;
use feed_common::net::{
    DEFAULT_BROADCAST_PERIOD_MS, DEFAULT_CLOSE_MINUTE, DEFAULT_CLOSED_POLL_SECS,
    DEFAULT_MAX_RATE_PER_SECOND, DEFAULT_OPEN_MINUTE, DEFAULT_UTC_OFFSET_MINUTES,
};

/// Parsed command-line arguments.
#[derive(Debug, Parser)]
#[command(version, about = "Simulated real-time market data feed", long_about = None)]
pub struct Args {
    /// Address to accept client sessions on.
    #[clap(long, default_value = "0.0.0.0:8080")]
    pub bind: String,

    /// JSON seed file mapping symbol to its starting OHLC/volume row.
    /// The built-in universe is used when omitted.
    #[clap(long)]
    pub seeds: Option<PathBuf>,

    /// Milliseconds between broadcast cycles while the market is open.
    #[clap(long, default_value_t = DEFAULT_BROADCAST_PERIOD_MS)]
    pub broadcast_period_ms: u64,

    /// Seconds between market-gate polls while the market is closed.
    #[clap(long, default_value_t = DEFAULT_CLOSED_POLL_SECS)]
    pub closed_poll_secs: u64,

    /// Broadcast cycles admitted per connection per second.
    #[clap(long, default_value_t = DEFAULT_MAX_RATE_PER_SECOND)]
    pub max_rate: u32,

    /// Market timezone as minutes east of UTC.
    #[clap(long, default_value_t = DEFAULT_UTC_OFFSET_MINUTES, allow_hyphen_values = true)]
    pub utc_offset_minutes: i32,

    /// Market open, minutes after local midnight.
    #[clap(long, default_value_t = DEFAULT_OPEN_MINUTE)]
    pub open_minute: u32,

    /// Market close, minutes after local midnight (exclusive).
    #[clap(long, default_value_t = DEFAULT_CLOSE_MINUTE)]
    pub close_minute: u32,
}
