//! Validated server configuration.
//!
//! `FeedConfig` is the typed form of the command-line `Args`. Conversion checks
//! every value up front so a bad flag fails at startup, not mid-session.

use std::path::PathBuf;
use std::time::Duration;

use feed_common::net::{
    DEFAULT_BROADCAST_PERIOD_MS, DEFAULT_CLOSE_MINUTE, DEFAULT_CLOSED_POLL_SECS,
    DEFAULT_MAX_RATE_PER_SECOND, DEFAULT_OPEN_MINUTE, DEFAULT_UTC_OFFSET_MINUTES, FEED_PORT, addr,
};
use feed_common::{FeedError, Result};

use crate::args::Args;
use crate::model::market_gate::MarketGate;

/// Everything the server needs to start.
#[derive(Debug, Clone)]
pub struct FeedConfig {
    /// Listen address, `ip:port`.
    pub bind: String,
    /// Seed file; the built-in table is used when absent.
    pub seeds: Option<PathBuf>,
    /// Wait between cycles while the market is open.
    pub broadcast_period: Duration,
    /// Wait between gate polls while the market is closed.
    pub closed_poll_interval: Duration,
    /// Admitted sends per connection per one-second window.
    pub max_rate_per_second: u32,
    /// Market timezone as minutes east of UTC.
    pub utc_offset_minutes: i32,
    /// Open, minutes after local midnight (inclusive).
    pub open_minute: u32,
    /// Close, minutes after local midnight (exclusive).
    pub close_minute: u32,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            bind: addr("0.0.0.0", FEED_PORT),
            seeds: None,
            broadcast_period: Duration::from_millis(DEFAULT_BROADCAST_PERIOD_MS),
            closed_poll_interval: Duration::from_secs(DEFAULT_CLOSED_POLL_SECS),
            max_rate_per_second: DEFAULT_MAX_RATE_PER_SECOND,
            utc_offset_minutes: DEFAULT_UTC_OFFSET_MINUTES,
            open_minute: DEFAULT_OPEN_MINUTE,
            close_minute: DEFAULT_CLOSE_MINUTE,
        }
    }
}

impl FeedConfig {
    /// Reject values the server cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.broadcast_period.is_zero() {
            return Err(FeedError::Config("broadcast period must be non-zero".to_string()));
        }
        if self.closed_poll_interval.is_zero() {
            return Err(FeedError::Config("closed poll interval must be non-zero".to_string()));
        }
        if self.max_rate_per_second == 0 {
            return Err(FeedError::Config("max rate must be at least 1".to_string()));
        }
        self.market_gate()?;
        Ok(())
    }

    /// Gate for the configured trading window.
    pub fn market_gate(&self) -> Result<MarketGate> {
        MarketGate::new(self.utc_offset_minutes, self.open_minute, self.close_minute)
    }
}

impl TryFrom<&Args> for FeedConfig {
    type Error = FeedError;

    fn try_from(args: &Args) -> Result<Self> {
        let config = FeedConfig {
            bind: args.bind.trim().to_string(),
            seeds: args.seeds.clone(),
            broadcast_period: Duration::from_millis(args.broadcast_period_ms),
            closed_poll_interval: Duration::from_secs(args.closed_poll_secs),
            max_rate_per_second: args.max_rate,
            utc_offset_minutes: args.utc_offset_minutes,
            open_minute: args.open_minute,
            close_minute: args.close_minute,
        };
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn parse(extra: &[&str]) -> Result<FeedConfig> {
        let mut argv = vec!["feed_server"];
        argv.extend_from_slice(extra);
        FeedConfig::try_from(&Args::parse_from(argv))
    }

    #[test]
    fn test_defaults_match_documented_values() {
        let config = parse(&[]).unwrap();
        assert_eq!(config.bind, "0.0.0.0:8080");
        assert_eq!(config.broadcast_period, Duration::from_millis(800));
        assert_eq!(config.closed_poll_interval, Duration::from_secs(30));
        assert_eq!(config.max_rate_per_second, 50);
        assert_eq!(config.utc_offset_minutes, 330);
        assert_eq!((config.open_minute, config.close_minute), (600, 1140));
        assert!(config.seeds.is_none());
    }

    #[test]
    fn test_overrides() {
        let config = parse(&[
            "--broadcast-period-ms",
            "250",
            "--max-rate",
            "5",
            "--utc-offset-minutes",
            "-300",
            "--seeds",
            "seeds.json",
        ])
        .unwrap();
        assert_eq!(config.broadcast_period, Duration::from_millis(250));
        assert_eq!(config.max_rate_per_second, 5);
        assert_eq!(config.utc_offset_minutes, -300);
        assert_eq!(config.seeds, Some(PathBuf::from("seeds.json")));
    }

    #[test]
    fn test_rejects_invalid_values() {
        assert!(matches!(parse(&["--max-rate", "0"]), Err(FeedError::Config(_))));
        assert!(matches!(parse(&["--broadcast-period-ms", "0"]), Err(FeedError::Config(_))));
        assert!(matches!(
            parse(&["--open-minute", "1200", "--close-minute", "600"]),
            Err(FeedError::Config(_))
        ));
    }
}
