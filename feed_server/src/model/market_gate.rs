//! Trading-hours gate.
//!
//! The market is open when the local time at a fixed UTC offset falls inside
//! `[open_minute, close_minute)` minutes after midnight. The gate holds no state;
//! the broadcast loop polls it every cycle.

use chrono::{DateTime, FixedOffset, Timelike, Utc};
use strum_macros::Display;

use feed_common::FeedError;

const MINUTES_PER_DAY: u32 = 24 * 60;

/// Result of a gate check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum MarketState {
    /// Broadcasting permitted.
    Open,
    /// Broadcasting suspended.
    Closed,
}

/// Fixed-offset trading window.
#[derive(Debug, Clone, Copy)]
pub struct MarketGate {
    offset: FixedOffset,
    open_minute: u32,
    close_minute: u32,
}

impl MarketGate {
    /// Gate for `[open_minute, close_minute)` local time at `utc_offset_minutes`.
    pub fn new(utc_offset_minutes: i32, open_minute: u32, close_minute: u32) -> Result<Self, FeedError> {
        let offset = FixedOffset::east_opt(utc_offset_minutes * 60).ok_or_else(|| {
            FeedError::Config(format!("UTC offset out of range: {} minutes", utc_offset_minutes))
        })?;
        if close_minute > MINUTES_PER_DAY {
            return Err(FeedError::Config(format!(
                "close minute {} is past the end of the day",
                close_minute
            )));
        }
        if open_minute >= close_minute {
            return Err(FeedError::Config(format!(
                "open minute {} must be before close minute {}",
                open_minute, close_minute
            )));
        }
        Ok(Self {
            offset,
            open_minute,
            close_minute,
        })
    }

    /// State of the market at `now`.
    pub fn state_at(&self, now: DateTime<Utc>) -> MarketState {
        let local = now.with_timezone(&self.offset);
        let minutes = local.hour() * 60 + local.minute();
        if (self.open_minute..self.close_minute).contains(&minutes) {
            MarketState::Open
        } else {
            MarketState::Closed
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use feed_common::net::{DEFAULT_CLOSE_MINUTE, DEFAULT_OPEN_MINUTE, DEFAULT_UTC_OFFSET_MINUTES};
    use rstest::rstest;

    fn ist_gate() -> MarketGate {
        MarketGate::new(DEFAULT_UTC_OFFSET_MINUTES, DEFAULT_OPEN_MINUTE, DEFAULT_CLOSE_MINUTE).unwrap()
    }

    // IST is UTC+5:30, so 12:00 IST is 06:30 UTC.
    #[rstest]
    #[case(6, 30, MarketState::Open)]
    #[case(14, 30, MarketState::Closed)]
    #[case(3, 30, MarketState::Closed)]
    #[case(4, 29, MarketState::Closed)]
    #[case(4, 30, MarketState::Open)]
    #[case(13, 29, MarketState::Open)]
    #[case(13, 30, MarketState::Closed)]
    fn test_state_at_utc(#[case] hour: u32, #[case] minute: u32, #[case] expected: MarketState) {
        let now = Utc.with_ymd_and_hms(2024, 1, 15, hour, minute, 0).unwrap();
        assert_eq!(ist_gate().state_at(now), expected);
    }

    #[test]
    fn test_rejects_inverted_window() {
        assert!(matches!(MarketGate::new(0, 600, 600), Err(FeedError::Config(_))));
        assert!(matches!(MarketGate::new(0, 700, 600), Err(FeedError::Config(_))));
    }

    #[test]
    fn test_rejects_bad_offset_and_close() {
        assert!(MarketGate::new(24 * 60, 0, 60).is_err());
        assert!(MarketGate::new(0, 0, MINUTES_PER_DAY + 1).is_err());
        assert!(MarketGate::new(0, 0, MINUTES_PER_DAY).is_ok());
    }
}
