//! Shared networking constants and defaults used by client and server.

/// TCP port the feed server listens on for client sessions.
pub const FEED_PORT: u16 = 8080;

/// Default interval between broadcast cycles while the market is open.
pub const DEFAULT_BROADCAST_PERIOD_MS: u64 = 800;
/// Default poll interval while the market is closed.
pub const DEFAULT_CLOSED_POLL_SECS: u64 = 30;
/// Default cap on admitted sends per connection per one-second window.
pub const DEFAULT_MAX_RATE_PER_SECOND: u32 = 50;
/// Default market timezone offset from UTC, in minutes (UTC+5:30).
pub const DEFAULT_UTC_OFFSET_MINUTES: i32 = 330;
/// Default market open, minutes after local midnight (10:00).
pub const DEFAULT_OPEN_MINUTE: u32 = 600;
/// Default market close, minutes after local midnight (19:00, exclusive).
pub const DEFAULT_CLOSE_MINUTE: u32 = 1140;

/// Helper to format an IPv4 address with a port like "ip:port".
pub fn addr(ip: &str, port: u16) -> String {
    format!("{}:{}", ip, port)
}
