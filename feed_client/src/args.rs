//! Command-line arguments for the feed client.
//!
//! This module defines the CLI interface using `clap`. See `main` for end-to-end usage.
use clap::Parser;
use feed_common::net::FEED_PORT;

/// Parsed command-line arguments.
#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Server IP address (IPv4 or IPv6) where the feed is running.
    #[clap(long, default_value = "127.0.0.1")]
    pub server_ip: String,

    /// Server TCP port.
    #[clap(long, default_value_t = FEED_PORT)]
    pub port: u16,

    /// Symbols to subscribe to, comma separated. Everything when omitted.
    #[clap(long, value_delimiter = ',')]
    pub symbols: Vec<String>,

    /// Path to a text file with symbols to subscribe to.
    /// Symbols may be separated by commas, spaces, or new lines.
    /// Takes precedence over `--symbols`.
    #[clap(long)]
    pub path: Option<String>,
}
