//! Feed Client: a TCP client that subscribes to the market feed simulator and logs
//! every event it receives. It resolves the symbols to follow from a text file or
//! the command line, sends a `subscribe` event, keeps the session alive with periodic
//! `ping`s, and continuously reads `snapshot`, `update`, `info` and `pong` events.
//!
//! Usage example (CLI):
//! ```bash
//! feed_client --server-ip 192.168.0.10 --symbols AAPL,TSLA
//! feed_client --path ./symbols.txt
//! ```
//!
//! With neither `--symbols` nor `--path`, the client subscribes to every symbol.
#![warn(missing_docs)]
mod args;
mod sender;

use crate::args::Args;
use crate::sender::CommandSender;
use chrono::{TimeZone, Utc};
use clap::Parser;
use feed_common::net::addr;
use feed_common::symbols::{SymbolParser, Symbols};
use feed_common::{ClientMessage, FeedError, Quote, Result, ServerEvent};
use log::{debug, error, info};
use std::fs::File;
use std::io::{BufRead, BufReader, ErrorKind};
use std::net::TcpStream;
use std::path::PathBuf;
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use std::time::Duration;

/// Human-readable one-line rendering of a quote.
fn format_quote(quote: &Quote) -> String {
    let time = Utc
        .timestamp_millis_opt(quote.event_ts)
        .single()
        .map(|t| t.format("%H:%M:%S%.3f").to_string())
        .unwrap_or_else(|| quote.event_ts.to_string());
    format!(
        "{} Last={:.4} O={:.2} H={:.2} L={:.2} Chg={:+.4} ({:+.2}%) Vol={} Time={}",
        quote.symbol,
        quote.last,
        quote.open,
        quote.high,
        quote.low,
        quote.day_change,
        quote.day_change_percent,
        quote.volume,
        time
    )
}

/// Upper-cased event name used as the log prefix.
fn event_label(event: &ServerEvent) -> String {
    let name: &str = event.as_ref();
    name.to_ascii_uppercase()
}

fn log_event(event: &ServerEvent) {
    let label = event_label(event);
    match event {
        ServerEvent::Info(text) => info!("{}: {}", label, text),
        ServerEvent::Snapshot(quotes) => {
            info!("{}: {} symbol(s)", label, quotes.len());
            for quote in quotes {
                info!("  {}", format_quote(quote));
            }
        }
        ServerEvent::Update(quote) => info!("{}: {}", label, format_quote(quote)),
        ServerEvent::Pong(millis) => debug!("{}: {}", label, millis),
    }
}

/// Runs a blocking loop that reads event lines from the server and logs them.
/// Returns when `shutdown` is set or the server closes the session.
fn start_receiver_loop<R: BufRead>(mut reader: R, shutdown: Arc<AtomicBool>) -> Result<(), FeedError> {
    let mut line = String::new();

    while !shutdown.load(Ordering::Relaxed) {
        match reader.read_line(&mut line) {
            Ok(0) => {
                info!("Server closed the session");
                break;
            }
            Ok(_) => {
                match ServerEvent::decode(line.trim_end()) {
                    Ok(event) => log_event(&event),
                    Err(_) => debug!("Received non-event message: {}", line.trim_end()),
                }
                line.clear();
            }
            Err(e) => {
                if e.kind() == ErrorKind::WouldBlock || e.kind() == ErrorKind::TimedOut {
                    continue;
                }
                error!("Receive data error: {}", e);
                return Err(FeedError::Io(e));
            }
        }
    }
    info!("Receiver loop stopping...");
    Ok(())
}

/// Symbols from `--path` if given, else from `--symbols`. `None` means everything.
fn resolve_symbols(args: &Args) -> Result<Option<Vec<String>>> {
    if let Some(raw) = &args.path {
        let path = normalize_path(raw);
        if !is_file_exist(&path) {
            return Err(FeedError::ParseSymbolsFile(format!(
                "no such file: {}",
                path.display()
            )));
        }
        let symbols = Symbols::parse_from_file(BufReader::new(File::open(path)?))?;
        return Ok(Some(symbols));
    }
    let symbols: Vec<String> = args
        .symbols
        .iter()
        .map(|s| s.trim().to_ascii_uppercase())
        .filter(|s| !s.is_empty())
        .collect();
    Ok(if symbols.is_empty() { None } else { Some(symbols) })
}

fn main() -> Result<(), FeedError> {
    init_logger();
    let args = Args::parse();
    let shutdown = Arc::new(AtomicBool::new(false));
    {
        let shutdown = shutdown.clone();
        ctrlc::set_handler(move || {
            info!("Ctrl+C received. Shutting down client...");
            shutdown.store(true, Ordering::SeqCst);
        })
        .map_err(|e| FeedError::Format(format!("Error setting Ctrl+C handler: {}", e)))?;
    }

    let server_ip = args.server_ip.trim().replace('"', "");
    let server_address = addr(&server_ip, args.port);
    let symbols = resolve_symbols(&args)?;
    match &symbols {
        Some(list) => info!("Symbols: {:?}", list),
        None => info!("Symbols: all"),
    }

    info!("Connecting to feed server at {}", server_address);
    let stream = TcpStream::connect(&server_address)
        .map_err(|e| FeedError::Format(format!("Failed to connect to server: {}", e)))?;
    stream.set_read_timeout(Some(Duration::from_secs(1)))?;

    let mut writer = stream.try_clone()?;
    CommandSender::send(&mut writer, &ClientMessage::subscribe(symbols))?;
    info!("Subscribe sent to {}", server_address);

    CommandSender::start_ping_thread(writer, shutdown.clone());

    info!("Client is running. Press Ctrl+C to exit.");
    let result = start_receiver_loop(BufReader::new(stream), shutdown.clone());
    shutdown.store(true, Ordering::SeqCst);
    result
}

fn init_logger() {
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();
}

/// Normalize a CLI-provided path string by trimming whitespace and matching quotes.
///
/// This allows passing Windows paths in quotes without breaking parsing.
fn normalize_path(raw: &str) -> PathBuf {
    let trimmed = raw.trim();
    let no_quotes = trimmed
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(trimmed);
    PathBuf::from(no_quotes)
}

/// Returns `true` if the provided path exists and is a regular file.
fn is_file_exist(path: &PathBuf) -> bool {
    path.exists() && path.is_file()
}
