//! Error types shared between the feed server and client.
//!
//! `FeedError` covers process-level failures only: socket and file I/O, JSON
//! encoding, seed and configuration validation, channel closure and poisoned
//! locks. Malformed client input never produces one of these; the server
//! tolerates it and moves on.
use std::io;
use std::sync::PoisonError;

use thiserror::Error;

/// Unified error type shared by server and client.
#[derive(Error, Debug)]
pub enum FeedError {
    /// I/O error originating from sockets or files.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Generic formatting/validation error with a human-readable message.
    #[error("Format error: {0}")]
    Format(String),

    /// Failure while encoding/decoding JSON via serde_json.
    #[error("JSON serialization/deserialization error: {0}")]
    SerdeJson(#[from] serde_json::Error),

    /// Error while parsing a symbols file.
    #[error("Parse symbols file error: {0}")]
    ParseSymbolsFile(String),

    /// A seed row breaks the OHLC ordering or carries a non-positive price.
    #[error("Invalid seed for {symbol}: {reason}")]
    InvalidSeed {
        /// Offending symbol.
        symbol: String,
        /// What is wrong with the row.
        reason: String,
    },

    /// Server configuration rejected during validation.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Channel send failed because the receiving side is gone.
    #[error("Channel send failed: {0}")]
    ChannelSend(String),

    /// A poisoned mutex/lock was encountered.
    #[error("Mutex Lock Poisoned: {0}")]
    MutexLock(String),

    /// Internal logic error: a symbol outside the fixed universe was requested.
    #[error("Internal Logic Error: Symbol not found: {0}")]
    SymbolNotFound(String),
}

impl<T> From<PoisonError<T>> for FeedError {
    fn from(err: PoisonError<T>) -> Self {
        FeedError::MutexLock(err.to_string())
    }
}
