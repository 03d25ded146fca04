//! Symbol universe, seed data and symbol-file parsing.
//!
//! The server builds its instrument universe from a `SeedTable`: an ordered map of
//! symbol to the starting OHLC/volume row. The client reads the symbols it wants
//! from a plain text file through `SymbolParser`.

use std::collections::BTreeMap;
use std::io::{BufRead, Read};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::FeedError;

/// Trait providing file parsing for symbol lists.
pub trait SymbolParser {
    /// Parses symbols from a buffered reader.
    ///
    /// Symbols may be separated by commas, whitespace or new lines. Each one is
    /// upper-cased; duplicates keep their first position. A token containing
    /// anything other than ASCII alphanumerics, `.` or `-` is an error.
    fn parse_from_file<R: BufRead>(reader: R) -> Result<Vec<String>, FeedError>;
}

/// Plain symbol strings, the form used on the wire.
pub struct Symbols;

impl SymbolParser for Symbols {
    fn parse_from_file<R: BufRead>(reader: R) -> Result<Vec<String>, FeedError> {
        let mut symbols: Vec<String> = Vec::new();

        for line_result in reader.lines() {
            let line = line_result.map_err(FeedError::Io)?;
            for token in line.split(|c: char| c == ',' || c.is_whitespace()) {
                let token = token.trim();
                if token.is_empty() {
                    continue;
                }
                if !token
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-')
                {
                    return Err(FeedError::ParseSymbolsFile(format!(
                        "invalid symbol '{}'",
                        token
                    )));
                }
                let symbol = token.to_ascii_uppercase();
                if !symbols.contains(&symbol) {
                    symbols.push(symbol);
                }
            }
        }
        Ok(symbols)
    }
}

/// Starting snapshot for one instrument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeedRow {
    /// Trading date the snapshot belongs to.
    pub date: NaiveDate,
    /// Session open price.
    pub open: f64,
    /// Session high.
    pub high: f64,
    /// Session low.
    pub low: f64,
    /// Last price.
    pub close: f64,
    /// Cumulative session volume.
    pub volume: u64,
}

impl SeedRow {
    fn validate(&self, symbol: &str) -> Result<(), FeedError> {
        let invalid = |reason: &str| FeedError::InvalidSeed {
            symbol: symbol.to_string(),
            reason: reason.to_string(),
        };
        let prices = [self.open, self.high, self.low, self.close];
        if prices.iter().any(|p| !p.is_finite() || *p <= 0.0) {
            return Err(invalid("prices must be finite and positive"));
        }
        if !(self.low <= self.open && self.open <= self.high) {
            return Err(invalid("open outside [low, high]"));
        }
        if !(self.low <= self.close && self.close <= self.high) {
            return Err(invalid("close outside [low, high]"));
        }
        Ok(())
    }
}

/// Ordered mapping of symbol to its seed row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SeedTable {
    rows: BTreeMap<String, SeedRow>,
}

impl SeedTable {
    /// Build a table from rows, validating every one of them.
    pub fn new(rows: BTreeMap<String, SeedRow>) -> Result<Self, FeedError> {
        for (symbol, row) in &rows {
            row.validate(symbol)?;
        }
        Ok(Self { rows })
    }

    /// Load a JSON object of `symbol -> row` and validate it.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, FeedError> {
        let rows: BTreeMap<String, SeedRow> = serde_json::from_reader(reader)?;
        Self::new(rows)
    }

    /// Default universe shipped with the simulator.
    pub fn builtin() -> Self {
        let date = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap_or_default();
        let rows = [
            ("AAPL", 185.92, 186.74, 183.43, 185.14, 52_448_900),
            ("MSFT", 388.47, 390.68, 385.59, 390.27, 20_146_100),
            ("GOOGL", 142.08, 143.55, 141.23, 142.65, 23_516_500),
            ("AMZN", 153.30, 154.99, 152.15, 154.62, 41_884_300),
            ("NVDA", 546.20, 549.80, 535.31, 547.10, 38_219_200),
            ("META", 367.82, 375.09, 366.41, 373.85, 14_713_100),
            ("TSLA", 218.89, 223.49, 212.65, 219.91, 115_355_000),
            ("JPM", 171.22, 172.60, 169.84, 170.31, 9_611_400),
            ("V", 268.45, 271.10, 267.32, 270.28, 6_233_700),
            ("NFLX", 485.10, 493.78, 481.40, 492.19, 3_962_800),
        ];
        let rows = rows
            .into_iter()
            .map(|(symbol, open, high, low, close, volume)| {
                (
                    symbol.to_string(),
                    SeedRow {
                        date,
                        open,
                        high,
                        low,
                        close,
                        volume,
                    },
                )
            })
            .collect();
        Self { rows }
    }

    /// Iterate rows in symbol order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &SeedRow)> {
        self.rows.iter()
    }

    /// Number of symbols in the table.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// `true` when the table has no symbols.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
