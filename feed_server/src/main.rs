//! Market feed simulator server.
//!
//! This binary keeps synthetic OHLC/volume state for a fixed universe of symbols,
//! mutates it on a timer and streams the changes to subscribed clients over TCP.
//! Internally, it wires together these building blocks:
//!
//! - `InstrumentStore`: per-symbol state built from the seed table, shared behind
//!   an `RwLock`.
//! - `BroadcastLoop`: the single driver: polls the `MarketGate`, asks the
//!   `TickGenerator` for a batch, and fans it out through the `Registry`, subject to
//!   each connection's `RateLimiter`.
//! - `FeedService`: applies inbound `subscribe`/`unsubscribe`/`ping` events and
//!   replies with `snapshot`/`info`/`pong`.
//! - `FeedListener` and `session`: accept TCP clients and run a reader and a writer
//!   thread per session.
//!
//! Wire protocol: one JSON object per line, `{"event": <name>, "data": <payload>}`
//! in both directions. See `feed_common::message`.
//!
//! Concurrency and shutdown:
//! - The broadcast loop runs on its own thread and stops when a message arrives on
//!   its crossbeam stop channel.
//! - A session ends when its reader sees EOF; its registry entry, subscriptions and
//!   rate window are then dropped.
#![warn(missing_docs)]
use crate::args::Args;
use crate::broadcast::BroadcastLoop;
use crate::clock::{Clock, SystemClock};
use crate::config::FeedConfig;
use crate::listener::FeedListener;
use crate::model::instrument::InstrumentStore;
use crate::model::registry::Registry;
use crate::model::tick_generator::TickGenerator;
use crate::service::FeedService;
use clap::Parser;
use crossbeam_channel::unbounded;
use feed_common::Result;
use feed_common::symbols::SeedTable;
use log::{debug, error, info};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::Arc;
use std::thread;

mod args;
mod broadcast;
mod clock;
mod config;
mod listener;
pub mod model;
mod service;
mod session;

fn load_seeds(path: Option<&Path>) -> Result<SeedTable> {
    match path {
        Some(path) => {
            let table = SeedTable::from_reader(BufReader::new(File::open(path)?))?;
            info!("Loaded {} seed rows from {}", table.len(), path.display());
            Ok(table)
        }
        None => Ok(SeedTable::builtin()),
    }
}

fn main() -> Result<()> {
    init_logger();
    let args = Args::parse();
    let config = FeedConfig::try_from(&args)?;
    let seeds = load_seeds(config.seeds.as_deref())?;

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let store = InstrumentStore::from_seed(&seeds, clock.now_millis());
    info!("Instrument universe: {}", store.symbols().join(", "));
    for instrument in store.symbols().iter().filter_map(|symbol| store.get(symbol)) {
        debug!(
            "{} {} O={} H={} L={} C={} V={}",
            instrument.symbol,
            instrument.date,
            instrument.open,
            instrument.high,
            instrument.low,
            instrument.close,
            instrument.volume
        );
    }
    let registry = Arc::new(Registry::new(
        store.symbols().to_vec(),
        config.max_rate_per_second,
    ));
    let store = store.into_shared();

    let service = Arc::new(FeedService::new(
        Arc::clone(&registry),
        Arc::clone(&store),
        Arc::clone(&clock),
    ));
    let broadcast = BroadcastLoop::new(
        &config,
        store,
        registry,
        TickGenerator::new(StdRng::from_os_rng()),
        clock,
    )?;

    let (stop_tx, stop_rx) = unbounded::<()>();
    let broadcaster = thread::spawn(move || broadcast.run(stop_rx));

    let listener = FeedListener::bind(&config.bind)?;
    let result = listener.accept_loop(service);
    if let Err(e) = &result {
        error!("Accept loop failed: {}", e);
    }

    let _ = stop_tx.send(());
    if broadcaster.join().is_err() {
        error!("Broadcast thread panicked");
    }
    result
}

fn init_logger() {
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();
}
