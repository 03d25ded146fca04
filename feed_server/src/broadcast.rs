//! Periodic tick-and-fan-out driver.
//!
//! `BroadcastLoop` is the only writer of instrument state after startup and the
//! only source of `update` events. Every cycle it polls the market gate:
//!
//! - closed: nothing is generated, the next poll is `closed_poll` away;
//! - open: one batch is generated, then each live connection that the rate
//!   limiter admits gets one `update` per batch instrument it subscribes to, in
//!   batch order. The next cycle is `period` away.
//!
//! A single thread runs the loop, so ticks never overlap. `run` waits on a
//! `crossbeam_channel::select!` so a stop message ends it between cycles.

use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::{Receiver, select};
use feed_common::{Result, ServerEvent};
use log::{debug, error, info, trace, warn};
use rand::Rng;
use rand::rngs::StdRng;

use crate::clock::Clock;
use crate::config::FeedConfig;
use crate::model::instrument::{Instrument, SharedStore};
use crate::model::market_gate::{MarketGate, MarketState};
use crate::model::registry::Registry;
use crate::model::tick_generator::TickGenerator;

/// Scheduler driving tick generation and fan-out.
pub struct BroadcastLoop<R: Rng = StdRng> {
    store: SharedStore,
    registry: Arc<Registry>,
    generator: TickGenerator<R>,
    gate: MarketGate,
    clock: Arc<dyn Clock>,
    period: Duration,
    closed_poll: Duration,
    last_state: Option<MarketState>,
}

impl<R: Rng> BroadcastLoop<R> {
    /// Loop over the shared store and registry, timed by `config`.
    pub fn new(
        config: &FeedConfig,
        store: SharedStore,
        registry: Arc<Registry>,
        generator: TickGenerator<R>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        Ok(Self {
            store,
            registry,
            generator,
            gate: config.market_gate()?,
            clock,
            period: config.broadcast_period,
            closed_poll: config.closed_poll_interval,
            last_state: None,
        })
    }

    /// Run one cycle and return how long to wait before the next one.
    pub fn step(&mut self) -> Result<Duration> {
        let now = self.clock.now();
        let state = self.gate.state_at(now);
        if self.last_state != Some(state) {
            info!("Market is {}", state);
            self.last_state = Some(state);
        }
        if state == MarketState::Closed {
            return Ok(self.closed_poll);
        }

        let now_ms = now.timestamp_millis();
        let batch = {
            let mut store = self.store.write()?;
            self.generator.generate(&mut store, now_ms)?
        };
        let sent = self.fan_out(&batch, now_ms)?;
        trace!("Cycle moved {} instrument(s), sent {} update(s)", batch.len(), sent);
        Ok(self.period)
    }

    /// Deliver `batch` to every admitted, interested connection. Returns the
    /// number of `update` events queued.
    pub fn fan_out(&self, batch: &[Instrument], now_ms: i64) -> Result<usize> {
        let mut sent = 0;
        for connection in self.registry.connections()? {
            // Held across the sends so an unregister cannot interleave.
            let mut state = match connection.state() {
                Ok(state) => state,
                Err(e) => {
                    warn!("Skipping {}: {}", connection.id(), e);
                    continue;
                }
            };
            if !state.limiter.try_acquire(now_ms) {
                trace!(
                    "{} rate limited ({} admitted this window), cycle dropped",
                    connection.id(),
                    state.limiter.count()
                );
                continue;
            }

            let interesting = batch
                .iter()
                .filter(|instrument| state.subscriptions.contains(&instrument.symbol));
            for instrument in interesting {
                match connection.send_locked(&state, ServerEvent::Update(instrument.to_quote())) {
                    Ok(true) => sent += 1,
                    Ok(false) => break,
                    Err(e) => {
                        debug!("Dropping updates for {}: {}", connection.id(), e);
                        break;
                    }
                }
            }
        }
        Ok(sent)
    }

    /// Loop `step` until a message arrives on (or every sender drops) `stop_rx`.
    pub fn run(mut self, stop_rx: Receiver<()>) {
        info!(
            "Broadcast loop started (period {:?}, closed poll {:?})",
            self.period, self.closed_poll
        );
        loop {
            let wait = match self.step() {
                Ok(wait) => wait,
                Err(e) => {
                    error!("Broadcast cycle failed: {}", e);
                    self.period
                }
            };
            select! {
                recv(stop_rx) -> _ => break,
                default(wait) => {}
            }
        }
        info!("Broadcast loop stopped");
    }
}
