//! Connection registry and per-connection subscription state.
//!
//! The registry maps a `ConnectionId` to a `Connection` record holding the
//! outbound sink, the subscription set and the rate window. The map sits behind a
//! `RwLock` and every record behind its own `Mutex`, so session threads only
//! contend with the broadcast loop on their own entry.
//!
//! Sinks never block. A session whose outbound queue is full loses the event;
//! once `unregister` returns, no further event reaches the sink.

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, RwLock};

use crossbeam_channel::{Sender, TrySendError};
use feed_common::{FeedError, ServerEvent};
use log::debug;

use crate::model::rate_limiter::RateLimiter;

/// Opaque handle for one client session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Outbound half of a session's named-event channel.
pub trait EventSink: Send + Sync {
    /// Queue one event for delivery without blocking. Returns `false` when the
    /// queue is full and the event was dropped.
    fn send(&self, event: ServerEvent) -> Result<bool, FeedError>;
}

impl EventSink for Sender<ServerEvent> {
    fn send(&self, event: ServerEvent) -> Result<bool, FeedError> {
        match self.try_send(event) {
            Ok(()) => Ok(true),
            Err(TrySendError::Full(_)) => Ok(false),
            Err(e @ TrySendError::Disconnected(_)) => Err(FeedError::ChannelSend(e.to_string())),
        }
    }
}

/// Symbols a connection wants, always a subset of the universe.
#[derive(Debug, Clone)]
pub struct Subscriptions {
    universe: Arc<HashSet<String>>,
    symbols: HashSet<String>,
}

impl Subscriptions {
    /// Empty set over `universe`.
    pub fn new(universe: Arc<HashSet<String>>) -> Self {
        Self {
            universe,
            symbols: HashSet::new(),
        }
    }

    /// Replace the whole set. `None` or an empty list selects the entire
    /// universe; otherwise unknown symbols are dropped.
    pub fn replace(&mut self, requested: Option<&[String]>) {
        self.symbols = match requested {
            Some(list) if !list.is_empty() => list
                .iter()
                .filter(|symbol| self.universe.contains(*symbol))
                .cloned()
                .collect(),
            _ => self.universe.as_ref().clone(),
        };
    }

    /// Drop each listed symbol. `None` means the payload was not a list and
    /// nothing changes. Returns how many symbols were actually removed.
    pub fn remove(&mut self, requested: Option<&[String]>) -> usize {
        let Some(list) = requested else {
            return 0;
        };
        list.iter().filter(|symbol| self.symbols.remove(*symbol)).count()
    }

    /// Copy of the current set.
    pub fn snapshot(&self) -> HashSet<String> {
        self.symbols.clone()
    }

    /// Whether `symbol` is subscribed.
    pub fn contains(&self, symbol: &str) -> bool {
        self.symbols.contains(symbol)
    }

    /// Number of subscribed symbols.
    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    /// `true` when nothing is subscribed.
    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}

/// Mutable per-connection state.
#[derive(Debug)]
pub struct ConnectionState {
    /// Interest set.
    pub subscriptions: Subscriptions,
    /// Outbound cap.
    pub limiter: RateLimiter,
    closed: bool,
}

/// One registered session.
pub struct Connection {
    id: ConnectionId,
    sink: Box<dyn EventSink>,
    state: Mutex<ConnectionState>,
}

impl Connection {
    /// Handle of this connection.
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Lock the mutable state.
    pub fn state(&self) -> Result<MutexGuard<'_, ConnectionState>, FeedError> {
        Ok(self.state.lock()?)
    }

    /// Send an event unless the connection has been unregistered.
    /// Returns `false` when the event was discarded, either for that reason or
    /// because the outbound queue is full.
    pub fn send(&self, event: ServerEvent) -> Result<bool, FeedError> {
        let state = self.state()?;
        self.send_locked(&state, event)
    }

    /// `send` for a caller already holding this connection's state lock.
    pub fn send_locked(&self, state: &ConnectionState, event: ServerEvent) -> Result<bool, FeedError> {
        if state.closed {
            return Ok(false);
        }
        let queued = self.sink.send(event)?;
        if !queued {
            debug!("{} outbound queue full, event dropped", self.id);
        }
        Ok(queued)
    }
}

/// All live connections, keyed by handle.
pub struct Registry {
    universe: Arc<HashSet<String>>,
    max_rate_per_second: u32,
    next_id: AtomicU64,
    connections: RwLock<BTreeMap<ConnectionId, Arc<Connection>>>,
}

impl Registry {
    /// Registry over the given symbol universe.
    pub fn new<I>(universe: I, max_rate_per_second: u32) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        Self {
            universe: Arc::new(universe.into_iter().collect()),
            max_rate_per_second,
            next_id: AtomicU64::new(1),
            connections: RwLock::new(BTreeMap::new()),
        }
    }

    /// Add a connection with an empty subscription set and a fresh rate window.
    pub fn register(&self, sink: Box<dyn EventSink>, now_ms: i64) -> Result<Arc<Connection>, FeedError> {
        let id = ConnectionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let connection = Arc::new(Connection {
            id,
            sink,
            state: Mutex::new(ConnectionState {
                subscriptions: Subscriptions::new(Arc::clone(&self.universe)),
                limiter: RateLimiter::new(self.max_rate_per_second, now_ms),
                closed: false,
            }),
        });
        self.connections.write()?.insert(id, Arc::clone(&connection));
        Ok(connection)
    }

    /// Remove a connection. A broadcast that picked it up before removal
    /// sends nothing once this returns.
    pub fn unregister(&self, id: ConnectionId) -> Result<Option<Arc<Connection>>, FeedError> {
        let removed = self.connections.write()?.remove(&id);
        if let Some(connection) = &removed {
            connection.state()?.closed = true;
        }
        Ok(removed)
    }

    /// Look up a live connection.
    pub fn get(&self, id: ConnectionId) -> Result<Option<Arc<Connection>>, FeedError> {
        Ok(self.connections.read()?.get(&id).cloned())
    }

    /// Every live connection, ordered by handle.
    pub fn connections(&self) -> Result<Vec<Arc<Connection>>, FeedError> {
        Ok(self.connections.read()?.values().cloned().collect())
    }

    /// Number of live connections.
    pub fn len(&self) -> Result<usize, FeedError> {
        Ok(self.connections.read()?.len())
    }
}
