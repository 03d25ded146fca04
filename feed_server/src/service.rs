//! Inbound event handling for client sessions.
//!
//! `FeedService` turns transport-level happenings (connect, a decoded
//! `ClientEvent`, disconnect) into registry mutations and immediate replies.
//! It never touches instrument state beyond reading snapshots.

use std::sync::Arc;

use feed_common::{ClientEvent, Result, ServerEvent};
use log::{debug, info};

use crate::clock::Clock;
use crate::model::instrument::SharedStore;
use crate::model::registry::{ConnectionId, EventSink, Registry};

/// Text sent to every new session.
pub const WELCOME: &str = "Connected to market feed simulator. Send 'subscribe' to start streaming.";

/// Handles connect/subscribe/unsubscribe/ping/disconnect for all sessions.
pub struct FeedService {
    registry: Arc<Registry>,
    store: SharedStore,
    clock: Arc<dyn Clock>,
}

impl FeedService {
    /// Service over a shared registry and store.
    pub fn new(registry: Arc<Registry>, store: SharedStore, clock: Arc<dyn Clock>) -> Self {
        Self {
            registry,
            store,
            clock,
        }
    }

    /// Register a new session and greet it.
    pub fn connect(&self, sink: Box<dyn EventSink>) -> Result<ConnectionId> {
        let connection = self.registry.register(sink, self.clock.now_millis())?;
        connection.send(ServerEvent::Info(WELCOME.to_string()))?;
        info!(
            "{} connected ({} live)",
            connection.id(),
            self.registry.len()?
        );
        Ok(connection.id())
    }

    /// Apply one inbound event. Events for unknown handles are ignored.
    pub fn handle(&self, id: ConnectionId, event: ClientEvent) -> Result<()> {
        let Some(connection) = self.registry.get(id)? else {
            debug!("Event for unknown connection {} ignored", id);
            return Ok(());
        };

        match event {
            ClientEvent::Subscribe(symbols) => {
                let subscribed = {
                    let mut state = connection.state()?;
                    state.subscriptions.replace(symbols.as_deref());
                    if state.subscriptions.is_empty() {
                        debug!("{} requested no known symbols", id);
                    }
                    state.subscriptions.snapshot()
                };
                let quotes = self
                    .store
                    .read()?
                    .snapshot(&subscribed)
                    .iter()
                    .map(|instrument| instrument.to_quote())
                    .collect::<Vec<_>>();
                info!("{} subscribed to {} symbol(s)", id, quotes.len());
                connection.send(ServerEvent::Snapshot(quotes))?;
            }
            ClientEvent::Unsubscribe(symbols) => {
                let (removed, remaining) = {
                    let mut state = connection.state()?;
                    let removed = state.subscriptions.remove(symbols.as_deref());
                    (removed, state.subscriptions.len())
                };
                debug!("{} unsubscribed from {} symbol(s)", id, removed);
                connection.send(ServerEvent::Info(format!(
                    "Unsubscribed from {} symbol(s), {} remaining",
                    removed, remaining
                )))?;
            }
            ClientEvent::Ping => {
                connection.send(ServerEvent::Pong(self.clock.now_millis()))?;
            }
        }
        Ok(())
    }

    /// Drop a session's registry entry, subscriptions and rate window.
    pub fn disconnect(&self, id: ConnectionId) -> Result<()> {
        if self.registry.unregister(id)?.is_some() {
            info!("{} disconnected ({} live)", id, self.registry.len()?);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::model::instrument::InstrumentStore;
    use crossbeam_channel::{Receiver, unbounded};
    use feed_common::symbols::SeedTable;

    fn service() -> (FeedService, Arc<Registry>) {
        let clock = Arc::new(ManualClock::at_utc(6, 30));
        let store = InstrumentStore::from_seed(&SeedTable::builtin(), clock.now_millis());
        let registry = Arc::new(Registry::new(store.symbols().to_vec(), 50));
        let service = FeedService::new(Arc::clone(&registry), store.into_shared(), clock);
        (service, registry)
    }

    fn connect(service: &FeedService) -> (ConnectionId, Receiver<ServerEvent>) {
        let (tx, rx) = unbounded::<ServerEvent>();
        let id = service.connect(Box::new(tx)).unwrap();
        assert_eq!(rx.try_recv().unwrap(), ServerEvent::Info(WELCOME.to_string()));
        (id, rx)
    }

    fn snapshot_symbols(event: ServerEvent) -> Vec<String> {
        match event {
            ServerEvent::Snapshot(quotes) => quotes.into_iter().map(|q| q.symbol).collect(),
            other => panic!("expected snapshot, got {:?}", other),
        }
    }

    #[test]
    fn test_subscribe_everything_when_absent() {
        let (service, _) = service();
        let (id, rx) = connect(&service);
        service.handle(id, ClientEvent::Subscribe(None)).unwrap();
        assert_eq!(snapshot_symbols(rx.try_recv().unwrap()).len(), 10);
    }

    #[test]
    fn test_subscribe_drops_unknown_symbols() {
        let (service, registry) = service();
        let (id, rx) = connect(&service);
        let request = vec!["AAPL".to_string(), "UNKNOWN".to_string()];
        service.handle(id, ClientEvent::Subscribe(Some(request))).unwrap();
        assert_eq!(snapshot_symbols(rx.try_recv().unwrap()), vec!["AAPL"]);

        let connection = registry.get(id).unwrap().unwrap();
        let subscribed = connection.state().unwrap().subscriptions.snapshot();
        assert_eq!(subscribed.len(), 1);
        assert!(subscribed.contains("AAPL"));
    }

    #[test]
    fn test_unsubscribe_confirms_and_tolerates_garbage() {
        let (service, registry) = service();
        let (id, rx) = connect(&service);
        service
            .handle(id, ClientEvent::Subscribe(Some(vec!["AAPL".into(), "MSFT".into()])))
            .unwrap();
        rx.try_recv().unwrap();

        service.handle(id, ClientEvent::Unsubscribe(None)).unwrap();
        assert!(matches!(rx.try_recv().unwrap(), ServerEvent::Info(_)));

        service
            .handle(id, ClientEvent::Unsubscribe(Some(vec!["TSLA".into()])))
            .unwrap();
        assert!(matches!(rx.try_recv().unwrap(), ServerEvent::Info(_)));

        service
            .handle(id, ClientEvent::Unsubscribe(Some(vec!["MSFT".into()])))
            .unwrap();
        assert_eq!(
            rx.try_recv().unwrap(),
            ServerEvent::Info("Unsubscribed from 1 symbol(s), 1 remaining".to_string())
        );

        let connection = registry.get(id).unwrap().unwrap();
        let state = connection.state().unwrap();
        assert!(state.subscriptions.contains("AAPL"));
        assert!(!state.subscriptions.contains("MSFT"));
    }

    #[test]
    fn test_ping_answers_with_clock_time() {
        let (service, _) = service();
        let (id, rx) = connect(&service);
        service.handle(id, ClientEvent::Ping).unwrap();
        let expected = ManualClock::at_utc(6, 30).now_millis();
        assert_eq!(rx.try_recv().unwrap(), ServerEvent::Pong(expected));
    }

    #[test]
    fn test_disconnect_discards_state() {
        let (service, registry) = service();
        let (id, _rx) = connect(&service);
        service.disconnect(id).unwrap();
        assert!(registry.get(id).unwrap().is_none());
        assert_eq!(registry.len().unwrap(), 0);

        // Late events for the handle are ignored rather than failing.
        service.handle(id, ClientEvent::Ping).unwrap();
        service.disconnect(id).unwrap();
    }
}
