//! Reader and writer halves of one client session.
//!
//! Each accepted stream gets two threads:
//! - the writer drains the connection's outbound channel and writes every
//!   `ServerEvent` as one JSON line;
//! - the reader decodes inbound lines into `ClientEvent`s for `FeedService`.
//!
//! The outbound channel is bounded: a client that stops reading loses events once
//! `OUTBOUND_QUEUE_CAPACITY` are waiting, instead of growing the queue.
//!
//! Undecodable lines and unknown event names are logged and skipped. The session
//! ends when the reader hits EOF or an I/O error; the registry entry is then
//! dropped, which closes the outbound channel and lets the writer finish.

use std::io::{BufRead, BufReader, Write};
use std::net::{Shutdown, SocketAddr, TcpStream};
use std::sync::Arc;
use std::thread;

use crossbeam_channel::{Receiver, bounded};
use feed_common::{ClientMessage, Result, ServerEvent};
use log::{debug, error, info};

use crate::model::registry::ConnectionId;
use crate::service::FeedService;

/// Events that may wait for a slow reader before new ones are dropped.
pub const OUTBOUND_QUEUE_CAPACITY: usize = 256;

/// Write events until the channel closes or the peer stops accepting data.
pub fn write_events<W: Write>(mut writer: W, events: Receiver<ServerEvent>) -> Result<()> {
    for event in events.iter() {
        let line = event.to_json_line()?;
        writer.write_all(&line)?;
        writer.flush()?;
    }
    Ok(())
}

/// Dispatch inbound lines to `service` until EOF.
pub fn read_events<R: BufRead>(reader: R, service: &FeedService, id: ConnectionId) -> Result<()> {
    for line in reader.lines() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match ClientMessage::decode(line) {
            Ok(message) => {
                let name = message.event.clone();
                match message.into_event() {
                    Some(event) => service.handle(id, event)?,
                    None => debug!("{}: unknown event '{}' ignored", id, name),
                }
            }
            Err(e) => debug!("{}: undecodable message ignored: {}", id, e),
        }
    }
    Ok(())
}

/// Register `stream` with `service` and spawn its reader and writer threads.
pub fn spawn(stream: TcpStream, service: Arc<FeedService>) -> Result<()> {
    let peer = stream.peer_addr()?;
    let write_half = stream.try_clone()?;
    let (event_tx, event_rx) = bounded::<ServerEvent>(OUTBOUND_QUEUE_CAPACITY);

    let id = service.connect(Box::new(event_tx))?;
    info!("Session {} opened for {}", id, peer);

    thread::spawn(move || {
        if let Err(e) = write_events(&write_half, event_rx) {
            error!("Failed to write to {}: {}", peer, e);
            // Unblock the reader so the session is torn down.
            let _ = write_half.shutdown(Shutdown::Both);
        }
    });

    thread::spawn(move || {
        close_after_reading(stream, peer, &service, id);
    });
    Ok(())
}

fn close_after_reading(stream: TcpStream, peer: SocketAddr, service: &FeedService, id: ConnectionId) {
    if let Err(e) = read_events(BufReader::new(&stream), service, id) {
        debug!("Session {} read error: {}", id, e);
    }
    if let Err(e) = service.disconnect(id) {
        error!("Failed to release session {}: {}", id, e);
    }
    let _ = stream.shutdown(Shutdown::Both);
    info!("Session {} closed for {}", id, peer);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::{ManualClock, SystemClock};
    use crate::model::instrument::InstrumentStore;
    use crate::model::registry::Registry;
    use feed_common::symbols::SeedTable;
    use crossbeam_channel::unbounded;
    use std::io::Cursor;

    fn service() -> Arc<FeedService> {
        let clock = Arc::new(ManualClock::at_utc(6, 30));
        let store = InstrumentStore::from_seed(&SeedTable::builtin(), 0);
        let registry = Arc::new(Registry::new(store.symbols().to_vec(), 50));
        Arc::new(FeedService::new(registry, store.into_shared(), clock))
    }

    #[test]
    fn test_write_events_emits_json_lines() {
        let (tx, rx) = unbounded();
        tx.send(ServerEvent::Info("hello".into())).unwrap();
        tx.send(ServerEvent::Pong(7)).unwrap();
        drop(tx);

        let mut out = Vec::new();
        write_events(&mut out, rx).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines, vec![
            r#"{"event":"info","data":"hello"}"#,
            r#"{"event":"pong","data":7}"#,
        ]);
    }

    #[test]
    fn test_read_events_skips_garbage_and_dispatches() {
        let service = service();
        let (tx, rx) = unbounded::<ServerEvent>();
        let id = service.connect(Box::new(tx)).unwrap();
        rx.try_recv().unwrap();

        let input = concat!(
            "not json\n",
            "\n",
            "{\"event\":\"dance\"}\n",
            "{\"event\":\"subscribe\",\"data\":[\"AAPL\",\"UNKNOWN\"]}\n",
            "{\"event\":\"ping\"}\n",
        );
        read_events(Cursor::new(input), &service, id).unwrap();

        match rx.try_recv().unwrap() {
            ServerEvent::Snapshot(quotes) => {
                assert_eq!(quotes.len(), 1);
                assert_eq!(quotes[0].symbol, "AAPL");
            }
            other => panic!("expected snapshot, got {:?}", other),
        }
        assert!(matches!(rx.try_recv().unwrap(), ServerEvent::Pong(_)));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_tcp_session_round_trip() {
        use std::net::TcpListener;

        let store = InstrumentStore::from_seed(&SeedTable::builtin(), 0);
        let registry = Arc::new(Registry::new(store.symbols().to_vec(), 50));
        let service = Arc::new(FeedService::new(
            Arc::clone(&registry),
            store.into_shared(),
            Arc::new(SystemClock),
        ));

        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let address = listener.local_addr().unwrap();
        let client = TcpStream::connect(address).unwrap();
        let (server_side, _) = listener.accept().unwrap();
        spawn(server_side, Arc::clone(&service)).unwrap();

        let mut writer = client.try_clone().unwrap();
        let mut reader = BufReader::new(client);
        let mut line = String::new();
        reader.read_line(&mut line).unwrap();
        assert!(matches!(ServerEvent::decode(line.trim_end()).unwrap(), ServerEvent::Info(_)));

        writer
            .write_all(&ClientMessage::subscribe(Some(vec!["TSLA".into()])).to_json_line().unwrap())
            .unwrap();
        line.clear();
        reader.read_line(&mut line).unwrap();
        match ServerEvent::decode(line.trim_end()).unwrap() {
            ServerEvent::Snapshot(quotes) => assert_eq!(quotes[0].symbol, "TSLA"),
            other => panic!("expected snapshot, got {:?}", other),
        }

        writer.shutdown(Shutdown::Both).unwrap();
        for _ in 0..200 {
            if registry.len().unwrap() == 0 {
                break;
            }
            thread::sleep(std::time::Duration::from_millis(10));
        }
        assert_eq!(registry.len().unwrap(), 0);
    }
}
