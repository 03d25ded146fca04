//! Sending named events to the feed server.
//!
//! This module provides a small helper for encoding and sending `ClientMessage`s
//! and for running a background PING loop on the session.
use feed_common::{ClientMessage, FeedError};
use log::{debug, error, info};
use std::io::{ErrorKind, Write};
use std::net::TcpStream;
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use std::thread;
use std::time::Duration;

/// PING interval in milliseconds used by the background thread.
const INTERVAL_MS: u64 = 2000;

/// Helper type for sending events to the server.
pub struct CommandSender;

impl CommandSender {
    /// Write one message as a JSON line.
    pub fn send<W: Write>(writer: &mut W, message: &ClientMessage) -> Result<(), FeedError> {
        debug!("Sending event: {} {}", message.event, message.data);
        writer.write_all(&message.to_json_line()?)?;
        writer.flush()?;
        Ok(())
    }

    /// Send `ping` every [`INTERVAL_MS`] until `shutdown` is set or the socket fails.
    pub fn start_ping_thread(mut stream: TcpStream, shutdown: Arc<AtomicBool>) {
        info!("Ping thread started");
        thread::spawn(move || {
            let interval = Duration::from_millis(INTERVAL_MS);
            let ping = ClientMessage::ping();
            while !shutdown.load(Ordering::Relaxed) {
                thread::sleep(interval);
                if shutdown.load(Ordering::Relaxed) {
                    break;
                }
                match Self::send(&mut stream, &ping) {
                    Ok(()) => debug!("PING sent"),
                    Err(FeedError::Io(ref e)) if e.kind() == ErrorKind::Interrupted => continue,
                    Err(e) => {
                        error!("PING THREAD ERROR: Failed to send PING: {}", e);
                        break;
                    }
                }
            }
            info!("Ping thread stopping...");
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_send_writes_one_line() {
        let mut out = Vec::new();
        CommandSender::send(&mut out, &ClientMessage::unsubscribe(vec!["AAPL".into()])).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "{\"event\":\"unsubscribe\",\"data\":[\"AAPL\"]}\n"
        );
    }
}
