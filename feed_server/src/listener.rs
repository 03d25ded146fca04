use feed_common::Result;
use log::{error, info};
use std::net::{SocketAddr, TcpListener};
use std::sync::Arc;

use crate::service::FeedService;
use crate::session;

/// TCP acceptor for client sessions.
///
/// Every accepted stream becomes a session with its own reader and writer
/// threads. A failure on one stream is logged and never stops the accept loop.
pub struct FeedListener {
    /// The underlying TCP listening socket.
    pub(crate) socket: TcpListener,
}

impl FeedListener {
    /// Bind a new listener to `bind_addr` (e.g., `0.0.0.0:8080`).
    pub fn bind(bind_addr: &str) -> Result<Self> {
        let socket = TcpListener::bind(bind_addr)?;
        Ok(Self { socket })
    }

    /// Address actually bound, useful when binding port 0.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }

    /// Blocking loop that accepts connections and hands each one to `service`.
    pub fn accept_loop(self, service: Arc<FeedService>) -> Result<()> {
        info!("Feed server is listening on {}", self.local_addr()?);

        for stream in self.socket.incoming() {
            match stream {
                Ok(stream) => {
                    if let Err(e) = session::spawn(stream, Arc::clone(&service)) {
                        error!("Failed to start session: {}", e);
                    }
                }
                Err(e) => error!("TCP connection error: {}", e),
            }
        }
        Ok(())
    }
}
