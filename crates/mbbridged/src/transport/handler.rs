//! Connection handling abstraction for the loopback listener.

use std::net::TcpStream;

/// Handles accepted loopback connections.
pub(crate) trait ConnectionHandler: Send + Sync + 'static {
    /// Handles a single connection. Implementations should avoid panicking;
    /// the stream is closed when it is dropped.
    fn handle(&self, stream: TcpStream);
}
