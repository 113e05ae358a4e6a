//! Error types for loopback listener operations.

use std::io;
use std::net::SocketAddr;

use thiserror::Error;

/// Errors surfaced while binding or running the loopback listener.
#[derive(Debug, Error)]
pub enum ListenerError {
    /// The host and port did not resolve.
    #[error("failed to resolve TCP address {host}:{port}: {source}")]
    Resolve {
        /// Host that was resolved.
        host: String,
        /// Requested port.
        port: u16,
        /// Resolver error.
        #[source]
        source: io::Error,
    },
    /// Resolution succeeded but yielded no usable address.
    #[error("no TCP addresses resolved for {host}:{port}")]
    ResolveEmpty {
        /// Host that was resolved.
        host: String,
        /// Requested port.
        port: u16,
    },
    /// The socket could not be bound, usually because the port is taken.
    #[error("failed to bind TCP listener at {addr}: {source}")]
    Bind {
        /// Address the bind was attempted on.
        addr: SocketAddr,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The bound socket did not report its address.
    #[error("failed to read listener address: {source}")]
    LocalAddr {
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// Switching the socket to non-blocking accept failed.
    #[error("failed to enable non-blocking listener: {source}")]
    NonBlocking {
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The accept thread panicked before it could be joined.
    #[error("listener thread panicked")]
    ThreadPanic,
}
