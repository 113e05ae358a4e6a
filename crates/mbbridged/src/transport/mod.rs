//! Loopback TCP listener for the command bridge.
//!
//! The listener binds to `127.0.0.1` and accepts connections on a background
//! thread, handing each accepted stream to a [`ConnectionHandler`] on its own
//! worker thread.

mod errors;
mod handler;
mod listener;
#[cfg(test)]
mod test_utils;

pub use self::errors::ListenerError;
pub(crate) use self::handler::ConnectionHandler;
pub(crate) use self::listener::{ListenerHandle, SocketListener};
#[cfg(test)]
pub(crate) use self::test_utils::RecordingHandler;

const LISTENER_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::transport");
