//! Connection handler double for listener tests.

use std::net::{SocketAddr, TcpStream};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use super::ConnectionHandler;

/// Stream properties observed when the listener handed a connection over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct AcceptedStream {
    pub(crate) peer: SocketAddr,
    pub(crate) read_timeout: Option<Duration>,
}

/// Records every stream it receives and closes it.
#[derive(Debug, Default)]
pub(crate) struct RecordingHandler {
    accepted: Mutex<Vec<AcceptedStream>>,
}

impl RecordingHandler {
    pub(crate) fn accepted(&self) -> Vec<AcceptedStream> {
        self.accepted
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl ConnectionHandler for RecordingHandler {
    fn handle(&self, stream: TcpStream) {
        let Ok(peer) = stream.peer_addr() else {
            return;
        };
        let read_timeout = stream.read_timeout().ok().flatten();
        self.accepted
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(AcceptedStream { peer, read_timeout });
    }
}
