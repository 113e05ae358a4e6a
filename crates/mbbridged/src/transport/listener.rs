//! Listener implementation for the loopback bridge socket.

use std::io;
use std::net::{SocketAddr, TcpListener, TcpStream, ToSocketAddrs};
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use std::thread;
use std::time::Duration;

use tracing::{info, warn};

use super::{ConnectionHandler, LISTENER_TARGET, ListenerError};

const ACCEPT_BACKOFF: Duration = Duration::from_millis(25);
const ERROR_BACKOFF: Duration = Duration::from_millis(150);

/// Listener bound to a loopback TCP address.
#[derive(Debug)]
pub(crate) struct SocketListener {
    addr: SocketAddr,
    listener: TcpListener,
}

impl SocketListener {
    /// Binds `host:port`. Port `0` asks the OS for an ephemeral port.
    pub(crate) fn bind(host: &str, port: u16) -> Result<Self, ListenerError> {
        let listener = bind_tcp(host, port)?;
        let addr = listener
            .local_addr()
            .map_err(|source| ListenerError::LocalAddr { source })?;
        Ok(Self { addr, listener })
    }

    /// Address actually bound, including the OS-assigned port.
    pub(crate) const fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Starts the accept loop. Accepted streams get `read_timeout` applied
    /// before they reach `handler`.
    pub(crate) fn start(
        self,
        handler: Arc<dyn ConnectionHandler>,
        read_timeout: Duration,
    ) -> Result<ListenerHandle, ListenerError> {
        self.listener
            .set_nonblocking(true)
            .map_err(|source| ListenerError::NonBlocking { source })?;
        let shutdown = Arc::new(AtomicBool::new(false));
        let shutdown_flag = Arc::clone(&shutdown);
        let handle = thread::spawn(move || {
            run_accept_loop(&self, &shutdown_flag, &handler, read_timeout);
        });
        Ok(ListenerHandle {
            shutdown,
            handle: Some(handle),
        })
    }
}

/// Handle to the background accept thread.
pub(crate) struct ListenerHandle {
    shutdown: Arc<AtomicBool>,
    handle: Option<thread::JoinHandle<()>>,
}

impl ListenerHandle {
    pub(crate) fn shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }

    /// Waits for the accept thread; the socket is closed once this returns.
    pub(crate) fn join(mut self) -> Result<(), ListenerError> {
        match self.handle.take() {
            Some(handle) => handle.join().map_err(|_| ListenerError::ThreadPanic),
            None => Ok(()),
        }
    }
}

impl Drop for ListenerHandle {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }
}

fn run_accept_loop(
    listener: &SocketListener,
    shutdown: &AtomicBool,
    handler: &Arc<dyn ConnectionHandler>,
    read_timeout: Duration,
) {
    info!(
        target: LISTENER_TARGET,
        addr = %listener.addr,
        "loopback listener active"
    );
    let mut last_error = None::<io::ErrorKind>;
    while !shutdown.load(Ordering::SeqCst) {
        match accept_connection(&listener.listener, read_timeout) {
            Ok(Some(stream)) => {
                last_error = None;
                let handler = Arc::clone(handler);
                thread::spawn(move || handler.handle(stream));
            }
            Ok(None) => thread::sleep(ACCEPT_BACKOFF),
            Err(error) => {
                let kind = error.kind();
                if last_error != Some(kind) {
                    warn!(
                        target: LISTENER_TARGET,
                        error = %error,
                        "socket accept error"
                    );
                }
                last_error = Some(kind);
                thread::sleep(ERROR_BACKOFF);
            }
        }
    }
    info!(
        target: LISTENER_TARGET,
        addr = %listener.addr,
        "loopback listener closed"
    );
}

fn accept_connection(
    listener: &TcpListener,
    read_timeout: Duration,
) -> Result<Option<TcpStream>, io::Error> {
    match listener.accept() {
        Ok((stream, _)) => {
            stream.set_nonblocking(false)?;
            stream.set_read_timeout(Some(read_timeout))?;
            stream.set_write_timeout(Some(read_timeout))?;
            Ok(Some(stream))
        }
        Err(error) if error.kind() == io::ErrorKind::WouldBlock => Ok(None),
        Err(error) => Err(error),
    }
}

fn bind_tcp(host: &str, port: u16) -> Result<TcpListener, ListenerError> {
    let mut addrs = (host, port)
        .to_socket_addrs()
        .map_err(|source| ListenerError::Resolve {
            host: host.to_owned(),
            port,
            source,
        })?;
    let addr = addrs
        .find(SocketAddr::is_ipv4)
        .ok_or_else(|| ListenerError::ResolveEmpty {
            host: host.to_owned(),
            port,
        })?;
    TcpListener::bind(addr).map_err(|source| ListenerError::Bind { addr, source })
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use super::super::RecordingHandler;
    use super::*;

    fn wait_for_streams(handler: &RecordingHandler, expected: usize) -> bool {
        let deadline = Instant::now() + Duration::from_secs(2);
        while Instant::now() < deadline {
            if handler.accepted().len() >= expected {
                return true;
            }
            thread::sleep(Duration::from_millis(10));
        }
        false
    }

    #[test]
    fn hands_each_client_to_the_handler_with_timeouts() {
        let listener = SocketListener::bind("127.0.0.1", 0).expect("bind listener");
        let addr = listener.local_addr();
        assert!(addr.ip().is_loopback());
        assert_ne!(addr.port(), 0, "ephemeral port should be assigned");
        let handler = Arc::new(RecordingHandler::default());
        let handle = listener
            .start(handler.clone(), Duration::from_millis(750))
            .expect("start listener");

        let first = TcpStream::connect(addr).expect("connect first client");
        let second = TcpStream::connect(addr).expect("connect second client");

        assert!(wait_for_streams(&handler, 2), "expected two connections");
        let mut peers: Vec<_> = handler.accepted().iter().map(|seen| seen.peer).collect();
        peers.sort();
        let mut expected = vec![
            first.local_addr().expect("first client addr"),
            second.local_addr().expect("second client addr"),
        ];
        expected.sort();
        assert_eq!(peers, expected);
        // The kernel rounds socket timeouts to its tick, so allow a little slack.
        let requested = Duration::from_millis(750);
        for seen in handler.accepted() {
            let applied = seen.read_timeout.expect("read timeout applied");
            assert!(
                applied.abs_diff(requested) <= Duration::from_millis(50),
                "unexpected read timeout {applied:?}"
            );
        }
        handle.shutdown();
        handle.join().expect("join listener");
    }

    #[test]
    fn occupied_port_fails_to_bind() {
        let existing = TcpListener::bind("127.0.0.1:0").expect("bind existing");
        let port = existing.local_addr().expect("existing addr").port();
        let error = SocketListener::bind("127.0.0.1", port).expect_err("port is taken");
        assert!(matches!(error, ListenerError::Bind { .. }), "got {error:?}");
    }

    #[test]
    fn port_is_released_after_join() {
        let listener = SocketListener::bind("127.0.0.1", 0).expect("bind listener");
        let port = listener.local_addr().port();
        let handle = listener
            .start(Arc::new(RecordingHandler::default()), Duration::from_secs(1))
            .expect("start listener");
        handle.shutdown();
        handle.join().expect("join listener");

        SocketListener::bind("127.0.0.1", port).expect("port should be free again");
    }
}
