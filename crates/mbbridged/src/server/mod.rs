//! The loopback command bridge server.
//!
//! [`BridgeServer`] owns the listener lifecycle
//! (`Stopped → Starting → Running → Stopping → Stopped`) and the two
//! observer slots. Each accepted connection gets its own thread, which
//! drives a `hyper` HTTP/1.1 exchange on the server's `tokio` runtime. The
//! only shared mutable state is the lifecycle flag, the observer slots and
//! whatever the settings store guards.

mod observers;
mod pipeline;

use std::fmt;
use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use mbbridge_config::{BodyEncoding, BridgeSettings, Config, LOOPBACK_HOST, default_request_timeout};
use mbbridge_protocol::LogLevel;
use once_cell::sync::OnceCell;
use thiserror::Error;
use tokio::runtime::{self, Runtime};

pub use self::observers::{CommandObserver, LogObserver};
use self::pipeline::{BridgeConnectionHandler, BridgeShared};
use crate::transport::{ListenerError, ListenerHandle, SocketListener};

pub(crate) const SERVER_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::server");

const STOPPED: u8 = 0;
const STARTING: u8 = 1;
const RUNNING: u8 = 2;
const STOPPING: u8 = 3;

/// Lifecycle state of a [`BridgeServer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    /// No socket is bound.
    Stopped,
    /// A start is binding the socket.
    Starting,
    /// Accepting connections.
    Running,
    /// A stop is releasing the socket.
    Stopping,
}

impl ServerState {
    const fn from_raw(raw: u8) -> Self {
        match raw {
            STARTING => Self::Starting,
            RUNNING => Self::Running,
            STOPPING => Self::Stopping,
            _ => Self::Stopped,
        }
    }
}

impl fmt::Display for ServerState {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(match self {
            Self::Stopped => "stopped",
            Self::Starting => "starting",
            Self::Running => "running",
            Self::Stopping => "stopping",
        })
    }
}

/// Reasons [`BridgeServer::start`] did not reach `Running`.
#[derive(Debug, Error)]
pub enum StartError {
    /// The server was not stopped; nothing was rebound.
    #[error("bridge server is already {state}")]
    AlreadyRunning {
        /// State observed by the rejected start.
        state: ServerState,
    },
    /// Binding or starting the listener failed; the server stays stopped.
    #[error("failed to start listener: {0}")]
    Listener(#[from] ListenerError),
    /// The request runtime could not be built; the server stays stopped.
    #[error("failed to build request runtime: {source}")]
    Runtime {
        /// Builder error.
        #[source]
        source: io::Error,
    },
}

/// Request-pipeline settings fixed for the lifetime of a server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServerOptions {
    /// Decoder applied to `/cmd` bodies.
    pub body_encoding: BodyEncoding,
    /// Limit on reading a request head or a `/cmd` body.
    pub request_timeout: Duration,
}

impl ServerOptions {
    /// Options taken from the resolved configuration.
    #[must_use]
    pub const fn from_config(config: &Config) -> Self {
        Self {
            body_encoding: config.body_encoding(),
            request_timeout: config.request_timeout(),
        }
    }
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            body_encoding: BodyEncoding::default(),
            request_timeout: default_request_timeout(),
        }
    }
}

struct RunningListener {
    handle: ListenerHandle,
    addr: SocketAddr,
}

/// Loopback HTTP server accepting page-turn commands.
pub struct BridgeServer {
    shared: Arc<BridgeShared>,
    runtime: OnceCell<Runtime>,
    state: AtomicU8,
    listener: Mutex<Option<RunningListener>>,
}

impl BridgeServer {
    /// Creates a stopped server reading token and port from `settings`.
    #[must_use]
    pub fn new(settings: Arc<dyn BridgeSettings>, options: ServerOptions) -> Self {
        Self {
            shared: Arc::new(BridgeShared::new(settings, options)),
            runtime: OnceCell::new(),
            state: AtomicU8::new(STOPPED),
            listener: Mutex::new(None),
        }
    }

    /// Binds `127.0.0.1` on the configured port and starts accepting.
    ///
    /// # Errors
    ///
    /// Returns [`StartError::AlreadyRunning`] unless the server is stopped,
    /// and [`StartError::Listener`] or [`StartError::Runtime`] when the
    /// socket or the request runtime cannot be set up; in those cases the
    /// server returns to `Stopped`.
    pub fn start(&self) -> Result<SocketAddr, StartError> {
        if let Err(current) =
            self.state
                .compare_exchange(STOPPED, STARTING, Ordering::SeqCst, Ordering::SeqCst)
        {
            let state = ServerState::from_raw(current);
            self.shared
                .log(LogLevel::Warn, &format!("Server already {state}"));
            return Err(StartError::AlreadyRunning { state });
        }

        match self.bind_and_start() {
            Ok(running) => {
                let addr = running.addr;
                *self.lock_listener() = Some(running);
                self.state.store(RUNNING, Ordering::SeqCst);
                self.shared
                    .log(LogLevel::Info, &format!("HTTP server started on {addr}"));
                Ok(addr)
            }
            Err(error) => {
                self.state.store(STOPPED, Ordering::SeqCst);
                self.shared
                    .log(LogLevel::Error, &format!("Start server failed: {error}"));
                Err(error)
            }
        }
    }

    fn bind_and_start(&self) -> Result<RunningListener, StartError> {
        let runtime = self
            .runtime
            .get_or_try_init(|| {
                runtime::Builder::new_multi_thread()
                    .worker_threads(2)
                    .thread_name("mbbridge-http")
                    .enable_all()
                    .build()
            })
            .map_err(|source| StartError::Runtime { source })?;
        let port = self.shared.settings().port();
        let listener = SocketListener::bind(LOOPBACK_HOST, port)?;
        let addr = listener.local_addr();
        let handler = Arc::new(BridgeConnectionHandler::new(
            Arc::clone(&self.shared),
            runtime.handle().clone(),
        ));
        let handle = listener.start(handler, self.shared.options().request_timeout)?;
        Ok(RunningListener { handle, addr })
    }

    /// Releases the socket. Returns `false` when the server was not running,
    /// in which case nothing happens.
    pub fn stop(&self) -> bool {
        if self
            .state
            .compare_exchange(RUNNING, STOPPING, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return false;
        }
        let running = self.lock_listener().take();
        if let Some(running) = running {
            running.handle.shutdown();
            if let Err(error) = running.handle.join() {
                self.shared
                    .log(LogLevel::Error, &format!("Stop server failed: {error}"));
            }
        }
        self.state.store(STOPPED, Ordering::SeqCst);
        self.shared.log(LogLevel::Info, "HTTP server stopped");
        true
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> ServerState {
        ServerState::from_raw(self.state.load(Ordering::SeqCst))
    }

    /// Whether the server is accepting connections.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.state() == ServerState::Running
    }

    /// Bound address while running.
    #[must_use]
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.lock_listener().as_ref().map(|running| running.addr)
    }

    /// Registers the command observer, replacing any previous one.
    /// `None` unregisters.
    pub fn set_command_observer(&self, observer: Option<Arc<dyn CommandObserver>>) {
        self.shared.set_command_observer(observer);
    }

    /// Registers the log observer, replacing any previous one.
    /// `None` unregisters.
    pub fn set_log_observer(&self, observer: Option<Arc<dyn LogObserver>>) {
        self.shared.set_log_observer(observer);
    }

    fn lock_listener(&self) -> std::sync::MutexGuard<'_, Option<RunningListener>> {
        self.listener.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for BridgeServer {
    fn drop(&mut self) {
        self.stop();
    }
}
