//! Per-request handling: route, authenticate, read, decode, notify.

use std::convert::Infallible;
use std::error::Error as StdError;
use std::io::Read;
use std::net::{Shutdown, TcpStream};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use hyper::body::Body;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, StatusCode};
use hyper_util::rt::{TokioIo, TokioTimer};
use mbbridge_config::BridgeSettings;
use mbbridge_protocol::{APP_ID, Command, HttpEnvelope, LogLevel, decode};
use tokio::runtime::Handle;
use tracing::{debug, warn};

use super::observers::{CommandObserver, LogObserver, ObserverSlot};
use super::{SERVER_TARGET, ServerOptions};
use crate::auth;
use crate::http::{
    BridgeResponse, MAX_BODY_BYTES, RequestError, error_response, json_response, read_body,
};
use crate::telemetry;
use crate::transport::ConnectionHandler;

/// Read buffer limit, which bounds the request line plus headers.
const MAX_HEAD_BYTES: usize = 16 * 1024;

/// State shared between the server handle and every connection thread.
pub(crate) struct BridgeShared {
    settings: Arc<dyn BridgeSettings>,
    options: ServerOptions,
    command_observer: ObserverSlot<dyn CommandObserver>,
    log_observer: ObserverSlot<dyn LogObserver>,
}

impl BridgeShared {
    pub(crate) fn new(settings: Arc<dyn BridgeSettings>, options: ServerOptions) -> Self {
        Self {
            settings,
            options,
            command_observer: ObserverSlot::empty(),
            log_observer: ObserverSlot::empty(),
        }
    }

    pub(crate) fn settings(&self) -> &dyn BridgeSettings {
        &*self.settings
    }

    pub(crate) const fn options(&self) -> ServerOptions {
        self.options
    }

    pub(crate) fn set_command_observer(&self, observer: Option<Arc<dyn CommandObserver>>) {
        self.command_observer.replace(observer);
    }

    pub(crate) fn set_log_observer(&self, observer: Option<Arc<dyn LogObserver>>) {
        self.log_observer.replace(observer);
    }

    /// Emits an operator log line to `tracing` and the log observer.
    pub(crate) fn log(&self, level: LogLevel, message: &str) {
        telemetry::emit(level, message);
        let Some(observer) = self.log_observer.current() else {
            return;
        };
        if panic::catch_unwind(AssertUnwindSafe(|| observer.on_log(level, message))).is_err() {
            tracing::error!(target: SERVER_TARGET, "log observer panicked");
        }
    }

    fn log_failure(&self, error: &RequestError) {
        self.log(
            error.log_level(),
            &format!("HTTP {}: {error}", error.status().as_u16()),
        );
    }

    fn notify_command(&self, command: &Command) {
        let Some(observer) = self.command_observer.current() else {
            self.log(LogLevel::Debug, "No command observer registered");
            return;
        };
        if panic::catch_unwind(AssertUnwindSafe(|| observer.on_command(command))).is_err() {
            self.log(LogLevel::Error, "Command observer failed");
        }
    }
}

enum Route {
    Command,
    Health,
}

fn route(method: &Method, path: &str) -> Result<Route, RequestError> {
    match (method, path) {
        (&Method::POST, "/cmd") => Ok(Route::Command),
        (&Method::GET, "/health") => Ok(Route::Health),
        _ => Err(RequestError::NotFound {
            method: method.to_string(),
            path: path.to_owned(),
        }),
    }
}

/// Answers one request. Panics anywhere in the pipeline become a 500.
pub(crate) async fn respond<B>(shared: Arc<BridgeShared>, request: Request<B>) -> BridgeResponse
where
    B: Body + Send + 'static,
    B::Data: Send,
    B::Error: Into<Box<dyn StdError + Send + Sync>>,
{
    let worker = Arc::clone(&shared);
    match tokio::spawn(async move { process(&worker, request).await }).await {
        Ok(response) => response,
        Err(_) => {
            let error = RequestError::internal("request handler panicked");
            shared.log_failure(&error);
            error_response(&error)
        }
    }
}

async fn process<B>(shared: &BridgeShared, request: Request<B>) -> BridgeResponse
where
    B: Body,
    B::Error: Into<Box<dyn StdError + Send + Sync>>,
{
    let outcome = match route(request.method(), request.uri().path()) {
        Ok(Route::Health) => {
            shared.log(LogLevel::Debug, "GET /health");
            Ok(json_response(StatusCode::OK, &HttpEnvelope::health(APP_ID)))
        }
        Ok(Route::Command) => handle_command(shared, request).await,
        Err(error) => Err(error),
    };
    outcome.unwrap_or_else(|error| {
        shared.log_failure(&error);
        error_response(&error)
    })
}

async fn handle_command<B>(
    shared: &BridgeShared,
    request: Request<B>,
) -> Result<BridgeResponse, RequestError>
where
    B: Body,
    B::Error: Into<Box<dyn StdError + Send + Sync>>,
{
    shared.log(LogLevel::Info, "POST /cmd");
    let token = shared.settings().token();
    if !auth::verify(request.headers(), token.as_deref()) {
        return Err(RequestError::Unauthorized);
    }

    let (parts, body) = request.into_parts();
    let body = read_body(&parts.headers, body, shared.options().request_timeout).await?;
    let command = decode(&body, shared.options().body_encoding)?;
    shared.log(
        LogLevel::Info,
        &format!(
            "Command: {} v={} ts={} source={}",
            command.kind(),
            command.value(),
            command.timestamp(),
            command.source()
        ),
    );
    shared.notify_command(&command);
    Ok(json_response(StatusCode::OK, &HttpEnvelope::success()))
}

/// Connection handler serving one HTTP/1.1 exchange per accepted stream.
pub(crate) struct BridgeConnectionHandler {
    shared: Arc<BridgeShared>,
    runtime: Handle,
}

impl BridgeConnectionHandler {
    pub(crate) const fn new(shared: Arc<BridgeShared>, runtime: Handle) -> Self {
        Self { shared, runtime }
    }

    async fn serve(&self, stream: TcpStream) {
        let io = match stream
            .set_nonblocking(true)
            .and_then(|()| tokio::net::TcpStream::from_std(stream))
        {
            Ok(io) => TokioIo::new(io),
            Err(error) => {
                warn!(target: SERVER_TARGET, error = %error, "failed to register connection");
                return;
            }
        };
        let shared = Arc::clone(&self.shared);
        let service = service_fn(move |request| {
            let shared = Arc::clone(&shared);
            async move { Ok::<_, Infallible>(respond(shared, request).await) }
        });
        let connection = http1::Builder::new()
            .keep_alive(false)
            .half_close(true)
            .max_buf_size(MAX_HEAD_BYTES)
            .timer(TokioTimer::new())
            .header_read_timeout(self.shared.options().request_timeout)
            .serve_connection(io, service);
        if let Err(error) = connection.await {
            if error.is_parse() || error.is_parse_too_large() {
                self.shared
                    .log_failure(&RequestError::malformed(error.to_string()));
            } else {
                debug!(target: SERVER_TARGET, error = %error, "connection ended early");
            }
        }
    }
}

impl ConnectionHandler for BridgeConnectionHandler {
    fn handle(&self, stream: TcpStream) {
        let closing = stream.try_clone();
        self.runtime.block_on(self.serve(stream));
        if let Ok(mut closing) = closing {
            linger(&mut closing);
        }
    }
}

/// Half-closes the connection and discards unread input, so a peer whose
/// body was never read sees the response and a clean close, not a reset.
fn linger(stream: &mut TcpStream) {
    if stream.set_nonblocking(false).is_err() {
        return;
    }
    // hyper usually shut the write half already.
    let _ = stream.shutdown(Shutdown::Write);
    let mut sink = [0_u8; 1024];
    let mut drained = 0_usize;
    while drained < MAX_BODY_BYTES {
        match stream.read(&mut sink) {
            Ok(0) | Err(_) => break,
            Ok(read) => drained = drained.saturating_add(read),
        }
    }
}
