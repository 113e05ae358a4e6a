//! Loopback command bridge for page-turn triggers.
//!
//! A companion device posts page-turn events to `POST /cmd` on
//! `127.0.0.1`. The bridge authenticates each request against an optional
//! shared token, decodes the body with the deployment's selected
//! [`BodyEncoding`](mbbridge_config::BodyEncoding), and hands the resulting
//! [`Command`](mbbridge_protocol::Command) to a single registered observer.
//! `GET /health` is a liveness probe that always answers while the listener
//! is up.
//!
//! The bundled observer, [`CommandMonitor`], keeps statistics and an
//! operator log and turns `PREV`/`NEXT` into tap requests on an in-process
//! [`TapBus`]. A [`TapExecutor`] serves those requests: it computes an edge
//! coordinate from the current screen bounds, hands a gesture to the
//! injected [`GestureDispatcher`] and publishes exactly one result per
//! request.
//!
//! No request, however malformed, can take the process down. Request
//! failures become an `{"ok":0,"err":..}` envelope plus a log line, tap
//! failures become a `success=false` result, and listener failures are
//! returned from [`BridgeServer::start`].

pub mod auth;
mod bootstrap;
mod health;
pub mod http;
mod monitor;
mod process;
mod server;
pub mod tap;
mod telemetry;
mod transport;

pub use bootstrap::{
    BootstrapError, Bridge, ConfigLoader, StaticConfigLoader, SystemConfigLoader, bootstrap_with,
    bootstrap_with_dispatcher,
};
pub use health::{HealthReporter, StructuredHealthReporter};
pub use monitor::{CommandMonitor, DEFAULT_LOG_CAPACITY, LogBuffer, SIMULATE_SOURCE};
pub use process::{
    LaunchError, ShutdownError, ShutdownSignal, SystemShutdownSignal, TERMINATION_SIGNALS,
    run_bridge, run_bridge_with,
};
pub use server::{
    BridgeServer, CommandObserver, LogObserver, ServerOptions, ServerState, StartError,
};
pub use tap::{GestureDispatcher, TapBus, TapExecutor};
pub use telemetry::{TelemetryError, TelemetryHandle, initialise as initialise_telemetry};
pub use transport::ListenerError;

#[cfg(test)]
mod tests;
