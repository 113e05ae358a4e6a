//! Structured telemetry initialisation for the bridge.

use std::io::{self, IsTerminal};

use mbbridge_config::{Config, LogFormat};
use mbbridge_protocol::LogLevel;
use once_cell::sync::OnceCell;
use tracing::{Subscriber, subscriber::SetGlobalDefaultError};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;

use crate::server::SERVER_TARGET;

static TELEMETRY_GUARD: OnceCell<()> = OnceCell::new();

/// Handle returned when telemetry has been initialised.
#[derive(Debug, Default, Clone, Copy)]
pub struct TelemetryHandle;

/// Errors encountered while configuring telemetry.
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    /// Failed to parse the configured log filter expression.
    #[error("invalid log filter: {0}")]
    Filter(String),
    /// Failed to install the tracing subscriber.
    #[error("failed to install telemetry subscriber: {0}")]
    Subscriber(SetGlobalDefaultError),
}

/// Installs the global tracing subscriber on first use.
///
/// Later calls leave the installed subscriber in place and hand back a new
/// [`TelemetryHandle`], so tests and the binary can both call this freely.
pub fn initialise(config: &Config) -> Result<TelemetryHandle, TelemetryError> {
    TELEMETRY_GUARD
        .get_or_try_init(|| install_subscriber(config))
        .map(|_| TelemetryHandle)
}

fn install_subscriber(config: &Config) -> Result<(), TelemetryError> {
    let filter = EnvFilter::try_new(config.log_filter())
        .map_err(|error| TelemetryError::Filter(error.to_string()))?;

    let builder = |filter: EnvFilter| {
        fmt::Subscriber::builder()
            .with_env_filter(filter)
            .with_target(true)
            .with_level(true)
            .with_thread_ids(false)
            .with_thread_names(false)
            .with_writer(io::stderr)
            .with_ansi(io::stderr().is_terminal())
            .with_timer(fmt::time::UtcTime::rfc_3339())
    };

    let subscriber: Box<dyn Subscriber + Send + Sync> = match config.log_format() {
        LogFormat::Json => Box::new(builder(filter).json().flatten_event(true).finish()),
        LogFormat::Compact => Box::new(builder(filter).compact().finish()),
    };

    tracing::subscriber::set_global_default(subscriber).map_err(TelemetryError::Subscriber)
}

/// Emits an operator log line as a `tracing` event at the matching level,
/// under the request pipeline's target.
pub(crate) fn emit(level: LogLevel, message: &str) {
    match level {
        LogLevel::Verbose => tracing::trace!(target: SERVER_TARGET, "{message}"),
        LogLevel::Debug => tracing::debug!(target: SERVER_TARGET, "{message}"),
        LogLevel::Info => tracing::info!(target: SERVER_TARGET, "{message}"),
        LogLevel::Warn => tracing::warn!(target: SERVER_TARGET, "{message}"),
        LogLevel::Error => tracing::error!(target: SERVER_TARGET, "{message}"),
    }
}
