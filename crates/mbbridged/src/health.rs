//! Structured health reporting for bridge lifecycle events.

use std::net::SocketAddr;
use std::sync::Arc;

use mbbridge_config::Config;

use crate::bootstrap::BootstrapError;
use crate::server::StartError;

const HEALTH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::health");

/// Observer trait used to surface lifecycle events to telemetry sinks.
pub trait HealthReporter: Send + Sync {
    /// Invoked before configuration loading begins.
    fn bootstrap_starting(&self);

    /// Invoked after bootstrap completes successfully.
    fn bootstrap_succeeded(&self, config: &Config);

    /// Invoked when bootstrap fails.
    fn bootstrap_failed(&self, error: &BootstrapError);

    /// Invoked once the listener accepts connections.
    fn listener_ready(&self, addr: SocketAddr);

    /// Invoked when the listener fails to start.
    fn listener_failed(&self, error: &StartError);

    /// Invoked after a running listener has been released.
    fn listener_stopped(&self);
}

impl<T> HealthReporter for Arc<T>
where
    T: HealthReporter + ?Sized,
{
    fn bootstrap_starting(&self) {
        (**self).bootstrap_starting();
    }

    fn bootstrap_succeeded(&self, config: &Config) {
        (**self).bootstrap_succeeded(config);
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        (**self).bootstrap_failed(error);
    }

    fn listener_ready(&self, addr: SocketAddr) {
        (**self).listener_ready(addr);
    }

    fn listener_failed(&self, error: &StartError) {
        (**self).listener_failed(error);
    }

    fn listener_stopped(&self) {
        (**self).listener_stopped();
    }
}

/// Default reporter that records lifecycle events using `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct StructuredHealthReporter;

impl StructuredHealthReporter {
    /// Builds a new reporter.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl HealthReporter for StructuredHealthReporter {
    fn bootstrap_starting(&self) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "bootstrap_starting",
            "starting bridge bootstrap"
        );
    }

    fn bootstrap_succeeded(&self, config: &Config) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "bootstrap_succeeded",
            port = config.port(),
            auth = config.token().is_some(),
            body_encoding = %config.body_encoding(),
            log_filter = %config.log_filter(),
            log_format = %config.log_format(),
            "bridge bootstrap completed"
        );
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        tracing::error!(
            target: HEALTH_TARGET,
            event = "bootstrap_failed",
            error = %error,
            "bridge bootstrap failed"
        );
    }

    fn listener_ready(&self, addr: SocketAddr) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "listener_ready",
            addr = %addr,
            "bridge listener ready"
        );
    }

    fn listener_failed(&self, error: &StartError) {
        tracing::error!(
            target: HEALTH_TARGET,
            event = "listener_failed",
            error = %error,
            "bridge listener failed to start"
        );
    }

    fn listener_stopped(&self) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "listener_stopped",
            "bridge listener stopped"
        );
    }
}
