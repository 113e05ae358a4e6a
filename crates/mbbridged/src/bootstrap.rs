//! Bridge bootstrap orchestration.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex, PoisonError};

use mbbridge_config::{Config, SettingsStore};
use ortho_config::{OrthoConfig, OrthoError};
use thiserror::Error;
use tracing::warn;

use crate::health::HealthReporter;
use crate::monitor::CommandMonitor;
use crate::server::{BridgeServer, ServerOptions, StartError};
use crate::tap::{
    GestureDispatcher, StaticScreenGeometry, TapBus, TapError, TapExecutor, TapRequester,
    TracingGestureDispatcher, WorkerHandle,
};
use crate::telemetry::{self, TelemetryError, TelemetryHandle};

const BOOTSTRAP_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::bootstrap");

/// Trait abstracting configuration loading for testability.
pub trait ConfigLoader: Send + Sync {
    /// Loads the bridge configuration.
    fn load(&self) -> Result<Config, Arc<OrthoError>>;
}

/// Loader that delegates to [`Config::load`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemConfigLoader;

impl ConfigLoader for SystemConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Config::load()
    }
}

/// Loader returning a configuration resolved elsewhere.
#[derive(Debug, Clone)]
pub struct StaticConfigLoader {
    config: Config,
}

impl StaticConfigLoader {
    /// Wraps an already resolved configuration.
    #[must_use]
    pub const fn new(config: Config) -> Self {
        Self { config }
    }
}

impl ConfigLoader for StaticConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Ok(self.config.clone())
    }
}

/// Errors surfaced during bootstrap.
#[derive(Debug, Error)]
pub enum BootstrapError {
    /// Configuration failed to load.
    #[error("failed to load configuration: {source}")]
    Configuration {
        /// Underlying loader error.
        #[source]
        source: Arc<OrthoError>,
    },
    /// Telemetry initialisation failed.
    #[error("failed to initialise telemetry: {source}")]
    Telemetry {
        /// Underlying telemetry error.
        #[source]
        source: TelemetryError,
    },
    /// A tap worker could not be started.
    #[error("failed to start tap dispatch: {source}")]
    Tap {
        /// Underlying tap error.
        #[source]
        source: TapError,
    },
}

/// A wired bridge: settings, server, monitor and tap executor.
///
/// The server is created stopped; call [`Bridge::start`].
pub struct Bridge {
    config: Config,
    settings: Arc<SettingsStore>,
    server: BridgeServer,
    monitor: Arc<CommandMonitor>,
    tap_bus: TapBus,
    executor: Mutex<Option<WorkerHandle>>,
    telemetry: TelemetryHandle,
    reporter: Arc<dyn HealthReporter>,
}

impl Bridge {
    /// Accessor for the resolved configuration.
    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// Hot-rotatable settings read by the server on every request.
    #[must_use]
    pub const fn settings(&self) -> &Arc<SettingsStore> {
        &self.settings
    }

    /// The command server.
    #[must_use]
    pub const fn server(&self) -> &BridgeServer {
        &self.server
    }

    /// The registered consumer.
    #[must_use]
    pub const fn monitor(&self) -> &Arc<CommandMonitor> {
        &self.monitor
    }

    /// Bus shared by the monitor's requester and the executor.
    #[must_use]
    pub const fn tap_bus(&self) -> &TapBus {
        &self.tap_bus
    }

    /// Accessor for the telemetry handle, primarily useful for testing.
    #[must_use]
    pub const fn telemetry(&self) -> TelemetryHandle {
        self.telemetry
    }

    /// Starts the server and reports the outcome.
    ///
    /// # Errors
    ///
    /// Propagates the [`StartError`] from [`BridgeServer::start`].
    pub fn start(&self) -> Result<SocketAddr, StartError> {
        match self.server.start() {
            Ok(addr) => {
                self.reporter.listener_ready(addr);
                Ok(addr)
            }
            Err(error) => {
                self.reporter.listener_failed(&error);
                Err(error)
            }
        }
    }

    /// Stops the server if it is running.
    pub fn stop(&self) {
        if self.server.stop() {
            self.reporter.listener_stopped();
        }
    }

    /// Stops the server, the result watcher and the executor.
    pub fn shutdown(&self) {
        self.stop();
        self.server.set_command_observer(None);
        self.server.set_log_observer(None);
        self.monitor.shutdown();
        let executor = self
            .executor
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(executor) = executor {
            executor.shutdown();
            if let Err(error) = executor.join() {
                warn!(target: BOOTSTRAP_TARGET, error = %error, "tap executor failed");
            }
        }
    }
}

impl Drop for Bridge {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Bootstraps the bridge with the host gesture dispatcher.
pub fn bootstrap_with(
    loader: &dyn ConfigLoader,
    reporter: Arc<dyn HealthReporter>,
) -> Result<Bridge, BootstrapError> {
    bootstrap_with_dispatcher(loader, reporter, Arc::new(TracingGestureDispatcher))
}

/// Bootstraps the bridge with an injected gesture dispatcher.
pub fn bootstrap_with_dispatcher(
    loader: &dyn ConfigLoader,
    reporter: Arc<dyn HealthReporter>,
    dispatcher: Arc<dyn GestureDispatcher>,
) -> Result<Bridge, BootstrapError> {
    reporter.bootstrap_starting();

    let config = match loader.load() {
        Ok(config) => config,
        Err(source) => {
            let error = BootstrapError::Configuration { source };
            reporter.bootstrap_failed(&error);
            return Err(error);
        }
    };

    let telemetry = match telemetry::initialise(&config) {
        Ok(handle) => handle,
        Err(source) => {
            let error = BootstrapError::Telemetry { source };
            reporter.bootstrap_failed(&error);
            return Err(error);
        }
    };

    let tap_bus = TapBus::new();
    let wired = TapExecutor::new(
        tap_bus.clone(),
        Arc::new(StaticScreenGeometry::from_config(&config)),
        dispatcher,
    )
    .spawn()
    .and_then(|executor| {
        CommandMonitor::with_tap(TapRequester::new(tap_bus.clone()))
            .map(|monitor| (executor, monitor))
    });
    let (executor, monitor) = match wired {
        Ok(parts) => parts,
        Err(source) => {
            let error = BootstrapError::Tap { source };
            reporter.bootstrap_failed(&error);
            return Err(error);
        }
    };

    let settings = Arc::new(SettingsStore::from_config(&config));
    let server = BridgeServer::new(settings.clone(), ServerOptions::from_config(&config));
    let monitor = Arc::new(monitor);
    server.set_command_observer(Some(monitor.clone()));
    server.set_log_observer(Some(monitor.clone()));

    reporter.bootstrap_succeeded(&config);
    Ok(Bridge {
        config,
        settings,
        server,
        monitor,
        tap_bus,
        executor: Mutex::new(Some(executor)),
        telemetry,
        reporter,
    })
}
