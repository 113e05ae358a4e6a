//! Runs the bridge until shutdown.

use std::sync::Arc;

use tracing::info;

use super::{LaunchError, PROCESS_TARGET, ShutdownSignal, SystemShutdownSignal};
use crate::bootstrap::{ConfigLoader, SystemConfigLoader, bootstrap_with};
use crate::health::{HealthReporter, StructuredHealthReporter};

/// Runs the bridge using the production collaborators.
///
/// # Errors
///
/// Returns a [`LaunchError`] if bootstrap, listener start or signal
/// installation fails.
pub fn run_bridge() -> Result<(), LaunchError> {
    run_bridge_with(
        &SystemConfigLoader,
        Arc::new(StructuredHealthReporter::new()),
        &SystemShutdownSignal::new(),
    )
}

/// Runs the bridge with injected collaborators.
///
/// `shutdown` is armed before the listener starts, so a termination request
/// that races the start still leads to an orderly stop. The server and tap
/// workers are stopped before this returns, including when waiting for the
/// shutdown signal fails.
///
/// # Errors
///
/// Returns a [`LaunchError`] if bootstrap, listener start or signal
/// installation fails.
pub fn run_bridge_with(
    loader: &dyn ConfigLoader,
    reporter: Arc<dyn HealthReporter>,
    shutdown: &dyn ShutdownSignal,
) -> Result<(), LaunchError> {
    info!(target: PROCESS_TARGET, "starting bridge runtime");
    shutdown.arm()?;
    let bridge = bootstrap_with(loader, reporter)?;
    let addr = bridge.start()?;
    info!(
        target: PROCESS_TARGET,
        addr = %addr,
        auth = bridge.config().token().is_some(),
        body_encoding = %bridge.config().body_encoding(),
        "bridge accepting commands"
    );
    let waited = shutdown.wait();
    bridge.shutdown();
    waited?;
    info!(target: PROCESS_TARGET, "shutdown sequence completed");
    Ok(())
}
