//! Errors surfaced while running the bridge process.

use thiserror::Error;

use super::ShutdownError;
use crate::bootstrap::BootstrapError;
use crate::server::StartError;

/// Errors surfaced while launching or supervising the bridge.
#[derive(Debug, Error)]
pub enum LaunchError {
    /// Bootstrap failed.
    #[error(transparent)]
    Bootstrap(#[from] BootstrapError),
    /// The listener could not be started.
    #[error("failed to start bridge server: {0}")]
    Start(#[from] StartError),
    /// Waiting for the termination signal failed.
    #[error(transparent)]
    Shutdown(#[from] ShutdownError),
}
