//! Termination signal handling.

use std::ffi::c_int;
use std::io;
use std::sync::{Mutex, PoisonError};

use signal_hook::consts::signal::{SIGHUP, SIGINT, SIGQUIT, SIGTERM};
use signal_hook::iterator::Signals;
use signal_hook::low_level::signal_name;
use thiserror::Error;
use tracing::info;

use super::PROCESS_TARGET;

/// Signals that stop the bridge.
pub const TERMINATION_SIGNALS: [c_int; 4] = [SIGTERM, SIGINT, SIGQUIT, SIGHUP];

/// Blocks the runtime until it should shut down.
pub trait ShutdownSignal: Send + Sync {
    /// Starts capturing shutdown requests. The runtime calls this before the
    /// listener starts; requests arriving between `arm` and
    /// [`wait`](Self::wait) are held, not lost.
    ///
    /// # Errors
    ///
    /// Returns a [`ShutdownError`] when capture cannot be set up.
    fn arm(&self) -> Result<(), ShutdownError>;

    /// Returns once shutdown should begin.
    ///
    /// # Errors
    ///
    /// Returns a [`ShutdownError`] when the wait cannot be set up.
    fn wait(&self) -> Result<(), ShutdownError>;
}

/// Failure to wait for shutdown.
#[derive(Debug, Error)]
pub enum ShutdownError {
    /// The process signal handlers could not be registered.
    #[error("failed to install signal handlers: {source}")]
    Install {
        /// Registration error.
        #[source]
        source: io::Error,
    },
}

/// Waits for the first of [`TERMINATION_SIGNALS`].
///
/// Arming replaces the default disposition of those signals, so from then
/// on they are queued for [`wait`](ShutdownSignal::wait) instead of killing
/// the process.
#[derive(Default)]
pub struct SystemShutdownSignal {
    signals: Mutex<Option<Signals>>,
}

impl SystemShutdownSignal {
    /// Creates an unarmed signal source.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<Signals>> {
        self.signals.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl ShutdownSignal for SystemShutdownSignal {
    fn arm(&self) -> Result<(), ShutdownError> {
        let mut signals = self.lock();
        if signals.is_none() {
            *signals = Some(
                Signals::new(TERMINATION_SIGNALS)
                    .map_err(|source| ShutdownError::Install { source })?,
            );
        }
        Ok(())
    }

    fn wait(&self) -> Result<(), ShutdownError> {
        self.arm()?;
        let mut guard = self.lock();
        let Some(signals) = guard.as_mut() else {
            return Ok(());
        };
        if let Some(signal) = signals.forever().next() {
            info!(
                target: PROCESS_TARGET,
                signal,
                name = signal_name(signal).unwrap_or("unknown"),
                "termination signal received"
            );
        }
        Ok(())
    }
}
