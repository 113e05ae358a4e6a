//! Process-level supervision: run the bridge until a termination signal.

mod errors;
mod launch;
mod shutdown;

pub use errors::LaunchError;
pub use launch::{run_bridge, run_bridge_with};
pub use shutdown::{ShutdownError, ShutdownSignal, SystemShutdownSignal, TERMINATION_SIGNALS};

pub(crate) const PROCESS_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::process");
