//! Shared doubles and helpers for the bridge test suites.

mod client;
mod config_loader;
mod dispatcher;
mod observers;
mod reporter;

pub use client::{HttpReply, get, post_cmd, send_raw};
pub use config_loader::{FailingConfigLoader, test_config};
pub use dispatcher::RecordingGestureDispatcher;
pub use observers::{RecordingCommandObserver, RecordingLogObserver, wait_until};
pub use reporter::{HealthEvent, RecordingHealthReporter};
