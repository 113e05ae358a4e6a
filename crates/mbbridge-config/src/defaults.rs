//! Default values shared by the bridge binary and its tests.

use std::time::Duration;

use crate::logging::LogFormat;

/// Interface the bridge always binds; it is never exposed off-host.
pub const LOOPBACK_HOST: &str = "127.0.0.1";

/// Default TCP port of the command bridge.
pub const DEFAULT_PORT: u16 = 27123;

/// Default log filter expression used by the binary.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Default per-connection read timeout in milliseconds.
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 5_000;

/// Default screen width used by the host gesture executor.
pub const DEFAULT_SCREEN_WIDTH: u32 = 1080;

/// Default screen height used by the host gesture executor.
pub const DEFAULT_SCREEN_HEIGHT: u32 = 2340;

/// Owned log filter value used where allocation is required (e.g. serde).
#[must_use]
pub fn default_log_filter_string() -> String {
    DEFAULT_LOG_FILTER.to_owned()
}

/// Default logging format for the binary.
#[must_use]
pub const fn default_log_format() -> LogFormat {
    LogFormat::Json
}

/// Default per-connection read timeout.
#[must_use]
pub const fn default_request_timeout() -> Duration {
    Duration::from_millis(DEFAULT_REQUEST_TIMEOUT_MS)
}
