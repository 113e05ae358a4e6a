//! Layered configuration for the page-turn command bridge.
//!
//! [`Config`] is resolved by `ortho_config` from defaults, an optional TOML
//! file (`--config-path` or `MBBRIDGE_CONFIG_PATH`), `MBBRIDGE_*` environment
//! variables and command-line flags, in increasing order of precedence.
//!
//! The token and port are additionally exposed through [`BridgeSettings`],
//! the narrow capability the request pipeline reads on every call. The
//! in-process [`SettingsStore`] supports rotating the token without
//! restarting the bridge.

mod defaults;
mod logging;
mod settings;

use std::time::Duration;

use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};

pub use defaults::{
    DEFAULT_LOG_FILTER, DEFAULT_PORT, DEFAULT_REQUEST_TIMEOUT_MS, DEFAULT_SCREEN_HEIGHT,
    DEFAULT_SCREEN_WIDTH, LOOPBACK_HOST, default_log_filter_string, default_log_format,
    default_request_timeout,
};
pub use logging::{LogFormat, LogFormatParseError};
pub use mbbridge_protocol::BodyEncoding;
pub use settings::{BridgeSettings, SettingsStore};

/// Resolved bridge configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, OrthoConfig)]
#[ortho_config(prefix = "MBBRIDGE")]
pub struct Config {
    /// Loopback TCP port the bridge listens on.
    #[ortho_config(default = DEFAULT_PORT)]
    pub port: u16,
    /// Shared secret expected in the token header; empty disables auth.
    #[ortho_config(default = String::new())]
    pub token: String,
    /// Decoder used for `/cmd` bodies.
    #[ortho_config(default = BodyEncoding::Text)]
    pub body_encoding: BodyEncoding,
    /// Per-connection read timeout in milliseconds.
    #[ortho_config(default = DEFAULT_REQUEST_TIMEOUT_MS)]
    pub request_timeout_ms: u64,
    /// Screen width reported by the host geometry provider.
    #[ortho_config(default = DEFAULT_SCREEN_WIDTH)]
    pub screen_width: u32,
    /// Screen height reported by the host geometry provider.
    #[ortho_config(default = DEFAULT_SCREEN_HEIGHT)]
    pub screen_height: u32,
    /// `tracing` filter expression.
    #[ortho_config(default = default_log_filter_string())]
    pub log_filter: String,
    /// Structured log output format.
    #[ortho_config(default = default_log_format())]
    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            token: String::new(),
            body_encoding: BodyEncoding::Text,
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
            screen_width: DEFAULT_SCREEN_WIDTH,
            screen_height: DEFAULT_SCREEN_HEIGHT,
            log_filter: default_log_filter_string(),
            log_format: default_log_format(),
        }
    }
}

impl Config {
    /// Configured port.
    #[must_use]
    pub const fn port(&self) -> u16 {
        self.port
    }

    /// Configured token, or `None` when authentication is disabled.
    #[must_use]
    pub fn token(&self) -> Option<&str> {
        Some(self.token.trim()).filter(|token| !token.is_empty())
    }

    /// Selected `/cmd` body decoder.
    #[must_use]
    pub const fn body_encoding(&self) -> BodyEncoding {
        self.body_encoding
    }

    /// Per-connection read timeout; zero is treated as the default.
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        if self.request_timeout_ms == 0 {
            default_request_timeout()
        } else {
            Duration::from_millis(self.request_timeout_ms)
        }
    }

    /// Log filter expression.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        &self.log_filter
    }

    /// Log output format.
    #[must_use]
    pub const fn log_format(&self) -> LogFormat {
        self.log_format
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_documented_surface() {
        let config = Config::default();
        assert_eq!(config.port(), 27123);
        assert_eq!(config.token(), None);
        assert_eq!(config.body_encoding(), BodyEncoding::Text);
        assert_eq!(config.request_timeout(), Duration::from_secs(5));
        assert_eq!(config.log_filter(), "info");
        assert_eq!(config.log_format(), LogFormat::Json);
    }

    #[test]
    fn blank_token_disables_auth() {
        let config = Config {
            token: "   ".to_owned(),
            ..Config::default()
        };
        assert_eq!(config.token(), None);
    }

    #[test]
    fn token_is_trimmed() {
        let config = Config {
            token: " secret\n".to_owned(),
            ..Config::default()
        };
        assert_eq!(config.token(), Some("secret"));
    }

    #[test]
    fn zero_timeout_falls_back_to_default() {
        let config = Config {
            request_timeout_ms: 0,
            ..Config::default()
        };
        assert_eq!(config.request_timeout(), default_request_timeout());
    }
}
