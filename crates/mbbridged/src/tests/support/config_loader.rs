//! Configuration doubles for bootstrap scenarios.

use std::ffi::OsString;
use std::sync::Arc;

use mbbridge_config::Config;
use ortho_config::{OrthoConfig, OrthoError};

use crate::bootstrap::ConfigLoader;

/// Configuration bound to an ephemeral port with quiet logging.
pub fn test_config() -> Config {
    Config {
        port: 0,
        log_filter: "warn".to_owned(),
        ..Config::default()
    }
}

/// Loader that fails by passing an unparsable port on the command line.
pub struct FailingConfigLoader;

impl ConfigLoader for FailingConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        let args = vec![
            OsString::from("mbbridged"),
            OsString::from("--port"),
            OsString::from("not-a-port"),
        ];
        Config::load_from_iter(args)
    }
}
