//! TOML configuration file I/O
//!
//! Loads the supervisor configuration from `/etc/pppwatch/config.toml`, the
//! path in `PPPWATCH_CONFIG`, or an explicit path from the command line.

use crate::config::WatchConfig;
use crate::error::{ConfigError, WatchError};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Default configuration file location
const DEFAULT_CONFIG_PATH: &str = "/etc/pppwatch/config.toml";

/// Get the configuration file path
///
/// Returns the `PPPWATCH_CONFIG` environment variable if set, otherwise the
/// system-wide default. The supervisor runs as root, so there is no per-user
/// configuration directory.
pub fn get_config_path() -> PathBuf {
    std::env::var_os("PPPWATCH_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

/// Load the configuration
///
/// An explicitly requested file must exist. When no path is given and the
/// default file is absent, built-in defaults are returned so that a bare
/// command line is enough to run.
pub fn load_config(explicit: Option<&Path>) -> Result<WatchConfig, WatchError> {
    match explicit {
        Some(path) => load_config_from_path(path),
        None => {
            let path = get_config_path();
            if path.exists() {
                load_config_from_path(&path)
            } else {
                debug!(path = %path.display(), "No configuration file, using defaults");
                Ok(WatchConfig::default())
            }
        }
    }
}

/// Load configuration from a specific TOML file
///
/// The result is parsed but not validated: command-line overrides are applied
/// afterwards and validation runs on the merged result.
pub fn load_config_from_path<P: AsRef<Path>>(path: P) -> Result<WatchConfig, WatchError> {
    let contents = std::fs::read_to_string(&path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => WatchError::Config(ConfigError::LoadFailed {
            path: path.as_ref().to_string_lossy().to_string(),
        }),
        _ => WatchError::Config(ConfigError::IoError {
            message: format!("Failed to read config file: {}", e),
        }),
    })?;

    let config: WatchConfig = toml::from_str(&contents)?;

    info!(
        "Loaded configuration from {}: interface={}, ppp_interface={}, led={}, probe={}",
        path.as_ref().display(),
        config.link.interface,
        config.link.ppp_interface,
        config.indicator.led,
        config.probe.url
    );

    Ok(config)
}

/// Render a configuration as pretty TOML
pub fn to_toml_string(config: &WatchConfig) -> Result<String, WatchError> {
    toml::to_string_pretty(config).map_err(|e| {
        WatchError::Config(ConfigError::ValidationError {
            message: format!("Failed to serialize config: {}", e),
        })
    })
}
