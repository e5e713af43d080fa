//! Error types for the pppwatch link supervisor
//!
//! Startup problems (configuration, LED device) and fatal runtime faults
//! (external commands exiting non-zero) each get their own enum; everything
//! is folded into [`WatchError`] at the crate boundary.

use thiserror::Error;

/// Main error type for the pppwatch application
#[derive(Error, Debug)]
pub enum WatchError {
    /// Errors related to configuration loading/parsing
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// External command failures (bring-up, bring-down, re-authentication)
    #[error("Command error: {0}")]
    Command(#[from] CommandError),

    /// Status LED lookup and access errors
    #[error("Device error: {0}")]
    Device(#[from] DeviceError),

    /// Status indicator task failures
    #[error("Indicator error: {0}")]
    Indicator(#[from] IndicatorError),

    /// Interception probe construction errors
    #[error("Probe error: {0}")]
    Probe(#[from] ProbeError),

    /// Generic I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parsing errors
    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl WatchError {
    /// Whether the error stems from configuration or device setup rather
    /// than from a runtime fault of the link
    pub fn is_setup_error(&self) -> bool {
        matches!(
            self,
            WatchError::Config(_)
                | WatchError::Device(_)
                | WatchError::Probe(_)
                | WatchError::Toml(_)
        )
    }
}

/// Configuration-related errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Failed to load configuration file: {path}")]
    LoadFailed { path: String },

    #[error("Missing required configuration field: {field}")]
    MissingField { field: String },

    #[error("Configuration validation error: {message}")]
    ValidationError { message: String },

    #[error("I/O error: {message}")]
    IoError { message: String },
}

/// External command errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    #[error("Command line is empty")]
    Empty,

    #[error("Failed to spawn {program}: {reason}")]
    SpawnFailed { program: String, reason: String },

    #[error("{program} failed with {status}")]
    Failed { program: String, status: String },
}

/// Status LED device errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeviceError {
    #[error("No LED device found for '{name}'")]
    NotFound { name: String },

    #[error("{path} is not an LED device")]
    NotAnLed { path: String },

    #[error("Invalid max_brightness in {path}: {value}")]
    InvalidBrightness { path: String, value: String },

    #[error("Failed to access {path}: {reason}")]
    Access { path: String, reason: String },
}

/// Status indicator task errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IndicatorError {
    #[error("Failed to switch the status light off: {reason}")]
    SwitchOffFailed { reason: String },

    #[error("Indicator task aborted: {reason}")]
    TaskAborted { reason: String },

    #[error("Status light is not available")]
    Unavailable,
}

/// Interception probe construction errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProbeError {
    #[error("Invalid probe URL: {0}")]
    InvalidUrl(String),

    #[error("HTTP client creation failed: {0}")]
    ClientCreationFailed(String),
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, WatchError>;
