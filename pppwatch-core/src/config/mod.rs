//! Configuration module
//!
//! Describes the monitored link, the probe target, the status light and the
//! recovery command. Values come from an optional TOML file and are then
//! overridden from the command line.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub mod timing;
pub mod toml_config;

pub use timing::{Jitter, TimingPolicy};

/// Complete supervisor configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchConfig {
    #[serde(default)]
    pub link: LinkConfig,

    #[serde(default)]
    pub probe: ProbeConfig,

    #[serde(default)]
    pub indicator: IndicatorConfig,

    #[serde(default)]
    pub recovery: RecoveryConfig,

    #[serde(default)]
    pub timing: TimingPolicy,
}

/// The monitored interface and the commands that drive it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkConfig {
    /// Interface name handed to the bring-up/bring-down commands
    #[serde(default = "default_interface")]
    pub interface: String,

    /// Interface that receives the PPP-negotiated address
    #[serde(default = "default_ppp_interface")]
    pub ppp_interface: String,

    /// Modem device node that must exist before the link is started
    #[serde(default)]
    pub modem_device: Option<PathBuf>,

    #[serde(default = "default_bring_up")]
    pub bring_up: Vec<String>,

    #[serde(default = "default_bring_down")]
    pub bring_down: Vec<String>,

    /// Executable name of the dialer that must exit before bring-up
    #[serde(default = "default_dialer")]
    pub dialer: String,

    /// Command that asks the kernel to replay hotplug events
    #[serde(default = "default_hotplug_trigger")]
    pub hotplug_trigger: Vec<String>,
}

fn default_interface() -> String {
    "mobile".to_string()
}
fn default_ppp_interface() -> String {
    "ppp0".to_string()
}
fn default_bring_up() -> Vec<String> {
    vec!["ifup".to_string()]
}
fn default_bring_down() -> Vec<String> {
    vec!["ifdown".to_string()]
}
fn default_dialer() -> String {
    "pppd".to_string()
}
fn default_hotplug_trigger() -> Vec<String> {
    vec![
        "udevadm".to_string(),
        "trigger".to_string(),
        "--action=add".to_string(),
    ]
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            interface: default_interface(),
            ppp_interface: default_ppp_interface(),
            modem_device: None,
            bring_up: default_bring_up(),
            bring_down: default_bring_down(),
            dialer: default_dialer(),
            hotplug_trigger: default_hotplug_trigger(),
        }
    }
}

/// Interception probe target
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeConfig {
    /// URL that receives the HEAD request
    #[serde(default = "default_probe_url")]
    pub url: String,

    /// Location prefix of the carrier's registration redirect
    #[serde(default = "default_redirect_prefix")]
    pub redirect_prefix: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_probe_timeout")]
    pub timeout_secs: u64,
}

fn default_probe_url() -> String {
    "http://example.com/".to_string()
}
fn default_redirect_prefix() -> String {
    "http://bdi.".to_string()
}
fn default_probe_timeout() -> u64 {
    10
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            url: default_probe_url(),
            redirect_prefix: default_redirect_prefix(),
            timeout_secs: default_probe_timeout(),
        }
    }
}

/// Status light shown while recovery runs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndicatorConfig {
    /// Logical LED name (`capslock`, `numlock`, `scrolllock`) or an LED
    /// function suffix such as `kbd_backlight`
    #[serde(default = "default_led")]
    pub led: String,

    #[serde(default = "default_on_ms")]
    pub on_ms: u64,

    #[serde(default = "default_off_ms")]
    pub off_ms: u64,
}

fn default_led() -> String {
    "capslock".to_string()
}
fn default_on_ms() -> u64 {
    2500
}
fn default_off_ms() -> u64 {
    500
}

impl IndicatorConfig {
    /// Check the LED name and blink periods
    ///
    /// Zero periods would turn the blink loop into a busy loop of sysfs
    /// writes.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.led.is_empty() {
            return Err(validation("indicator.led cannot be empty"));
        }
        if self.on_ms == 0 || self.off_ms == 0 {
            return Err(validation("indicator.on_ms and indicator.off_ms must be non-zero"));
        }
        Ok(())
    }
}

impl Default for IndicatorConfig {
    fn default() -> Self {
        Self {
            led: default_led(),
            on_ms: default_on_ms(),
            off_ms: default_off_ms(),
        }
    }
}

/// Re-authentication command run as the invoking user
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecoveryConfig {
    #[serde(default)]
    pub command: Vec<String>,
}

impl WatchConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        let link = &self.link;
        if link.interface.is_empty() {
            return Err(validation("link.interface cannot be empty"));
        }
        if link.ppp_interface.is_empty() {
            return Err(validation("link.ppp_interface cannot be empty"));
        }
        if link.bring_up.is_empty() || link.bring_down.is_empty() {
            return Err(validation(
                "link.bring_up and link.bring_down must name a command",
            ));
        }
        if link.dialer.is_empty() || link.dialer.contains('/') {
            return Err(validation("link.dialer must be a bare executable name"));
        }
        if link.modem_device.is_some() && link.hotplug_trigger.is_empty() {
            return Err(validation(
                "link.hotplug_trigger must name a command when modem_device is set",
            ));
        }

        self.validate_probe()?;

        self.indicator.validate()?;

        if self.recovery.command.is_empty() {
            return Err(ConfigError::MissingField {
                field: "recovery.command".to_string(),
            });
        }

        self.timing
            .validate()
            .map_err(|e| validation(&format!("Invalid timing policy: {}", e)))?;

        Ok(())
    }

    fn validate_probe(&self) -> Result<(), ConfigError> {
        use url::Url;

        match Url::parse(&self.probe.url) {
            Ok(url) => match url.scheme() {
                "http" | "https" => {}
                scheme => {
                    return Err(validation(&format!(
                        "probe.url scheme must be http or https, got: {}",
                        scheme
                    )))
                }
            },
            Err(e) => {
                return Err(validation(&format!("Failed to parse probe.url: {}", e)));
            }
        }

        if self.probe.redirect_prefix.is_empty() {
            return Err(validation("probe.redirect_prefix cannot be empty"));
        }
        if self.probe.timeout_secs < 1 || self.probe.timeout_secs > 300 {
            return Err(validation(&format!(
                "probe.timeout_secs must be between 1 and 300, got: {}",
                self.probe.timeout_secs
            )));
        }
        Ok(())
    }

    /// Check that every configured command resolves on `PATH`
    ///
    /// Kept apart from [`validate`](Self::validate) since the answer depends
    /// on the host rather than on the file.
    pub fn check_commands(&self) -> Result<(), ConfigError> {
        let mut programs = vec![
            &self.link.bring_up,
            &self.link.bring_down,
            &self.recovery.command,
        ];
        if self.link.modem_device.is_some() {
            programs.push(&self.link.hotplug_trigger);
        }

        for program in programs.into_iter().filter_map(|argv| argv.first()) {
            which::which(program).map_err(|_| {
                validation(&format!("Command not found on PATH: {}", program))
            })?;
        }
        Ok(())
    }
}

fn validation(message: &str) -> ConfigError {
    ConfigError::ValidationError {
        message: message.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> WatchConfig {
        WatchConfig {
            recovery: RecoveryConfig {
                command: vec!["/usr/bin/true".to_string()],
            },
            ..WatchConfig::default()
        }
    }

    #[test]
    fn test_valid_config() {
        assert!(valid_config().validate().is_ok());
    }

    #[test]
    fn test_missing_recovery_command() {
        let config = WatchConfig::default();
        assert_eq!(
            config.validate(),
            Err(ConfigError::MissingField {
                field: "recovery.command".to_string()
            })
        );
    }

    #[test]
    fn test_dialer_with_path_rejected() {
        let mut config = valid_config();
        config.link.dialer = "/usr/sbin/pppd".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_probe_url_scheme_rejected() {
        let mut config = valid_config();
        config.probe.url = "ftp://example.com/".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("scheme must be http or https"));
    }

    #[test]
    fn test_modem_device_requires_trigger() {
        let mut config = valid_config();
        config.link.modem_device = Some(PathBuf::from("/dev/ttyUSB0"));
        config.link.hotplug_trigger.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_indicator_period_rejected() {
        let mut config = valid_config();
        config.indicator.off_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_indicator_section_checked_on_its_own() {
        let mut indicator = IndicatorConfig::default();
        assert!(indicator.validate().is_ok());

        indicator.on_ms = 0;
        let err = indicator.validate().unwrap_err();
        assert!(err.to_string().contains("must be non-zero"));
    }

    #[test]
    fn test_check_commands_reports_missing_binary() {
        let mut config = valid_config();
        config.recovery.command = vec!["pppwatch-no-such-command-xyz".to_string()];
        config.link.bring_up = vec!["sh".to_string()];
        config.link.bring_down = vec!["sh".to_string()];
        let err = config.check_commands().unwrap_err();
        assert!(err.to_string().contains("pppwatch-no-such-command-xyz"));
    }
}
