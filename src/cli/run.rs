//! The supervisor command
//!
//! Startup order matters: after elevating, everything that can be rejected
//! (configuration, missing binaries, the LED) is checked before the process
//! isolates or detaches, so mistakes surface on the terminal.

use crate::bootstrap;
use crate::daemon::process::{DaemonProcess, DEFAULT_PID_FILE};
use anyhow::Result;
use clap::Args;
use pppwatch_core::config::toml_config::load_config;
use pppwatch_core::config::WatchConfig;
use pppwatch_core::error::WatchError;
use pppwatch_core::exec::{Credentials, Executor};
use pppwatch_core::indicator::{DutyCycle, LedDevice, Light};
use pppwatch_core::link::{InterfaceAddresses, InterfaceCycler, ProcFs};
use pppwatch_core::probe::InterceptionProbe;
use pppwatch_core::supervisor::{RecoveryPlan, Supervisor};
use std::path::{Path, PathBuf};
use tokio::signal::unix::{signal, SignalKind};
use tracing::{info, warn};

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Interface passed to the bring-up and bring-down commands
    #[arg(short, long, value_name = "NAME")]
    pub interface: Option<String>,

    /// PPP interface whose address is watched
    #[arg(long, value_name = "NAME")]
    pub ppp_interface: Option<String>,

    /// Modem device node that must exist before bring-up
    #[arg(long, value_name = "PATH")]
    pub modem_device: Option<PathBuf>,

    /// Status LED: logical name, sysfs LED name or directory
    #[arg(long, value_name = "NAME")]
    pub led: Option<String>,

    /// Detach from the terminal
    #[arg(short, long)]
    pub daemon: bool,

    /// PID file used in daemon mode
    #[arg(long, value_name = "PATH", default_value = DEFAULT_PID_FILE)]
    pub pid_file: PathBuf,

    /// Stay in the caller's mount namespace
    #[arg(long)]
    pub no_isolate: bool,

    /// Re-authentication command, run as the invoking user
    #[arg(trailing_var_arg = true, allow_hyphen_values = true, value_name = "COMMAND")]
    pub command: Vec<String>,
}

impl RunArgs {
    /// Layer command-line values over the configuration file
    pub fn apply(&self, config: &mut WatchConfig) {
        if let Some(interface) = &self.interface {
            config.link.interface = interface.clone();
        }
        if let Some(ppp_interface) = &self.ppp_interface {
            config.link.ppp_interface = ppp_interface.clone();
        }
        if let Some(modem_device) = &self.modem_device {
            config.link.modem_device = Some(modem_device.clone());
        }
        if let Some(led) = &self.led {
            config.indicator.led = led.clone();
        }
        if !self.command.is_empty() {
            config.recovery.command = self.command.clone();
        }
    }
}

/// Run the supervisor until a fatal error or a termination signal
pub fn run_watch(config_path: Option<&Path>, args: RunArgs) -> Result<()> {
    bootstrap::ensure_root()?;

    let mut config = load_config(config_path)?;
    args.apply(&mut config);
    config.validate().map_err(WatchError::from)?;
    config.check_commands().map_err(WatchError::from)?;

    let led = LedDevice::open(&config.indicator.led).map_err(WatchError::from)?;
    let led_path = led.path().to_path_buf();

    let credentials = Credentials::from_invoking_user();
    if credentials.is_none() {
        warn!("No invoking user found; the re-authentication command will run as root");
    }

    if !args.no_isolate {
        bootstrap::isolate()?;
    }

    let _daemon = if args.daemon {
        let mut daemon = DaemonProcess::new(args.pid_file.clone());
        daemon.daemonize()?;
        Some(daemon)
    } else {
        None
    };

    let mut supervisor = Supervisor::new(
        InterfaceAddresses::new(&config.link.ppp_interface),
        InterfaceCycler::new(Executor, ProcFs::new(), &config.link, &config.timing),
        InterceptionProbe::from_config(&config.probe, &config.timing).map_err(WatchError::from)?,
        led,
        RecoveryPlan {
            command: config.recovery.command.clone(),
            credentials,
            duty: DutyCycle::from_config(&config.indicator),
        },
        config.timing.poll_jitter(),
    );

    let runtime = super::runtime()?;
    let outcome: Result<()> = runtime.block_on(async {
        tokio::select! {
            result = supervisor.run() => match result {
                Err(e) => Err(e.into()),
                Ok(never) => match never {},
            },
            signal = shutdown_signal() => match signal {
                Ok(name) => {
                    info!("Received {}, shutting down", name);
                    Ok(())
                }
                Err(e) => Err(anyhow::Error::new(e).context("Failed to install signal handlers")),
            },
        }
    });

    // An interrupted recovery may have left the light on
    match LedDevice::open_path(led_path) {
        Ok(mut led) => {
            if let Err(e) = led.off() {
                warn!(error = %e, "Failed to switch status LED off");
            }
        }
        Err(e) => warn!(error = %e, "Failed to reopen status LED"),
    }
    outcome
}

/// Wait for SIGINT or SIGTERM
async fn shutdown_signal() -> std::io::Result<&'static str> {
    let mut terminate = signal(SignalKind::terminate())?;
    tokio::select! {
        result = tokio::signal::ctrl_c() => result.map(|()| "SIGINT"),
        _ = terminate.recv() => Ok("SIGTERM"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct Harness {
        #[command(flatten)]
        run: RunArgs,
    }

    fn parse(args: &[&str]) -> RunArgs {
        Harness::parse_from(std::iter::once("pppwatch").chain(args.iter().copied())).run
    }

    #[test]
    fn test_trailing_command_keeps_its_flags() {
        let args = parse(&["-i", "wwan", "portal-login", "--user", "me", "-q"]);
        assert_eq!(args.interface.as_deref(), Some("wwan"));
        assert_eq!(args.command, vec!["portal-login", "--user", "me", "-q"]);
    }

    #[test]
    fn test_flags_override_file_values() {
        let args = parse(&[
            "--ppp-interface",
            "ppp1",
            "--modem-device",
            "/dev/ttyUSB2",
            "--led",
            "numlock",
            "login",
        ]);
        let mut config = WatchConfig::default();
        args.apply(&mut config);

        assert_eq!(config.link.interface, "mobile");
        assert_eq!(config.link.ppp_interface, "ppp1");
        assert_eq!(
            config.link.modem_device,
            Some(PathBuf::from("/dev/ttyUSB2"))
        );
        assert_eq!(config.indicator.led, "numlock");
        assert_eq!(config.recovery.command, vec!["login"]);
    }

    #[test]
    fn test_missing_command_keeps_configured_one() {
        let args = parse(&[]);
        let mut config = WatchConfig::default();
        config.recovery.command = vec!["from-file".to_string()];
        args.apply(&mut config);

        assert_eq!(config.recovery.command, vec!["from-file"]);
        assert_eq!(args.pid_file, PathBuf::from(DEFAULT_PID_FILE));
        assert!(!args.daemon && !args.no_isolate);
    }
}
