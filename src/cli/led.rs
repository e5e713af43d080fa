//! Manual control of the status LED
//!
//! Useful for checking that the configured name resolves to the intended
//! keyboard before leaving the supervisor unattended.

use crate::bootstrap;
use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use pppwatch_core::config::toml_config::load_config;
use pppwatch_core::config::IndicatorConfig;
use pppwatch_core::error::WatchError;
use pppwatch_core::indicator::{self, DutyCycle, LedDevice, Light};
use std::path::Path;

#[derive(Args, Debug)]
pub struct LedArgs {
    /// What to do with the light
    #[arg(value_enum)]
    pub state: LedState,

    /// LED to drive [default: the configured indicator LED]
    #[arg(long, value_name = "NAME")]
    pub name: Option<String>,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum LedState {
    On,
    Off,
    /// Blink with the recovery pattern until Ctrl-C
    Blink,
}

pub fn run_led(config_path: Option<&Path>, args: LedArgs) -> Result<()> {
    // Brightness files are only writable by root
    bootstrap::ensure_root()?;

    let config = load_config(config_path)?;
    let name = args
        .name
        .unwrap_or_else(|| config.indicator.led.clone());

    let mut led = LedDevice::open(&name).map_err(WatchError::from)?;
    println!(
        "Using {} (max brightness {})",
        led.path().display(),
        led.max_brightness()
    );

    match args.state {
        LedState::On => led.on().context("Failed to switch LED on")?,
        LedState::Off => led.off().context("Failed to switch LED off")?,
        LedState::Blink => {
            let duty = blink_duty(&config.indicator)?;
            super::runtime()?.block_on(async {
                let handle = indicator::start(led, duty).await;
                let interrupted = tokio::signal::ctrl_c().await;
                handle.stop().await.map_err(WatchError::from)?;
                interrupted.context("Failed to wait for Ctrl-C")?;
                Ok::<(), anyhow::Error>(())
            })?;
        }
    }
    Ok(())
}

/// Blink pattern from the indicator section, rejecting zero periods
fn blink_duty(indicator: &IndicatorConfig) -> Result<DutyCycle> {
    indicator.validate().map_err(WatchError::from)?;
    Ok(DutyCycle::from_config(indicator))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_zero_blink_period_rejected() {
        let indicator = IndicatorConfig {
            off_ms: 0,
            ..IndicatorConfig::default()
        };
        let err = blink_duty(&indicator).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<WatchError>(),
            Some(WatchError::Config(_))
        ));
    }

    #[test]
    fn test_configured_blink_pattern_used() {
        let indicator = IndicatorConfig {
            on_ms: 800,
            off_ms: 200,
            ..IndicatorConfig::default()
        };
        let duty = blink_duty(&indicator).unwrap();
        assert_eq!(duty.on, Duration::from_millis(800));
        assert_eq!(duty.off, Duration::from_millis(200));
    }
}
