//! One-shot interception probe

use anyhow::Result;
use colored::Colorize;
use pppwatch_core::config::toml_config::load_config;
use pppwatch_core::error::WatchError;
use pppwatch_core::probe::{InterceptionProbe, Probe, ProbeResult};
use std::path::Path;

/// Probe the configured URL once and print the verdict
///
/// Connection faults are retried like in the supervisor, so this only
/// returns once the network answers.
pub fn run_probe(config_path: Option<&Path>) -> Result<()> {
    let config = load_config(config_path)?;
    config.validate().map_err(WatchError::from)?;

    let probe =
        InterceptionProbe::from_config(&config.probe, &config.timing).map_err(WatchError::from)?;
    let result = super::runtime()?.block_on(probe.probe());

    match result {
        ProbeResult::Intercepted => println!("{}", "intercepted".red().bold()),
        ProbeResult::Clear => println!("{}", "clear".green().bold()),
    }
    Ok(())
}
