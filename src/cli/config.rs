//! Effective configuration dump

use anyhow::Result;
use pppwatch_core::config::toml_config::{get_config_path, load_config, to_toml_string};
use pppwatch_core::error::WatchError;
use std::path::Path;

/// Print the configuration as the supervisor would see it
pub fn run_config(config_path: Option<&Path>) -> Result<()> {
    let config = load_config(config_path)?;
    config.validate().map_err(WatchError::from)?;

    let source = config_path
        .map(Path::to_path_buf)
        .unwrap_or_else(get_config_path);
    println!("# Effective configuration (source: {})", source.display());
    print!("{}", to_toml_string(&config)?);
    Ok(())
}
