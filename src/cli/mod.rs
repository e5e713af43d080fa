//! CLI command implementations
//!
//! This module contains the implementation of all CLI subcommands.

pub mod config;
pub mod led;
pub mod probe;
pub mod run;

use anyhow::{Context, Result};
use tokio::runtime::Runtime;

/// Build the runtime every async subcommand runs on
///
/// Built only after any daemonizing fork.
fn runtime() -> Result<Runtime> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start the async runtime")
}
