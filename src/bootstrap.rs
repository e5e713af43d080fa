//! Startup privileges and mount isolation
//!
//! Interface commands and sysfs LED writes need root. When started as an
//! ordinary user the process re-executes itself through `sudo`, which also
//! exports the `SUDO_UID`/`SUDO_GID` pair later used to drop privileges for
//! the re-authentication command.

use anyhow::{Context, Result};
use nix::mount::{mount, MsFlags};
use nix::sched::{unshare, CloneFlags};
use nix::unistd::Uid;
use std::os::unix::process::CommandExt;
use std::process::Command;
use tracing::{debug, info};

/// Environment carried across the `sudo` re-exec
const PRESERVED_ENV: &str = "--preserve-env=PPPWATCH_CONFIG,RUST_LOG";

/// Make sure the process runs as root, re-executing through `sudo` if not
///
/// Returns only when already root; on success the re-exec replaces the
/// current process image.
pub fn ensure_root() -> Result<()> {
    if Uid::effective().is_root() {
        return Ok(());
    }

    let exe = std::env::current_exe().context("Failed to locate the pppwatch executable")?;
    info!("Not running as root, re-executing through sudo");

    let err = Command::new("sudo")
        .arg(PRESERVED_ENV)
        .arg("--")
        .arg(&exe)
        .args(std::env::args_os().skip(1))
        .exec();
    Err(err).with_context(|| format!("Failed to re-execute {} through sudo", exe.display()))
}

/// Move into a private mount namespace
///
/// Mounts made by the dialer scripts and the re-authentication command stay
/// inside the namespace and disappear with the supervisor.
pub fn isolate() -> Result<()> {
    unshare(CloneFlags::CLONE_NEWNS).context("Failed to create a mount namespace")?;

    // Stop mount events from propagating back to the parent namespace
    mount(
        None::<&str>,
        "/",
        None::<&str>,
        MsFlags::MS_REC | MsFlags::MS_PRIVATE,
        None::<&str>,
    )
    .context("Failed to make / a private mount")?;

    debug!("Running in a private mount namespace");
    Ok(())
}
