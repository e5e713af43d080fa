//! Daemon process management
//!
//! Handles detaching from the terminal and the PID file lifecycle.

use std::fs;
use std::path::{Path, PathBuf};
use std::process;

use anyhow::{bail, Context, Result};
use daemonize::Daemonize;
use nix::errno::Errno;
use nix::unistd::{getpgid, Pid};
use tracing::{info, warn};

/// Default PID file location for the root-owned supervisor
pub const DEFAULT_PID_FILE: &str = "/run/pppwatch.pid";

/// A detached supervisor and its PID file
///
/// Once this process has daemonized, the PID file is its own and is removed
/// when the value is dropped. A refused or failed start leaves it alone.
pub struct DaemonProcess {
    pid_file: PathBuf,
    owns_pid_file: bool,
}

impl DaemonProcess {
    pub fn new(pid_file: PathBuf) -> Self {
        Self {
            pid_file,
            owns_pid_file: false,
        }
    }

    /// Check whether the PID file names a live process
    ///
    /// A PID file left behind by a dead process is removed.
    pub fn is_running(&self) -> Result<bool> {
        let Some(pid) = read_pid(&self.pid_file)? else {
            return Ok(false);
        };

        match getpgid(Some(Pid::from_raw(pid))) {
            Ok(_) => Ok(true),
            Err(Errno::ESRCH) => {
                warn!(pid, "Removing stale PID file {}", self.pid_file.display());
                let _ = fs::remove_file(&self.pid_file);
                Ok(false)
            }
            Err(e) => Err(e).context("Failed to check process status"),
        }
    }

    /// Detach from the terminal and write the PID file
    ///
    /// Must run before the tokio runtime is built: only the calling thread
    /// survives the fork.
    pub fn daemonize(&mut self) -> Result<()> {
        if self.is_running()? {
            bail!(
                "pppwatch is already running (PID file {})",
                self.pid_file.display()
            );
        }

        if let Some(parent) = self.pid_file.parent() {
            fs::create_dir_all(parent).context("Failed to create PID file directory")?;
        }

        Daemonize::new()
            .pid_file(&self.pid_file)
            .working_directory("/")
            .umask(0o027)
            .start()
            .context("Failed to daemonize process")?;
        self.owns_pid_file = true;

        info!("Daemonized, PID: {}", process::id());
        Ok(())
    }
}

impl Drop for DaemonProcess {
    fn drop(&mut self) {
        if self.owns_pid_file {
            let _ = fs::remove_file(&self.pid_file);
        }
    }
}

/// PID recorded in `path`, or `None` if there is no PID file
fn read_pid(path: &Path) -> Result<Option<i32>> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e).context("Failed to read PID file"),
    };

    let pid = contents
        .trim()
        .parse()
        .with_context(|| format!("Invalid PID in {}", path.display()))?;
    Ok(Some(pid))
}
