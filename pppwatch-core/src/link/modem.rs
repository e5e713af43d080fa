//! Modem device node detection
//!
//! USB modems sometimes come back from a reset without their serial nodes.
//! Replaying hotplug events makes udev recreate them.

use crate::error::CommandError;
use crate::exec::CommandRunner;
use crate::progress::Progress;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// A modem device node and the command that makes it appear
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModemDevice {
    pub path: PathBuf,
    pub trigger: Vec<String>,
}

impl ModemDevice {
    pub fn new(path: impl Into<PathBuf>, trigger: Vec<String>) -> Self {
        Self {
            path: path.into(),
            trigger,
        }
    }

    /// Make sure the device node exists, triggering hotplug once if needed
    ///
    /// Waits without limit once triggered: the node is expected to show up.
    pub async fn ensure_present<R: CommandRunner>(
        &self,
        runner: &R,
        poll: Duration,
    ) -> Result<(), CommandError> {
        wait_for_device(runner, &self.path, &self.trigger, poll).await
    }
}

/// Wait until `device` exists, running `trigger` first if it is missing
pub async fn wait_for_device<R: CommandRunner>(
    runner: &R,
    device: &Path,
    trigger: &[String],
    poll: Duration,
) -> Result<(), CommandError> {
    if device.exists() {
        debug!("{} present", device.display());
        return Ok(());
    }

    let mut progress = Progress::start(format!("Waiting for {}", device.display()));
    if let Err(e) = runner.run(trigger, None).await {
        progress.fail();
        return Err(e);
    }

    while !device.exists() {
        progress.ping();
        tokio::time::sleep(poll).await;
    }
    progress.done();
    Ok(())
}
