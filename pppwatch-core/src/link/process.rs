//! Dialer process detection
//!
//! Scans `/proc/<pid>/cmdline` for a running dialer. Entries that vanish or
//! cannot be read mid-scan are skipped.

use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// A view of the running processes
pub trait ProcessTable {
    /// Whether a process whose executable is named `name` is running
    fn is_running(&self, name: &str) -> bool;
}

/// Process table backed by procfs
#[derive(Debug, Clone)]
pub struct ProcFs {
    root: PathBuf,
}

impl ProcFs {
    pub fn new() -> Self {
        Self::with_root("/proc")
    }

    /// Scan a procfs-shaped tree rooted somewhere other than `/proc`
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl Default for ProcFs {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessTable for ProcFs {
    fn is_running(&self, name: &str) -> bool {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(root = %self.root.display(), error = %e, "Cannot list process table");
                return false;
            }
        };

        entries
            .filter_map(Result::ok)
            .filter(|entry| is_pid_dir(&entry.file_name().to_string_lossy()))
            .filter_map(|entry| first_token(&entry.path().join("cmdline")))
            .any(|token| {
                let matched = executable_name(&token) == Some(name);
                if matched {
                    debug!("Found running {} ({})", name, token);
                }
                matched
            })
    }
}

fn is_pid_dir(name: &str) -> bool {
    !name.is_empty() && name.bytes().all(|b| b.is_ascii_digit())
}

/// First NUL-separated token of a cmdline record
///
/// Kernel threads have an empty cmdline and yield `None`.
fn first_token(path: &Path) -> Option<String> {
    let raw = fs::read(path).ok()?;
    let token = raw.split(|&b| b == 0).next()?;
    if token.is_empty() {
        return None;
    }
    Some(String::from_utf8_lossy(token).into_owned())
}

fn executable_name(token: &str) -> Option<&str> {
    Path::new(token).file_name().and_then(|n| n.to_str())
}
