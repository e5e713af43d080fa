//! External command execution with optional privilege drop
//!
//! The supervisor runs as root. Interface commands run as-is; the
//! re-authentication command runs as the user who elevated the session,
//! with supplementary groups, group id and user id dropped in the child
//! before exec.

use crate::error::CommandError;
use nix::unistd::{Gid, Uid, User};
use std::future::Future;
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, warn};

/// Target identity for a privilege-dropped command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Credentials {
    pub uid: Uid,
    pub gid: Gid,
}

impl Credentials {
    pub fn new(uid: u32, gid: u32) -> Self {
        Self {
            uid: Uid::from_raw(uid),
            gid: Gid::from_raw(gid),
        }
    }

    /// Credentials of the user who elevated this session, if any
    pub fn from_invoking_user() -> Option<Self> {
        Self::from_env(|key| std::env::var(key).ok())
    }

    /// Resolve the invoking user from session variables
    ///
    /// `sudo` exports both ids. `pkexec` only exports the uid, so the
    /// primary group is looked up in the user database.
    pub fn from_env<F>(lookup: F) -> Option<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let parse = |key: &str| lookup(key).and_then(|v| v.trim().parse::<u32>().ok());

        if let (Some(uid), Some(gid)) = (parse("SUDO_UID"), parse("SUDO_GID")) {
            return Some(Self::new(uid, gid));
        }

        let uid = parse("PKEXEC_UID")?;
        match User::from_uid(Uid::from_raw(uid)) {
            Ok(Some(user)) => Some(Self {
                uid: user.uid,
                gid: user.gid,
            }),
            Ok(None) => {
                warn!(uid, "PKEXEC_UID does not name a known user");
                None
            }
            Err(e) => {
                warn!(uid, error = %e, "Failed to look up PKEXEC_UID");
                None
            }
        }
    }
}

/// Runs external commands to completion
pub trait CommandRunner {
    /// Run `argv`, optionally as `credentials`, and wait for it to exit
    ///
    /// A non-zero exit is an error: callers treat it as fatal.
    fn run(
        &self,
        argv: &[String],
        credentials: Option<Credentials>,
    ) -> impl Future<Output = Result<(), CommandError>> + Send;
}

/// Command runner backed by real child processes
#[derive(Debug, Clone, Copy, Default)]
pub struct Executor;

impl CommandRunner for Executor {
    #[tracing::instrument(skip(self), fields(command = %describe(argv)))]
    async fn run(
        &self,
        argv: &[String],
        credentials: Option<Credentials>,
    ) -> Result<(), CommandError> {
        let (program, args) = argv.split_first().ok_or(CommandError::Empty)?;

        let mut cmd = Command::new(program);
        cmd.args(args).stdin(Stdio::null());

        if let Some(credentials) = credentials {
            drop_privileges(&mut cmd, credentials);
        }

        let status = cmd.status().await.map_err(|e| CommandError::SpawnFailed {
            program: program.clone(),
            reason: e.to_string(),
        })?;

        if status.success() {
            debug!("{} exited successfully", program);
            Ok(())
        } else {
            Err(CommandError::Failed {
                program: program.clone(),
                status: status.to_string(),
            })
        }
    }
}

/// Arrange for the child to run as `credentials`
///
/// Groups go first: once the user id is dropped the process no longer has
/// the privilege to change its groups.
fn drop_privileges(cmd: &mut Command, credentials: Credentials) {
    match User::from_uid(credentials.uid) {
        Ok(Some(user)) => {
            cmd.env("HOME", &user.dir)
                .env("USER", &user.name)
                .env("LOGNAME", &user.name);
        }
        Ok(None) | Err(_) => {
            debug!(uid = %credentials.uid, "No passwd entry, keeping environment");
        }
    }

    let Credentials { uid, gid } = credentials;
    // SAFETY: the closure runs between fork and exec and only issues the
    // setgroups/setgid/setuid syscalls, none of which allocate or lock.
    unsafe {
        cmd.pre_exec(move || {
            nix::unistd::setgroups(&[gid])?;
            nix::unistd::setgid(gid)?;
            nix::unistd::setuid(uid)?;
            Ok(())
        });
    }
}

/// Render a command line for logs
pub fn describe(argv: &[String]) -> String {
    argv.join(" ")
}
