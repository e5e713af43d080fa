//! Timestamped progress markers
//!
//! Each phase prints a start marker, one dot per poll while it waits, and a
//! closing `OK` or `FAILED` on the same line:
//!
//! ```text
//! [2025-03-02 14:07:31] Bringing up mobile .... OK
//! ```
//!
//! Markers go to stdout for the operator watching the console; the same
//! events are mirrored to `tracing` for the journal.

use chrono::Local;
use colored::Colorize;
use std::io::{self, Write};
use tracing::{info, warn};

fn timestamp() -> String {
    Local::now().format("[%Y-%m-%d %H:%M:%S]").to_string()
}

/// Print a standalone timestamped line
pub fn mark(message: &str) {
    mark_to(&mut io::stdout(), message);
}

/// Print a standalone timestamped line to `writer`
pub fn mark_to<W: Write>(writer: &mut W, message: &str) {
    let _ = writeln!(writer, "{} {}", timestamp(), message);
    let _ = writer.flush();
    info!("{}", message);
}

/// An in-progress phase on the console
pub struct Progress<W: Write = io::Stdout> {
    writer: W,
    label: String,
    pings: u32,
}

impl Progress {
    /// Start a phase on stdout
    pub fn start(label: impl Into<String>) -> Self {
        Self::with_writer(io::stdout(), label)
    }
}

impl<W: Write> Progress<W> {
    /// Start a phase on an arbitrary writer
    pub fn with_writer(mut writer: W, label: impl Into<String>) -> Self {
        let label = label.into();
        let _ = write!(writer, "{} {} ", timestamp(), label);
        let _ = writer.flush();
        info!("{}", label);
        Self {
            writer,
            label,
            pings: 0,
        }
    }

    /// One poll elapsed without the phase completing
    pub fn ping(&mut self) {
        self.pings += 1;
        let _ = write!(self.writer, ".");
        let _ = self.writer.flush();
    }

    /// Number of dots printed so far
    pub fn pings(&self) -> u32 {
        self.pings
    }

    pub fn done(self) {
        self.finish(&"OK".green().to_string(), None);
    }

    /// Complete the phase, appending a detail such as the acquired address
    pub fn done_with(self, detail: &str) {
        self.finish(&"OK".green().to_string(), Some(detail));
    }

    pub fn fail(mut self) {
        let _ = writeln!(self.writer, " {}", "FAILED".red().bold());
        let _ = self.writer.flush();
        warn!(pings = self.pings, "{}: FAILED", self.label);
    }

    fn finish(mut self, tag: &str, detail: Option<&str>) {
        match detail {
            Some(detail) => {
                let _ = writeln!(self.writer, " {} ({})", tag, detail);
            }
            None => {
                let _ = writeln!(self.writer, " {}", tag);
            }
        }
        let _ = self.writer.flush();
        info!(pings = self.pings, "{}: OK", self.label);
    }
}
