//! Core library for the pppwatch link supervisor
//!
//! This crate provides the interception probe, the interface cycler, the
//! recovery status indicator and the supervisor loop that ties them together.

pub mod error;

pub mod config;
pub mod exec;
pub mod indicator;
pub mod link;
pub mod probe;
pub mod progress;
pub mod supervisor;

/// Initialize logging infrastructure
///
/// Sets up tracing with systemd journal logging when running as a unit.
/// Otherwise logs to stderr with compact formatting.
pub fn init_logging(verbose: bool) -> Result<(), Box<dyn std::error::Error>> {
    use tracing_subscriber::filter::LevelFilter;
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let level = if verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };

    #[cfg(target_os = "linux")]
    {
        if std::env::var("JOURNAL_STREAM").is_ok() {
            let journal_layer = tracing_journald::layer()?;
            tracing_subscriber::registry()
                .with(journal_layer)
                .with(level)
                .init();
            return Ok(());
        }
    }

    // Progress markers own stdout, so diagnostics go to stderr
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .compact()
                .with_writer(std::io::stderr),
        )
        .with(level)
        .init();

    Ok(())
}
