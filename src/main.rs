//! pppwatch - cellular PPP link supervisor
//!
//! Watches the PPP address, detects carrier captive-portal interception,
//! re-authenticates as the invoking user and cycles the interface when
//! recovery does not stick. A keyboard LED blinks while recovery runs.

use clap::{Parser, Subcommand};
use pppwatch_core::{error::WatchError, init_logging};
use std::path::PathBuf;

mod bootstrap;
mod cli;
mod daemon;

#[derive(Parser)]
#[command(name = "pppwatch", version)]
#[command(about = "Keeps a captive-portal-intercepted PPP link usable")]
struct Cli {
    /// Configuration file [default: /etc/pppwatch/config.toml or $PPPWATCH_CONFIG]
    #[arg(short, long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Supervise the link until interrupted
    Run(cli::run::RunArgs),
    /// Probe once for interception and print the result
    Probe,
    /// Drive the status LED by hand
    Led(cli::led::LedArgs),
    /// Print the effective configuration
    Config,
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = init_logging(cli.verbose) {
        eprintln!("Failed to initialize logging: {}", e);
        std::process::exit(2);
    }

    let config_path = cli.config.as_deref();
    let result = match cli.command {
        Commands::Run(args) => cli::run::run_watch(config_path, args),
        Commands::Probe => cli::probe::run_probe(config_path),
        Commands::Led(args) => cli::led::run_led(config_path, args),
        Commands::Config => cli::config::run_config(config_path),
    };

    match result {
        Ok(()) => std::process::exit(0),
        Err(e) => {
            let exit_code = match e.downcast_ref::<WatchError>() {
                // Commands, the indicator task and I/O fail at runtime
                Some(watch_error) if !watch_error.is_setup_error() => 1,
                // Configuration, LED device, probe setup and bootstrap failures
                _ => 2,
            };

            eprintln!("Error: {:#}", e);
            std::process::exit(exit_code);
        }
    }
}
