//! tt - task tracker CLI
//!
//! Manages tasks, epics and subtasks stored in a data file in the current
//! directory.

use clap::Parser;
use tasktrack::cli::Cli;
use tasktrack::output::{emit_error, OutputOptions};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn main() {
    // Tracing is opt-in via RUST_LOG.
    // Ignore invalid or huge filters so startup never fails on them.
    let filter = std::env::var("RUST_LOG")
        .ok()
        .and_then(|raw| {
            let raw = raw.trim();
            if raw.is_empty() || raw.len() > 4096 {
                return None;
            }
            EnvFilter::try_new(raw).ok()
        })
        .unwrap_or_else(|| EnvFilter::new("off"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let cli = Cli::parse();
    let command = cli.command_name();
    let options = OutputOptions {
        json: cli.json,
        quiet: cli.quiet,
    };
    if let Err(err) = cli.run() {
        let _ = emit_error(options, &command, &err);
        std::process::exit(err.exit_code());
    }
}
