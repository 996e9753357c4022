//! edgecov CLI - control-flow edge coverage recorder

mod cli;
mod commands;
mod terminal;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::Cli;

fn main() {
    let cli = Cli::parse();

    // Initialize metrics recorder if enabled
    let metrics_handle = if cli.metrics {
        edgecov::metrics::CliRecorder::new().install()
    } else {
        None
    };

    // Initialize metric descriptions
    edgecov::metrics::init();

    // RUST_LOG wins over the verbosity flags
    let level = if cli.verbose {
        "debug"
    } else if cli.silent {
        "error"
    } else {
        "info"
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("edgecov={level},edgecov_core={level}")));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let exit_code = commands::run_command(&cli);

    // Print metrics summary if enabled
    if let Some(handle) = metrics_handle {
        handle.print_summary();
    }

    std::process::exit(exit_code);
}
