//! Command implementations.

mod inspect;
mod record;

use crate::cli::{Cli, Commands};

/// Dispatch CLI command to the appropriate handler.
pub fn run_command(cli: &Cli) -> i32 {
    match &cli.command {
        Commands::Record { .. } => handle_record(cli),
        Commands::Inspect { log, metadata } => inspect::cmd_inspect(log, *metadata),
    }
}

fn handle_record(cli: &Cli) -> i32 {
    let Commands::Record {
        script,
        output,
        start_disabled,
        truncate,
        reenable,
        compression,
        zstd_level,
        buffer_size,
        recording_target,
        meta,
        diagnostics,
    } = &cli.command
    else {
        unreachable!("record command variant mismatch");
    };

    let options = record::RecordOptions {
        output: output.as_deref(),
        start_disabled: *start_disabled,
        truncate: *truncate,
        reenable: *reenable,
        compression: *compression,
        zstd_level: *zstd_level,
        buffer_size: *buffer_size,
        recording_target,
        meta,
        diagnostics: *diagnostics,
    };
    record::cmd_record(script, &options, cli.silent)
}
