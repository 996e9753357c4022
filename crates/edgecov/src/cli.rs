//! CLI definitions and argument types.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use edgecov::{Compression, OpenMode, ReenablePolicy};

/// Exit code for success.
pub const EXIT_SUCCESS: i32 = 0;
/// Exit code for failure.
pub const EXIT_FAILURE: i32 = 1;

#[derive(Parser)]
#[command(name = "edgecov")]
#[command(about = "Control-flow edge coverage recorder")]
#[command(version)]
pub struct Cli {
    /// Show metrics summary after execution
    #[arg(long, global = true)]
    pub metrics: bool,

    /// Enable verbose output (sets RUST_LOG=debug)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress output (only show errors)
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub silent: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Replay an event script into an edge log
    Record {
        /// Event script ("-" for stdin)
        #[arg(value_name = "SCRIPT")]
        script: PathBuf,

        /// Initial output target; without it recording starts disabled
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Do not open the output until the script enables it
        #[arg(long)]
        start_disabled: bool,

        /// Truncate targets on open instead of appending a new segment
        #[arg(long)]
        truncate: bool,

        /// Behavior of `enable` while a stream is already open
        #[arg(long, value_enum, default_value = "reopen")]
        reenable: ReenableArg,

        /// Output compression (auto = zstd for .zst targets)
        #[arg(long, value_enum, default_value = "auto")]
        compression: CompressionArg,

        /// zstd compression level
        #[arg(long, default_value = "3")]
        zstd_level: i32,

        /// Output buffer size in bytes
        #[arg(long, default_value = "65536")]
        buffer_size: usize,

        /// Name of the recorded program, stored in every metadata block
        #[arg(long, default_value = "unknown")]
        recording_target: String,

        /// Extra metadata entry (KEY=VALUE, repeatable)
        #[arg(long = "meta", value_name = "KEY=VALUE", value_parser = parse_meta)]
        meta: Vec<(String, String)>,

        /// Where network diagnostics go
        #[arg(long, value_enum, default_value = "log")]
        diagnostics: DiagnosticsArg,
    },
    /// Summarize the segments of an edge log
    Inspect {
        /// Edge log (plain or .zst)
        #[arg(value_name = "LOG")]
        log: PathBuf,

        /// Print every segment's metadata block
        #[arg(long)]
        metadata: bool,
    },
}

fn parse_meta(text: &str) -> Result<(String, String), String> {
    let (key, value) = text
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{text}'"))?;
    Ok((key.to_string(), value.to_string()))
}

/// Double-enable policy argument.
#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum ReenableArg {
    /// Close the current stream and open the new target
    Reopen,
    /// Fail the recording
    Reject,
}

impl From<ReenableArg> for ReenablePolicy {
    fn from(arg: ReenableArg) -> Self {
        match arg {
            ReenableArg::Reopen => Self::Reopen,
            ReenableArg::Reject => Self::Reject,
        }
    }
}

/// Compression argument.
#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum CompressionArg {
    /// zstd for .zst targets
    Auto,
    /// Plain text
    None,
    /// Always zstd
    Zstd,
}

impl From<CompressionArg> for Compression {
    fn from(arg: CompressionArg) -> Self {
        match arg {
            CompressionArg::Auto => Self::Auto,
            CompressionArg::None => Self::None,
            CompressionArg::Zstd => Self::Zstd,
        }
    }
}

/// Open mode helper for the `--truncate` flag.
pub const fn open_mode(truncate: bool) -> OpenMode {
    if truncate {
        OpenMode::Truncate
    } else {
        OpenMode::Append
    }
}

/// Diagnostic sink argument.
#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum DiagnosticsArg {
    /// Emit as log events
    Log,
    /// Print to stdout
    Stdout,
    /// Discard
    Off,
}
