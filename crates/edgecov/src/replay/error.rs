//! Replay error types.

use thiserror::Error;

/// Errors from parsing a single script line.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ScriptError {
    #[error("unknown command '{0}'")]
    UnknownCommand(String),

    #[error("'{command}' expects {expected} argument(s), got {actual}")]
    ArgumentCount {
        command: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("invalid number '{0}'")]
    InvalidNumber(String),

    #[error("invalid packet direction '{0}' (expected in/out)")]
    InvalidDirection(String),

    #[error("invalid hex payload '{0}'")]
    InvalidPayload(String),
}

/// Replay error type.
#[derive(Debug, Error)]
pub enum ReplayError {
    #[error("IO error reading script: {0}")]
    Io(#[from] std::io::Error),

    #[error("script line {line}: {source}")]
    Script {
        line: usize,
        #[source]
        source: ScriptError,
    },

    #[error("script line {line}: {source}")]
    Writer {
        line: usize,
        #[source]
        source: edgecov_core::Error,
    },
}
