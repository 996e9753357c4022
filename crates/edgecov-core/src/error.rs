//! Writer error types.
//!
//! Every I/O variant is fatal: the writer drops the affected stream and the
//! host is expected to stop rather than keep recording into a truncated log.

use std::io;

use thiserror::Error;

/// Edge writer error type.
#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to open edge stream '{target}': {source}")]
    Open {
        target: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to write header to '{target}': {source}")]
    Header {
        target: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to append edge to '{target}': {source}")]
    Write {
        target: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to close edge stream '{target}': {source}")]
    Close {
        target: String,
        #[source]
        source: io::Error,
    },

    #[error("edge stream already enabled on '{current}' (requested '{requested}')")]
    AlreadyEnabled { current: String, requested: String },
}

impl Error {
    /// Target the failing operation was working on.
    #[must_use]
    pub fn target(&self) -> &str {
        match self {
            Self::Open { target, .. }
            | Self::Header { target, .. }
            | Self::Write { target, .. }
            | Self::Close { target, .. } => target,
            Self::AlreadyEnabled { requested, .. } => requested,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
