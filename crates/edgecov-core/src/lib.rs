//! Control-flow edge stream writer.
//!
//! Receives edge events from an instrumentation host and appends them to a
//! line-oriented log. Every stream segment starts with a metadata block and
//! a column header, so a log can be enabled and disabled many times and still
//! parse cleanly.
//!
//! # Example
//!
//! ```ignore
//! use edgecov_core::{Edge, EdgeStreamWriter, Location};
//!
//! let mut writer = EdgeStreamWriter::new("edges.csv", false)?;
//! writer.handle(Edge::new(Location::new(0x1f, 4), Location::new(0x2a0, 2)))?;
//! writer.handle_disable()?;
//! ```

mod config;
mod edge;
mod error;
mod metadata;
mod sink;
mod writer;

pub use config::{Compression, OpenMode, ReenablePolicy, WriterConfig};
pub use edge::{Edge, Location};
pub use error::{Error, Result};
pub use metadata::{
    FORMAT_VERSION, MetadataError, MetadataProvider, MetadataSnapshot, RecordingMetadata,
    is_valid_key,
};
pub use sink::{FileOpener, Sink, TargetOpener};
pub use writer::{COLUMN_HEADER, EdgeConsumer, EdgeStreamWriter, WriterStats};
