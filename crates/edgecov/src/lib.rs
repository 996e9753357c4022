//! edgecov - control-flow edge coverage recorder
//!
//! Records control-flow edges from an instrumentation host into a segmented,
//! self-describing log, and reads those logs back.
//!
//! # Example
//!
//! ```ignore
//! use edgecov::{EdgeStreamWriter, NullDiagnostics, replay};
//!
//! let mut writer = EdgeStreamWriter::new("edges.csv", true)?;
//! let script = std::io::BufReader::new(std::fs::File::open("run.script")?);
//! let summary = replay(script, &mut writer, &mut NullDiagnostics)?;
//! ```

// Re-export from the core crate
pub use edgecov_core::{
    COLUMN_HEADER, Compression, Edge, EdgeConsumer, EdgeStreamWriter, Error, FORMAT_VERSION,
    FileOpener, Location, MetadataError, MetadataProvider, MetadataSnapshot, OpenMode,
    RecordingMetadata, ReenablePolicy, Result, Sink, TargetOpener, WriterConfig, WriterStats,
};

pub mod diagnostics;
pub mod metrics;
pub mod replay;
pub mod segments;

pub use diagnostics::{
    ConsoleDiagnostics, DiagnosticSink, Direction, LogDiagnostics, NetTransfer, NullDiagnostics,
    Packet,
};
pub use replay::{ReplayError, ReplaySummary, ScriptError, ScriptEvent, replay};
pub use segments::{Segment, SegmentError, parse_log_file, parse_segments};
