//! The edge stream writer.
//!
//! # Stream lifecycle
//!
//! ```text
//!            enable(target)                    enable(target)
//! Disabled ------------------> Enabled ----------------------> Enabled
//!    ^                           |        (Reopen: close first,   |
//!    |         disable()         |         Reject: error)         |
//!    +---------------------------+--------------------------------+
//! ```
//!
//! Each transition into `Enabled` writes the metadata block followed by
//! [`COLUMN_HEADER`] before any data record. Edges delivered while disabled
//! are dropped.

use std::fmt::Write as _;
use std::io::Write;

use tracing::{debug, error, info, trace, warn};

use crate::config::{ReenablePolicy, WriterConfig};
use crate::edge::Edge;
use crate::error::{Error, Result};
use crate::metadata::{MetadataProvider, RecordingMetadata};
use crate::sink::{FileOpener, Sink, TargetOpener};

/// Column header separating the metadata block from the data records.
pub const COLUMN_HEADER: &str = "from pc,from size,to pc,to size";

/// Host-facing event interface.
///
/// Host adapters translate their own callback registration into these calls.
pub trait EdgeConsumer {
    /// Deliver one observed edge.
    ///
    /// # Errors
    ///
    /// Any error is fatal to the recording.
    fn on_edge(&mut self, edge: Edge) -> Result<()>;

    /// Start (or restart) recording into `target`.
    ///
    /// # Errors
    ///
    /// Any error is fatal to the recording.
    fn on_enable(&mut self, target: &str) -> Result<()>;

    /// Stop recording.
    ///
    /// # Errors
    ///
    /// Any error is fatal to the recording.
    fn on_disable(&mut self) -> Result<()>;
}

/// Counters kept across the writer's lifetime.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct WriterStats {
    /// Data records appended.
    pub edges_written: u64,
    /// Edges delivered while disabled.
    pub edges_dropped: u64,
    /// Successful enables (each one starts a segment).
    pub segments_opened: u64,
    /// Bytes of data records appended (headers excluded).
    pub record_bytes: u64,
}

struct OpenStream {
    target: String,
    sink: Box<dyn Sink>,
}

impl OpenStream {
    fn close(self) -> Result<()> {
        let Self { target, sink } = self;
        match sink.close() {
            Ok(()) => {
                debug!(stream = %target, "edge stream closed");
                Ok(())
            }
            Err(source) => Err(Error::Close { target, source }),
        }
    }
}

enum StreamState {
    Disabled,
    Enabled(OpenStream),
}

/// Stateful writer for control-flow edge logs.
///
/// Calls must be serialized by the host; every operation takes `&mut self`.
pub struct EdgeStreamWriter {
    config: WriterConfig,
    opener: Box<dyn TargetOpener>,
    metadata: Box<dyn MetadataProvider>,
    state: StreamState,
    line: String,
    stats: WriterStats,
}

impl EdgeStreamWriter {
    /// Create a file-backed writer with default configuration.
    ///
    /// Unless `start_disabled` is set, `target` is opened and the header is
    /// written before this returns.
    ///
    /// # Errors
    ///
    /// Returns an open or header error when starting enabled.
    pub fn new(target: &str, start_disabled: bool) -> Result<Self> {
        Self::with_config(target, WriterConfig::default().with_start_disabled(start_disabled))
    }

    /// Create a file-backed writer with the default metadata provider.
    ///
    /// # Errors
    ///
    /// Returns an open or header error when starting enabled.
    pub fn with_config(target: &str, config: WriterConfig) -> Result<Self> {
        let opener = FileOpener::new(&config);
        Self::with_parts(
            target,
            config,
            Box::new(opener),
            Box::new(RecordingMetadata::default()),
        )
    }

    /// Create a writer from explicit parts.
    ///
    /// # Errors
    ///
    /// Returns an open or header error when starting enabled.
    pub fn with_parts(
        target: &str,
        config: WriterConfig,
        opener: Box<dyn TargetOpener>,
        metadata: Box<dyn MetadataProvider>,
    ) -> Result<Self> {
        let start_disabled = config.start_disabled;
        let mut writer = Self {
            config,
            opener,
            metadata,
            state: StreamState::Disabled,
            line: String::with_capacity(64),
            stats: WriterStats::default(),
        };
        if !start_disabled {
            writer.open(target)?;
        }
        Ok(writer)
    }

    /// Append one edge record, or drop it while disabled.
    ///
    /// # Errors
    ///
    /// Returns `Error::Write` if the append fails. The stream is abandoned and
    /// the writer is left disabled.
    pub fn handle(&mut self, edge: Edge) -> Result<()> {
        let StreamState::Enabled(stream) = &mut self.state else {
            self.stats.edges_dropped += 1;
            trace!(%edge, "edge dropped while disabled");
            return Ok(());
        };

        self.line.clear();
        // Formatting into a String cannot fail.
        let _ = writeln!(self.line, "{edge}");

        if let Err(source) = stream.sink.write_all(self.line.as_bytes()) {
            let target = self.abandon();
            return Err(Error::Write { target, source });
        }

        self.stats.edges_written += 1;
        self.stats.record_bytes += self.line.len() as u64;
        Ok(())
    }

    /// Open `target` and write a fresh header.
    ///
    /// If a stream is already open, the configured [`ReenablePolicy`] decides
    /// between closing it first and refusing.
    ///
    /// # Errors
    ///
    /// Returns `Error::AlreadyEnabled` under `ReenablePolicy::Reject`, or any
    /// close, open or header error.
    pub fn handle_enable(&mut self, target: &str) -> Result<()> {
        if let StreamState::Enabled(stream) = &self.state {
            match self.config.reenable {
                ReenablePolicy::Reject => {
                    return Err(Error::AlreadyEnabled {
                        current: stream.target.clone(),
                        requested: target.to_string(),
                    });
                }
                ReenablePolicy::Reopen => {
                    warn!(
                        current = %stream.target,
                        requested = target,
                        "enable while enabled, closing current stream"
                    );
                    self.handle_disable()?;
                }
            }
        }
        self.open(target)
    }

    /// Close the open stream, if any.
    ///
    /// # Errors
    ///
    /// Returns `Error::Close` if the final flush fails. The writer is disabled
    /// either way.
    pub fn handle_disable(&mut self) -> Result<()> {
        match std::mem::replace(&mut self.state, StreamState::Disabled) {
            StreamState::Disabled => Ok(()),
            StreamState::Enabled(stream) => stream.close(),
        }
    }

    /// Check if a stream is open.
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        matches!(self.state, StreamState::Enabled(_))
    }

    /// Target of the open stream.
    #[must_use]
    pub fn current_target(&self) -> Option<&str> {
        match &self.state {
            StreamState::Enabled(stream) => Some(&stream.target),
            StreamState::Disabled => None,
        }
    }

    #[must_use]
    pub const fn stats(&self) -> WriterStats {
        self.stats
    }

    #[must_use]
    pub const fn config(&self) -> &WriterConfig {
        &self.config
    }

    fn open(&mut self, target: &str) -> Result<()> {
        let sink = self.opener.open(target).map_err(|source| Error::Open {
            target: target.to_string(),
            source,
        })?;
        let mut stream = OpenStream {
            target: target.to_string(),
            sink,
        };
        self.write_header(&mut stream)?;

        self.stats.segments_opened += 1;
        info!(stream = target, segment = self.stats.segments_opened, "edge stream enabled");
        self.state = StreamState::Enabled(stream);
        Ok(())
    }

    /// Metadata block, then the column header. Flushed so that a sink that
    /// cannot be written fails at enable time.
    fn write_header(&mut self, stream: &mut OpenStream) -> Result<()> {
        let result = self
            .metadata
            .write_metadata(&mut stream.sink)
            .and_then(|()| writeln!(stream.sink, "{COLUMN_HEADER}"))
            .and_then(|()| stream.sink.flush());
        result.map_err(|source| Error::Header {
            target: stream.target.clone(),
            source,
        })
    }

    /// Drop a broken stream without trying to finish it.
    fn abandon(&mut self) -> String {
        match std::mem::replace(&mut self.state, StreamState::Disabled) {
            StreamState::Enabled(stream) => {
                error!(stream = %stream.target, "abandoning edge stream after write failure");
                stream.target
            }
            StreamState::Disabled => String::new(),
        }
    }
}

impl EdgeConsumer for EdgeStreamWriter {
    fn on_edge(&mut self, edge: Edge) -> Result<()> {
        self.handle(edge)
    }

    fn on_enable(&mut self, target: &str) -> Result<()> {
        self.handle_enable(target)
    }

    fn on_disable(&mut self) -> Result<()> {
        self.handle_disable()
    }
}

impl Drop for EdgeStreamWriter {
    fn drop(&mut self) {
        if let Err(err) = self.handle_disable() {
            error!(%err, "failed to close edge stream on drop");
        }
    }
}
