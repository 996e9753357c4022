use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

use edgecov::{
    ConsoleDiagnostics, DiagnosticSink, EdgeStreamWriter, FileOpener, LogDiagnostics,
    NullDiagnostics, RecordingMetadata, ReplayError, ReplaySummary, WriterConfig, replay,
};
use tracing::error;

use crate::cli::{
    CompressionArg, DiagnosticsArg, EXIT_FAILURE, EXIT_SUCCESS, ReenableArg, open_mode,
};
use crate::terminal;

/// Combine the replay outcome with the final close. Every failure is logged,
/// including a close error that follows an aborted replay.
fn settle(
    result: Result<ReplaySummary, ReplayError>,
    closed: edgecov::Result<()>,
) -> Option<ReplaySummary> {
    if let Err(e) = &closed {
        error!(%e, "failed to close edge stream");
    }
    match (result, closed) {
        (Ok(summary), Ok(())) => Some(summary),
        (Err(e), _) => {
            error!(%e, "recording aborted");
            terminal::error(&format!("Recording aborted: {e}"));
            None
        }
        (Ok(_), Err(e)) => {
            terminal::error(&e.to_string());
            None
        }
    }
}

/// Options for `edgecov record`.
pub struct RecordOptions<'a> {
    pub output: Option<&'a Path>,
    pub start_disabled: bool,
    pub truncate: bool,
    pub reenable: ReenableArg,
    pub compression: CompressionArg,
    pub zstd_level: i32,
    pub buffer_size: usize,
    pub recording_target: &'a str,
    pub meta: &'a [(String, String)],
    pub diagnostics: DiagnosticsArg,
}

impl RecordOptions<'_> {
    fn writer_config(&self) -> WriterConfig {
        WriterConfig::default()
            .with_start_disabled(self.start_disabled || self.output.is_none())
            .with_open_mode(open_mode(self.truncate))
            .with_reenable(self.reenable.into())
            .with_compression(self.compression.into())
            .with_zstd_level(self.zstd_level)
            .with_buffer_capacity(self.buffer_size)
    }

    fn metadata(&self) -> Result<RecordingMetadata, edgecov::MetadataError> {
        self.meta.iter().try_fold(
            RecordingMetadata::new(self.recording_target)?,
            |metadata, (key, value)| metadata.with_entry(key, value),
        )
    }

    fn diagnostic_sink(&self) -> Box<dyn DiagnosticSink> {
        match self.diagnostics {
            DiagnosticsArg::Log => Box::new(LogDiagnostics),
            DiagnosticsArg::Stdout => Box::new(ConsoleDiagnostics::stdout()),
            DiagnosticsArg::Off => Box::new(NullDiagnostics),
        }
    }
}

fn open_script(script: &Path) -> io::Result<Box<dyn BufRead>> {
    if script.as_os_str() == "-" {
        Ok(Box::new(io::stdin().lock()))
    } else {
        Ok(Box::new(BufReader::new(File::open(script)?)))
    }
}

/// Replay an event script into an edge log.
pub fn cmd_record(script: &Path, options: &RecordOptions<'_>, silent: bool) -> i32 {
    let metadata = match options.metadata() {
        Ok(metadata) => metadata,
        Err(e) => {
            terminal::error(&format!("Invalid metadata: {e}"));
            return EXIT_FAILURE;
        }
    };

    let reader = match open_script(script) {
        Ok(reader) => reader,
        Err(e) => {
            terminal::error(&format!("Cannot read script {}: {e}", script.display()));
            return EXIT_FAILURE;
        }
    };

    let config = options.writer_config();
    let target = options
        .output
        .map(|p| p.to_string_lossy().into_owned())
        .unwrap_or_default();
    let opener = FileOpener::new(&config);
    let mut writer =
        match EdgeStreamWriter::with_parts(&target, config, Box::new(opener), Box::new(metadata)) {
            Ok(writer) => writer,
            Err(e) => {
                error!(%e, "failed to start edge stream");
                terminal::error(&e.to_string());
                return EXIT_FAILURE;
            }
        };

    let mut diagnostics = options.diagnostic_sink();
    let result = replay(reader, &mut writer, diagnostics.as_mut());
    let closed = writer.handle_disable();
    let stats = writer.stats();
    edgecov::metrics::record_writer(&stats);

    let Some(summary) = settle(result, closed) else {
        return EXIT_FAILURE;
    };
    edgecov::metrics::record_replay(&summary);

    if !silent {
        terminal::success(&format!(
            "Recorded {} edges in {} segment(s) ({:.2?})",
            stats.edges_written, stats.segments_opened, summary.elapsed
        ));
        if stats.edges_dropped > 0 {
            terminal::dim(&format!(
                "{} edges dropped while disabled",
                stats.edges_dropped
            ));
        }
        if let Some(output) = options.output {
            terminal::path_output(output);
        }
    }

    EXIT_SUCCESS
}

#[cfg(test)]
mod tests {
    use std::io::{self, Write};
    use std::sync::Arc;
    use std::time::Duration;

    use edgecov::{Error, ScriptError};
    use parking_lot::Mutex;

    use super::*;

    #[derive(Clone, Default)]
    struct LogBuffer(Arc<Mutex<Vec<u8>>>);

    impl Write for LogBuffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn settle_logged(
        result: Result<ReplaySummary, ReplayError>,
        closed: edgecov::Result<()>,
    ) -> (Option<ReplaySummary>, String) {
        let buffer = LogBuffer::default();
        let writer = buffer.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();
        let outcome = tracing::subscriber::with_default(subscriber, || settle(result, closed));
        let logs = String::from_utf8(buffer.0.lock().clone()).unwrap();
        (outcome, logs)
    }

    fn close_error() -> Error {
        Error::Close {
            target: "edges.csv".to_string(),
            source: io::Error::other("disk full"),
        }
    }

    #[test]
    fn test_settle_logs_close_error_after_aborted_replay() {
        let aborted = ReplayError::Script {
            line: 3,
            source: ScriptError::UnknownCommand("jump".to_string()),
        };
        let (outcome, logs) = settle_logged(Err(aborted), Err(close_error()));
        assert!(outcome.is_none());
        assert!(logs.contains("failed to close edge stream"));
        assert!(logs.contains("recording aborted"));
    }

    #[test]
    fn test_settle_success() {
        let summary = ReplaySummary {
            edges: 2,
            enables: 1,
            disables: 1,
            net_transfers: 0,
            packets: 0,
            elapsed: Duration::ZERO,
        };
        let (outcome, logs) = settle_logged(Ok(summary), Ok(()));
        assert_eq!(outcome.map(|s| s.edges), Some(2));
        assert!(logs.is_empty());
    }

    #[test]
    fn test_settle_close_error_alone() {
        let summary = ReplaySummary {
            edges: 0,
            enables: 0,
            disables: 0,
            net_transfers: 0,
            packets: 0,
            elapsed: Duration::ZERO,
        };
        let (outcome, logs) = settle_logged(Ok(summary), Err(close_error()));
        assert!(outcome.is_none());
        assert!(logs.contains("failed to close edge stream"));
        assert!(!logs.contains("recording aborted"));
    }
}
