//! Replay host.
//!
//! Drives an [`EdgeConsumer`] and a [`DiagnosticSink`] from a recorded event
//! script, standing in for a live instrumentation host. The first writer
//! error stops the replay.

mod error;
mod script;

pub use error::{ReplayError, ScriptError};
pub use script::{ScriptEvent, parse_number};

use std::io::BufRead;
use std::time::{Duration, Instant};

use edgecov_core::EdgeConsumer;
use tracing::debug;

use crate::diagnostics::DiagnosticSink;

/// Event counts from one replay.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ReplaySummary {
    pub edges: u64,
    pub enables: u64,
    pub disables: u64,
    pub net_transfers: u64,
    pub packets: u64,
    pub elapsed: Duration,
}

/// Replay every event in `reader`.
///
/// # Errors
///
/// Stops at the first unreadable line, unparsable line, or writer error.
pub fn replay<R: BufRead>(
    reader: R,
    consumer: &mut dyn EdgeConsumer,
    diagnostics: &mut dyn DiagnosticSink,
) -> Result<ReplaySummary, ReplayError> {
    let start = Instant::now();
    let mut summary = ReplaySummary::default();

    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        let lineno = idx + 1;
        let event = ScriptEvent::parse(&line)
            .map_err(|source| ReplayError::Script { line: lineno, source })?;
        let Some(event) = event else {
            continue;
        };

        let result = match event {
            ScriptEvent::Enable(target) => {
                debug!(line = lineno, stream = %target, "replay enable");
                summary.enables += 1;
                consumer.on_enable(&target)
            }
            ScriptEvent::Disable => {
                debug!(line = lineno, "replay disable");
                summary.disables += 1;
                consumer.on_disable()
            }
            ScriptEvent::Edge(edge) => {
                summary.edges += 1;
                consumer.on_edge(edge)
            }
            ScriptEvent::NetTransfer(transfer) => {
                summary.net_transfers += 1;
                diagnostics.net_transfer(&transfer);
                Ok(())
            }
            ScriptEvent::Packet(packet) => {
                summary.packets += 1;
                diagnostics.packet(&packet);
                Ok(())
            }
        };
        result.map_err(|source| ReplayError::Writer { line: lineno, source })?;
    }

    summary.elapsed = start.elapsed();
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use edgecov_core::{Edge, Result};

    use super::*;
    use crate::diagnostics::{ConsoleDiagnostics, NullDiagnostics};

    #[derive(Default)]
    struct RecordingConsumer {
        calls: Vec<String>,
        fail_on_edge: bool,
    }

    impl EdgeConsumer for RecordingConsumer {
        fn on_edge(&mut self, edge: Edge) -> Result<()> {
            if self.fail_on_edge {
                return Err(edgecov_core::Error::Write {
                    target: "t".to_string(),
                    source: std::io::Error::other("broken pipe"),
                });
            }
            self.calls.push(format!("edge {edge}"));
            Ok(())
        }

        fn on_enable(&mut self, target: &str) -> Result<()> {
            self.calls.push(format!("enable {target}"));
            Ok(())
        }

        fn on_disable(&mut self) -> Result<()> {
            self.calls.push("disable".to_string());
            Ok(())
        }
    }

    #[test]
    fn test_replay_dispatches_in_order() {
        let script = "\
# warm-up edges before recording starts
edge 0x10 4 0x20 4
enable a.csv
edge 0x1f 4 0x2a0 2
net 1 0x1000 0x2000 16
disable
";
        let mut consumer = RecordingConsumer::default();
        let mut diagnostics = ConsoleDiagnostics::new(Vec::new());
        let summary = replay(script.as_bytes(), &mut consumer, &mut diagnostics).unwrap();

        assert_eq!(
            consumer.calls,
            vec![
                "edge 0x10,4,0x20,4",
                "enable a.csv",
                "edge 0x1f,4,0x2a0,2",
                "disable",
            ]
        );
        assert_eq!(summary.edges, 2);
        assert_eq!(summary.enables, 1);
        assert_eq!(summary.disables, 1);
        assert_eq!(summary.net_transfers, 1);
        let printed = String::from_utf8(diagnostics.into_inner()).unwrap();
        assert!(printed.starts_with("net transfer: src: 0x1000"));
    }

    #[test]
    fn test_replay_stops_on_script_error() {
        let mut consumer = RecordingConsumer::default();
        let err = replay(
            "enable a\nbogus\nedge 1 1 2 2\n".as_bytes(),
            &mut consumer,
            &mut NullDiagnostics,
        )
        .unwrap_err();
        assert!(matches!(err, ReplayError::Script { line: 2, .. }));
        assert_eq!(consumer.calls, vec!["enable a"]);
    }

    #[test]
    fn test_replay_stops_on_writer_error() {
        let mut consumer = RecordingConsumer {
            fail_on_edge: true,
            ..RecordingConsumer::default()
        };
        let err = replay(
            "edge 1 1 2 2\nedge 3 3 4 4\n".as_bytes(),
            &mut consumer,
            &mut NullDiagnostics,
        )
        .unwrap_err();
        assert!(matches!(err, ReplayError::Writer { line: 1, .. }));
    }
}
