use std::path::Path;

use edgecov::parse_log_file;

use crate::cli::{EXIT_FAILURE, EXIT_SUCCESS};
use crate::terminal::{self, Alignment, Table};

/// Summarize the segments of an edge log.
pub fn cmd_inspect(log: &Path, show_metadata: bool) -> i32 {
    let segments = match parse_log_file(log) {
        Ok(segments) => segments,
        Err(e) => {
            terminal::error(&format!("Failed to parse {}: {e}", log.display()));
            return EXIT_FAILURE;
        }
    };

    if segments.is_empty() {
        terminal::warning(&format!("{} contains no segments", log.display()));
        return EXIT_SUCCESS;
    }

    let mut table = Table::new(&["segment", "started", "edges", "unique"]).with_alignments(vec![
        Alignment::Right,
        Alignment::Left,
        Alignment::Right,
        Alignment::Right,
    ]);
    for (i, segment) in segments.iter().enumerate() {
        table.add_row(vec![
            (i + 1).to_string(),
            segment
                .metadata
                .get("timestamp_unix_ms")
                .unwrap_or("-")
                .to_string(),
            segment.edges.len().to_string(),
            segment.unique_edges().to_string(),
        ]);
    }
    table.print();

    if show_metadata {
        for (i, segment) in segments.iter().enumerate() {
            terminal::info(&format!("Segment {}", i + 1));
            for (key, value) in segment.metadata.entries() {
                terminal::dim(&format!("{key} = {value}"));
            }
        }
    }

    let total: usize = segments.iter().map(|s| s.edges.len()).sum();
    terminal::success(&format!(
        "{} segment(s), {total} edges",
        segments.len()
    ));
    EXIT_SUCCESS
}
