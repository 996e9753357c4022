//! Edge log parsing.
//!
//! A log is a sequence of segments. Each segment is a metadata block
//! (`key,value` lines), the column header, then data records. Plain and
//! zstd-compressed logs are both accepted.

use std::collections::HashSet;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::OnceLock;

use edgecov_core::{COLUMN_HEADER, Edge, Location, MetadataSnapshot, is_valid_key};
use regex::Regex;
use thiserror::Error;

static RECORD_PATTERN: OnceLock<Regex> = OnceLock::new();

/// Log parsing errors.
#[derive(Debug, Error)]
pub enum SegmentError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("line {line}: data record before any column header")]
    RecordBeforeHeader { line: usize },
    #[error("line {line}: malformed line '{text}'")]
    Malformed { line: usize, text: String },
    #[error("line {line}: metadata block without a column header")]
    MissingHeader { line: usize },
}

/// One enable cycle's worth of output.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Segment {
    /// Metadata block written at open.
    pub metadata: MetadataSnapshot,
    /// Data records in file order.
    pub edges: Vec<Edge>,
}

impl Segment {
    /// Number of distinct edges in this segment.
    #[must_use]
    pub fn unique_edges(&self) -> usize {
        self.edges.iter().collect::<HashSet<_>>().len()
    }
}

/// Parse a data record line.
#[must_use]
pub fn parse_record(line: &str) -> Option<Edge> {
    let pattern = RECORD_PATTERN.get_or_init(|| {
        Regex::new(r"^0x([0-9a-f]+),([0-9]+),0x([0-9a-f]+),([0-9]+)$").unwrap()
    });
    let caps = pattern.captures(line)?;
    let from_addr = u64::from_str_radix(caps.get(1)?.as_str(), 16).ok()?;
    let from_size = caps.get(2)?.as_str().parse().ok()?;
    let to_addr = u64::from_str_radix(caps.get(3)?.as_str(), 16).ok()?;
    let to_size = caps.get(4)?.as_str().parse().ok()?;
    Some(Edge::new(
        Location::new(from_addr, from_size),
        Location::new(to_addr, to_size),
    ))
}

fn parse_metadata_line(line: &str) -> Option<(&str, &str)> {
    let (key, value) = line.split_once(',')?;
    is_valid_key(key).then_some((key, value))
}

enum State {
    /// Collecting metadata lines for the next segment.
    Metadata { start: usize },
    /// Inside a segment's tabular region.
    Records,
}

/// Parse all segments from a reader.
///
/// # Errors
///
/// Returns an error on I/O failure, a line that is neither metadata, header
/// nor record, a record outside a segment, or a trailing metadata block with
/// no header.
pub fn parse_segments<R: BufRead>(reader: R) -> Result<Vec<Segment>, SegmentError> {
    let mut segments: Vec<Segment> = Vec::new();
    let mut pending = MetadataSnapshot::new();
    let mut state = State::Metadata { start: 1 };

    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        let lineno = idx + 1;

        if line == COLUMN_HEADER {
            segments.push(Segment {
                metadata: std::mem::take(&mut pending),
                edges: Vec::new(),
            });
            state = State::Records;
            continue;
        }

        if let Some(edge) = parse_record(&line) {
            match (&state, segments.last_mut()) {
                (State::Records, Some(segment)) => segment.edges.push(edge),
                _ => return Err(SegmentError::RecordBeforeHeader { line: lineno }),
            }
            continue;
        }

        let Some((key, value)) = parse_metadata_line(&line) else {
            return Err(SegmentError::Malformed {
                line: lineno,
                text: line,
            });
        };
        if matches!(state, State::Records) {
            state = State::Metadata { start: lineno };
        }
        pending
            .push(key, value)
            .map_err(|_| SegmentError::Malformed {
                line: lineno,
                text: line.clone(),
            })?;
    }

    match state {
        State::Metadata { start } if !pending.is_empty() => {
            Err(SegmentError::MissingHeader { line: start })
        }
        _ => Ok(segments),
    }
}

/// Leading bytes of every zstd frame.
const ZSTD_MAGIC: [u8; 4] = [0x28, 0xb5, 0x2f, 0xfd];

/// Parse a log file. zstd logs are recognized by their frame magic, not by
/// the file name.
///
/// # Errors
///
/// See [`parse_segments`].
pub fn parse_log_file(path: &Path) -> Result<Vec<Segment>, SegmentError> {
    let mut file = BufReader::new(File::open(path)?);
    if file.fill_buf()?.starts_with(&ZSTD_MAGIC) {
        let decoder = zstd::stream::Decoder::with_buffer(file)?;
        parse_segments(BufReader::new(decoder))
    } else {
        parse_segments(file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> Result<Vec<Segment>, SegmentError> {
        parse_segments(text.as_bytes())
    }

    #[test]
    fn test_parse_record() {
        let edge = parse_record("0x1f,4,0x2a0,2").unwrap();
        assert_eq!(edge, Edge::new(Location::new(0x1f, 4), Location::new(0x2a0, 2)));
        assert!(parse_record("0x1F,4,0x2a0,2").is_none());
        assert!(parse_record("1f,4,0x2a0,2").is_none());
        assert!(parse_record("0x1f,0x4,0x2a0,2").is_none());
    }

    #[test]
    fn test_multiple_segments() {
        let log = "\
tool,edgecov
segment,1
from pc,from size,to pc,to size
0x10,4,0x20,2
0x10,4,0x20,2
tool,edgecov
segment,2
from pc,from size,to pc,to size
0x30,4,0x40,4
";
        let segments = parse(log).unwrap();
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].metadata.get("segment"), Some("1"));
        assert_eq!(segments[0].edges.len(), 2);
        assert_eq!(segments[0].unique_edges(), 1);
        assert_eq!(segments[1].metadata.get("segment"), Some("2"));
        assert_eq!(segments[1].edges[0].to, Location::new(0x40, 4));
    }

    #[test]
    fn test_empty_segment() {
        let segments = parse("tool,edgecov\nfrom pc,from size,to pc,to size\n").unwrap();
        assert_eq!(segments.len(), 1);
        assert!(segments[0].edges.is_empty());
    }

    #[test]
    fn test_record_before_header() {
        let err = parse("tool,edgecov\n0x10,4,0x20,2\n").unwrap_err();
        assert!(matches!(err, SegmentError::RecordBeforeHeader { line: 2 }));
    }

    #[test]
    fn test_malformed_line() {
        let log = "from pc,from size,to pc,to size\n0x10,4,0x20\n";
        let err = parse(log).unwrap_err();
        assert!(matches!(err, SegmentError::Malformed { line: 2, .. }));
    }

    #[test]
    fn test_trailing_metadata_without_header() {
        let log = "from pc,from size,to pc,to size\n0x10,4,0x20,2\ntool,edgecov\n";
        let err = parse(log).unwrap_err();
        assert!(matches!(err, SegmentError::MissingHeader { line: 3 }));
    }

    #[test]
    fn test_empty_log() {
        assert!(parse("").unwrap().is_empty());
    }
}
