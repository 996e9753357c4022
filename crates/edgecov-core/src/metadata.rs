//! Recording metadata written at the top of every stream segment.
//!
//! Metadata is serialized as `key,value` lines. Keys are restricted to
//! identifier characters so a metadata line can never be mistaken for the
//! column header or for a data record.

use std::io::{self, Write};
use std::time::{SystemTime, UNIX_EPOCH};

use thiserror::Error;

/// Version of the log layout. Bumped on any change to header or record format.
pub const FORMAT_VERSION: u32 = 1;

/// Metadata validation errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MetadataError {
    #[error("invalid metadata key '{0}': expected [A-Za-z_][A-Za-z0-9_.-]*")]
    InvalidKey(String),
    #[error("metadata value for '{0}' contains a comma or line break")]
    InvalidValue(String),
}

/// Check if `key` is a valid metadata key.
#[must_use]
pub fn is_valid_key(key: &str) -> bool {
    let mut chars = key.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    (first.is_ascii_alphabetic() || first == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
}

fn validate(key: &str, value: &str) -> Result<(), MetadataError> {
    if !is_valid_key(key) {
        return Err(MetadataError::InvalidKey(key.to_string()));
    }
    if value.contains([',', '\n', '\r']) {
        return Err(MetadataError::InvalidValue(key.to_string()));
    }
    Ok(())
}

/// Ordered `key,value` entries captured for one segment.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MetadataSnapshot {
    entries: Vec<(String, String)>,
}

impl MetadataSnapshot {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Append an entry.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is not an identifier or the value holds a
    /// comma or spans more than one line.
    pub fn push(
        &mut self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<(), MetadataError> {
        let (key, value) = (key.into(), value.into());
        validate(&key, &value)?;
        self.entries.push((key, value));
        Ok(())
    }

    /// Entries in insertion order.
    #[must_use]
    pub fn entries(&self) -> &[(String, String)] {
        &self.entries
    }

    /// First value recorded for `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Serialize as `key,value` lines.
    ///
    /// # Errors
    ///
    /// Propagates any write error from `out`.
    pub fn write_to(&self, out: &mut dyn Write) -> io::Result<()> {
        for (key, value) in &self.entries {
            writeln!(out, "{key},{value}")?;
        }
        Ok(())
    }
}

/// Source of the metadata block written on every stream open.
pub trait MetadataProvider {
    /// Write a fresh metadata block to `out`.
    ///
    /// # Errors
    ///
    /// Any error is treated as a fatal header write failure.
    fn write_metadata(&mut self, out: &mut dyn Write) -> io::Result<()>;
}

/// A fixed snapshot, written verbatim on every open.
impl MetadataProvider for MetadataSnapshot {
    fn write_metadata(&mut self, out: &mut dyn Write) -> io::Result<()> {
        self.write_to(out)
    }
}

/// Default provider: format and tool versions, host, recording target,
/// segment number and a wall-clock timestamp taken at each open.
#[derive(Clone, Debug)]
pub struct RecordingMetadata {
    recording_target: String,
    extra: Vec<(String, String)>,
    segments: u64,
}

impl RecordingMetadata {
    /// Create a provider describing `recording_target` (e.g. the guest image).
    ///
    /// # Errors
    ///
    /// Returns an error if the target name contains a comma or line break.
    pub fn new(recording_target: impl Into<String>) -> Result<Self, MetadataError> {
        let recording_target = recording_target.into();
        validate("recording_target", &recording_target)?;
        Ok(Self {
            recording_target,
            extra: Vec::new(),
            segments: 0,
        })
    }

    /// Add a user entry, emitted after the built-in ones.
    ///
    /// # Errors
    ///
    /// Returns an error if the entry is not a valid metadata line.
    pub fn with_entry(
        mut self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<Self, MetadataError> {
        let (key, value) = (key.into(), value.into());
        validate(&key, &value)?;
        self.extra.push((key, value));
        Ok(self)
    }

    /// Number of snapshots taken so far.
    #[must_use]
    pub const fn segments(&self) -> u64 {
        self.segments
    }

    /// Take a snapshot for the next segment.
    pub fn snapshot(&mut self) -> MetadataSnapshot {
        self.segments += 1;
        let timestamp_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |d| d.as_millis());

        let mut entries = vec![
            ("format_version".to_string(), FORMAT_VERSION.to_string()),
            ("tool".to_string(), "edgecov".to_string()),
            ("tool_version".to_string(), env!("CARGO_PKG_VERSION").to_string()),
            ("host_os".to_string(), std::env::consts::OS.to_string()),
            ("host_arch".to_string(), std::env::consts::ARCH.to_string()),
            ("recording_target".to_string(), self.recording_target.clone()),
            ("segment".to_string(), self.segments.to_string()),
            ("timestamp_unix_ms".to_string(), timestamp_ms.to_string()),
        ];
        entries.extend(self.extra.iter().cloned());
        MetadataSnapshot { entries }
    }
}

impl Default for RecordingMetadata {
    fn default() -> Self {
        Self {
            recording_target: "unknown".to_string(),
            extra: Vec::new(),
            segments: 0,
        }
    }
}

impl MetadataProvider for RecordingMetadata {
    fn write_metadata(&mut self, out: &mut dyn Write) -> io::Result<()> {
        self.snapshot().write_to(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_validation() {
        assert!(is_valid_key("tool_version"));
        assert!(is_valid_key("guest.image-name"));
        assert!(!is_valid_key(""));
        assert!(!is_valid_key("0x10"));
        assert!(!is_valid_key("from pc"));
        assert!(!is_valid_key("a,b"));
    }

    #[test]
    fn test_snapshot_rejects_line_breaks() {
        let mut snapshot = MetadataSnapshot::new();
        assert_eq!(
            snapshot.push("note", "two\nlines"),
            Err(MetadataError::InvalidValue("note".to_string()))
        );
        assert!(snapshot.is_empty());
    }

    #[test]
    fn test_snapshot_rejects_commas() {
        let mut snapshot = MetadataSnapshot::new();
        assert_eq!(
            snapshot.push("note", "a,b"),
            Err(MetadataError::InvalidValue("note".to_string()))
        );
        assert!(snapshot.is_empty());

        let err = RecordingMetadata::default()
            .with_entry("note", "x,y")
            .unwrap_err();
        assert_eq!(err, MetadataError::InvalidValue("note".to_string()));
        assert!(RecordingMetadata::new("a,b.elf").is_err());
    }

    #[test]
    fn test_snapshot_serialization() {
        let mut snapshot = MetadataSnapshot::new();
        snapshot.push("tool", "edgecov").unwrap();
        snapshot.push("note", "a b").unwrap();

        let mut out = Vec::new();
        snapshot.write_to(&mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "tool,edgecov\nnote,a b\n");
        assert_eq!(snapshot.get("note"), Some("a b"));
    }

    #[test]
    fn test_recording_metadata_counts_segments() {
        let mut provider = RecordingMetadata::new("guest.elf")
            .unwrap()
            .with_entry("run", "nightly")
            .unwrap();

        let first = provider.snapshot();
        let second = provider.snapshot();
        assert_eq!(first.get("segment"), Some("1"));
        assert_eq!(second.get("segment"), Some("2"));
        assert_eq!(first.get("recording_target"), Some("guest.elf"));
        assert_eq!(first.get("format_version"), Some("1"));
        assert_eq!(first.entries().last().unwrap().0, "run");
        assert!(first.get("timestamp_unix_ms").is_some());
    }

    #[test]
    fn test_recording_metadata_rejects_bad_entry() {
        let err = RecordingMetadata::default()
            .with_entry("bad key", "x")
            .unwrap_err();
        assert_eq!(err, MetadataError::InvalidKey("bad key".to_string()));
    }
}
