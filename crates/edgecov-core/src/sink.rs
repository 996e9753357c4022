//! Output sinks and the openers that create them.
//!
//! A sink is owned by exactly one open stream. `close` flushes (and for zstd,
//! finishes the frame) and reports the error; dropping a sink releases the
//! file without reporting anything.

use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::Path;

use tracing::debug;

use crate::config::{Compression, OpenMode, WriterConfig};

/// An open output stream.
pub trait Sink: Write {
    /// Flush everything and release the underlying resource.
    ///
    /// # Errors
    ///
    /// Returns the first flush or finish error.
    fn close(self: Box<Self>) -> io::Result<()>;
}

/// Creates sinks for stream targets.
pub trait TargetOpener {
    /// Open `target` for writing.
    ///
    /// # Errors
    ///
    /// Returns an error if the target cannot be created or opened.
    fn open(&mut self, target: &str) -> io::Result<Box<dyn Sink>>;
}

/// Opens targets as files, optionally zstd-compressed.
#[derive(Clone, Debug)]
pub struct FileOpener {
    open_mode: OpenMode,
    compression: Compression,
    buffer_capacity: usize,
    zstd_level: i32,
}

impl FileOpener {
    #[must_use]
    pub const fn new(config: &WriterConfig) -> Self {
        Self {
            open_mode: config.open_mode,
            compression: config.compression,
            buffer_capacity: config.buffer_capacity,
            zstd_level: config.zstd_level,
        }
    }
}

impl TargetOpener for FileOpener {
    fn open(&mut self, target: &str) -> io::Result<Box<dyn Sink>> {
        let path = Path::new(target);
        let mut options = OpenOptions::new();
        match self.open_mode {
            OpenMode::Append => options.create(true).append(true),
            OpenMode::Truncate => options.create(true).write(true).truncate(true),
        };
        let file = options.open(path)?;
        let writer = BufWriter::with_capacity(self.buffer_capacity, file);

        if self.compression.applies_to(path) {
            debug!(stream = target, level = self.zstd_level, "opening zstd sink");
            let encoder = zstd::stream::Encoder::new(writer, self.zstd_level)?;
            Ok(Box::new(ZstdSink { encoder }))
        } else {
            debug!(stream = target, "opening file sink");
            Ok(Box::new(FileSink { writer }))
        }
    }
}

struct FileSink {
    writer: BufWriter<File>,
}

impl Write for FileSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.writer.write(buf)
    }

    fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        self.writer.write_all(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}

impl Sink for FileSink {
    fn close(self: Box<Self>) -> io::Result<()> {
        let this = *self;
        let file = this
            .writer
            .into_inner()
            .map_err(io::IntoInnerError::into_error)?;
        drop(file);
        Ok(())
    }
}

/// One zstd frame per open; appended frames form a valid multi-frame stream.
struct ZstdSink {
    encoder: zstd::stream::Encoder<'static, BufWriter<File>>,
}

impl Write for ZstdSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.encoder.write(buf)
    }

    fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        self.encoder.write_all(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.encoder.flush()
    }
}

impl Sink for ZstdSink {
    fn close(self: Box<Self>) -> io::Result<()> {
        let this = *self;
        let mut writer = this.encoder.finish()?;
        writer.flush()
    }
}

#[cfg(test)]
mod tests {
    use std::io::Read;

    use super::*;

    fn opener(open_mode: OpenMode) -> FileOpener {
        FileOpener::new(&WriterConfig::default().with_open_mode(open_mode))
    }

    #[test]
    fn test_append_keeps_existing_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("edges.csv");
        let target = path.to_str().unwrap();
        let mut opener = opener(OpenMode::Append);

        for chunk in ["first\n", "second\n"] {
            let mut sink = opener.open(target).unwrap();
            sink.write_all(chunk.as_bytes()).unwrap();
            sink.close().unwrap();
        }

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "first\nsecond\n");
    }

    #[test]
    fn test_truncate_discards_existing_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("edges.csv");
        std::fs::write(&path, "stale\n").unwrap();

        let mut sink = opener(OpenMode::Truncate).open(path.to_str().unwrap()).unwrap();
        sink.write_all(b"fresh\n").unwrap();
        sink.close().unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "fresh\n");
    }

    #[test]
    fn test_zstd_frames_concatenate() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("edges.csv.zst");
        let target = path.to_str().unwrap();
        let mut opener = opener(OpenMode::Append);

        for chunk in ["a\n", "b\n"] {
            let mut sink = opener.open(target).unwrap();
            sink.write_all(chunk.as_bytes()).unwrap();
            sink.close().unwrap();
        }

        let file = File::open(&path).unwrap();
        let mut decoded = String::new();
        zstd::stream::Decoder::new(file)
            .unwrap()
            .read_to_string(&mut decoded)
            .unwrap();
        assert_eq!(decoded, "a\nb\n");
    }

    #[test]
    fn test_open_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("edges.csv");
        assert!(opener(OpenMode::Append).open(path.to_str().unwrap()).is_err());
    }
}
