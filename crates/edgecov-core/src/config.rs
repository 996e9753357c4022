//! Writer configuration.

use std::path::Path;

/// How an existing target file is treated on open.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OpenMode {
    /// Keep existing content; each enable adds a new segment at the end.
    #[default]
    Append,
    /// Discard existing content on every open.
    Truncate,
}

/// Behavior of `handle_enable` while a stream is already open.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ReenablePolicy {
    /// Close the current stream, then open the new target.
    #[default]
    Reopen,
    /// Refuse with `Error::AlreadyEnabled`; the current stream stays open.
    Reject,
}

/// Output compression.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Compression {
    /// zstd for targets ending in `.zst`, plain text otherwise.
    #[default]
    Auto,
    /// Always plain text.
    None,
    /// Always zstd.
    Zstd,
}

impl Compression {
    /// Check if a target path should be zstd-encoded.
    #[must_use]
    pub fn applies_to(self, path: &Path) -> bool {
        match self {
            Self::Auto => path.extension().is_some_and(|ext| ext == "zst"),
            Self::None => false,
            Self::Zstd => true,
        }
    }
}

/// Edge writer configuration.
#[derive(Clone, Debug)]
pub struct WriterConfig {
    /// Construct in the disabled state without touching the target.
    pub start_disabled: bool,
    /// Append to or truncate existing targets.
    pub open_mode: OpenMode,
    /// What to do on enable while already enabled.
    pub reenable: ReenablePolicy,
    /// Capacity of the buffer in front of each file.
    pub buffer_capacity: usize,
    /// Output compression.
    pub compression: Compression,
    /// zstd compression level.
    pub zstd_level: i32,
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            start_disabled: false,
            open_mode: OpenMode::Append,
            reenable: ReenablePolicy::Reopen,
            buffer_capacity: 64 * 1024,
            compression: Compression::Auto,
            zstd_level: 3,
        }
    }
}

impl WriterConfig {
    #[must_use]
    pub const fn with_start_disabled(mut self, start_disabled: bool) -> Self {
        self.start_disabled = start_disabled;
        self
    }

    #[must_use]
    pub const fn with_open_mode(mut self, open_mode: OpenMode) -> Self {
        self.open_mode = open_mode;
        self
    }

    #[must_use]
    pub const fn with_reenable(mut self, reenable: ReenablePolicy) -> Self {
        self.reenable = reenable;
        self
    }

    /// Set the buffer capacity (clamped to at least one byte).
    #[must_use]
    pub fn with_buffer_capacity(mut self, capacity: usize) -> Self {
        self.buffer_capacity = capacity.max(1);
        self
    }

    #[must_use]
    pub const fn with_compression(mut self, compression: Compression) -> Self {
        self.compression = compression;
        self
    }

    #[must_use]
    pub const fn with_zstd_level(mut self, level: i32) -> Self {
        self.zstd_level = level;
        self
    }
}
