//! In-memory ZIP output archive

use super::stage::{Stage, Tagged};
use crate::config::{OutputCompression, TranscodeConfig};
use crate::error::TranscodeError;
use chrono::{Datelike, Timelike};
use std::collections::HashSet;
use std::io::{Cursor, Write};
use tracing::warn;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Entries at or above this size need ZIP64 extensions
const ZIP64_THRESHOLD: u64 = u32::MAX as u64;

/// Metadata carried from a tar header to the matching ZIP entry
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct EntryMeta {
    pub size: u64,
    pub mtime: Option<u64>,
    pub mode: Option<u32>,
}

impl EntryMeta {
    pub(crate) fn from_header(header: &tar::Header, size: u64) -> Self {
        Self {
            size,
            mtime: header.mtime().ok(),
            mode: header.mode().ok(),
        }
    }
}

/// ZIP archive being assembled in memory
///
/// Owns copies of every name and byte written to it. [`finish`](Self::finish)
/// consumes the archive, so nothing can be added once it is sealed.
pub(crate) struct OutputArchive {
    writer: ZipWriter<Cursor<Vec<u8>>>,
    config: TranscodeConfig,
    names: HashSet<String>,
}

impl OutputArchive {
    pub(crate) fn new(config: &TranscodeConfig) -> Self {
        Self {
            writer: ZipWriter::new(Cursor::new(Vec::new())),
            config: config.clone(),
            names: HashSet::new(),
        }
    }

    /// Open a new entry; subsequent writes through [`entry_writer`](Self::entry_writer) land in it
    pub(crate) fn start_entry(&mut self, name: &str, meta: &EntryMeta) -> Result<(), TranscodeError> {
        if !self.names.insert(name.to_string()) {
            warn!(entry = %name, "duplicate entry name, writing it again");
        }

        let options = self.options_for(meta);
        self.writer
            .start_file(name, options)
            .map_err(|e| TranscodeError::OutputWrite {
                entry: Some(name.to_string()),
                reason: e.to_string(),
            })
    }

    /// Writer for the entry opened last, tagging its errors as output failures
    pub(crate) fn entry_writer(&mut self) -> impl Write + '_ {
        Tagged::new(Stage::Output, &mut self.writer)
    }

    /// Write the central directory and return the archive bytes
    pub(crate) fn finish(mut self) -> Result<Vec<u8>, TranscodeError> {
        self.writer
            .finish()
            .map(Cursor::into_inner)
            .map_err(|e| TranscodeError::OutputWrite {
                entry: None,
                reason: e.to_string(),
            })
    }

    fn options_for(&self, meta: &EntryMeta) -> FileOptions {
        let method = match self.config.compression {
            OutputCompression::Stored => CompressionMethod::Stored,
            OutputCompression::Deflated => CompressionMethod::Deflated,
        };

        let mut options = FileOptions::default()
            .compression_method(method)
            .compression_level(self.config.compression_level)
            .large_file(meta.size >= ZIP64_THRESHOLD)
            .last_modified_time(self.timestamp(meta.mtime));

        if self.config.preserve_permissions
            && let Some(mode) = meta.mode
        {
            options = options.unix_permissions(mode);
        }

        options
    }

    /// ZIP timestamp for an entry, the ZIP epoch when unknown or out of range
    fn timestamp(&self, mtime: Option<u64>) -> zip::DateTime {
        if !self.config.preserve_mtime {
            return zip::DateTime::default();
        }

        mtime
            .and_then(|secs| i64::try_from(secs).ok())
            .and_then(|secs| chrono::DateTime::<chrono::Utc>::from_timestamp(secs, 0))
            .and_then(|at| {
                let year = u16::try_from(at.year()).ok()?;
                zip::DateTime::from_date_and_time(
                    year,
                    at.month() as u8,
                    at.day() as u8,
                    at.hour() as u8,
                    at.minute() as u8,
                    at.second() as u8,
                )
                .ok()
            })
            .unwrap_or_default()
    }
}
