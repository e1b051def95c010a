//! Streaming tar.zst to ZIP transcoder
//!
//! The source is read strictly forward, once: a zstd decoder turns it into a tar
//! stream, and the tar reader hands out entries one at a time. Each non-directory
//! entry is copied into an in-memory ZIP as it is read, so the decompressed payload
//! never exists in memory as a whole. The ZIP itself does, which makes peak memory
//! proportional to the size of the converted archive.

mod output;
mod stage;


use crate::config::TranscodeConfig;
use crate::error::{Result, TranscodeError};
use bytes::Bytes;
use output::{EntryMeta, OutputArchive};
use serde::Serialize;
use stage::{EndOfStream, Stage, Tagged, classify};
use std::io::{self, BufRead, BufReader, Read};
use tracing::{debug, info};

/// Counters describing one conversion
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TranscodeStats {
    /// ZIP entries written
    pub entries_written: u64,
    /// Directory entries dropped
    pub directories_skipped: u64,
    /// PAX global header records dropped
    pub metadata_skipped: u64,
    /// Uncompressed content bytes copied into the ZIP
    pub bytes_copied: u64,
}

/// A sealed ZIP archive and the statistics of the conversion that produced it
#[derive(Debug, Clone)]
pub struct TranscodeOutput {
    /// ZIP archive bytes
    pub archive: Bytes,
    /// Conversion statistics
    pub stats: TranscodeStats,
}

/// Converts zstd-compressed tar streams into ZIP archives
///
/// Entries are written in archive order under their tar names, verbatim.
/// Directories are dropped, duplicate names are written twice, and no retries or
/// partial results exist: the first failure aborts the conversion and discards
/// everything written so far.
///
/// The output buffer is unbounded. Callers converting large archives should
/// budget memory for the full size of the resulting ZIP.
///
/// # Example
///
/// ```no_run
/// use repackage::transcode::Transcoder;
///
/// # fn example() -> repackage::Result<()> {
/// let source = std::fs::File::open("release.tar.zst")?;
/// let output = Transcoder::default().transcode(source)?;
/// std::fs::write("release.zip", &output.archive)?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct Transcoder {
    config: TranscodeConfig,
}

impl Transcoder {
    /// Create a transcoder with the given output settings
    pub fn new(config: TranscodeConfig) -> Self {
        Self { config }
    }

    /// Output settings in use
    pub fn config(&self) -> &TranscodeConfig {
        &self.config
    }

    /// Convert a tar.zst stream into a ZIP archive
    ///
    /// Takes ownership of `source`; it is dropped when the conversion returns,
    /// whether it succeeded or not.
    ///
    /// # Errors
    ///
    /// - [`TranscodeError::Decompression`] if the input is not zstd
    /// - [`TranscodeError::ArchiveFormat`] if the decompressed bytes are not tar
    /// - [`TranscodeError::TruncatedInput`] if the stream is empty, ends early or fails to read
    /// - [`TranscodeError::OutputWrite`] if an entry cannot be written or the ZIP cannot be sealed
    pub fn transcode<R: Read>(&self, source: R) -> Result<TranscodeOutput> {
        let mut source = BufReader::new(Tagged::new(Stage::Source, source));
        if source.fill_buf().map_err(|e| classify(e, None, false))?.is_empty() {
            return Err(TranscodeError::TruncatedInput {
                entry: None,
                reason: "source stream is empty".to_string(),
            }
            .into());
        }

        let decoder = zstd::stream::read::Decoder::with_buffer(source).map_err(|e| {
            TranscodeError::Decompression {
                reason: e.to_string(),
            }
        })?;
        let eof = EndOfStream::default();
        let mut archive = tar::Archive::new(Tagged::watching(Stage::Decoder, decoder, &eof));

        let mut output = OutputArchive::new(&self.config);
        let mut stats = TranscodeStats::default();
        let mut last_entry: Option<String> = None;

        for entry in archive
            .entries()
            .map_err(|e| classify(e, None, eof.reached()))?
        {
            // Padding of the previous entry and the next header are read here
            let mut entry =
                entry.map_err(|e| classify(e, last_entry.as_deref(), eof.reached()))?;
            let name = String::from_utf8_lossy(&entry.path_bytes()).into_owned();
            last_entry = Some(name.clone());
            let entry_type = entry.header().entry_type();

            if entry_type.is_dir() {
                debug!(entry = %name, "skipping directory");
                stats.directories_skipped += 1;
                continue;
            }
            if entry_type.is_pax_global_extensions() {
                debug!(entry = %name, "skipping PAX global header");
                stats.metadata_skipped += 1;
                continue;
            }

            let declared = entry.size();
            output.start_entry(&name, &EntryMeta::from_header(entry.header(), declared))?;

            let copied = io::copy(&mut entry, &mut output.entry_writer())
                .map_err(|e| classify(e, Some(&name), eof.reached()))?;
            if copied < declared {
                return Err(TranscodeError::TruncatedInput {
                    entry: Some(name),
                    reason: format!(
                        "entry declares {} bytes but the stream ended after {}",
                        declared, copied
                    ),
                }
                .into());
            }

            debug!(entry = %name, bytes = copied, "entry copied");
            stats.entries_written += 1;
            stats.bytes_copied += copied;
        }

        let archive = output.finish()?;

        info!(
            entries = stats.entries_written,
            directories_skipped = stats.directories_skipped,
            bytes_copied = stats.bytes_copied,
            zip_bytes = archive.len(),
            "transcode complete"
        );

        Ok(TranscodeOutput {
            archive: Bytes::from(archive),
            stats,
        })
    }
}
