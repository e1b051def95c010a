//! Stage tagging for I/O errors crossing the transcode pipeline
//!
//! The tar reader sees the source only through the zstd decoder, and the zstd
//! decoder sees it through a buffered reader, so an `io::Error` surfacing from
//! `tar::Entries` could have been produced by any of the three layers. Each layer
//! is wrapped in [`Tagged`], which marks the errors it originates with its
//! [`Stage`]. Errors already carrying a tag pass through unchanged, so the
//! innermost layer wins.
//!
//! The tar parser reports a stream that stops between records with plain,
//! untagged errors. The decoder layer therefore also records, through an
//! [`EndOfStream`] flag, that it has returned end of stream, so those errors can
//! still be told apart from a malformed archive.

use crate::error::TranscodeError;
use std::cell::Cell;
use std::fmt;
use std::io::{self, Read, Write};
use std::rc::Rc;

/// Pipeline layer an I/O error originated from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Stage {
    /// The raw compressed byte source
    Source,
    /// The zstd decoder
    Decoder,
    /// The ZIP writer
    Output,
}

#[derive(Debug)]
struct StageFault {
    stage: Stage,
    inner: io::Error,
}

impl fmt::Display for StageFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.inner.fmt(f)
    }
}

impl std::error::Error for StageFault {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.inner)
    }
}

fn tag(stage: Stage, err: io::Error) -> io::Error {
    if stage_of(&err).is_some() {
        return err;
    }
    io::Error::new(err.kind(), StageFault { stage, inner: err })
}

/// Stage recorded on an error, `None` if no tagged layer produced it
pub(crate) fn stage_of(err: &io::Error) -> Option<Stage> {
    err.get_ref()?
        .downcast_ref::<StageFault>()
        .map(|fault| fault.stage)
}

/// Set once a watched reader has returned end of stream
///
/// Clones share the flag, so it stays observable after the reader has been moved
/// into a consumer that does not give it back.
#[derive(Debug, Clone, Default)]
pub(crate) struct EndOfStream(Rc<Cell<bool>>);

impl EndOfStream {
    pub(crate) fn reached(&self) -> bool {
        self.0.get()
    }

    fn mark(&self) {
        self.0.set(true);
    }
}

/// Reader/writer adapter that tags the errors of the wrapped value
pub(crate) struct Tagged<T> {
    stage: Stage,
    inner: T,
    eof: Option<EndOfStream>,
}

impl<T> Tagged<T> {
    pub(crate) fn new(stage: Stage, inner: T) -> Self {
        Self {
            stage,
            inner,
            eof: None,
        }
    }

    /// Also record end of stream in `eof`
    pub(crate) fn watching(stage: Stage, inner: T, eof: &EndOfStream) -> Self {
        Self {
            stage,
            inner,
            eof: Some(eof.clone()),
        }
    }
}

impl<R: Read> Read for Tagged<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf).map_err(|e| tag(self.stage, e))?;
        if n == 0
            && !buf.is_empty()
            && let Some(eof) = &self.eof
        {
            eof.mark();
        }
        Ok(n)
    }
}

impl<W: Write> Write for Tagged<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.inner.write(buf).map_err(|e| tag(self.stage, e))
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush().map_err(|e| tag(self.stage, e))
    }
}

/// Map an I/O error from the pipeline onto the transcode error taxonomy
///
/// Any end-of-stream condition is truncation, whichever layer noticed it. A failing
/// source is reported as truncation too: from the archive's point of view the
/// stream stopped early. `after_eof` says whether the decoder had already returned
/// end of stream; an untagged parser error raised after that point is truncation
/// rather than a malformed archive.
pub(crate) fn classify(err: io::Error, entry: Option<&str>, after_eof: bool) -> TranscodeError {
    let entry = entry.map(str::to_owned);
    match (stage_of(&err), err.kind()) {
        (Some(Stage::Output), _) => TranscodeError::OutputWrite {
            entry,
            reason: err.to_string(),
        },
        (Some(Stage::Source), _) => TranscodeError::TruncatedInput {
            entry,
            reason: format!("source read failed: {}", err),
        },
        (_, io::ErrorKind::UnexpectedEof) => TranscodeError::TruncatedInput {
            entry,
            reason: err.to_string(),
        },
        (Some(Stage::Decoder), _) => TranscodeError::Decompression {
            reason: err.to_string(),
        },
        (None, _) if after_eof => TranscodeError::TruncatedInput {
            entry,
            reason: format!("stream ended inside a tar record: {}", err),
        },
        (None, _) => TranscodeError::ArchiveFormat {
            entry,
            reason: err.to_string(),
        },
    }
}
