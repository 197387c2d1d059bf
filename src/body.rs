//! Rewindable raw-body sources and draining.
//!
//! The raw request body arrives either as a caller-supplied source or
//! from the process's standard input stream. Either way the bytes are
//! drained once into a frozen, re-readable buffer so the assembled
//! request can hand out a seekable body even though the underlying
//! source is forward-only.

use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;

use bytes::{Bytes, BytesMut};

/// Read granularity for draining body sources.
pub(crate) const READ_CHUNK: usize = 8192;

/// A rewindable source of raw body bytes.
///
/// `read` returns `None` at end of stream. Implementations never fail:
/// a source that cannot produce bytes behaves as already at end.
pub trait RawBody {
    /// Seek back to the start of the source.
    fn rewind(&mut self);

    /// Whether the source is exhausted.
    fn eof(&self) -> bool;

    /// Read up to `max` bytes; `None` signals end of stream.
    fn read(&mut self, max: usize) -> Option<Vec<u8>>;

    /// Release the underlying handle. Dropping the source does the
    /// same; `close` exists for callers that manage lifetimes
    /// explicitly.
    fn close(&mut self);
}

/// File-backed body source.
///
/// Opening a path that does not exist (or cannot be read) yields the
/// valid "no data" state: `eof` is immediately true, reads signal end,
/// rewind and close are no-ops.
#[derive(Debug)]
pub struct FileReader {
    file: Option<File>,
    eof: bool,
}

impl FileReader {
    pub fn open(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let file = File::open(path).ok();
        if file.is_none() {
            tracing::warn!(path = %path.display(), "body file could not be opened, treating as empty");
        }
        Self {
            eof: file.is_none(),
            file,
        }
    }
}

impl RawBody for FileReader {
    fn rewind(&mut self) {
        if let Some(file) = &mut self.file {
            if file.seek(SeekFrom::Start(0)).is_ok() {
                self.eof = false;
            }
        }
    }

    fn eof(&self) -> bool {
        self.eof
    }

    fn read(&mut self, max: usize) -> Option<Vec<u8>> {
        let file = self.file.as_mut()?;
        let mut buf = vec![0u8; max];
        match file.read(&mut buf) {
            Ok(0) => {
                self.eof = true;
                None
            }
            Ok(n) => {
                buf.truncate(n);
                Some(buf)
            }
            Err(err) => {
                tracing::warn!(error = %err, "body read failed, treating as end of stream");
                self.eof = true;
                None
            }
        }
    }

    fn close(&mut self) {
        self.file = None;
        self.eof = true;
    }
}

/// Drain a source into a frozen, re-readable byte buffer.
pub(crate) fn drain(source: &mut dyn RawBody) -> Bytes {
    source.rewind();
    let mut sink = BytesMut::new();
    while !source.eof() {
        match source.read(READ_CHUNK) {
            Some(chunk) => sink.extend_from_slice(&chunk),
            None => break,
        }
    }
    sink.freeze()
}

/// Drain the process's standard input stream. The stdin lock is held
/// only for the duration of the drain.
pub(crate) fn drain_stdin() -> Bytes {
    let mut sink = BytesMut::new();
    let mut stdin = io::stdin().lock();
    let mut buf = [0u8; READ_CHUNK];
    loop {
        match stdin.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => sink.extend_from_slice(&buf[..n]),
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => {
                tracing::warn!(error = %err, "stdin read failed, truncating body");
                break;
            }
        }
    }
    sink.freeze()
}
