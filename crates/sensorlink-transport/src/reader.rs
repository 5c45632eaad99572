use std::io::{ErrorKind, Read};

use bytes::BytesMut;
use tracing::warn;

use crate::error::{Result, TransportError};

/// Default cap on a single line. The reference firmware buffers 256 bytes per
/// command and emits much shorter telemetry lines.
pub const DEFAULT_MAX_LINE_LEN: usize = 4 * 1024;

const INITIAL_BUFFER_CAPACITY: usize = 1024;
const READ_CHUNK_SIZE: usize = 256;

/// Splits any `Read` stream into newline-terminated lines.
///
/// Handles partial reads and read timeouts internally: input that has not yet
/// reached a `\n` stays buffered across calls. A trailing `\r` is stripped.
/// Lines longer than the configured cap are dropped up to their terminator.
pub struct LineReader<T> {
    inner: T,
    buf: BytesMut,
    max_line_len: usize,
    discarding: bool,
}

impl<T: Read> LineReader<T> {
    /// Create a line reader with the default line cap.
    pub fn new(inner: T) -> Self {
        Self::with_max_line_len(inner, DEFAULT_MAX_LINE_LEN)
    }

    /// Create a line reader with an explicit line cap.
    pub fn with_max_line_len(inner: T, max_line_len: usize) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            max_line_len,
            discarding: false,
        }
    }

    /// Read the next complete line.
    ///
    /// Returns `Ok(None)` when the underlying read times out before a line is
    /// complete, and `Err(TransportError::Closed)` on EOF.
    pub fn read_line(&mut self) -> Result<Option<String>> {
        loop {
            if let Some(line) = self.take_line() {
                return Ok(Some(line));
            }
            if self.fill_once(READ_CHUNK_SIZE)?.is_none() {
                return Ok(None);
            }
        }
    }

    /// Move up to `available` bytes from the stream into the buffer.
    ///
    /// Meant for a count the stream has already reported as readable, so the
    /// reads do not wait. Stops early if the stream times out.
    pub fn fill_available(&mut self, available: usize) -> Result<()> {
        let mut remaining = available;
        while remaining > 0 {
            match self.fill_once(remaining.min(READ_CHUNK_SIZE))? {
                Some(read) => remaining = remaining.saturating_sub(read),
                None => break,
            }
        }
        Ok(())
    }

    /// Whether a complete line is buffered, so `read_line` returns at once.
    pub fn has_line(&self) -> bool {
        self.buf.contains(&b'\n')
    }

    /// One read of at most `max` bytes. `None` means the read timed out.
    fn fill_once(&mut self, max: usize) -> Result<Option<usize>> {
        let mut chunk = [0u8; READ_CHUNK_SIZE];
        let max = max.min(READ_CHUNK_SIZE);
        let read = loop {
            match self.inner.read(&mut chunk[..max]) {
                Ok(n) => break n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err)
                    if err.kind() == ErrorKind::TimedOut || err.kind() == ErrorKind::WouldBlock =>
                {
                    return Ok(None);
                }
                Err(err) => return Err(TransportError::Io(err)),
            }
        };

        if read == 0 {
            return Err(TransportError::Closed);
        }

        self.buf.extend_from_slice(&chunk[..read]);
        self.settle();
        Ok(Some(read))
    }

    /// Drop oversized lines, including the tail of one cut short earlier, so
    /// that any `\n` left in the buffer ends a line worth returning.
    fn settle(&mut self) {
        loop {
            let newline = self.buf.iter().position(|&b| b == b'\n');
            if self.discarding {
                match newline {
                    Some(pos) => {
                        let _ = self.buf.split_to(pos + 1);
                        self.discarding = false;
                        continue;
                    }
                    None => {
                        self.buf.clear();
                        return;
                    }
                }
            }

            let len = newline.unwrap_or(self.buf.len());
            if len <= self.max_line_len {
                return;
            }
            warn!(len, max = self.max_line_len, "discarding oversized line");
            match newline {
                Some(pos) => {
                    let _ = self.buf.split_to(pos + 1);
                }
                None => {
                    self.buf.clear();
                    self.discarding = true;
                    return;
                }
            }
        }
    }

    fn take_line(&mut self) -> Option<String> {
        self.settle();
        let pos = self.buf.iter().position(|&b| b == b'\n')?;
        let mut line = self.buf.split_to(pos + 1);
        line.truncate(pos);
        if line.ends_with(b"\r") {
            line.truncate(line.len() - 1);
        }
        Some(String::from_utf8_lossy(&line).into_owned())
    }

    /// Number of bytes read from the stream but not yet returned as a line.
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the reader and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }
}
