use std::time::Duration;

use crate::error::Result;

/// A connected, line-oriented duplex stream to a device.
///
/// Implementations are constructed externally (address, baud rate, timeout)
/// and handed to the client already open. The client never issues two reads
/// at once; it does hold the transport across threads, hence `Send`.
pub trait Transport: Send {
    /// Write `bytes` in full and flush.
    fn write(&mut self, bytes: &[u8]) -> Result<()>;

    /// Read one line without its terminator.
    ///
    /// Blocks for at most [`Transport::read_timeout`]. Returns `Ok(None)` when
    /// no complete line arrived in time; partial input stays buffered for the
    /// next call.
    fn read_line(&mut self) -> Result<Option<String>>;

    /// Whether a read would find input, including input already buffered.
    fn bytes_available(&mut self) -> Result<bool>;

    /// Whether a complete line can be read without waiting. A partial line
    /// with no terminator yet does not count.
    fn line_ready(&mut self) -> Result<bool>;

    /// Release the underlying device. Further calls may fail with
    /// [`crate::TransportError::Closed`].
    fn close(&mut self) -> Result<()>;

    /// Upper bound on a single [`Transport::read_line`] call.
    fn read_timeout(&self) -> Duration;

    /// Name for diagnostics, e.g. the device path.
    fn name(&self) -> &str;
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn write(&mut self, bytes: &[u8]) -> Result<()> {
        (**self).write(bytes)
    }

    fn read_line(&mut self) -> Result<Option<String>> {
        (**self).read_line()
    }

    fn bytes_available(&mut self) -> Result<bool> {
        (**self).bytes_available()
    }

    fn line_ready(&mut self) -> Result<bool> {
        (**self).line_ready()
    }

    fn close(&mut self) -> Result<()> {
        (**self).close()
    }

    fn read_timeout(&self) -> Duration {
        (**self).read_timeout()
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}
