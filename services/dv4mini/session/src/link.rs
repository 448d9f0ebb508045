//! Byte-stream link to the dongle.
//!
//! The session consumes the link through four operations only. Opening and
//! configuring the physical port is the implementor's business.

use std::io;
use std::time::Duration;

/// Fixed serial line rate
pub const BAUD_RATE: u32 = 115_200;

/// Data bits per character
pub const DATA_BITS: u8 = 8;

/// Stop bits per character
pub const STOP_BITS: u8 = 1;

/// Default bound on a single read
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_millis(250);

/// Parameters a link is opened with: 8N1 at 115200 baud
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkConfig {
    /// Line rate
    pub baud_rate: u32,
    /// Data bits
    pub data_bits: u8,
    /// Parity enabled; always `false` for the dongle
    pub parity: bool,
    /// Stop bits
    pub stop_bits: u8,
    /// Read timeout
    pub read_timeout: Duration,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            baud_rate: BAUD_RATE,
            data_bits: DATA_BITS,
            parity: false,
            stop_bits: STOP_BITS,
            read_timeout: DEFAULT_READ_TIMEOUT,
        }
    }
}

impl LinkConfig {
    /// Default line settings with a different read timeout
    pub fn with_read_timeout(read_timeout: Duration) -> Self {
        Self {
            read_timeout,
            ..Self::default()
        }
    }
}

/// Duplex byte stream owned by one session.
///
/// Implementations must report a read that cannot be satisfied within
/// `timeout` as an error of kind [`io::ErrorKind::TimedOut`] (or
/// `UnexpectedEof`), never as a short buffer.
pub trait Link {
    /// Write all of `bytes`
    fn write(&mut self, bytes: &[u8]) -> io::Result<()>;

    /// Fill `buf` completely or fail
    fn read_exact(&mut self, buf: &mut [u8], timeout: Duration) -> io::Result<()>;

    /// Discard anything buffered in either direction
    fn flush(&mut self) -> io::Result<()>;

    /// Release the underlying resource
    fn close(&mut self) -> io::Result<()>;
}

impl<L: Link + ?Sized> Link for Box<L> {
    fn write(&mut self, bytes: &[u8]) -> io::Result<()> {
        (**self).write(bytes)
    }

    fn read_exact(&mut self, buf: &mut [u8], timeout: Duration) -> io::Result<()> {
        (**self).read_exact(buf, timeout)
    }

    fn flush(&mut self) -> io::Result<()> {
        (**self).flush()
    }

    fn close(&mut self) -> io::Result<()> {
        (**self).close()
    }
}
