//! In-memory link for tests and dry runs.
//!
//! A [`MockLink`] behaves like a dongle that answers from a script: when a
//! written frame carries an opcode with a scripted reply, the reply becomes
//! readable. Clones share state, so a test can keep a handle after handing
//! the link to a session.

use crate::link::Link;
use bytes::Bytes;
use std::collections::{HashMap, VecDeque};
use std::io;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

/// Something the link was asked to do
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkEvent {
    /// Bytes written, with the time of the write
    Write(Bytes, Instant),
    /// Read request for this many bytes
    Read(usize),
    /// Buffer flush
    Flush,
    /// Close
    Close,
}

#[derive(Debug, Default)]
struct MockState {
    events: Vec<LinkEvent>,
    input: VecDeque<u8>,
    replies: HashMap<u8, Vec<u8>>,
    fail_writes: bool,
    closed: bool,
}

/// Scripted in-memory [`Link`]
#[derive(Debug, Clone, Default)]
pub struct MockLink {
    state: Arc<Mutex<MockState>>,
}

impl MockLink {
    /// Link with no scripted replies
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Make `reply` readable every time a frame with `opcode` is written
    pub fn reply_to(&self, opcode: u8, reply: impl Into<Vec<u8>>) -> &Self {
        self.lock().replies.insert(opcode, reply.into());
        self
    }

    /// Make bytes readable right away, as if the device sent them unasked
    pub fn inject(&self, bytes: &[u8]) -> &Self {
        self.lock().input.extend(bytes.iter().copied());
        self
    }

    /// Fail every subsequent write with `BrokenPipe`
    pub fn fail_writes(&self, fail: bool) -> &Self {
        self.lock().fail_writes = fail;
        self
    }

    /// Everything the link was asked to do, in order
    pub fn events(&self) -> Vec<LinkEvent> {
        self.lock().events.clone()
    }

    /// Written byte sequences, in order
    pub fn writes(&self) -> Vec<Bytes> {
        self.lock()
            .events
            .iter()
            .filter_map(|event| match event {
                LinkEvent::Write(bytes, _) => Some(bytes.clone()),
                _ => None,
            })
            .collect()
    }

    /// Opcodes of the written frames, in order
    pub fn written_opcodes(&self) -> Vec<u8> {
        self.writes()
            .iter()
            .filter_map(|frame| frame.get(4).copied())
            .collect()
    }

    /// Bytes still waiting to be read
    pub fn pending_input(&self) -> usize {
        self.lock().input.len()
    }

    /// Whether `close` was called
    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }
}

impl Link for MockLink {
    fn write(&mut self, bytes: &[u8]) -> io::Result<()> {
        let mut state = self.lock();
        if state.closed {
            return Err(io::Error::new(io::ErrorKind::NotConnected, "link closed"));
        }
        if state.fail_writes {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "scripted write failure"));
        }
        state
            .events
            .push(LinkEvent::Write(Bytes::copy_from_slice(bytes), Instant::now()));

        if let Some(reply) = bytes.get(4).and_then(|op| state.replies.get(op)).cloned() {
            state.input.extend(reply);
        }
        Ok(())
    }

    fn read_exact(&mut self, buf: &mut [u8], _timeout: Duration) -> io::Result<()> {
        let mut state = self.lock();
        state.events.push(LinkEvent::Read(buf.len()));
        if state.input.len() < buf.len() {
            // Whatever arrived is consumed, the rest never comes
            state.input.clear();
            return Err(io::Error::new(io::ErrorKind::TimedOut, "read timed out"));
        }
        for slot in buf.iter_mut() {
            *slot = state.input.pop_front().unwrap_or_default();
        }
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        let mut state = self.lock();
        state.events.push(LinkEvent::Flush);
        state.input.clear();
        Ok(())
    }

    fn close(&mut self) -> io::Result<()> {
        let mut state = self.lock();
        state.events.push(LinkEvent::Close);
        state.closed = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reply_released_on_write() {
        let mut link = MockLink::new();
        link.reply_to(0x18, vec![1, 2, 3]);

        let mut buf = [0u8; 3];
        assert!(link.read_exact(&mut buf, Duration::from_millis(1)).is_err());

        link.write(&[0x71, 0xfe, 0x39, 0x1d, 0x18, 0x00]).unwrap();
        link.read_exact(&mut buf, Duration::from_millis(1)).unwrap();
        assert_eq!(buf, [1, 2, 3]);
    }

    #[test]
    fn test_short_read_times_out_and_consumes() {
        let mut link = MockLink::new();
        link.inject(&[1, 2, 3]);

        let mut buf = [0u8; 6];
        let err = link.read_exact(&mut buf, Duration::from_millis(1)).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::TimedOut);
        assert_eq!(link.pending_input(), 0);
    }

    #[test]
    fn test_flush_discards_input() {
        let mut link = MockLink::new();
        link.inject(&[9; 10]);
        link.flush().unwrap();
        assert_eq!(link.pending_input(), 0);
        assert_eq!(link.events(), vec![LinkEvent::Flush]);
    }

    #[test]
    fn test_closed_link_rejects_writes() {
        let mut link = MockLink::new();
        link.close().unwrap();
        assert!(link.is_closed());
        assert_eq!(
            link.write(&[0]).unwrap_err().kind(),
            io::ErrorKind::NotConnected
        );
    }
}
