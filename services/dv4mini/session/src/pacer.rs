//! Paced TX streaming.
//!
//! The dongle drains its TX buffer at a fixed rate and silently drops data
//! written faster than that. Payloads are cut into packets of at most
//! [`TX_CHUNK_SIZE`] bytes and written no closer than [`TX_PACKET_INTERVAL`]
//! apart, then the TX buffer is flushed.

use crate::error::{DongleError, Result};
use crate::exchange::{send, ExchangeOptions};
use crate::link::Link;
use data_encoding::HEXLOWER;
use dv4mini_wire::{opcode, Command, MAX_PARAMS_LEN};
use std::time::Duration;
use tracing::{debug, trace};

/// Per-packet TX capacity used by default
pub const TX_CHUNK_SIZE: usize = 34;

/// Per-packet TX capacity of the full-size protocol variant
pub const TX_CHUNK_SIZE_FULL: usize = 36;

/// Minimum gap before each TX packet
pub const TX_PACKET_INTERVAL: Duration = Duration::from_millis(30);

/// Splits payloads into TX packets and writes them at a fixed cadence
#[derive(Debug, Clone, Copy)]
pub struct Pacer {
    chunk_size: usize,
    interval: Duration,
}

impl Default for Pacer {
    fn default() -> Self {
        Self {
            chunk_size: TX_CHUNK_SIZE,
            interval: TX_PACKET_INTERVAL,
        }
    }
}

impl Pacer {
    /// Pacer with a custom chunk size and interval.
    ///
    /// The interval never drops below [`TX_PACKET_INTERVAL`].
    pub fn new(chunk_size: usize, interval: Duration) -> Result<Self> {
        if chunk_size == 0 || chunk_size > MAX_PARAMS_LEN {
            return Err(DongleError::InvalidArgument(format!(
                "TX chunk size must be 1..={}, got {}",
                MAX_PARAMS_LEN, chunk_size
            )));
        }
        Ok(Self {
            chunk_size,
            interval: interval.max(TX_PACKET_INTERVAL),
        })
    }

    /// Bytes per TX packet
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Gap before each TX packet
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Number of TX packets `len` bytes need
    pub fn packet_count(&self, len: usize) -> usize {
        len.div_ceil(self.chunk_size)
    }

    /// Stream `payload`, then flush the TX buffer.
    ///
    /// Blocks the calling thread for at least `interval` per packet. An
    /// empty payload writes no packets but still flushes.
    pub fn stream<L: Link + ?Sized>(
        &self,
        link: &mut L,
        payload: &[u8],
        options: &ExchangeOptions,
    ) -> Result<()> {
        let total = self.packet_count(payload.len());
        debug!(
            "streaming {} bytes in {} packets of <= {} bytes",
            payload.len(),
            total,
            self.chunk_size
        );

        for (index, chunk) in payload.chunks(self.chunk_size).enumerate() {
            std::thread::sleep(self.interval);
            trace!("[>>>] packet {}/{}: {}", index + 1, total, HEXLOWER.encode(chunk));
            let command = Command::new(opcode::WRITE_TX_DATA, chunk.to_vec())?;
            send(link, &command, options)?;
        }

        send(link, &Command::bare(opcode::FLUSH_TX_BUFFER), options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{LinkEvent, MockLink};
    use std::time::Instant;

    fn options() -> ExchangeOptions {
        ExchangeOptions {
            debug: false,
            read_timeout: Duration::from_millis(5),
        }
    }

    #[test]
    fn test_two_full_chunks_then_flush() {
        let mut link = MockLink::new();
        let payload = vec![0x55; 2 * TX_CHUNK_SIZE];

        Pacer::default().stream(&mut link, &payload, &options()).unwrap();

        assert_eq!(
            link.written_opcodes(),
            vec![opcode::WRITE_TX_DATA, opcode::WRITE_TX_DATA, opcode::FLUSH_TX_BUFFER]
        );
        for frame in &link.writes()[..2] {
            assert_eq!(frame[5] as usize, TX_CHUNK_SIZE);
        }
    }

    #[test]
    fn test_empty_payload_only_flushes() {
        let mut link = MockLink::new();
        Pacer::default().stream(&mut link, &[], &options()).unwrap();
        assert_eq!(link.written_opcodes(), vec![opcode::FLUSH_TX_BUFFER]);
    }

    #[test]
    fn test_last_chunk_is_remainder() {
        let mut link = MockLink::new();
        let payload: Vec<u8> = (0..100u8).collect();

        Pacer::default().stream(&mut link, &payload, &options()).unwrap();

        let writes = link.writes();
        assert_eq!(writes.len(), 4);
        assert_eq!(writes[0][5], 34);
        assert_eq!(writes[1][5], 34);
        assert_eq!(writes[2][5], 32);
        assert_eq!(&writes[2][6..], &payload[68..]);
    }

    #[test]
    fn test_packets_are_paced() {
        let mut link = MockLink::new();
        let started = Instant::now();
        Pacer::default()
            .stream(&mut link, &[0; 3 * TX_CHUNK_SIZE], &options())
            .unwrap();

        let times: Vec<Instant> = link
            .events()
            .into_iter()
            .filter_map(|event| match event {
                LinkEvent::Write(_, at) => Some(at),
                _ => None,
            })
            .collect();

        assert!(times[0].duration_since(started) >= TX_PACKET_INTERVAL);
        for pair in times[..3].windows(2) {
            assert!(pair[1].duration_since(pair[0]) >= TX_PACKET_INTERVAL);
        }
    }

    #[test]
    fn test_interval_floor() {
        let pacer = Pacer::new(TX_CHUNK_SIZE_FULL, Duration::from_millis(1)).unwrap();
        assert_eq!(pacer.interval(), TX_PACKET_INTERVAL);
        assert_eq!(pacer.chunk_size(), 36);
    }

    #[test]
    fn test_rejects_bad_chunk_size() {
        assert!(Pacer::new(0, TX_PACKET_INTERVAL).is_err());
        assert!(Pacer::new(256, TX_PACKET_INTERVAL).is_err());
        assert!(Pacer::new(255, TX_PACKET_INTERVAL).is_ok());
    }

    #[test]
    fn test_packet_count() {
        let pacer = Pacer::default();
        assert_eq!(pacer.packet_count(0), 0);
        assert_eq!(pacer.packet_count(1), 1);
        assert_eq!(pacer.packet_count(68), 2);
        assert_eq!(pacer.packet_count(100), 3);
    }
}
