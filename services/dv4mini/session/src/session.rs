//! Command session over one exclusively owned link.
//!
//! Every operation takes `&mut self`, so at most one exchange is in flight
//! on a link. Wrap the session in a `Mutex` to share it across threads.

use crate::error::{DongleError, Result};
use crate::exchange::{self, ExchangeOptions};
use crate::link::{Link, DEFAULT_READ_TIMEOUT};
use crate::pacer::{Pacer, TX_CHUNK_SIZE, TX_PACKET_INTERVAL};
use data_encoding::HEXUPPER;
use dv4mini_wire::{opcode, Command, Mode, Response};
use rand::rngs::OsRng;
use rand::RngCore;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Smallest TX buffer size (100 ms)
pub const TX_BUFFER_MIN: u8 = 1;

/// Largest TX buffer size (1500 ms)
pub const TX_BUFFER_MAX: u8 = 15;

/// Scrambler seed length in bytes
pub const SEED_LEN: usize = 4;

/// Configuration for a dongle session
#[derive(Clone, Debug)]
pub struct SessionConfig {
    /// Log every frame at debug level
    pub debug: bool,
    /// Bound on each response read
    pub read_timeout: Duration,
    /// Bytes per TX packet
    pub tx_chunk_size: usize,
    /// Gap before each TX packet
    pub tx_interval: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            debug: false,
            read_timeout: DEFAULT_READ_TIMEOUT,
            tx_chunk_size: TX_CHUNK_SIZE,
            tx_interval: TX_PACKET_INTERVAL,
        }
    }
}

impl SessionConfig {
    /// Check the settings a session cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.read_timeout.is_zero() {
            return Err(DongleError::InvalidArgument(
                "read timeout must be non-zero".to_string(),
            ));
        }
        Pacer::new(self.tx_chunk_size, self.tx_interval).map(|_| ())
    }
}

/// State observed from the dongle's replies
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DeviceState {
    /// Signal strength, high byte
    pub rssi_msb: u8,
    /// Signal strength, low byte
    pub rssi_lsb: u8,
    /// Signal strength as reported
    pub rssi: i8,
    /// Firmware version string
    pub firmware_version: String,
    /// Dongle identifier, upper-case hex
    pub dongle_id: String,
}

impl DeviceState {
    fn apply_version(&mut self, params: &[u8]) {
        let (version, id) = match params.iter().position(|&b| b == 0) {
            Some(nul) => (&params[..nul], &params[nul + 1..]),
            None => (params, &[][..]),
        };
        self.firmware_version = String::from_utf8_lossy(version).trim().to_string();
        self.dongle_id = HEXUPPER.encode(id);
    }

    fn apply_watchdog(&mut self, params: &[u8]) {
        if let [.., msb, lsb] = *params {
            self.rssi_msb = msb;
            self.rssi_lsb = lsb;
            self.rssi = lsb as i8;
        }
    }
}

/// A session with one dongle
#[derive(Debug)]
pub struct Session<L: Link> {
    link: L,
    options: ExchangeOptions,
    pacer: Pacer,
    state: DeviceState,
    closed: bool,
}

impl<L: Link> Session<L> {
    /// Take ownership of an already open link
    pub fn new(link: L, config: SessionConfig) -> Result<Self> {
        config.validate()?;
        let pacer = Pacer::new(config.tx_chunk_size, config.tx_interval)?;
        Ok(Self {
            link,
            options: ExchangeOptions {
                debug: config.debug,
                read_timeout: config.read_timeout,
            },
            pacer,
            state: DeviceState::default(),
            closed: false,
        })
    }

    /// Observed device state
    pub fn state(&self) -> &DeviceState {
        &self.state
    }

    /// Whether frame logging is on for this session
    pub fn debug(&self) -> bool {
        self.options.debug
    }

    /// TX pacing in use
    pub fn pacer(&self) -> &Pacer {
        &self.pacer
    }

    /// Borrow the link, e.g. to inspect a mock
    pub fn link(&self) -> &L {
        &self.link
    }

    fn send(&mut self, opcode: u8, params: Vec<u8>) -> Result<()> {
        let command = Command::new(opcode, params)?;
        exchange::send(&mut self.link, &command, &self.options)
    }

    fn exchange(&mut self, opcode: u8) -> Result<Response> {
        exchange::exchange(&mut self.link, &Command::bare(opcode), &self.options)
    }

    /// Set TX and RX frequency; the byte layout is the caller's
    pub fn set_frequency(&mut self, tx: &[u8], rx: &[u8]) -> Result<()> {
        let mut params = Vec::with_capacity(tx.len() + rx.len());
        params.extend_from_slice(tx);
        params.extend_from_slice(rx);
        self.send(opcode::SET_FREQUENCY, params)
    }

    /// Set TX power level (documented range 0-9, not enforced)
    pub fn set_power(&mut self, level: u8) -> Result<()> {
        self.send(opcode::SET_TX_POWER, vec![level])
    }

    /// Set operating mode
    pub fn set_mode(&mut self, mode: Mode) -> Result<()> {
        self.send(opcode::SET_MODE, vec![mode.byte()])
    }

    /// Set the TX buffer size in units of 100 ms, 1..=15
    pub fn set_tx_buffer_size(&mut self, size: u8) -> Result<()> {
        if !(TX_BUFFER_MIN..=TX_BUFFER_MAX).contains(&size) {
            return Err(DongleError::InvalidArgument(format!(
                "TX buffer size must be {}..={} (100ms to 1500ms), got {}",
                TX_BUFFER_MIN, TX_BUFFER_MAX, size
            )));
        }
        self.send(opcode::SET_TX_BUFFER_SIZE, vec![size])
    }

    /// Green LED on
    pub fn led_on(&mut self) -> Result<()> {
        self.send(opcode::SET_LED, vec![0x01])
    }

    /// Green LED off
    pub fn led_off(&mut self) -> Result<()> {
        self.send(opcode::SET_LED, vec![0x00])
    }

    /// Send a fresh random scrambler seed drawn from the OS
    pub fn set_initial_seed(&mut self) -> Result<()> {
        self.set_initial_seed_with(&mut OsRng)
    }

    /// Send a scrambler seed drawn from `rng`; nothing is written if it fails
    pub fn set_initial_seed_with<R: RngCore + ?Sized>(&mut self, rng: &mut R) -> Result<()> {
        let mut seed = [0u8; SEED_LEN];
        rng.try_fill_bytes(&mut seed).map_err(DongleError::RandomnessUnavailable)?;
        debug!("scrambler seed {}", HEXUPPER.encode(&seed));
        self.send(opcode::SET_SEED, seed.to_vec())
    }

    /// Flush the dongle's TX buffer
    pub fn flush_tx_buffer(&mut self) -> Result<()> {
        self.send(opcode::FLUSH_TX_BUFFER, Vec::new())
    }

    /// Keep-alive exchange; updates RSSI from the reply
    pub fn watchdog(&mut self) -> Result<Response> {
        let response = self.exchange(opcode::WATCHDOG)?;
        self.state.apply_watchdog(response.params());
        debug!(
            "watchdog reply, rssi {} ({:#04x} {:#04x})",
            self.state.rssi, self.state.rssi_msb, self.state.rssi_lsb
        );
        Ok(response)
    }

    /// Query firmware version and dongle identifier
    pub fn version(&mut self) -> Result<Response> {
        let response = self.exchange(opcode::GET_VERSION)?;
        self.state.apply_version(response.params());
        info!(
            "Dongle firmware {:?}, id {}",
            self.state.firmware_version, self.state.dongle_id
        );
        Ok(response)
    }

    /// Read the dongle's RX buffer
    pub fn read_rx_buffer(&mut self) -> Result<Response> {
        self.exchange(opcode::READ_RX_BUFFER)
    }

    /// Stream TX data at the dongle's drain rate, then flush its TX buffer
    pub fn stream(&mut self, payload: &[u8]) -> Result<()> {
        let pacer = self.pacer;
        pacer.stream(&mut self.link, payload, &self.options)
    }

    /// Encode and send any opcode without waiting for a reply
    pub fn send_command(&mut self, opcode: u8, params: &[u8]) -> Result<()> {
        self.send(opcode, params.to_vec())
    }

    /// Encode any opcode and run a full exchange
    pub fn exchange_command(&mut self, opcode: u8, params: &[u8]) -> Result<Response> {
        let command = Command::new(opcode, params.to_vec())?;
        exchange::exchange(&mut self.link, &command, &self.options)
    }

    /// Write a hand-built frame as is
    pub fn send_raw(&mut self, frame: &[u8]) -> Result<()> {
        exchange::send_raw(&mut self.link, frame, &self.options)
    }

    /// Write a hand-built frame and read the reply
    pub fn exchange_raw(&mut self, frame: &[u8]) -> Result<Response> {
        exchange::exchange_raw(&mut self.link, frame, &self.options)
    }

    /// Read exactly `len` bytes off the link
    pub fn read_raw(&mut self, len: usize) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; len];
        self.link.read_exact(&mut buf, self.options.read_timeout)?;
        Ok(buf)
    }

    /// Discard anything buffered on the link
    pub fn flush_link(&mut self) -> Result<()> {
        self.link.flush()?;
        Ok(())
    }

    /// Flush TX buffer, flush link, close link; every step runs even if an
    /// earlier one fails.
    fn shutdown(&mut self) -> Result<()> {
        self.closed = true;
        let flushed_tx = self.flush_tx_buffer();
        let flushed_link = self.link.flush().map_err(DongleError::from);
        let closed = self.link.close().map_err(DongleError::from);
        flushed_tx.and(flushed_link).and(closed)
    }

    /// Shut the session down and report the first failure
    pub fn close(mut self) -> Result<()> {
        debug!("closing session");
        self.shutdown()
    }
}

#[cfg(feature = "serial")]
impl Session<crate::serial::SerialLink> {
    /// Open `device` at 115200 8N1 and start a session on it
    pub fn open(device: &str, config: SessionConfig) -> Result<Self> {
        config.validate()?;
        let link_config = crate::link::LinkConfig::with_read_timeout(config.read_timeout);
        let link = crate::serial::SerialLink::open(device, &link_config)?;
        Self::new(link, config)
    }
}

impl<L: Link> Drop for Session<L> {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        if let Err(err) = self.shutdown() {
            warn!("session shutdown failed: {}", err);
        }
    }
}
