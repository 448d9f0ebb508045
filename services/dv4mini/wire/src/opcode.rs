//! Canonical opcode table and mode bytes.
//!
//! Opcodes are plain `u8` constants rather than an enum: the dongle accepts
//! values nobody has documented, and the codec must pass them through.

use std::fmt;
use std::str::FromStr;

/// Set TX and RX frequency
pub const SET_FREQUENCY: u8 = 0x01;
/// Set operating mode
pub const SET_MODE: u8 = 0x02;
/// Flush the TX buffer
pub const FLUSH_TX_BUFFER: u8 = 0x03;
/// Write TX data (PTT engages automatically)
pub const WRITE_TX_DATA: u8 = 0x04;
/// Watchdog ping, answered with a watchdog reply
pub const WATCHDOG: u8 = 0x05;
/// Read the RX buffer
pub const READ_RX_BUFFER: u8 = 0x07;
/// Set the green LED
pub const SET_LED: u8 = 0x08;
/// Set TX power
pub const SET_TX_POWER: u8 = 0x09;
/// Captured from the vendor software, semantics unknown
pub const CAPTURED_0B: u8 = 0x0b;
/// Captured from the vendor software, semantics unknown
pub const CAPTURED_0C: u8 = 0x0c;
/// Captured from the vendor software, semantics unknown
pub const CAPTURED_0D: u8 = 0x0d;
/// Captured from the vendor software, semantics unknown
pub const CAPTURED_0E: u8 = 0x0e;
/// Captured from the vendor software, semantics unknown
pub const CAPTURED_0F: u8 = 0x0f;
/// Debug toggle
pub const DEBUG_TOGGLE: u8 = 0x10;
/// Captured from the vendor software, semantics unknown
pub const CAPTURED_11: u8 = 0x11;
/// Captured from the vendor software next to firmware version strings
pub const CAPTURED_12: u8 = 0x12;
/// Captured from the vendor software, semantics unknown
pub const CAPTURED_13: u8 = 0x13;
/// Captured from the vendor software, semantics unknown
pub const CAPTURED_14: u8 = 0x14;
/// Set the scrambler seed
pub const SET_SEED: u8 = 0x17;
/// Get firmware version and dongle identifier
pub const GET_VERSION: u8 = 0x18;
/// Set the TX buffer size (units of 100 ms)
pub const SET_TX_BUFFER_SIZE: u8 = 0x19;

/// Short label for an opcode, used in log lines.
pub fn name(opcode: u8) -> Option<&'static str> {
    let label = match opcode {
        SET_FREQUENCY => "set-frequency",
        SET_MODE => "set-mode",
        FLUSH_TX_BUFFER => "flush-tx",
        WRITE_TX_DATA => "write-tx",
        WATCHDOG => "watchdog",
        READ_RX_BUFFER => "read-rx",
        SET_LED => "set-led",
        SET_TX_POWER => "set-power",
        CAPTURED_0B | CAPTURED_0C | CAPTURED_0D | CAPTURED_0E | CAPTURED_0F => "captured",
        DEBUG_TOGGLE => "debug",
        CAPTURED_11 | CAPTURED_12 | CAPTURED_13 | CAPTURED_14 => "captured",
        SET_SEED => "set-seed",
        GET_VERSION => "version",
        SET_TX_BUFFER_SIZE => "set-tx-buffer",
        _ => return None,
    };
    Some(label)
}

/// TX power level bounds. `set_power` does not enforce them.
pub mod power {
    /// Lowest documented power level
    pub const MIN: u8 = 0;
    /// Highest documented power level
    pub const MAX: u8 = 9;
}

/// Operating mode byte sent with [`SET_MODE`].
///
/// DMR, dPMR and P25 share one byte value; whether the dongle tells them
/// apart elsewhere is not known, so the constants stay aliased.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Mode(pub u8);

impl Mode {
    /// D-STAR
    pub const DSTAR: Mode = Mode(0x44);
    /// C4FM (System Fusion)
    pub const C4FM: Mode = Mode(0x46);
    /// DMR
    pub const DMR: Mode = Mode(0x4d);
    /// dPMR, same byte as DMR
    pub const DPMR: Mode = Mode(0x4d);
    /// P25, same byte as DMR
    pub const P25: Mode = Mode(0x4d);

    /// Raw mode byte
    pub fn byte(self) -> u8 {
        self.0
    }
}

impl From<Mode> for u8 {
    fn from(mode: Mode) -> u8 {
        mode.0
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Mode::DSTAR => write!(f, "dstar"),
            Mode::C4FM => write!(f, "c4fm"),
            Mode::DMR => write!(f, "dmr/dpmr/p25"),
            Mode(other) => write!(f, "{:#04x}", other),
        }
    }
}

impl FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        match lower.as_str() {
            "dstar" | "d-star" => Ok(Mode::DSTAR),
            "c4fm" | "ysf" => Ok(Mode::C4FM),
            "dmr" => Ok(Mode::DMR),
            "dpmr" => Ok(Mode::DPMR),
            "p25" => Ok(Mode::P25),
            other => {
                let parsed = match other.strip_prefix("0x") {
                    Some(hex) => u8::from_str_radix(hex, 16),
                    None => other.parse::<u8>(),
                };
                parsed
                    .map(Mode)
                    .map_err(|_| format!("unknown mode: {}", s))
            }
        }
    }
}
