//! Serial link, request/response exchange, TX pacing and command session
//! for the DV4mini.
//!
//! The protocol is strictly half-duplex: the host writes a frame and, for
//! commands that have one, reads the reply before doing anything else. A
//! [`Session`] owns its [`Link`] and takes `&mut self` on every operation,
//! so two exchanges can never interleave on one link.
//!
//! ## Features
//!
//! - **Exchange**: write, read 6-byte header, read announced body, flush
//! - **Pacing**: TX payloads cut into 34-byte packets at >= 30 ms spacing
//! - **Session**: named commands, observed firmware/RSSI state, raw
//!   passthrough for diagnostics
//! - **Serial**: `serialport`-backed link (feature `serial`)
//!
//! ## Example
//!
//! With the `serial` feature, `Session::open("/dev/ttyACM0", config)` opens
//! the physical port. Any other [`Link`] works the same way:
//!
//! ```rust
//! use dv4mini_session::{MockLink, Session, SessionConfig};
//! use dv4mini_wire::{opcode, Mode, PREAMBLE};
//!
//! # fn main() -> dv4mini_session::Result<()> {
//! let link = MockLink::new();
//! let mut reply = PREAMBLE.to_vec();
//! reply.extend_from_slice(&[opcode::GET_VERSION, 4]);
//! reply.extend_from_slice(b"1.66");
//! link.reply_to(opcode::GET_VERSION, reply);
//!
//! let mut session = Session::new(link, SessionConfig::default())?;
//!
//! let version = session.version()?;
//! assert_eq!(session.state().firmware_version, "1.66");
//! println!("raw reply {:02x?}", version.as_bytes());
//!
//! session.set_mode(Mode::DSTAR)?;
//! session.set_frequency(&[0x19, 0xfc, 0xd3, 0x70], &[0x19, 0xfc, 0xd3, 0x70])?;
//! session.set_power(5)?;
//! session.stream(&[0u8; 100])?;
//!
//! session.close()
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod exchange;
pub mod link;
pub mod mock;
pub mod pacer;
#[cfg(feature = "serial")]
pub mod serial;
pub mod session;

// Re-export main types
pub use error::{DongleError, Result};
pub use exchange::{exchange, exchange_raw, read_response, send, send_raw, ExchangeOptions};
pub use link::{Link, LinkConfig, BAUD_RATE, DEFAULT_READ_TIMEOUT};
pub use mock::{LinkEvent, MockLink};
pub use pacer::{Pacer, TX_CHUNK_SIZE, TX_CHUNK_SIZE_FULL, TX_PACKET_INTERVAL};
#[cfg(feature = "serial")]
pub use serial::SerialLink;
pub use session::{DeviceState, Session, SessionConfig, SEED_LEN, TX_BUFFER_MAX, TX_BUFFER_MIN};
