//! Frame codec, opcode table and checksum for the DV4mini serial protocol.
//!
//! The DV4mini is a USB-to-serial digital-voice modem. Every exchange with it
//! uses one frame layout in both directions:
//!
//! ```text
//! +----------------------+----------------------------+
//! | preamble (4B)        | 71 FE 39 1D                |
//! +----------------------+----------------------------+
//! | opcode (1B)          | command / reply identifier |
//! +----------------------+----------------------------+
//! | len (1B)             | parameter count, 0..=255   |
//! +----------------------+----------------------------+
//! | params               | len bytes                  |
//! +----------------------+----------------------------+
//! ```
//!
//! This crate is pure: no I/O, no clocks. The `dv4mini-session` crate drives
//! it over a serial link.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod checksum;
pub mod error;
pub mod frame;
pub mod opcode;

// Re-export main types
pub use checksum::{checksum, ChecksumWidth, Crc9, CRC9_MASK, CRC9_POLY};
pub use error::WireError;
pub use frame::{
    decode_header, encode, Command, Header, Response, HEADER_SIZE, MAX_PARAMS_LEN, PREAMBLE,
};
pub use opcode::Mode;
