//! Wire protocol error types.

use crate::checksum::ChecksumWidth;
use thiserror::Error;

/// Wire protocol errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WireError {
    /// Parameter block does not fit the single-byte length field
    #[error("parameter block too long: {0} bytes (max 255)")]
    Length(usize),

    /// Checksum bit count outside 1..=8
    #[error("invalid checksum bit count: {0}")]
    BitCount(u8),

    /// Checksum width declared but without a confirmed generator polynomial
    #[error("{0} checksum is not implemented")]
    Unimplemented(ChecksumWidth),
}
