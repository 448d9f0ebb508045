//! Session error types.

use dv4mini_wire::WireError;
use thiserror::Error;

/// Errors surfaced by dongle operations
#[derive(Error, Debug)]
pub enum DongleError {
    /// Link failed to open, write or read, or a read timed out
    #[error("transport error: {0}")]
    Transport(#[from] std::io::Error),

    /// Parameter outside its documented range
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Parameter block over 255 bytes
    #[error("parameter block too long: {0} bytes (max 255)")]
    InvalidLength(usize),

    /// Entropy source failed
    #[error("randomness unavailable: {0}")]
    RandomnessUnavailable(#[source] rand::Error),

    /// Operation declared by the protocol but not implemented
    #[error("unimplemented: {0}")]
    Unimplemented(String),
}

impl From<WireError> for DongleError {
    fn from(err: WireError) -> Self {
        match err {
            WireError::Length(len) => DongleError::InvalidLength(len),
            WireError::BitCount(_) => DongleError::InvalidArgument(err.to_string()),
            WireError::Unimplemented(_) => DongleError::Unimplemented(err.to_string()),
        }
    }
}

impl DongleError {
    /// Whether the failure was a read timeout
    pub fn is_timeout(&self) -> bool {
        matches!(self, DongleError::Transport(e) if e.kind() == std::io::ErrorKind::TimedOut)
    }
}

/// Result alias for dongle operations
pub type Result<T> = std::result::Result<T, DongleError>;
