//! Frame encoding and header decoding.
//!
//! Requests and responses share one layout. Responses are read in two
//! stages: the fixed [`HEADER_SIZE`] header first, then the number of
//! parameter bytes it announces.

use crate::WireError;
use bytes::{BufMut, Bytes, BytesMut};

/// Marker opening every frame, in both directions
pub const PREAMBLE: [u8; 4] = [0x71, 0xfe, 0x39, 0x1d];

/// Preamble + opcode + length
pub const HEADER_SIZE: usize = 6;

/// Largest parameter block the length byte can describe
pub const MAX_PARAMS_LEN: usize = u8::MAX as usize;

/// A command to the dongle: opcode plus parameter block
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    opcode: u8,
    params: Bytes,
}

impl Command {
    /// Create a command, rejecting parameter blocks over 255 bytes
    pub fn new(opcode: u8, params: impl Into<Bytes>) -> Result<Self, WireError> {
        let params = params.into();
        if params.len() > MAX_PARAMS_LEN {
            return Err(WireError::Length(params.len()));
        }
        Ok(Self { opcode, params })
    }

    /// Command without parameters
    pub fn bare(opcode: u8) -> Self {
        Self {
            opcode,
            params: Bytes::new(),
        }
    }

    /// Opcode byte
    pub fn opcode(&self) -> u8 {
        self.opcode
    }

    /// Parameter block
    pub fn params(&self) -> &[u8] {
        &self.params
    }

    /// Size of the encoded frame
    pub fn encoded_size(&self) -> usize {
        HEADER_SIZE + self.params.len()
    }

    /// Encode to `preamble ∥ opcode ∥ len ∥ params`
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(self.encoded_size());
        buf.put_slice(&PREAMBLE);
        buf.put_u8(self.opcode);
        // Length is bounded by the constructor
        buf.put_u8(self.params.len() as u8);
        buf.put_slice(&self.params);
        buf.freeze()
    }
}

/// Encode an opcode and parameter block into a wire frame.
///
/// The opcode is not checked against the known table.
pub fn encode(opcode: u8, params: &[u8]) -> Result<Bytes, WireError> {
    Command::new(opcode, Bytes::copy_from_slice(params)).map(|cmd| cmd.encode())
}

/// Decoded response header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    /// Opcode byte
    pub opcode: u8,
    /// Number of parameter bytes that follow
    pub len: u8,
}

impl Header {
    /// Extract opcode and body length.
    ///
    /// The preamble is not verified; a header read out of step with the
    /// device yields garbage values.
    pub fn decode(buf: &[u8; HEADER_SIZE]) -> Self {
        Self {
            opcode: buf[4],
            len: buf[5],
        }
    }

    /// Body length as a size
    pub fn body_len(&self) -> usize {
        self.len as usize
    }

    /// Whether the first four bytes match [`PREAMBLE`]
    pub fn has_preamble(buf: &[u8; HEADER_SIZE]) -> bool {
        buf[..PREAMBLE.len()] == PREAMBLE
    }
}

/// Decode a 6-byte header into `(opcode, body_length)`.
pub fn decode_header(buf: &[u8; HEADER_SIZE]) -> (u8, usize) {
    let header = Header::decode(buf);
    (header.opcode, header.body_len())
}

/// A complete response: header and body, contiguous
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    raw: Bytes,
}

impl Response {
    /// Join a header and the body it announced.
    ///
    /// Fails with [`WireError::Length`] if the body does not match the
    /// header's length byte.
    pub fn from_parts(header: [u8; HEADER_SIZE], body: &[u8]) -> Result<Self, WireError> {
        let expected = Header::decode(&header).body_len();
        if body.len() != expected {
            return Err(WireError::Length(body.len()));
        }
        let mut buf = BytesMut::with_capacity(HEADER_SIZE + body.len());
        buf.put_slice(&header);
        buf.put_slice(body);
        Ok(Self { raw: buf.freeze() })
    }

    /// Decoded header
    pub fn header(&self) -> Header {
        Header {
            opcode: self.raw[4],
            len: self.raw[5],
        }
    }

    /// Opcode of the reply
    pub fn opcode(&self) -> u8 {
        self.raw[4]
    }

    /// Parameter bytes after the header
    pub fn params(&self) -> &[u8] {
        &self.raw[HEADER_SIZE..]
    }

    /// Whole response, header included
    pub fn as_bytes(&self) -> &[u8] {
        &self.raw
    }

    /// Total length, always `HEADER_SIZE + header.len`
    pub fn len(&self) -> usize {
        self.raw.len()
    }

    /// A response always carries its header
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Take the raw bytes
    pub fn into_bytes(self) -> Bytes {
        self.raw
    }
}

impl AsRef<[u8]> for Response {
    fn as_ref(&self) -> &[u8] {
        &self.raw
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::opcode;
    use proptest::prelude::*;

    #[test]
    fn test_encode_frequency_frame() {
        let params = [0x19, 0xfc, 0xd3, 0x70, 0x19, 0xfc, 0xd3, 0x70];
        let frame = encode(opcode::SET_FREQUENCY, &params).unwrap();

        assert_eq!(
            frame.as_ref(),
            &[
                0x71, 0xfe, 0x39, 0x1d, 0x01, 0x08, 0x19, 0xfc, 0xd3, 0x70, 0x19, 0xfc, 0xd3,
                0x70
            ]
        );
    }

    #[test]
    fn test_encode_bare_command() {
        let frame = Command::bare(opcode::GET_VERSION).encode();
        assert_eq!(frame.as_ref(), &[0x71, 0xfe, 0x39, 0x1d, 0x18, 0x00]);
    }

    #[test]
    fn test_unknown_opcode_passes_through() {
        let frame = encode(0xee, &[1, 2]).unwrap();
        assert_eq!(frame[4], 0xee);
        assert_eq!(frame[5], 2);
    }

    #[test]
    fn test_encode_max_params() {
        let params = vec![0xaa; MAX_PARAMS_LEN];
        let frame = encode(opcode::WRITE_TX_DATA, &params).unwrap();
        assert_eq!(frame.len(), HEADER_SIZE + 255);
        assert_eq!(frame[5], 0xff);
    }

    #[test]
    fn test_encode_rejects_256_params() {
        let params = vec![0; 256];
        assert_eq!(
            encode(opcode::WRITE_TX_DATA, &params),
            Err(WireError::Length(256))
        );
    }

    #[test]
    fn test_response_from_parts() {
        let header = [0x71, 0xfe, 0x39, 0x1d, 0x05, 0x03];
        let response = Response::from_parts(header, &[1, 2, 3]).unwrap();

        assert_eq!(response.len(), 9);
        assert_eq!(response.opcode(), opcode::WATCHDOG);
        assert_eq!(response.params(), &[1, 2, 3]);
        assert_eq!(response.header().body_len(), 3);
    }

    #[test]
    fn test_response_rejects_short_body() {
        let header = [0x71, 0xfe, 0x39, 0x1d, 0x05, 0x03];
        assert_eq!(
            Response::from_parts(header, &[1, 2]),
            Err(WireError::Length(2))
        );
    }

    #[test]
    fn test_preamble_check() {
        assert!(Header::has_preamble(&[0x71, 0xfe, 0x39, 0x1d, 0, 0]));
        assert!(!Header::has_preamble(&[0x00, 0xfe, 0x39, 0x1d, 0, 0]));
    }

    proptest! {
        #[test]
        fn prop_header_round_trip(
            op in any::<u8>(),
            params in proptest::collection::vec(any::<u8>(), 0..=MAX_PARAMS_LEN),
        ) {
            let frame = encode(op, &params).unwrap();
            let mut header = [0u8; HEADER_SIZE];
            header.copy_from_slice(&frame[..HEADER_SIZE]);

            prop_assert_eq!(decode_header(&header), (op, params.len()));
            prop_assert!(Header::has_preamble(&header));
            prop_assert_eq!(&frame[HEADER_SIZE..], &params[..]);
        }
    }
}
