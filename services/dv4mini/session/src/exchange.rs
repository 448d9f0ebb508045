//! Request/response exchange over a link.
//!
//! One exchange writes a frame, reads the 6-byte header, reads the body the
//! header announces, then flushes the link so unsolicited device traffic
//! cannot leak into the next exchange. Exclusive access comes from the
//! `&mut` borrow of the link; nothing here is safe to interleave.

use crate::error::Result;
use crate::link::Link;
use data_encoding::HEXLOWER;
use dv4mini_wire::{opcode, Command, Header, Response, HEADER_SIZE};
use std::time::Duration;
use tracing::{debug, trace, warn};

/// Frame logging switch and read bound for one session
#[derive(Debug, Clone, Copy)]
pub struct ExchangeOptions {
    /// Log every frame at debug level
    pub debug: bool,
    /// Bound on each of the two reads
    pub read_timeout: Duration,
}

fn log_frame(options: &ExchangeOptions, direction: &str, bytes: &[u8]) {
    if options.debug {
        debug!(
            "serial.{}: {} (len: {})",
            direction,
            HEXLOWER.encode(bytes),
            bytes.len()
        );
    } else {
        trace!(
            "serial.{}: {} (len: {})",
            direction,
            HEXLOWER.encode(bytes),
            bytes.len()
        );
    }
}

/// Write an already-framed byte sequence
pub fn send_raw<L: Link + ?Sized>(
    link: &mut L,
    frame: &[u8],
    options: &ExchangeOptions,
) -> Result<()> {
    log_frame(options, "write", frame);
    link.write(frame)?;
    Ok(())
}

/// Encode and write a command without waiting for a reply
pub fn send<L: Link + ?Sized>(
    link: &mut L,
    command: &Command,
    options: &ExchangeOptions,
) -> Result<()> {
    trace!(
        "send {} ({:#04x}), {} param bytes",
        opcode::name(command.opcode()).unwrap_or("unknown"),
        command.opcode(),
        command.params().len()
    );
    send_raw(link, &command.encode(), options)
}

fn read_header_and_body<L: Link + ?Sized>(
    link: &mut L,
    options: &ExchangeOptions,
) -> Result<Response> {
    let mut header = [0u8; HEADER_SIZE];
    link.read_exact(&mut header, options.read_timeout)?;
    log_frame(options, "read", &header);

    let decoded = Header::decode(&header);
    if !Header::has_preamble(&header) {
        warn!(
            "reply header without preamble: {}",
            HEXLOWER.encode(&header)
        );
    }

    let mut body = vec![0u8; decoded.body_len()];
    link.read_exact(&mut body, options.read_timeout)?;
    log_frame(options, "read", &body);

    Ok(Response::from_parts(header, &body)?)
}

/// Read one response, then flush the link.
///
/// A failed read still gets a best-effort flush so leftovers of the broken
/// reply do not poison the next exchange.
pub fn read_response<L: Link + ?Sized>(
    link: &mut L,
    options: &ExchangeOptions,
) -> Result<Response> {
    match read_header_and_body(link, options) {
        Ok(response) => {
            link.flush()?;
            Ok(response)
        }
        Err(err) => {
            if let Err(flush_err) = link.flush() {
                debug!("flush after failed read: {}", flush_err);
            }
            Err(err)
        }
    }
}

/// Full request/response cycle for a command
pub fn exchange<L: Link + ?Sized>(
    link: &mut L,
    command: &Command,
    options: &ExchangeOptions,
) -> Result<Response> {
    send(link, command, options)?;
    read_response(link, options)
}

/// Full request/response cycle for an already-framed byte sequence
pub fn exchange_raw<L: Link + ?Sized>(
    link: &mut L,
    frame: &[u8],
    options: &ExchangeOptions,
) -> Result<Response> {
    send_raw(link, frame, options)?;
    read_response(link, options)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DongleError;
    use crate::mock::{LinkEvent, MockLink};
    use dv4mini_wire::PREAMBLE;
    use proptest::prelude::*;

    fn options() -> ExchangeOptions {
        ExchangeOptions {
            debug: true,
            read_timeout: Duration::from_millis(5),
        }
    }

    fn reply(op: u8, params: &[u8]) -> Vec<u8> {
        let mut out = PREAMBLE.to_vec();
        out.push(op);
        out.push(params.len() as u8);
        out.extend_from_slice(params);
        out
    }

    #[test]
    fn test_exchange_every_body_length() {
        for len in 0..=255usize {
            let mut link = MockLink::new();
            let params: Vec<u8> = (0..len).map(|i| i as u8).collect();
            link.reply_to(opcode::READ_RX_BUFFER, reply(opcode::READ_RX_BUFFER, &params));

            let response =
                exchange(&mut link, &Command::bare(opcode::READ_RX_BUFFER), &options()).unwrap();

            assert_eq!(response.len(), HEADER_SIZE + len);
            assert_eq!(response.header().body_len(), len);
            assert_eq!(response.params(), &params[..]);
        }
    }

    #[test]
    fn test_exchange_sequence_on_link() {
        let mut link = MockLink::new();
        link.reply_to(opcode::WATCHDOG, reply(opcode::WATCHDOG, &[0x01, 0x02]));

        exchange(&mut link, &Command::bare(opcode::WATCHDOG), &options()).unwrap();

        let events = link.events();
        assert_eq!(events.len(), 4);
        assert!(matches!(&events[0], LinkEvent::Write(frame, _) if frame[4] == opcode::WATCHDOG));
        assert_eq!(events[1], LinkEvent::Read(HEADER_SIZE));
        assert_eq!(events[2], LinkEvent::Read(2));
        assert_eq!(events[3], LinkEvent::Flush);
    }

    #[test]
    fn test_exchange_discards_trailing_bytes() {
        let mut link = MockLink::new();
        let mut noisy = reply(opcode::GET_VERSION, b"1.66");
        noisy.extend_from_slice(&[0xde, 0xad, 0xbe, 0xef]);
        link.reply_to(opcode::GET_VERSION, noisy);

        let response =
            exchange(&mut link, &Command::bare(opcode::GET_VERSION), &options()).unwrap();
        assert_eq!(response.params(), b"1.66");
        assert_eq!(link.pending_input(), 0);
    }

    #[test]
    fn test_starved_header_is_transport_error() {
        let mut link = MockLink::new();
        link.reply_to(opcode::WATCHDOG, vec![0x71, 0xfe, 0x39]);

        let err = exchange(&mut link, &Command::bare(opcode::WATCHDOG), &options()).unwrap_err();
        assert!(matches!(err, DongleError::Transport(_)));
        assert!(err.is_timeout());
        // No body read was attempted
        assert!(!link.events().contains(&LinkEvent::Read(0)));
    }

    #[test]
    fn test_starved_body_is_transport_error() {
        let mut link = MockLink::new();
        let mut short = reply(opcode::READ_RX_BUFFER, &[0; 10]);
        short.truncate(HEADER_SIZE + 4);
        link.reply_to(opcode::READ_RX_BUFFER, short);

        let err = exchange(&mut link, &Command::bare(opcode::READ_RX_BUFFER), &options())
            .unwrap_err();
        assert!(matches!(err, DongleError::Transport(_)));
    }

    #[test]
    fn test_write_failure_propagates() {
        let mut link = MockLink::new();
        link.fail_writes(true);

        let err = send(&mut link, &Command::bare(opcode::FLUSH_TX_BUFFER), &options()).unwrap_err();
        assert!(matches!(err, DongleError::Transport(_)));
    }

    #[test]
    fn test_send_does_not_read() {
        let mut link = MockLink::new();
        send(&mut link, &Command::new(opcode::SET_LED, vec![0x01]).unwrap(), &options()).unwrap();

        let events = link.events();
        assert_eq!(events.len(), 1);
        assert_eq!(
            link.writes()[0].as_ref(),
            &[0x71, 0xfe, 0x39, 0x1d, 0x08, 0x01, 0x01]
        );
    }

    #[test]
    fn test_exchange_raw_bypasses_codec() {
        let mut link = MockLink::new();
        link.reply_to(opcode::GET_VERSION, reply(opcode::GET_VERSION, b"v"));

        let raw = [0x71, 0xfe, 0x39, 0x1d, 0x18, 0x00];
        let response = exchange_raw(&mut link, &raw, &options()).unwrap();

        assert_eq!(link.writes()[0].as_ref(), &raw);
        assert_eq!(response.as_bytes(), &reply(opcode::GET_VERSION, b"v")[..]);
    }

    proptest! {
        #[test]
        fn prop_exchange_returns_announced_body(
            op in any::<u8>(),
            body in proptest::collection::vec(any::<u8>(), 0..=255usize),
            noise in proptest::collection::vec(any::<u8>(), 0..16usize),
        ) {
            let mut link = MockLink::new();
            let mut bytes = reply(op, &body);
            bytes.extend_from_slice(&noise);
            link.reply_to(op, bytes);

            let response = exchange(&mut link, &Command::bare(op), &options()).unwrap();

            prop_assert_eq!(response.opcode(), op);
            prop_assert_eq!(response.params(), &body[..]);
            prop_assert_eq!(link.pending_input(), 0);
            let events = link.events();
            prop_assert_eq!(events.last(), Some(&LinkEvent::Flush));
        }
    }
}
