//! DV4mini command-line tool.
//!
//! A thin shell over `dv4mini-session`: it loads configuration, opens the
//! dongle, runs one command and closes the session.

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use data_encoding::{HEXLOWER, HEXLOWER_PERMISSIVE};
use dv4mini_session::{Link, Session};
use dv4mini_wire::{checksum, ChecksumWidth, Mode, Response};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod config;
mod logging;

use config::DongleConfig;
use logging::DongleLogFormatter;

/// Control a DV4mini digital-voice modem over its serial link
#[derive(Parser, Debug)]
#[command(name = "dv4mini", version, about = "DV4mini serial protocol driver")]
struct Args {
    /// Configuration file path
    #[arg(long, default_value = "dv4mini.yaml")]
    config: PathBuf,

    /// Serial device, e.g. /dev/ttyACM0
    #[arg(long)]
    device: Option<String>,

    /// Response read timeout, e.g. 250ms
    #[arg(long)]
    read_timeout: Option<humantime::Duration>,

    /// Log every frame written and read
    #[arg(long)]
    debug: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum LedState {
    On,
    Off,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print firmware version and dongle ID
    Version,
    /// Send a watchdog ping and print the reply
    Watchdog,
    /// Read the RX buffer
    Rx,
    /// Set operating mode (dstar, c4fm, dmr, dpmr, p25 or a byte)
    Mode { mode: Mode },
    /// Set TX and RX frequency, each as hex bytes
    Frequency { tx: String, rx: String },
    /// Set TX power level (0-9)
    Power { level: u8 },
    /// Switch the green LED
    Led {
        #[arg(value_enum)]
        state: LedState,
    },
    /// Set TX buffer size in units of 100 ms (1-15)
    TxBuffer { size: u8 },
    /// Send a random scrambler seed
    Seed,
    /// Stream a file's contents as TX data
    Stream { file: PathBuf },
    /// Write a hand-built frame given as hex
    SendRaw { frame: String },
    /// Write a hand-built frame given as hex and print the reply
    ExchangeRaw { frame: String },
    /// Compute the 9-bit checksum of hex data (no device needed)
    Checksum { data: String },
}

fn parse_hex(input: &str) -> anyhow::Result<Vec<u8>> {
    let cleaned: String = input
        .trim()
        .trim_start_matches("0x")
        .chars()
        .filter(|c| !c.is_whitespace() && *c != ':' && *c != ',')
        .collect();
    HEXLOWER_PERMISSIVE
        .decode(cleaned.as_bytes())
        .with_context(|| format!("invalid hex: {}", input))
}

fn print_response(response: &Response) {
    println!(
        "opcode {:#04x}, {} bytes: {}",
        response.opcode(),
        response.params().len(),
        HEXLOWER.encode(response.as_bytes())
    );
}

fn print_checksum(data: &str) -> anyhow::Result<()> {
    let crc = checksum(ChecksumWidth::Bits9, &parse_hex(data)?)?;
    println!("{:#05x}", crc);
    Ok(())
}

#[cfg_attr(not(feature = "serial"), allow(dead_code))]
fn run<L: Link>(
    session: &mut Session<L>,
    command: Command,
    config: &DongleConfig,
) -> anyhow::Result<()> {
    match command {
        Command::Version => {
            let response = session.version()?;
            print_response(&response);
            let state = session.state();
            println!("firmware: {}", state.firmware_version);
            println!("dongle id: {}", state.dongle_id);
        }
        Command::Watchdog => {
            let response = session.watchdog()?;
            print_response(&response);
            println!("rssi: {}", session.state().rssi);
        }
        Command::Rx => print_response(&session.read_rx_buffer()?),
        Command::Mode { mode } => session.set_mode(mode)?,
        Command::Frequency { tx, rx } => {
            session.set_frequency(&parse_hex(&tx)?, &parse_hex(&rx)?)?
        }
        Command::Power { level } => session.set_power(level)?,
        Command::Led { state: LedState::On } => session.led_on()?,
        Command::Led { state: LedState::Off } => session.led_off()?,
        Command::TxBuffer { size } => session.set_tx_buffer_size(size)?,
        Command::Seed => session.set_initial_seed()?,
        Command::Stream { file } => {
            let payload = std::fs::read(&file)
                .with_context(|| format!("failed to read {}", file.display()))?;
            if let Some(mode) = config.mode()? {
                component_info!("tx", "Selecting mode {}", mode);
                session.set_mode(mode)?;
            }
            component_info!("tx", "Streaming {} bytes from {}", payload.len(), file.display());
            session.stream(&payload)?;
        }
        Command::SendRaw { frame } => session.send_raw(&parse_hex(&frame)?)?,
        Command::ExchangeRaw { frame } => {
            print_response(&session.exchange_raw(&parse_hex(&frame)?)?)
        }
        Command::Checksum { data } => print_checksum(&data)?,
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let env_filter = EnvFilter::new("warn")
        .add_directive(format!("dv4mini={}", args.log_level).parse()?)
        .add_directive(format!("dv4mini_session={}", args.log_level).parse()?)
        .add_directive(format!("dv4mini_wire={}", args.log_level).parse()?);

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .event_format(DongleLogFormatter::new("dv4mini"))
        .init();

    if let Command::Checksum { data } = &args.command {
        return print_checksum(data);
    }

    let mut config = DongleConfig::load_from_file(&args.config)?;
    if let Some(device) = args.device {
        config.device = device;
    }
    if let Some(timeout) = args.read_timeout {
        config.read_timeout_ms = timeout.as_millis() as u64;
    }
    config.debug |= args.debug;

    info!("dv4mini v{} on {}", env!("CARGO_PKG_VERSION"), config.device);
    component_debug!("config", "{:?}", config);

    open_and_run(args.command, &config)
}

#[cfg(feature = "serial")]
fn open_and_run(command: Command, config: &DongleConfig) -> anyhow::Result<()> {
    let mut session = Session::open(&config.device, config.session_config())
        .with_context(|| format!("failed to open {}", config.device))?;

    let result = run(&mut session, command, config);
    let closed = session.close();
    if let Err(e) = &closed {
        component_warn!("session", "Close failed: {}", e);
    }
    result?;
    closed?;
    Ok(())
}

#[cfg(not(feature = "serial"))]
fn open_and_run(_command: Command, config: &DongleConfig) -> anyhow::Result<()> {
    config.session_config().validate()?;
    anyhow::bail!("built without serial support; rebuild with `--features serial`")
}

#[cfg(test)]
mod tests {
    use super::*;
    use dv4mini_session::{MockLink, SessionConfig};
    use dv4mini_wire::opcode;

    #[test]
    fn test_parse_hex_variants() {
        assert_eq!(parse_hex("71fe391d").unwrap(), vec![0x71, 0xfe, 0x39, 0x1d]);
        assert_eq!(parse_hex("0x71 FE:39,1d").unwrap(), vec![0x71, 0xfe, 0x39, 0x1d]);
        assert!(parse_hex("7").is_err());
        assert!(parse_hex("zz").is_err());
    }

    #[test]
    fn test_cli_parses_subcommands() {
        let args = Args::try_parse_from(["dv4mini", "--debug", "mode", "c4fm"]).unwrap();
        assert!(args.debug);
        assert!(matches!(args.command, Command::Mode { mode } if mode == Mode::C4FM));

        let args = Args::try_parse_from(["dv4mini", "led", "off"]).unwrap();
        assert!(matches!(args.command, Command::Led { state: LedState::Off }));
    }

    #[test]
    fn test_run_against_mock() {
        let link = MockLink::new();
        let mut session = Session::new(link.clone(), SessionConfig::default()).unwrap();
        let config = DongleConfig::default();

        run(&mut session, Command::Power { level: 3 }, &config).unwrap();
        run(
            &mut session,
            Command::SendRaw {
                frame: "71fe391d0800".to_string(),
            },
            &config,
        )
        .unwrap();
        assert!(run(&mut session, Command::TxBuffer { size: 16 }, &config).is_err());

        assert_eq!(link.written_opcodes(), vec![opcode::SET_TX_POWER, opcode::SET_LED]);
    }

    #[cfg(not(feature = "serial"))]
    #[test]
    fn test_open_without_serial_support() {
        let config = DongleConfig::default();
        let err = open_and_run(Command::Version, &config).unwrap_err();
        assert!(err.to_string().contains("serial support"));

        let config = DongleConfig {
            tx_chunk_size: 0,
            ..DongleConfig::default()
        };
        assert!(open_and_run(Command::Version, &config).is_err());
    }
}
