//! Physical serial port link.

use crate::link::{Link, LinkConfig};
use serialport::{ClearBuffer, DataBits, FlowControl, Parity, SerialPort, StopBits};
use std::io::{self, Read, Write};
use std::time::Duration;
use tracing::{debug, info};

/// [`Link`] over an OS serial port
pub struct SerialLink {
    device: String,
    port: Option<Box<dyn SerialPort>>,
}

impl std::fmt::Debug for SerialLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialLink")
            .field("device", &self.device)
            .field("open", &self.port.is_some())
            .finish()
    }
}

fn data_bits(bits: u8) -> io::Result<DataBits> {
    match bits {
        5 => Ok(DataBits::Five),
        6 => Ok(DataBits::Six),
        7 => Ok(DataBits::Seven),
        8 => Ok(DataBits::Eight),
        other => Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("unsupported data bits: {}", other),
        )),
    }
}

fn stop_bits(bits: u8) -> io::Result<StopBits> {
    match bits {
        1 => Ok(StopBits::One),
        2 => Ok(StopBits::Two),
        other => Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("unsupported stop bits: {}", other),
        )),
    }
}

impl SerialLink {
    /// Open and configure `device`
    pub fn open(device: &str, config: &LinkConfig) -> io::Result<Self> {
        let parity = if config.parity {
            Parity::Even
        } else {
            Parity::None
        };

        let port = serialport::new(device, config.baud_rate)
            .data_bits(data_bits(config.data_bits)?)
            .parity(parity)
            .stop_bits(stop_bits(config.stop_bits)?)
            .flow_control(FlowControl::None)
            .timeout(config.read_timeout)
            .open()
            .map_err(|e| {
                io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("serial device {} not available: {}", device, e),
                )
            })?;

        info!(
            "Opened {} at {} baud, read timeout {:?}",
            device, config.baud_rate, config.read_timeout
        );

        Ok(Self {
            device: device.to_string(),
            port: Some(port),
        })
    }

    /// Path the link was opened on
    pub fn device(&self) -> &str {
        &self.device
    }

    fn port(&mut self) -> io::Result<&mut Box<dyn SerialPort>> {
        self.port
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotConnected, "serial link closed"))
    }
}

impl Link for SerialLink {
    fn write(&mut self, bytes: &[u8]) -> io::Result<()> {
        let port = self.port()?;
        port.write_all(bytes)?;
        port.flush()
    }

    fn read_exact(&mut self, buf: &mut [u8], timeout: Duration) -> io::Result<()> {
        let port = self.port()?;
        if port.timeout() != timeout {
            port.set_timeout(timeout)?;
        }
        Read::read_exact(port, buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.port()?.clear(ClearBuffer::All)?;
        Ok(())
    }

    fn close(&mut self) -> io::Result<()> {
        if self.port.take().is_some() {
            debug!("Closed {}", self.device);
        }
        Ok(())
    }
}
