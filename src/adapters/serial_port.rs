//! Serial port adapter using the `serialport` crate
//!
//! Implements `TransportFactory` and `Transport`.
//! `SerialPortFactory` has no instance data; it only knows how to open a
//! port from a DeviceConfig and hand back a boxed transport.

use std::io::{ErrorKind, Read, Write};
use std::time::Duration;

use crate::domain::{AotfError, AotfResult, DeviceConfig};
use crate::ports::{Transport, TransportFactory};

/// Per-call read timeout. `Transport::read_until` loops on top of this
/// until the configured reply deadline.
const READ_POLL_MS: u64 = 100;

/// Zero-sized factory for serial port transports.
pub struct SerialPortFactory;

impl TransportFactory for SerialPortFactory {
    fn open(config: &DeviceConfig) -> AotfResult<Box<dyn Transport>> {
        let port_name = config
            .port
            .as_deref()
            .ok_or_else(|| AotfError::Config("no serial port configured".into()))?;

        let port = serialport::new(port_name, config.baud_rate)
            .timeout(Duration::from_millis(READ_POLL_MS))
            .open()
            .map_err(|e| {
                log::error!(
                    "Could not connect to AOTF on {port_name}: {e}. \
                     Is the device plugged in? Is another program using it?"
                );
                std::io::Error::from(e)
            })?;

        let mut transport = SerialPortTransport { port };
        transport.reset_input_buffer()?;
        transport.reset_output_buffer()?;

        log::info!("Opened AOTF on {port_name} at {} baud", config.baud_rate);
        Ok(Box::new(transport))
    }
}

/// An open serial port wrapping the `serialport` crate.
pub struct SerialPortTransport {
    port: Box<dyn serialport::SerialPort>,
}

impl Transport for SerialPortTransport {
    fn write(&mut self, data: &[u8]) -> AotfResult<()> {
        self.port.write_all(data)?;
        self.port.flush()?;
        Ok(())
    }

    fn read(&mut self, buffer: &mut [u8]) -> AotfResult<usize> {
        match self.port.read(buffer) {
            Ok(n) => Ok(n),
            Err(e) if e.kind() == ErrorKind::TimedOut => Ok(0),
            Err(e) => Err(e.into()),
        }
    }

    fn reset_input_buffer(&mut self) -> AotfResult<()> {
        self.port
            .clear(serialport::ClearBuffer::Input)
            .map_err(|e| AotfError::Transport(e.into()))
    }

    fn reset_output_buffer(&mut self) -> AotfResult<()> {
        self.port
            .clear(serialport::ClearBuffer::Output)
            .map_err(|e| AotfError::Transport(e.into()))
    }
}
