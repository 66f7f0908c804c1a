//! Serial transport traits
//!
//! Split into two traits:
//! - `TransportFactory` — opens a transport from a device configuration
//! - `Transport` — instance methods for reading/writing bytes

use std::time::{Duration, Instant};

use crate::domain::{AotfError, AotfResult, DeviceConfig};

/// Factory for creating transports.
pub trait TransportFactory {
    /// Open the configured port, with both buffers already reset
    fn open(config: &DeviceConfig) -> AotfResult<Box<dyn Transport>>;
}

/// A half-duplex byte channel to the device.
/// Only requires `Send` (not `Sync`) — one owner drives it at a time.
pub trait Transport: Send {
    /// Write all bytes to the port
    fn write(&mut self, data: &[u8]) -> AotfResult<()>;

    /// Read available bytes. Returns `Ok(0)` when the per-call timeout
    /// expires with nothing received.
    fn read(&mut self, buffer: &mut [u8]) -> AotfResult<usize>;

    /// Read until `terminator` has been received or `timeout` elapses.
    ///
    /// Reads one byte at a time so that bytes belonging to the next
    /// reply line stay in the port. The returned bytes include the
    /// terminator. Fails with `Truncated` on timeout.
    fn read_until(&mut self, terminator: &[u8], timeout: Duration) -> AotfResult<Vec<u8>> {
        let deadline = Instant::now() + timeout;
        let mut line = Vec::new();
        let mut byte = [0u8; 1];

        while !line.ends_with(terminator) {
            if Instant::now() >= deadline {
                log::warn!(
                    "read timed out after {} bytes waiting for {terminator:?}",
                    line.len()
                );
                return Err(AotfError::Truncated {
                    received: line.len(),
                });
            }
            if self.read(&mut byte)? == 1 {
                line.push(byte[0]);
            }
        }
        Ok(line)
    }

    /// Discard bytes received but not yet read
    fn reset_input_buffer(&mut self) -> AotfResult<()>;

    /// Discard bytes written but not yet transmitted
    fn reset_output_buffer(&mut self) -> AotfResult<()>;
}
