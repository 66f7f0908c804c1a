//! ProtocolSession: owns the transport and drives one exchange at a time.
//!
//! An exchange is strictly half-duplex: write the encoded command, then
//! read exactly the framing the dialect prescribes for it (N terminated
//! lines, or a prompted value ending in `?`) before anything else is sent.
//!
//! Pure translation lives in `encode` / `decode`. ProtocolSession only handles I/O.

use std::time::Duration;

use crate::domain::{AotfError, AotfResult};
use crate::ports::Transport;

use super::{decode, encode, Command, Dialect, Framing, Reply, PROMPT_SENTINEL};

/// Direction of bytes reported to a wire tap
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireDirection {
    Sent,
    Received,
}

/// Diagnostic hook receiving the exact bytes written and read
pub type WireTap = Box<dyn FnMut(WireDirection, &[u8]) + Send>;

/// Owns a transport and executes commands against the controller.
pub struct ProtocolSession {
    transport: Box<dyn Transport>,
    dialect: Dialect,
    read_timeout: Duration,
    tap: Option<WireTap>,
}

impl ProtocolSession {
    pub fn new(transport: Box<dyn Transport>, dialect: Dialect, read_timeout: Duration) -> Self {
        Self {
            transport,
            dialect,
            read_timeout,
            tap: None,
        }
    }

    pub fn set_wire_tap(&mut self, tap: WireTap) {
        self.tap = Some(tap);
    }

    pub fn clear_wire_tap(&mut self) {
        self.tap = None;
    }

    /// Send a command and return the parsed reply.
    ///
    /// Writes the wire string, reads the complete reply for the command's
    /// framing, then delegates to `decode()`. A reply that does not finish
    /// within the read timeout is `Truncated`; nothing is retried.
    ///
    /// The input buffer is not flushed after a `Truncated` reply. Lines the
    /// device sends late would be read as the reply to the next command, so
    /// call `reset_input_buffer` before retrying.
    pub fn execute(&mut self, cmd: &Command) -> AotfResult<Reply> {
        let wire = encode(cmd, self.dialect.line_ending);
        log::debug!("AOTF TX: {:?}", wire);
        self.notify(WireDirection::Sent, wire.as_bytes());

        self.transport.write(wire.as_bytes())?;

        let raw = self.read_reply(cmd)?;
        log::debug!("AOTF RX: {:?}", String::from_utf8_lossy(&raw));

        decode(&raw, cmd, &self.dialect)
    }

    /// Drop any reply bytes still pending in the transport.
    pub fn reset_input_buffer(&mut self) -> AotfResult<()> {
        log::debug!("AOTF: discarding pending input");
        self.transport.reset_input_buffer()
    }

    fn read_reply(&mut self, cmd: &Command) -> AotfResult<Vec<u8>> {
        match self.dialect.framing(cmd) {
            Framing::Lines(count) => {
                let eol = self.dialect.line_ending.as_bytes();
                let mut raw = Vec::new();
                for _ in 0..count {
                    let line = match self.transport.read_until(eol, self.read_timeout) {
                        Ok(line) => line,
                        Err(AotfError::Truncated { received }) => {
                            return Err(AotfError::Truncated {
                                received: raw.len() + received,
                            })
                        }
                        Err(e) => return Err(e),
                    };
                    self.notify(WireDirection::Received, &line);
                    raw.extend_from_slice(&line);
                }
                Ok(raw)
            }
            Framing::Prompted => {
                let raw = self
                    .transport
                    .read_until(&[PROMPT_SENTINEL], self.read_timeout)?;
                self.notify(WireDirection::Received, &raw);
                Ok(raw)
            }
        }
    }

    fn notify(&mut self, direction: WireDirection, bytes: &[u8]) {
        if let Some(tap) = self.tap.as_mut() {
            tap(direction, bytes);
        }
    }
}
