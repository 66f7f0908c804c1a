//! AOTF command protocol.
//!
//! This module separates the three concerns of talking to the controller:
//! - `encode`: translate Command → wire string (pure, no I/O)
//! - `decode`: translate reply bytes → Reply (pure, no I/O)
//! - `session`: own the transport, drive one request/reply exchange
//!
//! Replies are not self-describing, so decoding always takes the command
//! that was sent. Both directions depend on the firmware `Dialect`.

pub mod decode;
pub mod encode;
pub mod session;

pub use decode::decode;
pub use encode::encode;
pub use session::{ProtocolSession, WireDirection, WireTap};

use crate::domain::{
    Channel, DeviceConfig, DriverMode, LineEnding, LineStatus, PllState, VoltageRange,
    MAX_CHANNELS,
};

/// Trailing sentinel of prompted replies
pub const PROMPT_SENTINEL: u8 = b'?';

/// Number of physical lines in a line-status reply: one per channel plus blanking
pub const LINE_STATUS_LINES: usize = MAX_CHANNELS as usize + 1;

/// Every operation the controller understands.
///
/// Numeric arguments must already be range-checked; the encoder formats
/// whatever it is given.
#[derive(Debug, PartialEq, Clone, Copy)]
pub enum Command {
    ChannelSelect(Channel),
    /// MHz
    FrequencyAdjust(f64),
    CoarsePowerAdjust(u16),
    /// dBm
    FinePowerAdjust(f64),
    DriverModeSet(DriverMode),
    PllSwitch(PllState),
    VoltageRangeSet(VoltageRange),
    Reset,
    DataStorage,
    LinesStatusQuery,
    ChannelQuery,
    FrequencyQuery,
    PowerQuery,
    FinePowerQuery,
    DriverModeQuery,
    PllQuery,
    VoltageRangeQuery,
    ProductIdQuery,
}

impl Command {
    /// Root character shared by a command and its query
    pub fn root(&self) -> char {
        use Command::*;
        match self {
            ChannelSelect(_) | ChannelQuery => 'X',
            FrequencyAdjust(_) | FrequencyQuery => 'F',
            CoarsePowerAdjust(_) | PowerQuery => 'P',
            FinePowerAdjust(_) | FinePowerQuery => 'D',
            LinesStatusQuery => 'S',
            DriverModeSet(_) | DriverModeQuery => 'I',
            PllSwitch(_) | PllQuery => 'O',
            DataStorage => 'E',
            VoltageRangeSet(_) | VoltageRangeQuery => 'V',
            Reset => 'M',
            ProductIdQuery => 'q',
        }
    }

    /// Commands that act on the active channel and need one selected first
    pub fn is_channel_scoped(&self) -> bool {
        use Command::*;
        matches!(
            self,
            FrequencyAdjust(_)
                | CoarsePowerAdjust(_)
                | FinePowerAdjust(_)
                | PllSwitch(_)
                | FrequencyQuery
                | PowerQuery
                | FinePowerQuery
                | DriverModeQuery
                | PllQuery
        )
    }
}

/// Parsed replies from the controller.
#[derive(Debug, PartialEq, Clone)]
pub enum Reply {
    /// Set/action command accepted; the reply line is not interpreted
    Ack,
    Channel(Channel),
    FrequencyMhz(f64),
    CoarsePower(u16),
    FinePowerDbm(f64),
    DriverMode(DriverMode),
    Pll(PllState),
    VoltageRange(VoltageRange),
    LineStatus(LineStatus),
    ProductId(String),
}

/// How a reply is delimited on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Framing {
    /// `n` lines, each ending with the line marker
    Lines(usize),
    /// `<eol><value>?`
    Prompted,
}

/// The wire conventions of one firmware revision
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dialect {
    pub line_ending: LineEnding,
    pub prompted_replies: bool,
}

impl Default for Dialect {
    fn default() -> Self {
        Self {
            line_ending: LineEnding::Cr,
            prompted_replies: false,
        }
    }
}

impl From<&DeviceConfig> for Dialect {
    fn from(config: &DeviceConfig) -> Self {
        Self {
            line_ending: config.line_ending,
            prompted_replies: config.prompted_replies,
        }
    }
}

impl Dialect {
    /// Which reply framing to expect after sending `cmd`
    pub fn framing(&self, cmd: &Command) -> Framing {
        match cmd {
            Command::ChannelQuery | Command::FrequencyQuery if self.prompted_replies => {
                Framing::Prompted
            }
            Command::LinesStatusQuery => Framing::Lines(LINE_STATUS_LINES),
            _ => Framing::Lines(1),
        }
    }
}
