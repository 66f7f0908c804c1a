//! Core domain types
//!
//! Pure types with no I/O dependencies. Wire digits for the small closed
//! enumerations live here so the encoder and decoder share one mapping.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::{AotfError, AotfResult};

/// Number of RF output channels on the device
pub const MAX_CHANNELS: u8 = 8;

/// Upper bound of the fine power setting in dBm
pub const MAX_POWER_DBM: f64 = 22.0;

/// Upper bound of the coarse power setting on the 10-bit DAC firmware
pub const MAX_POWER_INT: u16 = 1023;

/// A validated channel selector in `[1, MAX_CHANNELS]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct Channel(u8);

impl Channel {
    pub fn new(channel: u8) -> AotfResult<Self> {
        if (1..=MAX_CHANNELS).contains(&channel) {
            Ok(Self(channel))
        } else {
            Err(AotfError::OutOfRange {
                field: "channel",
                value: f64::from(channel),
                min: 1.0,
                max: f64::from(MAX_CHANNELS),
            })
        }
    }

    pub fn get(self) -> u8 {
        self.0
    }

    /// All channels in ascending order
    pub fn all() -> impl Iterator<Item = Channel> {
        (1..=MAX_CHANNELS).map(Channel)
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Generates a closed enum that maps one-to-one onto a single ASCII digit.
macro_rules! digit_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident = $digit:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            /// The wire digit for this value
            pub fn code(self) -> char {
                match self {
                    $(Self::$variant => $digit),+
                }
            }

            /// Parse a wire digit, failing with `UnrecognizedCode` outside the known set
            pub fn from_code(raw: &str) -> AotfResult<Self> {
                let mut chars = raw.chars();
                match (chars.next(), chars.next()) {
                    $((Some($digit), None) => Ok(Self::$variant),)+
                    _ => Err(AotfError::UnrecognizedCode { raw: raw.to_string() }),
                }
            }
        }
    };
}

digit_enum!(
    /// Whether a channel follows the internal setting or the external analog input
    DriverMode { Internal = '0', External = '1' }
);

digit_enum!(
    /// Phase-locked loop switch of the active channel
    PllState { Off = '0', On = '1' }
);

digit_enum!(
    /// Full-scale range of the external modulation input
    VoltageRange { ZeroToFive = '0', ZeroToTen = '1' }
);

/// Output state reported per line in the line-status reply
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StateFlag {
    On,
    Off,
}

impl StateFlag {
    pub fn token(self) -> &'static str {
        match self {
            Self::On => "ON",
            Self::Off => "OFF",
        }
    }

    pub fn parse(token: &str) -> Option<Self> {
        if token.eq_ignore_ascii_case("ON") {
            Some(Self::On)
        } else if token.eq_ignore_ascii_case("OFF") {
            Some(Self::Off)
        } else {
            None
        }
    }
}

/// Control source reported per line in the line-status reply
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ModeFlag {
    Internal,
    External,
}

impl ModeFlag {
    pub fn token(self) -> &'static str {
        match self {
            Self::Internal => "INT",
            Self::External => "EXT",
        }
    }

    pub fn parse(token: &str) -> Option<Self> {
        if token.eq_ignore_ascii_case("INT") {
            Some(Self::Internal)
        } else if token.eq_ignore_ascii_case("EXT") {
            Some(Self::External)
        } else {
            None
        }
    }
}

impl From<DriverMode> for ModeFlag {
    fn from(mode: DriverMode) -> Self {
        match mode {
            DriverMode::Internal => Self::Internal,
            DriverMode::External => Self::External,
        }
    }
}

/// Settings of one channel as reported by the line-status query
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ChannelStatus {
    pub frequency_mhz: f64,
    pub power: f64,
    pub state: StateFlag,
    pub mode: ModeFlag,
}

/// Global blanking setting, reported on the last line-status line
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BlankingStatus {
    pub state: StateFlag,
    pub mode: ModeFlag,
}

/// Complete line status: exactly one entry per channel plus blanking.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineStatus {
    channels: BTreeMap<Channel, ChannelStatus>,
    blanking: BlankingStatus,
}

impl LineStatus {
    /// Build a line status, rejecting anything but a full channel set.
    pub fn new(
        channels: BTreeMap<Channel, ChannelStatus>,
        blanking: BlankingStatus,
    ) -> AotfResult<Self> {
        if channels.len() != usize::from(MAX_CHANNELS) {
            return Err(AotfError::malformed(format!(
                "expected {MAX_CHANNELS} channel entries, got {}",
                channels.len()
            )));
        }
        Ok(Self { channels, blanking })
    }

    pub fn channel(&self, channel: Channel) -> &ChannelStatus {
        // Every valid Channel is present by construction.
        &self.channels[&channel]
    }

    pub fn channels(&self) -> impl Iterator<Item = (Channel, &ChannelStatus)> {
        self.channels.iter().map(|(c, s)| (*c, s))
    }

    pub fn blanking(&self) -> &BlankingStatus {
        &self.blanking
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_accepts_full_range() {
        for c in 1..=MAX_CHANNELS {
            assert_eq!(Channel::new(c).unwrap().get(), c);
        }
    }

    #[test]
    fn channel_rejects_zero_and_nine() {
        assert!(matches!(
            Channel::new(0),
            Err(AotfError::OutOfRange { field: "channel", .. })
        ));
        assert!(matches!(
            Channel::new(9),
            Err(AotfError::OutOfRange { field: "channel", .. })
        ));
    }

    #[test]
    fn digit_enums_roundtrip() {
        for mode in [DriverMode::Internal, DriverMode::External] {
            assert_eq!(DriverMode::from_code(&mode.code().to_string()).unwrap(), mode);
        }
        assert_eq!(PllState::from_code("1").unwrap(), PllState::On);
        assert_eq!(VoltageRange::from_code("0").unwrap(), VoltageRange::ZeroToFive);
    }

    #[test]
    fn digit_enum_rejects_unknown_code() {
        match PllState::from_code("2") {
            Err(AotfError::UnrecognizedCode { raw }) => assert_eq!(raw, "2"),
            other => panic!("expected UnrecognizedCode, got {other:?}"),
        }
        assert!(DriverMode::from_code("").is_err());
        assert!(DriverMode::from_code("01").is_err());
    }

    #[test]
    fn flags_parse_case_insensitively() {
        assert_eq!(StateFlag::parse("on"), Some(StateFlag::On));
        assert_eq!(StateFlag::parse("OFF"), Some(StateFlag::Off));
        assert_eq!(ModeFlag::parse("Ext"), Some(ModeFlag::External));
        assert_eq!(ModeFlag::parse("FSK"), None);
    }

    #[test]
    fn line_status_requires_every_channel() {
        let status = ChannelStatus {
            frequency_mhz: 100.0,
            power: 10.0,
            state: StateFlag::On,
            mode: ModeFlag::Internal,
        };
        let blanking = BlankingStatus {
            state: StateFlag::On,
            mode: ModeFlag::Internal,
        };
        let partial: BTreeMap<_, _> = Channel::all().take(7).map(|c| (c, status)).collect();
        assert!(LineStatus::new(partial, blanking).is_err());

        let full: BTreeMap<_, _> = Channel::all().map(|c| (c, status)).collect();
        let lines = LineStatus::new(full, blanking).unwrap();
        assert_eq!(lines.channels().count(), 8);
    }
}
