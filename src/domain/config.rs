//! Device configuration
//!
//! A DeviceConfig describes one firmware revision of the AOTF controller:
//! how to reach it, how it frames lines, and the ranges it accepts.
//! Saved as pretty JSON so a lab can keep one file per instrument.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::{AotfError, AotfResult, MAX_POWER_DBM, MAX_POWER_INT};

/// Baud rates shipped by known firmware revisions
pub const SUPPORTED_BAUD_RATES: &[u32] = &[19200, 57600];

/// Largest frequency representable in the `F` field (width 7, 3 decimals)
const ENCODABLE_MAX_FREQUENCY_MHZ: f64 = 999.999;

/// Largest coarse power representable in the 4-digit `P` field
const ENCODABLE_MAX_COARSE_POWER: u16 = 9999;

/// Largest fine power representable in the `D` field (width 5, 2 decimals)
const ENCODABLE_MAX_FINE_POWER_DBM: f64 = 99.99;

/// End-of-line marker the firmware uses for both commands and replies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LineEnding {
    /// A single carriage return
    Cr,
    /// Carriage return followed by line feed
    CrLf,
}

impl LineEnding {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Cr => "\r",
            Self::CrLf => "\r\n",
        }
    }

    pub fn as_bytes(self) -> &'static [u8] {
        self.as_str().as_bytes()
    }
}

/// Connection and firmware settings for one device
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// Serial port name (e.g. "/dev/ttyUSB0", "COM3")
    pub port: Option<String>,
    pub baud_rate: u32,
    pub line_ending: LineEnding,
    /// Channel and frequency queries reply as `<eol><value>?`
    pub prompted_replies: bool,
    /// Overall deadline for one reply line
    pub read_timeout_ms: u64,
    pub max_frequency_mhz: f64,
    pub max_coarse_power: u16,
    pub max_fine_power_dbm: f64,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            port: None,
            baud_rate: 19200,
            line_ending: LineEnding::Cr,
            prompted_replies: false,
            read_timeout_ms: 1000,
            max_frequency_mhz: 150.0,
            max_coarse_power: MAX_POWER_INT,
            max_fine_power_dbm: MAX_POWER_DBM,
        }
    }
}

impl DeviceConfig {
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    /// Reject settings no firmware revision could honor.
    pub fn validate(&self) -> AotfResult<()> {
        if !SUPPORTED_BAUD_RATES.contains(&self.baud_rate) {
            return Err(AotfError::Config(format!(
                "unsupported baud rate {} (expected one of {SUPPORTED_BAUD_RATES:?})",
                self.baud_rate
            )));
        }
        if self.read_timeout_ms == 0 {
            return Err(AotfError::Config("read_timeout_ms must be positive".into()));
        }
        if !(self.max_frequency_mhz > 0.0 && self.max_frequency_mhz <= ENCODABLE_MAX_FREQUENCY_MHZ)
        {
            return Err(AotfError::Config(format!(
                "max_frequency_mhz {} outside (0, {ENCODABLE_MAX_FREQUENCY_MHZ}]",
                self.max_frequency_mhz
            )));
        }
        if self.max_coarse_power == 0 || self.max_coarse_power > ENCODABLE_MAX_COARSE_POWER {
            return Err(AotfError::Config(format!(
                "max_coarse_power {} outside [1, {ENCODABLE_MAX_COARSE_POWER}]",
                self.max_coarse_power
            )));
        }
        if !(self.max_fine_power_dbm > 0.0
            && self.max_fine_power_dbm <= ENCODABLE_MAX_FINE_POWER_DBM)
        {
            return Err(AotfError::Config(format!(
                "max_fine_power_dbm {} outside (0, {ENCODABLE_MAX_FINE_POWER_DBM}]",
                self.max_fine_power_dbm
            )));
        }
        Ok(())
    }

    /// Load and validate a configuration from a JSON file.
    /// Missing fields take their default values.
    pub fn load(path: impl AsRef<Path>) -> AotfResult<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            AotfError::Config(format!("Failed to read config '{}': {e}", path.display()))
        })?;
        let config: Self = serde_json::from_str(&json).map_err(|e| {
            AotfError::Config(format!("Failed to parse config '{}': {e}", path.display()))
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> AotfResult<()> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| AotfError::Config(format!("Serialization error: {e}")))?;
        std::fs::write(path, json).map_err(|e| {
            AotfError::Config(format!("Failed to write config '{}': {e}", path.display()))
        })
    }
}
