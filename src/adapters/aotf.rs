//! AOTF device facade
//!
//! The controller speaks a line-oriented ASCII protocol over serial:
//! - Select the active channel with `X<n>`
//! - Channel-scoped commands (`F`, `P`, `D`, `O`) then act on that channel
//! - Queries append `?` to the command root and reply with one line,
//!   except the line-status query which replies with one line per channel
//!   plus a blanking summary
//!
//! Every operation runs the same pipeline: validate arguments, check the
//! session state, then hand the command to the protocol session. Nothing
//! is written to the port when either check fails.

use crate::domain::{
    AotfError, AotfResult, Channel, DeviceConfig, DriverMode, LineStatus, PllState, VoltageRange,
};
use crate::ports::{Transport, TransportFactory};
use crate::protocol::{Command, Dialect, ProtocolSession, Reply, WireTap};
use crate::state::SessionState;

use super::serial_port::SerialPortFactory;

/// Run a query and unwrap the reply variant it is known to produce.
macro_rules! query {
    ($self:ident, $cmd:expr, $variant:path) => {{
        let cmd = $cmd;
        match $self.run(cmd)? {
            $variant(value) => Ok(value),
            other => Err(AotfError::malformed(format!(
                "unexpected reply {other:?} to {cmd:?}"
            ))),
        }
    }};
}

/// Check `value` lies in `[min, max]`. NaN is always out of range.
fn check_range(field: &'static str, value: f64, min: f64, max: f64) -> AotfResult<f64> {
    if value >= min && value <= max {
        // Normalize -0.0 so it never formats with a sign.
        Ok(value + 0.0)
    } else {
        Err(AotfError::OutOfRange {
            field,
            value,
            min,
            max,
        })
    }
}

/// AOTF controller handle. Owns the protocol session and the channel state.
///
/// Not `Sync`: one caller drives the device at a time. Share it behind a
/// mutex if several threads need access.
pub struct Aotf {
    session: ProtocolSession,
    state: SessionState,
    max_frequency_mhz: f64,
    max_coarse_power: u16,
    max_fine_power_dbm: f64,
}

impl Aotf {
    /// Wrap an already-open transport.
    pub fn new(transport: Box<dyn Transport>, config: &DeviceConfig) -> AotfResult<Self> {
        config.validate()?;
        Ok(Self {
            session: ProtocolSession::new(
                transport,
                Dialect::from(config),
                config.read_timeout(),
            ),
            state: SessionState::default(),
            max_frequency_mhz: config.max_frequency_mhz,
            max_coarse_power: config.max_coarse_power,
            max_fine_power_dbm: config.max_fine_power_dbm,
        })
    }

    /// Open the configured serial port.
    pub fn open(config: &DeviceConfig) -> AotfResult<Self> {
        Self::open_with::<SerialPortFactory>(config)
    }

    /// Open a transport from any factory (e.g. the simulator).
    pub fn open_with<F: TransportFactory>(config: &DeviceConfig) -> AotfResult<Self> {
        // Fail before the port is opened; `new` checks again for callers
        // that bring their own transport.
        config.validate()?;
        let transport = F::open(config)?;
        Self::new(transport, config)
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn active_channel(&self) -> Option<Channel> {
        self.state.active_channel()
    }

    /// Receive every byte sent to and read from the device.
    pub fn set_wire_tap(&mut self, tap: WireTap) {
        self.session.set_wire_tap(tap);
    }

    pub fn clear_wire_tap(&mut self) {
        self.session.clear_wire_tap();
    }

    /// Drop reply bytes still pending from an exchange that timed out.
    pub fn reset_input_buffer(&mut self) -> AotfResult<()> {
        self.session.reset_input_buffer()
    }

    /// Guard channel-scoped commands, then execute.
    fn run(&mut self, cmd: Command) -> AotfResult<Reply> {
        if cmd.is_channel_scoped() {
            self.state.require_channel()?;
        }
        self.session.execute(&cmd)
    }

    fn run_ack(&mut self, cmd: Command) -> AotfResult<()> {
        self.run(cmd).map(|_| ())
    }

    /// Reset the device to external mode with the stored parameter settings.
    pub fn reset(&mut self) -> AotfResult<()> {
        self.run_ack(Command::Reset)?;
        self.state.reset();
        Ok(())
    }

    /// Store all channel settings made since the last reset in non-volatile memory.
    pub fn save_settings(&mut self) -> AotfResult<()> {
        self.run_ack(Command::DataStorage)
    }

    /// Select the channel subsequent channel-scoped operations act on.
    pub fn select_channel(&mut self, channel: u8) -> AotfResult<()> {
        let channel = Channel::new(channel)?;
        self.run_ack(Command::ChannelSelect(channel))?;
        self.state.select(channel);
        Ok(())
    }

    /// Set the active channel frequency in MHz.
    pub fn set_frequency(&mut self, mhz: f64) -> AotfResult<()> {
        let mhz = check_range("frequency_mhz", mhz, 0.0, self.max_frequency_mhz)?;
        self.run_ack(Command::FrequencyAdjust(mhz))
    }

    /// Set the active channel power on the coarse (DAC level) scale.
    pub fn set_coarse_power(&mut self, level: u16) -> AotfResult<()> {
        if level > self.max_coarse_power {
            return Err(AotfError::OutOfRange {
                field: "coarse_power",
                value: f64::from(level),
                min: 0.0,
                max: f64::from(self.max_coarse_power),
            });
        }
        self.run_ack(Command::CoarsePowerAdjust(level))
    }

    /// Set the active channel power as a percentage of the coarse scale.
    pub fn set_power_percent(&mut self, percent: f64) -> AotfResult<()> {
        let percent = check_range("power_percent", percent, 0.0, 100.0)?;
        let level = (percent / 100.0 * f64::from(self.max_coarse_power)).round() as u16;
        self.set_coarse_power(level)
    }

    /// Set the active channel power in dBm.
    pub fn set_fine_power(&mut self, dbm: f64) -> AotfResult<()> {
        let dbm = check_range("fine_power_dbm", dbm, 0.0, self.max_fine_power_dbm)?;
        self.run_ack(Command::FinePowerAdjust(dbm))
    }

    pub fn set_driver_mode(&mut self, mode: DriverMode) -> AotfResult<()> {
        self.run_ack(Command::DriverModeSet(mode))
    }

    pub fn set_pll(&mut self, state: PllState) -> AotfResult<()> {
        self.run_ack(Command::PllSwitch(state))
    }

    /// Select the full-scale range of the external modulation input.
    pub fn set_voltage_range(&mut self, range: VoltageRange) -> AotfResult<()> {
        self.run_ack(Command::VoltageRangeSet(range))
    }

    /// Settings of every channel plus global blanking, in one exchange.
    pub fn get_lines_status(&mut self) -> AotfResult<LineStatus> {
        query!(self, Command::LinesStatusQuery, Reply::LineStatus)
    }

    /// The channel the device reports as active. Does not change the session state.
    pub fn get_channel(&mut self) -> AotfResult<Channel> {
        query!(self, Command::ChannelQuery, Reply::Channel)
    }

    /// Frequency of the active channel in MHz.
    pub fn get_frequency(&mut self) -> AotfResult<f64> {
        query!(self, Command::FrequencyQuery, Reply::FrequencyMhz)
    }

    pub fn get_coarse_power(&mut self) -> AotfResult<u16> {
        query!(self, Command::PowerQuery, Reply::CoarsePower)
    }

    pub fn get_power_percent(&mut self) -> AotfResult<f64> {
        let level = self.get_coarse_power()?;
        Ok(f64::from(level) * 100.0 / f64::from(self.max_coarse_power))
    }

    /// Fine power of the active channel in dBm.
    pub fn get_fine_power(&mut self) -> AotfResult<f64> {
        query!(self, Command::FinePowerQuery, Reply::FinePowerDbm)
    }

    pub fn get_driver_mode(&mut self) -> AotfResult<DriverMode> {
        query!(self, Command::DriverModeQuery, Reply::DriverMode)
    }

    pub fn get_pll(&mut self) -> AotfResult<PllState> {
        query!(self, Command::PllQuery, Reply::Pll)
    }

    pub fn get_voltage_range(&mut self) -> AotfResult<VoltageRange> {
        query!(self, Command::VoltageRangeQuery, Reply::VoltageRange)
    }

    pub fn get_product_id(&mut self) -> AotfResult<String> {
        query!(self, Command::ProductIdQuery, Reply::ProductId)
    }
}
