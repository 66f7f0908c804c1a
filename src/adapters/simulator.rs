//! Simulated AOTF controller for development and testing without hardware.
//!
//! Activate in the status tool by setting AOTF_SIMULATE=1 in the environment:
//!
//!   AOTF_SIMULATE=1 RUST_LOG=aaopto_aotf_lib=info cargo run --bin aotf-status
//!
//! The simulator implements `Transport` directly: it parses each command
//! line written to it, updates an in-memory model of the firmware and
//! queues the reply bytes the real device would send. Every command is
//! logged at INFO level.

use std::collections::VecDeque;

use crate::domain::{
    AotfResult, DeviceConfig, DriverMode, ModeFlag, PllState, StateFlag, VoltageRange,
    MAX_CHANNELS,
};
use crate::ports::{Transport, TransportFactory};
use crate::protocol::{Dialect, PROMPT_SENTINEL};

/// Product id reported by the simulator
pub const SIMULATED_PRODUCT_ID: &str = "MPDS8C-SIM";

/// Power-on frequency of every channel
const DEFAULT_FREQUENCY_MHZ: f64 = 100.0;

#[derive(Debug, Clone, Copy)]
struct SimChannel {
    frequency_mhz: f64,
    coarse_power: u16,
    fine_power_dbm: f64,
    pll: PllState,
}

impl Default for SimChannel {
    fn default() -> Self {
        Self {
            frequency_mhz: DEFAULT_FREQUENCY_MHZ,
            coarse_power: 0,
            fine_power_dbm: 0.0,
            pll: PllState::Off,
        }
    }
}

impl SimChannel {
    fn output(&self) -> StateFlag {
        if self.coarse_power > 0 || self.fine_power_dbm > 0.0 {
            StateFlag::On
        } else {
            StateFlag::Off
        }
    }
}

/// In-memory model of the controller firmware.
pub struct SimulatedAotf {
    dialect: Dialect,
    active: usize,
    channels: [SimChannel; MAX_CHANNELS as usize],
    driver_mode: DriverMode,
    voltage_range: VoltageRange,
    /// Bytes written by the host, not yet a complete command line
    incoming: Vec<u8>,
    /// Reply bytes waiting to be read by the host
    outgoing: VecDeque<u8>,
}

impl SimulatedAotf {
    pub fn new(dialect: Dialect) -> Self {
        log::info!("[SIM AOTF] Initialized, {MAX_CHANNELS} channels at {DEFAULT_FREQUENCY_MHZ:.3} MHz");
        Self {
            dialect,
            active: 0,
            channels: [SimChannel::default(); MAX_CHANNELS as usize],
            driver_mode: DriverMode::External,
            voltage_range: VoltageRange::ZeroToFive,
            incoming: Vec::new(),
            outgoing: VecDeque::new(),
        }
    }

    fn eol(&self) -> &'static str {
        self.dialect.line_ending.as_str()
    }

    fn reply_line(&mut self, text: &str) {
        let line = format!("{text}{}", self.eol());
        self.outgoing.extend(line.bytes());
    }

    fn reply_prompted(&mut self, text: &str) {
        let framed = format!("{}{text}{}", self.eol(), PROMPT_SENTINEL as char);
        self.outgoing.extend(framed.bytes());
    }

    /// Reply with a value, using prompted framing where the firmware does.
    fn reply_value(&mut self, root: char, text: &str) {
        if self.dialect.prompted_replies && matches!(root, 'X' | 'F') {
            self.reply_prompted(text);
        } else {
            self.reply_line(text);
        }
    }

    fn handle(&mut self, line: &str) {
        let mut chars = line.chars();
        let Some(root) = chars.next() else {
            return;
        };
        let payload = chars.as_str();

        if payload == "?" {
            self.handle_query(root);
        } else if self.handle_set(root, payload) {
            log::info!("[SIM AOTF] {line} → ok");
            self.reply_line(line);
        } else {
            log::info!("[SIM AOTF] {line} → rejected");
            self.reply_line("?");
        }
    }

    fn handle_query(&mut self, root: char) {
        let ch = self.channels[self.active];
        let value = match root {
            'X' => (self.active + 1).to_string(),
            'F' => format!("{:.3}", ch.frequency_mhz),
            'P' => format!("{:04}", ch.coarse_power),
            'D' => format!("{:.2}", ch.fine_power_dbm),
            'I' => self.driver_mode.code().to_string(),
            'O' => ch.pll.code().to_string(),
            'V' => self.voltage_range.code().to_string(),
            'q' => SIMULATED_PRODUCT_ID.to_string(),
            'S' => {
                self.reply_line_status();
                return;
            }
            _ => "?".to_string(),
        };
        log::info!("[SIM AOTF] {root}? → {value}");
        self.reply_value(root, &value);
    }

    fn reply_line_status(&mut self) {
        let mode = ModeFlag::from(self.driver_mode).token();
        let lines: Vec<String> = self
            .channels
            .iter()
            .enumerate()
            .map(|(i, ch)| {
                format!(
                    "l{} F={:.3} P={:.3} {} {mode}",
                    i + 1,
                    ch.frequency_mhz,
                    ch.fine_power_dbm,
                    ch.output().token()
                )
            })
            .collect();
        for line in lines {
            self.reply_line(&line);
        }
        self.reply_line(&format!("Blanking {} {mode}", StateFlag::On.token()));
        log::info!("[SIM AOTF] S? → {} lines", MAX_CHANNELS + 1);
    }

    /// Apply a set/action command. Returns false when the firmware would reject it.
    fn handle_set(&mut self, root: char, payload: &str) -> bool {
        let active = self.active;
        match root {
            'X' => match payload.parse::<usize>() {
                Ok(c) if (1..=usize::from(MAX_CHANNELS)).contains(&c) => {
                    self.active = c - 1;
                    true
                }
                _ => false,
            },
            'F' => payload
                .parse::<f64>()
                .map(|mhz| self.channels[active].frequency_mhz = mhz)
                .is_ok(),
            'P' => payload
                .parse::<u16>()
                .map(|level| self.channels[active].coarse_power = level)
                .is_ok(),
            'D' => payload
                .parse::<f64>()
                .map(|dbm| self.channels[active].fine_power_dbm = dbm)
                .is_ok(),
            'I' => DriverMode::from_code(payload)
                .map(|mode| self.driver_mode = mode)
                .is_ok(),
            'O' => PllState::from_code(payload)
                .map(|pll| self.channels[active].pll = pll)
                .is_ok(),
            'V' => VoltageRange::from_code(payload)
                .map(|range| self.voltage_range = range)
                .is_ok(),
            'M' if payload.is_empty() => {
                *self = Self {
                    incoming: std::mem::take(&mut self.incoming),
                    outgoing: std::mem::take(&mut self.outgoing),
                    ..Self::new(self.dialect)
                };
                true
            }
            'E' if payload.is_empty() => true,
            _ => false,
        }
    }
}

impl TransportFactory for SimulatedAotf {
    fn open(config: &DeviceConfig) -> AotfResult<Box<dyn Transport>> {
        Ok(Box::new(Self::new(Dialect::from(config))))
    }
}

impl Transport for SimulatedAotf {
    fn write(&mut self, data: &[u8]) -> AotfResult<()> {
        self.incoming.extend_from_slice(data);
        let eol = self.dialect.line_ending.as_bytes();
        while let Some(pos) = self
            .incoming
            .windows(eol.len())
            .position(|window| window == eol)
        {
            let line: Vec<u8> = self.incoming.drain(..pos + eol.len()).take(pos).collect();
            let line = String::from_utf8_lossy(&line).into_owned();
            self.handle(&line);
        }
        Ok(())
    }

    fn read(&mut self, buffer: &mut [u8]) -> AotfResult<usize> {
        let n = self.outgoing.len().min(buffer.len());
        for (slot, byte) in buffer.iter_mut().zip(self.outgoing.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }

    fn reset_input_buffer(&mut self) -> AotfResult<()> {
        self.outgoing.clear();
        Ok(())
    }

    fn reset_output_buffer(&mut self) -> AotfResult<()> {
        self.incoming.clear();
        Ok(())
    }
}
