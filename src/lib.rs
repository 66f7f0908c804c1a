//! AA Opto-Electronic AOTF driver
//!
//! Host-side driver for the RF synthesizer of an acousto-optic tunable
//! filter, reached over a serial line with an ASCII command protocol.
//!
//! ## Architecture (Hexagonal / Ports & Adapters)
//!
//! - `domain/` - Pure domain types, configuration and errors, no I/O
//! - `protocol/` - Command encoding, reply decoding, request/reply session
//! - `state` - Active-channel state machine gating channel-scoped commands
//! - `ports/` - Trait definitions for the byte transport
//! - `adapters/` - Implementations of ports (serialport, simulator) and the
//!   `Aotf` device facade
//!
//! ```no_run
//! use aaopto_aotf_lib::{Aotf, DeviceConfig};
//!
//! let config = DeviceConfig {
//!     port: Some("/dev/ttyUSB0".into()),
//!     ..DeviceConfig::default()
//! };
//! let mut aotf = Aotf::open(&config)?;
//! aotf.select_channel(1)?;
//! aotf.set_frequency(88.5)?;
//! aotf.set_fine_power(15.0)?;
//! println!("{:#?}", aotf.get_lines_status()?);
//! # Ok::<(), aaopto_aotf_lib::AotfError>(())
//! ```

// Core domain (pure, no I/O)
pub mod domain;
pub mod protocol;
pub mod state;
pub mod ports;

// Adapters (external I/O)
pub mod adapters;

pub use adapters::{Aotf, SerialPortFactory, SimulatedAotf};
pub use domain::{AotfError, AotfResult, DeviceConfig};
pub use state::SessionState;
