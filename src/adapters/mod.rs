//! Adapters (implementations of ports)
//!
//! - `serial_port` — `Transport` over the `serialport` crate
//! - `simulator` — in-memory controller firmware, also a `Transport`
//! - `aotf` — the device facade driving either of them

pub mod aotf;
pub mod serial_port;
pub mod simulator;

pub use aotf::Aotf;
pub use serial_port::{SerialPortFactory, SerialPortTransport};
pub use simulator::SimulatedAotf;
