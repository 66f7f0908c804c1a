//! Port traits (interfaces)
//!
//! These traits define the boundary between the protocol core and the
//! byte transport. Adapters implement them for real serial hardware and
//! for the in-memory simulator.

pub mod serial;

pub use serial::*;
