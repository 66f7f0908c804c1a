//! Session state
//!
//! The controller acts on an implicit "active channel". The driver tracks
//! which channel it last selected so channel-scoped operations can be
//! refused before anything is written to the port.

use crate::domain::{AotfError, AotfResult, Channel};

/// Which channel the device is currently acting on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    /// Initial state after connection or reset
    #[default]
    NoChannelSelected,
    ChannelSelected(Channel),
}

impl SessionState {
    /// Record a successful channel select.
    pub fn select(&mut self, channel: Channel) {
        log::debug!("session: {:?} -> ChannelSelected({channel})", self);
        *self = Self::ChannelSelected(channel);
    }

    /// Record a successful device reset. The firmware does not report
    /// which channel it re-activates, so the selection is forgotten.
    pub fn reset(&mut self) {
        log::debug!("session: {:?} -> NoChannelSelected", self);
        *self = Self::NoChannelSelected;
    }

    pub fn active_channel(&self) -> Option<Channel> {
        match self {
            Self::NoChannelSelected => None,
            Self::ChannelSelected(channel) => Some(*channel),
        }
    }

    /// Guard for channel-scoped operations.
    pub fn require_channel(&self) -> AotfResult<Channel> {
        self.active_channel().ok_or(AotfError::ChannelNotSelected)
    }
}
