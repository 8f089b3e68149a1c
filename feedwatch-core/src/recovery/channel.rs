//! Transport channel connectivity as seen by the recovery manager

use crate::core::Timestamp;
use std::fmt;

/// Why the transport channel went away
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShutdownSignal {
    /// Local shutdown (application stopping the feed)
    Requested,
    /// Broker or network dropped the connection
    ConnectionLost { reason: String },
}

impl fmt::Display for ShutdownSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShutdownSignal::Requested => f.write_str("shutdown requested"),
            ShutdownSignal::ConnectionLost { reason } => write!(f, "connection lost: {}", reason),
        }
    }
}

/// Connectivity of the messaging channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    Connected,
    Disconnected { since: Timestamp },
}

impl ChannelState {
    pub fn is_connected(&self) -> bool {
        matches!(self, ChannelState::Connected)
    }
}

impl Default for ChannelState {
    fn default() -> Self {
        ChannelState::Connected
    }
}
