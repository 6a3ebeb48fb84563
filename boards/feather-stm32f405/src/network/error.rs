//! Network error types

use defmt::Format;

/// Link and socket failures
#[derive(Debug, Clone, Copy, Format)]
pub enum NetworkError {
    /// W5500 did not come out of reset
    ChipInit,
    /// UDP socket could not be bound
    BindFailed,
    /// Datagram could not be queued
    SendFailed,
    /// Datagram could not be received
    ReceiveFailed,
    /// Peer or source is not an IPv6 endpoint
    NotIpv6,
}

impl core::fmt::Display for NetworkError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::ChipInit => write!(f, "W5500 initialization failed"),
            Self::BindFailed => write!(f, "UDP bind failed"),
            Self::SendFailed => write!(f, "UDP send failed"),
            Self::ReceiveFailed => write!(f, "UDP receive failed"),
            Self::NotIpv6 => write!(f, "Endpoint is not IPv6"),
        }
    }
}

impl core::error::Error for NetworkError {}

impl embedded_io_async::Error for NetworkError {
    fn kind(&self) -> embedded_io_async::ErrorKind {
        match self {
            Self::SendFailed | Self::ReceiveFailed => embedded_io_async::ErrorKind::BrokenPipe,
            Self::BindFailed => embedded_io_async::ErrorKind::AddrInUse,
            Self::NotIpv6 => embedded_io_async::ErrorKind::InvalidInput,
            Self::ChipInit => embedded_io_async::ErrorKind::NotConnected,
        }
    }
}
