//! Node error types

use hal_abstractions::SensorChannel;

/// Errors surfaced by the node logic
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum NodeError {
    /// CoAP message could not be encoded or exceeds the message size
    Encode,
    /// Datagram could not be sent
    Send,
    /// No matching response before the response timeout
    Timeout,
    /// Sensor payload has the wrong length or a non-zero reserved byte
    InvalidPayload,
    /// Sensor refused to latch a sample
    SensorFetch,
    /// Sensor channel could not be read
    SensorChannel(SensorChannel),
    /// Peer address text is not an IPv6 address or socket address
    InvalidPeerAddress,
    /// Resource path has no segments
    EmptyPath,
    /// Resource path segment is empty or longer than 255 bytes
    InvalidPathSegment,
    /// Request interval of zero
    ZeroInterval,
}

impl NodeError {
    /// Whether the error came from the sensor rather than the network
    pub const fn is_sensor_failure(&self) -> bool {
        matches!(self, Self::SensorFetch | Self::SensorChannel(_))
    }
}

impl core::fmt::Display for NodeError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Encode => write!(f, "CoAP encode failed"),
            Self::Send => write!(f, "Send failed"),
            Self::Timeout => write!(f, "Response timeout"),
            Self::InvalidPayload => write!(f, "Invalid sensor payload"),
            Self::SensorFetch => write!(f, "Sensor sample fetch failed"),
            Self::SensorChannel(SensorChannel::AmbientTemp) => {
                write!(f, "Cannot read temperature channel")
            }
            Self::SensorChannel(SensorChannel::Humidity) => {
                write!(f, "Cannot read humidity channel")
            }
            Self::InvalidPeerAddress => write!(f, "Invalid peer address"),
            Self::EmptyPath => write!(f, "Empty resource path"),
            Self::InvalidPathSegment => write!(f, "Invalid resource path segment"),
            Self::ZeroInterval => write!(f, "Request interval must be non-zero"),
        }
    }
}

impl core::error::Error for NodeError {}
