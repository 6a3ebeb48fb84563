//! Node configuration
//!
//! Defaults describe the fixed peer and cadence the node was deployed
//! with. Boards may override the peer at build time (`COAP_PEER`).

use core::net::{Ipv6Addr, SocketAddrV6};
use core::str::FromStr;

use crate::error::NodeError;

/// Default CoAP port
pub const COAP_PORT: u16 = 5683;

/// Default peer: a mesh-local address on the node's partition
pub const DEFAULT_PEER_ADDR: Ipv6Addr =
    Ipv6Addr::new(0xfd4d, 0xeafc, 0x6f32, 0xc7cf, 0x0000, 0x00ff, 0xfe00, 0xfc11);

/// Resource the sensor report is PUT to and the poll reads back
pub const AMBIENT_RESOURCE: &[&str] = &["ambient"];

/// Time between two requests
pub const REQUEST_INTERVAL_MS: u32 = 10_000;

/// How long a GET waits for its response
pub const RESPONSE_TIMEOUT_MS: u32 = 2_000;

/// What the worker does after a sensor read fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SensorFailurePolicy {
    /// Log, skip this cycle's request and try again next interval
    #[default]
    SkipCycle,
    /// Stop issuing requests for the rest of the process lifetime
    Halt,
}

/// Node configuration
#[derive(Debug, Clone)]
pub struct NodeConfig {
    /// CoAP peer
    pub peer: SocketAddrV6,
    /// URI path for the sensor report PUT
    pub report_path: &'static [&'static str],
    /// URI path for the resource poll GET
    pub poll_path: &'static [&'static str],
    /// Delay after each cycle in milliseconds
    pub interval_ms: u32,
    /// Response wait for GET requests in milliseconds
    pub response_timeout_ms: u32,
    /// Reaction to sensor failures
    pub sensor_failure: SensorFailurePolicy,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            peer: SocketAddrV6::new(DEFAULT_PEER_ADDR, COAP_PORT, 0, 0),
            report_path: AMBIENT_RESOURCE,
            poll_path: AMBIENT_RESOURCE,
            interval_ms: REQUEST_INTERVAL_MS,
            response_timeout_ms: RESPONSE_TIMEOUT_MS,
            sensor_failure: SensorFailurePolicy::default(),
        }
    }
}

impl NodeConfig {
    /// Replace the peer with `text`
    ///
    /// Accepts `[addr]:port` or a bare IPv6 address, which gets the
    /// default CoAP port.
    pub fn with_peer(mut self, text: &str) -> Result<Self, NodeError> {
        self.peer = parse_peer(text)?;
        Ok(self)
    }

    /// Apply an optional build-time override
    pub fn with_peer_override(self, text: Option<&str>) -> Result<Self, NodeError> {
        match text {
            Some(text) => self.with_peer(text),
            None => Ok(self),
        }
    }

    /// Check the configuration before the node starts
    pub fn validate(&self) -> Result<(), NodeError> {
        if self.interval_ms == 0 {
            return Err(NodeError::ZeroInterval);
        }
        validate_path(self.report_path)?;
        validate_path(self.poll_path)
    }
}

fn parse_peer(text: &str) -> Result<SocketAddrV6, NodeError> {
    let text = text.trim();
    if let Ok(addr) = SocketAddrV6::from_str(text) {
        return Ok(addr);
    }
    Ipv6Addr::from_str(text)
        .map(|ip| SocketAddrV6::new(ip, COAP_PORT, 0, 0))
        .map_err(|_| NodeError::InvalidPeerAddress)
}

fn validate_path(path: &[&str]) -> Result<(), NodeError> {
    if path.is_empty() {
        return Err(NodeError::EmptyPath);
    }
    // URI-Path option values are 0..=255 bytes; empty segments are meaningless here
    if path.iter().any(|s| s.is_empty() || s.len() > 255) {
        return Err(NodeError::InvalidPathSegment);
    }
    Ok(())
}
