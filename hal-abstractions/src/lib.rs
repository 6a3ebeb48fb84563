//! Hardware abstraction traits for the CoAP mesh node firmware
//!
//! This crate defines the platform collaborators the node logic calls
//! into: the mesh network state API, a datagram transport, the
//! temperature/humidity sensor and the serial line used for the host
//! handshake. BSPs implement these traits; `coap-node-core` is generic
//! over them.

#![no_std]
#![deny(unsafe_code)]

pub mod mesh;
pub mod sensor;
pub mod serial;
pub mod udp;

pub use mesh::{ChangedFlags, MeshNetwork, MeshRole};
pub use sensor::{two_point_linear, Sensor, SensorChannel, SensorValue};
pub use serial::LineControl;
pub use udp::UdpTransport;
