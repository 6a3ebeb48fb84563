//! Network layer: W5500 link, mesh role mapping and the CoAP socket

pub mod config;
pub mod error;
pub mod link;
pub mod udp;

pub use config::{NetworkConfig, COAP_LOCAL_PORT};
pub use error::NetworkError;
pub use link::EthLink;
pub use udp::{CoapSocket, SocketBuffers};
