//! UDP socket carrying CoAP datagrams

use core::net::SocketAddrV6;

use defmt::{info, warn};
use embassy_net::udp::{PacketMetadata, UdpSocket};
use embassy_net::{IpAddress, IpEndpoint, Stack};
use embedded_io_async::ErrorType;
use hal_abstractions::UdpTransport;

use super::error::NetworkError;

// Room for one response of `coap_node_core::coap::RECEIVE_BUFFER_SIZE`
const RX_BUFFER_SIZE: usize = 1536;
const TX_BUFFER_SIZE: usize = 512;
const METADATA_COUNT: usize = 4;

/// Socket storage, kept in a `StaticCell` by the caller
pub struct SocketBuffers {
    rx_meta: [PacketMetadata; METADATA_COUNT],
    rx: [u8; RX_BUFFER_SIZE],
    tx_meta: [PacketMetadata; METADATA_COUNT],
    tx: [u8; TX_BUFFER_SIZE],
}

impl SocketBuffers {
    pub const fn new() -> Self {
        Self {
            rx_meta: [PacketMetadata::EMPTY; METADATA_COUNT],
            rx: [0; RX_BUFFER_SIZE],
            tx_meta: [PacketMetadata::EMPTY; METADATA_COUNT],
            tx: [0; TX_BUFFER_SIZE],
        }
    }
}

/// Bound UDP socket implementing [`UdpTransport`]
pub struct CoapSocket<'a> {
    socket: UdpSocket<'a>,
}

impl<'a> CoapSocket<'a> {
    pub fn bind(
        stack: Stack<'a>,
        buffers: &'a mut SocketBuffers,
        local_port: u16,
    ) -> Result<Self, NetworkError> {
        let SocketBuffers {
            rx_meta,
            rx,
            tx_meta,
            tx,
        } = buffers;
        let mut socket = UdpSocket::new(stack, rx_meta, rx, tx_meta, tx);

        socket.bind(local_port).map_err(|e| {
            warn!("UDP bind to port {} failed: {:?}", local_port, e);
            NetworkError::BindFailed
        })?;

        info!("CoAP socket bound to port {}", local_port);
        Ok(Self { socket })
    }
}

impl ErrorType for CoapSocket<'_> {
    type Error = NetworkError;
}

impl UdpTransport for CoapSocket<'_> {
    async fn send_to(&mut self, buf: &[u8], peer: SocketAddrV6) -> Result<(), NetworkError> {
        let endpoint = IpEndpoint::new(IpAddress::Ipv6(*peer.ip()), peer.port());
        self.socket.send_to(buf, endpoint).await.map_err(|e| {
            warn!("UDP send failed: {:?}", e);
            NetworkError::SendFailed
        })
    }

    async fn recv_from(&mut self, buf: &mut [u8]) -> Result<(usize, SocketAddrV6), NetworkError> {
        let (len, meta) = self.socket.recv_from(buf).await.map_err(|e| {
            warn!("UDP receive failed: {:?}", e);
            NetworkError::ReceiveFailed
        })?;

        // Second arm only matches with proto-ipv4 enabled
        #[allow(unreachable_patterns)]
        let source = match meta.endpoint.addr {
            IpAddress::Ipv6(ip) => SocketAddrV6::new(ip, meta.endpoint.port, 0, 0),
            _ => return Err(NetworkError::NotIpv6),
        };
        Ok((len, source))
    }
}
