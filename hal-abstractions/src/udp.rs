//! Datagram transport over IPv6

use core::future::Future;
use core::net::SocketAddrV6;

use embedded_io_async::ErrorType;

/// Bound UDP socket
///
/// Errors use the `embedded-io` error model so callers can inspect the
/// error kind without knowing the network stack.
pub trait UdpTransport: ErrorType {
    /// Send one datagram to `peer`
    fn send_to(
        &mut self,
        buf: &[u8],
        peer: SocketAddrV6,
    ) -> impl Future<Output = Result<(), Self::Error>>;

    /// Receive one datagram into `buf`, returning its length and source
    ///
    /// A datagram larger than `buf` is consumed and reported as an error.
    fn recv_from(
        &mut self,
        buf: &mut [u8],
    ) -> impl Future<Output = Result<(usize, SocketAddrV6), Self::Error>>;
}
