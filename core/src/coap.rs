//! CoAP client utility
//!
//! Builds non-confirmable requests for a single peer with the
//! `coap-lite` codec and pushes them through a [`UdpTransport`]. Requests
//! either fire and forget (PUT reports) or wait a bounded time for the
//! matching response (GET polls).
//!
//! Message ids count up from a seed; tokens come from a xorshift
//! sequence over the same seed. The board seeds both from the hardware
//! RNG so that a reboot does not replay old ids.

use alloc::vec::Vec;
use core::net::SocketAddrV6;

use coap_lite::{CoapOption, MessageClass, MessageType, Packet, RequestType};
use embassy_futures::select::{select, Either};
use embedded_hal_async::delay::DelayNs;
use hal_abstractions::UdpTransport;

use crate::error::NodeError;

/// Largest datagram sent
pub const MAX_MESSAGE_SIZE: usize = 128;

/// Receive buffer size, the IPv6 minimum MTU
///
/// Responses up to this size are decoded and their payload cut down to
/// [`RESPONSE_PAYLOAD_CAPACITY`]. Larger datagrams are rejected by the
/// transport and skipped.
pub const RECEIVE_BUFFER_SIZE: usize = 1280;

/// Bytes of response payload kept; the rest is dropped and flagged
pub const RESPONSE_PAYLOAD_CAPACITY: usize = 64;

/// Token length used for requests
pub const TOKEN_LEN: usize = 4;

/// Request method
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Method {
    Get,
    Put,
}

impl From<Method> for RequestType {
    fn from(method: Method) -> Self {
        match method {
            Method::Get => RequestType::Get,
            Method::Put => RequestType::Put,
        }
    }
}

/// Outgoing request
#[derive(Debug, Clone, Copy)]
pub struct Request<'a> {
    pub method: Method,
    /// URI path segments, one URI-Path option each
    pub path: &'a [&'a str],
    pub payload: &'a [u8],
    /// Wait for and return the response
    pub await_response: bool,
}

impl<'a> Request<'a> {
    /// GET that waits for the response
    pub fn get(path: &'a [&'a str]) -> Self {
        Self {
            method: Method::Get,
            path,
            payload: &[],
            await_response: true,
        }
    }

    /// One-shot PUT with no response handling
    pub fn put(path: &'a [&'a str], payload: &'a [u8]) -> Self {
        Self {
            method: Method::Put,
            path,
            payload,
            await_response: false,
        }
    }
}

/// Response code as `class.detail`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ResponseCode(pub u8);

impl ResponseCode {
    pub const CONTENT: Self = Self(0x45);
    pub const NOT_FOUND: Self = Self(0x84);

    pub const fn class(self) -> u8 {
        self.0 >> 5
    }

    pub const fn detail(self) -> u8 {
        self.0 & 0x1f
    }

    pub const fn is_success(self) -> bool {
        self.class() == 2
    }
}

impl core::fmt::Display for ResponseCode {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}.{:02}", self.class(), self.detail())
    }
}

/// Response to a request that awaited one
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub code: ResponseCode,
    payload: heapless::Vec<u8, RESPONSE_PAYLOAD_CAPACITY>,
    truncated: bool,
}

impl Response {
    /// Copy `payload`, keeping at most [`RESPONSE_PAYLOAD_CAPACITY`] bytes
    pub fn new(code: ResponseCode, payload: &[u8]) -> Self {
        let kept = payload.len().min(RESPONSE_PAYLOAD_CAPACITY);
        let mut buf = heapless::Vec::new();
        // kept never exceeds the capacity
        let _ = buf.extend_from_slice(&payload[..kept]);
        Self {
            code,
            payload: buf,
            truncated: kept < payload.len(),
        }
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Payload as text, if it is UTF-8
    pub fn text(&self) -> Option<&str> {
        core::str::from_utf8(&self.payload).ok()
    }

    /// Whether the peer sent more than the local buffer holds
    pub fn is_truncated(&self) -> bool {
        self.truncated
    }
}

/// CoAP client bound to one peer
pub struct CoapClient<T, D> {
    transport: T,
    delay: D,
    peer: SocketAddrV6,
    next_message_id: u16,
    token_state: u32,
    response_timeout_ms: u32,
}

impl<T, D> CoapClient<T, D>
where
    T: UdpTransport,
    D: DelayNs,
{
    pub fn new(transport: T, delay: D, peer: SocketAddrV6, seed: u32, response_timeout_ms: u32) -> Self {
        Self {
            transport,
            delay,
            peer,
            next_message_id: seed as u16,
            // xorshift has a fixed point at zero
            token_state: if seed == 0 { 0x2545_f491 } else { seed },
            response_timeout_ms,
        }
    }

    pub fn peer(&self) -> SocketAddrV6 {
        self.peer
    }

    /// Delay shared with the owner between requests
    pub fn delay_mut(&mut self) -> &mut D {
        &mut self.delay
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Send `request` and, if it awaits one, return the matching response
    pub async fn send(&mut self, request: &Request<'_>) -> Result<Option<Response>, NodeError> {
        let (datagram, token) = self.encode(request)?;
        debug!(
            "CoAP {:?} to port {} ({} bytes)",
            request.method,
            self.peer.port(),
            datagram.len()
        );
        self.transport
            .send_to(&datagram, self.peer)
            .await
            .map_err(|_| NodeError::Send)?;

        if !request.await_response {
            return Ok(None);
        }

        let timeout_ms = self.response_timeout_ms;
        let Self {
            transport,
            delay,
            peer,
            ..
        } = self;
        match select(
            Self::receive_response(transport, *peer, &token),
            delay.delay_ms(timeout_ms),
        )
        .await
        {
            Either::First(result) => result.map(Some),
            Either::Second(()) => {
                warn!("No CoAP response within {} ms", timeout_ms);
                Err(NodeError::Timeout)
            }
        }
    }

    fn encode(&mut self, request: &Request<'_>) -> Result<(Vec<u8>, [u8; TOKEN_LEN]), NodeError> {
        let token = self.next_token();

        let mut packet = Packet::new();
        packet.header.set_version(1);
        packet.header.set_type(MessageType::NonConfirmable);
        packet.header.code = MessageClass::Request(request.method.into());
        packet.header.message_id = self.next_message_id();
        packet.set_token(token.to_vec());
        for segment in request.path {
            packet.add_option(CoapOption::UriPath, segment.as_bytes().to_vec());
        }
        packet.payload = request.payload.to_vec();

        let bytes = packet.to_bytes().map_err(|_| NodeError::Encode)?;
        if bytes.len() > MAX_MESSAGE_SIZE {
            error!("CoAP message of {} bytes exceeds {}", bytes.len(), MAX_MESSAGE_SIZE);
            return Err(NodeError::Encode);
        }
        Ok((bytes, token))
    }

    async fn receive_response(
        transport: &mut T,
        peer: SocketAddrV6,
        token: &[u8],
    ) -> Result<Response, NodeError> {
        let mut buf = [0u8; RECEIVE_BUFFER_SIZE];
        loop {
            let (len, source) = match transport.recv_from(&mut buf).await {
                Ok(received) => received,
                Err(_) => {
                    warn!("Dropping datagram the transport could not deliver");
                    continue;
                }
            };

            if source.ip() != peer.ip() || source.port() != peer.port() {
                debug!("Ignoring datagram from port {} (not the peer)", source.port());
                continue;
            }

            let packet = match Packet::from_bytes(&buf[..len]) {
                Ok(packet) => packet,
                Err(_) => {
                    warn!("Discarding malformed CoAP message ({} bytes)", len);
                    continue;
                }
            };

            if !matches!(packet.header.code, MessageClass::Response(_)) {
                debug!("Ignoring non-response CoAP message");
                continue;
            }
            if packet.get_token() != token {
                debug!("Ignoring CoAP response with foreign token");
                continue;
            }

            if matches!(packet.header.get_type(), MessageType::Confirmable) {
                Self::acknowledge(transport, peer, packet.header.message_id).await;
            }

            // Code byte sits right after the version/type/token-length byte
            return Ok(Response::new(ResponseCode(buf[1]), &packet.payload));
        }
    }

    async fn acknowledge(transport: &mut T, peer: SocketAddrV6, message_id: u16) {
        let mut ack = Packet::new();
        ack.header.set_version(1);
        ack.header.set_type(MessageType::Acknowledgement);
        ack.header.code = MessageClass::Empty;
        ack.header.message_id = message_id;

        match ack.to_bytes() {
            Ok(bytes) => {
                if transport.send_to(&bytes, peer).await.is_err() {
                    warn!("Failed to acknowledge confirmable response {}", message_id);
                }
            }
            Err(_) => warn!("Failed to encode ACK for {}", message_id),
        }
    }

    fn next_message_id(&mut self) -> u16 {
        let id = self.next_message_id;
        self.next_message_id = self.next_message_id.wrapping_add(1);
        id
    }

    fn next_token(&mut self) -> [u8; TOKEN_LEN] {
        let mut x = self.token_state;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        self.token_state = x;
        x.to_be_bytes()
    }
}
