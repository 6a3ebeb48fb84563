//! Test doubles for the platform traits

use std::boxed::Box;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::net::SocketAddrV6;
use std::rc::Rc;
use std::vec::Vec;

use embedded_hal_async::delay::DelayNs;
use embedded_io_async::{ErrorKind, ErrorType};
use hal_abstractions::{Sensor, SensorChannel, SensorValue, UdpTransport};

type Responder = Box<dyn FnMut(&[u8]) -> Option<Vec<u8>>>;

#[derive(Default)]
struct TransportState {
    sent: Vec<(Vec<u8>, SocketAddrV6)>,
    incoming: VecDeque<(Vec<u8>, SocketAddrV6)>,
    responder: Option<Responder>,
    fail_sends: bool,
}

/// Loopback transport recording every datagram
#[derive(Clone, Default)]
pub struct MockTransport {
    state: Rc<RefCell<TransportState>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer each sent datagram from the destination it was sent to
    pub fn respond_with(&self, responder: impl FnMut(&[u8]) -> Option<Vec<u8>> + 'static) {
        self.state.borrow_mut().responder = Some(Box::new(responder));
    }

    pub fn push_incoming(&self, datagram: Vec<u8>, source: SocketAddrV6) {
        self.state.borrow_mut().incoming.push_back((datagram, source));
    }

    pub fn fail_sends(&self, fail: bool) {
        self.state.borrow_mut().fail_sends = fail;
    }

    pub fn sent(&self) -> Vec<(Vec<u8>, SocketAddrV6)> {
        self.state.borrow().sent.clone()
    }
}

impl ErrorType for MockTransport {
    type Error = ErrorKind;
}

impl UdpTransport for MockTransport {
    async fn send_to(&mut self, buf: &[u8], peer: SocketAddrV6) -> Result<(), ErrorKind> {
        let mut state = self.state.borrow_mut();
        if state.fail_sends {
            return Err(ErrorKind::BrokenPipe);
        }
        state.sent.push((buf.to_vec(), peer));
        let reply = state.responder.as_mut().and_then(|respond| respond(buf));
        if let Some(reply) = reply {
            state.incoming.push_back((reply, peer));
        }
        Ok(())
    }

    async fn recv_from(&mut self, buf: &mut [u8]) -> Result<(usize, SocketAddrV6), ErrorKind> {
        let next = self.state.borrow_mut().incoming.pop_front();
        match next {
            // Oversized datagrams are consumed and reported, as embassy-net does
            Some((datagram, _)) if datagram.len() > buf.len() => Err(ErrorKind::OutOfMemory),
            Some((datagram, source)) => {
                buf[..datagram.len()].copy_from_slice(&datagram);
                Ok((datagram.len(), source))
            }
            None => core::future::pending().await,
        }
    }
}

/// Delay that returns at once and records the requested milliseconds
#[derive(Clone, Default)]
pub struct MockDelay {
    calls: Rc<RefCell<Vec<u32>>>,
}

impl MockDelay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<u32> {
        self.calls.borrow().clone()
    }
}

impl DelayNs for MockDelay {
    async fn delay_ns(&mut self, ns: u32) {
        self.calls.borrow_mut().push(ns / 1_000_000);
    }

    async fn delay_ms(&mut self, ms: u32) {
        self.calls.borrow_mut().push(ms);
    }
}

/// Which sensor step fails
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorFault {
    Fetch,
    Temperature,
    Humidity,
}

struct SensorState {
    temperature: SensorValue,
    humidity: SensorValue,
    fault: Option<SensorFault>,
    fetches: usize,
}

/// Sensor returning fixed readings with an injectable fault
#[derive(Clone)]
pub struct MockSensor {
    state: Rc<RefCell<SensorState>>,
}

impl MockSensor {
    pub fn new(temperature: SensorValue, humidity: SensorValue) -> Self {
        Self {
            state: Rc::new(RefCell::new(SensorState {
                temperature,
                humidity,
                fault: None,
                fetches: 0,
            })),
        }
    }

    pub fn set_fault(&self, fault: Option<SensorFault>) {
        self.state.borrow_mut().fault = fault;
    }

    pub fn fetches(&self) -> usize {
        self.state.borrow().fetches
    }
}

impl Sensor for MockSensor {
    type Error = SensorFault;

    async fn sample_fetch(&mut self) -> Result<(), SensorFault> {
        let mut state = self.state.borrow_mut();
        state.fetches += 1;
        match state.fault {
            Some(SensorFault::Fetch) => Err(SensorFault::Fetch),
            _ => Ok(()),
        }
    }

    fn channel_get(&mut self, channel: SensorChannel) -> Result<SensorValue, SensorFault> {
        let state = self.state.borrow();
        match (channel, state.fault) {
            (SensorChannel::AmbientTemp, Some(SensorFault::Temperature)) => {
                Err(SensorFault::Temperature)
            }
            (SensorChannel::Humidity, Some(SensorFault::Humidity)) => Err(SensorFault::Humidity),
            (SensorChannel::AmbientTemp, _) => Ok(state.temperature),
            (SensorChannel::Humidity, _) => Ok(state.humidity),
        }
    }
}
