//! Mesh events flowing through the watcher into the worker

use std::cell::RefCell;
use std::net::SocketAddrV6;
use std::rc::Rc;

use coap_lite::{MessageClass, MessageType, Packet, RequestType};
use coap_node_core::{
    watch, CoapClient, ConnectionMonitor, CycleOutcome, NodeConfig, SensorReport, Worker,
};
use embassy_futures::join::join;
use embassy_futures::select::{select, Either};
use embassy_futures::{block_on, yield_now};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use embedded_hal_async::delay::DelayNs;
use embedded_io_async::{ErrorKind, ErrorType};
use hal_abstractions::{
    ChangedFlags, MeshNetwork, MeshRole, Sensor, SensorChannel, SensorValue, UdpTransport,
};

type Events = Channel<CriticalSectionRawMutex, (ChangedFlags, MeshRole), 4>;

struct ScriptedMesh<'a> {
    events: &'a Events,
    role: MeshRole,
}

impl MeshNetwork for ScriptedMesh<'_> {
    type Error = ();

    fn start(&mut self) -> Result<(), ()> {
        self.role = MeshRole::Detached;
        Ok(())
    }

    fn role(&self) -> MeshRole {
        self.role
    }

    async fn wait_changed(&mut self) -> ChangedFlags {
        let (flags, role) = self.events.receive().await;
        self.role = role;
        flags
    }
}

#[derive(Clone, Default)]
struct Recorder(Rc<RefCell<Vec<(Vec<u8>, SocketAddrV6)>>>);

impl ErrorType for Recorder {
    type Error = ErrorKind;
}

impl UdpTransport for Recorder {
    async fn send_to(&mut self, buf: &[u8], peer: SocketAddrV6) -> Result<(), ErrorKind> {
        self.0.borrow_mut().push((buf.to_vec(), peer));
        Ok(())
    }

    async fn recv_from(&mut self, _buf: &mut [u8]) -> Result<(usize, SocketAddrV6), ErrorKind> {
        core::future::pending().await
    }
}

#[derive(Clone, Default)]
struct InstantDelay(Rc<RefCell<Vec<u32>>>);

impl DelayNs for InstantDelay {
    async fn delay_ns(&mut self, ns: u32) {
        self.0.borrow_mut().push(ns / 1_000_000);
    }

    async fn delay_ms(&mut self, ms: u32) {
        self.0.borrow_mut().push(ms);
    }
}

struct FixedSensor;

impl Sensor for FixedSensor {
    type Error = ();

    async fn sample_fetch(&mut self) -> Result<(), ()> {
        Ok(())
    }

    fn channel_get(&mut self, channel: SensorChannel) -> Result<SensorValue, ()> {
        Ok(match channel {
            SensorChannel::AmbientTemp => SensorValue::from_milli(-4_500),
            SensorChannel::Humidity => SensorValue::from_milli(63_250),
        })
    }
}

#[test]
fn reports_only_while_attached() {
    let events = Events::new();
    let monitor = ConnectionMonitor::new();
    let mut mesh = ScriptedMesh {
        events: &events,
        role: MeshRole::Disabled,
    };

    let transport = Recorder::default();
    let delay = InstantDelay::default();
    let config = NodeConfig::default();
    let client = CoapClient::new(
        transport.clone(),
        delay.clone(),
        config.peer,
        0x1234,
        config.response_timeout_ms,
    );
    let mut worker = Worker::new(
        &monitor,
        client,
        SensorReport::new(FixedSensor, config.report_path),
        &config,
    );

    let scenario = async {
        assert_eq!(monitor.role(), MeshRole::Detached);

        let (outcome, ()) = join(worker.run_cycle(), async {
            yield_now().await;
            assert!(transport.0.borrow().is_empty());
            events
                .send((ChangedFlags::THREAD_ROLE | ChangedFlags::IP6_ADDRESS_ADDED, MeshRole::Child))
                .await;
        })
        .await;
        assert_eq!(outcome, CycleOutcome::Completed);
        assert_eq!(transport.0.borrow().len(), 1);

        events.send((ChangedFlags::THREAD_ROLE, MeshRole::Detached)).await;
        yield_now().await;
        assert!(!monitor.is_connected());

        // Address churn without a role change leaves the node detached
        events.send((ChangedFlags::IP6_ADDRESS_ADDED, MeshRole::Router)).await;
        yield_now().await;
        assert!(!monitor.is_connected());

        let (outcome, ()) = join(worker.run_cycle(), async {
            yield_now().await;
            assert_eq!(transport.0.borrow().len(), 1);
            events.send((ChangedFlags::THREAD_ROLE, MeshRole::Router)).await;
        })
        .await;
        assert_eq!(outcome, CycleOutcome::Completed);
    };

    match block_on(select(watch(&mut mesh, &monitor), scenario)) {
        Either::First(result) => panic!("watcher returned: {result:?}"),
        Either::Second(()) => {}
    }

    let sent = transport.0.borrow();
    assert_eq!(sent.len(), 2);
    let ids: Vec<u16> = sent
        .iter()
        .map(|(datagram, peer)| {
            assert_eq!(*peer, config.peer);
            let packet = Packet::from_bytes(datagram).unwrap();
            assert_eq!(packet.header.get_type(), MessageType::NonConfirmable);
            assert_eq!(packet.header.code, MessageClass::Request(RequestType::Put));
            assert_eq!(packet.payload, [(-4i8) as u8, 50, 0, 63, 25]);
            packet.header.message_id
        })
        .collect();
    assert_eq!(ids, [0x1234, 0x1235]);
    assert_eq!(delay.0.borrow().as_slice(), &[10_000, 10_000]);
}
