//! Application actions performed once per worker cycle

use core::future::Future;

use embedded_hal_async::delay::DelayNs;
use hal_abstractions::{Sensor, SensorChannel, UdpTransport};

use crate::coap::{CoapClient, Request, Response};
use crate::error::NodeError;
use crate::payload::SensorPayload;

/// One unit of application work
///
/// Implementors log their own failures; the worker only decides whether
/// the loop continues.
pub trait NodeAction {
    fn perform<T, D>(
        &mut self,
        client: &mut CoapClient<T, D>,
    ) -> impl Future<Output = Result<(), NodeError>>
    where
        T: UdpTransport,
        D: DelayNs;
}

/// Sample the sensor and PUT the packed reading
pub struct SensorReport<S> {
    sensor: S,
    path: &'static [&'static str],
    last_payload: Option<SensorPayload>,
}

impl<S: Sensor> SensorReport<S> {
    pub fn new(sensor: S, path: &'static [&'static str]) -> Self {
        Self {
            sensor,
            path,
            last_payload: None,
        }
    }

    /// Payload of the most recent report that reached the transport
    pub fn last_payload(&self) -> Option<SensorPayload> {
        self.last_payload
    }

    async fn read(&mut self) -> Result<SensorPayload, NodeError> {
        self.sensor.sample_fetch().await.map_err(|_| {
            error!("Sensor sample update error");
            NodeError::SensorFetch
        })?;

        let temperature = self
            .sensor
            .channel_get(SensorChannel::AmbientTemp)
            .map_err(|_| {
                error!("Cannot read temperature channel");
                NodeError::SensorChannel(SensorChannel::AmbientTemp)
            })?;

        let humidity = self
            .sensor
            .channel_get(SensorChannel::Humidity)
            .map_err(|_| {
                error!("Cannot read humidity channel");
                NodeError::SensorChannel(SensorChannel::Humidity)
            })?;

        debug!(
            "Temperature: {}.{} C, humidity: {}.{} %",
            temperature.val1,
            temperature.centis(),
            humidity.val1,
            humidity.centis()
        );
        Ok(SensorPayload::pack(temperature, humidity))
    }
}

impl<S: Sensor> NodeAction for SensorReport<S> {
    async fn perform<T, D>(&mut self, client: &mut CoapClient<T, D>) -> Result<(), NodeError>
    where
        T: UdpTransport,
        D: DelayNs,
    {
        let payload = self.read().await?;

        info!("Sending CoAP");
        match client.send(&Request::put(self.path, payload.as_bytes())).await {
            Ok(_) => {
                info!("CoAP sent");
                self.last_payload = Some(payload);
                Ok(())
            }
            Err(e) => {
                error!("Failed sending CoAP: {:?}", e);
                Err(e)
            }
        }
    }
}

/// GET a resource and log its payload
pub struct ResourcePoll {
    path: &'static [&'static str],
    last_response: Option<Response>,
}

impl ResourcePoll {
    pub fn new(path: &'static [&'static str]) -> Self {
        Self {
            path,
            last_response: None,
        }
    }

    pub fn last_response(&self) -> Option<&Response> {
        self.last_response.as_ref()
    }
}

impl NodeAction for ResourcePoll {
    async fn perform<T, D>(&mut self, client: &mut CoapClient<T, D>) -> Result<(), NodeError>
    where
        T: UdpTransport,
        D: DelayNs,
    {
        let response = match client.send(&Request::get(self.path)).await {
            Ok(Some(response)) => response,
            Ok(None) => return Ok(()),
            Err(e) => {
                error!("CoAP GET failed: {:?}", e);
                return Err(e);
            }
        };

        if !response.code.is_success() {
            warn!("CoAP GET answered with {:?}", response.code);
        }
        if response.is_truncated() {
            warn!(
                "Response payload truncated to {} bytes",
                response.payload().len()
            );
        }
        match response.text() {
            Some(text) => info!("CoAP response: {}", text),
            None => info!(
                "CoAP response: {} bytes of binary payload",
                response.payload().len()
            ),
        }

        self.last_response = Some(response);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coap::{ResponseCode, RESPONSE_PAYLOAD_CAPACITY};
    use crate::mock::{MockDelay, MockSensor, MockTransport, SensorFault};
    use coap_lite::{MessageClass, MessageType, Packet, RequestType, ResponseType};
    use core::net::{Ipv6Addr, SocketAddrV6};
    use embassy_futures::block_on;
    use hal_abstractions::SensorValue;

    fn client(transport: &MockTransport) -> CoapClient<MockTransport, MockDelay> {
        let peer = SocketAddrV6::new(Ipv6Addr::LOCALHOST, 5683, 0, 0);
        CoapClient::new(transport.clone(), MockDelay::new(), peer, 1, 2000)
    }

    fn sensor() -> MockSensor {
        MockSensor::new(SensorValue::new(22, 370_000), SensorValue::new(48, 120_000))
    }

    fn reply(payload: &'static [u8], code: ResponseType) -> impl FnMut(&[u8]) -> Option<Vec<u8>> {
        move |request| {
            let request = Packet::from_bytes(request).ok()?;
            let mut response = Packet::new();
            response.header.set_type(MessageType::NonConfirmable);
            response.header.code = MessageClass::Response(code);
            response.set_token(request.get_token().to_vec());
            response.payload = payload.to_vec();
            response.to_bytes().ok()
        }
    }

    #[test]
    fn report_puts_packed_reading() {
        let transport = MockTransport::new();
        let mut client = client(&transport);
        let mut report = SensorReport::new(sensor(), &["ambient"]);

        block_on(report.perform(&mut client)).unwrap();

        let sent = transport.sent();
        assert_eq!(sent.len(), 1);
        let packet = Packet::from_bytes(&sent[0].0).unwrap();
        assert_eq!(packet.header.code, MessageClass::Request(RequestType::Put));
        assert_eq!(packet.payload, [22, 37, 0, 48, 12]);
        assert_eq!(report.last_payload().unwrap().as_bytes(), &[22, 37, 0, 48, 12]);
    }

    #[test]
    fn report_sensor_failures_send_nothing() {
        for (fault, expected) in [
            (SensorFault::Fetch, NodeError::SensorFetch),
            (
                SensorFault::Temperature,
                NodeError::SensorChannel(SensorChannel::AmbientTemp),
            ),
            (
                SensorFault::Humidity,
                NodeError::SensorChannel(SensorChannel::Humidity),
            ),
        ] {
            let transport = MockTransport::new();
            let mut client = client(&transport);
            let sensor = sensor();
            sensor.set_fault(Some(fault));
            let mut report = SensorReport::new(sensor, &["ambient"]);

            let err = block_on(report.perform(&mut client)).unwrap_err();
            assert_eq!(err, expected);
            assert!(err.is_sensor_failure());
            assert!(transport.sent().is_empty());
            assert!(report.last_payload().is_none());
        }
    }

    #[test]
    fn report_send_failure_is_returned() {
        let transport = MockTransport::new();
        transport.fail_sends(true);
        let mut client = client(&transport);
        let mut report = SensorReport::new(sensor(), &["ambient"]);

        let err = block_on(report.perform(&mut client)).unwrap_err();
        assert_eq!(err, NodeError::Send);
        assert!(!err.is_sensor_failure());
    }

    #[test]
    fn poll_keeps_text_response() {
        let transport = MockTransport::new();
        transport.respond_with(reply(b"hello mesh", ResponseType::Content));
        let mut client = client(&transport);
        let mut poll = ResourcePoll::new(&["ambient"]);

        block_on(poll.perform(&mut client)).unwrap();

        let packet = Packet::from_bytes(&transport.sent()[0].0).unwrap();
        assert_eq!(packet.header.code, MessageClass::Request(RequestType::Get));
        assert!(packet.payload.is_empty());

        let response = poll.last_response().unwrap();
        assert_eq!(response.code, ResponseCode::CONTENT);
        assert_eq!(response.text(), Some("hello mesh"));
    }

    #[test]
    fn poll_bounds_oversized_payload() {
        static LONG: [u8; 100] = [b'a'; 100];
        let transport = MockTransport::new();
        transport.respond_with(reply(&LONG, ResponseType::Content));
        let mut client = client(&transport);
        let mut poll = ResourcePoll::new(&["ambient"]);

        block_on(poll.perform(&mut client)).unwrap();

        let response = poll.last_response().unwrap();
        assert!(response.is_truncated());
        assert_eq!(response.payload(), &LONG[..RESPONSE_PAYLOAD_CAPACITY]);
    }

    #[test]
    fn poll_accepts_error_codes_and_binary() {
        let transport = MockTransport::new();
        transport.respond_with(reply(&[0xff, 0xfe], ResponseType::NotFound));
        let mut client = client(&transport);
        let mut poll = ResourcePoll::new(&["missing"]);

        block_on(poll.perform(&mut client)).unwrap();

        let response = poll.last_response().unwrap();
        assert_eq!(response.code, ResponseCode::NOT_FOUND);
        assert_eq!(response.text(), None);
    }

    #[test]
    fn poll_timeout_is_returned() {
        let transport = MockTransport::new();
        let mut client = client(&transport);
        let mut poll = ResourcePoll::new(&["ambient"]);

        assert_eq!(block_on(poll.perform(&mut client)), Err(NodeError::Timeout));
        assert!(poll.last_response().is_none());
    }
}
