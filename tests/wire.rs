//! SerialBus adapter: frame bytes emitted through embedded-io ports.

use core::convert::Infallible;

use line_protocol::codec;
use line_protocol::transport::LineBus;
use line_protocol::wire::SerialBus;

/// In-memory port collecting everything written to it
#[derive(Default)]
struct SinkPort {
    bytes: Vec<u8>,
    flushes: usize,
}

impl embedded_io::ErrorType for SinkPort {
    type Error = Infallible;
}

impl embedded_io::Write for SinkPort {
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        self.bytes.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        self.flushes += 1;
        Ok(())
    }
}

#[test]
fn request_goes_out_as_sync_and_header() {
    let mut bus = SerialBus::new(SinkPort::default());
    let word = codec::request_code(0x0155);
    bus.write_request(0, word);

    let port = bus.port_mut(0).unwrap();
    assert_eq!(port.bytes, vec![0x55, (word >> 8) as u8, (word & 0xFF) as u8]);
    assert_eq!(port.flushes, 1);
}

#[test]
fn response_goes_out_as_size_payload_checksum() {
    let mut bus = SerialBus::new(SinkPort::default());
    let payload = [0x0A, 0x0B, 0x0C];
    bus.write_response(0, &payload, codec::checksum(&payload));

    let port = bus.port_mut(0).unwrap();
    assert_eq!(port.bytes, vec![0x03, 0x0A, 0x0B, 0x0C, codec::checksum(&payload)]);
}

#[test]
fn channels_map_to_their_own_port() {
    let mut bus: SerialBus<SinkPort, 2> =
        SerialBus::from_ports([SinkPort::default(), SinkPort::default()]);
    bus.write_response(1, &[0x01], codec::checksum(&[0x01]));

    assert!(bus.port_mut(0).unwrap().bytes.is_empty());
    assert_eq!(bus.port_mut(1).unwrap().bytes.len(), 3);
}

#[test]
fn out_of_range_channel_writes_nowhere() {
    let mut bus = SerialBus::new(SinkPort::default());
    bus.write_request(3, 0x1234);
    bus.write_response(3, &[0x01], 0x00);

    assert!(bus.port_mut(0).unwrap().bytes.is_empty());
    assert!(bus.port_mut(3).is_none());
}
