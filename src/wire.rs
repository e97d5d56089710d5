//! # Serial bus adapter
//!
//! [`SerialBus`] implements the transport's [`LineBus`] write seam on top of
//! any [`embedded_io::Write`] port, one port per channel. Requests go out as
//! `SYNC | REQ_MSB | REQ_LSB`, responses as `SIZE | payload | CHECKSUM`.

use embedded_io::Write;

use crate::codec;
use crate::transport::LineBus;

/// [`LineBus`] writing frames through one serial port per channel
pub struct SerialBus<W, const N: usize = 1> {
    ports: [W; N],
}

impl<W: Write> SerialBus<W> {
    /// Single channel bus over one port
    pub fn new(port: W) -> Self {
        SerialBus { ports: [port] }
    }
}

impl<W: Write, const N: usize> SerialBus<W, N> {
    /// Multi channel bus, `ports[i]` serves transport channel `i`
    pub fn from_ports(ports: [W; N]) -> Self {
        SerialBus { ports }
    }

    /// Borrow the port behind a channel
    pub fn port_mut(&mut self, channel: u8) -> Option<&mut W> {
        self.ports.get_mut(channel as usize)
    }
}

impl<W: Write, const N: usize> LineBus for SerialBus<W, N> {
    fn write_response(&mut self, channel: u8, payload: &[u8], checksum: u8) {
        let Some(port) = self.ports.get_mut(channel as usize) else {
            return;
        };
        // Write failures are not reported upward
        let _ = port.write_all(&[payload.len() as u8]);
        let _ = port.write_all(payload);
        let _ = port.write_all(&[checksum]);
        let _ = port.flush();
    }

    fn write_request(&mut self, channel: u8, request: u16) {
        let Some(port) = self.ports.get_mut(channel as usize) else {
            return;
        };
        let _ = port.write_all(&[codec::SYNC_BYTE, (request >> 8) as u8, (request & 0xFF) as u8]);
        let _ = port.flush();
    }
}
