//! # Transport channel state machine
//!
//! This module implements the byte level receive/transmit core of the LINE bus.
//! A [`Transport`] owns one independent state machine per channel and is fed by
//! two host entry points:
//! - [`receive`](Transport::receive) - one call per byte arriving from the bus
//! - [`update`](Transport::update) - periodic call (1ms or finer) aging the timeout clock
//!
//! Frames follow `SYNC | REQ_MSB | REQ_LSB | SIZE | payload | CHECKSUM`. After a
//! valid header the application decides through [`Application::responds_to`] and
//! [`Application::prepare_response`] whether this device answers the request; the
//! response body is pushed out through [`LineBus::write_response`]. Complete frames
//! and framing errors are reported upward through [`Application::on_data`] and
//! [`Application::on_error`].
//!
//! ## Available Methods
//!
//! - [`init`](Transport::init) - Reset a channel and select one-wire or two-wire mode
//! - [`receive`](Transport::receive) - Feed one received byte into a channel
//! - [`update`](Transport::update) - Advance the millisecond clock of a channel
//! - [`request`](Transport::request) - Issue a request header on the bus (master role)
//! - [`is_idle`](Transport::is_idle) - Return whether a channel is between frames
//!
//! Both entry points mutate the same per channel state and must not be invoked
//! concurrently for the same channel. Channels are fully independent.

use crate::codec;

/// Maximum silence between two header bytes before the frame is abandoned
pub const REQUEST_TIMEOUT_MS: u32 = 5;
/// Maximum silence between two data bytes before the frame is abandoned
pub const DATA_TIMEOUT_MS: u32 = 5;

/// Framing errors reported through [`Application::on_error`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TransportError {
    /// Inter-byte gap exceeded the timeout of the current state
    Timeout,
    /// Parity check on the 16-bit request word failed
    HeaderInvalid,
    /// Payload checksum mismatch
    DataInvalid,
    /// Declared payload size exceeds the receive buffer
    PartialData,
}

/// Physical layer callouts, implemented at the target
///
/// Writes happen synchronously from within [`Transport::receive`]; on constrained
/// targets the implementation may enqueue the bytes to a transmit FIFO. The
/// default implementations do nothing, which is valid for a receive-only build.
pub trait LineBus {
    /// Write a response body to the bus: the size byte, `payload` and `checksum`
    fn write_response(&mut self, channel: u8, payload: &[u8], checksum: u8) {
        let _ = (channel, payload, checksum);
    }

    /// Write the sync byte and the 16-bit request header to the bus
    fn write_request(&mut self, channel: u8, request: u16) {
        let _ = (channel, request);
    }
}

/// Receive-only build without a transmit path
impl LineBus for () {}

/// Upward interface of the transport layer
///
/// Every method has an empty default so hosts only implement the hooks they
/// need; a device that never answers and never consumes data is legal.
pub trait Application {
    /// Called after a valid request header; return true if this device responds
    fn responds_to(&mut self, channel: u8, request: u16) -> bool {
        let _ = (channel, request);
        false
    }

    /// Fill `payload` with the response body for `request` and return its size,
    /// or `None` to decline answering after all
    fn prepare_response(&mut self, channel: u8, request: u16, payload: &mut [u8]) -> Option<u8> {
        let _ = (channel, request, payload);
        None
    }

    /// Called when a complete frame with a valid checksum was received.
    /// `responding` is true when the body is this device's own response
    /// observed in one-wire mode.
    fn on_data(&mut self, channel: u8, responding: bool, request: u16, payload: &[u8]) {
        let _ = (channel, responding, request, payload);
    }

    /// Called once for every framing error; the channel is back between frames
    fn on_error(&mut self, channel: u8, responding: bool, request: u16, error: TransportError) {
        let _ = (channel, responding, request, error);
    }
}

/// Pure listener without any application layer
impl Application for () {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    WaitSync,
    WaitRequestMsb,
    WaitRequestLsb,
    WaitSize,
    WaitData,
    WaitChecksum,
}

/// Receive state of a single bus channel
#[derive(Clone, Copy)]
struct Channel<const RX: usize, const TX: usize> {
    one_wire: bool,
    state: State,
    timestamp: u32,
    last_received: u32,
    request: u16,
    responding: bool,
    size: u8,
    count: u8,
    checksum: u8,
    rx_buffer: [u8; RX],
    tx_size: u8,
    tx_buffer: [u8; TX],
}

impl<const RX: usize, const TX: usize> Channel<RX, TX> {
    const fn new() -> Self {
        Channel {
            one_wire: false,
            state: State::WaitSync,
            timestamp: 0,
            last_received: 0,
            request: 0,
            responding: false,
            size: 0,
            count: 0,
            checksum: 0,
            rx_buffer: [0; RX],
            tx_size: 0,
            tx_buffer: [0; TX],
        }
    }
}

/// Transport core multiplexing `N` independent bus channels
///
/// `B` is the physical write seam, `A` the application layer. `RX`/`TX` size
/// the per channel frame buffers; a frame whose declared size exceeds `RX` is
/// consumed without storing payload bytes and reported as
/// [`TransportError::PartialData`], keeping the framing in sync.
pub struct Transport<B, A, const N: usize = 1, const RX: usize = 255, const TX: usize = 255> {
    channels: [Channel<RX, TX>; N],
    bus: B,
    app: A,
}

impl<B, A, const N: usize, const RX: usize, const TX: usize> Transport<B, A, N, RX, TX>
where
    B: LineBus,
    A: Application,
{
    /// Create a transport core with all channels reset and in two-wire mode
    pub fn new(bus: B, app: A) -> Self {
        Transport { channels: [Channel::new(); N], bus, app }
    }

    /// Reset a channel to the idle state and record its wiring mode
    ///
    /// In one-wire mode the device receives its own transmissions, in two-wire
    /// mode it does not. Out of range channels are ignored.
    pub fn init(&mut self, channel: u8, one_wire: bool) {
        let Some(ch) = self.channels.get_mut(channel as usize) else {
            return;
        };
        ch.state = State::WaitSync;
        ch.timestamp = 0;
        ch.last_received = 0;
        ch.one_wire = one_wire;
    }

    /// Feed one byte received from the bus into the channel state machine
    pub fn receive(&mut self, channel: u8, byte: u8) {
        let Transport { channels, bus, app } = self;
        let Some(ch) = channels.get_mut(channel as usize) else {
            return;
        };
        ch.last_received = ch.timestamp;

        match ch.state {
            State::WaitSync => {
                if byte == codec::SYNC_BYTE {
                    ch.state = State::WaitRequestMsb;
                }
            }
            State::WaitRequestMsb => {
                ch.request = (byte as u16) << 8;
                ch.state = State::WaitRequestLsb;
            }
            State::WaitRequestLsb => {
                ch.request |= byte as u16;
                if ch.request == codec::request_code(ch.request & codec::REQUEST_PARITY_MASK) {
                    ch.request &= codec::REQUEST_PARITY_MASK;
                    ch.responding = app.responds_to(channel, ch.request);
                    ch.state = State::WaitSize;

                    if ch.responding {
                        match app.prepare_response(channel, ch.request, &mut ch.tx_buffer) {
                            Some(size) => {
                                ch.tx_size = if (size as usize) > TX { TX as u8 } else { size };
                                let body = &ch.tx_buffer[..ch.tx_size as usize];
                                let checksum = codec::checksum(body);
                                if !ch.one_wire {
                                    // Two-wire: we will not see our own bytes
                                    ch.state = State::WaitSync;
                                }
                                bus.write_response(channel, body, checksum);
                            }
                            // Declined at the last moment: keep observing the bus,
                            // the frame may still complete or time out
                            None => {}
                        }
                    }
                } else {
                    ch.state = State::WaitSync;
                    app.on_error(channel, false, ch.request, TransportError::HeaderInvalid);
                }
            }
            State::WaitSize => {
                ch.size = byte;
                ch.count = 0;
                ch.checksum = byte.wrapping_add(codec::DATA_CHECKSUM_OFFSET);
                ch.state = if byte == 0 { State::WaitChecksum } else { State::WaitData };
            }
            State::WaitData => {
                if (ch.size as usize) <= RX {
                    ch.rx_buffer[ch.count as usize] = byte;
                }
                ch.checksum = ch.checksum.wrapping_add(byte);
                ch.count += 1;
                if ch.count >= ch.size {
                    ch.state = State::WaitChecksum;
                }
            }
            State::WaitChecksum => {
                ch.state = State::WaitSync;
                if (ch.size as usize) > RX {
                    app.on_error(channel, ch.responding, ch.request, TransportError::PartialData);
                } else if byte == ch.checksum {
                    app.on_data(channel, ch.responding, ch.request, &ch.rx_buffer[..ch.size as usize]);
                } else {
                    app.on_error(channel, ch.responding, ch.request, TransportError::DataInvalid);
                }
            }
        }
    }

    /// Advance the channel clock by `elapsed` milliseconds
    ///
    /// When the channel is mid-frame and the silence since the last byte exceeds
    /// the state's threshold the frame is abandoned with
    /// [`TransportError::Timeout`].
    pub fn update(&mut self, channel: u8, elapsed: u32) {
        let Transport { channels, app, .. } = self;
        let Some(ch) = channels.get_mut(channel as usize) else {
            return;
        };
        ch.timestamp = ch.timestamp.wrapping_add(elapsed);

        let timeout = match ch.state {
            State::WaitRequestMsb | State::WaitRequestLsb => REQUEST_TIMEOUT_MS,
            State::WaitSize | State::WaitData | State::WaitChecksum => DATA_TIMEOUT_MS,
            State::WaitSync => return,
        };
        if ch.timestamp.wrapping_sub(ch.last_received) > timeout {
            ch.state = State::WaitSync;
            app.on_error(channel, ch.responding, ch.request, TransportError::Timeout);
        }
    }

    /// Issue a request header on the bus (master role)
    ///
    /// Silently dropped while the channel is mid-frame (bus busy). In two-wire
    /// mode the channel then expects the addressed slave's response body.
    pub fn request(&mut self, channel: u8, request_id: u16) {
        let Transport { channels, bus, .. } = self;
        let Some(ch) = channels.get_mut(channel as usize) else {
            return;
        };
        if ch.state != State::WaitSync {
            return;
        }
        ch.request = request_id & codec::REQUEST_PARITY_MASK;
        ch.responding = false;
        bus.write_request(channel, codec::request_code(ch.request));
        if !ch.one_wire {
            ch.state = State::WaitSize;
        }
    }

    /// Return true when the channel is between frames and a request can be issued
    pub fn is_idle(&self, channel: u8) -> bool {
        self.channels
            .get(channel as usize)
            .is_some_and(|ch| ch.state == State::WaitSync)
    }

    /// Borrow the application layer
    pub fn application(&self) -> &A {
        &self.app
    }

    /// Borrow the application layer mutably, e.g. for registration at init
    pub fn application_mut(&mut self) -> &mut A {
        &mut self.app
    }

    /// Borrow the physical write seam
    pub fn bus(&self) -> &B {
        &self.bus
    }

    /// Borrow the physical write seam mutably
    pub fn bus_mut(&mut self) -> &mut B {
        &mut self.bus
    }
}
