//! # Diagnostics dispatcher
//!
//! Every device on a LINE bus carries a diagnostic layer next to its
//! application traffic. A [`DiagChannel`] owns the diagnostic configuration of
//! one transport channel: the assigned bus address, callouts for the well-known
//! broadcast commands, accessors for the mandatory unicast data and two fixed
//! capacity registries for application defined unicast requests.
//!
//! ## Request identifier space
//!
//! | Range           | Meaning                                         |
//! |-----------------|-------------------------------------------------|
//! | `0x0000`        | Wakeup broadcast                                |
//! | `0x0100-0x01FF` | Other broadcast commands                        |
//! | `0x0200-0x0FFF` | Unicast commands, low nibble = device address   |
//!
//! A unicast request encodes the target in its low four bits, see
//! [`unicast_id`]. Address `0x0` means unassigned: the device keeps listening
//! to broadcasts but never answers unicast requests. `0xF` is reserved.
//!
//! ## Available Methods
//!
//! - [`set_address`](DiagChannel::set_address) - Assign the bus address
//! - [`register_unicast_listener`](DiagChannel::register_unicast_listener) - Consume a unicast request
//! - [`register_unicast_publisher`](DiagChannel::register_unicast_publisher) - Answer a unicast request
//! - [`responds_to`](DiagChannel::responds_to) / [`listens_to`](DiagChannel::listens_to) - Routing queries
//! - [`prepare_response`](DiagChannel::prepare_response) / [`on_request`](DiagChannel::on_request) - Dispatch

use heapless::Vec;

use crate::status::{OpStatus, PowerStatus, SoftwareVersion};

/// Lowest broadcast command identifier (wakeup sits below at 0x0000)
pub const BROADCAST_ID_MIN: u16 = 0x0100;
/// Highest broadcast command identifier
pub const BROADCAST_ID_MAX: u16 = 0x01FF;
/// Lowest unicast command identifier
pub const UNICAST_ID_MIN: u16 = 0x0200;
/// Highest unicast command identifier
pub const UNICAST_ID_MAX: u16 = 0x0FFF;

/// Address of a device that has not been assigned one
pub const UNASSIGNED_ADDRESS: u8 = 0x0;
/// Highest assignable device address
pub const ADDRESS_MAX: u8 = 0xE;
/// Reserved broadcast sub-address
pub const BROADCAST_ADDRESS: u8 = 0xF;

/// Wakeup broadcast
pub const REQUEST_WAKEUP: u16 = 0x0000;
/// Idle/sleep broadcast
pub const REQUEST_IDLE: u16 = 0x0100;
/// Shutdown broadcast
pub const REQUEST_SHUTDOWN: u16 = 0x0101;
/// Conditional address change broadcast, payload = serial (LE) + new address
pub const REQUEST_CONDITIONAL_CHANGE_ADDRESS: u16 = 0x01E0;

/// Operational status unicast, 1 byte response
pub const REQUEST_OP_STATUS: u16 = 0x0200;
/// Power status unicast, 4 byte response
pub const REQUEST_POWER_STATUS: u16 = 0x0210;
/// Serial number unicast, 4 byte little-endian response
pub const REQUEST_SERIAL_NUMBER: u16 = 0x0220;
/// Software version unicast, 4 byte response
pub const REQUEST_SW_VERSION: u16 = 0x0230;

/// Combine a unicast command base with a device address
pub const fn unicast_id(request: u16, address: u8) -> u16 {
    request | address as u16
}

/// Callback consuming a matched unicast request
pub type ListenerCallback = fn(request: u16, payload: &[u8]);
/// Callback producing the response payload for a matched unicast request,
/// returns the payload size or `None` to decline
pub type PublisherCallback = fn(request: u16, payload: &mut [u8]) -> Option<u8>;

/// Diagnostic configuration of one transport channel
///
/// All callouts and accessors are optional; a missing accessor makes the
/// device decline the corresponding mandatory request.
#[derive(Default, Clone, Copy)]
pub struct DiagConfig {
    /// Transport channel this configuration belongs to
    pub transport_channel: u8,
    /// Assigned bus address, [`UNASSIGNED_ADDRESS`] until configured
    pub address: u8,
    /// Invoked on the wakeup broadcast
    pub on_wakeup: Option<fn()>,
    /// Invoked on the idle/sleep broadcast
    pub on_idle: Option<fn()>,
    /// Invoked on the shutdown broadcast
    pub on_shutdown: Option<fn()>,
    /// Invoked after a conditional address change with the old and new address
    pub on_conditional_change_address: Option<fn(old: u8, new: u8)>,
    /// Operational status accessor
    pub op_status: Option<fn() -> OpStatus>,
    /// Power status accessor
    pub power_status: Option<fn() -> PowerStatus>,
    /// Serial number accessor, also required for conditional address change
    pub serial_number: Option<fn() -> u32>,
    /// Software version accessor
    pub software_version: Option<fn() -> SoftwareVersion>,
}

struct ListenerEntry {
    request: u16,
    callback: ListenerCallback,
}

struct PublisherEntry {
    request: u16,
    callback: PublisherCallback,
}

/// Diagnostic state of one transport channel
///
/// `L` and `P` bound the listener and publisher registries. Registration order
/// is preserved and the first matching entry wins.
pub struct DiagChannel<const L: usize = 8, const P: usize = 8> {
    config: DiagConfig,
    listeners: Vec<ListenerEntry, L>,
    publishers: Vec<PublisherEntry, P>,
}

impl<const L: usize, const P: usize> DiagChannel<L, P> {
    /// Create the diagnostic state for the transport channel named in `config`
    pub fn new(config: DiagConfig) -> Self {
        DiagChannel {
            config,
            listeners: Vec::new(),
            publishers: Vec::new(),
        }
    }

    /// Transport channel this diagnostic channel is keyed to
    pub fn transport_channel(&self) -> u8 {
        self.config.transport_channel
    }

    /// Currently assigned bus address
    pub fn address(&self) -> u8 {
        self.config.address
    }

    /// Assign the bus address, [`UNASSIGNED_ADDRESS`] stops unicast handling
    pub fn set_address(&mut self, address: u8) {
        self.config.address = address;
    }

    /// Register a callback consuming the unicast request `request | address`
    ///
    /// Registration beyond the `L` capacity is ignored.
    pub fn register_unicast_listener(&mut self, request: u16, callback: ListenerCallback) {
        let overflow = self.listeners.push(ListenerEntry { request, callback }).is_err();
        debug_assert!(!overflow, "unicast listener registry full");
    }

    /// Register a callback answering the unicast request `request | address`
    ///
    /// Registration beyond the `P` capacity is ignored.
    pub fn register_unicast_publisher(&mut self, request: u16, callback: PublisherCallback) {
        let overflow = self.publishers.push(PublisherEntry { request, callback }).is_err();
        debug_assert!(!overflow, "unicast publisher registry full");
    }

    /// Return whether this device answers `request`
    ///
    /// An unassigned device never answers, not even the mandatory commands.
    pub fn responds_to(&self, request: u16) -> bool {
        let address = self.config.address;
        if address == UNASSIGNED_ADDRESS {
            return false;
        }
        request == unicast_id(REQUEST_OP_STATUS, address)
            || request == unicast_id(REQUEST_POWER_STATUS, address)
            || request == unicast_id(REQUEST_SERIAL_NUMBER, address)
            || request == unicast_id(REQUEST_SW_VERSION, address)
            || self.publishers.iter().any(|p| request == unicast_id(p.request, address))
    }

    /// Fill `payload` with the response body for `request`
    ///
    /// Returns the payload size, or `None` when the device declines: not
    /// assigned, accessor not configured, or the publisher refused.
    pub fn prepare_response(&mut self, request: u16, payload: &mut [u8]) -> Option<u8> {
        let address = self.config.address;
        if address == UNASSIGNED_ADDRESS {
            return None;
        }
        if request == unicast_id(REQUEST_OP_STATUS, address) {
            let status = (self.config.op_status?)();
            *payload.first_mut()? = status.into();
            Some(1)
        } else if request == unicast_id(REQUEST_POWER_STATUS, address) {
            let status = (self.config.power_status?)();
            payload.get_mut(..4)?.copy_from_slice(&status.to_bytes());
            Some(4)
        } else if request == unicast_id(REQUEST_SERIAL_NUMBER, address) {
            let serial = (self.config.serial_number?)();
            payload.get_mut(..4)?.copy_from_slice(&serial.to_le_bytes());
            Some(4)
        } else if request == unicast_id(REQUEST_SW_VERSION, address) {
            let version = (self.config.software_version?)();
            payload.get_mut(..4)?.copy_from_slice(&version.to_bytes());
            Some(4)
        } else {
            let entry = self
                .publishers
                .iter()
                .find(|p| request == unicast_id(p.request, address))?;
            (entry.callback)(request, payload)
        }
    }

    /// Return whether this device consumes `request`
    ///
    /// The well-known broadcasts are always listened to; unicast requests only
    /// match registered listeners at the currently assigned address.
    pub fn listens_to(&self, request: u16) -> bool {
        match request {
            REQUEST_WAKEUP | REQUEST_IDLE | REQUEST_SHUTDOWN
            | REQUEST_CONDITIONAL_CHANGE_ADDRESS => true,
            _ => {
                let address = self.config.address;
                address != UNASSIGNED_ADDRESS
                    && self.listeners.iter().any(|l| request == unicast_id(l.request, address))
            }
        }
    }

    /// Dispatch a received request to the matching callout or listener
    pub fn on_request(&mut self, request: u16, payload: &[u8]) {
        match request {
            REQUEST_WAKEUP => {
                if let Some(callout) = self.config.on_wakeup {
                    callout();
                }
            }
            REQUEST_IDLE => {
                if let Some(callout) = self.config.on_idle {
                    callout();
                }
            }
            REQUEST_SHUTDOWN => {
                if let Some(callout) = self.config.on_shutdown {
                    callout();
                }
            }
            REQUEST_CONDITIONAL_CHANGE_ADDRESS => self.conditional_change_address(payload),
            _ => {
                let address = self.config.address;
                if address == UNASSIGNED_ADDRESS {
                    return;
                }
                if let Some(entry) = self
                    .listeners
                    .iter()
                    .find(|l| request == unicast_id(l.request, address))
                {
                    (entry.callback)(request, payload);
                }
            }
        }
    }

    // Payload: 4 byte little-endian target serial, 1 byte new address.
    // Malformed payloads are dropped without error.
    fn conditional_change_address(&mut self, payload: &[u8]) {
        let Ok(payload) = <[u8; 5]>::try_from(payload) else {
            return;
        };
        let Some(serial_number) = self.config.serial_number else {
            return;
        };
        let target = u32::from_le_bytes([payload[0], payload[1], payload[2], payload[3]]);
        let new_address = payload[4];
        if new_address > ADDRESS_MAX {
            return;
        }
        if target == serial_number() {
            let old = self.config.address;
            self.config.address = new_address;
            if let Some(callout) = self.config.on_conditional_change_address {
                callout(old, new_address);
            }
        } else if new_address == self.config.address {
            // Another device claimed our address, release it
            self.config.address = UNASSIGNED_ADDRESS;
        }
    }
}
