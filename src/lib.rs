//! # LINE protocol core
//!
//! Receive/transmit core of the LINE master/slave bus protocol used by
//! microcontroller peripherals on a shared serial wire. A device running this
//! core listens to a bus, recognizes framed requests from a master, decides
//! whether to respond, emits responses and surfaces decoded requests and
//! errors to the host.
//!
//! The crate is `no_std`, allocation free and single threaded: the host feeds
//! it received bytes and elapsed time, the core calls back out through narrow
//! trait seams.
//!
//! ## Layers
//!
//! - [`codec`] - request parity and payload checksum primitives
//! - [`transport`] - the per channel receive/transmit state machine
//! - [`application`] - routing between diagnostics and application requests
//! - [`diagnostics`] - address assignment, well-known commands, unicast registries
//! - [`wire`] - a [`LineBus`] adapter over [`embedded_io::Write`] ports
//!
//! ## Typical slave setup
//!
//! ```ignore
//! let config = DiagConfig {
//!     serial_number: Some(|| 0x4A5B_6C7D),
//!     op_status: Some(|| OpStatus::Ok),
//!     ..Default::default()
//! };
//! let router: Router = Router::new([DiagChannel::new(config)], ());
//! let mut line = Transport::<_, _>::new(SerialBus::new(uart_tx), router);
//! line.init(0, false);
//!
//! // from the receive path:          line.receive(0, byte);
//! // from a 1ms tick:                line.update(0, 1);
//! ```
//!
//! ## Features
//!
//! - `defmt`: derive `defmt::Format` on the public types
//! - `embassy`: [`clock::TickClock`] for deriving `update()` milliseconds
//!   from `embassy_time::Instant`

#![no_std]

pub mod application;
#[cfg(feature = "embassy")]
pub mod clock;
pub mod codec;
pub mod diagnostics;
pub mod status;
pub mod transport;
pub mod wire;

pub use application::{Api, Router};
pub use diagnostics::{DiagChannel, DiagConfig};
pub use status::{OpStatus, PowerStatus, SoftwareVersion};
pub use transport::{Application, LineBus, Transport, TransportError};
pub use wire::SerialBus;
