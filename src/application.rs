//! # Application router
//!
//! Stateless glue between the transport layer and the two request consumers:
//! the [diagnostics](crate::diagnostics) layer and the application defined
//! [`Api`]. For every `(channel, request)` pair the [`Router`] answers the
//! transport's `responds_to` / `prepare_response` / `on_data` queries with a
//! diagnostics-first, first-match-wins policy.
//!
//! A device without application defined requests uses `Router<()>`: the unit
//! [`Api`] never listens and never responds, leaving a pure diagnostics node.

use crate::diagnostics::DiagChannel;
use crate::transport::{Application, TransportError};

/// Application defined request handlers behind the router
///
/// All methods default to "never listens, never responds" so only the hooks a
/// device actually uses need to be written.
pub trait Api {
    /// Return true if the application consumes `request` on `channel`
    fn listens_to(&mut self, channel: u8, request: u16) -> bool {
        let _ = (channel, request);
        false
    }

    /// Return true if the application answers `request` on `channel`
    fn responds_to(&mut self, channel: u8, request: u16) -> bool {
        let _ = (channel, request);
        false
    }

    /// Fill `payload` with the response body and return its size
    fn prepare_response(&mut self, channel: u8, request: u16, payload: &mut [u8]) -> Option<u8> {
        let _ = (channel, request, payload);
        None
    }

    /// Called with the payload of a consumed request
    fn on_request(&mut self, channel: u8, request: u16, payload: &[u8]) {
        let _ = (channel, request, payload);
    }

    /// Called once per transport framing error
    fn on_error(&mut self, channel: u8, responding: bool, request: u16, error: TransportError) {
        let _ = (channel, responding, request, error);
    }
}

/// No application layer: pure diagnostics device
impl Api for () {}

/// Routes requests between diagnostics channels and the application layer
///
/// `D` diagnostic channels are keyed to transport channels by their
/// configuration; several diagnostic channels may share one transport channel.
pub struct Router<A = (), const D: usize = 1, const L: usize = 8, const P: usize = 8> {
    diag: [DiagChannel<L, P>; D],
    api: A,
}

impl<A, const D: usize, const L: usize, const P: usize> Router<A, D, L, P> {
    /// Create a router from the diagnostic channels and the application layer
    pub fn new(diag: [DiagChannel<L, P>; D], api: A) -> Self {
        Router { diag, api }
    }

    /// Borrow a diagnostic channel by its index
    pub fn diag(&self, diag_channel: usize) -> Option<&DiagChannel<L, P>> {
        self.diag.get(diag_channel)
    }

    /// Borrow a diagnostic channel mutably, e.g. to assign an address or
    /// register unicast handlers
    pub fn diag_mut(&mut self, diag_channel: usize) -> Option<&mut DiagChannel<L, P>> {
        self.diag.get_mut(diag_channel)
    }

    /// Borrow the application layer
    pub fn api(&self) -> &A {
        &self.api
    }

    /// Borrow the application layer mutably
    pub fn api_mut(&mut self) -> &mut A {
        &mut self.api
    }
}

impl<A, const D: usize, const L: usize, const P: usize> Application for Router<A, D, L, P>
where
    A: Api,
{
    fn responds_to(&mut self, channel: u8, request: u16) -> bool {
        self.diag
            .iter()
            .filter(|d| d.transport_channel() == channel)
            .any(|d| d.responds_to(request))
            || self.api.responds_to(channel, request)
    }

    fn prepare_response(&mut self, channel: u8, request: u16, payload: &mut [u8]) -> Option<u8> {
        for diag in self.diag.iter_mut().filter(|d| d.transport_channel() == channel) {
            if diag.responds_to(request) {
                return diag.prepare_response(request, payload);
            }
        }
        if self.api.responds_to(channel, request) {
            return self.api.prepare_response(channel, request, payload);
        }
        None
    }

    fn on_data(&mut self, channel: u8, responding: bool, request: u16, payload: &[u8]) {
        // Own response observed in one-wire mode, nothing to route
        if responding {
            return;
        }
        let mut handled = false;
        for diag in self.diag.iter_mut().filter(|d| d.transport_channel() == channel) {
            if diag.listens_to(request) {
                diag.on_request(request, payload);
                handled = true;
            }
        }
        if !handled && self.api.listens_to(channel, request) {
            self.api.on_request(channel, request, payload);
        }
    }

    fn on_error(&mut self, channel: u8, responding: bool, request: u16, error: TransportError) {
        self.api.on_error(channel, responding, request, error);
    }
}
