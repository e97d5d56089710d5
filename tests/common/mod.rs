#![allow(dead_code)]

//! Shared test fixtures: frame builders and callback recorders.

use line_protocol::codec;
use line_protocol::transport::{Application, LineBus, TransportError};

/// Build a complete frame for `id` carrying `payload`
pub fn frame(id: u16, payload: &[u8]) -> Vec<u8> {
    let mut bytes = codec::request_frame(id).to_vec();
    bytes.push(payload.len() as u8);
    bytes.extend_from_slice(payload);
    bytes.push(codec::checksum(payload));
    bytes
}

/// Build the sync byte and request header for `id`
pub fn request(id: u16) -> Vec<u8> {
    codec::request_frame(id).to_vec()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataEvent {
    pub channel: u8,
    pub responding: bool,
    pub request: u16,
    pub payload: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorEvent {
    pub channel: u8,
    pub responding: bool,
    pub request: u16,
    pub error: TransportError,
}

/// Application stub recording every upward callback
#[derive(Default)]
pub struct Recorder {
    /// Answer for `responds_to`
    pub responds: bool,
    /// Response body handed out by `prepare_response`, `None` declines
    pub response: Option<Vec<u8>>,
    pub responds_queries: Vec<(u8, u16)>,
    pub prepare_queries: Vec<(u8, u16)>,
    pub data: Vec<DataEvent>,
    pub errors: Vec<ErrorEvent>,
}

impl Application for Recorder {
    fn responds_to(&mut self, channel: u8, request: u16) -> bool {
        self.responds_queries.push((channel, request));
        self.responds
    }

    fn prepare_response(&mut self, channel: u8, request: u16, payload: &mut [u8]) -> Option<u8> {
        self.prepare_queries.push((channel, request));
        let body = self.response.as_ref()?;
        let len = body.len().min(payload.len());
        payload[..len].copy_from_slice(&body[..len]);
        Some(body.len() as u8)
    }

    fn on_data(&mut self, channel: u8, responding: bool, request: u16, payload: &[u8]) {
        self.data.push(DataEvent { channel, responding, request, payload: payload.to_vec() });
    }

    fn on_error(&mut self, channel: u8, responding: bool, request: u16, error: TransportError) {
        self.errors.push(ErrorEvent { channel, responding, request, error });
    }
}

/// Bus stub recording every downward callout
#[derive(Default)]
pub struct WireLog {
    /// `(channel, payload, checksum)` per response
    pub responses: Vec<(u8, Vec<u8>, u8)>,
    /// `(channel, request word)` per request
    pub requests: Vec<(u8, u16)>,
}

impl LineBus for WireLog {
    fn write_response(&mut self, channel: u8, payload: &[u8], checksum: u8) {
        self.responses.push((channel, payload.to_vec(), checksum));
    }

    fn write_request(&mut self, channel: u8, request: u16) {
        self.requests.push((channel, request));
    }
}
