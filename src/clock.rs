//! # Tick helper for embassy hosts
//!
//! The transport core is clocked by host supplied elapsed milliseconds. On an
//! embassy target [`TickClock`] produces them from [`embassy_time::Instant`],
//! carrying the sub-millisecond remainder so no time is lost between calls.

use embassy_time::{Duration, Instant};

/// Tracks wall time between [`update`](crate::Transport::update) calls
pub struct TickClock {
    last: Instant,
}

impl TickClock {
    /// Start tracking from now
    pub fn new() -> Self {
        TickClock { last: Instant::now() }
    }

    /// Whole milliseconds elapsed since the previous call
    pub fn elapsed_ms(&mut self) -> u32 {
        let now = Instant::now();
        let millis = (now - self.last).as_millis();
        self.last += Duration::from_millis(millis);
        millis as u32
    }
}

impl Default for TickClock {
    fn default() -> Self {
        Self::new()
    }
}
