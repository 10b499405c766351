use std::time::Duration;

use tokio_timer::{self, Sleep, Timer};

/// Deadline tracking for in flight handshakes.
///
/// Wraps a timer wheel so many handshakes can share one wheel while each
/// owns its own one shot sleep.
#[derive(Clone)]
pub struct HandshakeTimer {
    timer: Timer,
    duration: Duration,
}

impl HandshakeTimer {
    /// Create a new `HandshakeTimer` over the given timer wheel.
    pub fn new(timer: Timer, duration: Duration) -> HandshakeTimer {
        HandshakeTimer { timer, duration }
    }

    /// Create a new `HandshakeTimer` with a wheel of its own.
    pub fn with_duration(duration: Duration) -> HandshakeTimer {
        HandshakeTimer::new(tokio_timer::wheel().build(), duration)
    }

    /// Start a one shot sleep for the configured duration.
    pub fn sleep(&self) -> Sleep {
        self.timer.sleep(self.duration)
    }
}
