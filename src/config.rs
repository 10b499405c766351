use std::default::Default;
use std::time::Duration;

/// How long to wait before giving up on a handshake.
const DEFAULT_HANDSHAKE_TIMEOUT_SECS: u64 = 30;

const DEFAULT_RECEIVE_BUFFER_SIZE: usize = 4096;

/// Configures the internals of a handshake driver.
#[derive(PartialEq, Eq, Debug, Copy, Clone)]
pub struct HandshakerConfig {
    handshake_timeout: Duration,
    receive_buffer_size: usize,
}

impl HandshakerConfig {
    /// Sets the timeout that a handshake uses to make sure peers
    /// dont take too long to respond to us.
    pub fn with_handshake_timeout(mut self, timeout: Duration) -> HandshakerConfig {
        self.handshake_timeout = timeout;
        self
    }

    /// Sets the size of the chunk buffer used when pulling bytes off a
    /// socket.
    pub fn with_receive_buffer_size(mut self, size: usize) -> HandshakerConfig {
        self.receive_buffer_size = size;
        self
    }

    /// Gets the handshake timeout.
    pub fn handshake_timeout(&self) -> Duration {
        self.handshake_timeout
    }

    /// Gets the receive buffer size.
    pub fn receive_buffer_size(&self) -> usize {
        self.receive_buffer_size
    }
}

impl Default for HandshakerConfig {
    fn default() -> HandshakerConfig {
        HandshakerConfig {
            handshake_timeout: Duration::from_secs(DEFAULT_HANDSHAKE_TIMEOUT_SECS),
            receive_buffer_size: DEFAULT_RECEIVE_BUFFER_SIZE,
        }
    }
}
