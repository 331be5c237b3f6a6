//! WebSocket configuration types.

use super::defaults::{default_outbound_queue_capacity, default_registration_timeout_secs};
use serde::{Deserialize, Serialize};

/// WebSocket configuration.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct WebSocketConfig {
    /// Capacity of each connection's outbound message queue
    #[serde(default = "default_outbound_queue_capacity")]
    pub outbound_queue_capacity: usize,
    /// Time allowed for a new connection to send `register` (seconds)
    #[serde(default = "default_registration_timeout_secs")]
    pub registration_timeout_secs: u64,
}

impl Default for WebSocketConfig {
    fn default() -> Self {
        Self {
            outbound_queue_capacity: default_outbound_queue_capacity(),
            registration_timeout_secs: default_registration_timeout_secs(),
        }
    }
}

impl WebSocketConfig {
    /// Validate WebSocket configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.outbound_queue_capacity == 0 {
            anyhow::bail!("websocket.outbound_queue_capacity must be greater than zero");
        }
        if self.registration_timeout_secs == 0 {
            anyhow::bail!("websocket.registration_timeout_secs must be at least 1 second");
        }
        if self.registration_timeout_secs > 60 {
            anyhow::bail!(
                "websocket.registration_timeout_secs must not exceed 60 seconds (configured: {})",
                self.registration_timeout_secs
            );
        }
        Ok(())
    }
}
