//! Server behavior configuration types.

use super::defaults::{
    default_idle_room_timeout, default_require_shared_room_for_signal,
    default_room_cleanup_interval,
};
use serde::{Deserialize, Serialize};

/// Server configuration for room lifecycle and relay policy.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerConfig {
    /// Interval for the room maintenance task (seconds)
    #[serde(default = "default_room_cleanup_interval")]
    pub room_cleanup_interval: u64,
    /// Host-only rooms without signaling activity for this long are closed (seconds).
    /// Set to 0 to keep idle rooms until the host leaves.
    #[serde(default = "default_idle_room_timeout")]
    pub idle_room_timeout: u64,
    /// Only relay signals between the host and guest of the same room.
    /// Disable to forward to any registered participant.
    #[serde(default = "default_require_shared_room_for_signal")]
    pub require_shared_room_for_signal: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            room_cleanup_interval: default_room_cleanup_interval(),
            idle_room_timeout: default_idle_room_timeout(),
            require_shared_room_for_signal: default_require_shared_room_for_signal(),
        }
    }
}
