//! Default value functions for configuration fields.
//!
//! These back the `#[serde(default = ...)]` attributes throughout the
//! configuration system.

use super::logging::LogFormat;
use crate::protocol::{DEFAULT_MAX_DISPLAY_NAME_LENGTH, DEFAULT_MAX_PARTICIPANT_ID_LENGTH};

// =============================================================================
// Port & Root Config
// =============================================================================

pub const fn default_port() -> u16 {
    3540
}

// =============================================================================
// Server Defaults
// =============================================================================

pub const fn default_room_cleanup_interval() -> u64 {
    60
}

pub const fn default_idle_room_timeout() -> u64 {
    1800 // 30 minutes
}

pub const fn default_require_shared_room_for_signal() -> bool {
    true
}

// =============================================================================
// Protocol Defaults
// =============================================================================

pub const fn default_max_participant_id_length() -> usize {
    DEFAULT_MAX_PARTICIPANT_ID_LENGTH
}

pub const fn default_max_display_name_length() -> usize {
    DEFAULT_MAX_DISPLAY_NAME_LENGTH
}

// =============================================================================
// Security Defaults
// =============================================================================

pub fn default_cors_origins() -> String {
    "*".to_string()
}

pub const fn default_require_admin_auth() -> bool {
    true
}

pub const fn default_max_message_size() -> usize {
    65536 // 64KB
}

// =============================================================================
// WebSocket Defaults
// =============================================================================

pub const fn default_outbound_queue_capacity() -> usize {
    64
}

pub const fn default_registration_timeout_secs() -> u64 {
    10
}

// =============================================================================
// Logging Defaults
// =============================================================================

pub fn default_log_dir() -> String {
    "logs".to_string()
}

pub fn default_log_filename() -> String {
    "session-signal.log".to_string()
}

pub fn default_rotation() -> String {
    "daily".to_string()
}

pub const fn default_enable_file_logging() -> bool {
    false
}

pub const fn default_log_format() -> LogFormat {
    LogFormat::Json
}
