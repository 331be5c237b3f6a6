//! Configuration module for the session signal server.
//!
//! Supports JSON configuration files, inline JSON, stdin input and
//! per-field environment overrides on top of compiled-in defaults.
//!
//! # Module Structure
//!
//! - [`crate::config::types`]: Root `Config` struct
//! - [`server`]: Room lifecycle and relay policy
//! - [`protocol`]: Input limits for ids and names
//! - [`security`]: CORS, admin auth, frame size
//! - [`logging`]: Logging configuration
//! - [`websocket`]: Per-connection queue and registration timeout
//! - [`crate::config::loader`]: Configuration loading functions
//! - [`crate::config::validation`]: Configuration validation functions
//! - [`crate::config::defaults`]: Default value functions

pub mod defaults;
pub mod loader;
pub mod logging;
pub mod protocol;
pub mod security;
pub mod server;
pub mod types;
pub mod validation;
pub mod websocket;

pub use loader::load;

pub use logging::{LogFormat, LogLevel, LoggingConfig};

pub use protocol::ProtocolConfig;

pub use security::SecurityConfig;

pub use server::ServerConfig;

pub use types::Config;

pub use validation::{is_production_mode, validate_config_security};

pub use websocket::WebSocketConfig;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = Config::default();

        assert_eq!(config.port, 3540);
        assert_eq!(config.server.room_cleanup_interval, 60);
        assert_eq!(config.server.idle_room_timeout, 1800);
        assert!(config.server.require_shared_room_for_signal);

        assert_eq!(config.protocol.max_participant_id_length, 128);
        assert_eq!(config.protocol.max_display_name_length, 64);

        assert!(config.security.require_admin_auth);
        assert!(config.security.admin_auth_token.is_none());
        assert_eq!(config.security.max_message_size, 65536);

        assert_eq!(config.websocket.outbound_queue_capacity, 64);
        assert_eq!(config.websocket.registration_timeout_secs, 10);

        assert_eq!(config.logging.dir, "logs");
        assert_eq!(config.logging.filename, "session-signal.log");
        assert_eq!(config.logging.rotation, "daily");
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let json = serde_json::to_string_pretty(&config).unwrap();
        let deserialized: Config = serde_json::from_str(&json).unwrap();

        assert_eq!(config.port, deserialized.port);
        assert_eq!(
            config.server.idle_room_timeout,
            deserialized.server.idle_room_timeout
        );
        assert_eq!(
            config.protocol.max_display_name_length,
            deserialized.protocol.max_display_name_length
        );
    }

    #[test]
    fn test_log_level_display() {
        assert_eq!(LogLevel::Trace.to_string(), "trace");
        assert_eq!(LogLevel::Debug.to_string(), "debug");
        assert_eq!(LogLevel::Info.to_string(), "info");
        assert_eq!(LogLevel::Warn.to_string(), "warn");
        assert_eq!(LogLevel::Error.to_string(), "error");
    }

    #[test]
    fn test_log_level_aliases() {
        assert_eq!(LogLevel::parse("WARNING"), Some(LogLevel::Warn));
        assert_eq!(LogLevel::parse(" err "), Some(LogLevel::Error));
        assert_eq!(LogLevel::parse("loud"), None);
    }

    #[test]
    fn test_redacted_config_hides_admin_token() {
        let mut config = Config::default();
        config.security.admin_auth_token = Some("very-secret-admin-token".to_string());
        let printed = serde_json::to_string(&config.redacted()).unwrap();
        assert!(!printed.contains("very-secret-admin-token"));
        assert!(printed.contains("<redacted>"));
    }

    #[test]
    fn test_validation_requires_admin_token() {
        let mut config = Config::default();
        assert!(validate_config_security(&config).is_err());

        config.security.admin_auth_token = Some("0123456789abcdef0123456789abcdef".to_string());
        assert!(validate_config_security(&config).is_ok());

        config.websocket.registration_timeout_secs = 0;
        assert!(validate_config_security(&config).is_err());
    }
}
