#![cfg_attr(not(test), deny(clippy::panic))]
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions,
    clippy::struct_excessive_bools,
    clippy::too_many_lines,
    clippy::similar_names
)]

//! # Session Signal Server
//!
//! An in-memory WebSocket signaling server that pairs a host with one guest
//! per room and relays their WebRTC negotiation messages.
//!
//! No database, no cloud services: run the binary and connect via WebSocket.

/// Server configuration and environment variables
pub mod config;

/// Structured logging configuration
pub mod logging;

/// Metrics collection and reporting
pub mod metrics;

/// WebSocket message protocol definitions
pub mod protocol;

/// Room secret generation and token comparison
pub mod security;

/// Identity, room, relay and lifecycle orchestration
pub mod server;

/// WebSocket connection handling and HTTP endpoints
pub mod websocket;
