// WebSocket module - transport shell around the signaling core
//
// - handler: WebSocket upgrade handler (entry point)
// - connection: per-connection read loop, outbound queue and teardown
// - sending: message serialization and sending functions
// - admin: bearer-protected admin snapshots and metrics
// - routes: HTTP route setup (health, websocket, admin)

mod admin;
mod connection;
mod handler;
mod routes;
mod sending;

pub use admin::{admin_rooms_handler, admin_users_handler, metrics_handler};
pub use handler::websocket_handler;
pub use routes::{create_router, run_server};
