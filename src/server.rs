use std::sync::Arc;
use std::time::Duration;

use crate::config::{Config, ProtocolConfig};
use crate::metrics::ServerMetrics;
use crate::protocol::ConnectionId;
use crate::security::SecretGenerator;

mod admin;
mod error;
mod identity_registry;
mod lifecycle;
mod maintenance;
mod message_router;
mod messaging;
mod room_registry;
mod signaling_relay;

pub use error::SessionError;
pub use identity_registry::{ConnectionHandle, IdentityRegistry, Participant, Registration};
pub use lifecycle::SessionLifecycleCoordinator;
pub use room_registry::{
    ClosedRoom, Departure, JoinKind, JoinOutcome, Room, RoomMembers, RoomPhase, RoomRegistry,
};
pub use signaling_relay::{RelayOutcome, SignalingRelay};

use messaging::Outbox;

/// Runtime settings of the signaling core, derived from [`Config`].
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub room_cleanup_interval: Duration,
    /// `None` keeps host-only rooms until the host leaves.
    pub idle_room_timeout: Option<Duration>,
    pub require_shared_room_for_signal: bool,
    pub max_message_size: usize,
    pub outbound_queue_capacity: usize,
    pub registration_timeout: Duration,
    pub require_admin_auth: bool,
    pub admin_auth_token: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl ServerConfig {
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            room_cleanup_interval: Duration::from_secs(cfg.server.room_cleanup_interval.max(1)),
            idle_room_timeout: (cfg.server.idle_room_timeout > 0)
                .then_some(Duration::from_secs(cfg.server.idle_room_timeout)),
            require_shared_room_for_signal: cfg.server.require_shared_room_for_signal,
            max_message_size: cfg.security.max_message_size,
            outbound_queue_capacity: cfg.websocket.outbound_queue_capacity.max(1),
            registration_timeout: Duration::from_secs(cfg.websocket.registration_timeout_secs),
            require_admin_auth: cfg.security.require_admin_auth,
            admin_auth_token: cfg.security.admin_auth_token.clone(),
        }
    }
}

/// In-memory signaling server: identity and room registries, the relay,
/// and the disconnect coordinator behind one dispatch entry point.
#[derive(Debug)]
pub struct SignalServer {
    config: ServerConfig,
    protocol_config: ProtocolConfig,
    identities: Arc<IdentityRegistry>,
    rooms: Arc<RoomRegistry>,
    relay: SignalingRelay,
    lifecycle: SessionLifecycleCoordinator,
    outbox: Outbox,
    metrics: Arc<ServerMetrics>,
}

impl SignalServer {
    pub fn new(config: ServerConfig, protocol_config: ProtocolConfig) -> Arc<Self> {
        Self::with_secret_generator(config, protocol_config, SecretGenerator::default())
    }

    /// Build a server drawing room ids and keys from `secrets`.
    pub fn with_secret_generator(
        config: ServerConfig,
        protocol_config: ProtocolConfig,
        secrets: SecretGenerator,
    ) -> Arc<Self> {
        let metrics = Arc::new(ServerMetrics::new());
        let identities = Arc::new(IdentityRegistry::new());
        let rooms = Arc::new(RoomRegistry::new(
            Arc::clone(&identities),
            secrets,
            Arc::clone(&metrics),
        ));
        let outbox = Outbox::new(Arc::clone(&identities), Arc::clone(&metrics));
        let relay = SignalingRelay::new(
            Arc::clone(&rooms),
            outbox.clone(),
            Arc::clone(&metrics),
            config.require_shared_room_for_signal,
        );
        let lifecycle = SessionLifecycleCoordinator::new(
            Arc::clone(&identities),
            Arc::clone(&rooms),
            outbox.clone(),
            Arc::clone(&metrics),
        );

        Arc::new(Self {
            config,
            protocol_config,
            identities,
            rooms,
            relay,
            lifecycle,
            outbox,
            metrics,
        })
    }

    /// Connection closed: cascade room cleanup and notify the other member.
    pub fn on_disconnect(&self, connection_id: ConnectionId) -> bool {
        self.lifecycle.on_disconnect(connection_id)
    }

    /// Whether the connection has completed `register`.
    pub fn is_registered(&self, connection_id: ConnectionId) -> bool {
        self.identities.lookup_by_handle(connection_id).is_ok()
    }

    pub fn identities(&self) -> &IdentityRegistry {
        &self.identities
    }

    pub fn rooms(&self) -> &RoomRegistry {
        &self.rooms
    }

    pub fn relay(&self) -> &SignalingRelay {
        &self.relay
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn protocol_config(&self) -> &ProtocolConfig {
        &self.protocol_config
    }

    pub fn metrics(&self) -> Arc<ServerMetrics> {
        Arc::clone(&self.metrics)
    }
}
