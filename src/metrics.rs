use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Process-wide counters for the signaling server.
#[derive(Debug, Default)]
pub struct ServerMetrics {
    // Connection metrics
    pub total_connections: AtomicU64,
    pub active_connections: AtomicU64,
    pub disconnections: AtomicU64,
    pub registrations: AtomicU64,
    pub registration_timeouts: AtomicU64,
    pub websocket_messages_dropped: AtomicU64,

    // Room metrics
    pub rooms_created: AtomicU64,
    pub rooms_joined: AtomicU64,
    pub room_join_rejections: AtomicU64,
    pub rooms_closed: AtomicU64,
    pub idle_rooms_reaped: AtomicU64,
    pub room_id_collisions: AtomicU64,

    // Signaling metrics
    pub signals_relayed: AtomicU64,
    pub signals_dropped: AtomicU64,

    // Error metrics
    pub validation_errors: AtomicU64,
    pub protocol_errors: AtomicU64,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct MetricsSnapshot {
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub connections: ConnectionMetrics,
    pub rooms: RoomMetrics,
    pub signaling: SignalingMetrics,
    pub errors: ErrorMetrics,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ConnectionMetrics {
    pub total_connections: u64,
    pub active_connections: u64,
    pub disconnections: u64,
    pub registrations: u64,
    pub registration_timeouts: u64,
    pub websocket_messages_dropped: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RoomMetrics {
    pub rooms_created: u64,
    pub rooms_joined: u64,
    pub room_join_rejections: u64,
    pub rooms_closed: u64,
    pub idle_rooms_reaped: u64,
    pub room_id_collisions: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SignalingMetrics {
    pub signals_relayed: u64,
    pub signals_dropped: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ErrorMetrics {
    pub validation_errors: u64,
    pub protocol_errors: u64,
}

impl ServerMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    // Connection metrics
    pub fn increment_connections(&self) {
        self.total_connections.fetch_add(1, Ordering::Relaxed);
        self.active_connections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn decrement_active_connections(&self) {
        // Check-then-decrement in one step so a stray call never wraps to u64::MAX.
        let _ = self
            .active_connections
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |current| {
                current.checked_sub(1)
            });
        self.disconnections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_registrations(&self) {
        self.registrations.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_registration_timeouts(&self) {
        self.registration_timeouts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_websocket_messages_dropped(&self) {
        self.websocket_messages_dropped
            .fetch_add(1, Ordering::Relaxed);
    }

    // Room metrics
    pub fn increment_rooms_created(&self) {
        self.rooms_created.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_rooms_joined(&self) {
        self.rooms_joined.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_room_join_rejections(&self) {
        self.room_join_rejections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_rooms_closed(&self) {
        self.rooms_closed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_idle_rooms_reaped(&self, count: u64) {
        if count > 0 {
            self.idle_rooms_reaped.fetch_add(count, Ordering::Relaxed);
            self.rooms_closed.fetch_add(count, Ordering::Relaxed);
        }
    }

    pub fn increment_room_id_collisions(&self) {
        self.room_id_collisions.fetch_add(1, Ordering::Relaxed);
    }

    // Signaling metrics
    pub fn increment_signals_relayed(&self) {
        self.signals_relayed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_signals_dropped(&self) {
        self.signals_dropped.fetch_add(1, Ordering::Relaxed);
    }

    // Error metrics
    pub fn increment_validation_errors(&self) {
        self.validation_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_protocol_errors(&self) {
        self.protocol_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            timestamp: chrono::Utc::now(),
            connections: ConnectionMetrics {
                total_connections: self.total_connections.load(Ordering::Relaxed),
                active_connections: self.active_connections.load(Ordering::Relaxed),
                disconnections: self.disconnections.load(Ordering::Relaxed),
                registrations: self.registrations.load(Ordering::Relaxed),
                registration_timeouts: self.registration_timeouts.load(Ordering::Relaxed),
                websocket_messages_dropped: self.websocket_messages_dropped.load(Ordering::Relaxed),
            },
            rooms: RoomMetrics {
                rooms_created: self.rooms_created.load(Ordering::Relaxed),
                rooms_joined: self.rooms_joined.load(Ordering::Relaxed),
                room_join_rejections: self.room_join_rejections.load(Ordering::Relaxed),
                rooms_closed: self.rooms_closed.load(Ordering::Relaxed),
                idle_rooms_reaped: self.idle_rooms_reaped.load(Ordering::Relaxed),
                room_id_collisions: self.room_id_collisions.load(Ordering::Relaxed),
            },
            signaling: SignalingMetrics {
                signals_relayed: self.signals_relayed.load(Ordering::Relaxed),
                signals_dropped: self.signals_dropped.load(Ordering::Relaxed),
            },
            errors: ErrorMetrics {
                validation_errors: self.validation_errors.load(Ordering::Relaxed),
                protocol_errors: self.protocol_errors.load(Ordering::Relaxed),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn decrement_active_connections_does_not_underflow() {
        let metrics = ServerMetrics::new();

        for _ in 0..10 {
            metrics.decrement_active_connections();
        }

        assert_eq!(metrics.active_connections.load(Ordering::Relaxed), 0);
        assert_eq!(metrics.disconnections.load(Ordering::Relaxed), 10);
    }

    #[test]
    fn idle_reaps_count_as_closed_rooms() {
        let metrics = ServerMetrics::new();
        metrics.increment_rooms_closed();
        metrics.add_idle_rooms_reaped(3);
        metrics.add_idle_rooms_reaped(0);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.rooms.rooms_closed, 4);
        assert_eq!(snapshot.rooms.idle_rooms_reaped, 3);
    }

    #[tokio::test]
    async fn concurrent_connection_accounting_balances() {
        let metrics = Arc::new(ServerMetrics::new());
        let mut handles = Vec::new();

        for _ in 0..50 {
            let m = Arc::clone(&metrics);
            handles.push(tokio::spawn(async move {
                m.increment_connections();
                tokio::task::yield_now().await;
                m.decrement_active_connections();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.connections.total_connections, 50);
        assert_eq!(snapshot.connections.active_connections, 0);
        assert_eq!(snapshot.connections.disconnections, 50);
    }

    #[test]
    fn snapshot_serializes_grouped_sections() {
        let metrics = ServerMetrics::new();
        metrics.increment_signals_relayed();
        let json = serde_json::to_value(metrics.snapshot()).unwrap();
        assert_eq!(json["signaling"]["signals_relayed"], 1);
        assert!(json["connections"].is_object());
        assert!(json["rooms"].is_object());
    }
}
