use std::sync::Arc;

use crate::metrics::ServerMetrics;
use crate::protocol::ServerMessage;

use super::messaging::Outbox;
use super::RoomRegistry;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayOutcome {
    Delivered,
    /// Target is not registered or its connection is gone.
    TargetUnavailable,
    /// Sender and target are not the two members of one room.
    NotInSharedRoom,
    /// Target's outbound queue rejected the message.
    NotEnqueued,
}

/// Forwards opaque signaling payloads between two participants. The payload
/// is never inspected.
#[derive(Debug, Clone)]
pub struct SignalingRelay {
    rooms: Arc<RoomRegistry>,
    outbox: Outbox,
    metrics: Arc<ServerMetrics>,
    require_shared_room: bool,
}

impl SignalingRelay {
    pub(crate) fn new(
        rooms: Arc<RoomRegistry>,
        outbox: Outbox,
        metrics: Arc<ServerMetrics>,
        require_shared_room: bool,
    ) -> Self {
        Self {
            rooms,
            outbox,
            metrics,
            require_shared_room,
        }
    }

    /// Queue `signal` for the target's current connection. Undeliverable
    /// signals are dropped and logged, never reported to the sender.
    pub fn relay(&self, sender_id: &str, target_id: &str, signal: serde_json::Value) -> RelayOutcome {
        let shared_room = self.rooms.shared_room(sender_id, target_id);
        if self.require_shared_room && shared_room.is_none() {
            self.metrics.increment_signals_dropped();
            tracing::warn!(
                %sender_id,
                %target_id,
                "Dropping signal between participants that do not share a room"
            );
            return RelayOutcome::NotInSharedRoom;
        }

        let message = ServerMessage::Signal {
            sender_id: sender_id.to_string(),
            signal,
        };
        let outcome = if self.outbox.send_to_participant(target_id, message) {
            RelayOutcome::Delivered
        } else if self.outbox.is_reachable(target_id) {
            RelayOutcome::NotEnqueued
        } else {
            RelayOutcome::TargetUnavailable
        };

        match outcome {
            RelayOutcome::Delivered => {
                self.metrics.increment_signals_relayed();
                if let Some(room_id) = shared_room {
                    self.rooms.touch(&room_id);
                }
                tracing::trace!(%sender_id, %target_id, "Signal relayed");
            }
            _ => {
                self.metrics.increment_signals_dropped();
                tracing::warn!(%sender_id, %target_id, ?outcome, "Signal dropped");
            }
        }
        outcome
    }
}
