use std::sync::Arc;

use tracing::info;

use crate::metrics::ServerMetrics;
use crate::protocol::{ConnectionId, ServerMessage};

use super::messaging::Outbox;
use super::{ClosedRoom, Departure, IdentityRegistry, Participant, RoomRegistry};

/// Reacts to connection loss: room state first, notifications second,
/// identity last.
#[derive(Debug, Clone)]
pub struct SessionLifecycleCoordinator {
    identities: Arc<IdentityRegistry>,
    rooms: Arc<RoomRegistry>,
    outbox: Outbox,
    metrics: Arc<ServerMetrics>,
}

impl SessionLifecycleCoordinator {
    pub(crate) fn new(
        identities: Arc<IdentityRegistry>,
        rooms: Arc<RoomRegistry>,
        outbox: Outbox,
        metrics: Arc<ServerMetrics>,
    ) -> Self {
        Self {
            identities,
            rooms,
            outbox,
            metrics,
        }
    }

    /// Tear down whatever `connection_id` carried. Returns `false` when the
    /// connection was never registered, was superseded, or was already
    /// handled; repeated calls are no-ops.
    pub fn on_disconnect(&self, connection_id: ConnectionId) -> bool {
        let Some(participant_id) = self.identities.invalidate_handle(connection_id) else {
            return false;
        };

        if let Ok(participant) = self.identities.lookup_by_id(&participant_id) {
            if let Some(room_id) = &participant.current_room_id {
                if let Some(departure) = self.rooms.handle_departure(room_id, &participant_id) {
                    if matches!(departure, Departure::Closed(_)) {
                        self.metrics.increment_rooms_closed();
                    }
                    self.notify_departure(&departure, &participant);
                }
            }
        }

        let unregistered = self.identities.unregister_detached(&participant_id);
        info!(
            %participant_id,
            %connection_id,
            unregistered,
            "Participant disconnected"
        );
        true
    }

    /// Tell the remaining member what happened to `leaver`.
    pub(crate) fn notify_departure(&self, departure: &Departure, leaver: &Participant) {
        let user_left = ServerMessage::UserLeft {
            participant_id: leaver.id.clone(),
            display_name: leaver.display_name.clone(),
        };
        match departure {
            Departure::Closed(closed) => {
                self.outbox
                    .send_to_members(&closed.room, user_left, Some(&leaver.id));
                self.notify_closed(closed, Some(&leaver.id));
            }
            Departure::GuestLeft { room, .. } => {
                self.outbox.send_to_participant(&room.host_id, user_left);
            }
        }
    }

    /// Send `room-closed` to the former members, skipping `except`.
    pub(crate) fn notify_closed(&self, closed: &ClosedRoom, except: Option<&str>) {
        self.outbox.send_to_members(
            &closed.room,
            ServerMessage::RoomClosed {
                room_id: closed.room.id.clone(),
                reason: closed.reason,
            },
            except,
        );
    }
}
