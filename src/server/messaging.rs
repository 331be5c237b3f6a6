use std::sync::Arc;

use tokio::sync::mpsc::error::TrySendError;

use crate::metrics::ServerMetrics;
use crate::protocol::{ErrorCode, ServerMessage};

use super::{ConnectionHandle, IdentityRegistry, Room, SessionError};

/// Enqueues server messages on connection outbound queues. Never blocks;
/// a full queue drops the message and counts it.
#[derive(Debug, Clone)]
pub(crate) struct Outbox {
    identities: Arc<IdentityRegistry>,
    metrics: Arc<ServerMetrics>,
}

impl Outbox {
    pub fn new(identities: Arc<IdentityRegistry>, metrics: Arc<ServerMetrics>) -> Self {
        Self {
            identities,
            metrics,
        }
    }

    pub fn send_to_connection(&self, connection: &ConnectionHandle, message: ServerMessage) -> bool {
        self.enqueue(connection, Arc::new(message))
    }

    /// Deliver to whichever connection currently carries `participant_id`.
    pub fn send_to_participant(&self, participant_id: &str, message: ServerMessage) -> bool {
        match self.identities.connection_for(participant_id) {
            Some(connection) => self.enqueue(&connection, Arc::new(message)),
            None => {
                tracing::debug!(%participant_id, "Participant has no live connection, message not sent");
                false
            }
        }
    }

    pub fn is_reachable(&self, participant_id: &str) -> bool {
        self.identities.connection_for(participant_id).is_some()
    }

    /// Deliver one shared message to every member of `room` except `except`.
    pub fn send_to_members(&self, room: &Room, message: ServerMessage, except: Option<&str>) {
        let message = Arc::new(message);
        for member in room.members() {
            if except == Some(member.as_str()) {
                continue;
            }
            if let Some(connection) = self.identities.connection_for(&member) {
                self.enqueue(&connection, Arc::clone(&message));
            }
        }
    }

    pub fn send_room_error(&self, connection: &ConnectionHandle, error: &SessionError) -> bool {
        self.send_to_connection(
            connection,
            ServerMessage::RoomError {
                message: error.to_string(),
                error_code: Some(error.error_code()),
            },
        )
    }

    pub fn send_protocol_error(
        &self,
        connection: &ConnectionHandle,
        message: String,
        error_code: ErrorCode,
    ) -> bool {
        self.send_to_connection(
            connection,
            ServerMessage::Error {
                message,
                error_code: Some(error_code),
            },
        )
    }

    fn enqueue(&self, connection: &ConnectionHandle, message: Arc<ServerMessage>) -> bool {
        match connection.try_send(message) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                self.metrics.increment_websocket_messages_dropped();
                tracing::warn!(
                    connection_id = %connection.id(),
                    "Outbound queue full, message dropped"
                );
                false
            }
            Err(TrySendError::Closed(_)) => {
                tracing::debug!(
                    connection_id = %connection.id(),
                    "Connection closed, message dropped"
                );
                false
            }
        }
    }
}
