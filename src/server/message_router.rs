use crate::protocol::validation::{
    validate_display_name_with_config, validate_participant_id_with_config,
};
use crate::protocol::{ClientMessage, ErrorCode, ParticipantId, ServerMessage};

use super::{ConnectionHandle, Departure, JoinKind, SessionError, SignalServer};

impl SignalServer {
    /// Handle one decoded client message arriving on `connection`.
    ///
    /// Every id carried in a payload is checked against the identity bound
    /// to the connection; the payload is never trusted on its own.
    pub fn handle_client_message(&self, connection: &ConnectionHandle, message: ClientMessage) {
        let participant_id = match message {
            ClientMessage::Register {
                id,
                display_name,
                is_host,
            } => {
                self.handle_register(connection, id, display_name, is_host);
                return;
            }
            ClientMessage::Ping => {
                self.outbox.send_to_connection(connection, ServerMessage::Pong);
                return;
            }
            _ => match self.identities.lookup_by_handle(connection.id()) {
                Ok(participant_id) => participant_id,
                Err(_) => {
                    tracing::warn!(
                        connection_id = %connection.id(),
                        "Request received before registration"
                    );
                    self.metrics.increment_protocol_errors();
                    self.outbox.send_protocol_error(
                        connection,
                        "Register before sending other requests".to_string(),
                        ErrorCode::NotRegistered,
                    );
                    return;
                }
            },
        };

        match message {
            ClientMessage::CreateRoom {
                display_name,
                host_id,
            } => self.handle_create_room(connection, &participant_id, display_name, &host_id),
            ClientMessage::JoinRoom {
                room_id,
                participant_id: claimed_id,
            } => self.handle_join_room(connection, &participant_id, &room_id, &claimed_id),
            ClientMessage::ToggleRoomLock {
                room_id,
                requester_id,
                locked,
            } => self.handle_toggle_lock(connection, &participant_id, &room_id, &requester_id, locked),
            ClientMessage::Signal {
                sender_id,
                target_id,
                signal,
            } => self.handle_signal(connection, &participant_id, &sender_id, &target_id, signal),
            ClientMessage::LeaveRoom {
                room_id,
                participant_id: claimed_id,
            } => self.handle_leave_room(connection, &participant_id, &room_id, &claimed_id),
            ClientMessage::CloseRoom {
                room_id,
                requester_id,
            } => self.handle_close_room(connection, &participant_id, &room_id, &requester_id),
            ClientMessage::Register { .. } | ClientMessage::Ping => {}
        }
    }

    /// Report a frame that never reached dispatch: oversize, malformed,
    /// binary, or a registration deadline that ran out.
    pub fn reject_frame(&self, connection: &ConnectionHandle, message: String, error_code: ErrorCode) {
        self.metrics.increment_protocol_errors();
        self.outbox.send_protocol_error(connection, message, error_code);
    }

    fn handle_register(
        &self,
        connection: &ConnectionHandle,
        id: ParticipantId,
        display_name: String,
        is_host: bool,
    ) {
        if let Err(reason) = validate_participant_id_with_config(&id, &self.protocol_config)
            .and_then(|()| validate_display_name_with_config(&display_name, &self.protocol_config))
        {
            self.metrics.increment_validation_errors();
            self.outbox
                .send_protocol_error(connection, reason, ErrorCode::InvalidInput);
            return;
        }

        // A connection switching identities leaves behind everything the
        // previous identity held.
        if let Ok(previous_id) = self.identities.lookup_by_handle(connection.id()) {
            if previous_id != id {
                tracing::info!(
                    connection_id = %connection.id(),
                    %previous_id,
                    participant_id = %id,
                    "Connection re-registering under a different identity"
                );
                self.lifecycle.on_disconnect(connection.id());
            }
        }

        let registration = self
            .identities
            .register(id, display_name, is_host, connection.clone());
        if let Some(superseded) = &registration.superseded {
            self.outbox.send_protocol_error(
                superseded,
                "This identity was registered on another connection".to_string(),
                ErrorCode::NotRegistered,
            );
        }
        self.metrics.increment_registrations();

        let participant = registration.participant;
        tracing::info!(
            participant_id = %participant.id,
            connection_id = %connection.id(),
            is_host = participant.is_host,
            "Participant registered"
        );
        self.outbox.send_to_connection(
            connection,
            ServerMessage::Registered {
                id: participant.id,
                display_name: participant.display_name,
                is_host: participant.is_host,
            },
        );
    }

    fn handle_create_room(
        &self,
        connection: &ConnectionHandle,
        participant_id: &str,
        display_name: String,
        host_id: &str,
    ) {
        let _span = tracing::info_span!("create_room", %participant_id).entered();
        if host_id != participant_id {
            self.reject(connection, participant_id, &SessionError::NotAuthorized);
            return;
        }
        if let Err(reason) = validate_display_name_with_config(&display_name, &self.protocol_config) {
            self.metrics.increment_validation_errors();
            self.reject(connection, participant_id, &SessionError::InvalidInput(reason));
            return;
        }

        match self.rooms.create_room(display_name, participant_id) {
            Ok(room) => {
                self.metrics.increment_rooms_created();
                self.outbox.send_to_connection(
                    connection,
                    ServerMessage::RoomCreated {
                        room_id: room.id.clone(),
                        display_name: room.display_name.clone(),
                        encryption_key: room.encryption_key().clone(),
                    },
                );
            }
            Err(err) => self.reject(connection, participant_id, &err),
        }
    }

    fn handle_join_room(
        &self,
        connection: &ConnectionHandle,
        participant_id: &str,
        room_id: &str,
        claimed_id: &str,
    ) {
        let _span = tracing::info_span!("join_room", %participant_id, %room_id).entered();
        if claimed_id != participant_id {
            self.reject(connection, participant_id, &SessionError::NotAuthorized);
            return;
        }

        let outcome = match self.rooms.join_room(room_id, participant_id) {
            Ok(outcome) => outcome,
            Err(err) => {
                self.metrics.increment_room_join_rejections();
                self.reject(connection, participant_id, &err);
                return;
            }
        };

        if outcome.kind == JoinKind::NewGuest {
            self.metrics.increment_rooms_joined();
        }
        self.outbox.send_to_connection(
            connection,
            ServerMessage::RoomJoined(Box::new(outcome.room.joined_payload())),
        );
        self.outbox.send_to_members(
            &outcome.room,
            ServerMessage::UserJoined {
                participant_id: outcome.participant.id.clone(),
                display_name: outcome.participant.display_name.clone(),
                is_host: outcome.participant.is_host,
            },
            Some(participant_id),
        );
    }

    fn handle_toggle_lock(
        &self,
        connection: &ConnectionHandle,
        participant_id: &str,
        room_id: &str,
        requester_id: &str,
        locked: bool,
    ) {
        if requester_id != participant_id {
            self.reject(connection, participant_id, &SessionError::NotAuthorized);
            return;
        }

        match self.rooms.set_lock(room_id, participant_id, locked) {
            Ok(room) => self.outbox.send_to_members(
                &room,
                ServerMessage::RoomLockChanged {
                    room_id: room.id.clone(),
                    locked: room.locked,
                },
                None,
            ),
            Err(err) => self.reject(connection, participant_id, &err),
        }
    }

    fn handle_signal(
        &self,
        connection: &ConnectionHandle,
        participant_id: &str,
        sender_id: &str,
        target_id: &str,
        signal: serde_json::Value,
    ) {
        if sender_id != participant_id {
            self.reject(connection, participant_id, &SessionError::NotAuthorized);
            return;
        }
        self.relay.relay(participant_id, target_id, signal);
    }

    fn handle_leave_room(
        &self,
        connection: &ConnectionHandle,
        participant_id: &str,
        room_id: &str,
        claimed_id: &str,
    ) {
        if claimed_id != participant_id {
            self.reject(connection, participant_id, &SessionError::NotAuthorized);
            return;
        }

        let leaver = match self.identities.lookup_by_id(participant_id) {
            Ok(participant) => participant,
            Err(err) => {
                self.reject(connection, participant_id, &err);
                return;
            }
        };

        match self.rooms.leave_room(room_id, participant_id) {
            Ok(departure) => {
                if matches!(departure, Departure::Closed(_)) {
                    self.metrics.increment_rooms_closed();
                }
                self.lifecycle.notify_departure(&departure, &leaver);
                self.outbox.send_to_connection(
                    connection,
                    ServerMessage::RoomLeft {
                        room_id: room_id.to_string(),
                    },
                );
            }
            Err(err) => self.reject(connection, participant_id, &err),
        }
    }

    fn handle_close_room(
        &self,
        connection: &ConnectionHandle,
        participant_id: &str,
        room_id: &str,
        requester_id: &str,
    ) {
        if requester_id != participant_id {
            self.reject(connection, participant_id, &SessionError::NotAuthorized);
            return;
        }

        match self.rooms.close_room(room_id, participant_id) {
            Ok(closed) => {
                self.metrics.increment_rooms_closed();
                self.lifecycle.notify_closed(&closed, None);
            }
            Err(err) => self.reject(connection, participant_id, &err),
        }
    }

    fn reject(&self, connection: &ConnectionHandle, participant_id: &str, error: &SessionError) {
        tracing::debug!(%participant_id, error = %error, "Room request rejected");
        self.outbox.send_room_error(connection, error);
    }
}
