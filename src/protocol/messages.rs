use serde::{Deserialize, Serialize};

use super::error_codes::ErrorCode;
use super::types::{EncryptionKey, ParticipantId, RoomClosedReason, RoomId};

/// Message types sent from client to server
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(
    tag = "type",
    content = "data",
    rename_all = "kebab-case",
    rename_all_fields = "camelCase"
)]
pub enum ClientMessage {
    /// Bind this connection to a participant identity (MUST be first message)
    Register {
        id: ParticipantId,
        display_name: String,
        is_host: bool,
    },
    /// Host opens a new room
    CreateRoom {
        display_name: String,
        host_id: ParticipantId,
    },
    /// Join an existing room using its id as the join token
    JoinRoom {
        room_id: RoomId,
        participant_id: ParticipantId,
    },
    /// Host toggles the waiting-room gate
    ToggleRoomLock {
        room_id: RoomId,
        requester_id: ParticipantId,
        locked: bool,
    },
    /// Opaque WebRTC negotiation payload addressed to one participant
    Signal {
        sender_id: ParticipantId,
        target_id: ParticipantId,
        signal: serde_json::Value,
    },
    /// Leave the current room without disconnecting
    LeaveRoom {
        room_id: RoomId,
        participant_id: ParticipantId,
    },
    /// Host ends the session for everyone
    CloseRoom {
        room_id: RoomId,
        requester_id: ParticipantId,
    },
    /// Heartbeat to maintain connection
    Ping,
}

/// Payload for the RoomJoined server message.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomJoinedPayload {
    pub room_id: RoomId,
    pub display_name: String,
    pub encryption_key: EncryptionKey,
    pub host_id: ParticipantId,
    pub guest_id: Option<ParticipantId>,
}

/// Message types sent from server to client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(
    tag = "type",
    content = "data",
    rename_all = "kebab-case",
    rename_all_fields = "camelCase"
)]
pub enum ServerMessage {
    /// Registration accepted
    Registered {
        id: ParticipantId,
        display_name: String,
        is_host: bool,
    },
    /// Room created for the requesting host
    RoomCreated {
        room_id: RoomId,
        display_name: String,
        encryption_key: EncryptionKey,
    },
    /// Successfully joined a room (boxed to reduce enum size)
    RoomJoined(Box<RoomJoinedPayload>),
    /// Another participant joined the room
    UserJoined {
        participant_id: ParticipantId,
        display_name: String,
        is_host: bool,
    },
    /// Waiting-room gate toggled
    RoomLockChanged { room_id: RoomId, locked: bool },
    /// Relayed signaling payload
    Signal {
        sender_id: ParticipantId,
        signal: serde_json::Value,
    },
    /// Another participant left the room
    UserLeft {
        participant_id: ParticipantId,
        display_name: String,
    },
    /// Confirmation for a voluntary leave
    RoomLeft { room_id: RoomId },
    /// The room no longer exists
    RoomClosed {
        room_id: RoomId,
        reason: RoomClosedReason,
    },
    /// A room operation was rejected
    RoomError {
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        error_code: Option<ErrorCode>,
    },
    /// Pong response to ping
    Pong,
    /// Protocol-level error (malformed frame, missing registration, ...)
    Error {
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        error_code: Option<ErrorCode>,
    },
}
