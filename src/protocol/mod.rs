// Protocol module: wire messages, error codes, identifiers and input validation

pub mod error_codes;
pub mod messages;
pub mod types;
pub mod validation;

pub use error_codes::ErrorCode;

pub use types::{
    ConnectionId, EncryptionKey, ParticipantId, RoomClosedReason, RoomId, RoomSummary,
    UserSummary, DEFAULT_MAX_DISPLAY_NAME_LENGTH, DEFAULT_MAX_PARTICIPANT_ID_LENGTH,
    ENCRYPTION_KEY_BYTES, ROOM_ID_BYTES, ROOM_ID_LENGTH,
};

pub use messages::{ClientMessage, RoomJoinedPayload, ServerMessage};
