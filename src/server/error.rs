use thiserror::Error;

use crate::protocol::ErrorCode;
use crate::security::SecretGenerationError;

/// Failure of a room or identity operation, reported to the requesting
/// connection only.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("Participant not found")]
    ParticipantNotFound,
    #[error("Room not found")]
    RoomNotFound,
    #[error("Room is locked")]
    RoomLocked,
    #[error("Room already has a guest")]
    RoomFull,
    #[error("Not authorized to perform this action")]
    NotAuthorized,
    #[error("Participant is already in another room")]
    AlreadyInRoom,
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Could not allocate a unique room id")]
    RoomIdUnavailable,
    #[error("Secure random source unavailable")]
    EntropyUnavailable,
}

impl SessionError {
    pub const fn error_code(&self) -> ErrorCode {
        match self {
            Self::ParticipantNotFound => ErrorCode::ParticipantNotFound,
            Self::RoomNotFound => ErrorCode::RoomNotFound,
            Self::RoomLocked => ErrorCode::RoomLocked,
            Self::RoomFull => ErrorCode::RoomFull,
            Self::NotAuthorized => ErrorCode::NotAuthorized,
            Self::AlreadyInRoom => ErrorCode::AlreadyInRoom,
            Self::InvalidInput(_) => ErrorCode::InvalidInput,
            Self::RoomIdUnavailable | Self::EntropyUnavailable => ErrorCode::InternalError,
        }
    }
}

impl From<SecretGenerationError> for SessionError {
    fn from(_: SecretGenerationError) -> Self {
        Self::EntropyUnavailable
    }
}
