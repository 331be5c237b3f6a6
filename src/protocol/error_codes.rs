use serde::{Deserialize, Serialize};
use std::fmt;

/// Error codes for structured error handling
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Identity errors
    ParticipantNotFound,
    NotRegistered,
    NotAuthorized,

    // Validation errors
    InvalidInput,
    MessageTooLarge,

    // Room errors
    RoomNotFound,
    RoomLocked,
    RoomFull,
    AlreadyInRoom,

    // Server errors
    InternalError,
}

impl ErrorCode {
    /// Returns a human-readable description of this error code.
    pub fn description(&self) -> &'static str {
        match self {
            Self::ParticipantNotFound => {
                "The referenced participant has no active registration on this server."
            }
            Self::NotRegistered => {
                "This connection must send a register message before any other request."
            }
            Self::NotAuthorized => {
                "You are not allowed to perform this action on the requested room."
            }
            Self::InvalidInput => {
                "The provided input is invalid or malformed. Check your request parameters."
            }
            Self::MessageTooLarge => "The message exceeds the maximum allowed frame size.",
            Self::RoomNotFound => "The requested room does not exist or has already closed.",
            Self::RoomLocked => {
                "The room is in waiting-room mode. Ask the host to unlock it before joining."
            }
            Self::RoomFull => "The room already has a guest.",
            Self::AlreadyInRoom => "Leave your current room before creating or joining another.",
            Self::InternalError => "An internal server error occurred. Please try again.",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}
