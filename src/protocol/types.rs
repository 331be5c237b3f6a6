use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Caller-supplied stable identifier of a logical participant.
pub type ParticipantId = String;

/// Server-generated room identifier. Doubles as the join token, so it is
/// produced from the OS CSPRNG and never guessable.
pub type RoomId = String;

/// Identifier of one live transport connection (one per WebSocket).
pub type ConnectionId = Uuid;

/// Default maximum length for participant identifiers.
pub const DEFAULT_MAX_PARTICIPANT_ID_LENGTH: usize = 128;
/// Default maximum length for participant and room display names.
pub const DEFAULT_MAX_DISPLAY_NAME_LENGTH: usize = 64;
/// Number of random bytes behind a room id (128 bits).
pub const ROOM_ID_BYTES: usize = 16;
/// Number of random bytes behind a room encryption key (256 bits).
pub const ENCRYPTION_KEY_BYTES: usize = 32;
/// Encoded length of a room id (unpadded base64url of [`ROOM_ID_BYTES`]).
pub const ROOM_ID_LENGTH: usize = 22;

/// Room media encryption secret, base64url encoded.
///
/// Only ever serialized into messages addressed to the two legitimate room
/// members. `Debug` is redacted so the key cannot leak through logs.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EncryptionKey(String);

impl EncryptionKey {
    pub fn new(encoded: String) -> Self {
        Self(encoded)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for EncryptionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("EncryptionKey(<redacted>)")
    }
}

/// Why a room stopped existing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RoomClosedReason {
    /// The host's connection went away.
    HostLeft,
    /// The host closed the room explicitly.
    ClosedByHost,
    /// Nobody joined the host and nothing was signaled for too long.
    Idle,
}

impl RoomClosedReason {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::HostLeft => "host-left",
            Self::ClosedByHost => "closed-by-host",
            Self::Idle => "idle",
        }
    }
}

impl fmt::Display for RoomClosedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Admin view of a room. Carries no encryption key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomSummary {
    pub id: RoomId,
    pub display_name: String,
    pub host_id: ParticipantId,
    pub guest_id: Option<ParticipantId>,
    pub locked: bool,
}

/// Admin view of a connected participant. Carries no connection handle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: ParticipantId,
    pub display_name: String,
    pub is_host: bool,
    pub current_room_id: Option<RoomId>,
}
