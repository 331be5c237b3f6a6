use crate::protocol::{RoomSummary, UserSummary};

use super::SignalServer;

impl SignalServer {
    /// Live rooms, oldest first. Never includes encryption keys.
    pub fn list_active_rooms(&self) -> Vec<RoomSummary> {
        self.rooms.active_rooms()
    }

    /// Registered participants. Never includes connection handles.
    pub fn list_active_users(&self) -> Vec<UserSummary> {
        self.identities.snapshot()
    }
}
