use std::fmt;
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, info};

use crate::protocol::{ConnectionId, ParticipantId, RoomId, ServerMessage, UserSummary};

use super::SessionError;

/// Live transport connection: its id plus the outbound queue feeding the
/// socket's send task.
#[derive(Clone)]
pub struct ConnectionHandle {
    id: ConnectionId,
    sender: mpsc::Sender<Arc<ServerMessage>>,
}

impl ConnectionHandle {
    pub fn new(id: ConnectionId, sender: mpsc::Sender<Arc<ServerMessage>>) -> Self {
        Self { id, sender }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub(crate) fn try_send(
        &self,
        message: Arc<ServerMessage>,
    ) -> Result<(), TrySendError<Arc<ServerMessage>>> {
        self.sender.try_send(message)
    }
}

impl fmt::Debug for ConnectionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionHandle")
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone)]
pub struct Participant {
    pub id: ParticipantId,
    pub display_name: String,
    pub is_host: bool,
    /// `None` between handle invalidation and unregistration.
    pub(crate) connection: Option<ConnectionHandle>,
    /// Back-reference only; the room registry owns membership.
    pub current_room_id: Option<RoomId>,
}

impl Participant {
    pub fn is_connected(&self) -> bool {
        self.connection.is_some()
    }

    pub fn summary(&self) -> UserSummary {
        UserSummary {
            id: self.id.clone(),
            display_name: self.display_name.clone(),
            is_host: self.is_host,
            current_room_id: self.current_room_id.clone(),
        }
    }
}

/// Result of [`IdentityRegistry::register`].
#[derive(Debug)]
pub struct Registration {
    pub participant: Participant,
    /// Handle of another connection that carried this identity before.
    pub superseded: Option<ConnectionHandle>,
}

/// Connected participants and the connection → participant index.
///
/// Lock order: callers holding a room entry may take a participant entry,
/// never the other way around. Nothing here touches the room map.
#[derive(Debug, Default)]
pub struct IdentityRegistry {
    participants: DashMap<ParticipantId, Participant>,
    handles: DashMap<ConnectionId, ParticipantId>,
}

impl IdentityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `handle` to `id`, replacing whatever handle the id had before.
    /// Room membership survives re-registration.
    pub fn register(
        &self,
        id: ParticipantId,
        display_name: String,
        is_host: bool,
        handle: ConnectionHandle,
    ) -> Registration {
        let connection_id = handle.id();
        let (participant, previous) = match self.participants.entry(id.clone()) {
            Entry::Occupied(mut entry) => {
                let existing = entry.get_mut();
                let previous = existing.connection.replace(handle);
                existing.display_name = display_name;
                existing.is_host = is_host;
                (existing.clone(), previous)
            }
            Entry::Vacant(entry) => {
                let participant = Participant {
                    id: id.clone(),
                    display_name,
                    is_host,
                    connection: Some(handle),
                    current_room_id: None,
                };
                (entry.insert(participant).value().clone(), None)
            }
        };

        let superseded = previous.filter(|old| old.id() != connection_id);
        if let Some(old) = &superseded {
            // A late close of the old socket must resolve to nobody.
            self.handles
                .remove_if(&old.id(), |_, owner| owner == &id);
            info!(
                participant_id = %id,
                old_connection_id = %old.id(),
                %connection_id,
                "Participant re-registered on a new connection"
            );
        }
        self.handles.insert(connection_id, id);

        Registration {
            participant,
            superseded,
        }
    }

    pub fn lookup_by_id(&self, id: &str) -> Result<Participant, SessionError> {
        self.participants
            .get(id)
            .map(|entry| entry.value().clone())
            .ok_or(SessionError::ParticipantNotFound)
    }

    pub fn lookup_by_handle(&self, connection_id: ConnectionId) -> Result<ParticipantId, SessionError> {
        self.handles
            .get(&connection_id)
            .map(|entry| entry.value().clone())
            .ok_or(SessionError::ParticipantNotFound)
    }

    /// Current live handle of a participant, if any.
    pub fn connection_for(&self, id: &str) -> Option<ConnectionHandle> {
        self.participants
            .get(id)
            .and_then(|entry| entry.connection.clone())
    }

    /// Remove the participant and its handle mapping unconditionally.
    pub fn unregister(&self, id: &str) -> Option<Participant> {
        let (_, participant) = self.participants.remove(id)?;
        if let Some(handle) = &participant.connection {
            self.handles.remove_if(&handle.id(), |_, owner| owner == id);
        }
        debug!(participant_id = %id, "Participant unregistered");
        Some(participant)
    }

    /// First step of a disconnect: drop the handle mapping and detach the
    /// handle from its participant. Returns `None` when the handle was
    /// already invalidated or superseded.
    pub fn invalidate_handle(&self, connection_id: ConnectionId) -> Option<ParticipantId> {
        let (_, id) = self.handles.remove(&connection_id)?;
        if let Some(mut participant) = self.participants.get_mut(&id) {
            if participant
                .connection
                .as_ref()
                .is_some_and(|handle| handle.id() == connection_id)
            {
                participant.connection = None;
            }
        }
        Some(id)
    }

    /// Remove the participant only if no connection re-attached after
    /// [`Self::invalidate_handle`].
    pub fn unregister_detached(&self, id: &str) -> bool {
        let removed = self
            .participants
            .remove_if(id, |_, participant| participant.connection.is_none())
            .is_some();
        if removed {
            debug!(participant_id = %id, "Participant unregistered");
        }
        removed
    }

    pub fn set_current_room(&self, id: &str, room_id: Option<RoomId>) -> bool {
        self.update(id, |participant| participant.current_room_id = room_id)
            .is_some()
    }

    /// Clear the back-reference only if it still points at `room_id`.
    pub(crate) fn clear_current_room_if(&self, id: &str, room_id: &str) {
        self.update(id, |participant| {
            if participant.current_room_id.as_deref() == Some(room_id) {
                participant.current_room_id = None;
            }
        });
    }

    /// Run `f` against the participant while holding its entry.
    pub(crate) fn update<R>(&self, id: &str, f: impl FnOnce(&mut Participant) -> R) -> Option<R> {
        self.participants
            .get_mut(id)
            .map(|mut entry| f(entry.value_mut()))
    }

    pub fn snapshot(&self) -> Vec<UserSummary> {
        let mut users: Vec<UserSummary> = self
            .participants
            .iter()
            .map(|entry| entry.value().summary())
            .collect();
        users.sort_by(|a, b| a.id.cmp(&b.id));
        users
    }

    pub fn len(&self) -> usize {
        self.participants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn handle() -> (ConnectionHandle, mpsc::Receiver<Arc<ServerMessage>>) {
        let (tx, rx) = mpsc::channel(8);
        (ConnectionHandle::new(Uuid::new_v4(), tx), rx)
    }

    #[test]
    fn register_then_lookup_both_ways() {
        let registry = IdentityRegistry::new();
        let (h, _rx) = handle();
        let registration = registry.register("alice".into(), "Alice".into(), true, h.clone());

        assert!(registration.superseded.is_none());
        assert!(registration.participant.is_connected());
        assert_eq!(registry.lookup_by_handle(h.id()).unwrap(), "alice");
        assert_eq!(registry.lookup_by_id("alice").unwrap().display_name, "Alice");
        assert_eq!(
            registry.lookup_by_id("nobody").unwrap_err(),
            SessionError::ParticipantNotFound
        );
    }

    #[test]
    fn re_registration_supersedes_old_handle_and_keeps_room() {
        let registry = IdentityRegistry::new();
        let (first, _rx1) = handle();
        let (second, _rx2) = handle();

        registry.register("bob".into(), "Bob".into(), false, first.clone());
        registry.set_current_room("bob", Some("room-1".into()));
        let registration = registry.register("bob".into(), "Bobby".into(), false, second.clone());

        assert_eq!(registration.superseded.map(|h| h.id()), Some(first.id()));
        assert_eq!(registration.participant.display_name, "Bobby");
        assert_eq!(
            registration.participant.current_room_id.as_deref(),
            Some("room-1")
        );
        assert!(registry.lookup_by_handle(first.id()).is_err());
        assert_eq!(registry.lookup_by_handle(second.id()).unwrap(), "bob");

        // Closing the stale socket is a no-op.
        assert!(registry.invalidate_handle(first.id()).is_none());
        assert!(registry.lookup_by_id("bob").unwrap().is_connected());
    }

    #[test]
    fn invalidate_is_idempotent() {
        let registry = IdentityRegistry::new();
        let (h, _rx) = handle();
        registry.register("carol".into(), "Carol".into(), false, h.clone());

        assert_eq!(registry.invalidate_handle(h.id()).as_deref(), Some("carol"));
        assert!(registry.invalidate_handle(h.id()).is_none());
        assert!(!registry.lookup_by_id("carol").unwrap().is_connected());
        assert!(registry.unregister_detached("carol"));
        assert!(registry.is_empty());
    }

    #[test]
    fn reconnect_between_invalidate_and_unregister_survives() {
        let registry = IdentityRegistry::new();
        let (old, _rx1) = handle();
        let (new, _rx2) = handle();
        registry.register("dave".into(), "Dave".into(), false, old.clone());

        registry.invalidate_handle(old.id());
        registry.register("dave".into(), "Dave".into(), false, new.clone());

        assert!(!registry.unregister_detached("dave"));
        assert_eq!(registry.lookup_by_handle(new.id()).unwrap(), "dave");
    }

    #[test]
    fn unregister_removes_handle_mapping() {
        let registry = IdentityRegistry::new();
        let (h, _rx) = handle();
        registry.register("erin".into(), "Erin".into(), true, h.clone());

        assert!(registry.unregister("erin").is_some());
        assert!(registry.lookup_by_handle(h.id()).is_err());
        assert!(registry.unregister("erin").is_none());
    }

    #[test]
    fn snapshot_is_sorted_and_has_no_handles() {
        let registry = IdentityRegistry::new();
        let (h1, _rx1) = handle();
        let (h2, _rx2) = handle();
        registry.register("zed".into(), "Zed".into(), false, h1);
        registry.register("amy".into(), "Amy".into(), true, h2);

        let users = registry.snapshot();
        assert_eq!(users.len(), 2);
        assert_eq!(users[0].id, "amy");
        let json = serde_json::to_string(&users).unwrap();
        assert!(!json.contains("connection"));
        assert!(json.contains("\"isHost\":true"));
    }

    #[test]
    fn clear_current_room_only_matches_same_room() {
        let registry = IdentityRegistry::new();
        let (h, _rx) = handle();
        registry.register("fay".into(), "Fay".into(), false, h);
        registry.set_current_room("fay", Some("room-a".into()));

        registry.clear_current_room_if("fay", "room-b");
        assert_eq!(
            registry.lookup_by_id("fay").unwrap().current_room_id.as_deref(),
            Some("room-a")
        );
        registry.clear_current_room_if("fay", "room-a");
        assert!(registry.lookup_by_id("fay").unwrap().current_room_id.is_none());
    }
}
