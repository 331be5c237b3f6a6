use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use smallvec::SmallVec;
use tracing::{debug, info, warn};

use crate::metrics::ServerMetrics;
use crate::protocol::validation::is_well_formed_room_id;
use crate::protocol::{
    EncryptionKey, ParticipantId, RoomClosedReason, RoomId, RoomJoinedPayload, RoomSummary,
};
use crate::security::SecretGenerator;

use super::{IdentityRegistry, Participant, SessionError};

/// Attempts at drawing a fresh room id before giving up.
const MAX_ROOM_ID_ATTEMPTS: usize = 8;

/// Up to two members: the host and at most one guest.
pub type RoomMembers = SmallVec<[ParticipantId; 2]>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomPhase {
    /// Only the host is present.
    Waiting,
    /// Host and guest are both present.
    Occupied,
}

#[derive(Debug, Clone)]
pub struct Room {
    pub id: RoomId,
    pub display_name: String,
    pub host_id: ParticipantId,
    pub guest_id: Option<ParticipantId>,
    pub locked: bool,
    pub created_at: DateTime<Utc>,
    encryption_key: EncryptionKey,
    last_activity: Instant,
}

impl Room {
    pub fn phase(&self) -> RoomPhase {
        if self.guest_id.is_some() {
            RoomPhase::Occupied
        } else {
            RoomPhase::Waiting
        }
    }

    pub fn is_member(&self, participant_id: &str) -> bool {
        self.host_id == participant_id || self.guest_id.as_deref() == Some(participant_id)
    }

    pub fn members(&self) -> RoomMembers {
        let mut members = RoomMembers::new();
        members.push(self.host_id.clone());
        if let Some(guest) = &self.guest_id {
            members.push(guest.clone());
        }
        members
    }

    pub fn encryption_key(&self) -> &EncryptionKey {
        &self.encryption_key
    }

    pub fn last_activity(&self) -> Instant {
        self.last_activity
    }

    pub fn summary(&self) -> RoomSummary {
        RoomSummary {
            id: self.id.clone(),
            display_name: self.display_name.clone(),
            host_id: self.host_id.clone(),
            guest_id: self.guest_id.clone(),
            locked: self.locked,
        }
    }

    pub fn joined_payload(&self) -> RoomJoinedPayload {
        RoomJoinedPayload {
            room_id: self.id.clone(),
            display_name: self.display_name.clone(),
            encryption_key: self.encryption_key.clone(),
            host_id: self.host_id.clone(),
            guest_id: self.guest_id.clone(),
        }
    }

    fn touch(&mut self) {
        self.last_activity = Instant::now();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    NewGuest,
    GuestRejoin,
    HostRejoin,
}

#[derive(Debug, Clone)]
pub struct JoinOutcome {
    pub room: Room,
    pub participant: Participant,
    pub kind: JoinKind,
}

/// A room that no longer exists. Both former members have had their
/// back-references cleared.
#[derive(Debug, Clone)]
pub struct ClosedRoom {
    pub room: Room,
    pub reason: RoomClosedReason,
}

#[derive(Debug, Clone)]
pub enum Departure {
    /// The host left; the room is gone.
    Closed(ClosedRoom),
    /// The guest left; the room waits for a new guest.
    GuestLeft { room: Room, guest_id: ParticipantId },
}

/// Owns every live room.
///
/// Mutations run while holding the room's map entry and update member
/// back-references inside that critical section, so occupancy checks and
/// the resulting writes cannot interleave with a competing join.
#[derive(Debug)]
pub struct RoomRegistry {
    rooms: DashMap<RoomId, Room>,
    identities: Arc<IdentityRegistry>,
    secrets: SecretGenerator,
    metrics: Arc<ServerMetrics>,
}

impl RoomRegistry {
    pub fn new(
        identities: Arc<IdentityRegistry>,
        secrets: SecretGenerator,
        metrics: Arc<ServerMetrics>,
    ) -> Self {
        Self {
            rooms: DashMap::new(),
            identities,
            secrets,
            metrics,
        }
    }

    pub fn create_room(&self, display_name: String, host_id: &str) -> Result<Room, SessionError> {
        let host = self.identities.lookup_by_id(host_id)?;
        if !host.is_host {
            return Err(SessionError::NotAuthorized);
        }
        if host.current_room_id.is_some() {
            return Err(SessionError::AlreadyInRoom);
        }

        let encryption_key = self.secrets.encryption_key()?;

        for _ in 0..MAX_ROOM_ID_ATTEMPTS {
            let room_id = self.secrets.room_id()?;
            let Entry::Vacant(slot) = self.rooms.entry(room_id.clone()) else {
                self.metrics.increment_room_id_collisions();
                warn!(%room_id, "Room id collision, drawing a new id");
                continue;
            };

            // Re-check under the entry so two concurrent creates by the same
            // host cannot both succeed.
            let seated = self
                .identities
                .update(host_id, |participant| {
                    if participant.current_room_id.is_some() {
                        return Err(SessionError::AlreadyInRoom);
                    }
                    participant.current_room_id = Some(room_id.clone());
                    Ok(())
                })
                .ok_or(SessionError::ParticipantNotFound)?;
            seated?;

            let room = Room {
                id: room_id.clone(),
                display_name,
                host_id: host.id.clone(),
                guest_id: None,
                locked: false,
                created_at: Utc::now(),
                encryption_key,
                last_activity: Instant::now(),
            };
            let room = slot.insert(room).value().clone();
            info!(%room_id, host_id = %room.host_id, "Room created");
            return Ok(room);
        }

        Err(SessionError::RoomIdUnavailable)
    }

    pub fn join_room(&self, room_id: &str, participant_id: &str) -> Result<JoinOutcome, SessionError> {
        if !is_well_formed_room_id(room_id) {
            return Err(SessionError::RoomNotFound);
        }
        let mut entry = self.rooms.get_mut(room_id).ok_or(SessionError::RoomNotFound)?;
        let room = entry.value_mut();

        let (kind, participant) = self
            .identities
            .update(participant_id, |participant| {
                if participant
                    .current_room_id
                    .as_ref()
                    .is_some_and(|current| current != &room.id)
                {
                    return Err(SessionError::AlreadyInRoom);
                }

                let kind = if room.host_id == participant.id {
                    JoinKind::HostRejoin
                } else if room.guest_id.as_deref() == Some(participant.id.as_str()) {
                    JoinKind::GuestRejoin
                } else if room.locked {
                    return Err(SessionError::RoomLocked);
                } else if room.guest_id.is_some() {
                    return Err(SessionError::RoomFull);
                } else {
                    JoinKind::NewGuest
                };

                participant.current_room_id = Some(room.id.clone());
                Ok((kind, participant.clone()))
            })
            .ok_or(SessionError::ParticipantNotFound)??;

        if kind == JoinKind::NewGuest {
            room.guest_id = Some(participant.id.clone());
        }
        room.touch();
        debug!(%room_id, %participant_id, ?kind, "Participant joined room");

        Ok(JoinOutcome {
            room: room.clone(),
            participant,
            kind,
        })
    }

    pub fn set_lock(&self, room_id: &str, requester_id: &str, locked: bool) -> Result<Room, SessionError> {
        if !is_well_formed_room_id(room_id) {
            return Err(SessionError::RoomNotFound);
        }
        let mut entry = self.rooms.get_mut(room_id).ok_or(SessionError::RoomNotFound)?;
        if entry.host_id != requester_id {
            return Err(SessionError::NotAuthorized);
        }
        entry.locked = locked;
        entry.touch();
        info!(%room_id, locked, "Room lock changed");
        Ok(entry.value().clone())
    }

    /// Apply a member's departure. The host leaving destroys the room; the
    /// guest leaving frees the guest seat. Returns `None` if the room is gone
    /// or the participant is not a member.
    pub fn handle_departure(&self, room_id: &str, participant_id: &str) -> Option<Departure> {
        self.depart(room_id, participant_id, RoomClosedReason::HostLeft)
    }

    /// Voluntary leave without disconnecting.
    pub fn leave_room(&self, room_id: &str, participant_id: &str) -> Result<Departure, SessionError> {
        if !is_well_formed_room_id(room_id) {
            return Err(SessionError::RoomNotFound);
        }
        self.depart(room_id, participant_id, RoomClosedReason::HostLeft)
            .ok_or(SessionError::RoomNotFound)
    }

    pub fn close_room(&self, room_id: &str, requester_id: &str) -> Result<ClosedRoom, SessionError> {
        if !is_well_formed_room_id(room_id) {
            return Err(SessionError::RoomNotFound);
        }
        match self.rooms.entry(room_id.to_string()) {
            Entry::Vacant(_) => Err(SessionError::RoomNotFound),
            Entry::Occupied(entry) => {
                if entry.get().host_id != requester_id {
                    return Err(SessionError::NotAuthorized);
                }
                Ok(self.remove_room(entry, RoomClosedReason::ClosedByHost))
            }
        }
    }

    /// Close host-only rooms with no activity for at least `timeout`.
    pub fn reap_idle(&self, timeout: Duration) -> Vec<ClosedRoom> {
        let candidates: Vec<RoomId> = self
            .rooms
            .iter()
            .filter(|entry| Self::is_idle(entry.value(), timeout))
            .map(|entry| entry.key().clone())
            .collect();

        let mut closed = Vec::new();
        for room_id in candidates {
            if let Entry::Occupied(entry) = self.rooms.entry(room_id) {
                // State may have moved on since the scan.
                if Self::is_idle(entry.get(), timeout) {
                    closed.push(self.remove_room(entry, RoomClosedReason::Idle));
                }
            }
        }
        closed
    }

    fn is_idle(room: &Room, timeout: Duration) -> bool {
        room.guest_id.is_none() && room.last_activity.elapsed() >= timeout
    }

    pub fn touch(&self, room_id: &str) {
        if let Some(mut room) = self.rooms.get_mut(room_id) {
            room.touch();
        }
    }

    /// Whether `participant_id` is the host or the guest of `room_id`.
    pub fn room_for_member(&self, room_id: &str, participant_id: &str) -> bool {
        self.rooms
            .get(room_id)
            .is_some_and(|room| room.is_member(participant_id))
    }

    /// Room in which `a` and `b` are the two members, if any.
    pub fn shared_room(&self, a: &str, b: &str) -> Option<RoomId> {
        let room_id = self.identities.lookup_by_id(a).ok()?.current_room_id?;
        let room = self.rooms.get(&room_id)?;
        (a != b && room.is_member(a) && room.is_member(b)).then(|| room.id.clone())
    }

    pub fn get(&self, room_id: &str) -> Option<Room> {
        self.rooms.get(room_id).map(|entry| entry.value().clone())
    }

    pub fn active_rooms(&self) -> Vec<RoomSummary> {
        let mut rooms: Vec<(DateTime<Utc>, RoomSummary)> = self
            .rooms
            .iter()
            .map(|entry| (entry.created_at, entry.summary()))
            .collect();
        rooms.sort_by(|a, b| a.0.cmp(&b.0));
        rooms.into_iter().map(|(_, summary)| summary).collect()
    }

    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }

    fn depart(&self, room_id: &str, participant_id: &str, host_reason: RoomClosedReason) -> Option<Departure> {
        let Entry::Occupied(mut entry) = self.rooms.entry(room_id.to_string()) else {
            return None;
        };

        if entry.get().host_id == participant_id {
            return Some(Departure::Closed(self.remove_room(entry, host_reason)));
        }

        if entry.get().guest_id.as_deref() != Some(participant_id) {
            return None;
        }

        let room = entry.get_mut();
        room.guest_id = None;
        room.touch();
        self.identities
            .clear_current_room_if(participant_id, &room.id);
        info!(%room_id, guest_id = %participant_id, "Guest left room");
        Some(Departure::GuestLeft {
            room: room.clone(),
            guest_id: participant_id.to_string(),
        })
    }

    fn remove_room(
        &self,
        entry: dashmap::mapref::entry::OccupiedEntry<'_, RoomId, Room>,
        reason: RoomClosedReason,
    ) -> ClosedRoom {
        {
            let room = entry.get();
            for member in room.members() {
                self.identities.clear_current_room_if(&member, &room.id);
            }
        }
        let (room_id, room) = entry.remove_entry();
        info!(%room_id, %reason, "Room closed");
        ClosedRoom { room, reason }
    }
}
