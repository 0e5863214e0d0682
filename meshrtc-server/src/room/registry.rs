use dashmap::DashMap;
use meshrtc_core::ParticipantId;
use tracing::info;

/// In-memory map from room id to its members in join order. Rooms exist
/// implicitly: the first join creates one, the last leave prunes it.
///
/// Mutations on one room run under that entry's lock, so join/leave for a
/// given room are serialized while different rooms proceed independently.
/// Nothing here performs I/O.
pub struct RoomRegistry {
    rooms: DashMap<String, Vec<ParticipantId>>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self {
            rooms: DashMap::new(),
        }
    }

    /// Adds `participant` to `room` and returns the members that were
    /// already present. The returned list never contains the joiner, even
    /// on a duplicate join.
    pub fn join(&self, room: &str, participant: ParticipantId) -> Vec<ParticipantId> {
        let mut members = self.rooms.entry(room.to_string()).or_default();

        if members.is_empty() {
            info!("Creating new room: {}", room);
        }

        let existing: Vec<ParticipantId> = members
            .iter()
            .copied()
            .filter(|m| *m != participant)
            .collect();

        if !members.contains(&participant) {
            members.push(participant);
        }

        existing
    }

    /// Removes `participant` from `room`. Returns whether it was a member,
    /// so the caller can suppress duplicate departure broadcasts. Unknown
    /// rooms are a no-op.
    pub fn leave(&self, room: &str, participant: ParticipantId) -> bool {
        let Some(mut members) = self.rooms.get_mut(room) else {
            return false;
        };

        let before = members.len();
        members.retain(|m| *m != participant);
        let was_member = members.len() != before;
        let now_empty = members.is_empty();
        drop(members);

        if now_empty {
            self.rooms.remove_if(room, |_, m| m.is_empty());
            info!("Room {} is empty, pruning", room);
        }

        was_member
    }

    /// Current members of `room` in join order; empty for unknown rooms.
    pub fn members(&self, room: &str) -> Vec<ParticipantId> {
        self.rooms
            .get(room)
            .map(|m| m.clone())
            .unwrap_or_default()
    }
}

impl Default for RoomRegistry {
    fn default() -> Self {
        Self::new()
    }
}
