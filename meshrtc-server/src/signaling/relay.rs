use crate::room::RoomRegistry;
use dashmap::DashMap;
use meshrtc_core::{ClientSignal, ParticipantId, ServerSignal};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

struct RelayInner {
    registry: RoomRegistry,
    /// One FIFO outbound channel per live connection. Per source→target
    /// order follows from every sender pushing into the same channel.
    peers: DashMap<ParticipantId, mpsc::UnboundedSender<ServerSignal>>,
    /// Room each connection last joined, for cleanup on disconnect.
    sessions: DashMap<ParticipantId, String>,
}

/// Message router between connections. Holds no negotiation state of its
/// own; room membership lives in the [`RoomRegistry`], everything else is
/// forwarded verbatim with the sender's id stamped on.
#[derive(Clone)]
pub struct SignalingRelay {
    inner: Arc<RelayInner>,
}

impl SignalingRelay {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RelayInner {
                registry: RoomRegistry::new(),
                peers: DashMap::new(),
                sessions: DashMap::new(),
            }),
        }
    }

    /// Registers a new connection, assigns it an identity, and announces
    /// that identity back over `tx` as the first signal.
    pub fn connect(&self, tx: mpsc::UnboundedSender<ServerSignal>) -> ParticipantId {
        let participant = ParticipantId::new();
        self.inner.peers.insert(participant, tx);
        self.send(participant, ServerSignal::Welcome { participant });
        info!("Connection registered: {}", participant);
        participant
    }

    /// Routes one inbound signal from `from`. Never blocks: all fan-out
    /// goes through per-connection channels, so a slow recipient cannot
    /// stall the caller.
    pub fn handle(&self, from: ParticipantId, signal: ClientSignal) {
        match signal {
            ClientSignal::JoinRoom { room } => self.join_room(from, room),
            ClientSignal::LeaveRoom { room } => {
                self.leave_room(from, &room);
            }
            ClientSignal::Offer { target, sdp } => {
                self.send(target, ServerSignal::Offer { from, sdp });
            }
            ClientSignal::Answer { target, sdp } => {
                self.send(target, ServerSignal::Answer { from, sdp });
            }
            ClientSignal::IceCandidate { target, candidate } => {
                self.send(target, ServerSignal::IceCandidate { from, candidate });
            }
        }
    }

    /// Transport-level hangup: an implicit leave of whatever room the
    /// session was last in, after which the identity is dead for good.
    pub fn disconnect(&self, participant: ParticipantId) {
        self.inner.peers.remove(&participant);
        if let Some((_, room)) = self.inner.sessions.remove(&participant) {
            self.broadcast_departure(participant, &room);
        }
        info!("Connection removed: {}", participant);
    }

    /// Current members of `room`, mainly for inspection and tests.
    pub fn members(&self, room: &str) -> Vec<ParticipantId> {
        self.inner.registry.members(room)
    }

    fn join_room(&self, from: ParticipantId, room: String) {
        if room.trim().is_empty() {
            warn!("Rejected blank room id from {}", from);
            return;
        }

        // A participant belongs to at most one room; joining a new one
        // implies leaving the old one first.
        if let Some(prior) = self.inner.sessions.get(&from).map(|r| r.clone()) {
            if prior != room {
                self.leave_room(from, &prior);
            }
        }

        self.inner.sessions.insert(from, room.clone());
        let existing = self.inner.registry.join(&room, from);

        info!("{} joined room '{}' ({} existing)", from, room, existing.len());

        self.send(
            from,
            ServerSignal::AllUsers {
                users: existing.clone(),
            },
        );
        for member in existing {
            self.send(member, ServerSignal::UserJoined { user: from });
        }
    }

    fn leave_room(&self, from: ParticipantId, room: &str) {
        self.inner
            .sessions
            .remove_if(&from, |_, current| current == room);
        self.broadcast_departure(from, room);
    }

    fn broadcast_departure(&self, from: ParticipantId, room: &str) {
        // Only a real member's departure is announced; leaving twice or
        // leaving a room never joined stays silent.
        if !self.inner.registry.leave(room, from) {
            return;
        }

        info!("{} left room '{}'", from, room);
        for member in self.inner.registry.members(room) {
            self.send(member, ServerSignal::UserLeft { user: from });
        }
    }

    fn send(&self, to: ParticipantId, signal: ServerSignal) {
        let Some(peer) = self.inner.peers.get(&to) else {
            // Best-effort routing: targets that disconnected mid-flight
            // simply miss the message, and the sender is not told.
            debug!("Dropping signal for dead target {}", to);
            return;
        };
        if peer.send(signal).is_err() {
            debug!("Outbound channel closed for {}", to);
        }
    }
}

impl Default for SignalingRelay {
    fn default() -> Self {
        Self::new()
    }
}
