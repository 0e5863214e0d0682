use crate::model::participant::ParticipantId;
use serde::{Deserialize, Serialize};

/// One trickle ICE candidate as it crosses the wire, shaped like
/// `RTCIceCandidateInit` so either end can hand it to its engine as-is.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CandidateInit {
    pub candidate: String,
    pub sdp_mid: Option<String>,
    pub sdp_m_line_index: Option<u16>,
}

/// Signals a client sends to the relay.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "op", content = "d", rename_all = "kebab-case")]
pub enum ClientSignal {
    JoinRoom {
        room: String,
    },
    LeaveRoom {
        room: String,
    },
    Offer {
        target: ParticipantId,
        sdp: String,
    },
    Answer {
        target: ParticipantId,
        sdp: String,
    },
    IceCandidate {
        target: ParticipantId,
        candidate: CandidateInit,
    },
}

/// Signals the relay sends to a client. Forwarded negotiation messages are
/// re-tagged with the sender's id so the receiver can route them by remote.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "op", content = "d", rename_all = "kebab-case")]
pub enum ServerSignal {
    /// First signal on every connection, carrying the assigned identity.
    Welcome {
        participant: ParticipantId,
    },
    /// Pre-existing members of the room just joined, in join order.
    AllUsers {
        users: Vec<ParticipantId>,
    },
    UserJoined {
        user: ParticipantId,
    },
    UserLeft {
        user: ParticipantId,
    },
    Offer {
        from: ParticipantId,
        sdp: String,
    },
    Answer {
        from: ParticipantId,
        sdp: String,
    },
    IceCandidate {
        from: ParticipantId,
        candidate: CandidateInit,
    },
}
