mod participant;
mod signaling;

pub use participant::{ParseParticipantIdError, ParticipantId};
pub use signaling::{CandidateInit, ClientSignal, ServerSignal};
