pub mod model;

pub use model::{CandidateInit, ClientSignal, ParseParticipantIdError, ParticipantId, ServerSignal};
