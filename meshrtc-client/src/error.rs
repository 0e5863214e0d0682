use thiserror::Error;

/// Failure to acquire or operate the local capture capability.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("media device unavailable: {0}")]
    Unavailable(String),
    #[error("media device access denied: {0}")]
    Denied(String),
}

/// Failure in the signaling transport between client and relay.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("failed to connect to relay: {0}")]
    Connect(#[from] tokio_tungstenite::tungstenite::Error),
    #[error("relay connection closed")]
    Closed,
}

/// Errors surfaced by the session's public operations. Everything here is
/// scoped to the one operation that failed; nothing tears down the session.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("room id must not be blank")]
    InvalidRoomId,
    #[error("already in a room, leave it first")]
    AlreadyJoined,
    #[error(transparent)]
    MediaUnavailable(#[from] MediaError),
    #[error(transparent)]
    Signaling(#[from] RelayError),
    #[error("session task has terminated")]
    Terminated,
}
