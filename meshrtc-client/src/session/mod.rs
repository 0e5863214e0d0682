mod coordinator;

use crate::error::SessionError;
use crate::link::{LinkPhase, LinkRole};
use crate::media::MediaSource;
use crate::relay::RelayConnection;
use crate::stats::QualitySnapshot;
use coordinator::SessionCoordinator;
use meshrtc_core::ParticipantId;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use webrtc::track::track_remote::TrackRemote;

/// What the embedding application sees happen to the mesh.
#[derive(Clone)]
pub enum SessionEvent {
    /// Direct connection to a remote is up.
    PeerConnected(ParticipantId),
    /// The link is gone: remote left, failed, or the session ended it.
    PeerClosed(ParticipantId),
    /// A remote media track arrived, ready to hand to a renderer.
    RemoteTrack {
        from: ParticipantId,
        track: Arc<TrackRemote>,
    },
}

/// Snapshot of one active link, for display and assertions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkInfo {
    pub remote: ParticipantId,
    pub role: LinkRole,
    pub phase: LinkPhase,
}

#[derive(Clone)]
pub struct SessionConfig {
    /// STUN/TURN urls handed to every peer connection.
    pub ice_servers: Vec<String>,
    /// Quality sampling period.
    pub stats_interval: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ice_servers: vec![],
            stats_interval: Duration::from_secs(3),
        }
    }
}

pub(crate) enum SessionCommand {
    JoinRoom {
        room: String,
        reply: oneshot::Sender<Result<(), SessionError>>,
    },
    LeaveRoom {
        reply: oneshot::Sender<()>,
    },
    SetAudioEnabled(bool),
    SetVideoEnabled(bool),
    Participant {
        reply: oneshot::Sender<Option<ParticipantId>>,
    },
    Links {
        reply: oneshot::Sender<Vec<LinkInfo>>,
    },
}

/// Handle to one local participant's session. The coordinator task behind
/// it exclusively owns the peer links; this handle only passes messages.
pub struct Session {
    cmd_tx: mpsc::Sender<SessionCommand>,
    quality_rx: watch::Receiver<QualitySnapshot>,
}

impl Session {
    /// Spawns the coordinator over an established relay connection.
    /// Returns the handle and the application-facing event stream.
    pub fn spawn(
        relay: RelayConnection,
        media: Arc<dyn MediaSource>,
        config: SessionConfig,
    ) -> (Self, mpsc::Receiver<SessionEvent>) {
        let (cmd_tx, cmd_rx) = mpsc::channel(32);
        let (event_tx, event_rx) = mpsc::channel(64);
        let (quality_tx, quality_rx) = watch::channel(QualitySnapshot::default());

        let coordinator =
            SessionCoordinator::new(relay, media, config, cmd_rx, event_tx, quality_tx);
        tokio::spawn(coordinator.run());

        (Self { cmd_tx, quality_rx }, event_rx)
    }

    /// Joins `room` and starts meshing with its members. Rejected before
    /// any relay traffic when the id is blank, a room is already joined,
    /// or local media cannot be acquired.
    pub async fn join_room(&self, room: &str) -> Result<(), SessionError> {
        let (reply, rx) = oneshot::channel();
        self.send(SessionCommand::JoinRoom {
            room: room.to_string(),
            reply,
        })
        .await?;
        rx.await.map_err(|_| SessionError::Terminated)?
    }

    /// Closes every link, stops local media, and tells the relay. Calling
    /// it while not joined is a no-op.
    pub async fn leave_room(&self) -> Result<(), SessionError> {
        let (reply, rx) = oneshot::channel();
        self.send(SessionCommand::LeaveRoom { reply }).await?;
        rx.await.map_err(|_| SessionError::Terminated)
    }

    /// Local-only mute toggle; nothing crosses the relay.
    pub async fn set_audio_enabled(&self, enabled: bool) -> Result<(), SessionError> {
        self.send(SessionCommand::SetAudioEnabled(enabled)).await
    }

    /// Local-only camera toggle; nothing crosses the relay.
    pub async fn set_video_enabled(&self, enabled: bool) -> Result<(), SessionError> {
        self.send(SessionCommand::SetVideoEnabled(enabled)).await
    }

    /// The relay-assigned identity, once the welcome has arrived.
    pub async fn participant(&self) -> Result<Option<ParticipantId>, SessionError> {
        let (reply, rx) = oneshot::channel();
        self.send(SessionCommand::Participant { reply }).await?;
        rx.await.map_err(|_| SessionError::Terminated)
    }

    /// Current links and their phases.
    pub async fn links(&self) -> Result<Vec<LinkInfo>, SessionError> {
        let (reply, rx) = oneshot::channel();
        self.send(SessionCommand::Links { reply }).await?;
        rx.await.map_err(|_| SessionError::Terminated)
    }

    /// Watch side of the quality snapshot, refreshed each sampling round.
    pub fn quality(&self) -> watch::Receiver<QualitySnapshot> {
        self.quality_rx.clone()
    }

    async fn send(&self, cmd: SessionCommand) -> Result<(), SessionError> {
        self.cmd_tx
            .send(cmd)
            .await
            .map_err(|_| SessionError::Terminated)
    }
}
