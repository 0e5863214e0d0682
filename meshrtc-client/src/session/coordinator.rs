use crate::error::SessionError;
use crate::link::{LinkError, LinkEvent, LinkPhase, LinkRole, PeerLink};
use crate::media::{LocalMedia, MediaSource};
use crate::relay::RelayConnection;
use crate::session::{LinkInfo, SessionCommand, SessionConfig, SessionEvent};
use crate::stats::{QualitySampler, QualitySnapshot};
use meshrtc_core::{ClientSignal, ParticipantId, ServerSignal};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};
use webrtc::peer_connection::RTCPeerConnection;
use webrtc::peer_connection::peer_connection_state::RTCPeerConnectionState;

/// States after which the engine gives up on a connection for good.
fn is_terminal(state: RTCPeerConnectionState) -> bool {
    matches!(
        state,
        RTCPeerConnectionState::Failed | RTCPeerConnectionState::Closed
    )
}

/// The one owner of this participant's peer links. Runs as a single task
/// selecting over commands, relay signals, and link engine events, so all
/// link mutations are serialized while individual negotiation steps still
/// interleave across remotes.
pub(crate) struct SessionCoordinator {
    relay: RelayConnection,
    media_source: Arc<dyn MediaSource>,
    config: SessionConfig,

    self_id: Option<ParticipantId>,
    room: Option<String>,
    media: Option<Arc<dyn LocalMedia>>,
    links: HashMap<ParticipantId, PeerLink>,

    cmd_rx: mpsc::Receiver<SessionCommand>,
    link_tx: mpsc::Sender<LinkEvent>,
    link_rx: mpsc::Receiver<LinkEvent>,
    events: mpsc::Sender<SessionEvent>,
    quality_tx: Arc<watch::Sender<QualitySnapshot>>,
    sampler: QualitySampler,
}

impl SessionCoordinator {
    pub(crate) fn new(
        relay: RelayConnection,
        media_source: Arc<dyn MediaSource>,
        config: SessionConfig,
        cmd_rx: mpsc::Receiver<SessionCommand>,
        events: mpsc::Sender<SessionEvent>,
        quality_tx: watch::Sender<QualitySnapshot>,
    ) -> Self {
        let (link_tx, link_rx) = mpsc::channel(256);

        Self {
            relay,
            media_source,
            config,
            self_id: None,
            room: None,
            media: None,
            links: HashMap::new(),
            cmd_rx,
            link_tx,
            link_rx,
            events,
            quality_tx: Arc::new(quality_tx),
            sampler: QualitySampler::new(),
        }
    }

    pub(crate) async fn run(mut self) {
        info!("Session coordinator started");

        let mut stats_tick = tokio::time::interval(self.config.stats_interval);
        stats_tick.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                cmd = self.cmd_rx.recv() => {
                    match cmd {
                        Some(cmd) => self.handle_command(cmd).await,
                        None => break,
                    }
                }

                signal = self.relay.recv() => {
                    match signal {
                        Some(signal) => self.handle_signal(signal).await,
                        None => {
                            warn!("Relay connection closed, shutting down session");
                            break;
                        }
                    }
                }

                Some(event) = self.link_rx.recv() => {
                    self.handle_link_event(event).await;
                }

                _ = stats_tick.tick() => self.sample_quality(),
            }
        }

        self.leave_room().await;
        info!("Session coordinator finished");
    }

    async fn handle_command(&mut self, cmd: SessionCommand) {
        match cmd {
            SessionCommand::JoinRoom { room, reply } => {
                let _ = reply.send(self.join_room(room).await);
            }
            SessionCommand::LeaveRoom { reply } => {
                self.leave_room().await;
                let _ = reply.send(());
            }
            SessionCommand::SetAudioEnabled(enabled) => {
                if let Some(media) = &self.media {
                    media.set_audio_enabled(enabled);
                }
            }
            SessionCommand::SetVideoEnabled(enabled) => {
                if let Some(media) = &self.media {
                    media.set_video_enabled(enabled);
                }
            }
            SessionCommand::Participant { reply } => {
                let _ = reply.send(self.self_id);
            }
            SessionCommand::Links { reply } => {
                let links = self
                    .links
                    .values()
                    .map(|link| LinkInfo {
                        remote: link.remote(),
                        role: link.role(),
                        phase: link.phase(),
                    })
                    .collect();
                let _ = reply.send(links);
            }
        }
    }

    async fn join_room(&mut self, room: String) -> Result<(), SessionError> {
        if room.trim().is_empty() {
            return Err(SessionError::InvalidRoomId);
        }
        if self.room.is_some() {
            return Err(SessionError::AlreadyJoined);
        }

        // Media first: if the device is gone there is nothing to negotiate
        // and the relay must not hear about us at all.
        let media = self.media_source.acquire().await?;

        // The capture must not outlive a failed join.
        if let Err(e) = self
            .relay
            .send(ClientSignal::JoinRoom { room: room.clone() })
            .await
        {
            media.stop();
            return Err(e.into());
        }

        info!("Joined room '{}'", room);
        self.media = Some(media);
        self.room = Some(room);
        Ok(())
    }

    /// Closes every link, stops media, notifies the relay, clears state.
    /// Safe to call at any time; does nothing when not joined.
    async fn leave_room(&mut self) {
        if self.room.is_none() {
            return;
        }

        let remotes: Vec<ParticipantId> = self.links.keys().copied().collect();
        for remote in remotes {
            self.drop_link(remote).await;
        }

        if let Some(media) = self.media.take() {
            media.stop();
        }

        if let Some(room) = self.room.take() {
            info!("Left room '{}'", room);
            if self.relay.send(ClientSignal::LeaveRoom { room }).await.is_err() {
                debug!("Relay gone while leaving");
            }
        }

        let _ = self.quality_tx.send(QualitySnapshot::default());
    }

    async fn handle_signal(&mut self, signal: ServerSignal) {
        if let ServerSignal::Welcome { participant } = &signal {
            info!("Relay assigned identity {}", participant);
            self.self_id = Some(*participant);
            return;
        }

        // Everything else concerns a room; after leaving, in-flight
        // signals for the old room are stale and must be discarded.
        if self.room.is_none() {
            debug!("Discarding signal received while not joined");
            return;
        }

        match signal {
            ServerSignal::AllUsers { users } => self.offer_to_members(users).await,
            ServerSignal::UserJoined { user } => {
                // The newcomer will offer to us; have the link ready.
                self.ensure_link(user, LinkRole::Answerer).await;
            }
            ServerSignal::UserLeft { user } => {
                if self.drop_link(user).await {
                    let _ = self.events.send(SessionEvent::PeerClosed(user)).await;
                }
            }
            ServerSignal::Offer { from, sdp } => self.handle_offer(from, sdp).await,
            ServerSignal::Answer { from, sdp } => self.handle_answer(from, sdp).await,
            ServerSignal::IceCandidate { from, candidate } => {
                // Candidates can beat the user-joined broadcast; unknown
                // senders get a link implicitly, same as for offers.
                if self.ensure_link(from, LinkRole::Answerer).await {
                    if let Some(link) = self.links.get_mut(&from) {
                        link.add_remote_candidate(candidate).await;
                    }
                }
            }
            ServerSignal::Welcome { .. } => unreachable!("handled above"),
        }
    }

    /// The newcomer's side of the mesh: one offerer link per pre-existing
    /// member from the `all-users` list.
    async fn offer_to_members(&mut self, users: Vec<ParticipantId>) {
        for user in users {
            if !self.ensure_link(user, LinkRole::Offerer).await {
                continue;
            }
            let Some(link) = self.links.get_mut(&user) else {
                continue;
            };
            match link.start_offer().await {
                Ok(sdp) => {
                    let _ = self
                        .relay
                        .send(ClientSignal::Offer { target: user, sdp })
                        .await;
                }
                Err(e) => {
                    warn!("Failed to start offer toward {}: {}", user, e);
                    self.drop_link(user).await;
                }
            }
        }
    }

    async fn handle_offer(&mut self, from: ParticipantId, sdp: String) {
        if !self.ensure_link(from, LinkRole::Answerer).await {
            return;
        }
        let Some(link) = self.links.get_mut(&from) else {
            return;
        };
        match link.accept_offer(sdp).await {
            Ok(answer) => {
                let _ = self
                    .relay
                    .send(ClientSignal::Answer {
                        target: from,
                        sdp: answer,
                    })
                    .await;
            }
            Err(LinkError::Rtc(e)) => {
                // Bad SDP kills this one link, nothing else.
                warn!("Negotiation with {} failed: {}", from, e);
                self.drop_link(from).await;
                let _ = self.events.send(SessionEvent::PeerClosed(from)).await;
            }
            Err(e) => debug!("Ignoring offer from {}: {}", from, e),
        }
    }

    async fn handle_answer(&mut self, from: ParticipantId, sdp: String) {
        let Some(link) = self.links.get_mut(&from) else {
            debug!("Answer from {} without a link, discarding", from);
            return;
        };
        match link.accept_answer(sdp).await {
            Ok(()) => {}
            Err(LinkError::Rtc(e)) => {
                warn!("Negotiation with {} failed: {}", from, e);
                self.drop_link(from).await;
                let _ = self.events.send(SessionEvent::PeerClosed(from)).await;
            }
            Err(e) => debug!("Ignoring answer from {}: {}", from, e),
        }
    }

    async fn handle_link_event(&mut self, event: LinkEvent) {
        match event {
            LinkEvent::LocalCandidate { remote, candidate } => {
                // Candidates for a link we already tore down are stale.
                if !self.links.contains_key(&remote) {
                    return;
                }
                let _ = self
                    .relay
                    .send(ClientSignal::IceCandidate {
                        target: remote,
                        candidate,
                    })
                    .await;
            }

            LinkEvent::StateChanged { remote, state } => match state {
                RTCPeerConnectionState::Connected => {
                    if let Some(link) = self.links.get_mut(&remote) {
                        link.mark_connected();
                        let _ = self.events.send(SessionEvent::PeerConnected(remote)).await;
                    }
                }
                state if is_terminal(state) => {
                    if self.drop_link(remote).await {
                        let _ = self.events.send(SessionEvent::PeerClosed(remote)).await;
                    }
                }
                RTCPeerConnectionState::Disconnected => {
                    // Transient in the engine's model; often recovers by
                    // itself. Tearing down here would leave a permanent
                    // hole in the mesh, since neither side re-offers.
                    debug!("Link toward {} disconnected, awaiting recovery", remote);
                }
                _ => {}
            },

            LinkEvent::RemoteTrack { remote, track } => {
                if self.links.contains_key(&remote) {
                    let _ = self
                        .events
                        .send(SessionEvent::RemoteTrack {
                            from: remote,
                            track,
                        })
                        .await;
                }
            }
        }
    }

    /// Creates a link toward `remote` unless one already exists. Returns
    /// whether a link (new or existing) is in place afterwards.
    async fn ensure_link(&mut self, remote: ParticipantId, role: LinkRole) -> bool {
        if self.links.contains_key(&remote) {
            return true;
        }
        let Some(media) = &self.media else {
            return false;
        };

        match PeerLink::new(
            remote,
            role,
            self.config.ice_servers.clone(),
            &media.tracks(),
            self.link_tx.clone(),
        )
        .await
        {
            Ok(link) => {
                debug!("Created {:?} link toward {}", role, remote);
                self.links.insert(remote, link);
                true
            }
            Err(e) => {
                warn!("Failed to create link toward {}: {}", remote, e);
                false
            }
        }
    }

    /// Closes and removes the link toward `remote`; returns whether one
    /// existed. After this, every in-flight message for that identifier is
    /// discarded until a fresh link is created.
    async fn drop_link(&mut self, remote: ParticipantId) -> bool {
        let Some(mut link) = self.links.remove(&remote) else {
            return false;
        };
        link.close().await;
        debug!("Closed link toward {}", remote);
        true
    }

    fn sample_quality(&self) {
        if self.room.is_none() {
            return;
        }
        let targets: Vec<(ParticipantId, Arc<RTCPeerConnection>)> = self
            .links
            .values()
            .filter(|link| link.phase() != LinkPhase::Closed)
            .map(|link| (link.remote(), link.connection()))
            .collect();
        self.sampler.spawn(targets, self.quality_tx.clone());
    }
}
