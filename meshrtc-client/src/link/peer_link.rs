use meshrtc_core::{CandidateInit, ParticipantId};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use webrtc::api::APIBuilder;
use webrtc::api::interceptor_registry::register_default_interceptors;
use webrtc::api::media_engine::MediaEngine;
use webrtc::ice_transport::ice_candidate::{RTCIceCandidate, RTCIceCandidateInit};
use webrtc::ice_transport::ice_server::RTCIceServer;
use webrtc::interceptor::registry::Registry;
use webrtc::peer_connection::RTCPeerConnection;
use webrtc::peer_connection::configuration::RTCConfiguration;
use webrtc::peer_connection::peer_connection_state::RTCPeerConnectionState;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;
use webrtc::rtp_transceiver::RTCRtpTransceiver;
use webrtc::rtp_transceiver::rtp_receiver::RTCRtpReceiver;
use webrtc::track::track_local::TrackLocal;
use webrtc::track::track_remote::TrackRemote;

/// Which side of the handshake this link plays. Fixed at creation by
/// direction of discovery: whoever learned of the other from the member
/// list offers; whoever was announced to answers. Both sides agreeing on
/// this by construction is what prevents glare.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkRole {
    Offerer,
    Answerer,
}

/// Negotiation phase of one link. `Closed` is terminal and reachable from
/// every other phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkPhase {
    New,
    Negotiating,
    Connected,
    Closed,
}

/// Events a link's engine callbacks push back to the coordinator loop.
pub enum LinkEvent {
    LocalCandidate {
        remote: ParticipantId,
        candidate: CandidateInit,
    },
    StateChanged {
        remote: ParticipantId,
        state: RTCPeerConnectionState,
    },
    RemoteTrack {
        remote: ParticipantId,
        track: Arc<TrackRemote>,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum LinkError {
    #[error("link is closed")]
    Closed,
    #[error("{0} operation on {1:?} link")]
    WrongRole(&'static str, LinkRole),
    #[error(transparent)]
    Rtc(#[from] webrtc::Error),
}

/// One direct media connection to one remote participant. Owned and driven
/// exclusively by the session coordinator; the engine's callbacks only
/// report back through the [`LinkEvent`] channel.
pub struct PeerLink {
    remote: ParticipantId,
    role: LinkRole,
    phase: LinkPhase,
    pc: Arc<RTCPeerConnection>,
    /// Remote candidates that arrived before the remote description.
    /// Flushed in arrival order the moment the description lands.
    pending_candidates: Vec<CandidateInit>,
    remote_description_set: bool,
}

impl PeerLink {
    /// Builds the underlying connection, attaches the shared local tracks,
    /// and wires engine callbacks into `event_tx`.
    pub async fn new(
        remote: ParticipantId,
        role: LinkRole,
        ice_servers: Vec<String>,
        tracks: &[Arc<dyn TrackLocal + Send + Sync>],
        event_tx: mpsc::Sender<LinkEvent>,
    ) -> Result<Self, LinkError> {
        let mut media_engine = MediaEngine::default();
        media_engine.register_default_codecs()?;

        let registry = register_default_interceptors(Registry::new(), &mut media_engine)?;

        let api = APIBuilder::new()
            .with_media_engine(media_engine)
            .with_interceptor_registry(registry)
            .build();

        let rtc_config = RTCConfiguration {
            ice_servers: if ice_servers.is_empty() {
                vec![]
            } else {
                vec![RTCIceServer {
                    urls: ice_servers,
                    ..Default::default()
                }]
            },
            ..Default::default()
        };

        let pc = Arc::new(api.new_peer_connection(rtc_config).await?);

        for track in tracks {
            pc.add_track(track.clone()).await?;
        }

        // Trickle ICE: every locally gathered candidate goes out as soon as
        // the engine produces it.
        let ice_tx = event_tx.clone();
        pc.on_ice_candidate(Box::new(move |c: Option<RTCIceCandidate>| {
            let tx = ice_tx.clone();
            Box::pin(async move {
                let Some(candidate) = c else { return };
                let Ok(init) = candidate.to_json() else {
                    return;
                };
                let _ = tx
                    .send(LinkEvent::LocalCandidate {
                        remote,
                        candidate: CandidateInit {
                            candidate: init.candidate,
                            sdp_mid: init.sdp_mid,
                            sdp_m_line_index: init.sdp_mline_index,
                        },
                    })
                    .await;
            })
        }));

        let state_tx = event_tx.clone();
        pc.on_peer_connection_state_change(Box::new(move |state: RTCPeerConnectionState| {
            let tx = state_tx.clone();
            Box::pin(async move {
                info!("Connection state toward {}: {:?}", remote, state);
                let _ = tx.send(LinkEvent::StateChanged { remote, state }).await;
            })
        }));

        let track_tx = event_tx;
        pc.on_track(Box::new(
            move |track: Arc<TrackRemote>,
                  _receiver: Arc<RTCRtpReceiver>,
                  _transceiver: Arc<RTCRtpTransceiver>| {
                let tx = track_tx.clone();
                Box::pin(async move {
                    debug!("Remote track from {}: {}", remote, track.id());
                    let _ = tx.send(LinkEvent::RemoteTrack { remote, track }).await;
                })
            },
        ));

        Ok(Self {
            remote,
            role,
            phase: LinkPhase::New,
            pc,
            pending_candidates: Vec::new(),
            remote_description_set: false,
        })
    }

    pub fn remote(&self) -> ParticipantId {
        self.remote
    }

    pub fn role(&self) -> LinkRole {
        self.role
    }

    pub fn phase(&self) -> LinkPhase {
        self.phase
    }

    /// Connection handle for read-only statistics sampling.
    pub fn connection(&self) -> Arc<RTCPeerConnection> {
        self.pc.clone()
    }

    /// Offerer path: produce and install the local offer. The caller sends
    /// the returned SDP to the remote over the relay.
    pub async fn start_offer(&mut self) -> Result<String, LinkError> {
        self.ensure_open()?;
        if self.role != LinkRole::Offerer {
            return Err(LinkError::WrongRole("offer", self.role));
        }

        let offer = self.pc.create_offer(None).await?;
        let sdp = offer.sdp.clone();
        self.pc.set_local_description(offer).await?;
        self.phase = LinkPhase::Negotiating;
        Ok(sdp)
    }

    /// Answerer path: apply the remote offer and produce the local answer
    /// for the caller to send back.
    pub async fn accept_offer(&mut self, sdp: String) -> Result<String, LinkError> {
        self.ensure_open()?;
        if self.role != LinkRole::Answerer {
            return Err(LinkError::WrongRole("accept_offer", self.role));
        }

        let offer = RTCSessionDescription::offer(sdp)?;
        self.pc.set_remote_description(offer).await?;
        self.remote_description_set = true;
        self.flush_pending_candidates().await;

        let answer = self.pc.create_answer(None).await?;
        let sdp = answer.sdp.clone();
        self.pc.set_local_description(answer).await?;
        self.phase = LinkPhase::Negotiating;
        Ok(sdp)
    }

    /// Offerer path, final negotiation step: apply the remote answer.
    pub async fn accept_answer(&mut self, sdp: String) -> Result<(), LinkError> {
        self.ensure_open()?;
        if self.role != LinkRole::Offerer {
            return Err(LinkError::WrongRole("accept_answer", self.role));
        }

        let answer = RTCSessionDescription::answer(sdp)?;
        self.pc.set_remote_description(answer).await?;
        self.remote_description_set = true;
        self.flush_pending_candidates().await;
        Ok(())
    }

    /// Applies a remote candidate, or buffers it when the remote
    /// description is not in place yet. Candidates for a closed link are
    /// dropped.
    pub async fn add_remote_candidate(&mut self, candidate: CandidateInit) {
        if self.phase == LinkPhase::Closed {
            return;
        }
        if !self.remote_description_set {
            self.pending_candidates.push(candidate);
            return;
        }
        self.apply_candidate(candidate).await;
    }

    /// Marks ICE success. No-op once closed.
    pub fn mark_connected(&mut self) {
        if self.phase != LinkPhase::Closed {
            self.phase = LinkPhase::Connected;
        }
    }

    /// Terminal: releases the engine connection. Further operations fail
    /// or are ignored; the coordinator drops the link right after.
    pub async fn close(&mut self) {
        if self.phase == LinkPhase::Closed {
            return;
        }
        self.phase = LinkPhase::Closed;
        self.pending_candidates.clear();
        if let Err(e) = self.pc.close().await {
            debug!("Error closing connection to {}: {}", self.remote, e);
        }
    }

    #[cfg(test)]
    pub(crate) fn pending_candidates(&self) -> &[CandidateInit] {
        &self.pending_candidates
    }

    fn ensure_open(&self) -> Result<(), LinkError> {
        if self.phase == LinkPhase::Closed {
            return Err(LinkError::Closed);
        }
        Ok(())
    }

    async fn flush_pending_candidates(&mut self) {
        for candidate in std::mem::take(&mut self.pending_candidates) {
            self.apply_candidate(candidate).await;
        }
    }

    async fn apply_candidate(&self, candidate: CandidateInit) {
        let init = RTCIceCandidateInit {
            candidate: candidate.candidate,
            sdp_mid: candidate.sdp_mid,
            sdp_mline_index: candidate.sdp_m_line_index,
            username_fragment: None,
        };
        if let Err(e) = self.pc.add_ice_candidate(init).await {
            warn!("Failed to add ICE candidate for {}: {}", self.remote, e);
        }
    }
}
