use meshrtc_core::ParticipantId;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::watch;
use tracing::debug;
use webrtc::peer_connection::RTCPeerConnection;

/// Metrics for one link, sampled best-effort. `None` means the engine did
/// not report that metric this round, not that anything is wrong.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LinkQuality {
    pub frames_per_second: Option<f64>,
    pub round_trip_ms: Option<f64>,
    pub frames_decoded: Option<u64>,
    pub packets_lost: Option<i64>,
    pub jitter: Option<f64>,
}

/// Latest per-remote quality readings, published once per sampling round.
pub type QualitySnapshot = HashMap<ParticipantId, LinkQuality>;

/// Read-only statistics poller. Runs detached from the coordinator loop so
/// a slow or failing `get_stats` never touches negotiation. At most one
/// round is in flight at a time: a round that outlives its interval would
/// otherwise race a newer one and publish a stale snapshot over it.
pub struct QualitySampler {
    in_flight: Arc<AtomicBool>,
}

impl QualitySampler {
    pub(crate) fn new() -> Self {
        Self {
            in_flight: Arc::new(AtomicBool::new(false)),
        }
    }

    pub(crate) fn spawn(
        &self,
        targets: Vec<(ParticipantId, Arc<RTCPeerConnection>)>,
        out: Arc<watch::Sender<QualitySnapshot>>,
    ) {
        if self.in_flight.swap(true, Ordering::AcqRel) {
            debug!("Previous sampling round still running, skipping this one");
            return;
        }

        let in_flight = self.in_flight.clone();
        tokio::spawn(async move {
            let mut snapshot = QualitySnapshot::new();
            for (remote, pc) in targets {
                let report = pc.get_stats().await;
                let quality = match serde_json::to_value(&report.reports) {
                    Ok(reports) => extract_quality(&reports),
                    Err(e) => {
                        debug!("Could not read stats for {}: {}", remote, e);
                        LinkQuality::default()
                    }
                };
                snapshot.insert(remote, quality);
            }
            let _ = out.send(snapshot);
            in_flight.store(false, Ordering::Release);
        });
    }
}

/// Pulls the interesting numbers out of a serialized stats report: the
/// video `inbound-rtp` entry and the succeeded `candidate-pair` entry.
/// Anything missing stays `None`.
pub fn extract_quality(reports: &Value) -> LinkQuality {
    let mut quality = LinkQuality::default();
    let mut have_video_inbound = false;

    let entries: Vec<&Value> = match reports {
        Value::Object(map) => map.values().collect(),
        Value::Array(list) => list.iter().collect(),
        _ => return quality,
    };

    for report in entries {
        match report.get("type").and_then(Value::as_str) {
            Some("inbound-rtp") => {
                let kind = report.get("kind").and_then(Value::as_str);
                let is_video = kind == Some("video");
                // Prefer the video stream, but take anything over nothing.
                if have_video_inbound || (!is_video && quality.packets_lost.is_some()) {
                    continue;
                }
                quality.frames_per_second =
                    report.get("framesPerSecond").and_then(Value::as_f64);
                quality.frames_decoded = report.get("framesDecoded").and_then(Value::as_u64);
                quality.packets_lost = report.get("packetsLost").and_then(Value::as_i64);
                quality.jitter = report.get("jitter").and_then(Value::as_f64);
                have_video_inbound = is_video;
            }
            Some("candidate-pair") => {
                let succeeded =
                    report.get("state").and_then(Value::as_str) == Some("succeeded")
                        || report.get("nominated").and_then(Value::as_bool) == Some(true);
                if !succeeded || quality.round_trip_ms.is_some() {
                    continue;
                }
                quality.round_trip_ms = report
                    .get("currentRoundTripTime")
                    .and_then(Value::as_f64)
                    .map(|seconds| seconds * 1000.0);
            }
            _ => {}
        }
    }

    quality
}
