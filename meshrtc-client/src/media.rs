use crate::error::MediaError;
use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use webrtc::api::media_engine::{MIME_TYPE_OPUS, MIME_TYPE_VP8};
use webrtc::rtp_transceiver::rtp_codec::RTCRtpCodecCapability;
use webrtc::track::track_local::TrackLocal;
use webrtc::track::track_local::track_local_static_sample::TrackLocalStaticSample;

/// On-device capture capability. Acquisition may fail (device absent,
/// permission denied); every peer link then attaches the same tracks.
#[async_trait]
pub trait MediaSource: Send + Sync {
    async fn acquire(&self) -> Result<Arc<dyn LocalMedia>, MediaError>;
}

/// A live local capture. Enable toggles are local-only: they never cause
/// renegotiation and are invisible to the relay.
pub trait LocalMedia: Send + Sync {
    /// Tracks to attach to every peer connection.
    fn tracks(&self) -> Vec<Arc<dyn TrackLocal + Send + Sync>>;

    fn set_audio_enabled(&self, enabled: bool);
    fn set_video_enabled(&self, enabled: bool);
    fn audio_enabled(&self) -> bool;
    fn video_enabled(&self) -> bool;

    /// Releases the capture. Called only after every link is closed.
    fn stop(&self);
}

/// Media source backed by static sample tracks (Opus audio, VP8 video).
/// Stands in for real capture in tests and demos; production embedders
/// supply their own [`MediaSource`].
pub struct StaticMedia;

#[async_trait]
impl MediaSource for StaticMedia {
    async fn acquire(&self) -> Result<Arc<dyn LocalMedia>, MediaError> {
        let audio = Arc::new(TrackLocalStaticSample::new(
            RTCRtpCodecCapability {
                mime_type: MIME_TYPE_OPUS.to_owned(),
                ..Default::default()
            },
            "audio".to_owned(),
            "meshrtc".to_owned(),
        ));
        let video = Arc::new(TrackLocalStaticSample::new(
            RTCRtpCodecCapability {
                mime_type: MIME_TYPE_VP8.to_owned(),
                ..Default::default()
            },
            "video".to_owned(),
            "meshrtc".to_owned(),
        ));

        Ok(Arc::new(StaticTracks {
            audio,
            video,
            audio_enabled: AtomicBool::new(true),
            video_enabled: AtomicBool::new(true),
            stopped: AtomicBool::new(false),
        }))
    }
}

struct StaticTracks {
    audio: Arc<TrackLocalStaticSample>,
    video: Arc<TrackLocalStaticSample>,
    audio_enabled: AtomicBool,
    video_enabled: AtomicBool,
    stopped: AtomicBool,
}

impl LocalMedia for StaticTracks {
    fn tracks(&self) -> Vec<Arc<dyn TrackLocal + Send + Sync>> {
        vec![self.audio.clone(), self.video.clone()]
    }

    fn set_audio_enabled(&self, enabled: bool) {
        self.audio_enabled.store(enabled, Ordering::Relaxed);
    }

    fn set_video_enabled(&self, enabled: bool) {
        self.video_enabled.store(enabled, Ordering::Relaxed);
    }

    fn audio_enabled(&self) -> bool {
        self.audio_enabled.load(Ordering::Relaxed)
    }

    fn video_enabled(&self) -> bool {
        self.video_enabled.load(Ordering::Relaxed)
    }

    fn stop(&self) {
        self.stopped.store(true, Ordering::Relaxed);
    }
}
