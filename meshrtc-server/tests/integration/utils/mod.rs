use meshrtc_core::{ClientSignal, ParticipantId, ServerSignal};
use meshrtc_server::SignalingRelay;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::Level;

/// Timeout for receiving an expected signal (ms).
pub const RECV_TIMEOUT_MS: u64 = 1000;

/// How long a channel must stay quiet to count as "nothing delivered" (ms).
pub const SILENCE_WINDOW_MS: u64 = 100;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(Level::DEBUG)
        .with_test_writer()
        .try_init();
}

/// A fake connection registered directly with the relay: the unbounded
/// channel stands in for the WebSocket send task.
pub struct TestPeer {
    pub id: ParticipantId,
    relay: SignalingRelay,
    rx: mpsc::UnboundedReceiver<ServerSignal>,
}

impl TestPeer {
    /// Connects to the relay and consumes the `welcome` signal.
    pub async fn connect(relay: &SignalingRelay) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = relay.connect(tx);

        let mut peer = Self {
            id,
            relay: relay.clone(),
            rx,
        };

        match peer.recv().await {
            ServerSignal::Welcome { participant } => assert_eq!(participant, id),
            other => panic!("expected welcome, got {:?}", other),
        }

        peer
    }

    pub fn join(&self, room: &str) {
        self.relay.handle(
            self.id,
            ClientSignal::JoinRoom {
                room: room.to_string(),
            },
        );
    }

    pub fn leave(&self, room: &str) {
        self.relay.handle(
            self.id,
            ClientSignal::LeaveRoom {
                room: room.to_string(),
            },
        );
    }

    pub fn send(&self, signal: ClientSignal) {
        self.relay.handle(self.id, signal);
    }

    pub fn disconnect(&self) {
        self.relay.disconnect(self.id);
    }

    /// Next delivered signal, or a panic after [`RECV_TIMEOUT_MS`].
    pub async fn recv(&mut self) -> ServerSignal {
        tokio::time::timeout(Duration::from_millis(RECV_TIMEOUT_MS), self.rx.recv())
            .await
            .expect("timed out waiting for signal")
            .expect("connection channel closed")
    }

    /// Joins `room` and returns the `all-users` reply.
    pub async fn join_and_members(&mut self, room: &str) -> Vec<ParticipantId> {
        self.join(room);
        match self.recv().await {
            ServerSignal::AllUsers { users } => users,
            other => panic!("expected all-users, got {:?}", other),
        }
    }

    /// Asserts that nothing arrives within the silence window.
    pub async fn assert_silent(&mut self) {
        let quiet =
            tokio::time::timeout(Duration::from_millis(SILENCE_WINDOW_MS), self.rx.recv()).await;
        if let Ok(Some(signal)) = quiet {
            panic!("expected silence, got {:?}", signal);
        }
    }
}
