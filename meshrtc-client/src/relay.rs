use crate::error::RelayError;
use futures::{SinkExt, StreamExt};
use meshrtc_core::{ClientSignal, ServerSignal};
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, warn};

/// Client end of the signaling channel: a pair of FIFO pipes to and from
/// the relay. Production connections ride a WebSocket; tests wire the
/// channels straight to an in-process relay via [`RelayConnection::from_channels`].
pub struct RelayConnection {
    tx: mpsc::Sender<ClientSignal>,
    rx: mpsc::Receiver<ServerSignal>,
}

impl RelayConnection {
    pub async fn connect(url: &str) -> Result<Self, RelayError> {
        let (ws_stream, _) = connect_async(url).await?;
        let (mut write, mut read) = ws_stream.split();

        let (outgoing_tx, mut outgoing_rx) = mpsc::channel::<ClientSignal>(64);
        let (incoming_tx, incoming_rx) = mpsc::channel::<ServerSignal>(64);

        tokio::spawn(async move {
            while let Some(signal) = outgoing_rx.recv().await {
                let json = match serde_json::to_string(&signal) {
                    Ok(json) => json,
                    Err(e) => {
                        warn!("Failed to serialize signal: {}", e);
                        continue;
                    }
                };
                if write.send(Message::Text(json.into())).await.is_err() {
                    break;
                }
            }
        });

        tokio::spawn(async move {
            while let Some(Ok(msg)) = read.next().await {
                let Message::Text(text) = msg else { continue };
                match serde_json::from_str::<ServerSignal>(&text) {
                    Ok(signal) => {
                        if incoming_tx.send(signal).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => warn!("Invalid signal from relay: {:?}", e),
                }
            }
            debug!("Relay socket closed");
        });

        Ok(Self {
            tx: outgoing_tx,
            rx: incoming_rx,
        })
    }

    /// Builds a connection over pre-wired channels, bypassing the network.
    pub fn from_channels(
        tx: mpsc::Sender<ClientSignal>,
        rx: mpsc::Receiver<ServerSignal>,
    ) -> Self {
        Self { tx, rx }
    }

    pub async fn send(&self, signal: ClientSignal) -> Result<(), RelayError> {
        self.tx.send(signal).await.map_err(|_| RelayError::Closed)
    }

    /// Next signal from the relay; `None` once the connection is gone.
    pub async fn recv(&mut self) -> Option<ServerSignal> {
        self.rx.recv().await
    }
}
