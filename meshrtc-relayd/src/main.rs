use anyhow::Context;
use clap::Parser;
use meshrtc_server::{SignalingRelay, router};
use std::net::SocketAddr;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Standalone signaling relay for full-mesh rooms.
#[derive(Parser)]
#[command(name = "meshrtc-relayd", version)]
struct Args {
    /// Address the websocket endpoint listens on.
    #[arg(long, default_value = "0.0.0.0:5000")]
    listen: SocketAddr,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let args = Args::parse();

    let relay = SignalingRelay::new();
    let app = router(relay);

    info!("Signaling relay listening on ws://{}/ws", args.listen);
    let listener = tokio::net::TcpListener::bind(args.listen)
        .await
        .with_context(|| format!("failed to bind {}", args.listen))?;
    axum::serve(listener, app).await.context("relay server failed")?;

    Ok(())
}
