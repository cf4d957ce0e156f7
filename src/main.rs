mod agent;
mod config;
mod knowledge;
mod msg;
mod net;
mod world;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tracing::info;

use agent::Agent;
use world::sim::SimWorld;

static NEXT_CONN_ID: AtomicU64 = AtomicU64::new(1);

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_timer(tracing_subscriber::fmt::time::uptime())
        .init();

    let addr = format!("0.0.0.0:{}", config::PORT);
    let listener = TcpListener::bind(&addr).await.expect("Failed to bind");
    info!("Control channel listening on ws://{addr}");

    // Offline world for now; a live deployment hands the same Agent a
    // facade bound to a real server connection.
    let world = Arc::new(SimWorld::demo());
    let (events, _) = broadcast::channel(256);
    let agent = Arc::new(Agent::new(world, events.clone()));
    info!("Agent ready in simulated world");

    loop {
        let (stream, peer_addr) = match listener.accept().await {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!("Accept error: {e}");
                continue;
            }
        };

        let conn_id = NEXT_CONN_ID.fetch_add(1, Ordering::Relaxed);
        info!("New controller {conn_id} from {peer_addr}");

        let ws_stream = match tokio_tungstenite::accept_async(stream).await {
            Ok(ws) => ws,
            Err(e) => {
                tracing::warn!("WebSocket handshake failed for {peer_addr}: {e}");
                continue;
            }
        };

        let agent = agent.clone();
        let events_rx = events.subscribe();
        tokio::spawn(async move {
            net::handle_connection(ws_stream, conn_id, agent, events_rx).await;
        });
    }
}
