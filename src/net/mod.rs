//! WebSocket control channel: JSON intent documents in, chat and status
//! events out. One agent serves every connection; events are broadcast.

use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::broadcast;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;
use tracing::{info, warn};

use crate::agent::Agent;
use crate::msg::{self, Event, IntentDocument};
use crate::world::World;

/// Run a single control connection: read frames -> agent, events -> write frames.
pub async fn handle_connection<W: World>(
    ws_stream: WebSocketStream<TcpStream>,
    conn_id: u64,
    agent: Arc<Agent<W>>,
    mut events: broadcast::Receiver<Event>,
) {
    let (mut ws_write, mut ws_read) = ws_stream.split();

    // Write task: broadcast events -> JSON text frames.
    let write_task = tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => {
                    let frame = match serde_json::to_string(&event) {
                        Ok(frame) => frame,
                        Err(_) => continue,
                    };
                    if ws_write.send(Message::Text(frame)).await.is_err() {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(conn_id, skipped, "event stream lagged");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    // Read loop: each frame is one intent document. Dispatch on its own
    // task so stop and status still get through while a plan runs.
    while let Some(Ok(message)) = ws_read.next().await {
        match message {
            Message::Text(raw) => {
                let document = match msg::parse_intent(&raw) {
                    Ok(document) => document,
                    Err(e) => {
                        warn!(conn_id, error = %e, "unparseable intent");
                        IntentDocument::Failure { error: e.to_string() }
                    }
                };
                let agent = agent.clone();
                tokio::spawn(async move { agent.handle(document).await });
            }
            Message::Close(_) => break,
            _ => {} // ignore binary, ping, pong
        }
    }

    write_task.abort();
    info!(conn_id, "control connection closed");
}
