//! WebSocket upgrade handler

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::app::AppState;
use crate::game::ArenaCommand;
use crate::util::rate_limit::PlayerRateLimiter;
use crate::ws::protocol::{ClientMsg, ServerMsg};

/// WebSocket upgrade handler
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handle the upgraded WebSocket connection
async fn handle_socket(socket: WebSocket, state: AppState) {
    let conn_id = Uuid::new_v4();
    info!(conn_id = %conn_id, "New WebSocket connection");

    let (mut ws_sink, mut ws_stream) = socket.split();

    // Register with the arena; it answers with `init`, or `gameFull` and a
    // dropped sender when both slots are taken.
    let (tx, mut rx) = mpsc::unbounded_channel();
    state.arena.send(ArenaCommand::Connect { id: conn_id, tx }).await;

    let rate_limiter = PlayerRateLimiter::new();

    loop {
        tokio::select! {
            outbound = rx.recv() => match outbound {
                Some(msg) => {
                    if let Err(e) = send_msg(&mut ws_sink, &msg).await {
                        debug!(conn_id = %conn_id, error = %e, "WebSocket send failed");
                        break;
                    }
                }
                None => {
                    // Arena dropped us: rejected connection or shutdown
                    debug!(conn_id = %conn_id, "Server closed session");
                    break;
                }
            },
            inbound = ws_stream.next() => match inbound {
                Some(Ok(Message::Text(text))) => {
                    if !rate_limiter.check_input() {
                        warn!(conn_id = %conn_id, "Rate limited input message");
                        continue;
                    }
                    match serde_json::from_str::<ClientMsg>(&text) {
                        Ok(msg) => {
                            state.arena.send(ArenaCommand::Client { id: conn_id, msg }).await;
                        }
                        Err(e) => {
                            warn!(conn_id = %conn_id, error = %e, "Failed to parse client message");
                        }
                    }
                }
                Some(Ok(Message::Binary(_))) => {
                    warn!(conn_id = %conn_id, "Received binary message, ignoring");
                }
                Some(Ok(Message::Ping(_) | Message::Pong(_))) => {}
                Some(Ok(Message::Close(_))) => {
                    info!(conn_id = %conn_id, "Client initiated close");
                    break;
                }
                Some(Err(e)) => {
                    error!(conn_id = %conn_id, error = %e, "WebSocket error");
                    break;
                }
                None => break,
            }
        }
    }

    // Frees the slot; a never-seated connection is a lookup miss
    state.arena.send(ArenaCommand::Disconnect { id: conn_id }).await;

    info!(conn_id = %conn_id, "WebSocket connection closed");
}

/// Send a message over WebSocket
async fn send_msg(
    sink: &mut futures::stream::SplitSink<WebSocket, Message>,
    msg: &ServerMsg,
) -> Result<(), String> {
    let json = serde_json::to_string(msg).map_err(|e| e.to_string())?;
    sink.send(Message::Text(json))
        .await
        .map_err(|e| e.to_string())
}
