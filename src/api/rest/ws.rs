use std::sync::Arc;

use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures::SinkExt;
use futures::StreamExt;
use serde::Deserialize;
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::models::ticket::Office;
use crate::state::AppState;

/// Room membership commands sent by dashboards and monitors. Clients re-send
/// their joins after a reconnect; the server keeps no membership across
/// disconnects.
#[derive(Deserialize)]
#[serde(tag = "action", rename_all = "lowercase")]
enum ClientCommand {
    Join { room: String },
    Leave { room: String },
}

fn known_room(room: &str) -> bool {
    room.strip_prefix("admin-")
        .or_else(|| room.strip_prefix("kiosk-"))
        .is_some_and(|office| office.parse::<Office>().is_ok())
}

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let (mut sender, mut receiver) = socket.split();
    let conn_id = Uuid::new_v4();
    let (tx, mut rx) = mpsc::channel(state.event_buffer_size);

    state.metrics.ws_connections.inc();
    info!(%conn_id, "websocket client connected");

    let send_task = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            let json = match serde_json::to_string(&event) {
                Ok(json) => json,
                Err(err) => {
                    warn!(error = %err, "failed to serialize event for ws");
                    continue;
                }
            };

            if sender.send(Message::Text(json.into())).await.is_err() {
                break;
            }
        }
    });

    let recv_state = state.clone();
    let recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            let Message::Text(text) = msg else {
                continue;
            };
            match serde_json::from_str::<ClientCommand>(&text) {
                Ok(ClientCommand::Join { room }) if known_room(&room) => {
                    recv_state.rooms.join(conn_id, &room, tx.clone());
                }
                Ok(ClientCommand::Leave { room }) => {
                    recv_state.rooms.leave(conn_id, &room);
                }
                Ok(ClientCommand::Join { room }) => {
                    warn!(%conn_id, room, "join rejected: unknown room");
                }
                Err(err) => {
                    warn!(%conn_id, error = %err, "unparseable ws command");
                }
            }
        }
    });

    tokio::select! {
        _ = send_task => {},
        _ = recv_task => {},
    }

    state.rooms.leave_all(conn_id);
    state.metrics.ws_connections.dec();
    info!(%conn_id, "websocket client disconnected");
}

#[cfg(test)]
mod tests {
    use super::known_room;

    #[test]
    fn room_names_are_validated() {
        assert!(known_room("admin-registrar"));
        assert!(known_room("kiosk-admissions"));
        assert!(known_room("admin-mis"));
        assert!(!known_room("admin-unknown"));
        assert!(!known_room("registrar"));
        assert!(!known_room("staff-registrar"));
    }
}
