//! WebSocket room handler.
//!
//! Every text frame a member sends is broadcast to the whole room, the
//! sender included. The relay never looks inside envelopes; frames that are
//! not JSON are wrapped so that clients only ever receive JSON.

use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use serde_json::json;
use tokio::sync::broadcast::error::RecvError;

use crate::state::RelayState;

/// Sent to a new member only, right after the upgrade.
pub const CONNECTED_NOTICE: &str = r#"{"type":"system","message":"connected to server"}"#;

/// Frame to broadcast for a text message received from a member.
pub fn relay_frame(text: &str) -> String {
    match serde_json::from_str::<serde_json::Value>(text) {
        Ok(_) => text.to_string(),
        Err(_) => json!({ "type": "text", "message": text }).to_string(),
    }
}

/// Handle one member of `room` for the lifetime of its connection.
pub async fn handle_websocket(socket: WebSocket, room: String, state: RelayState) {
    let (mut ws_sender, mut ws_receiver) = socket.split();
    let (room_tx, mut room_rx) = state.join_room(&room);
    tracing::info!(room = room.as_str(), "Member joined");

    // ── Step 1: Greet ─────────────────────────────────────────────────────

    if ws_sender
        .send(Message::Text(CONNECTED_NOTICE.to_string()))
        .await
        .is_err()
    {
        drop(room_rx);
        state.leave_room(&room);
        return;
    }

    // ── Step 2: Spawn Sender Task ─────────────────────────────────────────

    let forward_room = room.clone();
    let sender_task = tokio::spawn(async move {
        loop {
            match room_rx.recv().await {
                Ok(frame) => {
                    if ws_sender.send(Message::Text(frame)).await.is_err() {
                        break; // Connection closed
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(
                        room = forward_room.as_str(),
                        skipped,
                        "Member lagging, frames dropped"
                    );
                }
                Err(RecvError::Closed) => break,
            }
        }
    });

    // ── Step 3: Relay Incoming Frames ─────────────────────────────────────

    while let Some(msg_result) = ws_receiver.next().await {
        match msg_result {
            Ok(Message::Text(text)) => {
                tracing::debug!(room = room.as_str(), bytes = text.len(), "Relaying frame");
                let _ = room_tx.send(relay_frame(&text));
            }
            Ok(Message::Close(_)) => break,
            Err(e) => {
                tracing::warn!(room = room.as_str(), error = %e, "WebSocket error");
                break;
            }
            _ => {} // Binary, Ping, Pong
        }
    }

    // ── Step 4: Cleanup ───────────────────────────────────────────────────

    sender_task.abort();
    let _ = sender_task.await;
    drop(room_tx);
    state.leave_room(&room);
    tracing::info!(room = room.as_str(), "Member left");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_frames_pass_through() {
        let envelope = r#"{"type":"message","from":"a","to":"b","ciphertext":"AQID"}"#;
        assert_eq!(relay_frame(envelope), envelope);
    }

    #[test]
    fn test_plain_text_is_wrapped() {
        let frame: serde_json::Value = serde_json::from_str(&relay_frame("hello")).unwrap();
        assert_eq!(frame["type"], "text");
        assert_eq!(frame["message"], "hello");
    }

    #[test]
    fn test_connected_notice_shape() {
        let notice: serde_json::Value = serde_json::from_str(CONNECTED_NOTICE).unwrap();
        assert_eq!(notice["type"], "system");
        assert_eq!(notice["message"], "connected to server");
    }
}
