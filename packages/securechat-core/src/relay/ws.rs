//! WebSocket relay transport.
//!
//! Joins `{relay_url}/ws/chat/{room}/`. The connection counts as open once
//! the relay's first frame arrives. After that it runs two tasks: a writer
//! draining the outbound channel into the socket and a reader forwarding
//! text frames into the inbound channel.

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::Message};

use super::{RelayLink, RelayTransport};
use crate::error::{Error, Result};

/// Relay transport over a WebSocket connection
#[derive(Debug, Clone)]
pub struct WsTransport {
    base_url: String,
}

impl WsTransport {
    /// Transport for the relay at `base_url` (`ws://` or `wss://`)
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// WebSocket URL of `room`
    pub fn room_url(&self, room: &str) -> String {
        format!("{}/ws/chat/{}/", self.base_url, urlencoding::encode(room))
    }
}

#[async_trait]
impl RelayTransport for WsTransport {
    async fn open(&self, room: &str) -> Result<RelayLink> {
        let url = self.room_url(room);
        let (socket, _response) = connect_async(url.as_str()).await?;
        tracing::debug!(url = url.as_str(), "WebSocket connected");

        let (mut ws_sender, mut ws_receiver) = socket.split();
        let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<Vec<u8>>();
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel::<Vec<u8>>();

        // The relay greets a member only after adding it to the room, so the
        // first data frame is the acknowledgment. It is still delivered.
        let greeting = loop {
            match ws_receiver.next().await {
                Some(Ok(Message::Text(text))) => break text.into_bytes(),
                Some(Ok(Message::Binary(bytes))) => break bytes,
                Some(Ok(Message::Close(_))) | None => {
                    return Err(Error::RelayUnavailable(format!(
                        "{} closed before acknowledging",
                        url
                    )))
                }
                Some(Ok(_)) => continue,
                Some(Err(e)) => return Err(e.into()),
            }
        };
        let _ = inbound_tx.send(greeting);

        // ── Writer ────────────────────────────────────────────────────────

        tokio::spawn(async move {
            while let Some(frame) = outbound_rx.recv().await {
                let message = match String::from_utf8(frame) {
                    Ok(text) => Message::Text(text),
                    Err(e) => Message::Binary(e.into_bytes()),
                };
                if ws_sender.send(message).await.is_err() {
                    break;
                }
            }
            let _ = ws_sender.close().await;
        });

        // ── Reader ────────────────────────────────────────────────────────

        let room = room.to_string();
        tokio::spawn(async move {
            while let Some(message) = ws_receiver.next().await {
                let frame = match message {
                    Ok(Message::Text(text)) => text.into_bytes(),
                    Ok(Message::Binary(bytes)) => bytes,
                    Ok(Message::Close(_)) => break,
                    Ok(_) => continue, // Ping, Pong
                    Err(e) => {
                        tracing::warn!(room = room.as_str(), error = %e, "WebSocket error");
                        break;
                    }
                };
                if inbound_tx.send(frame).is_err() {
                    break;
                }
            }
            tracing::debug!(room = room.as_str(), "WebSocket reader finished");
        });

        Ok(RelayLink {
            outbound: outbound_tx,
            inbound: inbound_rx,
        })
    }
}
