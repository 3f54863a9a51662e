//! In-process relay hub.
//!
//! Behaves like the WebSocket relay server: every frame sent into a room is
//! forwarded to all members of that room, the sender included, and a new
//! member first receives a `connected to server` system notice.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc;

use super::{RelayLink, RelayTransport};
use crate::envelope::{encode_notice, SystemNotice};
use crate::error::Result;

#[derive(Debug)]
struct Member {
    id: u64,
    tx: mpsc::UnboundedSender<Vec<u8>>,
}

/// Relay transport that never leaves the process
#[derive(Debug, Clone, Default)]
pub struct LocalRelay {
    rooms: Arc<Mutex<HashMap<String, Vec<Member>>>>,
    next_id: Arc<AtomicU64>,
}

impl LocalRelay {
    /// Create a hub with no rooms
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live members in `room`
    pub fn member_count(&self, room: &str) -> usize {
        self.rooms
            .lock()
            .get(room)
            .map(|members| members.iter().filter(|m| !m.tx.is_closed()).count())
            .unwrap_or(0)
    }

    /// Disconnect every member of `room`, as if the server went away
    pub fn shutdown_room(&self, room: &str) {
        if let Some(members) = self.rooms.lock().remove(room) {
            tracing::debug!(room, members = members.len(), "Local room shut down");
        }
    }

    fn broadcast(&self, room: &str, frame: &[u8]) {
        let mut rooms = self.rooms.lock();
        if let Some(members) = rooms.get_mut(room) {
            members.retain(|member| member.tx.send(frame.to_vec()).is_ok());
            if members.is_empty() {
                rooms.remove(room);
            }
        }
    }

    fn leave(&self, room: &str, id: u64) {
        let mut rooms = self.rooms.lock();
        if let Some(members) = rooms.get_mut(room) {
            members.retain(|m| m.id != id);
            if members.is_empty() {
                rooms.remove(room);
            }
        }
    }
}

#[async_trait]
impl RelayTransport for LocalRelay {
    async fn open(&self, room: &str) -> Result<RelayLink> {
        let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<Vec<u8>>();
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel::<Vec<u8>>();

        let greeting = SystemNotice {
            from: None,
            message: Some("connected to server".to_string()),
        };
        let _ = inbound_tx.send(encode_notice(&greeting)?);

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.rooms
            .lock()
            .entry(room.to_string())
            .or_default()
            .push(Member { id, tx: inbound_tx });

        let hub = self.clone();
        let room = room.to_string();
        tokio::spawn(async move {
            while let Some(frame) = outbound_rx.recv().await {
                hub.broadcast(&room, &frame);
            }
            hub.leave(&room, id);
        });

        Ok(RelayLink {
            outbound: outbound_tx,
            inbound: inbound_rx,
        })
    }
}
