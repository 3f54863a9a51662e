//! Server state management.
//!
//! Tracks live rooms and the public key directory. Both maps are
//! concurrent (DashMap); nothing is persisted across restarts.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;
use tokio::sync::broadcast;

/// Default port.
pub const DEFAULT_PORT: u16 = 8000;

/// Default frames buffered per room before slow members start lagging.
pub const DEFAULT_ROOM_CAPACITY: usize = 256;

/// Longest accepted directory name.
pub const MAX_USERNAME_LEN: usize = 150;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub bind: String,
    pub port: u16,
    /// Broadcast buffer per room
    pub room_capacity: usize,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            room_capacity: DEFAULT_ROOM_CAPACITY,
        }
    }
}

impl RelayConfig {
    /// Socket address to listen on.
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.bind, self.port)
    }
}

/// A published public key, as returned by the directory API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeyRecord {
    pub username: String,
    pub public_key_b64: String,
    pub updated_at: DateTime<Utc>,
}

/// Broadcast handle for one room.
pub type RoomSender = broadcast::Sender<String>;

/// Shared server state.
#[derive(Clone)]
pub struct RelayState {
    /// Room name → broadcast channel.
    /// Created by the first member, removed when the last one leaves.
    pub rooms: Arc<DashMap<String, RoomSender>>,

    /// Directory name → current key. Last write wins.
    pub keys: Arc<DashMap<String, KeyRecord>>,

    /// Server configuration.
    pub config: RelayConfig,
}

impl RelayState {
    /// Create an empty relay state with the given configuration.
    pub fn new(config: RelayConfig) -> Self {
        Self {
            rooms: Arc::new(DashMap::new()),
            keys: Arc::new(DashMap::new()),
            config,
        }
    }

    // ── Rooms ─────────────────────────────────────────────────────────────

    /// Join `room`, creating it if needed.
    ///
    /// Subscribes under the entry lock: once this returns, the room in the
    /// map is the one the receiver belongs to.
    pub fn join_room(&self, room: &str) -> (RoomSender, broadcast::Receiver<String>) {
        let entry = self.rooms.entry(room.to_string()).or_insert_with(|| {
            tracing::info!(room, "Room created");
            broadcast::channel(self.config.room_capacity).0
        });
        let receiver = entry.subscribe();
        (entry.clone(), receiver)
    }

    /// Drop `room` if it has no members left.
    ///
    /// The caller must have dropped its own receiver first.
    pub fn leave_room(&self, room: &str) {
        if self
            .rooms
            .remove_if(room, |_, sender| sender.receiver_count() == 0)
            .is_some()
        {
            tracing::info!(room, "Room closed");
        }
    }

    /// Number of members currently in `room`.
    pub fn room_members(&self, room: &str) -> usize {
        self.rooms
            .get(room)
            .map(|sender| sender.receiver_count())
            .unwrap_or(0)
    }

    /// Number of live rooms.
    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    // ── Directory ─────────────────────────────────────────────────────────

    /// Store or overwrite the key published under `username`.
    pub fn publish_key(&self, username: &str, public_key_b64: &str) -> KeyRecord {
        let record = KeyRecord {
            username: username.to_string(),
            public_key_b64: public_key_b64.to_string(),
            updated_at: Utc::now(),
        };
        self.keys.insert(username.to_string(), record.clone());
        tracing::info!(username, "Public key published");
        record
    }

    /// Current key published under `username`.
    pub fn get_key(&self, username: &str) -> Option<KeyRecord> {
        self.keys.get(username).map(|record| record.clone())
    }

    /// Number of directory entries.
    pub fn key_count(&self) -> usize {
        self.keys.len()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RelayConfig::default();
        assert_eq!(config.port, 8000);
        assert_eq!(config.room_capacity, 256);
        assert_eq!(config.listen_addr(), "0.0.0.0:8000");
    }

    #[test]
    fn test_publish_overwrites() {
        let state = RelayState::new(RelayConfig::default());
        state.publish_key("alice", "AAAA");
        let second = state.publish_key("alice", "BBBB");

        assert_eq!(state.key_count(), 1);
        assert_eq!(state.get_key("alice"), Some(second));
        assert_eq!(state.get_key("bob"), None);
    }

    #[test]
    fn test_room_lifecycle() {
        let state = RelayState::new(RelayConfig::default());
        let (tx_a, rx_a) = state.join_room("lobby");
        let (_tx_b, rx_b) = state.join_room("lobby");
        assert_eq!(state.room_count(), 1);
        assert_eq!(state.room_members("lobby"), 2);

        drop(rx_a);
        state.leave_room("lobby");
        assert_eq!(state.room_count(), 1);

        drop(rx_b);
        state.leave_room("lobby");
        assert_eq!(state.room_count(), 0);
        assert!(tx_a.send("late".into()).is_err());
    }

    #[test]
    fn test_join_races_with_last_leave() {
        let state = RelayState::new(RelayConfig::default());

        let churn = {
            let state = state.clone();
            std::thread::spawn(move || {
                for _ in 0..5_000 {
                    let (_, rx) = state.join_room("lobby");
                    drop(rx);
                    state.leave_room("lobby");
                }
            })
        };

        for i in 0..5_000 {
            let (_, mut rx) = state.join_room("lobby");
            let current = state.rooms.get("lobby").unwrap().clone();
            current.send(format!("frame {}", i)).unwrap();
            assert_eq!(rx.try_recv().unwrap(), format!("frame {}", i));
            drop(rx);
            state.leave_room("lobby");
        }

        churn.join().unwrap();
    }

    #[tokio::test]
    async fn test_room_broadcast_reaches_all_members() {
        let state = RelayState::new(RelayConfig::default());
        let (tx, mut rx_a) = state.join_room("lobby");
        let (_, mut rx_b) = state.join_room("lobby");

        tx.send("hello".into()).unwrap();
        assert_eq!(rx_a.recv().await.unwrap(), "hello");
        assert_eq!(rx_b.recv().await.unwrap(), "hello");
    }
}
