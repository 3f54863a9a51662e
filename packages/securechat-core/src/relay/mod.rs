//! # Relay Session
//!
//! A room-scoped, bidirectional channel of opaque frames.
//!
//! ## State Machine
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        SESSION LIFECYCLE                                │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │   Disconnected ──connect()──► Connecting ──transport ack──► Open       │
//! │        ▲                          │                           │         │
//! │        │                     open failed              close() or       │
//! │        │                          │                 transport ended    │
//! │        │                          ▼                           │         │
//! │        └───── (never) ─────── Closed ◄────────────────────────┘         │
//! │                                   │                                     │
//! │                                   └──connect()──► Connecting           │
//! │                                                                         │
//! │   send() outside Open        → SessionNotReady (nothing is queued)     │
//! │   connect() while Connecting → InvalidState                            │
//! │   connect() while Open       → InvalidState                            │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The session does not look inside frames. Delivery is best-effort and
//! at-most-once: frames sent while a peer is not connected are lost, and
//! nothing is replayed after a reconnect.

mod local;
mod ws;

pub use local::LocalRelay;
pub use ws::WsTransport;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use tokio::sync::{mpsc, watch};

use crate::error::{Error, Result};

/// Lifecycle state of a [`RelaySession`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Never connected
    Disconnected,
    /// Waiting for the transport to acknowledge
    Connecting,
    /// Frames can be sent and received
    Open,
    /// Closed locally or by the transport
    Closed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Disconnected => f.write_str("disconnected"),
            SessionState::Connecting => f.write_str("connecting"),
            SessionState::Open => f.write_str("open"),
            SessionState::Closed => f.write_str("closed"),
        }
    }
}

/// The two halves of an established transport connection
///
/// Dropping `outbound` asks the transport to shut down. The transport drops
/// its end of `inbound` once the connection is gone.
#[derive(Debug)]
pub struct RelayLink {
    /// Frames to send to the room
    pub outbound: mpsc::UnboundedSender<Vec<u8>>,
    /// Frames received from the room, in arrival order
    pub inbound: mpsc::UnboundedReceiver<Vec<u8>>,
}

/// Something that can join a relay room
#[async_trait]
pub trait RelayTransport: Send + Sync {
    /// Join `room`; resolves once the transport has acknowledged the connection
    async fn open(&self, room: &str) -> Result<RelayLink>;
}

/// Client side of a relay room
pub struct RelaySession {
    transport: Arc<dyn RelayTransport>,
    state: RwLock<SessionState>,
    room: RwLock<Option<String>>,
    outbound: Mutex<Option<mpsc::UnboundedSender<Vec<u8>>>>,
    inbound: tokio::sync::Mutex<Option<mpsc::UnboundedReceiver<Vec<u8>>>>,
    closed: watch::Sender<bool>,
}

impl RelaySession {
    /// New disconnected session over `transport`
    pub fn new(transport: Arc<dyn RelayTransport>) -> Self {
        let (closed, _) = watch::channel(false);
        Self {
            transport,
            state: RwLock::new(SessionState::Disconnected),
            room: RwLock::new(None),
            outbound: Mutex::new(None),
            inbound: tokio::sync::Mutex::new(None),
            closed,
        }
    }

    /// Current state
    pub fn state(&self) -> SessionState {
        *self.state.read()
    }

    /// Room of the current or most recent connection
    pub fn room(&self) -> Option<String> {
        self.room.read().clone()
    }

    /// Join `room`
    ///
    /// Legal from `Disconnected` and `Closed`. A transport failure leaves the
    /// session `Closed`.
    pub async fn connect(&self, room: &str) -> Result<()> {
        {
            let mut state = self.state.write();
            match *state {
                SessionState::Disconnected | SessionState::Closed => {
                    *state = SessionState::Connecting;
                }
                current => {
                    return Err(Error::InvalidState(format!(
                        "cannot connect while {}",
                        current
                    )));
                }
            }
        }
        *self.room.write() = Some(room.to_string());
        tracing::info!(room, "Connecting to relay");

        let link = match self.transport.open(room).await {
            Ok(link) => link,
            Err(e) => {
                tracing::warn!(room, error = %e, "Relay connection failed");
                *self.state.write() = SessionState::Closed;
                return Err(e);
            }
        };

        *self.inbound.lock().await = Some(link.inbound);

        let mut state = self.state.write();
        if *state != SessionState::Connecting {
            // close() raced the handshake; the link is dropped here
            return Err(Error::InvalidState(format!(
                "session became {} while connecting",
                *state
            )));
        }
        *self.outbound.lock() = Some(link.outbound);
        self.closed.send_replace(false);
        *state = SessionState::Open;
        tracing::info!(room, "Relay session open");
        Ok(())
    }

    /// Send one frame to the room
    pub fn send(&self, frame: Vec<u8>) -> Result<()> {
        if self.state() != SessionState::Open {
            return Err(Error::SessionNotReady);
        }

        let delivered = match self.outbound.lock().as_ref() {
            Some(outbound) => outbound.send(frame).is_ok(),
            None => false,
        };
        if !delivered {
            self.mark_closed("transport is gone");
            return Err(Error::SessionNotReady);
        }
        Ok(())
    }

    /// Next frame from the room
    ///
    /// Returns `None` once the session is closed, locally or by the
    /// transport. A pending call is woken by [`close`](Self::close).
    pub async fn recv(&self) -> Option<Vec<u8>> {
        let mut closed = self.closed.subscribe();
        let mut guard = self.inbound.lock().await;
        if *closed.borrow_and_update() || self.state() != SessionState::Open {
            return None;
        }
        let inbound = guard.as_mut()?;

        tokio::select! {
            frame = inbound.recv() => match frame {
                Some(frame) => {
                    tracing::debug!(bytes = frame.len(), "Frame received");
                    Some(frame)
                }
                None => {
                    *guard = None;
                    self.mark_closed("transport ended");
                    None
                }
            },
            _ = closed.wait_for(|closed| *closed) => None,
        }
    }

    /// Close the session; later sends fail with `SessionNotReady`
    pub fn close(&self) {
        self.mark_closed("closed locally");
    }

    fn mark_closed(&self, reason: &str) {
        let mut state = self.state.write();
        if *state == SessionState::Closed {
            return;
        }
        *state = SessionState::Closed;
        self.outbound.lock().take();
        self.closed.send_replace(true);
        tracing::info!(room = ?self.room.read().as_deref(), reason, "Relay session closed");
    }
}

impl fmt::Debug for RelaySession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RelaySession")
            .field("state", &self.state())
            .field("room", &self.room())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    struct RefusingTransport;

    #[async_trait]
    impl RelayTransport for RefusingTransport {
        async fn open(&self, _room: &str) -> Result<RelayLink> {
            Err(Error::RelayUnavailable("connection refused".into()))
        }
    }

    fn session(relay: &LocalRelay) -> RelaySession {
        RelaySession::new(Arc::new(relay.clone()))
    }

    /// Skip the relay's connect notice
    async fn drain_notice(session: &RelaySession) {
        let notice = session.recv().await.unwrap();
        assert!(String::from_utf8(notice).unwrap().contains("connected to server"));
    }

    #[tokio::test]
    async fn test_send_before_connect_is_not_ready() {
        let session = session(&LocalRelay::new());
        assert_eq!(session.state(), SessionState::Disconnected);
        assert!(matches!(
            session.send(b"hello".to_vec()),
            Err(Error::SessionNotReady)
        ));
        assert_eq!(session.recv().await, None);
    }

    #[tokio::test]
    async fn test_broadcast_includes_sender() {
        let relay = LocalRelay::new();
        let alice = session(&relay);
        let bob = session(&relay);
        alice.connect("room").await.unwrap();
        bob.connect("room").await.unwrap();
        drain_notice(&alice).await;
        drain_notice(&bob).await;

        alice.send(b"one".to_vec()).unwrap();
        alice.send(b"two".to_vec()).unwrap();

        assert_eq!(bob.recv().await.unwrap(), b"one");
        assert_eq!(bob.recv().await.unwrap(), b"two");
        assert_eq!(alice.recv().await.unwrap(), b"one");
        assert_eq!(alice.recv().await.unwrap(), b"two");
    }

    #[tokio::test]
    async fn test_rooms_are_isolated() {
        let relay = LocalRelay::new();
        let alice = session(&relay);
        let eve = session(&relay);
        alice.connect("room").await.unwrap();
        eve.connect("elsewhere").await.unwrap();
        drain_notice(&alice).await;
        drain_notice(&eve).await;

        alice.send(b"secret".to_vec()).unwrap();
        assert_eq!(alice.recv().await.unwrap(), b"secret");
        let nothing = tokio::time::timeout(Duration::from_millis(50), eve.recv()).await;
        assert!(nothing.is_err());
    }

    #[tokio::test]
    async fn test_connect_twice_is_invalid() {
        let relay = LocalRelay::new();
        let session = session(&relay);
        session.connect("room").await.unwrap();
        assert!(matches!(
            session.connect("room").await,
            Err(Error::InvalidState(_))
        ));
        assert_eq!(session.state(), SessionState::Open);
    }

    #[tokio::test]
    async fn test_close_wakes_pending_recv() {
        let relay = LocalRelay::new();
        let session = Arc::new(session(&relay));
        session.connect("room").await.unwrap();
        drain_notice(&session).await;

        let pending = tokio::spawn({
            let session = session.clone();
            async move { session.recv().await }
        });
        tokio::time::sleep(Duration::from_millis(20)).await;
        session.close();

        assert_eq!(pending.await.unwrap(), None);
        assert_eq!(session.state(), SessionState::Closed);
        assert!(matches!(
            session.send(b"late".to_vec()),
            Err(Error::SessionNotReady)
        ));
    }

    #[tokio::test]
    async fn test_reconnect_after_close() {
        let relay = LocalRelay::new();
        let session = session(&relay);
        session.connect("room").await.unwrap();
        session.close();

        session.connect("room").await.unwrap();
        assert_eq!(session.state(), SessionState::Open);
        drain_notice(&session).await;
        session.send(b"again".to_vec()).unwrap();
        assert_eq!(session.recv().await.unwrap(), b"again");
    }

    #[tokio::test]
    async fn test_transport_end_closes_session() {
        let relay = LocalRelay::new();
        let session = session(&relay);
        session.connect("room").await.unwrap();
        drain_notice(&session).await;

        relay.shutdown_room("room");

        assert_eq!(session.recv().await, None);
        assert_eq!(session.state(), SessionState::Closed);
    }

    #[tokio::test]
    async fn test_failed_connect_leaves_closed() {
        let session = RelaySession::new(Arc::new(RefusingTransport));
        let err = session.connect("room").await.unwrap_err();
        assert!(matches!(err, Error::RelayUnavailable(_)));
        assert_eq!(session.state(), SessionState::Closed);
        assert_eq!(session.room().as_deref(), Some("room"));
    }
}
