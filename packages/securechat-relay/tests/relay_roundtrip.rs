//! Clients talking to a real relay on an ephemeral port.

use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, Stream, StreamExt};
use tokio_tungstenite::{connect_async, tungstenite::Message};

use securechat_core::{
    ClientConfig, HttpDirectory, Identity, KeyDirectory, KeyPurpose, Messenger, ProtocolOutcome,
    RelaySession, WsTransport,
};
use securechat_relay::{router, RelayConfig, RelayState};

async fn spawn_relay() -> (String, RelayState) {
    let state = RelayState::new(RelayConfig::default());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = router(state.clone());
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{}", addr), state)
}

async fn next_text<S>(socket: &mut S) -> String
where
    S: Stream<Item = Result<Message, tokio_tungstenite::tungstenite::Error>> + Unpin,
{
    loop {
        match tokio::time::timeout(Duration::from_secs(5), socket.next())
            .await
            .unwrap()
        {
            Some(Ok(Message::Text(text))) => return text,
            Some(Ok(_)) => continue,
            other => panic!("socket ended: {:?}", other),
        }
    }
}

#[tokio::test]
async fn test_room_broadcast_over_websocket() {
    let (base, state) = spawn_relay().await;
    let ws_base = base.replace("http://", "ws://");

    let (mut alice, _) = connect_async(format!("{}/ws/chat/lobby/", ws_base)).await.unwrap();
    let (mut bob, _) = connect_async(format!("{}/ws/chat/lobby/", ws_base)).await.unwrap();
    let (mut eve, _) = connect_async(format!("{}/ws/chat/other/", ws_base)).await.unwrap();

    for socket in [&mut alice, &mut bob, &mut eve] {
        assert!(next_text(socket).await.contains("connected to server"));
    }
    assert_eq!(state.room_members("lobby"), 2);

    alice
        .send(Message::Text(r#"{"type":"system","from":"alice"}"#.into()))
        .await
        .unwrap();
    assert_eq!(next_text(&mut alice).await, r#"{"type":"system","from":"alice"}"#);
    assert_eq!(next_text(&mut bob).await, r#"{"type":"system","from":"alice"}"#);

    bob.send(Message::Text("not json".into())).await.unwrap();
    let wrapped: serde_json::Value = serde_json::from_str(&next_text(&mut alice).await).unwrap();
    assert_eq!(wrapped["type"], "text");
    assert_eq!(wrapped["message"], "not json");

    let nothing = tokio::time::timeout(Duration::from_millis(100), eve.next()).await;
    assert!(nothing.is_err());

    alice.close(None).await.unwrap();
    bob.close(None).await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(state.room_members("lobby"), 0);
    assert_eq!(state.room_count(), 1);
}

#[tokio::test]
async fn test_http_directory_against_relay() {
    let (base, _state) = spawn_relay().await;
    let directory = HttpDirectory::new(base, Duration::from_secs(5)).unwrap();

    assert_eq!(
        directory.resolve("alice", KeyPurpose::Signing).await.unwrap(),
        None
    );

    directory
        .publish("alice", KeyPurpose::Signing, &[1, 2, 3])
        .await
        .unwrap();
    directory
        .publish("alice", KeyPurpose::Encryption, &[4, 5, 6])
        .await
        .unwrap();

    assert_eq!(
        directory.resolve("alice", KeyPurpose::Signing).await.unwrap(),
        Some(vec![1, 2, 3])
    );
    assert_eq!(
        directory.resolve("alice", KeyPurpose::Encryption).await.unwrap(),
        Some(vec![4, 5, 6])
    );
}

#[tokio::test]
async fn test_alice_and_bob_through_relay() {
    let (base, state) = spawn_relay().await;
    let config = ClientConfig {
        server_url: base,
        room: "e2e".into(),
        ..ClientConfig::default()
    };

    let connect = |name: &str| {
        let identity = Identity::generate_with_bits(name, 1024).unwrap();
        let directory =
            Arc::new(HttpDirectory::new(config.directory_url(), config.resolve_timeout()).unwrap());
        let session = Arc::new(RelaySession::new(Arc::new(WsTransport::new(
            config.relay_url(),
        ))));
        Messenger::new(identity, directory, session, config.clone())
    };
    let alice = connect("alice");
    let bob = connect("bob");

    for messenger in [&alice, &bob] {
        messenger.publish_keys().await.unwrap();
        messenger.join().await.unwrap();
    }
    assert_eq!(state.key_count(), 4);

    alice.send("bob", b"over the wire").await.unwrap();
    let outcomes = tokio::time::timeout(Duration::from_secs(5), bob.next_outcomes())
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    assert_eq!(
        outcomes,
        vec![ProtocolOutcome::Decrypted {
            from: "alice".into(),
            plaintext: b"over the wire".to_vec(),
        }]
    );

    bob.send("alice", b"loud and clear").await.unwrap();
    let outcomes = tokio::time::timeout(Duration::from_secs(5), alice.next_outcomes())
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    assert_eq!(outcomes[0].to_string(), "[bob] loud and clear");
    assert_eq!(alice.peers(), vec!["bob".to_string()]);

    alice.close();
    bob.close();
}
