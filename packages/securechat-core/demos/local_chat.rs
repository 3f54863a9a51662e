//! # Local Chat Demo
//!
//! Alice and Bob exchange messages through an in-process relay and
//! directory:
//! 1. Generate both identities and publish their public keys
//! 2. Join the same room
//! 3. Send in both directions
//! 4. Show what a tampered envelope turns into
//!
//! ## Run
//!
//! ```bash
//! cargo run --example local_chat
//! ```

use std::sync::Arc;

use securechat_core::envelope::{self, Frame};
use securechat_core::{
    ClientConfig, Identity, LocalRelay, MemoryDirectory, Messenger, RelaySession,
};

#[tokio::main]
async fn main() {
    println!("=================================================");
    println!("          SECURECHAT LOCAL CHAT DEMO");
    println!("=================================================\n");

    let directory = Arc::new(MemoryDirectory::new());
    let relay = LocalRelay::new();
    let config = ClientConfig::default();

    // =========================================================================
    // STEP 1: Identities
    // =========================================================================
    println!("1. Generating identities (RSA-2048 + Ed25519)...\n");

    let make = |name: &str| {
        let identity = Identity::generate(name).expect("Failed to generate identity");
        Messenger::new(
            identity,
            directory.clone(),
            Arc::new(RelaySession::new(Arc::new(relay.clone()))),
            config.clone(),
        )
    };
    let alice = make("alice");
    let bob = make("bob");

    alice.publish_keys().await.expect("publish alice");
    bob.publish_keys().await.expect("publish bob");
    println!("   Directory entries: {}", directory.len());
    println!();

    // =========================================================================
    // STEP 2: Join the room
    // =========================================================================
    println!("2. Joining room '{}'...\n", config.room);

    alice.join().await.expect("alice join");
    bob.join().await.expect("bob join");
    alice.announce().expect("alice announce");

    // =========================================================================
    // STEP 3: Exchange messages
    // =========================================================================
    println!("3. Exchanging messages...\n");

    alice
        .send("bob", b"Hi Bob, this is end-to-end encrypted.")
        .await
        .expect("alice send");
    for outcome in bob.next_outcomes().await.expect("bob recv").unwrap_or_default() {
        println!("   bob sees:   {}", outcome);
    }
    println!("   bob knows:  {:?}", bob.peers());

    bob.send("alice", b"Hi Alice, received.")
        .await
        .expect("bob send");
    for outcome in alice.next_outcomes().await.expect("alice recv").unwrap_or_default() {
        println!("   alice sees: {}", outcome);
    }
    println!();

    // =========================================================================
    // STEP 4: Tampering
    // =========================================================================
    println!("4. Flipping one ciphertext bit in transit...\n");

    alice.send("bob", b"untampered").await.expect("alice send");
    let mut envelope = loop {
        let frame = bob.session().recv().await.expect("frame");
        if let Ok(Frame::Envelope(envelope)) = envelope::decode_frame(&frame) {
            break envelope;
        }
    };
    envelope.ciphertext[0] ^= 0x01;

    let tampered = envelope::encode(&envelope).expect("encode");
    for outcome in bob.on_envelope_bytes(&tampered).await.expect("process") {
        println!("   bob sees:   {}", outcome);
    }
    println!();

    alice.close();
    bob.close();
    println!("=================================================");
    println!("                 DEMO COMPLETE");
    println!("=================================================");
}
