//! # Protocol Orchestrator
//!
//! Drives send and receive for one identity over one relay session.
//!
//! ## Message Flow
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                           SEND (Alice → Bob)                            │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  1. resolve("bob", Encryption)       directory, timeout-bound          │
//! │  2. encrypt(bob_pub, plaintext)      RSA-OAEP                          │
//! │  3. sign(alice_sk, ciphertext)       Ed25519                           │
//! │  4. envelope{from, to, ciphertext, signature, sender_pub, sender_pubsig}│
//! │  5. relay.send(encode(envelope))                                       │
//! │                                                                         │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                           RECEIVE (at Bob)                              │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  1. decode_frame(bytes)              ✗ → MalformedEnvelope             │
//! │  2. system notice?                   record presence, no outcome       │
//! │  3. to != "bob"?                     discard silently                  │
//! │  4. signed?                                                             │
//! │       signing key: embedded, else resolve("alice", Signing)            │
//! │       no key      → KeyUnresolved                                      │
//! │       verify fails → VerificationFailed                                │
//! │       Reject policy stops here on either failure                       │
//! │  5. decrypt(bob_sk, ciphertext)      → Decrypted | DecryptionFailed     │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Under the default [`VerificationPolicy::Deliver`] a failed verification
//! is reported and the envelope is still decrypted, so one envelope can
//! produce two outcomes. A directory miss and a lookup that never answers
//! are both reported as `KeyUnresolved`, on send and on receive alike.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::config::{ClientConfig, VerificationPolicy};
use crate::crypto::{self, EncryptionPublicKey, KeyPurpose, SigningPublicKey};
use crate::directory::{publish_identity, KeyDirectory};
use crate::envelope::{self, Authentication, Envelope, Frame, SystemNotice};
use crate::error::{Error, Result};
use crate::identity::Identity;
use crate::relay::RelaySession;

/// Result of processing one received envelope
#[derive(Clone, PartialEq, Eq)]
pub enum ProtocolOutcome {
    /// Plaintext recovered
    Decrypted {
        /// Claimed sender
        from: String,
        /// Recovered plaintext
        plaintext: Vec<u8>,
    },
    /// The signature did not verify against the sender's signing key
    VerificationFailed {
        /// Claimed sender
        from: String,
    },
    /// The ciphertext could not be decrypted with our key
    DecryptionFailed {
        /// Claimed sender
        from: String,
    },
    /// The frame was not a valid envelope
    MalformedEnvelope,
    /// The sender's signing key could not be found
    KeyUnresolved {
        /// Claimed sender
        from: String,
    },
}

impl ProtocolOutcome {
    /// Claimed sender, when the frame parsed far enough to name one
    pub fn sender(&self) -> Option<&str> {
        match self {
            ProtocolOutcome::Decrypted { from, .. }
            | ProtocolOutcome::VerificationFailed { from }
            | ProtocolOutcome::DecryptionFailed { from }
            | ProtocolOutcome::KeyUnresolved { from } => Some(from),
            ProtocolOutcome::MalformedEnvelope => None,
        }
    }

    /// Whether this outcome carries plaintext
    pub fn is_decrypted(&self) -> bool {
        matches!(self, ProtocolOutcome::Decrypted { .. })
    }

    /// Plaintext on success, otherwise the matching [`Error`]
    pub fn into_result(self) -> Result<Vec<u8>> {
        match self {
            ProtocolOutcome::Decrypted { plaintext, .. } => Ok(plaintext),
            ProtocolOutcome::VerificationFailed { .. } => Err(Error::VerificationFailed),
            ProtocolOutcome::DecryptionFailed { .. } => Err(Error::DecryptionFailed),
            ProtocolOutcome::MalformedEnvelope => {
                Err(Error::MalformedEnvelope("frame is not an envelope".into()))
            }
            ProtocolOutcome::KeyUnresolved { from } => Err(Error::KeyUnresolved {
                principal: from,
                purpose: KeyPurpose::Signing,
            }),
        }
    }
}

impl fmt::Debug for ProtocolOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProtocolOutcome::Decrypted { from, plaintext } => f
                .debug_struct("Decrypted")
                .field("from", from)
                .field("len", &plaintext.len())
                .finish(),
            ProtocolOutcome::VerificationFailed { from } => {
                f.debug_struct("VerificationFailed").field("from", from).finish()
            }
            ProtocolOutcome::DecryptionFailed { from } => {
                f.debug_struct("DecryptionFailed").field("from", from).finish()
            }
            ProtocolOutcome::MalformedEnvelope => f.write_str("MalformedEnvelope"),
            ProtocolOutcome::KeyUnresolved { from } => {
                f.debug_struct("KeyUnresolved").field("from", from).finish()
            }
        }
    }
}

impl fmt::Display for ProtocolOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProtocolOutcome::Decrypted { from, plaintext } => {
                write!(f, "[{}] {}", from, String::from_utf8_lossy(plaintext))
            }
            ProtocolOutcome::VerificationFailed { from } => {
                write!(f, "[{}] signature verification failed", from)
            }
            ProtocolOutcome::DecryptionFailed { from } => {
                write!(f, "[{}] message could not be decrypted", from)
            }
            ProtocolOutcome::MalformedEnvelope => f.write_str("malformed envelope"),
            ProtocolOutcome::KeyUnresolved { from } => {
                write!(f, "[{}] no signing key published", from)
            }
        }
    }
}

/// Orchestrates keys, directory, codec and relay for one identity
pub struct Messenger {
    identity: Identity,
    directory: Arc<dyn KeyDirectory>,
    session: Arc<RelaySession>,
    config: ClientConfig,
    presence: RwLock<BTreeSet<String>>,
}

impl Messenger {
    /// Assemble a messenger; nothing is published or connected yet
    pub fn new(
        identity: Identity,
        directory: Arc<dyn KeyDirectory>,
        session: Arc<RelaySession>,
        config: ClientConfig,
    ) -> Self {
        Self {
            identity,
            directory,
            session,
            config,
            presence: RwLock::new(BTreeSet::new()),
        }
    }

    /// Our identity
    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    /// The relay session this messenger sends on
    pub fn session(&self) -> &Arc<RelaySession> {
        &self.session
    }

    /// Active configuration
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Principals seen announcing themselves, sorted
    pub fn peers(&self) -> Vec<String> {
        self.presence.read().iter().cloned().collect()
    }

    /// Publish both of our public keys to the directory
    pub async fn publish_keys(&self) -> Result<()> {
        publish_identity(self.directory.as_ref(), &self.identity).await
    }

    /// Connect to the configured room and announce ourselves
    pub async fn join(&self) -> Result<()> {
        self.session.connect(&self.config.room).await?;
        self.announce()
    }

    /// Send a presence notice naming us
    pub fn announce(&self) -> Result<()> {
        let notice = SystemNotice::presence(self.identity.name());
        self.session.send(envelope::encode_notice(&notice)?)
    }

    /// Close the relay session
    pub fn close(&self) {
        self.session.close();
    }

    // ========================================================================
    // Send
    // ========================================================================

    /// Encrypt `plaintext` for `target`, sign it and hand it to the relay
    pub async fn send(&self, target: &str, plaintext: &[u8]) -> Result<()> {
        let target_key = self.resolve_key(target, KeyPurpose::Encryption).await?;
        let target_key = EncryptionPublicKey::from_spki(&target_key)?;

        let ciphertext = crypto::encrypt(&target_key, plaintext)?;
        let signature = crypto::sign(self.identity.signing(), &ciphertext);

        let envelope = Envelope {
            from: self.identity.name().to_string(),
            to: target.to_string(),
            ciphertext,
            signature: Some(signature),
            sender_pub: Some(self.identity.export_public(KeyPurpose::Encryption)?),
            sender_pubsig: Some(self.identity.export_public(KeyPurpose::Signing)?),
        };
        let frame = envelope::encode(&envelope)?;

        tracing::debug!(to = target, bytes = frame.len(), "Sending envelope");
        self.session.send(frame)
    }

    /// A miss and an unanswered lookup both end as `KeyUnresolved`
    async fn resolve_key(&self, principal: &str, purpose: KeyPurpose) -> Result<Vec<u8>> {
        let unresolved = || Error::KeyUnresolved {
            principal: principal.to_string(),
            purpose,
        };
        match self
            .directory
            .resolve_within(principal, purpose, self.config.resolve_timeout())
            .await
        {
            Ok(Some(key)) => Ok(key),
            Ok(None) => Err(unresolved()),
            Err(Error::DirectoryUnavailable(reason)) => {
                tracing::warn!(principal, %purpose, reason = reason.as_str(), "Key lookup failed");
                Err(unresolved())
            }
            Err(e) => Err(e),
        }
    }

    // ========================================================================
    // Receive
    // ========================================================================

    /// Wait for the next frame that produces outcomes
    ///
    /// Frames that produce none (notices, envelopes for someone else) are
    /// consumed silently. Returns `Ok(None)` once the session closes.
    pub async fn next_outcomes(&self) -> Result<Option<Vec<ProtocolOutcome>>> {
        while let Some(frame) = self.session.recv().await {
            let outcomes = self.on_envelope_bytes(&frame).await?;
            if !outcomes.is_empty() {
                return Ok(Some(outcomes));
            }
        }
        Ok(None)
    }

    /// Process one received frame
    pub async fn on_envelope_bytes(&self, bytes: &[u8]) -> Result<Vec<ProtocolOutcome>> {
        let envelope = match envelope::decode_frame(bytes) {
            Ok(Frame::Envelope(envelope)) => envelope,
            Ok(Frame::System(notice)) => {
                self.on_notice(notice);
                return Ok(Vec::new());
            }
            Err(e) => {
                tracing::warn!(bytes = bytes.len(), error = %e, "Dropping malformed frame");
                return Ok(vec![ProtocolOutcome::MalformedEnvelope]);
            }
        };

        if envelope.to != self.identity.name() {
            tracing::debug!(to = envelope.to.as_str(), "Envelope not addressed to us");
            return Ok(Vec::new());
        }

        let from = envelope.from.clone();
        let mut outcomes = Vec::new();

        if let Some(failure) = self.authenticate(&envelope).await? {
            tracing::warn!(from = from.as_str(), outcome = ?failure, "Envelope not authenticated");
            outcomes.push(failure);
            if self.config.verification_policy == VerificationPolicy::Reject {
                return Ok(outcomes);
            }
        }

        outcomes.push(
            match crypto::decrypt(self.identity.encryption(), &envelope.ciphertext) {
                Ok(plaintext) => ProtocolOutcome::Decrypted { from, plaintext },
                Err(_) => {
                    tracing::warn!(from = from.as_str(), "Envelope could not be decrypted");
                    ProtocolOutcome::DecryptionFailed { from }
                }
            },
        );
        Ok(outcomes)
    }

    /// `None` when the envelope is unsigned or its signature verifies
    async fn authenticate(&self, envelope: &Envelope) -> Result<Option<ProtocolOutcome>> {
        let from = &envelope.from;
        let (signature, embedded) = match envelope.authentication() {
            Authentication::Unsigned => return Ok(None),
            Authentication::Embedded {
                signature,
                signing_key,
            } if self.config.prefer_embedded_signing_key => (signature, Some(signing_key)),
            Authentication::Embedded { signature, .. } | Authentication::Lookup { signature } => {
                (signature, None)
            }
        };

        let key_bytes = match embedded {
            Some(key) => key.to_vec(),
            None => match self.resolve_key(from, KeyPurpose::Signing).await {
                Ok(key) => key,
                Err(Error::KeyUnresolved { .. }) => {
                    return Ok(Some(ProtocolOutcome::KeyUnresolved { from: from.clone() }))
                }
                Err(e) => return Err(e),
            },
        };

        let verified = match SigningPublicKey::from_spki(&key_bytes) {
            Ok(key) => crypto::verify(&key, &envelope.ciphertext, signature),
            Err(_) => false,
        };
        Ok((!verified).then(|| ProtocolOutcome::VerificationFailed { from: from.clone() }))
    }

    fn on_notice(&self, notice: SystemNotice) {
        match notice.from {
            Some(principal) if principal != self.identity.name() => {
                if self.presence.write().insert(principal.clone()) {
                    tracing::info!(principal = principal.as_str(), "Peer joined");
                }
            }
            Some(_) => {}
            None => {
                if let Some(message) = notice.message {
                    tracing::debug!(message = message.as_str(), "Relay notice");
                }
            }
        }
    }
}

impl fmt::Debug for Messenger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Messenger")
            .field("identity", &self.identity)
            .field("session", &self.session)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::{test_keys, SigningKeyPair};
    use crate::directory::MemoryDirectory;
    use crate::relay::{LocalRelay, SessionState};
    use async_trait::async_trait;

    /// Answers encryption lookups from `inner`; signing lookups never return
    struct SigningLookupStalls {
        inner: Arc<MemoryDirectory>,
    }

    #[async_trait]
    impl KeyDirectory for SigningLookupStalls {
        async fn publish(&self, principal: &str, purpose: KeyPurpose, key: &[u8]) -> Result<()> {
            self.inner.publish(principal, purpose, key).await
        }

        async fn resolve(&self, principal: &str, purpose: KeyPurpose) -> Result<Option<Vec<u8>>> {
            match purpose {
                KeyPurpose::Encryption => self.inner.resolve(principal, purpose).await,
                KeyPurpose::Signing => std::future::pending().await,
            }
        }
    }

    struct Pair {
        alice: Messenger,
        bob: Messenger,
        directory: Arc<MemoryDirectory>,
    }

    fn messenger(
        name: &str,
        encryption: &crate::crypto::EncryptionKeyPair,
        directory: &Arc<MemoryDirectory>,
        relay: &LocalRelay,
        config: ClientConfig,
    ) -> Messenger {
        let identity = Identity::from_parts(name, encryption.clone(), SigningKeyPair::generate());
        Messenger::new(
            identity,
            directory.clone(),
            Arc::new(RelaySession::new(Arc::new(relay.clone()))),
            config,
        )
    }

    async fn pair_with(bob_config: ClientConfig) -> Pair {
        let directory = Arc::new(MemoryDirectory::new());
        let relay = LocalRelay::new();
        let alice = messenger(
            "alice",
            test_keys::alice_encryption(),
            &directory,
            &relay,
            ClientConfig::default(),
        );
        let bob = messenger("bob", test_keys::bob_encryption(), &directory, &relay, bob_config);

        for m in [&alice, &bob] {
            m.publish_keys().await.unwrap();
            m.join().await.unwrap();
        }
        Pair {
            alice,
            bob,
            directory,
        }
    }

    async fn pair() -> Pair {
        pair_with(ClientConfig::default()).await
    }

    /// Next raw envelope frame on `m`'s session, skipping notices
    async fn next_envelope(m: &Messenger) -> Envelope {
        loop {
            let frame = m.session().recv().await.unwrap();
            if let Ok(Frame::Envelope(envelope)) = envelope::decode_frame(&frame) {
                return envelope;
            }
        }
    }

    #[tokio::test]
    async fn test_alice_to_bob() {
        let p = pair().await;
        // Alice joined first, so bob only learns of her from a fresh notice
        p.alice.announce().unwrap();
        p.alice.send("bob", b"hello").await.unwrap();

        let outcomes = p.bob.next_outcomes().await.unwrap().unwrap();
        assert_eq!(
            outcomes,
            vec![ProtocolOutcome::Decrypted {
                from: "alice".into(),
                plaintext: b"hello".to_vec(),
            }]
        );
        assert_eq!(p.bob.peers(), vec!["alice".to_string()]);
    }

    #[tokio::test]
    async fn test_sender_does_not_see_own_envelope() {
        let p = pair().await;
        p.alice.send("bob", b"hello").await.unwrap();
        p.bob.send("alice", b"reply").await.unwrap();

        // Alice's own "hello" comes back through the relay but is addressed to bob
        let outcomes = p.alice.next_outcomes().await.unwrap().unwrap();
        assert_eq!(outcomes.len(), 1);
        assert_eq!(outcomes[0].sender(), Some("bob"));
    }

    #[tokio::test]
    async fn test_misrouted_envelope_is_silent() {
        let p = pair().await;
        p.alice.send("bob", b"for bob").await.unwrap();
        let mut envelope = next_envelope(&p.bob).await;
        envelope.to = "carol".into();

        let outcomes = p
            .bob
            .on_envelope_bytes(&envelope::encode(&envelope).unwrap())
            .await
            .unwrap();
        assert!(outcomes.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_target_is_unresolved() {
        let p = pair().await;
        let err = p.alice.send("carol", b"hi").await.unwrap_err();
        assert!(matches!(
            err,
            Error::KeyUnresolved {
                purpose: KeyPurpose::Encryption,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_oversized_plaintext_is_rejected() {
        let p = pair().await;
        assert!(p.alice.send("bob", &[b'a'; 190]).await.is_ok());
        assert!(matches!(
            p.alice.send("bob", &[b'a'; 191]).await,
            Err(Error::PlaintextTooLarge { len: 191, max: 190 })
        ));
    }

    #[tokio::test]
    async fn test_send_after_close_is_not_ready() {
        let p = pair().await;
        p.alice.close();
        assert_eq!(p.alice.session().state(), SessionState::Closed);
        assert!(matches!(
            p.alice.send("bob", b"late").await,
            Err(Error::SessionNotReady)
        ));
        assert_eq!(p.alice.next_outcomes().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_bad_signature_still_decrypts_by_default() {
        let p = pair().await;
        p.alice.send("bob", b"hello").await.unwrap();
        let mut envelope = next_envelope(&p.bob).await;
        if let Some(signature) = envelope.signature.as_mut() {
            signature[0] ^= 0x01;
        }

        let outcomes = p
            .bob
            .on_envelope_bytes(&envelope::encode(&envelope).unwrap())
            .await
            .unwrap();
        assert_eq!(
            outcomes,
            vec![
                ProtocolOutcome::VerificationFailed {
                    from: "alice".into()
                },
                ProtocolOutcome::Decrypted {
                    from: "alice".into(),
                    plaintext: b"hello".to_vec(),
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_reject_policy_stops_after_verification() {
        let p = pair_with(ClientConfig {
            verification_policy: VerificationPolicy::Reject,
            ..ClientConfig::default()
        })
        .await;
        p.alice.send("bob", b"hello").await.unwrap();
        let mut envelope = next_envelope(&p.bob).await;
        envelope.ciphertext[10] ^= 0x80;

        let outcomes = p
            .bob
            .on_envelope_bytes(&envelope::encode(&envelope).unwrap())
            .await
            .unwrap();
        assert_eq!(
            outcomes,
            vec![ProtocolOutcome::VerificationFailed {
                from: "alice".into()
            }]
        );
    }

    #[tokio::test]
    async fn test_tampered_ciphertext_never_decrypts() {
        let p = pair().await;
        p.alice.send("bob", b"hello").await.unwrap();
        let mut envelope = next_envelope(&p.bob).await;
        envelope.ciphertext[0] ^= 0x01;

        let outcomes = p
            .bob
            .on_envelope_bytes(&envelope::encode(&envelope).unwrap())
            .await
            .unwrap();
        assert_eq!(
            outcomes,
            vec![
                ProtocolOutcome::VerificationFailed {
                    from: "alice".into()
                },
                ProtocolOutcome::DecryptionFailed {
                    from: "alice".into()
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_directory_signing_key_when_embedded_not_preferred() {
        let p = pair_with(ClientConfig {
            prefer_embedded_signing_key: false,
            ..ClientConfig::default()
        })
        .await;
        p.alice.send("bob", b"hello").await.unwrap();
        let mut envelope = next_envelope(&p.bob).await;

        // A forged embedded key is ignored in favour of the directory entry
        envelope.sender_pubsig = Some(SigningKeyPair::generate().export_public().unwrap());
        let outcomes = p
            .bob
            .on_envelope_bytes(&envelope::encode(&envelope).unwrap())
            .await
            .unwrap();
        assert!(outcomes[0].is_decrypted());
        assert_eq!(outcomes.len(), 1);
    }

    #[tokio::test]
    async fn test_missing_signing_key_is_unresolved() {
        let p = pair().await;
        p.alice.send("bob", b"hello").await.unwrap();
        let mut envelope = next_envelope(&p.bob).await;
        envelope.from = "mallory".into();
        envelope.sender_pubsig = None;

        let outcomes = p
            .bob
            .on_envelope_bytes(&envelope::encode(&envelope).unwrap())
            .await
            .unwrap();
        assert_eq!(
            outcomes[0],
            ProtocolOutcome::KeyUnresolved {
                from: "mallory".into()
            }
        );
        assert!(outcomes[1].is_decrypted());
        assert_eq!(p.directory.len(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_signing_lookup_timeout_still_delivers() {
        let p = pair().await;
        let bob = Messenger::new(
            Identity::from_parts(
                "bob",
                test_keys::bob_encryption().clone(),
                SigningKeyPair::generate(),
            ),
            Arc::new(SigningLookupStalls {
                inner: p.directory.clone(),
            }),
            p.bob.session().clone(),
            ClientConfig {
                prefer_embedded_signing_key: false,
                resolve_timeout_secs: 1,
                ..ClientConfig::default()
            },
        );
        p.alice.send("bob", b"hello").await.unwrap();
        let envelope = next_envelope(&bob).await;

        let outcomes = bob
            .on_envelope_bytes(&envelope::encode(&envelope).unwrap())
            .await
            .unwrap();
        assert_eq!(
            outcomes,
            vec![
                ProtocolOutcome::KeyUnresolved {
                    from: "alice".into()
                },
                ProtocolOutcome::Decrypted {
                    from: "alice".into(),
                    plaintext: b"hello".to_vec(),
                },
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_signing_lookup_timeout_rejected_under_reject_policy() {
        let p = pair().await;
        let bob = Messenger::new(
            Identity::from_parts(
                "bob",
                test_keys::bob_encryption().clone(),
                SigningKeyPair::generate(),
            ),
            Arc::new(SigningLookupStalls {
                inner: p.directory.clone(),
            }),
            p.bob.session().clone(),
            ClientConfig {
                prefer_embedded_signing_key: false,
                verification_policy: VerificationPolicy::Reject,
                ..ClientConfig::default()
            },
        );
        p.alice.send("bob", b"hello").await.unwrap();

        let outcomes = bob.next_outcomes().await.unwrap().unwrap();
        assert_eq!(
            outcomes,
            vec![ProtocolOutcome::KeyUnresolved {
                from: "alice".into()
            }]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_encryption_lookup_timeout_is_unresolved() {
        struct Stalled;

        #[async_trait]
        impl KeyDirectory for Stalled {
            async fn publish(&self, _: &str, _: KeyPurpose, _: &[u8]) -> Result<()> {
                Ok(())
            }

            async fn resolve(&self, _: &str, _: KeyPurpose) -> Result<Option<Vec<u8>>> {
                std::future::pending().await
            }
        }

        let p = pair().await;
        let alice = Messenger::new(
            Identity::from_parts(
                "alice",
                test_keys::alice_encryption().clone(),
                SigningKeyPair::generate(),
            ),
            Arc::new(Stalled),
            p.alice.session().clone(),
            ClientConfig::default(),
        );
        let err = alice.send("bob", b"hi").await.unwrap_err();
        assert!(matches!(
            err,
            Error::KeyUnresolved {
                purpose: KeyPurpose::Encryption,
                ..
            }
        ));
        // The session is untouched and still usable
        assert_eq!(alice.session().state(), SessionState::Open);
    }

    #[tokio::test]
    async fn test_unsigned_envelope_decrypts() {
        let p = pair().await;
        p.alice.send("bob", b"hello").await.unwrap();
        let mut envelope = next_envelope(&p.bob).await;
        envelope.signature = None;

        let outcomes = p
            .bob
            .on_envelope_bytes(&envelope::encode(&envelope).unwrap())
            .await
            .unwrap();
        assert_eq!(outcomes.len(), 1);
        assert!(outcomes[0].is_decrypted());
    }

    #[tokio::test]
    async fn test_malformed_frames() {
        let p = pair().await;
        for bytes in [&b"garbage"[..], &br#"{"type":"text","message":"raw"}"#[..]] {
            assert_eq!(
                p.bob.on_envelope_bytes(bytes).await.unwrap(),
                vec![ProtocolOutcome::MalformedEnvelope]
            );
        }
        // The messenger stays usable
        p.alice.send("bob", b"still here").await.unwrap();
        let outcomes = p.bob.next_outcomes().await.unwrap().unwrap();
        assert!(outcomes[0].is_decrypted());
    }

    #[test]
    fn test_outcome_into_result() {
        let decrypted = ProtocolOutcome::Decrypted {
            from: "alice".into(),
            plaintext: b"hi".to_vec(),
        };
        assert_eq!(decrypted.into_result().unwrap(), b"hi".to_vec());

        let failed = ProtocolOutcome::VerificationFailed {
            from: "alice".into(),
        };
        assert!(matches!(failed.into_result(), Err(Error::VerificationFailed)));

        let unresolved = ProtocolOutcome::KeyUnresolved {
            from: "mallory".into(),
        };
        match unresolved.into_result() {
            Err(Error::KeyUnresolved { principal, purpose }) => {
                assert_eq!(principal, "mallory");
                assert_eq!(purpose, KeyPurpose::Signing);
            }
            other => panic!("unexpected: {:?}", other),
        }
        assert_eq!(
            ProtocolOutcome::MalformedEnvelope.into_result().unwrap_err().code(),
            400
        );
    }

    #[test]
    fn test_debug_hides_plaintext() {
        let outcome = ProtocolOutcome::Decrypted {
            from: "alice".into(),
            plaintext: b"secret".to_vec(),
        };
        assert!(!format!("{:?}", outcome).contains("secret"));
        assert_eq!(outcome.to_string(), "[alice] secret");
    }
}
