//! # Digital Signatures Module
//!
//! Ed25519 signatures over the exact transmitted ciphertext bytes.
//!
//! ## Signature Flow
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     ENCRYPT-THEN-SIGN                                   │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │   plaintext ──► encrypt(Bob's pub) ──► ciphertext ──► sign(Alice's sk) │
//! │                                             │                 │         │
//! │                                             └──── envelope ◄──┘         │
//! │                                                                         │
//! │   The signature covers what the relay actually carries, so any         │
//! │   modification of the ciphertext in transit invalidates it.            │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Verification answers yes or no. A wrong key, a wrong message and a
//! malformed signature are indistinguishable to the caller.

use ed25519_dalek::{Signature as Ed25519Signature, Signer};

use crate::crypto::{SigningKeyPair, SigningPublicKey};

/// Size of an Ed25519 signature in bytes
pub const SIGNATURE_SIZE: usize = 64;

/// Sign `message` with our own signing key
///
/// Ed25519 is deterministic: the same key and message always produce the
/// same 64 bytes.
pub fn sign(keypair: &SigningKeyPair, message: &[u8]) -> Vec<u8> {
    keypair.signing_key().sign(message).to_bytes().to_vec()
}

/// Verify `signature` over `message` under the signer's public key
///
/// Uses strict verification (rejects small-order keys and non-canonical
/// encodings).
pub fn verify(public_key: &SigningPublicKey, message: &[u8], signature: &[u8]) -> bool {
    let Ok(sig) = Ed25519Signature::from_slice(signature) else {
        return false;
    };
    public_key.0.verify_strict(message, &sig).is_ok()
}

// ============================================================================
// TESTS
// ============================================================================
