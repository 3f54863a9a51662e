//! # Encryption Module
//!
//! RSA-OAEP (SHA-256, empty label) for message confidentiality.
//!
//! ## Encryption Flow
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      MESSAGE ENCRYPTION FLOW                            │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  SENDER (Alice)                                                        │
//! │  ┌─────────────────────────────────────────────────────────────┐       │
//! │  │  plaintext (≤ k - 2·hLen - 2 bytes)                          │       │
//! │  │           ↓                                                  │       │
//! │  │  OAEP-SHA256 pad (random seed from OsRng)                    │       │
//! │  │           ↓                                                  │       │
//! │  │  RSA under Bob's encryption public key                      │       │
//! │  │           ↓                                                  │       │
//! │  │  ciphertext (exactly k bytes)                               │       │
//! │  └─────────────────────────────────────────────────────────────┘       │
//! │                                                                         │
//! │  RECIPIENT (Bob)                                                       │
//! │  ┌─────────────────────────────────────────────────────────────┐       │
//! │  │  RSA with Bob's private key → OAEP unpad → plaintext        │       │
//! │  │  any failure → DecryptionFailed (no detail)                 │       │
//! │  └─────────────────────────────────────────────────────────────┘       │
//! │                                                                         │
//! │  k = modulus length in bytes (256 for 2048-bit keys)                   │
//! │  hLen = 32 (SHA-256)                                                   │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Oversized plaintext is rejected, never truncated or chunked.

use rand::rngs::OsRng;
use rsa::traits::PublicKeyParts;
use rsa::Oaep;
use sha2::Sha256;

use crate::crypto::{EncryptionKeyPair, EncryptionPublicKey};
use crate::error::{Error, Result};

/// Output size of the OAEP hash in bytes
const OAEP_HASH_LEN: usize = 32;

/// Largest plaintext `key` can encrypt in a single OAEP block
pub fn max_plaintext_len(key: &EncryptionPublicKey) -> usize {
    key.0.size().saturating_sub(2 * OAEP_HASH_LEN + 2)
}

/// Encrypt `plaintext` under the recipient's encryption public key
///
/// Fails with [`Error::PlaintextTooLarge`] before touching the primitive if
/// the plaintext does not fit in one OAEP block.
pub fn encrypt(key: &EncryptionPublicKey, plaintext: &[u8]) -> Result<Vec<u8>> {
    let max = max_plaintext_len(key);
    if plaintext.len() > max {
        return Err(Error::PlaintextTooLarge {
            len: plaintext.len(),
            max,
        });
    }

    key.0
        .encrypt(&mut OsRng, Oaep::new::<Sha256>(), plaintext)
        .map_err(|_| Error::EncryptionFailed)
}

/// Decrypt `ciphertext` with our own encryption private key
///
/// Every failure collapses to [`Error::DecryptionFailed`]; padding and
/// length diagnostics are discarded.
pub fn decrypt(keypair: &EncryptionKeyPair, ciphertext: &[u8]) -> Result<Vec<u8>> {
    keypair
        .private_key()
        .decrypt(Oaep::new::<Sha256>(), ciphertext)
        .map_err(|_| Error::DecryptionFailed)
}

// ============================================================================
// TESTS
// ============================================================================
