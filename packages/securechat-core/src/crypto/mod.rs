//! # Cryptography Module
//!
//! The only module that touches raw cryptographic primitives.
//!
//! ## Security Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    CRYPTOGRAPHIC ARCHITECTURE                           │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  Identity                                                              │
//! │  ├── Encryption key pair (RSA-2048)                                    │
//! │  │     • peers encrypt to us with RSA-OAEP / SHA-256                   │
//! │  │     • max payload 190 bytes, no chunking                            │
//! │  │                                                                      │
//! │  └── Signing key pair (Ed25519)                                        │
//! │        • we sign the ciphertext we transmit                            │
//! │        • 64-byte deterministic signatures                              │
//! │                                                                         │
//! │  Public halves travel as base64 DER SubjectPublicKeyInfo.              │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Algorithm Choices
//!
//! | Algorithm | Purpose | Notes |
//! |-----------|---------|-------|
//! | RSA-OAEP (SHA-256) | Encryption | Public-key encryption without a key exchange round |
//! | Ed25519 | Signing | Strict verification, no malleability |
//!
//! ## Security Considerations
//!
//! 1. **Key Zeroization**: Private keys are zeroized on drop by their crates
//! 2. **Secure Random**: `rand::rngs::OsRng` for key generation and padding
//! 3. **No Oracles**: Decryption and verification failures carry no detail
//! 4. **Purpose Separation**: Imported public keys only expose one operation

mod encryption;
mod keys;
mod signing;

pub use encryption::{decrypt, encrypt, max_plaintext_len};
pub use keys::{
    EncryptionKeyPair, EncryptionPublicKey, KeyPair, KeyPurpose, PublicKeyHandle,
    SigningKeyPair, SigningPublicKey, DEFAULT_ENCRYPTION_KEY_BITS, MIN_ENCRYPTION_KEY_BITS,
};
pub use signing::{sign, verify, SIGNATURE_SIZE};
