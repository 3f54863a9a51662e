//! # SecureChat Core
//!
//! End-to-end encrypted messaging between named principals over an
//! untrusted relay. The relay and the key directory only ever see
//! ciphertext and public keys.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      SECURECHAT CORE MODULES                            │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │                    ┌───────────────────────────┐                        │
//! │                    │   Protocol (Messenger)    │                        │
//! │                    │ - send / on_envelope_bytes│                        │
//! │                    │ - presence                │                        │
//! │                    └─────┬──────┬──────┬───────┘                        │
//! │                          │      │      │                                │
//! │        ┌─────────────────┘      │      └──────────────────┐             │
//! │        ▼                        ▼                         ▼             │
//! │  ┌─────────────┐        ┌──────────────┐         ┌──────────────┐      │
//! │  │  Directory  │        │   Envelope   │         │    Relay     │      │
//! │  │ - HTTP      │        │ - JSON codec │         │ - Session    │      │
//! │  │ - Memory    │        │ - base64     │         │ - WebSocket  │      │
//! │  └──────┬──────┘        └──────────────┘         │ - Local hub  │      │
//! │         │                                         └──────────────┘      │
//! │         ▼                                                               │
//! │  ┌─────────────┐        ┌──────────────┐                                │
//! │  │  Identity   │───────►│    Crypto    │                                │
//! │  │ - name      │        │ - RSA-OAEP   │                                │
//! │  │ - 2 keypairs│        │ - Ed25519    │                                │
//! │  └─────────────┘        └──────────────┘                                │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Hierarchy
//!
//! - [`error`] - Error types for the entire library
//! - [`config`] - Client configuration
//! - [`crypto`] - Key pairs, encryption and signatures
//! - [`identity`] - A principal and its two key pairs
//! - [`directory`] - Public key publication and lookup
//! - [`envelope`] - Wire format
//! - [`relay`] - Room-scoped transport sessions
//! - [`protocol`] - Send and receive orchestration
//!
//! ## Security Model
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          SECURITY LAYERS                                │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  Confidentiality (RSA-OAEP, SHA-256)                                   │
//! │  ───────────────────────────────────                                    │
//! │  Each message is encrypted to the recipient's published encryption    │
//! │  key. Only the recipient's private key recovers it.                    │
//! │                                                                         │
//! │  Authenticity (Ed25519 over the ciphertext)                            │
//! │  ──────────────────────────────────────────                             │
//! │  The sender signs the exact bytes the relay carries. Tampering in     │
//! │  transit is detected before decryption.                                │
//! │                                                                         │
//! │  Not provided: forward secrecy, replay protection, an authenticated   │
//! │  directory, message history.                                           │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

// ============================================================================
// MODULE DECLARATIONS
// ============================================================================

pub mod config;
pub mod crypto;
pub mod directory;
pub mod envelope;
pub mod error;
pub mod identity;
pub mod protocol;
pub mod relay;

// ============================================================================
// RE-EXPORTS
// ============================================================================

pub use config::{ClientConfig, VerificationPolicy};
pub use crypto::{KeyPair, KeyPurpose, PublicKeyHandle};
pub use directory::{HttpDirectory, KeyDirectory, MemoryDirectory};
pub use envelope::{Envelope, Frame, SystemNotice};
pub use error::{Error, Result};
pub use identity::Identity;
pub use protocol::{Messenger, ProtocolOutcome};
pub use relay::{LocalRelay, RelaySession, RelayTransport, SessionState, WsTransport};

// ============================================================================
// VERSION INFO
// ============================================================================

/// Returns the version of SecureChat Core
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

// ============================================================================
// TESTS
// ============================================================================
