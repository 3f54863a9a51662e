//! # Error Handling
//!
//! Error types for SecureChat Core.
//!
//! ## Error Hierarchy
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                           ERROR HIERARCHY                               │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  Error (top-level)                                                     │
//! │  │                                                                      │
//! │  ├── Key Errors                                                        │
//! │  │   ├── KeyGeneration         - Primitive unavailable / keygen failed │
//! │  │   └── MalformedKey          - Public key bytes are not valid SPKI   │
//! │  │                                                                      │
//! │  ├── Crypto Errors                                                     │
//! │  │   ├── PlaintextTooLarge     - Exceeds the OAEP payload bound        │
//! │  │   ├── EncryptionFailed      - Encryption primitive failed           │
//! │  │   ├── DecryptionFailed      - Opaque: wrong key, padding, tamper    │
//! │  │   └── VerificationFailed    - Signature does not match              │
//! │  │                                                                      │
//! │  ├── Directory Errors                                                  │
//! │  │   ├── KeyUnresolved         - No published key for the principal    │
//! │  │   └── DirectoryUnavailable  - Timeout or transport failure          │
//! │  │                                                                      │
//! │  ├── Envelope Errors                                                   │
//! │  │   └── MalformedEnvelope     - Wire bytes failed strict parsing      │
//! │  │                                                                      │
//! │  ├── Session Errors                                                    │
//! │  │   ├── SessionNotReady       - Send on a session that is not Open    │
//! │  │   ├── RelayUnavailable      - Relay connect / IO failure            │
//! │  │   └── InvalidState          - Illegal session transition            │
//! │  │                                                                      │
//! │  └── Internal Errors                                                   │
//! │      ├── Config                - Invalid configuration                 │
//! │      └── Internal              - Should not happen                     │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Cryptographic failures never carry diagnostic detail: a caller learns
//! *that* decryption failed, never *why*. Directory and relay failures carry
//! enough context to retry or alert a human. Nothing here is retried
//! automatically.

use thiserror::Error;

use crate::crypto::KeyPurpose;

/// Result type alias for SecureChat Core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for SecureChat Core
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Key Errors (100-199)
    // ========================================================================

    /// Key generation failed (primitive unavailable or RNG failure)
    #[error("Key generation failed for {0} key")]
    KeyGeneration(KeyPurpose),

    /// Exported public key bytes could not be parsed
    #[error("Malformed {purpose} public key: {reason}")]
    MalformedKey {
        /// Purpose the key was imported for
        purpose: KeyPurpose,
        /// Parser diagnostic
        reason: String,
    },

    // ========================================================================
    // Crypto Errors (200-299)
    // ========================================================================

    /// Plaintext exceeds the maximum payload for the target key
    #[error("Plaintext too large: {len} bytes, maximum is {max}")]
    PlaintextTooLarge {
        /// Length of the rejected plaintext
        len: usize,
        /// Maximum payload for the key
        max: usize,
    },

    /// Encryption primitive failed
    #[error("Encryption failed")]
    EncryptionFailed,

    /// Decryption failed. Deliberately carries no detail.
    #[error("Decryption failed")]
    DecryptionFailed,

    /// Signature did not verify
    #[error("Signature verification failed")]
    VerificationFailed,

    // ========================================================================
    // Directory Errors (300-399)
    // ========================================================================

    /// The directory has no entry for this principal and purpose
    #[error("No {purpose} key published for '{principal}'")]
    KeyUnresolved {
        /// Principal that was looked up
        principal: String,
        /// Purpose that was looked up
        purpose: KeyPurpose,
    },

    /// The directory could not be reached or did not answer in time
    #[error("Key directory unavailable: {0}")]
    DirectoryUnavailable(String),

    // ========================================================================
    // Envelope Errors (400-499)
    // ========================================================================

    /// Wire bytes are not a valid envelope
    #[error("Malformed envelope: {0}")]
    MalformedEnvelope(String),

    // ========================================================================
    // Session Errors (500-599)
    // ========================================================================

    /// The relay session is not open
    #[error("Relay session is not open")]
    SessionNotReady,

    /// The relay could not be reached
    #[error("Relay unavailable: {0}")]
    RelayUnavailable(String),

    /// Illegal session state transition
    #[error("Invalid session state: {0}")]
    InvalidState(String),

    // ========================================================================
    // Internal Errors (900-999)
    // ========================================================================

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Internal error (should not happen in normal operation)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Numeric error code, grouped by category:
    /// - 100-199: Keys
    /// - 200-299: Crypto
    /// - 300-399: Directory
    /// - 400-499: Envelope
    /// - 500-599: Session
    /// - 900-999: Internal
    pub fn code(&self) -> i32 {
        match self {
            // Keys (100-199)
            Error::KeyGeneration(_) => 100,
            Error::MalformedKey { .. } => 101,

            // Crypto (200-299)
            Error::PlaintextTooLarge { .. } => 200,
            Error::EncryptionFailed => 201,
            Error::DecryptionFailed => 202,
            Error::VerificationFailed => 203,

            // Directory (300-399)
            Error::KeyUnresolved { .. } => 300,
            Error::DirectoryUnavailable(_) => 301,

            // Envelope (400-499)
            Error::MalformedEnvelope(_) => 400,

            // Session (500-599)
            Error::SessionNotReady => 500,
            Error::RelayUnavailable(_) => 501,
            Error::InvalidState(_) => 502,

            // Internal (900-999)
            Error::Config(_) => 900,
            Error::Internal(_) => 901,
        }
    }

    /// Check if this error is recoverable
    ///
    /// Recoverable errors can be resolved by retrying later or by the other
    /// party taking action (publishing keys, coming online).
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::DirectoryUnavailable(_)
                | Error::RelayUnavailable(_)
                | Error::SessionNotReady
                | Error::KeyUnresolved { .. }
        )
    }
}

// ============================================================================
// ERROR CONVERSIONS
// ============================================================================

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::DirectoryUnavailable(err.to_string())
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for Error {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        Error::RelayUnavailable(err.to_string())
    }
}

// ============================================================================
// TESTS
// ============================================================================
