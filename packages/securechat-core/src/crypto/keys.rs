//! # Key Management
//!
//! Generation, export and import of the two independent key pairs every
//! identity holds.
//!
//! ## Key Types
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          KEY TYPES                                      │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │  EncryptionKeyPair (RSA, 2048-bit, e = 65537)                   │   │
//! │  │                                                                  │   │
//! │  │  • Receives messages: peers encrypt under the public half       │   │
//! │  │  • Public form: DER SubjectPublicKeyInfo (rsaEncryption)        │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │  SigningKeyPair (Ed25519)                                       │   │
//! │  │                                                                  │   │
//! │  │  • Proves authorship of transmitted ciphertext                  │   │
//! │  │  • Public form: DER SubjectPublicKeyInfo (id-Ed25519)           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                                                         │
//! │  A key pair's purpose is fixed at generation. Importing public bytes  │
//! │  always names the purpose, and the resulting handle only exposes     │
//! │  that purpose's operation.                                            │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::fmt;

use ed25519_dalek::pkcs8::{DecodePublicKey as _, EncodePublicKey as _};
use ed25519_dalek::{SigningKey, VerifyingKey};
use rand::rngs::OsRng;
use rsa::pkcs8::{DecodePublicKey, EncodePublicKey};
use rsa::{RsaPrivateKey, RsaPublicKey};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default RSA modulus size in bits
pub const DEFAULT_ENCRYPTION_KEY_BITS: usize = 2048;

/// Smallest modulus accepted for generation
pub const MIN_ENCRYPTION_KEY_BITS: usize = 1024;

/// What a key pair may be used for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyPurpose {
    /// Encrypt / decrypt
    Encryption,
    /// Sign / verify
    Signing,
}

impl fmt::Display for KeyPurpose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyPurpose::Encryption => f.write_str("encryption"),
            KeyPurpose::Signing => f.write_str("signing"),
        }
    }
}

/// A freshly generated key pair, tagged by purpose
pub enum KeyPair {
    /// RSA key pair for OAEP encryption
    Encryption(EncryptionKeyPair),
    /// Ed25519 key pair for signatures
    Signing(SigningKeyPair),
}

impl KeyPair {
    /// Generate a key pair for `purpose` with default parameters
    pub fn generate(purpose: KeyPurpose) -> Result<Self> {
        match purpose {
            KeyPurpose::Encryption => {
                EncryptionKeyPair::generate(DEFAULT_ENCRYPTION_KEY_BITS).map(KeyPair::Encryption)
            }
            KeyPurpose::Signing => Ok(KeyPair::Signing(SigningKeyPair::generate())),
        }
    }

    /// The purpose this pair was generated for
    pub fn purpose(&self) -> KeyPurpose {
        match self {
            KeyPair::Encryption(_) => KeyPurpose::Encryption,
            KeyPair::Signing(_) => KeyPurpose::Signing,
        }
    }

    /// Export the public half as DER SubjectPublicKeyInfo
    pub fn export_public(&self) -> Result<Vec<u8>> {
        match self {
            KeyPair::Encryption(kp) => kp.export_public(),
            KeyPair::Signing(kp) => kp.export_public(),
        }
    }
}

/// RSA key pair used for OAEP encryption
///
/// The private key zeroizes itself when dropped.
#[derive(Clone)]
pub struct EncryptionKeyPair {
    secret: RsaPrivateKey,
    public: RsaPublicKey,
}

impl EncryptionKeyPair {
    /// Generate a new RSA key pair with a modulus of `bits` bits
    pub fn generate(bits: usize) -> Result<Self> {
        if bits < MIN_ENCRYPTION_KEY_BITS {
            return Err(Error::KeyGeneration(KeyPurpose::Encryption));
        }
        let secret = RsaPrivateKey::new(&mut OsRng, bits).map_err(|e| {
            tracing::warn!(error = %e, bits, "RSA key generation failed");
            Error::KeyGeneration(KeyPurpose::Encryption)
        })?;
        let public = RsaPublicKey::from(&secret);
        Ok(Self { secret, public })
    }

    /// Export the public key as DER SubjectPublicKeyInfo
    pub fn export_public(&self) -> Result<Vec<u8>> {
        self.public
            .to_public_key_der()
            .map(|doc| doc.as_bytes().to_vec())
            .map_err(|e| Error::Internal(format!("SPKI encoding failed: {}", e)))
    }

    /// Usable public handle for this pair
    pub fn public_key(&self) -> EncryptionPublicKey {
        EncryptionPublicKey(self.public.clone())
    }

    pub(crate) fn private_key(&self) -> &RsaPrivateKey {
        &self.secret
    }
}

/// Ed25519 signing key pair
pub struct SigningKeyPair {
    // ed25519_dalek::SigningKey zeroizes on drop
    secret: SigningKey,
}

impl SigningKeyPair {
    /// Generate a new random signing key pair
    pub fn generate() -> Self {
        Self {
            secret: SigningKey::generate(&mut OsRng),
        }
    }

    /// Export the verifying key as DER SubjectPublicKeyInfo
    pub fn export_public(&self) -> Result<Vec<u8>> {
        self.secret
            .verifying_key()
            .to_public_key_der()
            .map(|doc| doc.as_bytes().to_vec())
            .map_err(|e| Error::Internal(format!("SPKI encoding failed: {}", e)))
    }

    /// Usable public handle for this pair
    pub fn public_key(&self) -> SigningPublicKey {
        SigningPublicKey(self.secret.verifying_key())
    }

    pub(crate) fn signing_key(&self) -> &SigningKey {
        &self.secret
    }
}

/// Imported RSA public key; can only encrypt
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EncryptionPublicKey(pub(crate) RsaPublicKey);

/// Imported Ed25519 public key; can only verify
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SigningPublicKey(pub(crate) VerifyingKey);

/// A public key restricted to the operations of its purpose
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PublicKeyHandle {
    /// Encrypt-only handle
    Encryption(EncryptionPublicKey),
    /// Verify-only handle
    Signing(SigningPublicKey),
}

impl PublicKeyHandle {
    /// Parse exported SPKI bytes for `purpose`
    ///
    /// Fails with [`Error::MalformedKey`] if the bytes are not valid SPKI or
    /// describe an algorithm that does not match the purpose.
    pub fn import(bytes: &[u8], purpose: KeyPurpose) -> Result<Self> {
        match purpose {
            KeyPurpose::Encryption => {
                EncryptionPublicKey::from_spki(bytes).map(PublicKeyHandle::Encryption)
            }
            KeyPurpose::Signing => SigningPublicKey::from_spki(bytes).map(PublicKeyHandle::Signing),
        }
    }

    /// The purpose this handle was imported for
    pub fn purpose(&self) -> KeyPurpose {
        match self {
            PublicKeyHandle::Encryption(_) => KeyPurpose::Encryption,
            PublicKeyHandle::Signing(_) => KeyPurpose::Signing,
        }
    }
}

impl EncryptionPublicKey {
    /// Parse a DER SubjectPublicKeyInfo RSA public key
    pub fn from_spki(bytes: &[u8]) -> Result<Self> {
        RsaPublicKey::from_public_key_der(bytes)
            .map(Self)
            .map_err(|e| Error::MalformedKey {
                purpose: KeyPurpose::Encryption,
                reason: e.to_string(),
            })
    }

    /// Re-export as DER SubjectPublicKeyInfo
    pub fn to_spki(&self) -> Result<Vec<u8>> {
        self.0
            .to_public_key_der()
            .map(|doc| doc.as_bytes().to_vec())
            .map_err(|e| Error::Internal(format!("SPKI encoding failed: {}", e)))
    }
}

impl SigningPublicKey {
    /// Parse a DER SubjectPublicKeyInfo Ed25519 public key
    pub fn from_spki(bytes: &[u8]) -> Result<Self> {
        VerifyingKey::from_public_key_der(bytes)
            .map(Self)
            .map_err(|e| Error::MalformedKey {
                purpose: KeyPurpose::Signing,
                reason: e.to_string(),
            })
    }

    /// Re-export as DER SubjectPublicKeyInfo
    pub fn to_spki(&self) -> Result<Vec<u8>> {
        self.0
            .to_public_key_der()
            .map(|doc| doc.as_bytes().to_vec())
            .map_err(|e| Error::Internal(format!("SPKI encoding failed: {}", e)))
    }
}

// ============================================================================
// TESTS
// ============================================================================
