//! # Identity
//!
//! A named principal and its two key pairs.
//!
//! Identities are created at client startup and dropped when the session
//! ends. Nothing here is persisted: a restarted client is a new identity and
//! must publish its keys again.

use std::fmt;

use crate::crypto::{EncryptionKeyPair, KeyPurpose, SigningKeyPair, DEFAULT_ENCRYPTION_KEY_BITS};
use crate::error::{Error, Result};

/// A principal name plus one encryption and one signing key pair
pub struct Identity {
    name: String,
    encryption: EncryptionKeyPair,
    signing: SigningKeyPair,
}

impl Identity {
    /// Generate a fresh identity with default key parameters
    pub fn generate(name: impl Into<String>) -> Result<Self> {
        Self::generate_with_bits(name, DEFAULT_ENCRYPTION_KEY_BITS)
    }

    /// Generate a fresh identity with an RSA modulus of `bits` bits
    pub fn generate_with_bits(name: impl Into<String>, bits: usize) -> Result<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(Error::Config("principal name must not be empty".into()));
        }

        tracing::info!(principal = name.as_str(), bits, "Generating identity keys");
        let encryption = EncryptionKeyPair::generate(bits)?;
        let signing = SigningKeyPair::generate();

        Ok(Self {
            name,
            encryption,
            signing,
        })
    }

    /// Assemble an identity from existing key pairs
    pub fn from_parts(
        name: impl Into<String>,
        encryption: EncryptionKeyPair,
        signing: SigningKeyPair,
    ) -> Self {
        Self {
            name: name.into(),
            encryption,
            signing,
        }
    }

    /// Principal name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Encryption key pair
    pub fn encryption(&self) -> &EncryptionKeyPair {
        &self.encryption
    }

    /// Signing key pair
    pub fn signing(&self) -> &SigningKeyPair {
        &self.signing
    }

    /// Exported public key for `purpose` (DER SPKI)
    pub fn export_public(&self, purpose: KeyPurpose) -> Result<Vec<u8>> {
        match purpose {
            KeyPurpose::Encryption => self.encryption.export_public(),
            KeyPurpose::Signing => self.signing.export_public(),
        }
    }
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Identity")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}
