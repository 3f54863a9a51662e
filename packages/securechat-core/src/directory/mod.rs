//! # Key Directory
//!
//! Publishing our public keys and resolving other principals' keys by name.
//!
//! ## Naming Convention
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     DIRECTORY ENTRY NAMES                               │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │   (principal, purpose)              stored under                       │
//! │   ─────────────────────────────────────────────────────                │
//! │   ("alice", Encryption)        ──►  "alice"                            │
//! │   ("alice", Signing)           ──►  "alice_sig"                        │
//! │                                                                         │
//! │   One current entry per name. Publishing again overwrites it.         │
//! │   There is no transaction across the two purposes.                    │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The directory is trusted as-is: entries are not authenticated, so a
//! party that can write to it can substitute keys.

mod http;
mod memory;

pub use http::HttpDirectory;
pub use memory::MemoryDirectory;

use std::time::Duration;

use async_trait::async_trait;

use crate::crypto::KeyPurpose;
use crate::error::{Error, Result};
use crate::identity::Identity;

/// Suffix appended to the principal name for signing keys
pub const SIGNING_KEY_SUFFIX: &str = "_sig";

/// Name under which `principal`'s `purpose` key is stored
pub fn directory_name(principal: &str, purpose: KeyPurpose) -> String {
    match purpose {
        KeyPurpose::Encryption => principal.to_string(),
        KeyPurpose::Signing => format!("{}{}", principal, SIGNING_KEY_SUFFIX),
    }
}

/// A store of exported public keys, keyed by principal and purpose
#[async_trait]
pub trait KeyDirectory: Send + Sync {
    /// Publish (or overwrite) the entry for `(principal, purpose)`
    async fn publish(&self, principal: &str, purpose: KeyPurpose, public_key: &[u8]) -> Result<()>;

    /// Look up the entry for `(principal, purpose)`
    ///
    /// `Ok(None)` means the directory answered and has no entry.
    async fn resolve(&self, principal: &str, purpose: KeyPurpose) -> Result<Option<Vec<u8>>>;

    /// [`resolve`](Self::resolve) bounded by `timeout`
    ///
    /// Running out of time is [`Error::DirectoryUnavailable`], never a miss.
    async fn resolve_within(
        &self,
        principal: &str,
        purpose: KeyPurpose,
        timeout: Duration,
    ) -> Result<Option<Vec<u8>>> {
        match tokio::time::timeout(timeout, self.resolve(principal, purpose)).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(principal, %purpose, ?timeout, "Directory lookup timed out");
                Err(Error::DirectoryUnavailable(format!(
                    "lookup of {} key for '{}' timed out after {:?}",
                    purpose, principal, timeout
                )))
            }
        }
    }
}

/// Publish both public keys of `identity`, encryption first
pub async fn publish_identity(directory: &dyn KeyDirectory, identity: &Identity) -> Result<()> {
    for purpose in [KeyPurpose::Encryption, KeyPurpose::Signing] {
        let public_key = identity.export_public(purpose)?;
        directory
            .publish(identity.name(), purpose, &public_key)
            .await?;
    }
    tracing::info!(principal = identity.name(), "Published public keys");
    Ok(())
}
