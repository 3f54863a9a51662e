//! In-process key directory.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;

use super::{directory_name, KeyDirectory};
use crate::crypto::KeyPurpose;
use crate::error::Result;

/// Key directory backed by a map; shared by cloning an `Arc` around it
#[derive(Debug, Default)]
pub struct MemoryDirectory {
    entries: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryDirectory {
    /// Create an empty directory
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Whether the directory holds no entries
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

#[async_trait]
impl KeyDirectory for MemoryDirectory {
    async fn publish(&self, principal: &str, purpose: KeyPurpose, public_key: &[u8]) -> Result<()> {
        let name = directory_name(principal, purpose);
        tracing::debug!(name = name.as_str(), bytes = public_key.len(), "Publishing key");
        self.entries.write().insert(name, public_key.to_vec());
        Ok(())
    }

    async fn resolve(&self, principal: &str, purpose: KeyPurpose) -> Result<Option<Vec<u8>>> {
        Ok(self
            .entries
            .read()
            .get(&directory_name(principal, purpose))
            .cloned())
    }
}
