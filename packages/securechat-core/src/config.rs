//! Client configuration.
//!
//! One `ClientConfig` drives the orchestrator and tells the HTTP directory
//! and WebSocket relay where the server lives. Every field has a default so
//! a partial JSON document (or none at all) is enough.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::crypto::{DEFAULT_ENCRYPTION_KEY_BITS, MIN_ENCRYPTION_KEY_BITS};
use crate::error::{Error, Result};

/// Default server base URL
pub const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:8000";

/// Default relay room
pub const DEFAULT_ROOM: &str = "testroom";

/// Default directory timeout in seconds
pub const DEFAULT_RESOLVE_TIMEOUT_SECS: u64 = 5;

/// What to do with an envelope whose signature cannot be verified
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationPolicy {
    /// Report the failure, then decrypt anyway
    #[default]
    Deliver,
    /// Report the failure and stop
    Reject,
}

/// Client-side configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Base URL of the server hosting the directory and relay
    pub server_url: String,
    /// Relay room to join
    pub room: String,
    /// Upper bound on a single directory call, in seconds
    pub resolve_timeout_secs: u64,
    /// RSA modulus size for the encryption key pair
    pub encryption_key_bits: usize,
    /// Handling of unverifiable envelopes
    pub verification_policy: VerificationPolicy,
    /// Use the signing key embedded in an envelope instead of a directory lookup
    pub prefer_embedded_signing_key: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            room: DEFAULT_ROOM.to_string(),
            resolve_timeout_secs: DEFAULT_RESOLVE_TIMEOUT_SECS,
            encryption_key_bits: DEFAULT_ENCRYPTION_KEY_BITS,
            verification_policy: VerificationPolicy::default(),
            prefer_embedded_signing_key: true,
        }
    }
}

impl ClientConfig {
    /// Parse a JSON config document, filling gaps with defaults
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check invariants the rest of the crate relies on
    pub fn validate(&self) -> Result<()> {
        if !(self.server_url.starts_with("http://") || self.server_url.starts_with("https://")) {
            return Err(Error::Config(format!(
                "server_url must be http(s), got '{}'",
                self.server_url
            )));
        }
        if self.room.is_empty() {
            return Err(Error::Config("room must not be empty".into()));
        }
        if self.resolve_timeout_secs == 0 {
            return Err(Error::Config("resolve_timeout_secs must be positive".into()));
        }
        if self.encryption_key_bits < MIN_ENCRYPTION_KEY_BITS {
            return Err(Error::Config(format!(
                "encryption_key_bits must be at least {}",
                MIN_ENCRYPTION_KEY_BITS
            )));
        }
        Ok(())
    }

    /// Directory call timeout
    pub fn resolve_timeout(&self) -> Duration {
        Duration::from_secs(self.resolve_timeout_secs)
    }

    /// Base URL for directory requests
    pub fn directory_url(&self) -> String {
        self.server_url.trim_end_matches('/').to_string()
    }

    /// WebSocket base URL for the relay (`http` → `ws`, `https` → `wss`)
    pub fn relay_url(&self) -> String {
        let base = self.server_url.trim_end_matches('/');
        if let Some(rest) = base.strip_prefix("https://") {
            format!("wss://{}", rest)
        } else if let Some(rest) = base.strip_prefix("http://") {
            format!("ws://{}", rest)
        } else {
            base.to_string()
        }
    }
}
