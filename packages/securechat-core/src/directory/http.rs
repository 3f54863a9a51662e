//! HTTP client for the relay server's key directory.
//!
//! ```text
//! POST /api/chat/keys/upload/        {username, public_key_b64}
//! GET  /api/chat/keys/{username}/    200 {username, public_key_b64, updated_at} | 404
//! ```

use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

use super::{directory_name, KeyDirectory};
use crate::crypto::KeyPurpose;
use crate::error::{Error, Result};

#[derive(Debug, Serialize)]
struct UploadRequest<'a> {
    username: &'a str,
    public_key_b64: String,
}

#[derive(Debug, Deserialize)]
struct KeyRecord {
    public_key_b64: String,
}

/// Key directory reached over HTTP
#[derive(Debug, Clone)]
pub struct HttpDirectory {
    client: Client,
    base_url: String,
}

impl HttpDirectory {
    /// Client for the directory at `base_url`; every request is bounded by `timeout`
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Config(format!("HTTP client: {}", e)))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn upload_url(&self) -> String {
        format!("{}/api/chat/keys/upload/", self.base_url)
    }

    fn lookup_url(&self, name: &str) -> String {
        format!(
            "{}/api/chat/keys/{}/",
            self.base_url,
            urlencoding::encode(name)
        )
    }
}

#[async_trait]
impl KeyDirectory for HttpDirectory {
    async fn publish(&self, principal: &str, purpose: KeyPurpose, public_key: &[u8]) -> Result<()> {
        let name = directory_name(principal, purpose);
        let body = UploadRequest {
            username: &name,
            public_key_b64: STANDARD.encode(public_key),
        };

        let response = self.client.post(self.upload_url()).json(&body).send().await?;
        let status = response.status();
        if !status.is_success() {
            tracing::warn!(name = name.as_str(), %status, "Key upload rejected");
            return Err(Error::DirectoryUnavailable(format!(
                "upload of '{}' returned {}",
                name, status
            )));
        }

        tracing::debug!(name = name.as_str(), bytes = public_key.len(), "Key uploaded");
        Ok(())
    }

    async fn resolve(&self, principal: &str, purpose: KeyPurpose) -> Result<Option<Vec<u8>>> {
        let name = directory_name(principal, purpose);
        let response = self.client.get(self.lookup_url(&name)).send().await?;

        match response.status() {
            StatusCode::NOT_FOUND => {
                tracing::debug!(name = name.as_str(), "No key published");
                Ok(None)
            }
            status if status.is_success() => {
                let record: KeyRecord = response.json().await?;
                let key = STANDARD
                    .decode(record.public_key_b64.trim())
                    .map_err(|e| Error::MalformedKey {
                        purpose,
                        reason: format!("directory returned invalid base64: {}", e),
                    })?;
                Ok(Some(key))
            }
            status => Err(Error::DirectoryUnavailable(format!(
                "lookup of '{}' returned {}",
                name, status
            ))),
        }
    }
}
