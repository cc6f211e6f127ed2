//! HTTP content fetcher
//!
//! One GET per call, identified by a configurable `User-Agent`, with a
//! caller-supplied timeout. No retries; a failed call is reported once.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::{MirrorError, Result};

/// Source of remote bytes
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetch the full body at `url`, failing on timeout or non-2xx status
    async fn fetch(&self, url: &str, timeout: Duration) -> Result<Vec<u8>>;
}

/// Fetcher backed by reqwest
pub struct HttpFetcher {
    client: reqwest::Client,
    user_agent: String,
}

impl HttpFetcher {
    pub fn new(user_agent: impl Into<String>) -> Result<Self> {
        let user_agent = user_agent.into();
        let client = reqwest::Client::builder()
            .user_agent(user_agent.clone())
            .build()
            .map_err(|e| MirrorError::Config(format!("HTTP client: {}", e)))?;
        Ok(Self { client, user_agent })
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str, timeout: Duration) -> Result<Vec<u8>> {
        let response = self
            .client
            .get(url)
            .timeout(timeout)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            return Err(MirrorError::Transport(format!("GET {} returned {}", url, status)));
        }

        let body = response.bytes().await?;
        tracing::debug!(url, bytes = body.len(), "fetched");
        Ok(body.to_vec())
    }
}
