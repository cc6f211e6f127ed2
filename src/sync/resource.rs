//! Single JSON resource → object store

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::canonical::canonicalize;
use crate::config::{MirrorConfig, CONTENT_TIMEOUT};
use crate::error::Result;
use crate::fetch::Fetcher;
use crate::hash::sha256_hex;
use crate::store::{mirror_metadata, ObjectStore, CONTENT_TYPE_JSON};

/// Outcome of publishing one resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishResult {
    pub uploaded: usize,
    pub skipped_unchanged: usize,
    pub bucket: String,
    pub key: String,
    pub api_url: String,
    pub digest: String,
}

/// Publishes the population API response under a fixed key
///
/// The body is stored in canonical form so that re-ordered or re-indented
/// responses with the same content do not trigger an upload.
pub struct ResourcePublisher {
    store: Arc<dyn ObjectStore>,
    fetcher: Arc<dyn Fetcher>,
    config: MirrorConfig,
}

impl ResourcePublisher {
    pub fn new(store: Arc<dyn ObjectStore>, fetcher: Arc<dyn Fetcher>, config: MirrorConfig) -> Self {
        Self {
            store,
            fetcher,
            config,
        }
    }

    /// Fetch, canonicalize and upload if the stored digest differs
    ///
    /// Every failure is returned to the caller; there is nothing to isolate.
    pub async fn publish(&self) -> Result<PublishResult> {
        let url = self.config.require_pop_api_url()?;
        let bucket = self.config.bucket.as_str();
        let key = self.config.pop_key.as_str();

        tracing::info!("Fetching {} to s3://{}/{}", url, bucket, key);

        let raw = self.fetcher.fetch(url, CONTENT_TIMEOUT).await?;
        let normalized = canonicalize(&raw)?;
        let digest = sha256_hex(&normalized);

        // Same policy as the directory sync: an unreadable HEAD means "no prior digest"
        let stored = match self.store.head_metadata(bucket, key).await {
            Ok(meta) => meta,
            Err(e) => {
                tracing::debug!("HEAD {} failed, treating as absent: {}", key, e);
                None
            }
        };
        let unchanged = stored.as_ref().and_then(|m| m.content_hash()) == Some(digest.as_str());

        if !unchanged {
            self.store
                .put_object(
                    bucket,
                    key,
                    normalized,
                    CONTENT_TYPE_JSON,
                    &mirror_metadata(&digest, url),
                )
                .await?;
        } else {
            tracing::debug!("Unchanged {}", key);
        }

        Ok(PublishResult {
            uploaded: usize::from(!unchanged),
            skipped_unchanged: usize::from(unchanged),
            bucket: bucket.to_string(),
            key: key.to_string(),
            api_url: url.to_string(),
            digest,
        })
    }
}
