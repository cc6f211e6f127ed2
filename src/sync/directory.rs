//! Directory listing → object store reconciliation

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use reqwest::Url;
use serde::{Deserialize, Serialize};

use super::{ItemOutcome, ItemStatus, SyncStage};
use crate::config::{MirrorConfig, CONTENT_TIMEOUT, LISTING_TIMEOUT};
use crate::error::{MirrorError, Result};
use crate::fetch::Fetcher;
use crate::hash::sha256_hex;
use crate::listing::{parse_listing, ListingOptions};
use crate::store::{mirror_metadata, ObjectStore, CONTENT_TYPE_TEXT};

/// Summary of one directory sync run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncResult {
    pub bucket: String,
    pub prefix: String,
    pub remote_count: usize,
    pub existing_count: usize,
    pub uploaded: usize,
    pub skipped_unchanged: usize,
    pub deleted_missing_from_source: usize,
    pub failed: usize,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    /// Uploads in listing order, then deletions in key order
    pub items: Vec<ItemOutcome>,
}

impl SyncResult {
    fn from_items(
        bucket: &str,
        prefix: &str,
        remote_count: usize,
        existing_count: usize,
        started_at: DateTime<Utc>,
        items: Vec<ItemOutcome>,
    ) -> Self {
        let mut uploaded = 0;
        let mut skipped_unchanged = 0;
        let mut deleted_missing_from_source = 0;
        let mut failed = 0;

        for item in &items {
            match item.status {
                ItemStatus::Uploaded { .. } => uploaded += 1,
                ItemStatus::Skipped => skipped_unchanged += 1,
                ItemStatus::Deleted => deleted_missing_from_source += 1,
                ItemStatus::Failed { .. } => failed += 1,
            }
        }

        Self {
            bucket: bucket.to_string(),
            prefix: prefix.to_string(),
            remote_count,
            existing_count,
            uploaded,
            skipped_unchanged,
            deleted_missing_from_source,
            failed,
            started_at,
            completed_at: Utc::now(),
            items,
        }
    }

    /// Failed items only
    pub fn failures(&self) -> impl Iterator<Item = &ItemOutcome> {
        self.items.iter().filter(|item| item.is_failure())
    }
}

/// Keys present in the store but no longer listed remotely, in key order
///
/// Keys outside `prefix` and directory markers (trailing `/`) are never
/// selected.
pub fn plan_deletions(
    existing_keys: &BTreeSet<String>,
    remote_keys: &BTreeSet<String>,
    prefix: &str,
) -> Vec<String> {
    existing_keys
        .difference(remote_keys)
        .filter(|key| key.starts_with(prefix) && !key.ends_with('/'))
        .cloned()
        .collect()
}

/// Mirrors a remote directory listing into `bucket` under `prefix`
pub struct DirectorySync {
    store: Arc<dyn ObjectStore>,
    fetcher: Arc<dyn Fetcher>,
    config: MirrorConfig,
}

impl DirectorySync {
    pub fn new(store: Arc<dyn ObjectStore>, fetcher: Arc<dyn Fetcher>, config: MirrorConfig) -> Self {
        Self {
            store,
            fetcher,
            config,
        }
    }

    fn listing_options(&self) -> ListingOptions {
        ListingOptions {
            fragment: self.config.listing_fragment.clone(),
            primary_file: self.config.primary_file.clone(),
            max_files: self.config.max_files,
        }
    }

    /// Run one full reconciliation
    ///
    /// Listing retrieval and key enumeration failures abort the run. Any
    /// failure after that is recorded against its key and the run goes on.
    pub async fn run(&self) -> Result<SyncResult> {
        let bucket = self.config.bucket.as_str();
        let prefix = self.config.prefix.as_str();
        let base = Url::parse(&self.config.base_url)
            .map_err(|e| MirrorError::Config(format!("BASE_URL {:?}: {}", self.config.base_url, e)))?;

        let started_at = Utc::now();
        tracing::info!("Syncing {} to s3://{}/{}", base, bucket, prefix);

        let document = self.fetcher.fetch(base.as_str(), LISTING_TIMEOUT).await?;
        let remote_files = parse_listing(&document, &self.listing_options());
        let remote_keys: BTreeSet<String> = remote_files
            .iter()
            .map(|name| format!("{}{}", prefix, name))
            .collect();

        let existing_keys = self.store.list_keys(bucket, prefix).await?;
        tracing::info!(
            remote = remote_files.len(),
            existing = existing_keys.len(),
            "Listed remote directory and store prefix"
        );

        let mut items = Vec::with_capacity(remote_files.len());

        for name in &remote_files {
            items.push(self.mirror_file(&base, name).await);
        }

        for key in plan_deletions(&existing_keys, &remote_keys, prefix) {
            items.push(self.delete_orphan(key).await);
        }

        let result = SyncResult::from_items(
            bucket,
            prefix,
            remote_files.len(),
            existing_keys.len(),
            started_at,
            items,
        );

        tracing::info!(
            uploaded = result.uploaded,
            skipped = result.skipped_unchanged,
            deleted = result.deleted_missing_from_source,
            failed = result.failed,
            "Sync of s3://{}/{} completed in {:?}",
            bucket,
            prefix,
            result.completed_at - result.started_at
        );

        Ok(result)
    }

    async fn mirror_file(&self, base: &Url, name: &str) -> ItemOutcome {
        let key = format!("{}{}", self.config.prefix, name);

        let status = match self.upload_if_changed(base, name, &key).await {
            Ok(status) => status,
            Err((stage, e)) => {
                tracing::warn!("FAILED upload {}: {}", name, e);
                ItemStatus::Failed {
                    stage,
                    kind: e.kind().to_string(),
                    reason: e.to_string(),
                }
            }
        };

        ItemOutcome { key, status }
    }

    async fn upload_if_changed(
        &self,
        base: &Url,
        name: &str,
        key: &str,
    ) -> std::result::Result<ItemStatus, (SyncStage, MirrorError)> {
        let bucket = self.config.bucket.as_str();

        let url = base
            .join(name)
            .map_err(|e| (SyncStage::Fetch, MirrorError::Config(format!("{}: {}", name, e))))?;

        let data = self
            .fetcher
            .fetch(url.as_str(), CONTENT_TIMEOUT)
            .await
            .map_err(|e| (SyncStage::Fetch, e))?;
        let digest = sha256_hex(&data);

        // A failed HEAD counts as "no prior digest"; the PUT below decides the outcome
        let stored = match self.store.head_metadata(bucket, key).await {
            Ok(meta) => meta,
            Err(e) => {
                tracing::debug!("HEAD {} failed, treating as absent: {}", key, e);
                None
            }
        };

        if stored.as_ref().and_then(|m| m.content_hash()) == Some(digest.as_str()) {
            tracing::debug!("Unchanged {}", key);
            return Ok(ItemStatus::Skipped);
        }

        self.store
            .put_object(
                bucket,
                key,
                data,
                CONTENT_TYPE_TEXT,
                &mirror_metadata(&digest, url.as_str()),
            )
            .await
            .map_err(|e| (SyncStage::Put, e))?;

        tracing::info!("Uploaded {}", key);
        Ok(ItemStatus::Uploaded { digest })
    }

    async fn delete_orphan(&self, key: String) -> ItemOutcome {
        let status = match self.store.delete_object(&self.config.bucket, &key).await {
            Ok(()) => ItemStatus::Deleted,
            Err(e) => {
                tracing::warn!("FAILED delete {}: {}", key, e);
                ItemStatus::Failed {
                    stage: SyncStage::Delete,
                    kind: e.kind().to_string(),
                    reason: e.to_string(),
                }
            }
        };

        ItemOutcome { key, status }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_plan_deletions_orphans_only() {
        let existing = set(&["p/a.txt", "p/old.txt"]);
        let remote = set(&["p/a.txt", "p/b.txt"]);
        assert_eq!(plan_deletions(&existing, &remote, "p/"), vec!["p/old.txt"]);
    }

    #[test]
    fn test_plan_deletions_skips_markers_and_foreign_keys() {
        let existing = set(&["p/", "p/sub/", "other/x", "p/z", "p/y"]);
        let remote = set(&[]);
        assert_eq!(plan_deletions(&existing, &remote, "p/"), vec!["p/y", "p/z"]);
    }

    mod upload_logging {
        use super::*;
        use crate::store::MemoryStore;
        use async_trait::async_trait;
        use parking_lot::Mutex;
        use std::io;
        use std::time::Duration;

        const BASE: &str = "https://download.bls.gov/pub/time.series/pr/";

        struct OneFile;

        #[async_trait]
        impl Fetcher for OneFile {
            async fn fetch(&self, url: &str, _timeout: Duration) -> Result<Vec<u8>> {
                if url == BASE {
                    Ok(br#"<a href="/pub/time.series/pr/pr.series">pr.series</a>"#.to_vec())
                } else {
                    Ok(b"series body".to_vec())
                }
            }
        }

        #[derive(Clone, Default)]
        struct Captured(Arc<Mutex<Vec<u8>>>);

        impl io::Write for Captured {
            fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
                self.0.lock().extend_from_slice(buf);
                Ok(buf.len())
            }

            fn flush(&mut self) -> io::Result<()> {
                Ok(())
            }
        }

        #[test]
        fn test_upload_logged_by_engine() {
            let captured = Captured::default();
            let writer = captured.clone();
            let subscriber = tracing_subscriber::fmt()
                .with_writer(move || writer.clone())
                .with_ansi(false)
                .with_max_level(tracing::Level::INFO)
                .finish();

            let store = Arc::new(MemoryStore::new());
            let sync = DirectorySync::new(store, Arc::new(OneFile), MirrorConfig::default());

            let result = tracing::subscriber::with_default(subscriber, || {
                tokio_test::block_on(sync.run())
            })
            .unwrap();

            assert_eq!(result.uploaded, 1);
            let logs = String::from_utf8(captured.0.lock().clone()).unwrap();
            assert!(logs.contains("Uploaded bls/pr/pr.series"), "logs: {}", logs);
        }
    }
}
