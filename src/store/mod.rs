//! Object store abstraction
//!
//! The mirror only needs a flat key-value store with user metadata tags:
//! paginated listing under a prefix, metadata-only HEAD, whole-object PUT,
//! GET and DELETE.
//!
//! # Feature Flags
//!
//! The S3 backend requires the `cloud` feature. The in-memory backend is
//! always available and is what the tests run against.

mod memory;
#[cfg(feature = "cloud")]
mod s3;

pub use memory::{MemoryStore, StoredObject};
#[cfg(feature = "cloud")]
pub use s3::S3Store;

use std::collections::{BTreeSet, HashMap, HashSet};

use async_trait::async_trait;

use crate::error::{MirrorError, Result};

/// User metadata tag holding the hex SHA-256 of the stored body
pub const META_SHA256: &str = "sha256";
/// User metadata tag holding the URL the body was fetched from
pub const META_SOURCE_URL: &str = "source_url";

pub const CONTENT_TYPE_TEXT: &str = "text/plain";
pub const CONTENT_TYPE_JSON: &str = "application/json";

/// Metadata returned by a HEAD request
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObjectMetadata {
    pub size: u64,
    pub content_type: Option<String>,
    pub user_metadata: HashMap<String, String>,
}

impl ObjectMetadata {
    /// Content digest recorded at upload time, if any
    pub fn content_hash(&self) -> Option<&str> {
        self.user_metadata.get(META_SHA256).map(String::as_str)
    }

    pub fn source_url(&self) -> Option<&str> {
        self.user_metadata.get(META_SOURCE_URL).map(String::as_str)
    }
}

/// One page of a prefix listing
#[derive(Debug, Clone, Default)]
pub struct ListPage {
    pub keys: Vec<String>,
    /// Token for the next page; `None` once the listing is exhausted
    pub next_token: Option<String>,
}

/// Key-value object store with metadata tags
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// List one page of keys under `prefix`, continuing from `token`
    async fn list_page(&self, bucket: &str, prefix: &str, token: Option<&str>) -> Result<ListPage>;

    /// Metadata for `key`, or `None` if the object does not exist
    async fn head_metadata(&self, bucket: &str, key: &str) -> Result<Option<ObjectMetadata>>;

    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Vec<u8>,
        content_type: &str,
        metadata: &HashMap<String, String>,
    ) -> Result<()>;

    async fn delete_object(&self, bucket: &str, key: &str) -> Result<()>;

    async fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>>;

    /// Every key under `prefix`, following continuation tokens to the end
    ///
    /// A token seen twice is an error: the listing would otherwise loop or
    /// end early and orphans past that point would never be deleted.
    async fn list_keys(&self, bucket: &str, prefix: &str) -> Result<BTreeSet<String>> {
        let mut keys = BTreeSet::new();
        let mut seen_tokens = HashSet::new();
        let mut token: Option<String> = None;

        loop {
            let page = self.list_page(bucket, prefix, token.as_deref()).await?;
            keys.extend(page.keys);

            match page.next_token {
                Some(next) => {
                    if !seen_tokens.insert(next.clone()) {
                        return Err(MirrorError::Store(format!(
                            "continuation token repeated while listing {}/{}: {}",
                            bucket, prefix, next
                        )));
                    }
                    token = Some(next);
                }
                None => break,
            }
        }

        Ok(keys)
    }
}

/// Build the user metadata attached to every mirrored object
pub fn mirror_metadata(digest: &str, source_url: &str) -> HashMap<String, String> {
    let mut metadata = HashMap::with_capacity(2);
    metadata.insert(META_SHA256.to_string(), digest.to_string());
    metadata.insert(META_SOURCE_URL.to_string(), source_url.to_string());
    metadata
}
