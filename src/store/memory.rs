//! In-process object store
//!
//! Behaves like a single S3 account: buckets are implicit, listing is
//! lexicographic and paginated, HEAD of a missing key is `None`. Failures
//! can be injected per key to exercise partial-failure handling.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;

use super::{ListPage, ObjectMetadata, ObjectStore};
use crate::error::{MirrorError, Result};

const DEFAULT_PAGE_SIZE: usize = 1000;

/// A stored body with its content type and user metadata
#[derive(Debug, Clone, PartialEq)]
pub struct StoredObject {
    pub body: Vec<u8>,
    pub content_type: Option<String>,
    pub user_metadata: HashMap<String, String>,
}

#[derive(Default)]
struct FailurePlan {
    puts: HashSet<String>,
    deletes: HashSet<String>,
    heads: HashSet<String>,
    list: bool,
}

/// Object store held in memory
pub struct MemoryStore {
    objects: Mutex<BTreeMap<(String, String), StoredObject>>,
    failures: Mutex<FailurePlan>,
    page_size: usize,
    put_calls: AtomicUsize,
    delete_calls: AtomicUsize,
    list_calls: AtomicUsize,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::with_page_size(DEFAULT_PAGE_SIZE)
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store whose listings return at most `page_size` keys per page
    pub fn with_page_size(page_size: usize) -> Self {
        Self {
            objects: Mutex::new(BTreeMap::new()),
            failures: Mutex::new(FailurePlan::default()),
            page_size: page_size.max(1),
            put_calls: AtomicUsize::new(0),
            delete_calls: AtomicUsize::new(0),
            list_calls: AtomicUsize::new(0),
        }
    }

    /// Seed an object directly, bypassing counters and failure injection
    pub fn insert(&self, bucket: &str, key: &str, body: Vec<u8>, user_metadata: HashMap<String, String>) {
        self.objects.lock().insert(
            (bucket.to_string(), key.to_string()),
            StoredObject {
                body,
                content_type: None,
                user_metadata,
            },
        );
    }

    pub fn object(&self, bucket: &str, key: &str) -> Option<StoredObject> {
        self.objects
            .lock()
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
    }

    /// All keys in `bucket`, sorted
    pub fn keys(&self, bucket: &str) -> Vec<String> {
        self.objects
            .lock()
            .keys()
            .filter(|(b, _)| b == bucket)
            .map(|(_, k)| k.clone())
            .collect()
    }

    pub fn fail_put(&self, key: &str) {
        self.failures.lock().puts.insert(key.to_string());
    }

    pub fn fail_delete(&self, key: &str) {
        self.failures.lock().deletes.insert(key.to_string());
    }

    pub fn fail_head(&self, key: &str) {
        self.failures.lock().heads.insert(key.to_string());
    }

    pub fn fail_list(&self) {
        self.failures.lock().list = true;
    }

    pub fn clear_failures(&self) {
        *self.failures.lock() = FailurePlan::default();
    }

    pub fn put_calls(&self) -> usize {
        self.put_calls.load(Ordering::SeqCst)
    }

    pub fn delete_calls(&self) -> usize {
        self.delete_calls.load(Ordering::SeqCst)
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn list_page(&self, bucket: &str, prefix: &str, token: Option<&str>) -> Result<ListPage> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        if self.failures.lock().list {
            return Err(MirrorError::Store(format!("injected list failure for {}", prefix)));
        }

        let objects = self.objects.lock();
        let mut matching = objects
            .keys()
            .filter(|(b, k)| b == bucket && k.starts_with(prefix))
            .map(|(_, k)| k)
            .filter(|k| token.map_or(true, |t| k.as_str() > t));

        let keys: Vec<String> = matching.by_ref().take(self.page_size).cloned().collect();
        let next_token = if matching.next().is_some() {
            keys.last().cloned()
        } else {
            None
        };

        Ok(ListPage { keys, next_token })
    }

    async fn head_metadata(&self, bucket: &str, key: &str) -> Result<Option<ObjectMetadata>> {
        if self.failures.lock().heads.contains(key) {
            return Err(MirrorError::Store(format!("injected head failure for {}", key)));
        }

        Ok(self.object(bucket, key).map(|obj| ObjectMetadata {
            size: obj.body.len() as u64,
            content_type: obj.content_type,
            user_metadata: obj.user_metadata,
        }))
    }

    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Vec<u8>,
        content_type: &str,
        metadata: &HashMap<String, String>,
    ) -> Result<()> {
        self.put_calls.fetch_add(1, Ordering::SeqCst);
        if self.failures.lock().puts.contains(key) {
            return Err(MirrorError::Store(format!("injected put failure for {}", key)));
        }

        self.objects.lock().insert(
            (bucket.to_string(), key.to_string()),
            StoredObject {
                body,
                content_type: Some(content_type.to_string()),
                user_metadata: metadata.clone(),
            },
        );
        Ok(())
    }

    async fn delete_object(&self, bucket: &str, key: &str) -> Result<()> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        if self.failures.lock().deletes.contains(key) {
            return Err(MirrorError::Store(format!("injected delete failure for {}", key)));
        }

        // S3 DELETE of a missing key succeeds
        self.objects
            .lock()
            .remove(&(bucket.to_string(), key.to_string()));
        Ok(())
    }

    async fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>> {
        self.object(bucket, key)
            .map(|obj| obj.body)
            .ok_or_else(|| MirrorError::Store(format!("no such key: s3://{}/{}", bucket, key)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_put_then_head() {
        let store = MemoryStore::new();
        let mut meta = HashMap::new();
        meta.insert("sha256".to_string(), "d".to_string());
        store
            .put_object("b", "k", b"body".to_vec(), "text/plain", &meta)
            .await
            .unwrap();

        let head = store.head_metadata("b", "k").await.unwrap().unwrap();
        assert_eq!(head.size, 4);
        assert_eq!(head.content_type.as_deref(), Some("text/plain"));
        assert_eq!(head.content_hash(), Some("d"));
        assert_eq!(store.put_calls(), 1);
    }

    #[tokio::test]
    async fn test_head_missing_is_none() {
        let store = MemoryStore::new();
        assert!(store.head_metadata("b", "missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_buckets_are_isolated() {
        let store = MemoryStore::new();
        store.insert("one", "k", b"1".to_vec(), HashMap::new());
        assert!(store.get_object("two", "k").await.is_err());
        assert_eq!(store.get_object("one", "k").await.unwrap(), b"1");
    }

    #[tokio::test]
    async fn test_pages_resume_after_token() {
        let store = MemoryStore::with_page_size(2);
        for key in ["p/1", "p/2", "p/3"] {
            store.insert("b", key, vec![], HashMap::new());
        }
        let first = store.list_page("b", "p/", None).await.unwrap();
        assert_eq!(first.keys, vec!["p/1", "p/2"]);
        let second = store
            .list_page("b", "p/", first.next_token.as_deref())
            .await
            .unwrap();
        assert_eq!(second.keys, vec!["p/3"]);
        assert!(second.next_token.is_none());
    }

    #[tokio::test]
    async fn test_injected_failures() {
        let store = MemoryStore::new();
        store.fail_put("bad");
        store.fail_list();
        assert!(store
            .put_object("b", "bad", vec![], "text/plain", &HashMap::new())
            .await
            .is_err());
        assert!(store.list_keys("b", "").await.is_err());
        store.clear_failures();
        assert!(store.list_keys("b", "").await.is_ok());
    }
}
