//! In-memory object store.
//!
//! Buckets live in a shared map so every client built by one [`MemoryConnector`] sees
//! the same objects. Failures can be scripted per operation and key suffix.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::StreamExt;
use parking_lot::Mutex;
use tracing::debug;

use crate::core::{Connection, ListPage, ListedObject};
use crate::storage::store::{Connector, ObjectStore, ObjectStream};
use crate::utils::{StorageServiceError, StorageServiceResult, object_url};

/// Same page size S3 uses by default.
pub const DEFAULT_PAGE_SIZE: usize = 1000;

/// An object held by the in-memory store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub body: Bytes,
    pub content_type: Option<String>,
    pub last_modified: DateTime<Utc>,
}

/// Store operation a scripted failure applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Put,
    List,
    Get,
    Delete,
}

#[derive(Default)]
struct MemoryState {
    buckets: HashMap<String, BTreeMap<String, StoredObject>>,
    // (operation, key or prefix suffix)
    failures: Vec<(Operation, String)>,
}

impl MemoryState {
    fn check(&self, op: Operation, target: &str) -> StorageServiceResult<()> {
        let scripted = self
            .failures
            .iter()
            .any(|(failing, suffix)| *failing == op && target.ends_with(suffix.as_str()));

        if scripted {
            return Err(StorageServiceError::storage(format!(
                "Scripted {op:?} failure for {target}."
            )));
        }
        Ok(())
    }
}

/// Hands out [`MemoryObjectStore`] clients that share one set of buckets.
#[derive(Clone)]
pub struct MemoryConnector {
    state: Arc<Mutex<MemoryState>>,
    page_size: usize,
}

impl Default for MemoryConnector {
    fn default() -> Self {
        Self {
            state: Arc::default(),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl MemoryConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Caps the number of objects returned per listing page.
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Makes `op` fail for every key (or list prefix) ending in `suffix`.
    pub fn fail_on(&self, op: Operation, suffix: impl Into<String>) {
        self.state.lock().failures.push((op, suffix.into()));
    }

    pub fn clear_failures(&self) {
        self.state.lock().failures.clear();
    }

    pub fn object(&self, bucket: &str, key: &str) -> Option<StoredObject> {
        self.state
            .lock()
            .buckets
            .get(bucket)
            .and_then(|objects| objects.get(key))
            .cloned()
    }

    /// Every key in `bucket`, sorted.
    pub fn keys(&self, bucket: &str) -> Vec<String> {
        self.state
            .lock()
            .buckets
            .get(bucket)
            .map(|objects| objects.keys().cloned().collect())
            .unwrap_or_default()
    }
}

impl Connector for MemoryConnector {
    type Store = MemoryObjectStore;

    fn connect(&self, connection: &Connection) -> StorageServiceResult<MemoryObjectStore> {
        Ok(MemoryObjectStore {
            state: Arc::clone(&self.state),
            connection: connection.clone(),
            page_size: self.page_size,
        })
    }
}

/// Client for one in-memory bucket.
pub struct MemoryObjectStore {
    state: Arc<Mutex<MemoryState>>,
    connection: Connection,
    page_size: usize,
}

impl MemoryObjectStore {
    fn bucket(&self) -> &str {
        &self.connection.bucket_name
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn put(&self, key: &str, body: Bytes, content_type: Option<&str>) -> StorageServiceResult<()> {
        let mut state = self.state.lock();
        state.check(Operation::Put, key)?;

        debug!("storing {} ({} bytes) in memory bucket: {}", key, body.len(), self.bucket());
        state
            .buckets
            .entry(self.bucket().to_owned())
            .or_default()
            .insert(
                key.to_owned(),
                StoredObject {
                    body,
                    content_type: content_type.map(str::to_owned),
                    last_modified: Utc::now(),
                },
            );
        Ok(())
    }

    async fn list_by_prefix(
        &self,
        prefix: &str,
        continuation: Option<&str>,
    ) -> StorageServiceResult<ListPage> {
        let state = self.state.lock();
        state.check(Operation::List, prefix)?;

        let Some(objects) = state.buckets.get(self.bucket()) else {
            return Ok(ListPage::default());
        };

        let mut matching = objects
            .iter()
            .filter(|(key, _)| key.starts_with(prefix))
            .filter(|(key, _)| continuation.is_none_or(|after| key.as_str() > after));

        let mut images = Vec::new();
        for (key, object) in matching.by_ref().take(self.page_size) {
            images.push(ListedObject {
                key: key.clone(),
                last_modified: Some(object.last_modified),
                size: object.body.len() as i64,
                url: object_url(&self.connection, key)?,
            });
        }

        let next_token = match matching.next() {
            Some(_) => images.last().map(|last| last.key.clone()),
            None => None,
        };

        Ok(ListPage { images, next_token })
    }

    async fn get(&self, key: &str) -> StorageServiceResult<ObjectStream> {
        let state = self.state.lock();
        state.check(Operation::Get, key)?;

        let body = state
            .buckets
            .get(self.bucket())
            .and_then(|objects| objects.get(key))
            .map(|object| object.body.clone())
            .ok_or_else(|| StorageServiceError::storage(format!("Failed to download {key}.")))?;

        Ok(futures::stream::iter([Ok::<_, std::io::Error>(body)]).boxed())
    }

    async fn delete_and_confirm(&self, key: &str) -> StorageServiceResult<()> {
        let mut state = self.state.lock();
        state.check(Operation::Delete, key)?;

        // Deleting an absent key succeeds, as on S3
        if let Some(objects) = state.buckets.get_mut(self.bucket()) {
            objects.remove(key);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::TryStreamExt;

    fn connection(bucket: &str) -> Connection {
        Connection {
            endpoint: Some("http://localhost:9000".into()),
            region: "us-east-1".into(),
            bucket_name: bucket.into(),
            base_path: None,
            access_key: "AKIA".into(),
            secret_key: "secret".into(),
        }
    }

    #[tokio::test]
    async fn put_then_get_returns_body() {
        let connector = MemoryConnector::new();
        let store = connector.connect(&connection("b")).unwrap();

        store
            .put("2024-06-01/a.png", Bytes::from_static(b"png"), Some("image/png"))
            .await
            .unwrap();

        let chunks: Vec<Bytes> = store.get("2024-06-01/a.png").await.unwrap().try_collect().await.unwrap();
        assert_eq!(chunks.concat(), b"png");
        assert_eq!(
            connector.object("b", "2024-06-01/a.png").unwrap().content_type.as_deref(),
            Some("image/png")
        );
    }

    #[tokio::test]
    async fn buckets_are_isolated() {
        let connector = MemoryConnector::new();
        let a = connector.connect(&connection("a")).unwrap();
        let b = connector.connect(&connection("b")).unwrap();

        a.put("k", Bytes::from_static(b"1"), None).await.unwrap();

        assert!(b.get("k").await.is_err());
        assert_eq!(b.list_by_prefix("", None).await.unwrap().images.len(), 0);
    }

    #[tokio::test]
    async fn listing_filters_by_prefix_and_builds_urls() {
        let connector = MemoryConnector::new();
        let store = connector.connect(&connection("b")).unwrap();
        for key in ["2024-06-01/a.jpeg", "2024-06-01/b.jpeg", "2024-06-02/c.jpeg"] {
            store.put(key, Bytes::from_static(b"x"), None).await.unwrap();
        }

        let page = store.list_by_prefix("2024-06-01", None).await.unwrap();
        let keys: Vec<_> = page.images.iter().map(|o| o.key.as_str()).collect();

        assert_eq!(keys, vec!["2024-06-01/a.jpeg", "2024-06-01/b.jpeg"]);
        assert_eq!(page.images[0].url, "https://b.localhost:9000/2024-06-01/a.jpeg");
        assert_eq!(page.images[0].size, 1);
        assert!(page.next_token.is_none());
    }

    #[tokio::test]
    async fn listing_pages_with_continuation_token() {
        let connector = MemoryConnector::new().with_page_size(2);
        let store = connector.connect(&connection("b")).unwrap();
        for key in ["p/1", "p/2", "p/3", "p/4", "p/5"] {
            store.put(key, Bytes::new(), None).await.unwrap();
        }

        let mut seen = Vec::new();
        let mut token: Option<String> = None;
        loop {
            let page = store.list_by_prefix("p/", token.as_deref()).await.unwrap();
            seen.extend(page.images.into_iter().map(|o| o.key));
            match page.next_token {
                Some(next) => token = Some(next),
                None => break,
            }
        }

        assert_eq!(seen, vec!["p/1", "p/2", "p/3", "p/4", "p/5"]);
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let connector = MemoryConnector::new();
        let store = connector.connect(&connection("b")).unwrap();
        store.put("k", Bytes::new(), None).await.unwrap();

        store.delete_and_confirm("k").await.unwrap();
        store.delete_and_confirm("k").await.unwrap();
        assert!(connector.keys("b").is_empty());
    }

    #[tokio::test]
    async fn scripted_failures_match_suffix() {
        let connector = MemoryConnector::new();
        let store = connector.connect(&connection("b")).unwrap();
        connector.fail_on(Operation::Put, ".webp");

        assert!(store.put("a.jpeg", Bytes::new(), None).await.is_ok());
        let err = store.put("a.webp", Bytes::new(), None).await.unwrap_err();
        assert_eq!(err.code(), crate::utils::StorageServiceErrorCode::StorageError);

        connector.clear_failures();
        assert!(store.put("a.webp", Bytes::new(), None).await.is_ok());
    }
}
