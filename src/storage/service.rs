//! Storage service: upload, list, download and delete images.
//!
//! [`ImageStorage`] is the capability interface the command handlers depend on. It is
//! implemented by [`StorageService`], which drives the normalizer, key derivation and an
//! object store, and by [`MockStorageService`](super::MockStorageService) for tests.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{Local, NaiveDate};
use futures::future::join_all;
use tracing::{debug, info, warn};

use crate::core::{Connection, ListPage, ProcessingOptions, UploadResult};
use crate::processing::normalize_image;
use crate::storage::s3::S3Connector;
use crate::storage::store::{Connector, ObjectStore, ObjectStream};
use crate::utils::{StorageServiceResult, derive_key, list_prefix};

/// Supplies the calendar date used in object keys.
pub type Clock = Arc<dyn Fn() -> NaiveDate + Send + Sync>;

/// Upload, list, download and delete images in a remote bucket.
#[async_trait]
pub trait ImageStorage: Send + Sync {
    /// Normalizes `input` and stores it (plus the optional WebP derivative) under `name`.
    async fn upload(
        &self,
        connection: &Connection,
        options: &ProcessingOptions,
        name: &str,
        input: Bytes,
    ) -> StorageServiceResult<UploadResult>;

    /// Lists one page of objects uploaded on `date_string` (`YYYY-MM-DD`).
    async fn list(
        &self,
        connection: &Connection,
        date_string: &str,
        next_token: Option<&str>,
    ) -> StorageServiceResult<ListPage>;

    async fn download(&self, connection: &Connection, key: &str) -> StorageServiceResult<ObjectStream>;

    /// Deletes `key`, waits for the store to confirm, and echoes the key back.
    async fn delete(&self, connection: &Connection, key: &str) -> StorageServiceResult<String>;
}

/// Storage service backed by a real object store.
///
/// Holds no per-connection state; every call builds its own client.
pub struct StorageService<C = S3Connector> {
    connector: C,
    clock: Clock,
}

impl Default for StorageService<S3Connector> {
    fn default() -> Self {
        Self::new(S3Connector::default())
    }
}

impl<C: Connector> StorageService<C> {
    pub fn new(connector: C) -> Self {
        Self {
            connector,
            clock: Arc::new(|| Local::now().date_naive()),
        }
    }

    /// Replaces the local-date clock, e.g. to pin the date in tests.
    pub fn with_clock(mut self, clock: impl Fn() -> NaiveDate + Send + Sync + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    pub fn connector(&self) -> &C {
        &self.connector
    }
}

struct PendingUpload {
    key: String,
    body: Bytes,
    content_type: Option<String>,
}

#[async_trait]
impl<C: Connector> ImageStorage for StorageService<C> {
    async fn upload(
        &self,
        connection: &Connection,
        options: &ProcessingOptions,
        name: &str,
        input: Bytes,
    ) -> StorageServiceResult<UploadResult> {
        let normalized = normalize_image(input, options.clone()).await?;

        let today = (self.clock)();
        let base_path = connection.base_path.as_deref();
        let uploads: Vec<PendingUpload> = normalized
            .into_outputs()
            .map(|image| PendingUpload {
                key: derive_key(name, image.format.name(), base_path, today),
                content_type: image.format.mime_type(),
                body: image.bytes,
            })
            .collect();

        let store = self.connector.connect(connection)?;

        // Both puts are in flight together; a failure does not cancel the other
        let results = join_all(uploads.iter().map(|upload| {
            store.put(&upload.key, upload.body.clone(), upload.content_type.as_deref())
        }))
        .await;

        let mut outcome = Ok(());
        for (upload, result) in uploads.iter().zip(results) {
            if let Err(err) = result {
                warn!("Upload of {} failed: {}", upload.key, err);
                if outcome.is_ok() {
                    outcome = Err(err);
                }
            }
        }

        if outcome.is_err() && uploads.len() > 1 {
            // No compensating delete; a stored primary stays behind
            warn!(
                "Upload of {} incomplete; objects that were stored are left in place",
                uploads[0].key
            );
        }
        outcome?;

        let mut keys = uploads.into_iter().map(|upload| upload.key);
        let path = keys.next().unwrap_or_default();
        let webp_path = keys.next();

        match &webp_path {
            Some(webp_path) => info!("Uploaded {} and {}", path, webp_path),
            None => info!("Uploaded {}", path),
        }
        Ok(UploadResult { path, webp_path })
    }

    async fn list(
        &self,
        connection: &Connection,
        date_string: &str,
        next_token: Option<&str>,
    ) -> StorageServiceResult<ListPage> {
        let prefix = list_prefix(connection.base_path.as_deref(), date_string);
        let store = self.connector.connect(connection)?;

        let page = store.list_by_prefix(&prefix, next_token).await?;
        debug!(
            "Listed {} objects under {} (more: {})",
            page.images.len(),
            prefix,
            page.next_token.is_some()
        );
        Ok(page)
    }

    async fn download(&self, connection: &Connection, key: &str) -> StorageServiceResult<ObjectStream> {
        self.connector.connect(connection)?.get(key).await
    }

    async fn delete(&self, connection: &Connection, key: &str) -> StorageServiceResult<String> {
        self.connector.connect(connection)?.delete_and_confirm(key).await?;
        info!("Deleted {}", key);
        Ok(key.to_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processing::encode::encode_jpeg;
    use crate::storage::memory::{MemoryConnector, Operation};
    use crate::utils::StorageServiceErrorCode;
    use futures::TryStreamExt;
    use image::DynamicImage;

    fn connection() -> Connection {
        Connection {
            endpoint: None,
            region: "eu-west-1".into(),
            bucket_name: "photos".into(),
            base_path: Some("uploads".into()),
            access_key: "AKIA".into(),
            secret_key: "secret".into(),
        }
    }

    fn options(webp: bool) -> ProcessingOptions {
        ProcessingOptions {
            max_width: 100,
            max_height: 100,
            quality: 80,
            webp,
        }
    }

    fn service() -> StorageService<MemoryConnector> {
        StorageService::new(MemoryConnector::new())
            .with_clock(|| NaiveDate::from_ymd_opt(2024, 6, 1).unwrap())
    }

    fn jpeg(w: u32, h: u32) -> Bytes {
        Bytes::from(encode_jpeg(&DynamicImage::new_rgb8(w, h), 90).unwrap())
    }

    #[tokio::test]
    async fn upload_stores_primary_and_webp() {
        let service = service();
        let result = service
            .upload(&connection(), &options(true), "photo", jpeg(200, 300))
            .await
            .unwrap();

        assert_eq!(result.path, "uploads/2024-06-01/photo.jpeg");
        assert_eq!(result.webp_path.as_deref(), Some("uploads/2024-06-01/photo.webp"));

        let stored = service.connector().object("photos", &result.path).unwrap();
        assert_eq!(stored.content_type.as_deref(), Some("image/jpeg"));
        let webp = service.connector().object("photos", "uploads/2024-06-01/photo.webp").unwrap();
        assert_eq!(webp.content_type.as_deref(), Some("image/webp"));
    }

    #[tokio::test]
    async fn upload_without_webp_stores_one_object() {
        let service = service();
        let result = service
            .upload(&connection(), &options(false), "photo", jpeg(20, 20))
            .await
            .unwrap();

        assert_eq!(result.webp_path, None);
        assert_eq!(service.connector().keys("photos"), vec![result.path]);
    }

    #[tokio::test]
    async fn reupload_same_day_overwrites() {
        let service = service();
        let first = service
            .upload(&connection(), &options(false), "photo", jpeg(20, 20))
            .await
            .unwrap();
        let second = service
            .upload(&connection(), &options(false), "photo", jpeg(40, 10))
            .await
            .unwrap();

        assert_eq!(first.path, second.path);
        assert_eq!(service.connector().keys("photos").len(), 1);
    }

    #[tokio::test]
    async fn conversion_failure_uploads_nothing() {
        let service = service();
        let err = service
            .upload(&connection(), &options(true), "broken", Bytes::from_static(b"nope"))
            .await
            .unwrap_err();

        assert_eq!(err.code(), StorageServiceErrorCode::ImageConversionError);
        assert!(service.connector().keys("photos").is_empty());
    }

    #[tokio::test]
    async fn primary_put_failure_fails_upload() {
        let service = service();
        service.connector().fail_on(Operation::Put, ".jpeg");

        let err = service
            .upload(&connection(), &options(false), "photo", jpeg(20, 20))
            .await
            .unwrap_err();
        assert_eq!(err.code(), StorageServiceErrorCode::StorageError);
    }

    #[tokio::test]
    async fn secondary_put_failure_fails_upload_and_leaves_primary() {
        let service = service();
        service.connector().fail_on(Operation::Put, ".webp");

        let err = service
            .upload(&connection(), &options(true), "photo", jpeg(20, 20))
            .await
            .unwrap_err();

        assert_eq!(err.code(), StorageServiceErrorCode::StorageError);
        assert_eq!(
            service.connector().keys("photos"),
            vec!["uploads/2024-06-01/photo.jpeg".to_owned()]
        );
    }

    /// Store whose puts only complete once two of them are waiting together.
    #[derive(Clone)]
    struct RendezvousConnector {
        barrier: Arc<tokio::sync::Barrier>,
    }

    struct RendezvousStore {
        barrier: Arc<tokio::sync::Barrier>,
    }

    impl Connector for RendezvousConnector {
        type Store = RendezvousStore;

        fn connect(&self, _connection: &Connection) -> StorageServiceResult<RendezvousStore> {
            Ok(RendezvousStore {
                barrier: Arc::clone(&self.barrier),
            })
        }
    }

    #[async_trait]
    impl ObjectStore for RendezvousStore {
        async fn put(&self, _key: &str, _body: Bytes, _content_type: Option<&str>) -> StorageServiceResult<()> {
            self.barrier.wait().await;
            Ok(())
        }

        async fn list_by_prefix(&self, _prefix: &str, _continuation: Option<&str>) -> StorageServiceResult<ListPage> {
            Ok(ListPage::default())
        }

        async fn get(&self, key: &str) -> StorageServiceResult<ObjectStream> {
            Err(crate::utils::StorageServiceError::storage(format!("No object {key}")))
        }

        async fn delete_and_confirm(&self, _key: &str) -> StorageServiceResult<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn primary_and_webp_puts_run_concurrently() {
        let service = StorageService::new(RendezvousConnector {
            barrier: Arc::new(tokio::sync::Barrier::new(2)),
        })
        .with_clock(|| NaiveDate::from_ymd_opt(2024, 6, 1).unwrap());

        let connection = connection();
        let options = options(true);
        let upload = service.upload(&connection, &options, "photo", jpeg(20, 20));
        let result = tokio::time::timeout(std::time::Duration::from_secs(10), upload)
            .await
            .expect("puts did not overlap")
            .unwrap();

        assert_eq!(result.path, "uploads/2024-06-01/photo.jpeg");
        assert_eq!(result.webp_path.as_deref(), Some("uploads/2024-06-01/photo.webp"));
    }

    #[tokio::test]
    async fn list_uses_base_path_and_date() {
        let service = service();
        service
            .upload(&connection(), &options(false), "photo", jpeg(20, 20))
            .await
            .unwrap();

        let page = service.list(&connection(), "2024-06-01", None).await.unwrap();
        assert_eq!(page.images.len(), 1);
        assert_eq!(
            page.images[0].url,
            "https://photos.s3.eu-west-1.amazonaws.com/uploads/2024-06-01/photo.jpeg"
        );

        let other_day = service.list(&connection(), "2024-06-02", None).await.unwrap();
        assert!(other_day.images.is_empty());
    }

    #[tokio::test]
    async fn download_streams_stored_bytes() {
        let service = service();
        let result = service
            .upload(&connection(), &options(false), "photo", jpeg(20, 20))
            .await
            .unwrap();

        let chunks: Vec<Bytes> = service
            .download(&connection(), &result.path)
            .await
            .unwrap()
            .try_collect()
            .await
            .unwrap();
        let body = chunks.concat();
        assert_eq!(&body[0..2], &[0xFF, 0xD8]);
    }

    #[tokio::test]
    async fn download_of_missing_key_is_storage_error() {
        let err = match service().download(&connection(), "uploads/none.jpeg").await {
            Err(err) => err,
            Ok(_) => panic!("expected an error"),
        };
        assert_eq!(err.code(), StorageServiceErrorCode::StorageError);
    }

    #[tokio::test]
    async fn delete_echoes_key_and_is_repeatable() {
        let service = service();
        let result = service
            .upload(&connection(), &options(false), "photo", jpeg(20, 20))
            .await
            .unwrap();

        assert_eq!(service.delete(&connection(), &result.path).await.unwrap(), result.path);
        assert_eq!(service.delete(&connection(), &result.path).await.unwrap(), result.path);
        assert!(service.list(&connection(), "2024-06-01", None).await.unwrap().images.is_empty());
    }

    #[tokio::test]
    async fn delete_failure_is_storage_error() {
        let service = service();
        service.connector().fail_on(Operation::Delete, "photo.jpeg");

        let err = service
            .delete(&connection(), "uploads/2024-06-01/photo.jpeg")
            .await
            .unwrap_err();
        assert_eq!(err.code(), StorageServiceErrorCode::StorageError);
    }
}
