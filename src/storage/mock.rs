use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;

use crate::core::{Connection, ListPage, ProcessingOptions, UploadResult};
use crate::storage::service::ImageStorage;
use crate::storage::store::ObjectStream;
use crate::utils::{StorageServiceError, StorageServiceResult};

/// Scripted result every call of a [`MockStorageService`] produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockOutcome {
    Success,
    Error,
}

/// Storage service stand-in that never touches a codec or a network.
#[derive(Debug, Clone, Copy)]
pub struct MockStorageService {
    outcome: MockOutcome,
}

impl MockStorageService {
    pub fn new(outcome: MockOutcome) -> Self {
        Self { outcome }
    }

    fn check(&self) -> StorageServiceResult<()> {
        match self.outcome {
            MockOutcome::Success => Ok(()),
            MockOutcome::Error => Err(StorageServiceError::unexpected("Mock storage service error")),
        }
    }
}

#[async_trait]
impl ImageStorage for MockStorageService {
    async fn upload(
        &self,
        _connection: &Connection,
        _options: &ProcessingOptions,
        _name: &str,
        _input: Bytes,
    ) -> StorageServiceResult<UploadResult> {
        self.check()?;
        Ok(UploadResult {
            path: "uploaded.jpg".into(),
            webp_path: Some("uploaded.webp".into()),
        })
    }

    async fn list(
        &self,
        _connection: &Connection,
        _date_string: &str,
        _next_token: Option<&str>,
    ) -> StorageServiceResult<ListPage> {
        self.check()?;
        Ok(ListPage {
            images: Vec::new(),
            next_token: Some("token".into()),
        })
    }

    async fn download(&self, _connection: &Connection, _key: &str) -> StorageServiceResult<ObjectStream> {
        self.check()?;
        Ok(futures::stream::empty().boxed())
    }

    async fn delete(&self, _connection: &Connection, key: &str) -> StorageServiceResult<String> {
        self.check()?;
        Ok(key.to_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::StorageServiceErrorCode;

    fn connection() -> Connection {
        Connection {
            endpoint: None,
            region: "us-east-1".into(),
            bucket_name: "b".into(),
            base_path: None,
            access_key: "a".into(),
            secret_key: "s".into(),
        }
    }

    #[tokio::test]
    async fn success_returns_canned_values() {
        let mock = MockStorageService::new(MockOutcome::Success);
        let conn = connection();

        let uploaded = mock
            .upload(&conn, &ProcessingOptions::default(), "x", Bytes::new())
            .await
            .unwrap();
        assert_eq!(uploaded.path, "uploaded.jpg");
        assert_eq!(uploaded.webp_path.as_deref(), Some("uploaded.webp"));

        let page = mock.list(&conn, "2024-06-01", None).await.unwrap();
        assert!(page.images.is_empty());
        assert_eq!(page.next_token.as_deref(), Some("token"));

        let chunks: Vec<_> = mock.download(&conn, "k").await.unwrap().collect().await;
        assert!(chunks.is_empty());

        assert_eq!(mock.delete(&conn, "some/key").await.unwrap(), "some/key");
    }

    #[tokio::test]
    async fn error_fails_every_operation_as_unexpected() {
        let mock = MockStorageService::new(MockOutcome::Error);
        let conn = connection();

        let upload = mock
            .upload(&conn, &ProcessingOptions::default(), "x", Bytes::new())
            .await
            .unwrap_err();
        assert_eq!(upload.code(), StorageServiceErrorCode::UnexpectedError);
        assert!(mock.list(&conn, "2024-06-01", None).await.is_err());
        assert!(mock.download(&conn, "k").await.is_err());
        assert_eq!(
            mock.delete(&conn, "k").await.unwrap_err().code(),
            StorageServiceErrorCode::UnexpectedError
        );
    }
}
