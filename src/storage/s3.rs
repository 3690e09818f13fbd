use std::time::Duration;

use async_trait::async_trait;
use aws_sdk_s3::config::{Credentials, Region};
use aws_sdk_s3::primitives::{ByteStream, DateTime as S3DateTime};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::StreamExt;
use tokio::time::Instant;
use tracing::debug;

use crate::core::{Connection, ListPage, ListedObject};
use crate::storage::store::{Connector, ObjectStore, ObjectStream};
use crate::utils::{StorageServiceError, StorageServiceResult, object_url};

/// Bounded wait applied after a delete until the object is reported absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeleteConfirmation {
    pub max_wait: Duration,
    pub poll_interval: Duration,
}

impl Default for DeleteConfirmation {
    fn default() -> Self {
        Self {
            max_wait: Duration::from_secs(60),
            poll_interval: Duration::from_secs(5),
        }
    }
}

/// Builds an S3 client per connection.
#[derive(Debug, Clone, Default)]
pub struct S3Connector {
    pub confirmation: DeleteConfirmation,
}

impl S3Connector {
    pub fn new(confirmation: DeleteConfirmation) -> Self {
        Self { confirmation }
    }
}

impl Connector for S3Connector {
    type Store = S3ObjectStore;

    fn connect(&self, connection: &Connection) -> StorageServiceResult<S3ObjectStore> {
        let cred = Credentials::new(
            connection.access_key.clone(),
            connection.secret_key.clone(),
            None,
            None,
            "image-uploader-connection",
        );

        let mut s3_config = aws_sdk_s3::config::Builder::new()
            .credentials_provider(cred)
            .region(Region::new(connection.region.clone()))
            .behavior_version_latest();

        if let Some(endpoint) = connection.endpoint.as_deref().filter(|e| !e.is_empty()) {
            s3_config = s3_config.endpoint_url(endpoint);
        }

        Ok(S3ObjectStore {
            s3_client: aws_sdk_s3::Client::from_conf(s3_config.build()),
            connection: connection.clone(),
            confirmation: self.confirmation,
        })
    }
}

/// Object store client backed by `aws-sdk-s3`.
pub struct S3ObjectStore {
    s3_client: aws_sdk_s3::Client,
    connection: Connection,
    confirmation: DeleteConfirmation,
}

impl S3ObjectStore {
    fn bucket(&self) -> &str {
        &self.connection.bucket_name
    }

    /// Asks `HeadObject` whether `key` is still visible.
    async fn object_exists(&self, key: &str) -> StorageServiceResult<bool> {
        let head = self
            .s3_client
            .head_object()
            .bucket(self.bucket())
            .key(key)
            .send()
            .await;

        match head {
            Ok(_) => Ok(true),
            Err(err) if err.as_service_error().is_some_and(|e| e.is_not_found()) => Ok(false),
            Err(err) => Err(StorageServiceError::storage(format!(
                "Failed to confirm deletion of {key}."
            ))
            .caused_by(err)),
        }
    }
}

/// Polls `exists` until it reports `key` gone or `confirmation.max_wait` runs out.
pub(crate) async fn wait_until_absent<F, Fut>(
    key: &str,
    confirmation: DeleteConfirmation,
    mut exists: F,
) -> StorageServiceResult<()>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = StorageServiceResult<bool>>,
{
    let deadline = Instant::now() + confirmation.max_wait;

    loop {
        if !exists().await? {
            debug!("confirmed {} is gone", key);
            return Ok(());
        }
        debug!("{} still visible, waiting", key);

        let now = Instant::now();
        if now >= deadline {
            return Err(StorageServiceError::storage(format!(
                "Timed out after {:?} waiting for {key} to be deleted.",
                confirmation.max_wait
            )));
        }
        tokio::time::sleep(confirmation.poll_interval.min(deadline - now)).await;
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn put(&self, key: &str, body: Bytes, content_type: Option<&str>) -> StorageServiceResult<()> {
        debug!(
            "uploading object: {} ({} bytes) to bucket: {}",
            key,
            body.len(),
            self.bucket()
        );

        self.s3_client
            .put_object()
            .bucket(self.bucket())
            .key(key)
            .body(ByteStream::from(body))
            .set_content_type(content_type.map(str::to_owned))
            .send()
            .await
            .map_err(|e| StorageServiceError::storage(format!("Failed to upload {key}.")).caused_by(e))?;

        Ok(())
    }

    async fn list_by_prefix(
        &self,
        prefix: &str,
        continuation: Option<&str>,
    ) -> StorageServiceResult<ListPage> {
        debug!("listing prefix: {} in bucket: {}", prefix, self.bucket());

        let output = self
            .s3_client
            .list_objects_v2()
            .bucket(self.bucket())
            .prefix(prefix)
            .set_continuation_token(continuation.map(str::to_owned))
            .send()
            .await
            .map_err(|e| StorageServiceError::storage("Failed to list Objects.").caused_by(e))?;

        let images = output
            .contents()
            .iter()
            .filter_map(|object| object.key().map(|key| (key, object)))
            .map(|(key, object)| {
                Ok(ListedObject {
                    key: key.to_owned(),
                    last_modified: object.last_modified().and_then(to_utc),
                    size: object.size().unwrap_or_default(),
                    url: object_url(&self.connection, key)?,
                })
            })
            .collect::<StorageServiceResult<Vec<_>>>()?;

        Ok(ListPage {
            images,
            next_token: output.next_continuation_token().map(str::to_owned),
        })
    }

    async fn get(&self, key: &str) -> StorageServiceResult<ObjectStream> {
        debug!("downloading object: {} from bucket: {}", key, self.bucket());

        let object = self
            .s3_client
            .get_object()
            .bucket(self.bucket())
            .key(key)
            .send()
            .await
            .map_err(|e| StorageServiceError::storage(format!("Failed to download {key}.")).caused_by(e))?;

        let stream = futures::stream::unfold(object.body, |mut body| async move {
            body.next()
                .await
                .map(|chunk| (chunk.map_err(std::io::Error::other), body))
        });

        Ok(stream.boxed())
    }

    async fn delete_and_confirm(&self, key: &str) -> StorageServiceResult<()> {
        debug!("deleting object: {} from bucket: {}", key, self.bucket());

        self.s3_client
            .delete_object()
            .bucket(self.bucket())
            .key(key)
            .send()
            .await
            .map_err(|e| StorageServiceError::storage(format!("Failed to delete {key}.")).caused_by(e))?;

        wait_until_absent(key, self.confirmation, || self.object_exists(key)).await
    }
}

fn to_utc(timestamp: &S3DateTime) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(timestamp.secs(), timestamp.subsec_nanos())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn connection(endpoint: Option<&str>) -> Connection {
        Connection {
            endpoint: endpoint.map(str::to_owned),
            region: "us-east-1".into(),
            bucket_name: "photos".into(),
            base_path: None,
            access_key: "AKIA".into(),
            secret_key: "secret".into(),
        }
    }

    #[test]
    fn default_confirmation_waits_a_minute() {
        let confirmation = DeleteConfirmation::default();
        assert_eq!(confirmation.max_wait, Duration::from_secs(60));
        assert!(confirmation.poll_interval < confirmation.max_wait);
    }

    #[tokio::test]
    async fn connects_with_and_without_custom_endpoint() {
        let connector = S3Connector::default();

        let client = connector.connect(&connection(None)).unwrap();
        assert_eq!(client.bucket(), "photos");

        let client = connector
            .connect(&connection(Some("http://localhost:9000")))
            .unwrap();
        assert_eq!(client.connection.endpoint.as_deref(), Some("http://localhost:9000"));
    }

    #[tokio::test(start_paused = true)]
    async fn wait_polls_until_object_is_gone() {
        let mut polls = 0;
        let start = Instant::now();

        let result = wait_until_absent("a.jpeg", DeleteConfirmation::default(), || {
            polls += 1;
            let visible = polls <= 2;
            async move { Ok(visible) }
        })
        .await;

        assert!(result.is_ok());
        assert_eq!(polls, 3);
        assert_eq!(start.elapsed(), Duration::from_secs(10));
    }

    #[tokio::test(start_paused = true)]
    async fn wait_times_out_as_storage_error() {
        let mut polls = 0;
        let start = Instant::now();

        let err = wait_until_absent("a.jpeg", DeleteConfirmation::default(), || {
            polls += 1;
            async { Ok(true) }
        })
        .await
        .unwrap_err();

        assert_eq!(err.code(), crate::utils::StorageServiceErrorCode::StorageError);
        assert!(err.message().contains("Timed out"));
        assert_eq!(start.elapsed(), Duration::from_secs(60));
        assert_eq!(polls, 13);
    }

    #[tokio::test(start_paused = true)]
    async fn wait_stops_on_failed_check() {
        let mut polls = 0;

        let err = wait_until_absent("a.jpeg", DeleteConfirmation::default(), || {
            polls += 1;
            async { Err(StorageServiceError::storage("head failed")) }
        })
        .await
        .unwrap_err();

        assert_eq!(err.message(), "head failed");
        assert_eq!(polls, 1);
    }

    #[test]
    fn converts_s3_timestamps() {
        let ts = S3DateTime::from_secs(1_717_200_000);
        let converted = to_utc(&ts).unwrap();
        assert_eq!(converted.timestamp(), 1_717_200_000);
    }
}
