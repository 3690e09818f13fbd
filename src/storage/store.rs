//! Object store client seam.
//!
//! A [`Connector`] builds a fresh [`ObjectStore`] for every operation from the caller's
//! [`Connection`]; nothing is pooled across calls.

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;

use crate::core::{Connection, ListPage};
use crate::utils::StorageServiceResult;

/// Object body as a stream of chunks.
pub type ObjectStream = BoxStream<'static, std::io::Result<Bytes>>;

/// Client for one bucket of an S3-compatible store.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Writes `body` under `key`, overwriting any existing object.
    async fn put(&self, key: &str, body: Bytes, content_type: Option<&str>) -> StorageServiceResult<()>;

    /// Lists one page of objects whose key starts with `prefix`.
    ///
    /// `continuation` is the opaque token returned by the previous page.
    async fn list_by_prefix(
        &self,
        prefix: &str,
        continuation: Option<&str>,
    ) -> StorageServiceResult<ListPage>;

    /// Streams the body of `key`.
    async fn get(&self, key: &str) -> StorageServiceResult<ObjectStream>;

    /// Deletes `key` and waits until the store reports it absent.
    async fn delete_and_confirm(&self, key: &str) -> StorageServiceResult<()>;
}

/// Builds an [`ObjectStore`] for a connection.
pub trait Connector: Send + Sync {
    type Store: ObjectStore;

    fn connect(&self, connection: &Connection) -> StorageServiceResult<Self::Store>;
}
