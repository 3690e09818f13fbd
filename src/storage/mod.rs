//! Remote object storage for normalized images.
//!
//! # Architecture
//!
//! - [`store`]: The [`ObjectStore`] client seam and the [`Connector`] that builds one per call.
//! - [`s3`]: `aws-sdk-s3` backed store with a bounded delete confirmation.
//! - [`memory`]: Shared in-memory buckets with scripted failures.
//! - [`service`]: [`StorageService`] orchestration behind the [`ImageStorage`] capability.
//! - [`mock`]: Canned success/error responses for handler tests.

pub mod memory;
pub mod mock;
pub mod s3;
pub mod service;
pub mod store;

pub use memory::{MemoryConnector, MemoryObjectStore, Operation};
pub use mock::{MockOutcome, MockStorageService};
pub use s3::{DeleteConfirmation, S3Connector, S3ObjectStore};
pub use service::{Clock, ImageStorage, StorageService};
pub use store::{Connector, ObjectStore, ObjectStream};
