//! Application state shared by the command handlers.

use std::sync::Arc;

use tracing::debug;

use crate::storage::{ImageStorage, S3Connector, StorageService};

/// Holds the storage capability the handlers delegate to.
///
/// Cheap to clone; every clone shares the same service.
#[derive(Clone)]
pub struct AppState {
    storage: Arc<dyn ImageStorage>,
}

impl Default for AppState {
    /// State backed by the S3 storage service.
    fn default() -> Self {
        debug!("Using S3 storage service");
        Self::new(StorageService::<S3Connector>::default())
    }
}

impl AppState {
    pub fn new(storage: impl ImageStorage + 'static) -> Self {
        Self {
            storage: Arc::new(storage),
        }
    }

    pub fn storage(&self) -> &dyn ImageStorage {
        self.storage.as_ref()
    }
}
