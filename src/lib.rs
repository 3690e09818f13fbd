// Module declarations in dependency order
pub mod utils;
pub mod core;
pub mod processing;
pub mod storage;
pub mod commands;

// Public exports for external consumers
pub use core::{AppState, Connection, ListPage, ListedObject, ProcessingOptions, Settings, UploadResult};
pub use storage::{ImageStorage, StorageService};
pub use utils::{CommandError, CommandResult, StorageServiceError, StorageServiceResult};
pub use commands::*;

// The command-line entry point lives in main.rs and only goes through this public API.
