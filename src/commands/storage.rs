//! Command handlers for image storage.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::{AppState, Connection, ListedObject, ProcessingOptions};
use crate::storage::{ImageStorage, ObjectStream};
use crate::utils::validation::require;
use crate::utils::{
    CommandError, CommandResult, validate_connection, validate_date_string,
    validate_processing_options,
};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadFileRequest {
    pub connection: Connection,
    pub image_processing: ProcessingOptions,
    /// Base name of the stored object, before sanitizing
    pub name: String,
    /// Raw bytes of the source image
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadFileResponse {
    pub path: String,
    pub webp_path: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListFilesRequest {
    pub connection: Connection,
    pub date_string: String,
    #[serde(default)]
    pub next_token: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListFilesResponse {
    pub files: Vec<ListedObject>,
    pub next_token: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadFileRequest {
    pub connection: Connection,
    pub key: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteFileRequest {
    pub connection: Connection,
    pub key: String,
}

/// Normalizes one image and uploads it, plus its WebP derivative when requested.
///
/// # Returns
/// The keys of the stored objects.
pub async fn upload_file(state: &AppState, request: UploadFileRequest) -> CommandResult<UploadFileResponse> {
    validate_connection(&request.connection)?;
    validate_processing_options(&request.image_processing)?;
    require("name", &request.name)?;

    debug!(
        "Received upload_file command for '{}' ({} bytes)",
        request.name,
        request.data.len()
    );

    let result = state
        .storage()
        .upload(
            &request.connection,
            &request.image_processing,
            &request.name,
            Bytes::from(request.data),
        )
        .await
        .map_err(|e| CommandError::storage_service("Failed to upload files", e))?;

    Ok(UploadFileResponse {
        path: result.path,
        webp_path: result.webp_path,
    })
}

/// Lists the images uploaded on one calendar day.
pub async fn list_files(state: &AppState, request: ListFilesRequest) -> CommandResult<ListFilesResponse> {
    validate_connection(&request.connection)?;
    validate_date_string(&request.date_string)?;

    let page = state
        .storage()
        .list(&request.connection, &request.date_string, request.next_token.as_deref())
        .await
        .map_err(|e| CommandError::storage_service("Failed to list files", e))?;

    Ok(ListFilesResponse {
        files: page.images,
        next_token: page.next_token,
    })
}

pub async fn download_file(state: &AppState, request: DownloadFileRequest) -> CommandResult<ObjectStream> {
    validate_connection(&request.connection)?;
    require("key", &request.key)?;

    state
        .storage()
        .download(&request.connection, &request.key)
        .await
        .map_err(|e| CommandError::storage_service("Failed to download file", e))
}

/// Deletes one object and waits until the store confirms it is gone.
///
/// # Returns
/// The deleted key.
pub async fn delete_file(state: &AppState, request: DeleteFileRequest) -> CommandResult<String> {
    validate_connection(&request.connection)?;
    require("key", &request.key)?;

    state
        .storage()
        .delete(&request.connection, &request.key)
        .await
        .map_err(|e| CommandError::storage_service("Failed to delete files", e))
}
