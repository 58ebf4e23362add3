//! Data directory backup and restore handlers

use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Multipart, State},
    http::{header, Response, StatusCode},
    Json,
};
use serde::Serialize;
use tracing::info;

use minister_core::backup::{backup_filename, create_archive, restore_archive};
use minister_core::Error;

use crate::{AppError, AppState, MAX_UPLOAD_SIZE};

/// GET /api/backup - Download the data directory as a zip
pub async fn download_backup(
    State(state): State<Arc<AppState>>,
) -> Result<Response<Body>, AppError> {
    let archive = {
        let _guard = state.store.lock();
        create_archive(state.store.data_dir())
    };
    let archive = match archive {
        Ok(bytes) => bytes,
        Err(Error::NotFound(msg)) => return Err(AppError::not_found(&msg)),
        Err(e) => return Err(e.into()),
    };

    let filename = backup_filename();
    info!("Created backup {} ({} bytes)", filename, archive.len());

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/zip")
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", filename),
        )
        .body(Body::from(archive))
        .map_err(|e| AppError::internal(&e.to_string()))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RestoreResponse {
    pub success: bool,
    pub message: String,
    pub files_restored: usize,
}

/// POST /api/backup/restore - Replace the data directory from an uploaded backup
///
/// Expects multipart form with:
/// - file: zip produced by `GET /api/backup` (required, max 10MB)
pub async fn restore_backup(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<RestoreResponse>, AppError> {
    let mut file_data: Option<Vec<u8>> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::bad_request(&format!("Failed to read form field: {}", e)))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let bytes = field
            .bytes()
            .await
            .map_err(|_| AppError::bad_request("Failed to read file data"))?;

        if bytes.len() > MAX_UPLOAD_SIZE {
            return Err(AppError::bad_request(&format!(
                "File too large. Maximum size is {} MB",
                MAX_UPLOAD_SIZE / 1024 / 1024
            )));
        }
        file_data = Some(bytes.to_vec());
    }

    let file_data = file_data
        .filter(|data| !data.is_empty())
        .ok_or_else(|| AppError::bad_request("No file uploaded"))?;

    let restored = {
        let _guard = state.store.lock();
        restore_archive(state.store.root(), &file_data)
    };
    let files_restored = match restored {
        Ok(count) => count,
        Err(Error::Backup(msg)) => return Err(AppError::bad_request(&msg)),
        Err(e) => return Err(e.into()),
    };

    info!("Restored {} files from backup", files_restored);
    Ok(Json(RestoreResponse {
        success: true,
        message: "Data restored successfully".to_string(),
        files_restored,
    }))
}
