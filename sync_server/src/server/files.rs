use anyhow::Context as _;
use axum::{
    Json,
    extract::{Path, State},
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Bearer},
};
use log::info;
use serde::{Deserialize, Serialize};

use super::auth::auth;
use crate::{
    app_state::AppState,
    errors::{SyncServerError, server_error},
};

#[derive(Deserialize)]
pub struct FilePathParams {
    project_id: String,
    file_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileResponse {
    pub project_id: String,
    pub file_id: String,
    pub content: String,
    pub revision: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReplaceFileRequest {
    pub content: String,
}

#[axum::debug_handler]
pub async fn fetch_file(
    TypedHeader(auth_header): TypedHeader<Authorization<Bearer>>,
    Path(FilePathParams {
        project_id,
        file_id,
    }): Path<FilePathParams>,
    State(state): State<AppState>,
) -> Result<Json<FileResponse>, SyncServerError> {
    auth(&state, auth_header.token())?;

    let document = state
        .rooms
        .document(&project_id, &file_id)
        .await
        .context("Failed to load file")
        .map_err(server_error)?;

    Ok(Json(FileResponse {
        project_id,
        file_id,
        content: document.content,
        revision: document.revision,
    }))
}

/// Replaces a file from outside of the editing sessions, everyone editing it
/// receives a `file_change`.
#[axum::debug_handler]
pub async fn replace_file(
    TypedHeader(auth_header): TypedHeader<Authorization<Bearer>>,
    Path(FilePathParams {
        project_id,
        file_id,
    }): Path<FilePathParams>,
    State(state): State<AppState>,
    Json(request): Json<ReplaceFileRequest>,
) -> Result<Json<FileResponse>, SyncServerError> {
    let user = auth(&state, auth_header.token())?;

    let revision = state
        .rooms
        .replace_content(&project_id, &file_id, request.content.clone())
        .await
        .context("Failed to replace file")
        .map_err(server_error)?;

    info!(
        "User '{}' replaced file '{file_id}' of project '{project_id}'",
        user.name
    );

    Ok(Json(FileResponse {
        project_id,
        file_id,
        content: request.content,
        revision,
    }))
}
