//! Trash endpoints

use api_types::{
    operation::OperationView,
    trash::{TrashEmptied, TrashEntryView, TrashListResponse},
};
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use chrono::Utc;
use engine::TrashEntry;
use uuid::Uuid;

use crate::{ServerError, operations::operation_view, server::ServerState};

fn entry_view(entry: &TrashEntry) -> TrashEntryView {
    TrashEntryView {
        operation: operation_view(&entry.operation),
        expires_at: entry.expires_at,
    }
}

/// Move an operation to the trash
pub async fn trash_operation(
    Path((account, id)): Path<(String, Uuid)>,
    State(state): State<ServerState>,
) -> Result<Json<TrashEntryView>, ServerError> {
    let entry = state
        .engine
        .trash_operation(&account, id, Utc::now())
        .await?;
    Ok(Json(entry_view(&entry)))
}

/// Trashed operations, most recently deleted first
pub async fn list(
    Path(account): Path<String>,
    State(state): State<ServerState>,
) -> Result<Json<TrashListResponse>, ServerError> {
    let entries = state.engine.trash(&account).await?;
    Ok(Json(TrashListResponse {
        entries: entries.iter().map(entry_view).collect(),
    }))
}

/// Bring an operation back from the trash
pub async fn restore(
    Path((account, id)): Path<(String, Uuid)>,
    State(state): State<ServerState>,
) -> Result<Json<OperationView>, ServerError> {
    let operation = state.engine.restore_operation(&account, id).await?;
    Ok(Json(operation_view(&operation)))
}

/// Permanently delete one trashed operation
pub async fn delete(
    Path((account, id)): Path<(String, Uuid)>,
    State(state): State<ServerState>,
) -> Result<StatusCode, ServerError> {
    state.engine.delete_from_trash(&account, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Permanently delete the whole trash
pub async fn empty(
    Path(account): Path<String>,
    State(state): State<ServerState>,
) -> Result<Json<TrashEmptied>, ServerError> {
    let purged = state.engine.empty_trash(&account).await?;
    Ok(Json(TrashEmptied { purged }))
}
