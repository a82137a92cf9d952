//! Note API handlers
//!
//! `/notes` accepts GET, POST, PATCH and DELETE with JSON bodies.

use crate::error::AppError;
use crate::services::{
    notes::{CreateNoteRequest, NoteWithUsername, UpdateNoteRequest},
    Confirmation, DeleteRequest,
};
use crate::state::AppState;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::Json,
};

/// GET /notes - List all notes with their owner's username
pub async fn list_notes(
    State(state): State<AppState>,
) -> Result<Json<Vec<NoteWithUsername>>, AppError> {
    let notes = state.notes.list().await?;
    Ok(Json(notes))
}

/// POST /notes - Create a new note
pub async fn create_note(
    State(state): State<AppState>,
    payload: Result<Json<CreateNoteRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Confirmation>), AppError> {
    let Json(request) = payload?;
    let confirmation = state.notes.create(request).await?;
    Ok((StatusCode::CREATED, Json(confirmation)))
}

/// PATCH /notes - Update a note
pub async fn update_note(
    State(state): State<AppState>,
    payload: Result<Json<UpdateNoteRequest>, JsonRejection>,
) -> Result<Json<Confirmation>, AppError> {
    let Json(request) = payload?;
    let confirmation = state.notes.update(request).await?;
    Ok(Json(confirmation))
}

/// DELETE /notes - Delete a note
pub async fn delete_note(
    State(state): State<AppState>,
    payload: Result<Json<DeleteRequest>, JsonRejection>,
) -> Result<Json<Confirmation>, AppError> {
    let Json(request) = payload?;
    let confirmation = state.notes.delete(request).await?;
    Ok(Json(confirmation))
}
