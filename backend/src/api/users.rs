//! User API handlers
//!
//! `/users` accepts GET, POST, PATCH and DELETE with JSON bodies.

use crate::error::AppError;
use crate::services::{
    users::{CreateUserRequest, UpdateUserRequest},
    Confirmation, DeleteRequest,
};
use crate::state::AppState;
use crate::store::User;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::Json,
};

/// GET /users - List all users (password hashes omitted)
pub async fn list_users(State(state): State<AppState>) -> Result<Json<Vec<User>>, AppError> {
    let users = state.users.list().await?;
    Ok(Json(users))
}

/// POST /users - Create a new user
pub async fn create_user(
    State(state): State<AppState>,
    payload: Result<Json<CreateUserRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Confirmation>), AppError> {
    let Json(request) = payload?;
    let confirmation = state.users.create(request).await?;
    Ok((StatusCode::CREATED, Json(confirmation)))
}

/// PATCH /users - Update a user
pub async fn update_user(
    State(state): State<AppState>,
    payload: Result<Json<UpdateUserRequest>, JsonRejection>,
) -> Result<Json<Confirmation>, AppError> {
    let Json(request) = payload?;
    let confirmation = state.users.update(request).await?;
    Ok(Json(confirmation))
}

/// DELETE /users - Delete a user without assigned notes
pub async fn delete_user(
    State(state): State<AppState>,
    payload: Result<Json<DeleteRequest>, JsonRejection>,
) -> Result<Json<Confirmation>, AppError> {
    let Json(request) = payload?;
    let confirmation = state.users.delete(request).await?;
    Ok(Json(confirmation))
}
