//! User service
//!
//! Create, list, update and delete users. Passwords are hashed before they
//! reach the store, and a user cannot be deleted while notes reference it.

use super::{non_blank, Confirmation, DeleteRequest, PasswordHasher};
use crate::error::AppError;
use crate::store::{Db, User};
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

/// Create user request
#[derive(Debug, Default, Deserialize)]
pub struct CreateUserRequest {
    /// Login name for the new user
    pub username: Option<String>,
    /// Plaintext password, hashed before storage
    pub password: Option<String>,
    /// Roles granted to the user
    pub roles: Option<Vec<String>>,
}

/// Update user request
#[derive(Debug, Default, Deserialize)]
pub struct UpdateUserRequest {
    /// ID of the user to update
    pub id: Option<String>,
    /// New username
    pub username: Option<String>,
    /// New password; the stored hash is kept when absent or empty
    pub password: Option<String>,
    /// New roles
    pub roles: Option<Vec<String>>,
    /// New active flag
    pub active: Option<bool>,
}

/// Keep a role list only if it is non-empty and has no blank entries
fn valid_roles(roles: Option<Vec<String>>) -> Option<Vec<String>> {
    roles.filter(|roles| !roles.is_empty() && roles.iter().all(|r| !r.trim().is_empty()))
}

/// User operations over the store
#[derive(Clone)]
pub struct UserService {
    db: Db,
    hasher: Arc<dyn PasswordHasher>,
}

impl UserService {
    /// Create a user service backed by `db`, hashing passwords with `hasher`
    pub fn new(db: Db, hasher: Arc<dyn PasswordHasher>) -> Self {
        Self { db, hasher }
    }

    /// Hash on the blocking pool; Argon2 is deliberately slow
    async fn hash_password(&self, password: String) -> Result<String, AppError> {
        let hasher = Arc::clone(&self.hasher);
        tokio::task::spawn_blocking(move || hasher.hash(&password))
            .await
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Password hashing task failed: {}", e)))?
    }

    /// List all users; password hashes are never serialized
    ///
    /// Fails with `NotFound` when there are no users.
    pub async fn list(&self) -> Result<Vec<User>, AppError> {
        let users = self.db.list_users().await?;
        if users.is_empty() {
            return Err(AppError::NotFound("No users found".to_string()));
        }
        Ok(users)
    }

    /// Create an active user with a hashed password
    pub async fn create(&self, request: CreateUserRequest) -> Result<Confirmation, AppError> {
        let (Some(username), Some(password), Some(roles)) = (
            non_blank(request.username),
            request.password.filter(|p| !p.is_empty()),
            valid_roles(request.roles),
        ) else {
            return Err(AppError::InvalidInput(
                "Username, password and roles fields are required!".to_string(),
            ));
        };

        if self.db.find_user_by_username(&username).await?.is_some() {
            return Err(AppError::Conflict("Duplicate username".to_string()));
        }

        let password_hash = self.hash_password(password).await?;
        let user = User::new(username, password_hash, roles);
        self.db.insert_user(&user).await?;
        info!(user_id = %user.id, username = %user.username, "User created");

        Ok(Confirmation::new(
            format!("New user {} created", user.username),
            user.id,
        ))
    }

    /// Replace username, roles and active flag; re-hash the password only if
    /// a new one was supplied
    pub async fn update(&self, request: UpdateUserRequest) -> Result<Confirmation, AppError> {
        let (Some(id), Some(username), Some(roles), Some(active)) = (
            non_blank(request.id),
            non_blank(request.username),
            valid_roles(request.roles),
            request.active,
        ) else {
            return Err(AppError::InvalidInput(
                "Id, username, roles and active fields are required!".to_string(),
            ));
        };

        let mut user = self
            .db
            .find_user(&id)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

        if let Some(duplicate) = self.db.find_user_by_username(&username).await? {
            if duplicate.id != id {
                return Err(AppError::Conflict("Duplicate username".to_string()));
            }
        }

        user.username = username;
        user.roles = roles;
        user.active = active;

        if let Some(password) = request.password.filter(|p| !p.is_empty()) {
            user.password = self.hash_password(password).await?;
        }

        self.db.update_user(&user).await?;
        info!(user_id = %user.id, "User updated");

        Ok(Confirmation::new(
            format!("{} updated successfully", user.username),
            user.id,
        ))
    }

    /// Delete a user that has no assigned notes
    ///
    /// The assigned-notes check runs before the existence check.
    pub async fn delete(&self, request: DeleteRequest) -> Result<Confirmation, AppError> {
        let id = non_blank(request.id)
            .ok_or_else(|| AppError::InvalidInput("Id is required".to_string()))?;

        if self.db.note_exists_for_user(&id).await? {
            return Err(AppError::AssignedNotes(
                "User has assigned notes".to_string(),
            ));
        }

        let user = self
            .db
            .find_user(&id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User with id {} not found", id)))?;

        if !self.db.delete_user(&user.id).await? {
            return Err(AppError::NotFound(format!("User with id {} not found", id)));
        }
        info!(user_id = %user.id, "User deleted");

        Ok(Confirmation::new(
            format!("Username {} with id {} deleted", user.username, user.id),
            user.id,
        ))
    }
}
