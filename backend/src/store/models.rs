//! Store data models
//!
//! Defines the user and note documents as they are persisted and returned.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

/// Unique identifier for a user
pub type UserId = String;

/// Unique identifier for a note
pub type NoteId = String;

/// Generate a new store identifier
pub fn generate_id() -> String {
    Uuid::new_v4().to_string()
}

/// A user account
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct User {
    /// Unique identifier for the user
    pub id: UserId,
    /// Login name, unique across all users
    pub username: String,
    /// Argon2 PHC hash of the password, never serialized
    #[serde(skip_serializing)]
    pub password: String,
    /// Role names granted to the user (at least one)
    pub roles: Vec<String>,
    /// Whether the account is enabled
    pub active: bool,
}

impl User {
    /// Create a new active user with a fresh id
    pub fn new(username: String, password_hash: String, roles: Vec<String>) -> Self {
        Self {
            id: generate_id(),
            username,
            password: password_hash,
            roles,
            active: true,
        }
    }
}

/// A note assigned to a user
#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    /// Unique identifier for the note
    pub id: NoteId,
    /// Human-facing sequential number, starting at 500
    pub ticket: i64,
    /// ID of the owning user
    #[sqlx(rename = "user_id")]
    pub user: UserId,
    /// Title, unique across all notes
    pub title: String,
    /// Body of the note
    pub text: String,
    /// Whether the note is done
    pub completed: bool,
    /// When the note was created
    pub created_at: DateTime<Utc>,
    /// When the note was last written
    pub updated_at: DateTime<Utc>,
}

/// Fields supplied when inserting a note; the store assigns the rest
#[derive(Debug, Clone)]
pub struct NewNote {
    /// ID of the owning user
    pub user: UserId,
    /// Title of the note
    pub title: String,
    /// Body of the note
    pub text: String,
}
