//! Service layer for business logic
//!
//! Validation, cross-collection checks and response assembly for notes and
//! users live here, separate from the HTTP handlers.

pub mod notes;
pub mod password;
pub mod users;

pub use notes::{CreateNoteRequest, NoteService, NoteWithUsername, UpdateNoteRequest};
pub use password::{Argon2Hasher, PasswordHasher};
pub use users::{CreateUserRequest, UpdateUserRequest, UserService};

use serde::{Deserialize, Serialize};

/// Confirmation returned by successful write operations
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Confirmation {
    /// Human-readable message
    pub message: String,
    /// ID of the affected document
    pub id: String,
}

impl Confirmation {
    fn new(message: String, id: String) -> Self {
        Self { message, id }
    }
}

/// Delete request body shared by both collections
#[derive(Debug, Default, Deserialize)]
pub struct DeleteRequest {
    /// ID of the document to delete
    pub id: Option<String>,
}

/// Keep a string field only if it is present and not blank
fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::PasswordHasher;
    use crate::error::AppError;
    use crate::store::Db;
    use tempfile::TempDir;

    /// Cheap reversible hasher so service tests don't pay for Argon2
    pub struct PlainHasher;

    impl PasswordHasher for PlainHasher {
        fn hash(&self, password: &str) -> Result<String, AppError> {
            Ok(format!("plain${}", password))
        }

        fn verify(&self, password: &str, hash: &str) -> Result<bool, AppError> {
            Ok(hash == format!("plain${}", password))
        }
    }

    pub async fn test_db() -> (TempDir, Db) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("notes.db");
        let db = Db::new(path.to_str().unwrap()).await.unwrap();
        (dir, db)
    }
}
