//! Application state
//!
//! Handles shared by every request handler. Nothing here is mutable; each
//! service wraps the store's connection pool.

use crate::services::{Argon2Hasher, NoteService, PasswordHasher, UserService};
use crate::store::Db;
use std::sync::Arc;

/// State handed to the axum router
#[derive(Clone)]
pub struct AppState {
    /// Note operations
    pub notes: NoteService,
    /// User operations
    pub users: UserService,
}

impl AppState {
    /// Build the services over `db`, hashing passwords with Argon2
    pub fn new(db: Db) -> Self {
        Self::with_hasher(db, Arc::new(Argon2Hasher))
    }

    /// Build the services over `db` with a custom password hasher
    pub fn with_hasher(db: Db, hasher: Arc<dyn PasswordHasher>) -> Self {
        Self {
            notes: NoteService::new(db.clone()),
            users: UserService::new(db, hasher),
        }
    }
}
