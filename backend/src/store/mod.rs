//! Store module
//!
//! Persists the `users` and `notes` collections and the ticket counter in a
//! SQLite database.

pub mod db;
pub mod models;

pub use db::Db;
pub use models::{NewNote, Note, NoteId, User, UserId};
