//! Database operations
//!
//! Handles all database interactions for users, notes and the ticket counter.

use crate::error::AppError;
use crate::store::models::{generate_id, NewNote, Note, User};
use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{FromRow, SqlitePool};
use std::path::PathBuf;
use std::str::FromStr;
use tracing::{debug, info};

/// Name of the counter row that hands out note tickets
pub const TICKET_COUNTER: &str = "ticketNums";

/// Extended result code SQLite uses for `ON DELETE RESTRICT` failures
const SQLITE_CONSTRAINT_TRIGGER: &str = "1811";

const NOTE_COLUMNS: &str = "id, ticket, user_id, title, text, completed, created_at, updated_at";

/// User row as stored; `roles` is a JSON array
#[derive(FromRow)]
struct UserRow {
    id: String,
    username: String,
    password: String,
    roles: String,
    active: bool,
}

impl TryFrom<UserRow> for User {
    type Error = AppError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let roles = serde_json::from_str(&row.roles).map_err(|e| {
            AppError::Internal(anyhow::anyhow!(
                "Corrupt roles for user {}: {}",
                row.id,
                e
            ))
        })?;
        Ok(User {
            id: row.id,
            username: row.username,
            password: row.password,
            roles,
            active: row.active,
        })
    }
}

/// Constraint a failed write ran into
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Violation {
    Unique,
    ForeignKey,
}

fn violation(err: &sqlx::Error) -> Option<Violation> {
    let db_err = err.as_database_error()?;
    if db_err.is_unique_violation() {
        Some(Violation::Unique)
    } else if db_err.is_foreign_key_violation() {
        Some(Violation::ForeignKey)
    } else if db_err.code().as_deref() == Some(SQLITE_CONSTRAINT_TRIGGER) {
        // RESTRICT foreign keys (databases created before NO ACTION) report this code
        Some(Violation::ForeignKey)
    } else {
        None
    }
}

fn internal(context: &str, err: sqlx::Error) -> AppError {
    AppError::Internal(anyhow::anyhow!("{}: {}", context, err))
}

/// Database connection pool for the users and notes collections
#[derive(Clone)]
pub struct Db {
    pool: SqlitePool,
}

impl Db {
    /// Initialize database connection pool
    ///
    /// # Arguments
    /// * `db_path` - Path to the SQLite database file
    ///
    /// # Returns
    /// * `Ok(Db)` if successful
    /// * `Err(AppError)` if connection failed
    pub async fn new(db_path: &str) -> Result<Self, AppError> {
        let file_path = db_path.strip_prefix("sqlite:").unwrap_or(db_path);
        if let Some(parent) = PathBuf::from(file_path).parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                AppError::Internal(anyhow::anyhow!("Failed to create db directory: {}", e))
            })?;
        }

        let connection_string = if db_path.starts_with("sqlite:") {
            db_path.to_string()
        } else {
            format!("sqlite:{}", db_path)
        };

        let options = SqliteConnectOptions::from_str(&connection_string)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Invalid database path: {}", e)))?
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(|e| {
                AppError::Internal(anyhow::anyhow!("Failed to connect to database: {}", e))
            })?;

        info!("Connected to SQLite database at: {}", db_path);

        let db = Self { pool };
        db.run_migrations().await?;

        Ok(db)
    }

    /// Run the embedded schema script
    ///
    /// Every statement is idempotent, so this runs on each start.
    async fn run_migrations(&self) -> Result<(), AppError> {
        info!("Running database migrations...");

        sqlx::raw_sql(include_str!("../../migrations/001_create_users_notes.sql"))
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Migration failed: {}", e)))?;

        info!("Database migrations completed successfully");
        Ok(())
    }

    // ---- users ----

    /// Get all users, ordered by username
    pub async fn list_users(&self) -> Result<Vec<User>, AppError> {
        let rows = sqlx::query_as::<_, UserRow>(
            "SELECT id, username, password, roles, active FROM users ORDER BY username ASC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| internal("Failed to fetch users", e))?;

        rows.into_iter().map(User::try_from).collect()
    }

    /// Get a user by ID
    pub async fn find_user(&self, id: &str) -> Result<Option<User>, AppError> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, username, password, roles, active FROM users WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| internal("Failed to fetch user", e))?;

        row.map(User::try_from).transpose()
    }

    /// Get a user by username
    pub async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, username, password, roles, active FROM users WHERE username = ?",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| internal("Failed to fetch user", e))?;

        row.map(User::try_from).transpose()
    }

    /// Insert a new user
    ///
    /// A username already taken surfaces as `AppError::Conflict`.
    pub async fn insert_user(&self, user: &User) -> Result<(), AppError> {
        let roles = serde_json::to_string(&user.roles)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to encode roles: {}", e)))?;

        sqlx::query(
            "INSERT INTO users (id, username, password, roles, active) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&user.id)
        .bind(&user.username)
        .bind(&user.password)
        .bind(roles)
        .bind(user.active)
        .execute(&self.pool)
        .await
        .map_err(|e| match violation(&e) {
            Some(Violation::Unique) => AppError::Conflict("Duplicate username".to_string()),
            _ => internal("Failed to create user", e),
        })?;

        debug!("Created user: {}", user.id);
        Ok(())
    }

    /// Overwrite every stored field of an existing user
    pub async fn update_user(&self, user: &User) -> Result<(), AppError> {
        let roles = serde_json::to_string(&user.roles)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to encode roles: {}", e)))?;

        let result = sqlx::query(
            "UPDATE users SET username = ?, password = ?, roles = ?, active = ? WHERE id = ?",
        )
        .bind(&user.username)
        .bind(&user.password)
        .bind(roles)
        .bind(user.active)
        .bind(&user.id)
        .execute(&self.pool)
        .await
        .map_err(|e| match violation(&e) {
            Some(Violation::Unique) => AppError::Conflict("Duplicate username".to_string()),
            _ => internal("Failed to update user", e),
        })?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("User not found".to_string()));
        }

        debug!("Updated user: {}", user.id);
        Ok(())
    }

    /// Delete a user
    ///
    /// Returns `false` if no user had that ID. The notes foreign key blocks
    /// the delete while notes reference the user.
    pub async fn delete_user(&self, id: &str) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| match violation(&e) {
                Some(Violation::ForeignKey) => {
                    AppError::AssignedNotes("User has assigned notes".to_string())
                }
                _ => internal("Failed to delete user", e),
            })?;

        debug!("Deleted user: {}", id);
        Ok(result.rows_affected() > 0)
    }

    // ---- notes ----

    /// Get all notes, ordered by ticket
    pub async fn list_notes(&self) -> Result<Vec<Note>, AppError> {
        let query = format!("SELECT {} FROM notes ORDER BY ticket ASC", NOTE_COLUMNS);
        sqlx::query_as::<_, Note>(&query)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| internal("Failed to fetch notes", e))
    }

    /// Get a note by ID
    pub async fn find_note(&self, id: &str) -> Result<Option<Note>, AppError> {
        let query = format!("SELECT {} FROM notes WHERE id = ?", NOTE_COLUMNS);
        sqlx::query_as::<_, Note>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| internal("Failed to fetch note", e))
    }

    /// Get a note by title
    pub async fn find_note_by_title(&self, title: &str) -> Result<Option<Note>, AppError> {
        let query = format!("SELECT {} FROM notes WHERE title = ?", NOTE_COLUMNS);
        sqlx::query_as::<_, Note>(&query)
            .bind(title)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| internal("Failed to fetch note", e))
    }

    /// Whether any note is assigned to the given user
    pub async fn note_exists_for_user(&self, user_id: &str) -> Result<bool, AppError> {
        let found: Option<i64> = sqlx::query_scalar("SELECT 1 FROM notes WHERE user_id = ? LIMIT 1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| internal("Failed to look up notes for user", e))?;

        Ok(found.is_some())
    }

    /// Insert a note, allocating the next ticket number
    ///
    /// The counter increment and the insert share one transaction, so a failed
    /// insert does not consume a ticket and two notes never share one.
    pub async fn insert_note(&self, new_note: NewNote) -> Result<Note, AppError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| internal("Failed to begin transaction", e))?;

        let ticket: i64 =
            sqlx::query_scalar("UPDATE counters SET seq = seq + 1 WHERE name = ? RETURNING seq")
                .bind(TICKET_COUNTER)
                .fetch_one(&mut *tx)
                .await
                .map_err(|e| internal("Failed to allocate ticket", e))?;

        let now = Utc::now();
        let note = Note {
            id: generate_id(),
            ticket,
            user: new_note.user,
            title: new_note.title,
            text: new_note.text,
            completed: false,
            created_at: now,
            updated_at: now,
        };

        sqlx::query(
            "INSERT INTO notes (id, ticket, user_id, title, text, completed, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&note.id)
        .bind(note.ticket)
        .bind(&note.user)
        .bind(&note.title)
        .bind(&note.text)
        .bind(note.completed)
        .bind(note.created_at)
        .bind(note.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| match violation(&e) {
            Some(Violation::Unique) => {
                AppError::Conflict(format!("Note with title '{}' already exists", note.title))
            }
            Some(Violation::ForeignKey) => {
                AppError::NotFound(format!("User with id {} not found", note.user))
            }
            None => internal("Failed to create note", e),
        })?;

        tx.commit()
            .await
            .map_err(|e| internal("Failed to commit note", e))?;

        debug!(note_id = %note.id, ticket = note.ticket, "Created note");
        Ok(note)
    }

    /// Overwrite the editable fields of a note and bump `updated_at`
    pub async fn update_note(&self, note: &Note) -> Result<Note, AppError> {
        let mut updated = note.clone();
        updated.updated_at = Utc::now();

        let result = sqlx::query(
            "UPDATE notes SET user_id = ?, title = ?, text = ?, completed = ?, updated_at = ? WHERE id = ?",
        )
        .bind(&updated.user)
        .bind(&updated.title)
        .bind(&updated.text)
        .bind(updated.completed)
        .bind(updated.updated_at)
        .bind(&updated.id)
        .execute(&self.pool)
        .await
        .map_err(|e| match violation(&e) {
            Some(Violation::Unique) => {
                AppError::Conflict(format!("Note with title '{}' already exists", updated.title))
            }
            Some(Violation::ForeignKey) => {
                AppError::NotFound(format!("User with id {} not found", updated.user))
            }
            None => internal("Failed to update note", e),
        })?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!(
                "Note with id {} not found",
                updated.id
            )));
        }

        debug!("Updated note: {}", updated.id);
        Ok(updated)
    }

    /// Delete a note, returning `false` if no note had that ID
    pub async fn delete_note(&self, id: &str) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM notes WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| internal("Failed to delete note", e))?;

        debug!("Deleted note: {}", id);
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn open(dir: &TempDir) -> Db {
        let path = dir.path().join("notes.db");
        Db::new(path.to_str().unwrap()).await.unwrap()
    }

    fn user(name: &str) -> User {
        User::new(
            name.to_string(),
            "hash".to_string(),
            vec!["Employee".to_string()],
        )
    }

    fn new_note(user: &User, title: &str) -> NewNote {
        NewNote {
            user: user.id.clone(),
            title: title.to_string(),
            text: "text".to_string(),
        }
    }

    #[tokio::test]
    async fn test_user_roundtrip_through_store() {
        let dir = TempDir::new().unwrap();
        let db = open(&dir).await;
        let alice = user("alice");
        db.insert_user(&alice).await.unwrap();

        let found = db.find_user(&alice.id).await.unwrap().unwrap();
        assert_eq!(found, alice);
        assert!(db.find_user_by_username("bob").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_unique_username_enforced_by_store() {
        let dir = TempDir::new().unwrap();
        let db = open(&dir).await;
        db.insert_user(&user("alice")).await.unwrap();

        let err = db.insert_user(&user("alice")).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_tickets_start_at_500_and_survive_reopen() {
        let dir = TempDir::new().unwrap();
        let alice = user("alice");
        {
            let db = open(&dir).await;
            db.insert_user(&alice).await.unwrap();
            let first = db.insert_note(new_note(&alice, "A")).await.unwrap();
            let second = db.insert_note(new_note(&alice, "B")).await.unwrap();
            assert_eq!(first.ticket, 500);
            assert_eq!(second.ticket, 501);
            assert!(db.delete_note(&second.id).await.unwrap());
        }

        // Reopening re-runs migrations without resetting the counter
        let db = open(&dir).await;
        let third = db.insert_note(new_note(&alice, "C")).await.unwrap();
        assert_eq!(third.ticket, 502);
    }

    #[tokio::test]
    async fn test_failed_insert_does_not_consume_ticket() {
        let dir = TempDir::new().unwrap();
        let db = open(&dir).await;
        let alice = user("alice");
        db.insert_user(&alice).await.unwrap();
        db.insert_note(new_note(&alice, "A")).await.unwrap();

        let err = db.insert_note(new_note(&alice, "A")).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        let next = db.insert_note(new_note(&alice, "B")).await.unwrap();
        assert_eq!(next.ticket, 501);
    }

    #[tokio::test]
    async fn test_note_requires_existing_user() {
        let dir = TempDir::new().unwrap();
        let db = open(&dir).await;
        let ghost = user("ghost");

        let err = db.insert_note(new_note(&ghost, "A")).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
        assert!(db.list_notes().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_foreign_key_blocks_user_delete() {
        let dir = TempDir::new().unwrap();
        let db = open(&dir).await;
        let alice = user("alice");
        db.insert_user(&alice).await.unwrap();
        db.insert_note(new_note(&alice, "A")).await.unwrap();

        assert!(db.note_exists_for_user(&alice.id).await.unwrap());
        match db.delete_user(&alice.id).await.unwrap_err() {
            AppError::AssignedNotes(msg) => assert_eq!(msg, "User has assigned notes"),
            other => panic!("Expected AssignedNotes, got: {:?}", other),
        }
        assert!(db.find_user(&alice.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_restrict_foreign_key_maps_to_assigned_notes() {
        let dir = TempDir::new().unwrap();
        let db = open(&dir).await;
        let alice = user("alice");
        db.insert_user(&alice).await.unwrap();

        // A notes table declared with ON DELETE RESTRICT fails with code 1811
        sqlx::raw_sql(
            "CREATE TABLE pins (id TEXT PRIMARY KEY, \
             user_id TEXT NOT NULL REFERENCES users(id) ON DELETE RESTRICT)",
        )
        .execute(&db.pool)
        .await
        .unwrap();
        sqlx::query("INSERT INTO pins (id, user_id) VALUES ('p1', ?)")
            .bind(&alice.id)
            .execute(&db.pool)
            .await
            .unwrap();

        let err = db.delete_user(&alice.id).await.unwrap_err();
        assert!(matches!(err, AppError::AssignedNotes(_)));
    }

    #[tokio::test]
    async fn test_migrations_are_idempotent() {
        let dir = TempDir::new().unwrap();
        let db = open(&dir).await;
        db.run_migrations().await.unwrap();
        db.run_migrations().await.unwrap();

        let seq: i64 = sqlx::query_scalar("SELECT seq FROM counters WHERE name = ?")
            .bind(TICKET_COUNTER)
            .fetch_one(&db.pool)
            .await
            .unwrap();
        assert_eq!(seq, 499);
    }
}
