//! Note service
//!
//! Create, list, update and delete notes. Every write checks that the owning
//! user exists and that the title is not held by another note.

use super::{non_blank, Confirmation, DeleteRequest};
use crate::error::AppError;
use crate::store::{Db, NewNote, Note};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Create note request
#[derive(Debug, Default, Deserialize)]
pub struct CreateNoteRequest {
    /// ID of the owning user
    pub user: Option<String>,
    /// Title for the new note
    pub title: Option<String>,
    /// Body of the new note
    pub text: Option<String>,
}

/// Update note request; every field is replaced
#[derive(Debug, Default, Deserialize)]
pub struct UpdateNoteRequest {
    /// ID of the note to update
    pub id: Option<String>,
    /// ID of the (possibly new) owning user
    pub user: Option<String>,
    /// New title
    pub title: Option<String>,
    /// New body
    pub text: Option<String>,
    /// New completion flag
    pub completed: Option<bool>,
}

/// Note as listed, with the owner's username attached
#[derive(Debug, Clone, Serialize)]
pub struct NoteWithUsername {
    /// The stored note
    #[serde(flatten)]
    pub note: Note,
    /// Username of the owner, `None` if the owner could not be resolved
    pub username: Option<String>,
}

/// Note operations over the store
#[derive(Clone)]
pub struct NoteService {
    db: Db,
}

impl NoteService {
    /// Create a note service backed by `db`
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    /// List all notes, each with its owner's username
    ///
    /// Fails with `NotFound` when there are no notes.
    pub async fn list(&self) -> Result<Vec<NoteWithUsername>, AppError> {
        let notes = self.db.list_notes().await?;
        if notes.is_empty() {
            return Err(AppError::NotFound("No notes found".to_string()));
        }

        let mut listed = Vec::with_capacity(notes.len());
        for note in notes {
            let username = match self.db.find_user(&note.user).await? {
                Some(owner) => Some(owner.username),
                None => {
                    warn!(note_id = %note.id, user_id = %note.user, "Note owner not found");
                    None
                }
            };
            listed.push(NoteWithUsername { note, username });
        }

        Ok(listed)
    }

    /// Create a note for an existing user
    pub async fn create(&self, request: CreateNoteRequest) -> Result<Confirmation, AppError> {
        let (Some(user), Some(title), Some(text)) = (
            non_blank(request.user),
            non_blank(request.title),
            non_blank(request.text),
        ) else {
            return Err(AppError::InvalidInput(
                "User, title and text are required".to_string(),
            ));
        };

        if self.db.find_user(&user).await?.is_none() {
            return Err(AppError::NotFound(format!("User with id {} not found", user)));
        }

        if self.db.find_note_by_title(&title).await?.is_some() {
            return Err(AppError::Conflict(format!(
                "Note with title '{}' already exists",
                title
            )));
        }

        let note = self.db.insert_note(NewNote { user, title, text }).await?;
        info!(note_id = %note.id, ticket = note.ticket, user_id = %note.user, "Note created");

        Ok(Confirmation::new(
            format!("New note '{}' created for user {}", note.title, note.user),
            note.id,
        ))
    }

    /// Replace the user, title, text and completion flag of a note
    pub async fn update(&self, request: UpdateNoteRequest) -> Result<Confirmation, AppError> {
        let (Some(id), Some(user), Some(title), Some(text), Some(completed)) = (
            non_blank(request.id),
            non_blank(request.user),
            non_blank(request.title),
            non_blank(request.text),
            request.completed,
        ) else {
            return Err(AppError::InvalidInput(
                "Id, user, title, text and completed are required".to_string(),
            ));
        };

        let mut note = self
            .db
            .find_note(&id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Note with id {} not found", id)))?;

        if let Some(duplicate) = self.db.find_note_by_title(&title).await? {
            if duplicate.id != id {
                return Err(AppError::Conflict(format!(
                    "Note with title '{}' already exists",
                    title
                )));
            }
        }

        if self.db.find_user(&user).await?.is_none() {
            return Err(AppError::NotFound(format!("User with id {} not found", user)));
        }

        note.user = user;
        note.title = title;
        note.text = text;
        note.completed = completed;

        let updated = self.db.update_note(&note).await?;
        info!(note_id = %updated.id, "Note updated");

        Ok(Confirmation::new(
            format!("Note '{}' updated successfully", updated.title),
            updated.id,
        ))
    }

    /// Delete a note by ID
    pub async fn delete(&self, request: DeleteRequest) -> Result<Confirmation, AppError> {
        let id = non_blank(request.id)
            .ok_or_else(|| AppError::InvalidInput("Id is required".to_string()))?;

        let note = self
            .db
            .find_note(&id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Note with id {} not found", id)))?;

        if !self.db.delete_note(&note.id).await? {
            return Err(AppError::NotFound(format!("Note with id {} not found", id)));
        }
        info!(note_id = %note.id, "Note deleted");

        Ok(Confirmation::new(
            format!("Note '{}' with id {} deleted", note.title, note.id),
            note.id,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::test_support::test_db;
    use crate::store::User;

    async fn setup() -> (tempfile::TempDir, Db, NoteService, User) {
        let (dir, db) = test_db().await;
        let alice = User::new(
            "alice".to_string(),
            "hash".to_string(),
            vec!["Employee".to_string()],
        );
        db.insert_user(&alice).await.unwrap();
        let service = NoteService::new(db.clone());
        (dir, db, service, alice)
    }

    fn create_request(user: &str, title: &str) -> CreateNoteRequest {
        CreateNoteRequest {
            user: Some(user.to_string()),
            title: Some(title.to_string()),
            text: Some("do it".to_string()),
        }
    }

    #[tokio::test]
    async fn test_list_empty_is_not_found() {
        let (_dir, _db, service, _alice) = setup().await;
        match service.list().await.unwrap_err() {
            AppError::NotFound(msg) => assert_eq!(msg, "No notes found"),
            other => panic!("Expected NotFound, got: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_create_and_list_attaches_username() {
        let (_dir, _db, service, alice) = setup().await;
        let confirmation = service
            .create(create_request(&alice.id, "Task A"))
            .await
            .unwrap();
        assert_eq!(
            confirmation.message,
            format!("New note 'Task A' created for user {}", alice.id)
        );

        let notes = service.list().await.unwrap();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].note.ticket, 500);
        assert_eq!(notes[0].note.id, confirmation.id);
        assert!(!notes[0].note.completed);
        assert_eq!(notes[0].username.as_deref(), Some("alice"));
    }

    #[tokio::test]
    async fn test_create_rejects_blank_fields() {
        let (_dir, _db, service, alice) = setup().await;
        let mut request = create_request(&alice.id, "Task A");
        request.text = Some("   ".to_string());

        let err = service.create(request).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));

        let err = service
            .create(CreateNoteRequest::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_create_with_unknown_user_persists_nothing() {
        let (_dir, db, service, _alice) = setup().await;
        let err = service
            .create(create_request("no-such-user", "Task A"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
        assert!(db.list_notes().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_create_duplicate_title_conflicts() {
        let (_dir, _db, service, alice) = setup().await;
        service
            .create(create_request(&alice.id, "Task A"))
            .await
            .unwrap();
        let err = service
            .create(create_request(&alice.id, "Task A"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_tickets_increase_and_are_not_reused() {
        let (_dir, db, service, alice) = setup().await;
        let a = service
            .create(create_request(&alice.id, "A"))
            .await
            .unwrap();
        service
            .create(create_request(&alice.id, "B"))
            .await
            .unwrap();
        service
            .delete(DeleteRequest { id: Some(a.id) })
            .await
            .unwrap();
        let c = service
            .create(create_request(&alice.id, "C"))
            .await
            .unwrap();

        let c = db.find_note(&c.id).await.unwrap().unwrap();
        assert_eq!(c.ticket, 502);
    }

    #[tokio::test]
    async fn test_update_replaces_fields() {
        let (_dir, db, service, alice) = setup().await;
        let created = service
            .create(create_request(&alice.id, "Task A"))
            .await
            .unwrap();
        let before = db.find_note(&created.id).await.unwrap().unwrap();

        let confirmation = service
            .update(UpdateNoteRequest {
                id: Some(created.id.clone()),
                user: Some(alice.id.clone()),
                title: Some("Task A".to_string()),
                text: Some("changed".to_string()),
                completed: Some(true),
            })
            .await
            .unwrap();
        assert_eq!(confirmation.message, "Note 'Task A' updated successfully");

        let after = db.find_note(&created.id).await.unwrap().unwrap();
        assert_eq!(after.text, "changed");
        assert!(after.completed);
        assert_eq!(after.ticket, before.ticket);
        assert!(after.updated_at >= before.updated_at);
    }

    #[tokio::test]
    async fn test_update_requires_completed() {
        let (_dir, _db, service, alice) = setup().await;
        let created = service
            .create(create_request(&alice.id, "Task A"))
            .await
            .unwrap();
        let err = service
            .update(UpdateNoteRequest {
                id: Some(created.id),
                user: Some(alice.id),
                title: Some("Task A".to_string()),
                text: Some("changed".to_string()),
                completed: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_update_title_taken_by_other_note_conflicts() {
        let (_dir, _db, service, alice) = setup().await;
        service
            .create(create_request(&alice.id, "Task A"))
            .await
            .unwrap();
        let b = service
            .create(create_request(&alice.id, "Task B"))
            .await
            .unwrap();

        let err = service
            .update(UpdateNoteRequest {
                id: Some(b.id),
                user: Some(alice.id),
                title: Some("Task A".to_string()),
                text: Some("x".to_string()),
                completed: Some(false),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_update_unknown_note_or_user() {
        let (_dir, _db, service, alice) = setup().await;
        let err = service
            .update(UpdateNoteRequest {
                id: Some("missing".to_string()),
                user: Some(alice.id.clone()),
                title: Some("T".to_string()),
                text: Some("x".to_string()),
                completed: Some(false),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));

        let created = service
            .create(create_request(&alice.id, "Task A"))
            .await
            .unwrap();
        let err = service
            .update(UpdateNoteRequest {
                id: Some(created.id),
                user: Some("ghost".to_string()),
                title: Some("Task A".to_string()),
                text: Some("x".to_string()),
                completed: Some(false),
            })
            .await
            .unwrap_err();
        match err {
            AppError::NotFound(msg) => assert_eq!(msg, "User with id ghost not found"),
            other => panic!("Expected NotFound, got: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_delete() {
        let (_dir, db, service, alice) = setup().await;
        let err = service.delete(DeleteRequest { id: None }).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));

        let err = service
            .delete(DeleteRequest {
                id: Some("missing".to_string()),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));

        let created = service
            .create(create_request(&alice.id, "Task A"))
            .await
            .unwrap();
        let confirmation = service
            .delete(DeleteRequest {
                id: Some(created.id.clone()),
            })
            .await
            .unwrap();
        assert_eq!(
            confirmation.message,
            format!("Note 'Task A' with id {} deleted", created.id)
        );
        assert!(db.find_note(&created.id).await.unwrap().is_none());
    }
}
