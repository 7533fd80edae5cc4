pub mod models;
pub mod sqlite;

use async_trait::async_trait;
use thiserror::Error;

use crate::types::Identifier;
pub use models::{AuthenticatedUser, NewNote, NewUser, Note, NoteChanges, OwnershipError, User};
pub use sqlite::SqliteStorage;

/// Errors surfaced by a storage backend
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

/// Persistence for notes and users.
///
/// Lookups report a missing row as [`StorageError::NotFound`], distinct from
/// backend failures. Concurrency control is the backend's concern.
#[async_trait]
pub trait Storage: Send + Sync {
    async fn list_notes(&self) -> Result<Vec<Note>, StorageError>;

    async fn list_notes_by_author(&self, author: &str) -> Result<Vec<Note>, StorageError>;

    async fn fetch_note_by_id(&self, id: &Identifier) -> Result<Note, StorageError>;

    async fn create_note(&self, note: NewNote) -> Result<Note, StorageError>;

    async fn update_note(&self, id: &Identifier, changes: NoteChanges) -> Result<Note, StorageError>;

    async fn delete_note(&self, id: &Identifier) -> Result<(), StorageError>;

    async fn fetch_user_by_email(&self, email: &str) -> Result<User, StorageError>;

    async fn fetch_user_by_id(&self, id: &Identifier) -> Result<User, StorageError>;

    async fn create_user(&self, user: NewUser) -> Result<User, StorageError>;

    async fn health_check(&self) -> Result<(), StorageError>;
}
