use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

use super::user::AuthenticatedUser;
use crate::types::Identifier;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct Note {
    pub id: Identifier,
    pub author: String,
    pub message: String,
    pub user_id: Identifier,
    pub verified: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, thiserror::Error)]
#[error("note {note_id} belongs to another user")]
pub struct OwnershipError {
    pub note_id: Identifier,
}

impl Note {
    /// Only the user who created a note may change or delete it.
    pub fn ensure_owned_by(&self, user: &AuthenticatedUser) -> Result<(), OwnershipError> {
        if self.user_id == user.id {
            Ok(())
        } else {
            Err(OwnershipError {
                note_id: self.id.clone(),
            })
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewNote {
    pub id: Identifier,
    pub author: String,
    pub message: String,
    pub user_id: Identifier,
}

/// Partial update; `None` leaves the column untouched
#[derive(Debug, Clone, Default)]
pub struct NoteChanges {
    pub author: Option<String>,
    pub message: Option<String>,
}

impl NoteChanges {
    pub fn is_empty(&self) -> bool {
        self.author.is_none() && self.message.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(id: &Identifier) -> AuthenticatedUser {
        AuthenticatedUser {
            id: id.clone(),
            email: "owner@example.com".into(),
            name: "Owner".into(),
            username: "owner".into(),
            verified: false,
            created_at: Utc::now(),
        }
    }

    fn note_owned_by(owner: &Identifier) -> Note {
        Note {
            id: Identifier::generate(),
            author: "Bilbo Baggins".into(),
            message: "Let the adventure begin...".into(),
            user_id: owner.clone(),
            verified: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn owner_may_modify() {
        let owner = Identifier::generate();
        assert!(note_owned_by(&owner).ensure_owned_by(&user(&owner)).is_ok());
    }

    #[test]
    fn other_user_may_not_modify() {
        let owner = Identifier::generate();
        let intruder = Identifier::generate();
        let note = note_owned_by(&owner);
        let err = note.ensure_owned_by(&user(&intruder)).unwrap_err();
        assert_eq!(err.note_id, note.id);
    }

    #[test]
    fn empty_changes() {
        assert!(NoteChanges::default().is_empty());
        assert!(!NoteChanges { message: Some("m".into()), ..Default::default() }.is_empty());
    }
}
