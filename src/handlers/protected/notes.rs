// handlers/protected/notes.rs - Note writes for the authenticated user

use axum::{
    extract::{Path, State},
    Extension,
};
use serde::Deserialize;
use std::collections::HashMap;

use crate::api::StrictJson;
use crate::app::AppState;
use crate::database::{AuthenticatedUser, NewNote, Note, NoteChanges};
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};
use crate::types::Identifier;

/// Body for POST and PUT. Both fields must be non-blank.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NoteBody {
    pub author: String,
    pub message: String,
}

/// Body for PATCH. At least one field must be present.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NotePatch {
    pub author: Option<String>,
    pub message: Option<String>,
}

impl NoteBody {
    fn validate(&self) -> Result<(), ApiError> {
        let mut fields = HashMap::new();
        for (field, value) in [("author", &self.author), ("message", &self.message)] {
            if value.trim().is_empty() {
                fields.insert(field.to_string(), "This field is required".to_string());
            }
        }
        if fields.is_empty() {
            Ok(())
        } else {
            Err(ApiError::validation_error("Missing required fields", Some(fields)))
        }
    }
}

impl NotePatch {
    fn into_changes(self) -> Result<NoteChanges, ApiError> {
        let mut fields = HashMap::new();
        for (field, value) in [("author", &self.author), ("message", &self.message)] {
            if matches!(value, Some(v) if v.trim().is_empty()) {
                fields.insert(field.to_string(), "Must not be blank".to_string());
            }
        }
        if !fields.is_empty() {
            return Err(ApiError::validation_error("Invalid note update", Some(fields)));
        }

        let changes = NoteChanges {
            author: self.author.map(|a| a.trim().to_string()),
            message: self.message,
        };
        if changes.is_empty() {
            return Err(ApiError::bad_request("At least one of author or message is required"));
        }
        Ok(changes)
    }
}

/// POST /notes - create a note owned by the caller
pub async fn create(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    StrictJson(body): StrictJson<NoteBody>,
) -> ApiResult<Note> {
    body.validate()?;

    let note = state
        .storage
        .create_note(NewNote {
            id: Identifier::generate(),
            author: body.author.trim().to_string(),
            message: body.message,
            user_id: user.id,
        })
        .await?;

    tracing::info!("Created note {}", note.id);
    Ok(ApiResponse::created(note))
}

/// PUT /notes/:id - replace both fields
pub async fn replace(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
    StrictJson(body): StrictJson<NoteBody>,
) -> ApiResult<Note> {
    let id = owned_note(&state, &user, &id).await?;
    body.validate()?;

    let changes = NoteChanges {
        author: Some(body.author.trim().to_string()),
        message: Some(body.message),
    };
    let note = state.storage.update_note(&id, changes).await?;
    Ok(ApiResponse::success(note))
}

/// PATCH /notes/:id - change only the supplied fields
pub async fn update(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
    StrictJson(body): StrictJson<NotePatch>,
) -> ApiResult<Note> {
    let id = owned_note(&state, &user, &id).await?;
    let note = state.storage.update_note(&id, body.into_changes()?).await?;
    Ok(ApiResponse::success(note))
}

/// DELETE /notes/:id
pub async fn delete(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
) -> ApiResult<()> {
    let id = owned_note(&state, &user, &id).await?;
    state.storage.delete_note(&id).await?;
    tracing::info!("Deleted note {}", id);
    Ok(ApiResponse::no_content())
}

// Parse, load, then check ownership; nothing is mutated on failure
async fn owned_note(state: &AppState, user: &AuthenticatedUser, raw_id: &str) -> Result<Identifier, ApiError> {
    let id = Identifier::parse(raw_id)?;
    let note = state.storage.fetch_note_by_id(&id).await?;
    note.ensure_owned_by(user)?;
    Ok(id)
}
