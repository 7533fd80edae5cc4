// handlers/public/notes.rs - Anonymous note reads

use axum::extract::{Path, Query, State};
use serde::Deserialize;

use crate::app::AppState;
use crate::database::Note;
use crate::middleware::{ApiResponse, ApiResult};
use crate::types::Identifier;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub author: Option<String>,
}

/// GET /notes - all notes, newest first; `?author=bilbo_baggins` filters by author
pub async fn list(State(state): State<AppState>, Query(query): Query<ListQuery>) -> ApiResult<Vec<Note>> {
    let notes = match query.author.as_deref().map(str::trim).filter(|a| !a.is_empty()) {
        Some(author) => state.storage.list_notes_by_author(&normalize_name(author)).await?,
        None => state.storage.list_notes().await?,
    };
    Ok(ApiResponse::success(notes))
}

/// GET /notes/:id - single note
pub async fn show(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Note> {
    // Malformed ids never reach storage
    let id = Identifier::parse(&id)?;
    let note = state.storage.fetch_note_by_id(&id).await?;
    Ok(ApiResponse::success(note))
}

/// `bilbo_baggins` -> `Bilbo Baggins`, `jean-luc_picard` -> `Jean-Luc Picard`
fn normalize_name(name: &str) -> String {
    name.split('_')
        .map(|part| part.split('-').map(capitalize).collect::<Vec<_>>().join("-"))
        .collect::<Vec<_>>()
        .join(" ")
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}
