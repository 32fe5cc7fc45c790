use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::app::AppState;
use crate::authz::{policy, Actor};
use crate::errors::{AppError, AppResult};
use crate::models::personal_note::{
    PersonalNote, PersonalNoteCreateRequest, PersonalNoteUpdateRequest,
};
use crate::utils::utc_now;

#[utoipa::path(
    get,
    path = "/personal-notes",
    tag = "PersonalNotes",
    responses((status = 200, description = "List own personal notes", body = [PersonalNote]))
)]
pub async fn list_personal_notes(
    State(state): State<AppState>,
    actor: Actor,
) -> AppResult<Json<Vec<PersonalNote>>> {
    let notes = sqlx::query_as::<_, PersonalNote>(
        "SELECT id, user_id, title, content, created_at, updated_at \
         FROM personal_notes WHERE user_id = ? ORDER BY created_at DESC",
    )
    .bind(actor.user_id)
    .fetch_all(&state.pool)
    .await?;

    Ok(Json(notes))
}

#[utoipa::path(
    post,
    path = "/personal-notes",
    tag = "PersonalNotes",
    request_body = PersonalNoteCreateRequest,
    responses((status = 201, description = "Personal note created", body = PersonalNote))
)]
pub async fn create_personal_note(
    State(state): State<AppState>,
    actor: Actor,
    Json(payload): Json<PersonalNoteCreateRequest>,
) -> AppResult<(StatusCode, Json<PersonalNote>)> {
    let title = payload.title.trim();
    if title.is_empty() {
        return Err(AppError::validation("title is required"));
    }
    let content = payload.content.trim();
    if content.is_empty() {
        return Err(AppError::validation("content is required"));
    }

    let note_id = Uuid::new_v4();
    let now = utc_now();

    sqlx::query(
        "INSERT INTO personal_notes (id, user_id, title, content, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(note_id)
    .bind(actor.user_id)
    .bind(title)
    .bind(content)
    .bind(now)
    .bind(now)
    .execute(&state.pool)
    .await?;

    let note = fetch_personal_note(&state.pool, note_id).await?;
    Ok((StatusCode::CREATED, Json(note)))
}

#[utoipa::path(
    put,
    path = "/personal-notes/{id}",
    tag = "PersonalNotes",
    params(("id" = Uuid, Path, description = "Note id")),
    request_body = PersonalNoteUpdateRequest,
    responses((status = 200, description = "Personal note updated", body = PersonalNote))
)]
pub async fn update_personal_note(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
    Json(payload): Json<PersonalNoteUpdateRequest>,
) -> AppResult<Json<PersonalNote>> {
    if payload.title.is_none() && payload.content.is_none() {
        return Err(AppError::validation("no changes to apply"));
    }

    let mut note = fetch_personal_note(&state.pool, id).await?;
    policy::personal_note(&actor, note.user_id)?;

    if let Some(title) = payload.title.as_ref() {
        if title.trim().is_empty() {
            return Err(AppError::validation("title cannot be empty"));
        }
        note.title = title.trim().to_string();
    }
    if let Some(content) = payload.content.as_ref() {
        if content.trim().is_empty() {
            return Err(AppError::validation("content cannot be empty"));
        }
        note.content = content.trim().to_string();
    }

    let now = utc_now();

    sqlx::query("UPDATE personal_notes SET title = ?, content = ?, updated_at = ? WHERE id = ?")
        .bind(&note.title)
        .bind(&note.content)
        .bind(now)
        .bind(id)
        .execute(&state.pool)
        .await?;

    note.updated_at = now;
    Ok(Json(note))
}

#[utoipa::path(
    delete,
    path = "/personal-notes/{id}",
    tag = "PersonalNotes",
    params(("id" = Uuid, Path, description = "Note id")),
    responses((status = 204, description = "Personal note deleted"))
)]
pub async fn delete_personal_note(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    let note = fetch_personal_note(&state.pool, id).await?;
    policy::personal_note(&actor, note.user_id)?;

    sqlx::query("DELETE FROM personal_notes WHERE id = ?")
        .bind(id)
        .execute(&state.pool)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

async fn fetch_personal_note(pool: &SqlitePool, note_id: Uuid) -> AppResult<PersonalNote> {
    sqlx::query_as::<_, PersonalNote>(
        "SELECT id, user_id, title, content, created_at, updated_at FROM personal_notes WHERE id = ?",
    )
    .bind(note_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::not_found("note not found"))
}
