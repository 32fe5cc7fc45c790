use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::app::AppState;
use crate::authz::{policy, Actor};
use crate::errors::{AppError, AppResult};
use crate::models::note::{Note, NoteCreateRequest, NoteUpdateRequest};
use crate::routes::{fetch_project, is_member};
use crate::utils::utc_now;

#[utoipa::path(
    get,
    path = "/projects/{project_id}/notes",
    tag = "Notes",
    params(("project_id" = Uuid, Path, description = "Project id")),
    responses((status = 200, description = "List notes", body = [Note]))
)]
pub async fn list_notes(
    State(state): State<AppState>,
    actor: Actor,
    Path(project_id): Path<Uuid>,
) -> AppResult<Json<Vec<Note>>> {
    let _ = fetch_project(&state.pool, project_id).await?;
    let member = is_member(&state.pool, project_id, actor.user_id).await?;
    policy::project_content(&actor, member)?;

    let notes = sqlx::query_as::<_, Note>(
        "SELECT id, project_id, author_id, title, content, created_at, updated_at \
         FROM notes WHERE project_id = ? ORDER BY created_at DESC",
    )
    .bind(project_id)
    .fetch_all(&state.pool)
    .await?;

    Ok(Json(notes))
}

#[utoipa::path(
    post,
    path = "/projects/{project_id}/notes",
    tag = "Notes",
    params(("project_id" = Uuid, Path, description = "Project id")),
    request_body = NoteCreateRequest,
    responses((status = 201, description = "Note created", body = Note))
)]
pub async fn create_note(
    State(state): State<AppState>,
    actor: Actor,
    Path(project_id): Path<Uuid>,
    Json(payload): Json<NoteCreateRequest>,
) -> AppResult<(StatusCode, Json<Note>)> {
    let content = payload.content.trim();
    if content.is_empty() {
        return Err(AppError::validation("note content is required"));
    }

    let _ = fetch_project(&state.pool, project_id).await?;
    let member = is_member(&state.pool, project_id, actor.user_id).await?;
    policy::project_content(&actor, member)?;

    let note_id = Uuid::new_v4();
    let now = utc_now();

    sqlx::query(
        "INSERT INTO notes (id, project_id, author_id, title, content, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(note_id)
    .bind(project_id)
    .bind(actor.user_id)
    .bind(payload.title.as_deref().map(str::trim))
    .bind(content)
    .bind(now)
    .bind(now)
    .execute(&state.pool)
    .await?;

    let note = fetch_note(&state.pool, project_id, note_id).await?;
    Ok((StatusCode::CREATED, Json(note)))
}

#[utoipa::path(
    put,
    path = "/projects/{project_id}/notes/{id}",
    tag = "Notes",
    params(
        ("project_id" = Uuid, Path, description = "Project id"),
        ("id" = Uuid, Path, description = "Note id")
    ),
    request_body = NoteUpdateRequest,
    responses((status = 200, description = "Note updated", body = Note))
)]
pub async fn update_note(
    State(state): State<AppState>,
    actor: Actor,
    Path((project_id, id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<NoteUpdateRequest>,
) -> AppResult<Json<Note>> {
    if payload.title.is_none() && payload.content.is_none() {
        return Err(AppError::validation("no changes to apply"));
    }

    let mut note = fetch_note(&state.pool, project_id, id).await?;
    policy::update_note(&actor, note.author_id)?;

    if let Some(title) = payload.title.as_ref() {
        note.title = Some(title.trim().to_string());
    }
    if let Some(content) = payload.content.as_ref() {
        if content.trim().is_empty() {
            return Err(AppError::validation("note content cannot be empty"));
        }
        note.content = content.trim().to_string();
    }

    let now = utc_now();

    sqlx::query("UPDATE notes SET title = ?, content = ?, updated_at = ? WHERE id = ?")
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
    path = "/projects/{project_id}/notes/{id}",
    tag = "Notes",
    params(
        ("project_id" = Uuid, Path, description = "Project id"),
        ("id" = Uuid, Path, description = "Note id")
    ),
    responses((status = 204, description = "Note deleted"))
)]
pub async fn delete_note(
    State(state): State<AppState>,
    actor: Actor,
    Path((project_id, id)): Path<(Uuid, Uuid)>,
) -> AppResult<StatusCode> {
    let note = fetch_note(&state.pool, project_id, id).await?;
    policy::delete_note(&actor, note.author_id)?;

    sqlx::query("DELETE FROM notes WHERE id = ?")
        .bind(id)
        .execute(&state.pool)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

async fn fetch_note(pool: &SqlitePool, project_id: Uuid, note_id: Uuid) -> AppResult<Note> {
    sqlx::query_as::<_, Note>(
        "SELECT id, project_id, author_id, title, content, created_at, updated_at \
         FROM notes WHERE id = ? AND project_id = ?",
    )
    .bind(note_id)
    .bind(project_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::not_found("note not found"))
}
