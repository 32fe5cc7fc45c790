use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::Json;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::app::AppState;
use crate::authz::{policy, Actor};
use crate::errors::{AppError, AppResult};
use crate::models::document::{DbDocument, Document};
use crate::routes::{fetch_project, is_member};
use crate::storage::StorageService;
use crate::utils::{sanitize_file_name, utc_now};

#[utoipa::path(
    get,
    path = "/projects/{project_id}/documents",
    tag = "Documents",
    params(("project_id" = Uuid, Path, description = "Project id")),
    responses((status = 200, description = "List documents with signed download URLs", body = [Document]))
)]
pub async fn list_documents(
    State(state): State<AppState>,
    actor: Actor,
    Path(project_id): Path<Uuid>,
) -> AppResult<Json<Vec<Document>>> {
    let _ = fetch_project(&state.pool, project_id).await?;
    let member = is_member(&state.pool, project_id, actor.user_id).await?;
    policy::project_content(&actor, member)?;

    let rows = sqlx::query_as::<_, DbDocument>(
        "SELECT id, project_id, author_id, storage_path, original_name, description, mime_type, size_bytes, created_at \
         FROM documents WHERE project_id = ? ORDER BY created_at DESC",
    )
    .bind(project_id)
    .fetch_all(&state.pool)
    .await?;

    let mut documents = Vec::with_capacity(rows.len());
    for row in rows {
        let mut doc: Document = row.into();
        doc.signed_url = Some(state.storage.signed_url(&doc.storage_path)?);
        documents.push(doc);
    }

    Ok(Json(documents))
}

/// Multipart upload: a `file` part plus a `description` part. The blob is
/// written first; if the metadata insert then fails, the blob is removed
/// again so the store holds no orphans.
#[utoipa::path(
    post,
    path = "/projects/{project_id}/documents",
    tag = "Documents",
    params(("project_id" = Uuid, Path, description = "Project id")),
    responses((status = 201, description = "Document uploaded", body = Document))
)]
pub async fn upload_document(
    State(state): State<AppState>,
    actor: Actor,
    Path(project_id): Path<Uuid>,
    mut multipart: Multipart,
) -> AppResult<(StatusCode, Json<Document>)> {
    let mut file_bytes: Option<Vec<u8>> = None;
    let mut original_name = String::new();
    let mut mime_type = "application/octet-stream".to_string();
    let mut description = String::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| AppError::validation(format!("invalid multipart body: {err}")))?
    {
        match field.name() {
            Some("file") => {
                original_name = field.file_name().unwrap_or_default().to_string();
                if let Some(ct) = field.content_type() {
                    mime_type = ct.to_string();
                }
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|err| AppError::validation(format!("failed to read file: {err}")))?;
                file_bytes = Some(bytes.to_vec());
            }
            Some("description") => {
                description = field
                    .text()
                    .await
                    .map_err(|err| AppError::validation(format!("failed to read description: {err}")))?;
            }
            _ => {}
        }
    }

    let file_bytes = file_bytes.ok_or_else(|| AppError::validation("file is required"))?;
    if original_name.trim().is_empty() {
        return Err(AppError::validation("file name is required"));
    }
    if description.trim().is_empty() {
        return Err(AppError::validation("description is required"));
    }

    let _ = fetch_project(&state.pool, project_id).await?;
    let member = is_member(&state.pool, project_id, actor.user_id).await?;
    policy::project_content(&actor, member)?;

    let safe_name = sanitize_file_name(&original_name);
    let storage_path = format!("projects/{}/{}-{}", project_id, Uuid::new_v4(), safe_name);

    state.storage.upload(&storage_path, &file_bytes, &mime_type).await?;

    let document_id = Uuid::new_v4();
    let now = utc_now();

    let inserted = sqlx::query(
        "INSERT INTO documents (id, project_id, author_id, storage_path, original_name, description, mime_type, size_bytes, created_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(document_id)
    .bind(project_id)
    .bind(actor.user_id)
    .bind(&storage_path)
    .bind(original_name.trim())
    .bind(description.trim())
    .bind(&mime_type)
    .bind(file_bytes.len() as i64)
    .bind(now)
    .execute(&state.pool)
    .await;

    if let Err(err) = inserted {
        // Compensating delete; the blob must not outlive a failed insert.
        if let Err(cleanup_err) = state.storage.remove(&storage_path).await {
            tracing::warn!(path = %storage_path, "orphaned blob after failed insert: {cleanup_err}");
        }
        return Err(err.into());
    }

    let mut document: Document = fetch_document(&state.pool, project_id, document_id).await?.into();
    document.signed_url = Some(state.storage.signed_url(&document.storage_path)?);

    Ok((StatusCode::CREATED, Json(document)))
}

#[utoipa::path(
    delete,
    path = "/projects/{project_id}/documents/{id}",
    tag = "Documents",
    params(
        ("project_id" = Uuid, Path, description = "Project id"),
        ("id" = Uuid, Path, description = "Document id")
    ),
    responses((status = 204, description = "Document deleted"))
)]
pub async fn delete_document(
    State(state): State<AppState>,
    actor: Actor,
    Path((project_id, id)): Path<(Uuid, Uuid)>,
) -> AppResult<StatusCode> {
    let document = fetch_document(&state.pool, project_id, id).await?;
    policy::delete_document(&actor, document.author_id)?;

    if let Err(err) = state.storage.remove(&document.storage_path).await {
        tracing::warn!(path = %document.storage_path, "failed to remove blob: {err}");
    }

    sqlx::query("DELETE FROM documents WHERE id = ?")
        .bind(id)
        .execute(&state.pool)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

async fn fetch_document(pool: &SqlitePool, project_id: Uuid, document_id: Uuid) -> AppResult<DbDocument> {
    sqlx::query_as::<_, DbDocument>(
        "SELECT id, project_id, author_id, storage_path, original_name, description, mime_type, size_bytes, created_at \
         FROM documents WHERE id = ? AND project_id = ?",
    )
    .bind(document_id)
    .bind(project_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::not_found("document not found"))
}
