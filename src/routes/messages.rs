use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use uuid::Uuid;

use crate::app::AppState;
use crate::authz::{policy, Actor};
use crate::errors::{AppError, AppResult};
use crate::models::message::{Message, MessageCreateRequest, MessageEntry};
use crate::routes::{fetch_project, is_member};
use crate::utils::utc_now;

#[utoipa::path(
    get,
    path = "/projects/{project_id}/messages",
    tag = "Messages",
    params(("project_id" = Uuid, Path, description = "Project id")),
    responses((status = 200, description = "List chat messages", body = [MessageEntry]))
)]
pub async fn list_messages(
    State(state): State<AppState>,
    actor: Actor,
    Path(project_id): Path<Uuid>,
) -> AppResult<Json<Vec<MessageEntry>>> {
    let _ = fetch_project(&state.pool, project_id).await?;
    let member = is_member(&state.pool, project_id, actor.user_id).await?;
    policy::project_content(&actor, member)?;

    let messages = sqlx::query_as::<_, MessageEntry>(
        "SELECT m.id, m.project_id, m.author_id, COALESCE(u.full_name, u.email) AS author_name, m.content, m.created_at \
         FROM messages m \
         INNER JOIN users u ON u.id = m.author_id \
         WHERE m.project_id = ? \
         ORDER BY m.created_at ASC",
    )
    .bind(project_id)
    .fetch_all(&state.pool)
    .await?;

    Ok(Json(messages))
}

#[utoipa::path(
    post,
    path = "/projects/{project_id}/messages",
    tag = "Messages",
    params(("project_id" = Uuid, Path, description = "Project id")),
    request_body = MessageCreateRequest,
    responses((status = 201, description = "Message posted", body = Message))
)]
pub async fn post_message(
    State(state): State<AppState>,
    actor: Actor,
    Path(project_id): Path<Uuid>,
    Json(payload): Json<MessageCreateRequest>,
) -> AppResult<(StatusCode, Json<Message>)> {
    let content = payload.content.trim();
    if content.is_empty() {
        return Err(AppError::validation("message content is required"));
    }

    let _ = fetch_project(&state.pool, project_id).await?;
    let member = is_member(&state.pool, project_id, actor.user_id).await?;
    policy::project_content(&actor, member)?;

    let message_id = Uuid::new_v4();
    let now = utc_now();

    sqlx::query(
        "INSERT INTO messages (id, project_id, author_id, content, created_at) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(message_id)
    .bind(project_id)
    .bind(actor.user_id)
    .bind(content)
    .bind(now)
    .execute(&state.pool)
    .await?;

    let message = Message {
        id: message_id,
        project_id,
        author_id: actor.user_id,
        content: content.to_string(),
        created_at: now,
    };

    Ok((StatusCode::CREATED, Json(message)))
}

/// Wipes the entire chat history of a project. Irreversible, hence gated on
/// the primary admin rather than the ADMIN role.
#[utoipa::path(
    delete,
    path = "/projects/{project_id}/messages",
    tag = "Messages",
    params(("project_id" = Uuid, Path, description = "Project id")),
    responses((status = 204, description = "Chat cleared"))
)]
pub async fn clear_messages(
    State(state): State<AppState>,
    actor: Actor,
    Path(project_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    policy::clear_messages(&actor)?;

    let _ = fetch_project(&state.pool, project_id).await?;

    sqlx::query("DELETE FROM messages WHERE project_id = ?")
        .bind(project_id)
        .execute(&state.pool)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}
