use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::app::AppState;
use crate::authz::policy::{self, TaskChange, TaskSnapshot};
use crate::authz::Actor;
use crate::errors::{AppError, AppResult};
use crate::models::task::{DbTask, Task, TaskCreateRequest, TaskStatus, TaskUpdateRequest};
use crate::routes::{fetch_project, is_member};
use crate::utils::utc_now;

#[utoipa::path(
    get,
    path = "/projects/{project_id}/tasks",
    tag = "Tasks",
    params(("project_id" = Uuid, Path, description = "Project id")),
    responses((status = 200, description = "List tasks", body = [Task]))
)]
pub async fn list_tasks(
    State(state): State<AppState>,
    actor: Actor,
    Path(project_id): Path<Uuid>,
) -> AppResult<Json<Vec<Task>>> {
    let _ = fetch_project(&state.pool, project_id).await?;
    let member = is_member(&state.pool, project_id, actor.user_id).await?;
    policy::project_content(&actor, member)?;

    let rows = sqlx::query_as::<_, DbTask>(
        "SELECT id, project_id, title, description, status, is_archived, archived_at, assigned_to, created_by, created_at, updated_at \
         FROM tasks WHERE project_id = ? ORDER BY created_at DESC",
    )
    .bind(project_id)
    .fetch_all(&state.pool)
    .await?;

    let tasks: Vec<Task> = rows.into_iter().map(Task::try_from).collect::<Result<_, _>>()?;
    Ok(Json(tasks))
}

#[utoipa::path(
    post,
    path = "/projects/{project_id}/tasks",
    tag = "Tasks",
    params(("project_id" = Uuid, Path, description = "Project id")),
    request_body = TaskCreateRequest,
    responses((status = 201, description = "Task created", body = Task))
)]
pub async fn create_task(
    State(state): State<AppState>,
    actor: Actor,
    Path(project_id): Path<Uuid>,
    Json(payload): Json<TaskCreateRequest>,
) -> AppResult<(StatusCode, Json<Task>)> {
    policy::create_task(&actor)?;

    let title = payload.title.trim();
    if title.is_empty() {
        return Err(AppError::validation("task title is required"));
    }

    let _ = fetch_project(&state.pool, project_id).await?;

    if !is_member(&state.pool, project_id, payload.assigned_to).await? {
        return Err(AppError::validation("assignee does not belong to the project"));
    }

    let task_id = Uuid::new_v4();
    let now = utc_now();

    sqlx::query(
        "INSERT INTO tasks (id, project_id, title, description, status, is_archived, assigned_to, created_by, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, 0, ?, ?, ?, ?)",
    )
    .bind(task_id)
    .bind(project_id)
    .bind(title)
    .bind(payload.description.as_deref().map(str::trim))
    .bind(TaskStatus::Pending.as_str())
    .bind(payload.assigned_to)
    .bind(actor.user_id)
    .bind(now)
    .bind(now)
    .execute(&state.pool)
    .await?;

    let task: Task = fetch_task(&state.pool, project_id, task_id).await?.try_into()?;
    Ok((StatusCode::CREATED, Json(task)))
}

/// Status, assignee and archive-flag changes all come through here; the
/// policy gate runs against the freshly fetched row before any write, and
/// status + archive land in one transaction so a rejected sub-step leaves
/// the task untouched.
#[utoipa::path(
    put,
    path = "/projects/{project_id}/tasks/{id}",
    tag = "Tasks",
    params(
        ("project_id" = Uuid, Path, description = "Project id"),
        ("id" = Uuid, Path, description = "Task id")
    ),
    request_body = TaskUpdateRequest,
    responses((status = 200, description = "Task updated", body = Task))
)]
pub async fn update_task(
    State(state): State<AppState>,
    actor: Actor,
    Path((project_id, id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<TaskUpdateRequest>,
) -> AppResult<Json<Task>> {
    let db_task = fetch_task(&state.pool, project_id, id).await?;

    let snapshot = TaskSnapshot {
        assigned_to: db_task.assigned_to,
        status: TaskStatus::parse(&db_task.status)?,
        is_archived: db_task.is_archived,
    };
    let change = TaskChange {
        status: payload.status,
        assigned_to: payload.assigned_to,
        archived: payload.archived,
    };

    policy::update_task(&actor, &snapshot, &change)?;

    if let Some(assignee) = change.assigned_to {
        if !is_member(&state.pool, project_id, assignee).await? {
            return Err(AppError::validation("assignee does not belong to the project"));
        }
    }

    let now = utc_now();
    let mut tx = state.pool.begin().await?;

    match change.archived {
        Some(true) => {
            // Status lands first, then the archive flag; DONE is coerced when
            // no explicit status was supplied.
            let target = change.target_status(snapshot.status);
            sqlx::query("UPDATE tasks SET status = ?, updated_at = ? WHERE id = ?")
                .bind(target.as_str())
                .bind(now)
                .bind(id)
                .execute(&mut *tx)
                .await?;
            sqlx::query("UPDATE tasks SET is_archived = 1, archived_at = ?, updated_at = ? WHERE id = ?")
                .bind(now)
                .bind(now)
                .bind(id)
                .execute(&mut *tx)
                .await?;
        }
        Some(false) => {
            sqlx::query(
                "UPDATE tasks SET is_archived = 0, archived_at = NULL, updated_at = ? WHERE id = ?",
            )
            .bind(now)
            .bind(id)
            .execute(&mut *tx)
            .await?;
        }
        None => {
            if let Some(status) = change.status {
                sqlx::query("UPDATE tasks SET status = ?, updated_at = ? WHERE id = ?")
                    .bind(status.as_str())
                    .bind(now)
                    .bind(id)
                    .execute(&mut *tx)
                    .await?;
            }
        }
    }

    if let Some(assignee) = change.assigned_to {
        sqlx::query("UPDATE tasks SET assigned_to = ?, updated_at = ? WHERE id = ?")
            .bind(assignee)
            .bind(now)
            .bind(id)
            .execute(&mut *tx)
            .await?;
    }

    tx.commit().await?;

    let task: Task = fetch_task(&state.pool, project_id, id).await?.try_into()?;
    Ok(Json(task))
}

#[utoipa::path(
    delete,
    path = "/projects/{project_id}/tasks/{id}",
    tag = "Tasks",
    params(
        ("project_id" = Uuid, Path, description = "Project id"),
        ("id" = Uuid, Path, description = "Task id")
    ),
    responses((status = 204, description = "Task deleted"))
)]
pub async fn delete_task(
    State(state): State<AppState>,
    actor: Actor,
    Path((project_id, id)): Path<(Uuid, Uuid)>,
) -> AppResult<StatusCode> {
    policy::delete_task(&actor)?;

    let _ = fetch_task(&state.pool, project_id, id).await?;

    sqlx::query("DELETE FROM tasks WHERE id = ?")
        .bind(id)
        .execute(&state.pool)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

async fn fetch_task(pool: &SqlitePool, project_id: Uuid, task_id: Uuid) -> AppResult<DbTask> {
    sqlx::query_as::<_, DbTask>(
        "SELECT id, project_id, title, description, status, is_archived, archived_at, assigned_to, created_by, created_at, updated_at \
         FROM tasks WHERE id = ? AND project_id = ?",
    )
    .bind(task_id)
    .bind(project_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::not_found("task not found"))
}
