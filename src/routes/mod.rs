pub mod auth;
pub mod documents;
pub mod files;
pub mod health;
pub mod members;
pub mod messages;
pub mod notes;
pub mod personal_notes;
pub mod projects;
pub mod tasks;
pub mod users;

use sqlx::SqlitePool;
use uuid::Uuid;

use crate::errors::{AppError, AppResult};
use crate::models::project::DbProject;

/// Fetches the project or fails NotFound. Always called right before a
/// permission check so decisions never run against stale state.
pub(crate) async fn fetch_project(pool: &SqlitePool, project_id: Uuid) -> AppResult<DbProject> {
    sqlx::query_as::<_, DbProject>(
        "SELECT id, name, description, created_by, created_at, updated_at FROM projects WHERE id = ?",
    )
    .bind(project_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::not_found("project not found"))
}

pub(crate) async fn is_member(pool: &SqlitePool, project_id: Uuid, user_id: Uuid) -> AppResult<bool> {
    let exists: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM project_members WHERE project_id = ? AND user_id = ?)",
    )
    .bind(project_id)
    .bind(user_id)
    .fetch_one(pool)
    .await?;

    Ok(exists)
}
