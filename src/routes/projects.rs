use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use uuid::Uuid;

use crate::app::AppState;
use crate::authz::{policy, Actor};
use crate::errors::{AppError, AppResult};
use crate::models::project::{DbProject, Project, ProjectCreateRequest, ProjectUpdateRequest};
use crate::routes::{fetch_project, is_member};
use crate::storage::StorageService;
use crate::utils::utc_now;

#[utoipa::path(
    get,
    path = "/projects",
    tag = "Projects",
    responses((status = 200, description = "List projects", body = [Project]))
)]
pub async fn list_projects(State(state): State<AppState>, actor: Actor) -> AppResult<Json<Vec<Project>>> {
    // Admins see every project; collaborators only the ones they belong to.
    let rows = if actor.is_admin() {
        sqlx::query_as::<_, DbProject>(
            "SELECT id, name, description, created_by, created_at, updated_at FROM projects ORDER BY created_at DESC",
        )
        .fetch_all(&state.pool)
        .await?
    } else {
        sqlx::query_as::<_, DbProject>(
            "SELECT p.id, p.name, p.description, p.created_by, p.created_at, p.updated_at \
             FROM projects p \
             INNER JOIN project_members m ON m.project_id = p.id \
             WHERE m.user_id = ? \
             ORDER BY p.created_at DESC",
        )
        .bind(actor.user_id)
        .fetch_all(&state.pool)
        .await?
    };

    let projects: Vec<Project> = rows.into_iter().map(Project::try_from).collect::<Result<_, _>>()?;
    Ok(Json(projects))
}

/// Creating a project also enrolls the creator as its first member, in the
/// same transaction.
#[utoipa::path(
    post,
    path = "/projects",
    tag = "Projects",
    request_body = ProjectCreateRequest,
    responses((status = 201, description = "Project created", body = Project))
)]
pub async fn create_project(
    State(state): State<AppState>,
    actor: Actor,
    Json(payload): Json<ProjectCreateRequest>,
) -> AppResult<(StatusCode, Json<Project>)> {
    policy::projects(&actor, policy::ProjectAction::Create)?;

    let name = payload.name.trim();
    if name.is_empty() {
        return Err(AppError::validation("project name is required"));
    }

    let now = utc_now();
    let project_id = Uuid::new_v4();

    let mut tx = state.pool.begin().await?;

    sqlx::query(
        "INSERT INTO projects (id, name, description, created_by, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(project_id)
    .bind(name)
    .bind(&payload.description)
    .bind(actor.user_id)
    .bind(now)
    .bind(now)
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        "INSERT INTO project_members (project_id, user_id, assigned_by, assigned_at) VALUES (?, ?, ?, ?)",
    )
    .bind(project_id)
    .bind(actor.user_id)
    .bind(actor.user_id)
    .bind(now)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    let project: Project = fetch_project(&state.pool, project_id).await?.try_into()?;
    Ok((StatusCode::CREATED, Json(project)))
}

#[utoipa::path(
    get,
    path = "/projects/{id}",
    tag = "Projects",
    params(("id" = Uuid, Path, description = "Project id")),
    responses((status = 200, description = "Project detail", body = Project))
)]
pub async fn get_project(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Project>> {
    let project = fetch_project(&state.pool, id).await?;
    let member = is_member(&state.pool, id, actor.user_id).await?;
    policy::project_content(&actor, member)?;

    let project: Project = project.try_into()?;
    Ok(Json(project))
}

#[utoipa::path(
    put,
    path = "/projects/{id}",
    tag = "Projects",
    params(("id" = Uuid, Path, description = "Project id")),
    request_body = ProjectUpdateRequest,
    responses((status = 200, description = "Project updated", body = Project))
)]
pub async fn update_project(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
    Json(payload): Json<ProjectUpdateRequest>,
) -> AppResult<Json<Project>> {
    policy::projects(&actor, policy::ProjectAction::Update)?;

    let mut project = fetch_project(&state.pool, id).await?;

    if let Some(name) = payload.name.as_ref() {
        if name.trim().is_empty() {
            return Err(AppError::validation("project name cannot be empty"));
        }
        project.name = name.trim().to_string();
    }
    if payload.description.is_some() {
        project.description = payload.description.clone();
    }

    let now = utc_now();

    sqlx::query("UPDATE projects SET name = ?, description = ?, updated_at = ? WHERE id = ?")
        .bind(&project.name)
        .bind(&project.description)
        .bind(now)
        .bind(project.id)
        .execute(&state.pool)
        .await?;

    project.updated_at = now;
    let project: Project = project.try_into()?;
    Ok(Json(project))
}

#[utoipa::path(
    delete,
    path = "/projects/{id}",
    tag = "Projects",
    params(("id" = Uuid, Path, description = "Project id")),
    responses((status = 204, description = "Project deleted"))
)]
pub async fn delete_project(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    policy::projects(&actor, policy::ProjectAction::Delete)?;

    let _ = fetch_project(&state.pool, id).await?;

    // Row deletion cascades to members, tasks, notes, messages and document
    // metadata; blobs are cleaned up best-effort afterwards.
    let blob_paths: Vec<String> =
        sqlx::query_scalar("SELECT storage_path FROM documents WHERE project_id = ?")
            .bind(id)
            .fetch_all(&state.pool)
            .await?;

    sqlx::query("DELETE FROM projects WHERE id = ?")
        .bind(id)
        .execute(&state.pool)
        .await?;

    for path in blob_paths {
        if let Err(err) = state.storage.remove(&path).await {
            tracing::warn!(%path, "failed to remove document blob: {err}");
        }
    }

    Ok(StatusCode::NO_CONTENT)
}
