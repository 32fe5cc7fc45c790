use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use uuid::Uuid;

use crate::app::AppState;
use crate::authz::{policy, Actor};
use crate::errors::{AppError, AppResult};
use crate::models::member::{AssignMemberRequest, ProjectMember};
use crate::routes::{fetch_project, is_member};
use crate::utils::utc_now;

#[utoipa::path(
    get,
    path = "/projects/{project_id}/members",
    tag = "Members",
    params(("project_id" = Uuid, Path, description = "Project id")),
    responses((status = 200, description = "List members", body = [ProjectMember]))
)]
pub async fn list_members(
    State(state): State<AppState>,
    actor: Actor,
    Path(project_id): Path<Uuid>,
) -> AppResult<Json<Vec<ProjectMember>>> {
    let _ = fetch_project(&state.pool, project_id).await?;
    let member = is_member(&state.pool, project_id, actor.user_id).await?;
    policy::project_content(&actor, member)?;

    let members = sqlx::query_as::<_, ProjectMember>(
        "SELECT m.project_id, m.user_id, COALESCE(u.full_name, u.email) AS user_name, m.assigned_by, m.assigned_at \
         FROM project_members m \
         INNER JOIN users u ON u.id = m.user_id \
         WHERE m.project_id = ? \
         ORDER BY m.assigned_at ASC",
    )
    .bind(project_id)
    .fetch_all(&state.pool)
    .await?;

    Ok(Json(members))
}

#[utoipa::path(
    post,
    path = "/projects/{project_id}/members",
    tag = "Members",
    params(("project_id" = Uuid, Path, description = "Project id")),
    request_body = AssignMemberRequest,
    responses(
        (status = 201, description = "Member assigned"),
        (status = 409, description = "Already a member")
    )
)]
pub async fn assign_member(
    State(state): State<AppState>,
    actor: Actor,
    Path(project_id): Path<Uuid>,
    Json(payload): Json<AssignMemberRequest>,
) -> AppResult<StatusCode> {
    policy::members(&actor, policy::MemberAction::Assign)?;

    let _ = fetch_project(&state.pool, project_id).await?;

    let user_exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE id = ?)")
        .bind(payload.user_id)
        .fetch_one(&state.pool)
        .await?;
    if !user_exists {
        return Err(AppError::not_found("user not found"));
    }

    if is_member(&state.pool, project_id, payload.user_id).await? {
        return Err(AppError::conflict("user is already assigned to this project"));
    }

    sqlx::query(
        "INSERT INTO project_members (project_id, user_id, assigned_by, assigned_at) VALUES (?, ?, ?, ?)",
    )
    .bind(project_id)
    .bind(payload.user_id)
    .bind(actor.user_id)
    .bind(utc_now())
    .execute(&state.pool)
    .await?;

    Ok(StatusCode::CREATED)
}

#[utoipa::path(
    delete,
    path = "/projects/{project_id}/members/{user_id}",
    tag = "Members",
    params(
        ("project_id" = Uuid, Path, description = "Project id"),
        ("user_id" = Uuid, Path, description = "User id")
    ),
    responses((status = 204, description = "Member removed"))
)]
pub async fn remove_member(
    State(state): State<AppState>,
    actor: Actor,
    Path((project_id, user_id)): Path<(Uuid, Uuid)>,
) -> AppResult<StatusCode> {
    policy::members(&actor, policy::MemberAction::Remove)?;

    sqlx::query("DELETE FROM project_members WHERE project_id = ? AND user_id = ?")
        .bind(project_id)
        .bind(user_id)
        .execute(&state.pool)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}
