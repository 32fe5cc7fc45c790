use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::app::AppState;
use crate::authz::{policy, Actor, Role};
use crate::errors::{AppError, AppResult};
use crate::models::user::{
    CreateCollaboratorRequest, DbUser, InviteResponse, InviteUserRequest, UpdateRoleRequest, User,
};
use crate::utils::{hash_password, utc_now};

#[derive(Debug, Deserialize)]
pub struct UserListQuery {
    pub role: Option<Role>,
}

#[utoipa::path(
    get,
    path = "/admin/users",
    tag = "Users",
    params(("role" = Option<Role>, Query, description = "Filter by role")),
    responses((status = 200, description = "List users", body = [User]))
)]
pub async fn list_users(
    State(state): State<AppState>,
    actor: Actor,
    Query(query): Query<UserListQuery>,
) -> AppResult<Json<Vec<User>>> {
    policy::manage_users(&actor)?;

    let rows = match query.role {
        Some(role) => {
            sqlx::query_as::<_, DbUser>(
                "SELECT id, email, full_name, password_hash, role, is_primary_admin, invite_token, created_at, updated_at FROM users WHERE role = ? ORDER BY created_at ASC",
            )
            .bind(role.as_str())
            .fetch_all(&state.pool)
            .await?
        }
        None => {
            sqlx::query_as::<_, DbUser>(
                "SELECT id, email, full_name, password_hash, role, is_primary_admin, invite_token, created_at, updated_at FROM users ORDER BY created_at ASC",
            )
            .fetch_all(&state.pool)
            .await?
        }
    };

    let users: Vec<User> = rows.into_iter().map(User::try_from).collect::<Result<_, _>>()?;
    Ok(Json(users))
}

/// Direct account creation: the collaborator can log in immediately.
#[utoipa::path(
    post,
    path = "/admin/users",
    tag = "Users",
    request_body = CreateCollaboratorRequest,
    responses(
        (status = 201, description = "Collaborator created", body = User),
        (status = 409, description = "Email already in use")
    )
)]
pub async fn create_collaborator(
    State(state): State<AppState>,
    actor: Actor,
    Json(payload): Json<CreateCollaboratorRequest>,
) -> AppResult<(StatusCode, Json<User>)> {
    policy::manage_users(&actor)?;

    let email = payload.email.trim().to_lowercase();
    if email.is_empty() {
        return Err(AppError::validation("email is required"));
    }
    if payload.password.trim().is_empty() {
        return Err(AppError::validation("password is required"));
    }

    ensure_email_available(&state.pool, &email).await?;

    let password_hash = hash_password(&payload.password)?;
    let now = utc_now();
    let user_id = Uuid::new_v4();

    sqlx::query(
        "INSERT INTO users (id, email, full_name, password_hash, role, is_primary_admin, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, 0, ?, ?)",
    )
    .bind(user_id)
    .bind(&email)
    .bind(payload.full_name.trim())
    .bind(&password_hash)
    .bind(Role::Collab.as_str())
    .bind(now)
    .bind(now)
    .execute(&state.pool)
    .await?;

    let user: User = fetch_user(&state.pool, user_id).await?.try_into()?;
    Ok((StatusCode::CREATED, Json(user)))
}

/// Invite flow: creates a passwordless account holding a single-use token.
/// Delivering the accept URL to the invitee (email etc.) is up to the
/// caller; this endpoint only returns it.
#[utoipa::path(
    post,
    path = "/admin/users/invite",
    tag = "Users",
    request_body = InviteUserRequest,
    responses(
        (status = 201, description = "Invite issued", body = InviteResponse),
        (status = 409, description = "Email already in use")
    )
)]
pub async fn invite_user(
    State(state): State<AppState>,
    actor: Actor,
    Json(payload): Json<InviteUserRequest>,
) -> AppResult<(StatusCode, Json<InviteResponse>)> {
    policy::manage_users(&actor)?;

    let email = payload.email.trim().to_lowercase();
    if email.is_empty() {
        return Err(AppError::validation("email is required"));
    }
    if payload.redirect_to.trim().is_empty() {
        return Err(AppError::validation("redirect url is required"));
    }

    ensure_email_available(&state.pool, &email).await?;

    let now = utc_now();
    let user_id = Uuid::new_v4();
    let invite_token = Uuid::new_v4().simple().to_string();

    sqlx::query(
        "INSERT INTO users (id, email, role, is_primary_admin, invite_token, created_at, updated_at) \
         VALUES (?, ?, ?, 0, ?, ?, ?)",
    )
    .bind(user_id)
    .bind(&email)
    .bind(payload.role.as_str())
    .bind(&invite_token)
    .bind(now)
    .bind(now)
    .execute(&state.pool)
    .await?;

    let accept_url = format!("{}?token={}", payload.redirect_to.trim_end_matches('/'), invite_token);

    Ok((StatusCode::CREATED, Json(InviteResponse { user_id, accept_url })))
}

#[utoipa::path(
    put,
    path = "/admin/users/{id}/role",
    tag = "Users",
    params(("id" = Uuid, Path, description = "User id")),
    request_body = UpdateRoleRequest,
    responses((status = 200, description = "Role updated", body = User))
)]
pub async fn update_role(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateRoleRequest>,
) -> AppResult<Json<User>> {
    policy::manage_users(&actor)?;

    let _ = fetch_user(&state.pool, id).await?;

    sqlx::query("UPDATE users SET role = ?, updated_at = ? WHERE id = ?")
        .bind(payload.role.as_str())
        .bind(utc_now())
        .bind(id)
        .execute(&state.pool)
        .await?;

    let user: User = fetch_user(&state.pool, id).await?.try_into()?;
    Ok(Json(user))
}

async fn ensure_email_available(pool: &SqlitePool, email: &str) -> AppResult<()> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(1) FROM users WHERE email = ?")
        .bind(email)
        .fetch_one(pool)
        .await?;

    if count > 0 {
        return Err(AppError::conflict("email already in use"));
    }

    Ok(())
}

async fn fetch_user(pool: &SqlitePool, user_id: Uuid) -> AppResult<DbUser> {
    sqlx::query_as::<_, DbUser>(
        "SELECT id, email, full_name, password_hash, role, is_primary_admin, invite_token, created_at, updated_at FROM users WHERE id = ?",
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::not_found("user not found"))
}
