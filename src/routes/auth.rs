use axum::extract::State;
use axum::Json;
use serde::Serialize;
use sqlx::SqlitePool;

use crate::app::AppState;
use crate::authz::Actor;
use crate::errors::{AppError, AppResult};
use crate::models::user::{AcceptInviteRequest, AuthResponse, DbUser, LoginRequest, User};
use crate::utils::{hash_password, utc_now, verify_password};

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    message: String,
}

#[utoipa::path(
    post,
    path = "/auth/login",
    tag = "Auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = AuthResponse),
        (status = 401, description = "Invalid credentials")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> AppResult<Json<AuthResponse>> {
    let db_user = fetch_user_by_email(&state.pool, &payload.email)
        .await?
        .ok_or_else(|| AppError::unauthorized("invalid credentials"))?;

    let password_hash = db_user
        .password_hash
        .clone()
        .ok_or_else(|| AppError::unauthorized("invalid credentials"))?;

    if !verify_password(&payload.password, &password_hash)? {
        return Err(AppError::unauthorized("invalid credentials"));
    }

    let token = state.jwt.encode(db_user.id)?;
    let user: User = db_user.try_into()?;

    Ok(Json(AuthResponse { token, user }))
}

#[utoipa::path(
    get,
    path = "/auth/me",
    tag = "Auth",
    responses((status = 200, description = "Current user", body = User))
)]
pub async fn me(State(state): State<AppState>, actor: Actor) -> AppResult<Json<User>> {
    let db_user = sqlx::query_as::<_, DbUser>(
        "SELECT id, email, full_name, password_hash, role, is_primary_admin, invite_token, created_at, updated_at FROM users WHERE id = ?",
    )
    .bind(actor.user_id)
    .fetch_optional(&state.pool)
    .await?
    .ok_or_else(|| AppError::not_found("user not found"))?;

    let user: User = db_user.try_into()?;
    Ok(Json(user))
}

#[utoipa::path(
    post,
    path = "/auth/logout",
    tag = "Auth",
    responses((status = 200, description = "Logout acknowledged"))
)]
pub async fn logout(_actor: Actor) -> AppResult<Json<MessageResponse>> {
    Ok(Json(MessageResponse {
        message: "Logged out".to_string(),
    }))
}

/// Completes the invite flow: the token is single use, and the account has
/// no password (and so cannot authenticate) until this succeeds.
#[utoipa::path(
    post,
    path = "/auth/accept-invite",
    tag = "Auth",
    request_body = AcceptInviteRequest,
    responses(
        (status = 200, description = "Invite accepted", body = AuthResponse),
        (status = 404, description = "Unknown or already used token")
    )
)]
pub async fn accept_invite(
    State(state): State<AppState>,
    Json(payload): Json<AcceptInviteRequest>,
) -> AppResult<Json<AuthResponse>> {
    if payload.full_name.trim().is_empty() {
        return Err(AppError::validation("full name is required"));
    }

    let db_user = sqlx::query_as::<_, DbUser>(
        "SELECT id, email, full_name, password_hash, role, is_primary_admin, invite_token, created_at, updated_at FROM users WHERE invite_token = ?",
    )
    .bind(&payload.token)
    .fetch_optional(&state.pool)
    .await?
    .ok_or_else(|| AppError::not_found("invite not found"))?;

    let password_hash = hash_password(&payload.password)?;
    let now = utc_now();

    sqlx::query(
        "UPDATE users SET password_hash = ?, full_name = ?, invite_token = NULL, updated_at = ? WHERE id = ?",
    )
    .bind(&password_hash)
    .bind(payload.full_name.trim())
    .bind(now)
    .bind(db_user.id)
    .execute(&state.pool)
    .await?;

    let token = state.jwt.encode(db_user.id)?;
    let user = User {
        full_name: Some(payload.full_name.trim().to_string()),
        updated_at: now,
        ..db_user.try_into()?
    };

    Ok(Json(AuthResponse { token, user }))
}

async fn fetch_user_by_email(pool: &SqlitePool, email: &str) -> AppResult<Option<DbUser>> {
    let user = sqlx::query_as::<_, DbUser>(
        "SELECT id, email, full_name, password_hash, role, is_primary_admin, invite_token, created_at, updated_at FROM users WHERE email = ?",
    )
    .bind(email)
    .fetch_optional(pool)
    .await?;

    Ok(user)
}
