use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::app::AppState;
use crate::errors::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    Admin,
    Collab,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "ADMIN",
            Role::Collab => "COLLAB",
        }
    }

    pub fn parse(value: &str) -> Result<Self, AppError> {
        match value {
            "ADMIN" => Ok(Role::Admin),
            "COLLAB" => Ok(Role::Collab),
            other => Err(AppError::internal(format!("unknown role: {other}"))),
        }
    }
}

/// The authenticated principal. Resolved once per request by decoding the
/// bearer token and re-fetching the stored profile, so the role and
/// primary-admin bit are always current — a token minted before a role
/// change carries no stale authority.
#[derive(Debug, Clone, Copy)]
pub struct Actor {
    pub user_id: Uuid,
    pub role: Role,
    pub is_primary_admin: bool,
}

impl Actor {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ProfileRow {
    role: String,
    is_primary_admin: bool,
}

#[async_trait]
impl FromRequestParts<AppState> for Actor {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .ok_or_else(|| AppError::unauthorized("Authorization header missing"))?;

        let claims = state.jwt.decode(token)?;

        let profile = sqlx::query_as::<_, ProfileRow>(
            "SELECT role, is_primary_admin FROM users WHERE id = ? AND password_hash IS NOT NULL",
        )
        .bind(claims.sub)
        .fetch_optional(&state.pool)
        .await?
        .ok_or_else(|| AppError::unauthorized("no matching profile"))?;

        Ok(Actor {
            user_id: claims.sub,
            role: Role::parse(&profile.role)?,
            is_primary_admin: profile.is_primary_admin,
        })
    }
}
