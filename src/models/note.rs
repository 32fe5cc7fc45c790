use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Note {
    pub id: Uuid,
    pub project_id: Uuid,
    pub author_id: Uuid,
    pub title: Option<String>,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct NoteCreateRequest {
    pub title: Option<String>,
    #[schema(example = "Sprint retro takeaways")]
    pub content: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct NoteUpdateRequest {
    pub title: Option<String>,
    pub content: Option<String>,
}
