use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Message {
    pub id: Uuid,
    pub project_id: Uuid,
    pub author_id: Uuid,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// Chat entry joined with the author's display name for listing.
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct MessageEntry {
    pub id: Uuid,
    pub project_id: Uuid,
    pub author_id: Uuid,
    pub author_name: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct MessageCreateRequest {
    #[schema(example = "Deploy is out, please verify")]
    pub content: String,
}
