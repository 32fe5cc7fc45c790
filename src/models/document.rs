use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Document {
    pub id: Uuid,
    pub project_id: Uuid,
    pub author_id: Uuid,
    pub storage_path: String,
    pub original_name: String,
    pub description: String,
    pub mime_type: String,
    pub size_bytes: i64,
    pub created_at: DateTime<Utc>,
    /// Time-limited download URL, filled in by list/create responses.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signed_url: Option<String>,
}

#[derive(Debug, Clone, FromRow)]
pub struct DbDocument {
    pub id: Uuid,
    pub project_id: Uuid,
    pub author_id: Uuid,
    pub storage_path: String,
    pub original_name: String,
    pub description: String,
    pub mime_type: String,
    pub size_bytes: i64,
    pub created_at: DateTime<Utc>,
}

impl From<DbDocument> for Document {
    fn from(value: DbDocument) -> Self {
        Document {
            id: value.id,
            project_id: value.project_id,
            author_id: value.author_id,
            storage_path: value.storage_path,
            original_name: value.original_name,
            description: value.description,
            mime_type: value.mime_type,
            size_bytes: value.size_bytes,
            created_at: value.created_at,
            signed_url: None,
        }
    }
}
