use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::errors::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum TaskStatus {
    Pending,
    Reviewed,
    Done,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "PENDING",
            TaskStatus::Reviewed => "REVIEWED",
            TaskStatus::Done => "DONE",
        }
    }

    pub fn parse(value: &str) -> Result<Self, AppError> {
        match value {
            "PENDING" => Ok(TaskStatus::Pending),
            "REVIEWED" => Ok(TaskStatus::Reviewed),
            "DONE" => Ok(TaskStatus::Done),
            other => Err(AppError::internal(format!("unknown task status: {other}"))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Task {
    pub id: Uuid,
    pub project_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub is_archived: bool,
    pub archived_at: Option<DateTime<Utc>>,
    pub assigned_to: Uuid,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
pub struct DbTask {
    pub id: Uuid,
    pub project_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub status: String,
    pub is_archived: bool,
    pub archived_at: Option<DateTime<Utc>>,
    pub assigned_to: Uuid,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<DbTask> for Task {
    type Error = AppError;

    fn try_from(value: DbTask) -> Result<Self, Self::Error> {
        Ok(Task {
            id: value.id,
            project_id: value.project_id,
            title: value.title,
            description: value.description,
            status: TaskStatus::parse(&value.status)?,
            is_archived: value.is_archived,
            archived_at: value.archived_at,
            assigned_to: value.assigned_to,
            created_by: value.created_by,
            created_at: value.created_at,
            updated_at: value.updated_at,
        })
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct TaskCreateRequest {
    #[schema(example = "Review onboarding copy")]
    pub title: String,
    pub description: Option<String>,
    pub assigned_to: Uuid,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct TaskUpdateRequest {
    pub status: Option<TaskStatus>,
    pub assigned_to: Option<Uuid>,
    pub archived: Option<bool>,
}
