use axum::extract::{Path, Query, State};
use axum::http::header;
use axum::response::IntoResponse;
use serde::Deserialize;

use crate::app::AppState;
use crate::errors::{AppError, AppResult};

#[derive(Debug, Deserialize)]
pub struct SignedUrlParams {
    pub expires: i64,
    pub sig: String,
}

/// Redeems a signed download URL. No bearer token here: the signature is
/// the credential, which lets browsers load documents directly.
#[utoipa::path(
    get,
    path = "/files/{path}",
    tag = "Files",
    params(
        ("path" = String, Path, description = "Storage path of the blob"),
        ("expires" = i64, Query, description = "Unix expiry timestamp"),
        ("sig" = String, Query, description = "Hex-encoded signature")
    ),
    responses(
        (status = 200, description = "Blob contents"),
        (status = 403, description = "Signature invalid or expired"),
        (status = 404, description = "Blob not found")
    )
)]
pub async fn download_file(
    State(state): State<AppState>,
    Path(path): Path<String>,
    Query(params): Query<SignedUrlParams>,
) -> AppResult<impl IntoResponse> {
    state.storage.verify(&path, params.expires, &params.sig)?;

    let full = state.storage.blob_path(&path)?;
    let bytes = tokio::fs::read(&full)
        .await
        .map_err(|_| AppError::not_found("file not found"))?;

    let mime_type: Option<String> =
        sqlx::query_scalar("SELECT mime_type FROM documents WHERE storage_path = ?")
            .bind(&path)
            .fetch_optional(&state.pool)
            .await?;
    let content_type = mime_type.unwrap_or_else(|| "application/octet-stream".to_string());

    Ok(([(header::CONTENT_TYPE, content_type)], bytes))
}
