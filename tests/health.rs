use std::sync::Arc;

use anyhow::{Context, Result};
use axum::body::{self, Body};
use axum::http::{Request, StatusCode};
use sqlx::sqlite::SqliteConnectOptions;
use sqlx::SqlitePool;
use tempfile::tempdir;
use tower::util::ServiceExt; // for `oneshot`

use teamhub::config::StorageConfig;
use teamhub::jwt::JwtConfig;
use teamhub::storage::LocalStorage;
use teamhub::AppState;

#[tokio::test]
async fn health_endpoint_responds() -> Result<()> {
    let dir = tempdir().context("failed to create tempdir")?;
    let opts = SqliteConnectOptions::new()
        .filename(dir.path().join("test.db"))
        .create_if_missing(true);
    let pool = SqlitePool::connect_with(opts).await?;

    let migrator = sqlx::migrate::Migrator::new(
        std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("migrations"),
    )
    .await?;
    migrator.run(&pool).await?;

    let jwt = JwtConfig {
        secret: Arc::new(b"test-secret".to_vec()),
        exp_hours: 24,
    };
    let storage = LocalStorage::new(StorageConfig {
        root: dir.path().join("blobs"),
        bucket: "documents".to_string(),
        signed_url_ttl_secs: 900,
        signing_secret: b"test-signing-secret".to_vec(),
    });

    let app = teamhub::router(AppState::new(pool, jwt, storage));

    let req = Request::builder()
        .method("GET")
        .uri("/health")
        .body(Body::empty())?;

    let resp = app.oneshot(req).await?;
    assert_eq!(resp.status(), StatusCode::OK);

    let bytes = body::to_bytes(resp.into_body(), 1_048_576).await?;
    let value: serde_json::Value = serde_json::from_slice(&bytes)?;
    assert_eq!(value["status"], "ok");

    Ok(())
}
