use std::sync::Arc;

use anyhow::{Context, Result};
use axum::body::{self, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use chrono::Utc;
use serde_json::{json, Value};
use sqlx::sqlite::SqliteConnectOptions;
use sqlx::SqlitePool;
use tempfile::{tempdir, TempDir};
use tower::util::ServiceExt; // for `oneshot`
use uuid::Uuid;

use teamhub::config::StorageConfig;
use teamhub::jwt::JwtConfig;
use teamhub::storage::LocalStorage;
use teamhub::AppState;

const PASSWORD: &str = "password123";

async fn setup() -> Result<(Router, SqlitePool, TempDir)> {
    let dir = tempdir().context("failed to create tempdir")?;
    let opts = SqliteConnectOptions::new()
        .filename(dir.path().join("test.db"))
        .create_if_missing(true)
        .foreign_keys(true);
    let pool = SqlitePool::connect_with(opts).await?;

    let migrator = sqlx::migrate::Migrator::new(
        std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("migrations"),
    )
    .await?;
    migrator.run(&pool).await?;

    // Explicit settings instead of process-global env, which concurrent
    // tests would race on.
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

    let app = teamhub::router(AppState::new(pool.clone(), jwt, storage));
    Ok((app, pool, dir))
}

async fn seed_user(pool: &SqlitePool, email: &str, role: &str, primary: bool) -> Result<Uuid> {
    let id = Uuid::new_v4();
    let hash = teamhub::utils::hash_password(PASSWORD)?;
    let now = Utc::now();
    sqlx::query(
        "INSERT INTO users (id, email, full_name, password_hash, role, is_primary_admin, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(id)
    .bind(email)
    .bind("Test User")
    .bind(hash)
    .bind(role)
    .bind(primary)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await?;
    Ok(id)
}

async fn request(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    payload: Option<Value>,
) -> Result<(StatusCode, Value)> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    let req = match payload {
        Some(value) => builder
            .header("content-type", "application/json")
            .body(Body::from(value.to_string()))?,
        None => builder.body(Body::empty())?,
    };

    let resp = app.clone().oneshot(req).await?;
    let status = resp.status();
    let bytes = body::to_bytes(resp.into_body(), 10_485_760).await?;
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes)?
    };
    Ok((status, value))
}

async fn login(app: &Router, email: &str) -> Result<String> {
    let (status, body) = request(
        app,
        "POST",
        "/auth/login",
        None,
        Some(json!({ "email": email, "password": PASSWORD })),
    )
    .await?;
    anyhow::ensure!(status == StatusCode::OK, "login failed: {status} - {body}");
    body["token"]
        .as_str()
        .map(str::to_string)
        .context("missing token")
}

#[tokio::test]
async fn collaborator_cannot_create_projects() -> Result<()> {
    let (app, pool, _dir) = setup().await?;
    seed_user(&pool, "collab@example.com", "COLLAB", false).await?;
    let token = login(&app, "collab@example.com").await?;

    let (status, _) = request(
        &app,
        "POST",
        "/projects",
        Some(&token),
        Some(json!({ "name": "Not Allowed" })),
    )
    .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    Ok(())
}

#[tokio::test]
async fn collaborator_cannot_manage_users() -> Result<()> {
    let (app, pool, _dir) = setup().await?;
    let collab_id = seed_user(&pool, "collab@example.com", "COLLAB", false).await?;
    let token = login(&app, "collab@example.com").await?;

    let (status, _) = request(&app, "GET", "/admin/users", Some(&token), None).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = request(
        &app,
        "POST",
        "/admin/users",
        Some(&token),
        Some(json!({
            "email": "x@example.com",
            "full_name": "X",
            "password": PASSWORD
        })),
    )
    .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = request(
        &app,
        "POST",
        "/admin/users/invite",
        Some(&token),
        Some(json!({
            "email": "y@example.com",
            "role": "COLLAB",
            "redirect_to": "https://app.example.com/welcome"
        })),
    )
    .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = request(
        &app,
        "PUT",
        &format!("/admin/users/{collab_id}/role"),
        Some(&token),
        Some(json!({ "role": "ADMIN" })),
    )
    .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    Ok(())
}

#[tokio::test]
async fn admin_creates_collaborator_account() -> Result<()> {
    let (app, pool, _dir) = setup().await?;
    seed_user(&pool, "admin@example.com", "ADMIN", true).await?;
    let token = login(&app, "admin@example.com").await?;

    let (status, user) = request(
        &app,
        "POST",
        "/admin/users",
        Some(&token),
        Some(json!({
            "email": "Grace@Example.com",
            "full_name": "Grace Hopper",
            "password": PASSWORD
        })),
    )
    .await?;
    assert_eq!(status, StatusCode::CREATED, "{user}");
    // Emails are normalized to lowercase.
    assert_eq!(user["email"], "grace@example.com");
    assert_eq!(user["role"], "COLLAB");

    // The new account can log in right away.
    login(&app, "grace@example.com").await?;

    // Same email again conflicts.
    let (status, _) = request(
        &app,
        "POST",
        "/admin/users",
        Some(&token),
        Some(json!({
            "email": "grace@example.com",
            "full_name": "Grace Hopper",
            "password": PASSWORD
        })),
    )
    .await?;
    assert_eq!(status, StatusCode::CONFLICT);

    Ok(())
}

#[tokio::test]
async fn collaborator_creation_validates_input() -> Result<()> {
    let (app, pool, _dir) = setup().await?;
    seed_user(&pool, "admin@example.com", "ADMIN", true).await?;
    let token = login(&app, "admin@example.com").await?;

    // Empty password is rejected before anything is written.
    let (status, _) = request(
        &app,
        "POST",
        "/admin/users",
        Some(&token),
        Some(json!({ "email": "a@example.com", "full_name": "A", "password": "" })),
    )
    .await?;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, _) = request(
        &app,
        "POST",
        "/admin/users",
        Some(&token),
        Some(json!({ "email": "", "full_name": "A", "password": PASSWORD })),
    )
    .await?;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    // Too-short passwords fail the hashing policy.
    let (status, _) = request(
        &app,
        "POST",
        "/admin/users",
        Some(&token),
        Some(json!({ "email": "a@example.com", "full_name": "A", "password": "short" })),
    )
    .await?;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let count: i64 = sqlx::query_scalar("SELECT COUNT(1) FROM users WHERE email = 'a@example.com'")
        .fetch_one(&pool)
        .await?;
    assert_eq!(count, 0);

    Ok(())
}

#[tokio::test]
async fn role_change_takes_effect_immediately() -> Result<()> {
    let (app, pool, _dir) = setup().await?;
    seed_user(&pool, "admin@example.com", "ADMIN", true).await?;
    let collab_id = seed_user(&pool, "collab@example.com", "COLLAB", false).await?;

    let admin_token = login(&app, "admin@example.com").await?;
    let collab_token = login(&app, "collab@example.com").await?;

    let (status, _) = request(
        &app,
        "POST",
        "/projects",
        Some(&collab_token),
        Some(json!({ "name": "Blocked" })),
    )
    .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, updated) = request(
        &app,
        "PUT",
        &format!("/admin/users/{collab_id}/role"),
        Some(&admin_token),
        Some(json!({ "role": "ADMIN" })),
    )
    .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["role"], "ADMIN");

    // The old token now carries the new role because the profile is
    // re-fetched on every request.
    let (status, _) = request(
        &app,
        "POST",
        "/projects",
        Some(&collab_token),
        Some(json!({ "name": "Allowed Now" })),
    )
    .await?;
    assert_eq!(status, StatusCode::CREATED);

    Ok(())
}

#[tokio::test]
async fn admin_lists_users_with_role_filter() -> Result<()> {
    let (app, pool, _dir) = setup().await?;
    seed_user(&pool, "admin@example.com", "ADMIN", true).await?;
    seed_user(&pool, "one@example.com", "COLLAB", false).await?;
    seed_user(&pool, "two@example.com", "COLLAB", false).await?;
    let token = login(&app, "admin@example.com").await?;

    let (status, all) = request(&app, "GET", "/admin/users", Some(&token), None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(all.as_array().map(Vec::len), Some(3));

    let (status, collabs) =
        request(&app, "GET", "/admin/users?role=COLLAB", Some(&token), None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(collabs.as_array().map(Vec::len), Some(2));

    Ok(())
}
