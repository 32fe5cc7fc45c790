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

/// Primary admin, a second non-primary admin and two collaborators, all
/// members of one project.
struct Fixture {
    app: Router,
    primary_token: String,
    admin_token: String,
    author_token: String,
    other_token: String,
    project_id: String,
}

async fn fixture(pool: &SqlitePool, app: Router) -> Result<Fixture> {
    seed_user(pool, "primary@example.com", "ADMIN", true).await?;
    let admin_id = seed_user(pool, "admin@example.com", "ADMIN", false).await?;
    let author_id = seed_user(pool, "author@example.com", "COLLAB", false).await?;
    let other_id = seed_user(pool, "other@example.com", "COLLAB", false).await?;

    let primary_token = login(&app, "primary@example.com").await?;
    let admin_token = login(&app, "admin@example.com").await?;
    let author_token = login(&app, "author@example.com").await?;
    let other_token = login(&app, "other@example.com").await?;

    let (status, project) = request(
        &app,
        "POST",
        "/projects",
        Some(&primary_token),
        Some(json!({ "name": "Rollout" })),
    )
    .await?;
    anyhow::ensure!(status == StatusCode::CREATED, "{project}");
    let project_id = project["id"].as_str().context("missing project id")?.to_string();

    for user_id in [admin_id, author_id, other_id] {
        let (status, _) = request(
            &app,
            "POST",
            &format!("/projects/{project_id}/members"),
            Some(&primary_token),
            Some(json!({ "user_id": user_id })),
        )
        .await?;
        anyhow::ensure!(status == StatusCode::CREATED);
    }

    Ok(Fixture {
        app,
        primary_token,
        admin_token,
        author_token,
        other_token,
        project_id,
    })
}

async fn create_note(fx: &Fixture) -> Result<String> {
    let (status, note) = request(
        &fx.app,
        "POST",
        &format!("/projects/{}/notes", fx.project_id),
        Some(&fx.author_token),
        Some(json!({ "title": "Meeting", "content": "Decisions from standup" })),
    )
    .await?;
    anyhow::ensure!(status == StatusCode::CREATED, "note create failed: {status} - {note}");
    note["id"].as_str().map(str::to_string).context("missing note id")
}

#[tokio::test]
async fn members_share_notes() -> Result<()> {
    let (app, pool, _dir) = setup().await?;
    let fx = fixture(&pool, app).await?;
    create_note(&fx).await?;

    // Every member sees the note, including admins.
    for token in [&fx.other_token, &fx.admin_token] {
        let (status, notes) = request(
            &fx.app,
            "GET",
            &format!("/projects/{}/notes", fx.project_id),
            Some(token),
            None,
        )
        .await?;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(notes.as_array().map(Vec::len), Some(1));
    }

    // Empty content is rejected.
    let (status, _) = request(
        &fx.app,
        "POST",
        &format!("/projects/{}/notes", fx.project_id),
        Some(&fx.author_token),
        Some(json!({ "content": "   " })),
    )
    .await?;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    Ok(())
}

#[tokio::test]
async fn only_the_author_updates_a_note() -> Result<()> {
    let (app, pool, _dir) = setup().await?;
    let fx = fixture(&pool, app).await?;
    let note_id = create_note(&fx).await?;
    let uri = format!("/projects/{}/notes/{note_id}", fx.project_id);

    let (status, note) = request(
        &fx.app,
        "PUT",
        &uri,
        Some(&fx.author_token),
        Some(json!({ "content": "Revised decisions" })),
    )
    .await?;
    assert_eq!(status, StatusCode::OK, "{note}");
    assert_eq!(note["content"], "Revised decisions");

    // Neither another member nor an admin may edit someone else's note.
    for token in [&fx.other_token, &fx.admin_token, &fx.primary_token] {
        let (status, _) = request(
            &fx.app,
            "PUT",
            &uri,
            Some(token),
            Some(json!({ "content": "Hijacked" })),
        )
        .await?;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    Ok(())
}

#[tokio::test]
async fn note_deletion_is_author_or_primary_admin() -> Result<()> {
    let (app, pool, _dir) = setup().await?;
    let fx = fixture(&pool, app).await?;

    let note_id = create_note(&fx).await?;
    let uri = format!("/projects/{}/notes/{note_id}", fx.project_id);

    // Another member and a non-primary admin are both refused.
    for token in [&fx.other_token, &fx.admin_token] {
        let (status, _) = request(&fx.app, "DELETE", &uri, Some(token), None).await?;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    let (status, _) = request(&fx.app, "DELETE", &uri, Some(&fx.author_token), None).await?;
    assert_eq!(status, StatusCode::NO_CONTENT);

    // The primary admin can moderate notes it did not write.
    let note_id = create_note(&fx).await?;
    let uri = format!("/projects/{}/notes/{note_id}", fx.project_id);
    let (status, _) = request(&fx.app, "DELETE", &uri, Some(&fx.primary_token), None).await?;
    assert_eq!(status, StatusCode::NO_CONTENT);

    Ok(())
}

#[tokio::test]
async fn personal_notes_are_private() -> Result<()> {
    let (app, pool, _dir) = setup().await?;
    let fx = fixture(&pool, app).await?;

    let (status, note) = request(
        &fx.app,
        "POST",
        "/personal-notes",
        Some(&fx.author_token),
        Some(json!({ "title": "Scratch", "content": "Remember the milk" })),
    )
    .await?;
    assert_eq!(status, StatusCode::CREATED, "{note}");
    let note_id = note["id"].as_str().context("missing note id")?.to_string();

    // Listing only ever returns the caller's own notes, admins included.
    let (status, notes) = request(&fx.app, "GET", "/personal-notes", Some(&fx.primary_token), None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(notes.as_array().map(Vec::len), Some(0));

    let (status, notes) = request(&fx.app, "GET", "/personal-notes", Some(&fx.author_token), None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(notes.as_array().map(Vec::len), Some(1));

    // Updates and deletes by anyone else are refused, primary admin included.
    let uri = format!("/personal-notes/{note_id}");
    for token in [&fx.other_token, &fx.admin_token, &fx.primary_token] {
        let (status, _) = request(
            &fx.app,
            "PUT",
            &uri,
            Some(token),
            Some(json!({ "content": "Not yours" })),
        )
        .await?;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, _) = request(&fx.app, "DELETE", &uri, Some(token), None).await?;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    let (status, updated) = request(
        &fx.app,
        "PUT",
        &uri,
        Some(&fx.author_token),
        Some(json!({ "content": "Remember the milk and eggs" })),
    )
    .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["content"], "Remember the milk and eggs");

    let (status, _) = request(&fx.app, "DELETE", &uri, Some(&fx.author_token), None).await?;
    assert_eq!(status, StatusCode::NO_CONTENT);

    Ok(())
}

#[tokio::test]
async fn personal_note_requires_title_and_content() -> Result<()> {
    let (app, pool, _dir) = setup().await?;
    let fx = fixture(&pool, app).await?;

    let (status, _) = request(
        &fx.app,
        "POST",
        "/personal-notes",
        Some(&fx.author_token),
        Some(json!({ "title": "", "content": "body" })),
    )
    .await?;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, _) = request(
        &fx.app,
        "POST",
        "/personal-notes",
        Some(&fx.author_token),
        Some(json!({ "title": "head", "content": "  " })),
    )
    .await?;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    Ok(())
}
