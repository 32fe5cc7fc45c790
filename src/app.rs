use std::sync::Arc;

use axum::http::Method;
use axum::routing::{delete, get, post, put};
use axum::Router;
use sqlx::SqlitePool;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::StorageConfig;
use crate::errors::AppError;
use crate::jwt::JwtConfig;
use crate::routes::{
    auth, documents, files, health, members, messages, notes, personal_notes, projects, tasks,
    users,
};
use crate::storage::LocalStorage;

#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub jwt: Arc<JwtConfig>,
    pub storage: Arc<LocalStorage>,
}

impl AppState {
    pub fn new(pool: SqlitePool, jwt: JwtConfig, storage: LocalStorage) -> Self {
        Self {
            pool,
            jwt: Arc::new(jwt),
            storage: Arc::new(storage),
        }
    }
}

pub async fn create_app(pool: SqlitePool) -> Result<Router, AppError> {
    let jwt_config = JwtConfig::from_env()?;
    let storage = LocalStorage::new(StorageConfig::from_env()?);
    Ok(router(AppState::new(pool, jwt_config, storage)))
}

/// Builds the router for an already-assembled state, so callers that do not
/// configure through the environment can pass their settings directly.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_origin(Any)
        .allow_headers(Any);

    let auth_routes = Router::new()
        .route("/login", post(auth::login))
        .route("/accept-invite", post(auth::accept_invite))
        .route("/me", get(auth::me))
        .route("/logout", post(auth::logout));

    let user_routes = Router::new()
        .route("/", get(users::list_users))
        .route("/", post(users::create_collaborator))
        .route("/invite", post(users::invite_user))
        .route("/:id/role", put(users::update_role));

    let project_routes = Router::new()
        .route("/", get(projects::list_projects))
        .route("/", post(projects::create_project))
        .route("/:id", get(projects::get_project))
        .route("/:id", put(projects::update_project))
        .route("/:id", delete(projects::delete_project));

    // Everything below is scoped to a project: /projects/:project_id/...
    let member_routes = Router::new()
        .route("/", get(members::list_members))
        .route("/", post(members::assign_member))
        .route("/:user_id", delete(members::remove_member));

    let task_routes = Router::new()
        .route("/", get(tasks::list_tasks))
        .route("/", post(tasks::create_task))
        .route("/:id", put(tasks::update_task))
        .route("/:id", delete(tasks::delete_task));

    let note_routes = Router::new()
        .route("/", get(notes::list_notes))
        .route("/", post(notes::create_note))
        .route("/:id", put(notes::update_note))
        .route("/:id", delete(notes::delete_note));

    let message_routes = Router::new()
        .route("/", get(messages::list_messages))
        .route("/", post(messages::post_message))
        .route("/", delete(messages::clear_messages));

    let document_routes = Router::new()
        .route("/", get(documents::list_documents))
        .route("/", post(documents::upload_document))
        .route("/:id", delete(documents::delete_document));

    let personal_note_routes = Router::new()
        .route("/", get(personal_notes::list_personal_notes))
        .route("/", post(personal_notes::create_personal_note))
        .route("/:id", put(personal_notes::update_personal_note))
        .route("/:id", delete(personal_notes::delete_personal_note));

    Router::new()
        .route("/health", get(health::health))
        .nest("/auth", auth_routes)
        .nest("/admin/users", user_routes)
        .nest("/projects", project_routes)
        .nest("/projects/:project_id/members", member_routes)
        .nest("/projects/:project_id/tasks", task_routes)
        .nest("/projects/:project_id/notes", note_routes)
        .nest("/projects/:project_id/messages", message_routes)
        .nest("/projects/:project_id/documents", document_routes)
        .nest("/personal-notes", personal_note_routes)
        // Signed downloads carry their credential in the query string.
        .route("/files/*path", get(files::download_file))
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
