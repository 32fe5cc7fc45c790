use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::authz::Role;
use crate::models;
use crate::routes;

#[derive(OpenApi)]
#[openapi(
    paths(
        routes::health::health,
        routes::auth::login,
        routes::auth::accept_invite,
        routes::auth::me,
        routes::auth::logout,
        routes::users::list_users,
        routes::users::create_collaborator,
        routes::users::invite_user,
        routes::users::update_role,
        routes::projects::list_projects,
        routes::projects::create_project,
        routes::projects::get_project,
        routes::projects::update_project,
        routes::projects::delete_project,
        routes::members::list_members,
        routes::members::assign_member,
        routes::members::remove_member,
        routes::tasks::list_tasks,
        routes::tasks::create_task,
        routes::tasks::update_task,
        routes::tasks::delete_task,
        routes::notes::list_notes,
        routes::notes::create_note,
        routes::notes::update_note,
        routes::notes::delete_note,
        routes::personal_notes::list_personal_notes,
        routes::personal_notes::create_personal_note,
        routes::personal_notes::update_personal_note,
        routes::personal_notes::delete_personal_note,
        routes::messages::list_messages,
        routes::messages::post_message,
        routes::messages::clear_messages,
        routes::documents::list_documents,
        routes::documents::upload_document,
        routes::documents::delete_document,
        routes::files::download_file,
    ),
    components(
        schemas(
            Role,
            models::user::User,
            models::user::AuthResponse,
            models::user::LoginRequest,
            models::user::AcceptInviteRequest,
            models::user::CreateCollaboratorRequest,
            models::user::InviteUserRequest,
            models::user::InviteResponse,
            models::user::UpdateRoleRequest,
            models::project::Project,
            models::project::ProjectCreateRequest,
            models::project::ProjectUpdateRequest,
            models::member::ProjectMember,
            models::member::AssignMemberRequest,
            models::task::Task,
            models::task::TaskStatus,
            models::task::TaskCreateRequest,
            models::task::TaskUpdateRequest,
            models::note::Note,
            models::note::NoteCreateRequest,
            models::note::NoteUpdateRequest,
            models::personal_note::PersonalNote,
            models::personal_note::PersonalNoteCreateRequest,
            models::personal_note::PersonalNoteUpdateRequest,
            models::message::Message,
            models::message::MessageEntry,
            models::message::MessageCreateRequest,
            models::document::Document
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Auth", description = "Authentication and invite acceptance"),
        (name = "Users", description = "Admin-only user management"),
        (name = "Projects", description = "Project management"),
        (name = "Members", description = "Project membership"),
        (name = "Tasks", description = "Task lifecycle"),
        (name = "Notes", description = "Shared project notes"),
        (name = "PersonalNotes", description = "Private per-user notes"),
        (name = "Messages", description = "Project chat"),
        (name = "Documents", description = "Project documents"),
        (name = "Files", description = "Signed blob downloads"),
        (name = "Health", description = "Liveness")
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearerAuth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}
