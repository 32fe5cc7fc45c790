//! The permission predicate table.
//!
//! Every operation in the system funnels through exactly one routine here:
//! handlers fetch fresh entity state, call the routine for the entity type,
//! and only then write. The routines are pure functions of
//! `(actor, entity snapshot, requested change)` — no I/O — so the whole rule
//! set is unit-testable in place and cannot silently fork into per-handler
//! variants.
//!
//! Rule summary:
//! - ADMIN: project/task/member/user management, plus content authorship in
//!   any project regardless of membership.
//! - COLLAB: content authorship only inside projects where they hold a
//!   membership row; task status updates only on tasks assigned to them.
//! - Primary admin (orthogonal flag, not a role): irreversible operations —
//!   clearing a chat, reactivating an archived task, deleting another
//!   author's shared note.
//! - Personal notes: strictly owner-only. No role or flag overrides this.

use uuid::Uuid;

use super::actor::Actor;
use crate::errors::{AppError, AppResult};
use crate::models::task::TaskStatus;

#[derive(Debug, Clone, Copy)]
pub enum ProjectAction {
    Create,
    Update,
    Delete,
}

pub fn projects(actor: &Actor, action: ProjectAction) -> AppResult<()> {
    if actor.is_admin() {
        return Ok(());
    }
    Err(match action {
        ProjectAction::Create => AppError::forbidden("only admins can create projects"),
        ProjectAction::Update => AppError::forbidden("only admins can update projects"),
        ProjectAction::Delete => AppError::forbidden("only admins can delete projects"),
    })
}

#[derive(Debug, Clone, Copy)]
pub enum MemberAction {
    Assign,
    Remove,
}

pub fn members(actor: &Actor, action: MemberAction) -> AppResult<()> {
    if actor.is_admin() {
        return Ok(());
    }
    Err(match action {
        MemberAction::Assign => AppError::forbidden("only admins can assign users to projects"),
        MemberAction::Remove => AppError::forbidden("only admins can remove project members"),
    })
}

pub fn manage_users(actor: &Actor) -> AppResult<()> {
    if actor.is_admin() {
        return Ok(());
    }
    Err(AppError::forbidden("only admins can manage users"))
}

/// Read or author content (notes, messages, documents, task listings) inside
/// a project. Membership is the sole gate for collaborators; admins are not
/// limited by membership.
pub fn project_content(actor: &Actor, is_member: bool) -> AppResult<()> {
    if actor.is_admin() || is_member {
        return Ok(());
    }
    Err(AppError::forbidden("not a member of this project"))
}

pub fn create_task(actor: &Actor) -> AppResult<()> {
    if actor.is_admin() {
        return Ok(());
    }
    Err(AppError::forbidden("only admins can create tasks"))
}

pub fn delete_task(actor: &Actor) -> AppResult<()> {
    if actor.is_admin() {
        return Ok(());
    }
    Err(AppError::forbidden("only admins can delete tasks"))
}

/// Permission-relevant fields of a task, freshly fetched by the caller.
#[derive(Debug, Clone, Copy)]
pub struct TaskSnapshot {
    pub assigned_to: Uuid,
    pub status: TaskStatus,
    pub is_archived: bool,
}

/// The mutation a caller is asking for. All fields optional; an empty change
/// is rejected outright.
#[derive(Debug, Clone, Copy, Default)]
pub struct TaskChange {
    pub status: Option<TaskStatus>,
    pub assigned_to: Option<Uuid>,
    pub archived: Option<bool>,
}

impl TaskChange {
    pub fn is_empty(&self) -> bool {
        self.status.is_none() && self.assigned_to.is_none() && self.archived.is_none()
    }

    /// The status the task would end in. Archiving without an explicit
    /// status coerces DONE, matching the archive precondition.
    pub fn target_status(&self, current: TaskStatus) -> TaskStatus {
        match (self.status, self.archived) {
            (Some(status), _) => status,
            (None, Some(true)) => TaskStatus::Done,
            (None, _) => current,
        }
    }
}

/// The full task-update gate: role/ownership, archive lock, reassignment
/// rights, and the archive state machine. Membership of a new assignee is
/// the one check left to the caller (it needs the store).
pub fn update_task(actor: &Actor, task: &TaskSnapshot, change: &TaskChange) -> AppResult<()> {
    if change.is_empty() {
        return Err(AppError::validation("no changes to apply"));
    }

    let is_assignee = task.assigned_to == actor.user_id;
    if !actor.is_admin() && !is_assignee {
        return Err(AppError::forbidden(
            "only the assignee or an admin can update this task",
        ));
    }

    if task.is_archived {
        if !actor.is_primary_admin {
            return Err(AppError::forbidden(
                "only the primary admin can modify archived tasks",
            ));
        }
        // Even the primary admin may only bring the task back.
        if change.archived != Some(false) || change.status.is_some() || change.assigned_to.is_some() {
            return Err(AppError::forbidden("archived tasks can only be reactivated"));
        }
        return Ok(());
    }

    if change.assigned_to.is_some() && !actor.is_admin() {
        return Err(AppError::forbidden("only admins can reassign tasks"));
    }

    match change.archived {
        Some(true) => {
            if change.target_status(task.status) != TaskStatus::Done {
                return Err(AppError::validation("only completed tasks can be archived"));
            }
        }
        Some(false) => {
            if !actor.is_primary_admin {
                return Err(AppError::forbidden("only the primary admin can reactivate tasks"));
            }
        }
        None => {}
    }

    Ok(())
}

/// Shared note edits are strictly author-only; an admin role grants nothing.
pub fn update_note(actor: &Actor, author_id: Uuid) -> AppResult<()> {
    if actor.user_id == author_id {
        return Ok(());
    }
    Err(AppError::forbidden("only the author can update this note"))
}

/// Deletion additionally allows the primary admin, the one cross-ownership
/// escalation for shared notes.
pub fn delete_note(actor: &Actor, author_id: Uuid) -> AppResult<()> {
    if actor.user_id == author_id || actor.is_primary_admin {
        return Ok(());
    }
    Err(AppError::forbidden("only the author can delete this note"))
}

/// Personal notes never open up to anyone but their owner.
pub fn personal_note(actor: &Actor, owner_id: Uuid) -> AppResult<()> {
    if actor.user_id == owner_id {
        return Ok(());
    }
    Err(AppError::forbidden("personal notes are private to their owner"))
}

pub fn clear_messages(actor: &Actor) -> AppResult<()> {
    if actor.is_primary_admin {
        return Ok(());
    }
    Err(AppError::forbidden("only the primary admin can clear the chat"))
}

pub fn delete_document(actor: &Actor, uploader_id: Uuid) -> AppResult<()> {
    if actor.is_admin() || actor.user_id == uploader_id {
        return Ok(());
    }
    Err(AppError::forbidden("only the uploader or an admin can delete this document"))
}
