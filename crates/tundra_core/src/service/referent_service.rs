//! Referent use-case service: backlog item lifecycle.
//!
//! # Responsibility
//! - Create, patch and delete user stories, tasks, issues and epics.
//! - Allocate reference numbers and keep closure mirrors, tag registry
//!   and milestone alignment consistent on every write.
//!
//! # Invariants
//! - Every mutation bumps `version`; a caller-supplied expected version
//!   that mismatches fails with `StaleWrite` and writes nothing.
//! - Status pointers must reference rows of the matching kind in the
//!   same project.
//! - Task milestones follow their parent story's milestone.

use crate::events::{DomainEvent, EventBus};
use crate::model::project::Project;
use crate::model::referent::{
    Epic, Issue, IssueExtras, ReferentAttrs, ReferentKind, ReferentPatch, Task, TaskExtras,
    UserStory, UserStoryExtras,
};
use crate::model::taxonomy::TaxonomyKind;
use crate::repo::catalog_repo::load_row_tx;
use crate::repo::project_repo::{refresh_totals_tx, require_project};
use crate::repo::referent_repo as referents;
use crate::service::{closure, ensure_not_blocked, run_in_tx, tags, CoreError, CoreResult};
use rusqlite::Connection;

/// Referent service facade.
pub struct ReferentService<'a> {
    conn: &'a Connection,
    bus: &'a EventBus,
}

impl<'a> ReferentService<'a> {
    pub fn new(conn: &'a Connection, bus: &'a EventBus) -> Self {
        Self { conn, bus }
    }

    // --- user stories ---

    /// Creates one user story with a fresh reference number.
    pub fn create_user_story(
        &self,
        project_id: i64,
        attrs: ReferentAttrs,
        extras: UserStoryExtras,
    ) -> CoreResult<UserStory> {
        run_in_tx(self.conn, self.bus, |tx| {
            let project = require_project(tx, project_id)?;
            ensure_not_blocked(&project)?;

            let subject = required_subject(&attrs.subject)?;
            let status_id = resolve_status(
                tx,
                &project,
                TaxonomyKind::UsStatus,
                "status",
                attrs.status_id,
            )?;
            let is_closed = status_closes(tx, status_id)?;
            let normalized_tags = tags::normalize_tags(&attrs.tags);

            let ref_num = referents::next_ref_tx(tx, project_id, ReferentKind::UserStory)?;
            let story_id = referents::insert_user_story_tx(
                tx,
                project_id,
                ref_num,
                &subject,
                &attrs.description,
                attrs.owner_id,
                attrs.assigned_to_id,
                status_id,
                attrs.milestone_id,
                &normalized_tags,
                is_closed,
                extras.backlog_order.unwrap_or(10),
                extras.generated_from_issue_id,
            )?;

            referents::seed_role_points_tx(tx, story_id, project_id, project.default_points_id)?;
            tags::register_tags_tx(tx, project_id, &normalized_tags)?;
            refresh_totals_tx(tx, project_id)?;

            if let Some(milestone_id) = attrs.milestone_id {
                closure::sync_milestone_closure(tx, milestone_id)?;
            }

            referents::require_user_story_tx(tx, story_id).map_err(CoreError::from)
        })
    }

    /// Applies a partial update to one story.
    pub fn update_user_story(
        &self,
        user_story_id: i64,
        patch: ReferentPatch,
        expected_version: Option<i64>,
    ) -> CoreResult<UserStory> {
        run_in_tx(self.conn, self.bus, |tx| {
            let mut story = referents::require_user_story_tx(tx, user_story_id)?;
            let project = require_project(tx, story.project_id)?;
            ensure_not_blocked(&project)?;
            check_version(expected_version, story.version)?;

            let previous_milestone = story.milestone_id;

            if let Some(subject) = patch.subject {
                story.subject = required_subject(&subject)?;
            }
            if let Some(description) = patch.description {
                story.description = description;
            }
            if let Some(assigned_to_id) = patch.assigned_to_id {
                story.assigned_to_id = assigned_to_id;
            }
            if let Some(status_id) = patch.status_id {
                story.status_id = validate_status(
                    tx,
                    &project,
                    TaxonomyKind::UsStatus,
                    "status",
                    status_id,
                )?;
            }
            if let Some(milestone_id) = patch.milestone_id {
                story.milestone_id = milestone_id;
            }
            if let Some(new_tags) = patch.tags {
                story.tags = tags::normalize_tags(&new_tags);
            }
            if let Some(is_blocked) = patch.is_blocked {
                story.is_blocked = is_blocked;
            }
            if let Some(blocked_note) = patch.blocked_note {
                story.blocked_note = blocked_note;
            }

            referents::store_user_story_tx(tx, &story)?;
            tags::register_tags_tx(tx, story.project_id, &story.tags)?;

            if story.milestone_id != previous_milestone {
                align_task_milestones(tx, &story)?;
                if let Some(old) = previous_milestone {
                    closure::sync_milestone_closure(tx, old)?;
                }
            }

            closure::sync_story_closure(tx, self.bus, user_story_id)?;

            referents::require_user_story_tx(tx, user_story_id).map_err(CoreError::from)
        })
    }

    /// Deletes one story. Its tasks stay, detached from the story.
    pub fn delete_user_story(&self, user_story_id: i64) -> CoreResult<()> {
        run_in_tx(self.conn, self.bus, |tx| {
            let story = referents::require_user_story_tx(tx, user_story_id)?;
            let project = require_project(tx, story.project_id)?;
            ensure_not_blocked(&project)?;

            referents::delete_user_story_tx(tx, user_story_id)?;
            tags::gc_tags_tx(tx, story.project_id)?;
            refresh_totals_tx(tx, story.project_id)?;
            if let Some(milestone_id) = story.milestone_id {
                closure::sync_milestone_closure(tx, milestone_id)?;
            }

            self.bus.publish(DomainEvent::ReferentDeleted {
                kind: ReferentKind::UserStory,
                referent_id: user_story_id,
                project_id: story.project_id,
            })?;
            Ok(())
        })
    }

    /// Replaces the points estimation of one role on one story.
    pub fn set_role_points(
        &self,
        user_story_id: i64,
        role_id: i64,
        points_id: Option<i64>,
    ) -> CoreResult<()> {
        run_in_tx(self.conn, self.bus, |tx| {
            let story = referents::require_user_story_tx(tx, user_story_id)?;
            let project = require_project(tx, story.project_id)?;
            ensure_not_blocked(&project)?;

            let role = load_row_tx(tx, role_id)?.ok_or(CoreError::NotFound {
                entity: "taxonomy row",
                id: role_id,
            })?;
            if role.project_id != project.id || role.kind != TaxonomyKind::Role {
                return Err(CoreError::Validation {
                    field: "role",
                    code: "wrong_project",
                });
            }
            if let Some(points_id) = points_id {
                let points = load_row_tx(tx, points_id)?.ok_or(CoreError::NotFound {
                    entity: "taxonomy row",
                    id: points_id,
                })?;
                if points.project_id != project.id || points.kind != TaxonomyKind::Points {
                    return Err(CoreError::Validation {
                        field: "points",
                        code: "wrong_project",
                    });
                }
            }

            referents::upsert_role_points_tx(tx, user_story_id, role_id, points_id)?;
            refresh_totals_tx(tx, project.id)?;
            Ok(())
        })
    }

    // --- tasks ---

    /// Creates one task. A task attached to a story inherits the story's
    /// milestone unless one is given explicitly.
    pub fn create_task(
        &self,
        project_id: i64,
        attrs: ReferentAttrs,
        extras: TaskExtras,
    ) -> CoreResult<Task> {
        run_in_tx(self.conn, self.bus, |tx| {
            let project = require_project(tx, project_id)?;
            ensure_not_blocked(&project)?;

            let subject = required_subject(&attrs.subject)?;
            let status_id = resolve_status(
                tx,
                &project,
                TaxonomyKind::TaskStatus,
                "status",
                attrs.status_id,
            )?;
            let is_closed = status_closes(tx, status_id)?;
            let normalized_tags = tags::normalize_tags(&attrs.tags);

            let mut milestone_id = attrs.milestone_id;
            if let Some(user_story_id) = extras.user_story_id {
                let story = referents::require_user_story_tx(tx, user_story_id)?;
                if story.project_id != project_id {
                    return Err(CoreError::Validation {
                        field: "user_story",
                        code: "wrong_project",
                    });
                }
                if milestone_id.is_none() {
                    milestone_id = story.milestone_id;
                }
            }

            let ref_num = referents::next_ref_tx(tx, project_id, ReferentKind::Task)?;
            let task_id = referents::insert_task_tx(
                tx,
                project_id,
                ref_num,
                &subject,
                &attrs.description,
                attrs.owner_id,
                attrs.assigned_to_id,
                status_id,
                milestone_id,
                extras.user_story_id,
                &normalized_tags,
                is_closed,
                extras.task_order.unwrap_or(10),
                extras.is_iocaine,
            )?;

            tags::register_tags_tx(tx, project_id, &normalized_tags)?;

            if let Some(user_story_id) = extras.user_story_id {
                closure::sync_story_closure(tx, self.bus, user_story_id)?;
            }
            if let Some(milestone_id) = milestone_id {
                closure::sync_milestone_closure(tx, milestone_id)?;
            }

            referents::require_task_tx(tx, task_id).map_err(CoreError::from)
        })
    }

    /// Applies a partial update to one task, rerunning closure for the
    /// current and, on a move, the previous parent story.
    pub fn update_task(
        &self,
        task_id: i64,
        patch: ReferentPatch,
        expected_version: Option<i64>,
    ) -> CoreResult<Task> {
        run_in_tx(self.conn, self.bus, |tx| {
            let mut task = referents::require_task_tx(tx, task_id)?;
            let project = require_project(tx, task.project_id)?;
            ensure_not_blocked(&project)?;
            check_version(expected_version, task.version)?;

            let previous_story = task.user_story_id;
            let previous_milestone = task.milestone_id;

            if let Some(subject) = patch.subject {
                task.subject = required_subject(&subject)?;
            }
            if let Some(description) = patch.description {
                task.description = description;
            }
            if let Some(assigned_to_id) = patch.assigned_to_id {
                task.assigned_to_id = assigned_to_id;
            }
            if let Some(status_id) = patch.status_id {
                task.status_id = validate_status(
                    tx,
                    &project,
                    TaxonomyKind::TaskStatus,
                    "status",
                    status_id,
                )?;
            }
            if let Some(milestone_id) = patch.milestone_id {
                task.milestone_id = milestone_id;
            }
            if let Some(user_story_id) = patch.user_story_id {
                if let Some(user_story_id) = user_story_id {
                    let story = referents::require_user_story_tx(tx, user_story_id)?;
                    if story.project_id != task.project_id {
                        return Err(CoreError::Validation {
                            field: "user_story",
                            code: "wrong_project",
                        });
                    }
                    task.milestone_id = story.milestone_id;
                }
                task.user_story_id = user_story_id;
            }
            if let Some(new_tags) = patch.tags {
                task.tags = tags::normalize_tags(&new_tags);
            }
            if let Some(is_blocked) = patch.is_blocked {
                task.is_blocked = is_blocked;
            }
            if let Some(blocked_note) = patch.blocked_note {
                task.blocked_note = blocked_note;
            }
            if let Some(is_iocaine) = patch.is_iocaine {
                task.is_iocaine = is_iocaine;
            }

            task.is_closed = status_closes(tx, task.status_id)?;
            referents::store_task_tx(tx, &task)?;
            tags::register_tags_tx(tx, task.project_id, &task.tags)?;

            if let Some(story_id) = task.user_story_id {
                closure::sync_story_closure(tx, self.bus, story_id)?;
            }
            if previous_story != task.user_story_id {
                if let Some(story_id) = previous_story {
                    closure::sync_story_closure(tx, self.bus, story_id)?;
                }
            }
            if let Some(milestone_id) = task.milestone_id {
                closure::sync_milestone_closure(tx, milestone_id)?;
            }
            if previous_milestone != task.milestone_id {
                if let Some(milestone_id) = previous_milestone {
                    closure::sync_milestone_closure(tx, milestone_id)?;
                }
            }

            referents::require_task_tx(tx, task_id).map_err(CoreError::from)
        })
    }

    /// Deletes one task and reruns closure for its parent story.
    pub fn delete_task(&self, task_id: i64) -> CoreResult<()> {
        run_in_tx(self.conn, self.bus, |tx| {
            let task = referents::require_task_tx(tx, task_id)?;
            let project = require_project(tx, task.project_id)?;
            ensure_not_blocked(&project)?;

            referents::delete_task_tx(tx, task_id)?;
            tags::gc_tags_tx(tx, task.project_id)?;

            if let Some(story_id) = task.user_story_id {
                closure::sync_story_closure(tx, self.bus, story_id)?;
            }
            if let Some(milestone_id) = task.milestone_id {
                closure::sync_milestone_closure(tx, milestone_id)?;
            }

            self.bus.publish(DomainEvent::ReferentDeleted {
                kind: ReferentKind::Task,
                referent_id: task_id,
                project_id: task.project_id,
            })?;
            Ok(())
        })
    }

    // --- issues ---

    /// Creates one issue; severity, priority and type fall back to the
    /// project defaults.
    pub fn create_issue(
        &self,
        project_id: i64,
        attrs: ReferentAttrs,
        extras: IssueExtras,
    ) -> CoreResult<Issue> {
        run_in_tx(self.conn, self.bus, |tx| {
            let project = require_project(tx, project_id)?;
            ensure_not_blocked(&project)?;

            let subject = required_subject(&attrs.subject)?;
            let status_id = resolve_status(
                tx,
                &project,
                TaxonomyKind::IssueStatus,
                "status",
                attrs.status_id,
            )?;
            let severity_id = resolve_status(
                tx,
                &project,
                TaxonomyKind::Severity,
                "severity",
                extras.severity_id,
            )?;
            let priority_id = resolve_status(
                tx,
                &project,
                TaxonomyKind::Priority,
                "priority",
                extras.priority_id,
            )?;
            let type_id = resolve_status(
                tx,
                &project,
                TaxonomyKind::IssueType,
                "type",
                extras.type_id,
            )?;
            let is_closed = status_closes(tx, status_id)?;
            let normalized_tags = tags::normalize_tags(&attrs.tags);

            let ref_num = referents::next_ref_tx(tx, project_id, ReferentKind::Issue)?;
            let issue_id = referents::insert_issue_tx(
                tx,
                project_id,
                ref_num,
                &subject,
                &attrs.description,
                attrs.owner_id,
                attrs.assigned_to_id,
                status_id,
                severity_id,
                priority_id,
                type_id,
                attrs.milestone_id,
                &normalized_tags,
                is_closed,
            )?;

            tags::register_tags_tx(tx, project_id, &normalized_tags)?;
            if let Some(milestone_id) = attrs.milestone_id {
                closure::sync_milestone_closure(tx, milestone_id)?;
            }

            referents::require_issue_tx(tx, issue_id).map_err(CoreError::from)
        })
    }

    /// Applies a partial update to one issue.
    pub fn update_issue(
        &self,
        issue_id: i64,
        patch: ReferentPatch,
        expected_version: Option<i64>,
    ) -> CoreResult<Issue> {
        run_in_tx(self.conn, self.bus, |tx| {
            let mut issue = referents::require_issue_tx(tx, issue_id)?;
            let project = require_project(tx, issue.project_id)?;
            ensure_not_blocked(&project)?;
            check_version(expected_version, issue.version)?;

            let previous_milestone = issue.milestone_id;

            if let Some(subject) = patch.subject {
                issue.subject = required_subject(&subject)?;
            }
            if let Some(description) = patch.description {
                issue.description = description;
            }
            if let Some(assigned_to_id) = patch.assigned_to_id {
                issue.assigned_to_id = assigned_to_id;
            }
            if let Some(status_id) = patch.status_id {
                issue.status_id = validate_status(
                    tx,
                    &project,
                    TaxonomyKind::IssueStatus,
                    "status",
                    status_id,
                )?;
            }
            if let Some(severity_id) = patch.severity_id {
                issue.severity_id = validate_status(
                    tx,
                    &project,
                    TaxonomyKind::Severity,
                    "severity",
                    severity_id,
                )?;
            }
            if let Some(priority_id) = patch.priority_id {
                issue.priority_id = validate_status(
                    tx,
                    &project,
                    TaxonomyKind::Priority,
                    "priority",
                    priority_id,
                )?;
            }
            if let Some(type_id) = patch.type_id {
                issue.type_id = validate_status(
                    tx,
                    &project,
                    TaxonomyKind::IssueType,
                    "type",
                    type_id,
                )?;
            }
            if let Some(milestone_id) = patch.milestone_id {
                issue.milestone_id = milestone_id;
            }
            if let Some(new_tags) = patch.tags {
                issue.tags = tags::normalize_tags(&new_tags);
            }
            if let Some(is_blocked) = patch.is_blocked {
                issue.is_blocked = is_blocked;
            }
            if let Some(blocked_note) = patch.blocked_note {
                issue.blocked_note = blocked_note;
            }

            issue.is_closed = status_closes(tx, issue.status_id)?;
            referents::store_issue_tx(tx, &issue)?;
            tags::register_tags_tx(tx, issue.project_id, &issue.tags)?;

            if let Some(milestone_id) = issue.milestone_id {
                closure::sync_milestone_closure(tx, milestone_id)?;
            }
            if previous_milestone != issue.milestone_id {
                if let Some(milestone_id) = previous_milestone {
                    closure::sync_milestone_closure(tx, milestone_id)?;
                }
            }

            referents::require_issue_tx(tx, issue_id).map_err(CoreError::from)
        })
    }

    /// Deletes one issue.
    pub fn delete_issue(&self, issue_id: i64) -> CoreResult<()> {
        run_in_tx(self.conn, self.bus, |tx| {
            let issue = referents::require_issue_tx(tx, issue_id)?;
            let project = require_project(tx, issue.project_id)?;
            ensure_not_blocked(&project)?;

            referents::delete_issue_tx(tx, issue_id)?;
            tags::gc_tags_tx(tx, issue.project_id)?;
            if let Some(milestone_id) = issue.milestone_id {
                closure::sync_milestone_closure(tx, milestone_id)?;
            }

            self.bus.publish(DomainEvent::ReferentDeleted {
                kind: ReferentKind::Issue,
                referent_id: issue_id,
                project_id: issue.project_id,
            })?;
            Ok(())
        })
    }

    // --- epics ---

    /// Creates one epic.
    pub fn create_epic(
        &self,
        project_id: i64,
        attrs: ReferentAttrs,
        color: Option<String>,
    ) -> CoreResult<Epic> {
        run_in_tx(self.conn, self.bus, |tx| {
            let project = require_project(tx, project_id)?;
            ensure_not_blocked(&project)?;

            let subject = required_subject(&attrs.subject)?;
            let normalized_tags = tags::normalize_tags(&attrs.tags);

            let ref_num = referents::next_ref_tx(tx, project_id, ReferentKind::Epic)?;
            let epic_id = referents::insert_epic_tx(
                tx,
                project_id,
                ref_num,
                &subject,
                &attrs.description,
                attrs.owner_id,
                attrs.assigned_to_id,
                color.as_deref(),
                &normalized_tags,
                10,
            )?;

            tags::register_tags_tx(tx, project_id, &normalized_tags)?;
            referents::require_epic_tx(tx, epic_id).map_err(CoreError::from)
        })
    }

    /// Applies a partial update to one epic. Epics carry no status set;
    /// `is_closed` is written directly.
    pub fn update_epic(
        &self,
        epic_id: i64,
        patch: ReferentPatch,
        expected_version: Option<i64>,
    ) -> CoreResult<Epic> {
        run_in_tx(self.conn, self.bus, |tx| {
            let mut epic = referents::require_epic_tx(tx, epic_id)?;
            let project = require_project(tx, epic.project_id)?;
            ensure_not_blocked(&project)?;
            check_version(expected_version, epic.version)?;

            if let Some(subject) = patch.subject {
                epic.subject = required_subject(&subject)?;
            }
            if let Some(description) = patch.description {
                epic.description = description;
            }
            if let Some(assigned_to_id) = patch.assigned_to_id {
                epic.assigned_to_id = assigned_to_id;
            }
            if let Some(new_tags) = patch.tags {
                epic.tags = tags::normalize_tags(&new_tags);
            }
            if let Some(is_blocked) = patch.is_blocked {
                epic.is_blocked = is_blocked;
            }
            if let Some(blocked_note) = patch.blocked_note {
                epic.blocked_note = blocked_note;
            }
            if let Some(is_closed) = patch.is_closed {
                epic.is_closed = is_closed;
            }

            referents::store_epic_tx(tx, &epic)?;
            tags::register_tags_tx(tx, epic.project_id, &epic.tags)?;

            referents::require_epic_tx(tx, epic_id).map_err(CoreError::from)
        })
    }

    /// Deletes one epic.
    pub fn delete_epic(&self, epic_id: i64) -> CoreResult<()> {
        run_in_tx(self.conn, self.bus, |tx| {
            let epic = referents::require_epic_tx(tx, epic_id)?;
            let project = require_project(tx, epic.project_id)?;
            ensure_not_blocked(&project)?;

            referents::delete_epic_tx(tx, epic_id)?;
            tags::gc_tags_tx(tx, epic.project_id)?;

            self.bus.publish(DomainEvent::ReferentDeleted {
                kind: ReferentKind::Epic,
                referent_id: epic_id,
                project_id: epic.project_id,
            })?;
            Ok(())
        })
    }

    /// Links one story into an epic at the given order.
    pub fn link_story_to_epic(
        &self,
        epic_id: i64,
        user_story_id: i64,
        order: i64,
    ) -> CoreResult<()> {
        run_in_tx(self.conn, self.bus, |tx| {
            let epic = referents::require_epic_tx(tx, epic_id)?;
            let story = referents::require_user_story_tx(tx, user_story_id)?;
            if epic.project_id != story.project_id {
                return Err(CoreError::Validation {
                    field: "user_story",
                    code: "wrong_project",
                });
            }
            let project = require_project(tx, epic.project_id)?;
            ensure_not_blocked(&project)?;

            referents::link_epic_story_tx(tx, epic_id, user_story_id, order)?;
            Ok(())
        })
    }

    /// Removes one story from an epic.
    pub fn unlink_story_from_epic(&self, epic_id: i64, user_story_id: i64) -> CoreResult<()> {
        run_in_tx(self.conn, self.bus, |tx| {
            let epic = referents::require_epic_tx(tx, epic_id)?;
            let project = require_project(tx, epic.project_id)?;
            ensure_not_blocked(&project)?;

            referents::unlink_epic_story_tx(tx, epic_id, user_story_id)?;
            Ok(())
        })
    }
}

fn required_subject(subject: &str) -> CoreResult<String> {
    let trimmed = subject.trim();
    if trimmed.is_empty() {
        return Err(CoreError::Validation {
            field: "subject",
            code: "required",
        });
    }
    Ok(trimmed.to_string())
}

fn check_version(expected: Option<i64>, actual: i64) -> CoreResult<()> {
    if let Some(expected) = expected {
        if expected != actual {
            return Err(CoreError::StaleWrite { expected, actual });
        }
    }
    Ok(())
}

/// Resolves an explicit taxonomy pointer or falls back to the project
/// default for the kind.
fn resolve_status(
    conn: &Connection,
    project: &Project,
    kind: TaxonomyKind,
    field: &'static str,
    explicit: Option<i64>,
) -> CoreResult<Option<i64>> {
    match explicit {
        Some(_) => validate_status(conn, project, kind, field, explicit),
        None => Ok(project.default_for(kind)),
    }
}

/// Checks a caller-supplied taxonomy pointer against project and kind.
fn validate_status(
    conn: &Connection,
    project: &Project,
    kind: TaxonomyKind,
    field: &'static str,
    pointer: Option<i64>,
) -> CoreResult<Option<i64>> {
    let Some(row_id) = pointer else {
        return Ok(None);
    };
    let row = load_row_tx(conn, row_id)?.ok_or(CoreError::NotFound {
        entity: "taxonomy row",
        id: row_id,
    })?;
    if row.project_id != project.id || row.kind != kind {
        return Err(CoreError::Validation {
            field,
            code: "wrong_project",
        });
    }
    Ok(Some(row_id))
}

fn status_closes(conn: &Connection, status_id: Option<i64>) -> CoreResult<bool> {
    let Some(status_id) = status_id else {
        return Ok(false);
    };
    let row = load_row_tx(conn, status_id)?;
    Ok(row.map(|row| row.closes_referents()).unwrap_or(false))
}

/// Keeps task milestones aligned with their parent story.
fn align_task_milestones(conn: &Connection, story: &UserStory) -> CoreResult<()> {
    conn.execute(
        "UPDATE tasks
         SET milestone_id = ?2,
             modified_at = (strftime('%s', 'now') * 1000)
         WHERE user_story_id = ?1
           AND (milestone_id IS NOT ?2);",
        rusqlite::params![story.id, story.milestone_id],
    )?;
    Ok(())
}
