//! Project use-case service: lifecycle, ownership and memberships.
//!
//! # Responsibility
//! - Create projects from templates, patch their fields, govern privacy
//!   flips and transfers, and drive the two-phase delete.
//! - Manage memberships: direct adds, email invitations, acceptance and
//!   removal.
//!
//! # Invariants
//! - Every capped operation consults the quota governor before writing.
//! - A blocked project only accepts reads and the delete path.
//! - The owner always holds an admin membership while the project has an
//!   owner.

use crate::config::CoreConfig;
use crate::events::{DomainEvent, EventBus};
use crate::model::membership::Membership;
use crate::model::project::{BlockedCode, Project, ProjectPatch};
use crate::repo::catalog_repo::{first_role_tx, load_role_by_slug_tx, load_row_tx};
use crate::repo::membership_repo::{
    accept_invitation_tx, delete_membership_tx, delete_owner_membership_tx,
    distinct_member_count_tx, find_membership_tx, insert_membership_tx, load_membership_tx,
};
use crate::repo::project_repo::{
    count_owned_projects, delete_project_tx, insert_project_tx, load_project, require_project,
    slug_taken_tx, store_blocked_code_tx, store_owner_tx, store_project_fields_tx,
    store_project_tags_tx, store_tags_colors_tx,
};
use crate::repo::referent_repo::seed_refs_tx;
use crate::repo::template_repo::load_template_by_slug_tx;
use crate::repo::user_repo::load_user;
use crate::service::template_service::apply_definition_tx;
use crate::service::{
    ensure_not_blocked, quota, run_in_tx, tags, CoreError, CoreResult,
};
use crate::model::taxonomy::TaxonomyKind;
use crate::slug::slugify_uniquely;
use log::info;
use rusqlite::Connection;
use uuid::Uuid;

/// Project service facade.
pub struct ProjectService<'a> {
    conn: &'a Connection,
    bus: &'a EventBus,
    config: &'a CoreConfig,
}

impl<'a> ProjectService<'a> {
    pub fn new(conn: &'a Connection, bus: &'a EventBus, config: &'a CoreConfig) -> Self {
        Self { conn, bus, config }
    }

    /// Creates a project, materializes its catalog from a template and
    /// registers the owner as admin member.
    pub fn create_project(
        &self,
        owner_id: i64,
        name: &str,
        description: &str,
        is_private: bool,
        template_slug: Option<&str>,
    ) -> CoreResult<Project> {
        let slug_input = template_slug.unwrap_or(&self.config.default_template_slug);

        run_in_tx(self.conn, self.bus, |tx| {
            let owner = load_user(tx, owner_id)?.ok_or(CoreError::NotFound {
                entity: "user",
                id: owner_id,
            })?;

            let owned = count_owned_projects(tx, owner_id, Some(is_private))?;
            let decision = quota::check_create(Some(&owner), owned, 1, is_private);
            if !decision.allowed {
                return Err(quota_error(decision));
            }

            let template =
                load_template_by_slug_tx(tx, slug_input, None)?.ok_or_else(|| {
                    CoreError::TemplateUnknown {
                        slug: slug_input.to_string(),
                    }
                })?;

            let name = name.trim();
            if name.is_empty() {
                return Err(CoreError::Validation {
                    field: "name",
                    code: "required",
                });
            }
            let slug = slugify_uniquely(name, |candidate| slug_taken_tx(tx, candidate))?;

            let project_id = insert_project_tx(
                tx,
                name,
                &slug,
                description,
                Some(owner_id),
                is_private,
                Some(template.id),
            )?;
            seed_refs_tx(tx, project_id)?;
            apply_definition_tx(tx, project_id, &template.definition)?;

            let owner_role = match load_role_by_slug_tx(tx, project_id, &template.default_owner_role)? {
                Some(role) => Some(role),
                None => first_role_tx(tx, project_id)?,
            };
            if let Some(role) = owner_role {
                let membership_id = insert_membership_tx(
                    tx,
                    project_id,
                    Some(owner_id),
                    role.id,
                    true,
                    Some(&owner.email),
                    None,
                    None,
                )?;
                self.bus.publish(DomainEvent::MembershipSaved {
                    membership_id,
                    project_id,
                    created: true,
                })?;
            }

            self.bus.publish(DomainEvent::ProjectSaved {
                project_id,
                created: true,
            })?;

            info!(
                "event=project_create module=projects status=ok project_id={} template={}",
                project_id, template.slug
            );

            require_project(tx, project_id).map_err(CoreError::from)
        })
    }

    /// Applies a partial update; privacy flips consult the governor
    /// against the owner's opposite-privacy holdings first.
    pub fn update_project(&self, project_id: i64, patch: ProjectPatch) -> CoreResult<Project> {
        run_in_tx(self.conn, self.bus, |tx| {
            let project = require_project(tx, project_id)?;
            ensure_not_blocked(&project)?;

            let target_private = patch.is_private.unwrap_or(project.is_private);
            if target_private != project.is_private {
                let owner = match project.owner_id {
                    Some(owner_id) => load_user(tx, owner_id)?,
                    None => None,
                };
                let owned_of_target = match project.owner_id {
                    Some(owner_id) => count_owned_projects(tx, owner_id, Some(target_private))?,
                    None => 0,
                };
                let members = distinct_member_count_tx(tx, project_id)?;
                let decision = quota::check_privacy_change(
                    owner.as_ref(),
                    owned_of_target,
                    members,
                    target_private,
                );
                if !decision.allowed {
                    return Err(quota_error(decision));
                }
            }

            let name = match &patch.name {
                Some(name) => {
                    let trimmed = name.trim();
                    if trimmed.is_empty() {
                        return Err(CoreError::Validation {
                            field: "name",
                            code: "required",
                        });
                    }
                    trimmed.to_string()
                }
                None => project.name.clone(),
            };
            let description = patch
                .description
                .clone()
                .unwrap_or_else(|| project.description.clone());

            store_project_fields_tx(tx, project_id, &name, &description, target_private)?;

            if let Some(new_tags) = &patch.tags {
                let normalized = tags::normalize_tags(new_tags);
                store_project_tags_tx(tx, project_id, &normalized)?;
                tags::register_tags_tx(tx, project_id, &normalized)?;
                tags::gc_tags_tx(tx, project_id)?;
            }

            self.bus.publish(DomainEvent::ProjectSaved {
                project_id,
                created: false,
            })?;

            require_project(tx, project_id).map_err(CoreError::from)
        })
    }

    /// Transfers ownership to a member, governed by the receiver's
    /// limits.
    pub fn transfer_project(&self, project_id: i64, new_owner_id: i64) -> CoreResult<Project> {
        run_in_tx(self.conn, self.bus, |tx| {
            let project = require_project(tx, project_id)?;
            ensure_not_blocked(&project)?;

            if project.owner_id == Some(new_owner_id) {
                return require_project(tx, project_id).map_err(CoreError::from);
            }

            let membership = find_membership_tx(tx, project_id, new_owner_id)?.ok_or(
                CoreError::Validation {
                    field: "owner",
                    code: "not_member",
                },
            )?;

            let new_owner = load_user(tx, new_owner_id)?.ok_or(CoreError::NotFound {
                entity: "user",
                id: new_owner_id,
            })?;
            let owned = count_owned_projects(tx, new_owner_id, Some(project.is_private))?;
            let members = distinct_member_count_tx(tx, project_id)?;
            let decision =
                quota::check_transfer(Some(&new_owner), owned, members, project.is_private);
            if !decision.allowed {
                return Err(quota_error(decision));
            }

            store_owner_tx(tx, project_id, Some(new_owner_id))?;
            promote_membership_tx(tx, membership.id)?;

            self.bus.publish(DomainEvent::ProjectSaved {
                project_id,
                created: false,
            })?;

            require_project(tx, project_id).map_err(CoreError::from)
        })
    }

    /// Phase one of deletion: removes the owner membership, orphans the
    /// project and marks it blocked-for-deletion.
    pub fn orphan_project(&self, project_id: i64) -> CoreResult<()> {
        run_in_tx(self.conn, self.bus, |tx| {
            let project = require_project(tx, project_id)?;

            if let Some(owner_id) = project.owner_id {
                if let Some(membership_id) = delete_owner_membership_tx(tx, project_id, owner_id)? {
                    self.bus.publish(DomainEvent::MembershipRemoved {
                        membership_id,
                        project_id,
                    })?;
                }
            }
            store_owner_tx(tx, project_id, None)?;
            store_blocked_code_tx(tx, project_id, Some(BlockedCode::Deleting))?;

            info!(
                "event=project_orphan module=projects status=ok project_id={}",
                project_id
            );
            Ok(())
        })
    }

    /// Phase two of deletion: the cascading delete. Idempotent; rerunning
    /// after a crash is safe.
    pub fn delete_project(&self, project_id: i64) -> CoreResult<bool> {
        run_in_tx(self.conn, self.bus, |tx| {
            let Some(project) = load_project(tx, project_id)? else {
                return Ok(false);
            };

            let mut stmt = tx.prepare("SELECT id FROM memberships WHERE project_id = ?1;")?;
            let mut rows = stmt.query([project_id])?;
            while let Some(row) = rows.next()? {
                let membership_id: i64 = row.get(0)?;
                self.bus.publish(DomainEvent::MembershipRemoved {
                    membership_id,
                    project_id,
                })?;
            }
            drop(rows);
            drop(stmt);

            let deleted = delete_project_tx(tx, project_id)?;
            info!(
                "event=project_delete module=projects status=ok project_id={} slug={}",
                project_id, project.slug
            );
            Ok(deleted)
        })
    }

    /// Marks or unmarks a project as blocked. Reserved for staff-level
    /// callers; the permission check lives at the boundary.
    pub fn set_blocked_code(
        &self,
        project_id: i64,
        blocked_code: Option<BlockedCode>,
    ) -> CoreResult<()> {
        run_in_tx(self.conn, self.bus, |tx| {
            require_project(tx, project_id)?;
            store_blocked_code_tx(tx, project_id, blocked_code)?;
            Ok(())
        })
    }

    /// Writes an administrator color for a tag already in the registry.
    pub fn set_tag_color(
        &self,
        project_id: i64,
        tag: &str,
        color: Option<&str>,
    ) -> CoreResult<()> {
        let normalized = tags::normalize_tag(tag).ok_or(CoreError::Validation {
            field: "tag",
            code: "required",
        })?;

        run_in_tx(self.conn, self.bus, |tx| {
            let project = require_project(tx, project_id)?;
            ensure_not_blocked(&project)?;

            let mut registry = project.tags_colors.clone();
            let entry = registry
                .iter_mut()
                .find(|entry| entry.tag() == normalized)
                .ok_or(CoreError::Validation {
                    field: "tag",
                    code: "unknown",
                })?;
            entry.1 = color.map(str::to_string);

            store_tags_colors_tx(tx, project_id, &registry)?;
            Ok(())
        })
    }

    // --- memberships ---

    /// Adds one confirmed member under a role of the project.
    pub fn add_member(
        &self,
        project_id: i64,
        user_id: i64,
        role_id: i64,
        is_admin: bool,
    ) -> CoreResult<Membership> {
        run_in_tx(self.conn, self.bus, |tx| {
            let project = require_project(tx, project_id)?;
            ensure_not_blocked(&project)?;
            let user = load_user(tx, user_id)?.ok_or(CoreError::NotFound {
                entity: "user",
                id: user_id,
            })?;
            let role = require_project_role(tx, project_id, role_id)?;

            let membership_id = insert_membership_tx(
                tx,
                project_id,
                Some(user_id),
                role.id,
                is_admin,
                Some(&user.email),
                None,
                None,
            )?;
            self.bus.publish(DomainEvent::MembershipSaved {
                membership_id,
                project_id,
                created: true,
            })?;

            load_membership_tx(tx, membership_id)?.ok_or(CoreError::NotFound {
                entity: "membership",
                id: membership_id,
            })
        })
    }

    /// Invites an email address; the pending membership carries a unique
    /// token until acceptance.
    pub fn invite_member(
        &self,
        project_id: i64,
        email: &str,
        role_id: i64,
        invited_by_id: Option<i64>,
    ) -> CoreResult<Membership> {
        let email = email.trim();
        if email.is_empty() || !email.contains('@') {
            return Err(CoreError::Validation {
                field: "email",
                code: "invalid",
            });
        }

        run_in_tx(self.conn, self.bus, |tx| {
            let project = require_project(tx, project_id)?;
            ensure_not_blocked(&project)?;
            let role = require_project_role(tx, project_id, role_id)?;

            let token = Uuid::new_v4();
            let membership_id = insert_membership_tx(
                tx,
                project_id,
                None,
                role.id,
                false,
                Some(email),
                Some(token),
                invited_by_id,
            )?;
            self.bus.publish(DomainEvent::MembershipSaved {
                membership_id,
                project_id,
                created: true,
            })?;

            load_membership_tx(tx, membership_id)?.ok_or(CoreError::NotFound {
                entity: "membership",
                id: membership_id,
            })
        })
    }

    /// Confirms a pending invitation for the accepting user.
    pub fn accept_invitation(&self, token: Uuid, user_id: i64) -> CoreResult<Membership> {
        run_in_tx(self.conn, self.bus, |tx| {
            let membership_id: Option<i64> = {
                let mut stmt =
                    tx.prepare("SELECT id FROM memberships WHERE token = ?1 AND user_id IS NULL;")?;
                let mut rows = stmt.query([token.to_string()])?;
                match rows.next()? {
                    Some(row) => Some(row.get(0)?),
                    None => None,
                }
            };
            let membership_id = membership_id.ok_or(CoreError::NotFound {
                entity: "membership invitation",
                id: 0,
            })?;

            load_user(tx, user_id)?.ok_or(CoreError::NotFound {
                entity: "user",
                id: user_id,
            })?;
            accept_invitation_tx(tx, membership_id, user_id)?;

            let membership = load_membership_tx(tx, membership_id)?.ok_or(CoreError::NotFound {
                entity: "membership",
                id: membership_id,
            })?;
            self.bus.publish(DomainEvent::MembershipSaved {
                membership_id,
                project_id: membership.project_id,
                created: false,
            })?;
            Ok(membership)
        })
    }

    /// Removes one membership. The owner's membership can only go away
    /// through transfer or the delete path.
    pub fn remove_member(&self, membership_id: i64) -> CoreResult<()> {
        run_in_tx(self.conn, self.bus, |tx| {
            let membership = load_membership_tx(tx, membership_id)?.ok_or(CoreError::NotFound {
                entity: "membership",
                id: membership_id,
            })?;
            let project = require_project(tx, membership.project_id)?;
            ensure_not_blocked(&project)?;

            if membership.user_id.is_some() && membership.user_id == project.owner_id {
                return Err(CoreError::Validation {
                    field: "membership",
                    code: "owner",
                });
            }

            self.bus.publish(DomainEvent::MembershipRemoved {
                membership_id,
                project_id: membership.project_id,
            })?;
            delete_membership_tx(tx, membership_id)?;
            Ok(())
        })
    }
}

pub(crate) fn quota_error(decision: quota::QuotaDecision) -> CoreError {
    CoreError::QuotaExceeded {
        reason: decision.reason.unwrap_or(quota::QuotaReason::Ownerless),
        current_memberships: decision.current_memberships,
    }
}

fn require_project_role(
    conn: &Connection,
    project_id: i64,
    role_id: i64,
) -> CoreResult<crate::model::taxonomy::TaxonomyRow> {
    let role = load_row_tx(conn, role_id)?.ok_or(CoreError::NotFound {
        entity: "taxonomy row",
        id: role_id,
    })?;
    if role.project_id != project_id || role.kind != TaxonomyKind::Role {
        return Err(CoreError::WrongProject {
            row_id: role_id,
            project_id,
        });
    }
    Ok(role)
}

fn promote_membership_tx(conn: &Connection, membership_id: i64) -> CoreResult<()> {
    conn.execute(
        "UPDATE memberships SET is_admin = 1 WHERE id = ?1;",
        [membership_id],
    )?;
    Ok(())
}
