//! Template engine: bidirectional catalog materialization.
//!
//! # Responsibility
//! - Load a template definition from a live project.
//! - Apply a definition onto a fresh project atomically.
//! - Duplicate a project by composing quota check, shell creation,
//!   in-memory template apply and membership copies.
//!
//! # Invariants
//! - `apply` creates every row or none: the enclosing transaction rolls
//!   the whole materialization back on the first failure.
//! - Default pointers are resolved by name against the rows the same
//!   definition created; roles resolve by slug.

use crate::events::{DomainEvent, EventBus};
use crate::model::project::Project;
use crate::model::taxonomy::{TaxonomyAttrs, TaxonomyKind};
use crate::model::template::{
    BadgeDef, DefaultOptions, PointsDef, ProjectTemplate, RoleDef, StatusDef, TemplateDefinition,
};
use crate::repo::catalog_repo::{
    first_role_tx, insert_row_tx, load_role_by_slug_tx, load_row_by_name_tx, load_row_tx,
    CatalogRepository, SqliteCatalogRepository,
};
use crate::repo::membership_repo::{find_membership_tx, insert_membership_tx};
use crate::repo::project_repo::{
    count_owned_projects, insert_project_tx, require_project, slug_taken_tx,
    store_default_pointer_tx, store_tags_colors_tx,
};
use crate::repo::referent_repo::seed_refs_tx;
use crate::repo::template_repo::{SqliteTemplateRepository, TemplateRepository};
use crate::repo::user_repo::load_user;
use crate::service::project_service::quota_error;
use crate::service::{ensure_not_blocked, quota, run_in_tx, CoreError, CoreResult};
use crate::slug::slugify_uniquely;
use rusqlite::Connection;

/// A definition loaded from a live project, ready to persist or apply.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedTemplate {
    pub default_owner_role: String,
    pub definition: TemplateDefinition,
}

/// Requested member entry for project duplication.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DuplicateMember {
    pub user_id: i64,
}

/// Template service facade.
pub struct TemplateService<'a> {
    conn: &'a Connection,
    bus: &'a EventBus,
}

impl<'a> TemplateService<'a> {
    pub fn new(conn: &'a Connection, bus: &'a EventBus) -> Self {
        Self { conn, bus }
    }

    /// Copies a project's catalog, roles and default selections into an
    /// inert definition.
    pub fn load_from_project(&self, project_id: i64) -> CoreResult<LoadedTemplate> {
        let project = require_project(self.conn, project_id)?;
        let catalog = SqliteCatalogRepository::new(self.conn);

        let mut definition = TemplateDefinition::default();

        for row in catalog.list_rows(project_id, TaxonomyKind::UsStatus)? {
            definition.us_statuses.push(StatusDef {
                name: row.name.clone(),
                order: row.order,
                is_closed: row.is_closed.unwrap_or(false),
                color: row.color.clone(),
                wip_limit: row.wip_limit,
            });
        }
        for row in catalog.list_rows(project_id, TaxonomyKind::Points)? {
            definition.points.push(PointsDef {
                name: row.name.clone(),
                order: row.order,
                value: row.value,
            });
        }
        for row in catalog.list_rows(project_id, TaxonomyKind::TaskStatus)? {
            definition.task_statuses.push(StatusDef {
                name: row.name.clone(),
                order: row.order,
                is_closed: row.is_closed.unwrap_or(false),
                color: row.color.clone(),
                wip_limit: None,
            });
        }
        for row in catalog.list_rows(project_id, TaxonomyKind::IssueStatus)? {
            definition.issue_statuses.push(StatusDef {
                name: row.name.clone(),
                order: row.order,
                is_closed: row.is_closed.unwrap_or(false),
                color: row.color.clone(),
                wip_limit: None,
            });
        }
        for row in catalog.list_rows(project_id, TaxonomyKind::IssueType)? {
            definition.issue_types.push(BadgeDef {
                name: row.name.clone(),
                order: row.order,
                color: row.color.clone(),
            });
        }
        for row in catalog.list_rows(project_id, TaxonomyKind::Priority)? {
            definition.priorities.push(BadgeDef {
                name: row.name.clone(),
                order: row.order,
                color: row.color.clone(),
            });
        }
        for row in catalog.list_rows(project_id, TaxonomyKind::Severity)? {
            definition.severities.push(BadgeDef {
                name: row.name.clone(),
                order: row.order,
                color: row.color.clone(),
            });
        }
        for row in catalog.list_rows(project_id, TaxonomyKind::Role)? {
            definition.roles.push(RoleDef {
                name: row.name.clone(),
                slug: row.slug.clone().unwrap_or_default(),
                order: row.order,
                computable: row.computable.unwrap_or(false),
                permissions: row.permissions.clone().unwrap_or_default(),
            });
        }

        definition.default_options = DefaultOptions {
            us_status: default_name(self.conn, project.default_us_status_id)?,
            task_status: default_name(self.conn, project.default_task_status_id)?,
            issue_status: default_name(self.conn, project.default_issue_status_id)?,
            issue_type: default_name(self.conn, project.default_issue_type_id)?,
            priority: default_name(self.conn, project.default_priority_id)?,
            severity: default_name(self.conn, project.default_severity_id)?,
            points: default_name(self.conn, project.default_points_id)?,
        };

        let default_owner_role = owner_role_slug(self.conn, &project, &definition)?;

        Ok(LoadedTemplate {
            default_owner_role,
            definition,
        })
    }

    /// Loads a project into an existing stored template.
    pub fn store_from_project(&self, template_id: i64, project_id: i64) -> CoreResult<()> {
        let loaded = self.load_from_project(project_id)?;
        let templates = SqliteTemplateRepository::new(self.conn);
        templates.store_definition(template_id, &loaded.default_owner_role, &loaded.definition)?;
        Ok(())
    }

    /// Materializes a stored template onto an existing (empty) project.
    pub fn apply_to_project(&self, template: &ProjectTemplate, project_id: i64) -> CoreResult<()> {
        run_in_tx(self.conn, self.bus, |tx| {
            let project = require_project(tx, project_id)?;
            ensure_not_blocked(&project)?;
            apply_definition_tx(tx, project_id, &template.definition)
        })
    }

    /// Duplicates a project: quota check, shell project, in-memory
    /// template apply, registry copy and membership copies.
    pub fn duplicate(
        &self,
        source_project_id: i64,
        new_owner_id: i64,
        name: &str,
        description: &str,
        is_private: bool,
        users: &[DuplicateMember],
    ) -> CoreResult<Project> {
        let loaded = self.load_from_project(source_project_id)?;

        run_in_tx(self.conn, self.bus, |tx| {
            let source = require_project(tx, source_project_id)?;
            ensure_not_blocked(&source)?;

            let new_owner = load_user(tx, new_owner_id)?.ok_or(CoreError::NotFound {
                entity: "user",
                id: new_owner_id,
            })?;
            let owned = count_owned_projects(tx, new_owner_id, Some(is_private))?;
            let mut requested: Vec<i64> = users
                .iter()
                .map(|member| member.user_id)
                .filter(|user_id| *user_id != new_owner_id)
                .collect();
            requested.sort_unstable();
            requested.dedup();

            let decision = quota::check_duplicate(
                Some(&new_owner),
                owned,
                requested.len() as i64,
                is_private,
            );
            if !decision.allowed {
                return Err(quota_error(decision));
            }

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
                Some(new_owner_id),
                is_private,
                source.creation_template_id,
            )?;
            seed_refs_tx(tx, project_id)?;
            apply_definition_tx(tx, project_id, &loaded.definition)?;
            store_tags_colors_tx(tx, project_id, &source.tags_colors)?;

            let owner_role =
                match load_role_by_slug_tx(tx, project_id, &loaded.default_owner_role)? {
                    Some(role) => Some(role),
                    None => first_role_tx(tx, project_id)?,
                };
            let Some(owner_role) = owner_role else {
                return Err(CoreError::Validation {
                    field: "roles",
                    code: "required",
                });
            };
            let owner_membership_id = insert_membership_tx(
                tx,
                project_id,
                Some(new_owner_id),
                owner_role.id,
                true,
                Some(&new_owner.email),
                None,
                None,
            )?;
            self.bus.publish(DomainEvent::MembershipSaved {
                membership_id: owner_membership_id,
                project_id,
                created: true,
            })?;

            for user_id in requested {
                let source_membership = find_membership_tx(tx, source_project_id, user_id)?
                    .ok_or(CoreError::Validation {
                        field: "users",
                        code: "not_member",
                    })?;
                let source_role = load_row_tx(tx, source_membership.role_id)?;
                let role = match source_role
                    .and_then(|role| role.slug)
                    .map(|slug| load_role_by_slug_tx(tx, project_id, &slug))
                    .transpose()?
                    .flatten()
                {
                    Some(role) => role,
                    None => owner_role.clone(),
                };

                let user = load_user(tx, user_id)?.ok_or(CoreError::NotFound {
                    entity: "user",
                    id: user_id,
                })?;
                let membership_id = insert_membership_tx(
                    tx,
                    project_id,
                    Some(user_id),
                    role.id,
                    source_membership.is_admin,
                    Some(&user.email),
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

            require_project(tx, project_id).map_err(CoreError::from)
        })
    }
}

/// Materializes every taxonomy kind by order, then roles, then resolves
/// default pointers from the definition's `default_options`.
///
/// Runs inside the caller's transaction so the whole unit is atomic.
pub(crate) fn apply_definition_tx(
    conn: &Connection,
    project_id: i64,
    definition: &TemplateDefinition,
) -> CoreResult<()> {
    for status in &definition.us_statuses {
        insert_row_tx(
            conn,
            project_id,
            TaxonomyKind::UsStatus,
            &status_attrs(status),
        )?;
    }
    for points in &definition.points {
        let mut attrs = TaxonomyAttrs::named(&points.name, points.order);
        attrs.value = points.value;
        insert_row_tx(conn, project_id, TaxonomyKind::Points, &attrs)?;
    }
    for status in &definition.task_statuses {
        insert_row_tx(
            conn,
            project_id,
            TaxonomyKind::TaskStatus,
            &status_attrs(status),
        )?;
    }
    for status in &definition.issue_statuses {
        insert_row_tx(
            conn,
            project_id,
            TaxonomyKind::IssueStatus,
            &status_attrs(status),
        )?;
    }
    for badge in &definition.issue_types {
        insert_row_tx(conn, project_id, TaxonomyKind::IssueType, &badge_attrs(badge))?;
    }
    for badge in &definition.priorities {
        insert_row_tx(conn, project_id, TaxonomyKind::Priority, &badge_attrs(badge))?;
    }
    for badge in &definition.severities {
        insert_row_tx(conn, project_id, TaxonomyKind::Severity, &badge_attrs(badge))?;
    }
    for role in &definition.roles {
        let mut attrs = TaxonomyAttrs::named(&role.name, role.order);
        attrs.slug = Some(role.slug.clone());
        attrs.computable = Some(role.computable);
        attrs.permissions = Some(role.permissions.clone());
        insert_row_tx(conn, project_id, TaxonomyKind::Role, &attrs)?;
    }

    let defaults = &definition.default_options;
    resolve_default(conn, project_id, TaxonomyKind::UsStatus, &defaults.us_status)?;
    resolve_default(conn, project_id, TaxonomyKind::TaskStatus, &defaults.task_status)?;
    resolve_default(conn, project_id, TaxonomyKind::IssueStatus, &defaults.issue_status)?;
    resolve_default(conn, project_id, TaxonomyKind::IssueType, &defaults.issue_type)?;
    resolve_default(conn, project_id, TaxonomyKind::Priority, &defaults.priority)?;
    resolve_default(conn, project_id, TaxonomyKind::Severity, &defaults.severity)?;
    resolve_default(conn, project_id, TaxonomyKind::Points, &defaults.points)?;

    Ok(())
}

fn status_attrs(status: &StatusDef) -> TaxonomyAttrs {
    let mut attrs = TaxonomyAttrs::named(&status.name, status.order);
    attrs.is_closed = Some(status.is_closed);
    attrs.color = status.color.clone();
    attrs.wip_limit = status.wip_limit;
    attrs
}

fn badge_attrs(badge: &BadgeDef) -> TaxonomyAttrs {
    let mut attrs = TaxonomyAttrs::named(&badge.name, badge.order);
    attrs.color = badge.color.clone();
    attrs
}

/// Points a project default at the named row created by the same
/// definition. A name that resolves to nothing is a definition defect.
fn resolve_default(
    conn: &Connection,
    project_id: i64,
    kind: TaxonomyKind,
    name: &Option<String>,
) -> CoreResult<()> {
    let Some(name) = name else {
        // Fall back to the first row of the kind so fresh projects always
        // have a usable default when rows exist.
        let fallback: Option<i64> = {
            let mut stmt = conn.prepare(
                "SELECT id FROM taxonomy_rows
                 WHERE project_id = ?1 AND kind = ?2
                 ORDER BY sort_order ASC, id ASC LIMIT 1;",
            )?;
            let mut rows = stmt.query(rusqlite::params![project_id, kind.as_db()])?;
            match rows.next()? {
                Some(row) => Some(row.get(0)?),
                None => None,
            }
        };
        if let Some(row_id) = fallback {
            store_default_pointer_tx(conn, project_id, kind, Some(row_id))?;
        }
        return Ok(());
    };

    let row = load_row_by_name_tx(conn, project_id, kind, name)?.ok_or(CoreError::Validation {
        field: "default_options",
        code: "unknown_name",
    })?;
    store_default_pointer_tx(conn, project_id, kind, Some(row.id))?;
    Ok(())
}

fn default_name(conn: &Connection, row_id: Option<i64>) -> CoreResult<Option<String>> {
    let Some(row_id) = row_id else {
        return Ok(None);
    };
    Ok(load_row_tx(conn, row_id)?.map(|row| row.name))
}

/// Role slug the owner is registered under; falls back to the first role
/// of the definition.
fn owner_role_slug(
    conn: &Connection,
    project: &Project,
    definition: &TemplateDefinition,
) -> CoreResult<String> {
    if let Some(owner_id) = project.owner_id {
        if let Some(membership) = find_membership_tx(conn, project.id, owner_id)? {
            if let Some(role) = load_row_tx(conn, membership.role_id)? {
                if let Some(slug) = role.slug {
                    return Ok(slug);
                }
            }
        }
    }

    Ok(definition
        .roles
        .first()
        .map(|role| role.slug.clone())
        .unwrap_or_default())
}
