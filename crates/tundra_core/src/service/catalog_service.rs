//! Catalog use-case service: taxonomy rows, defaults and
//! move-on-destroy.
//!
//! # Responsibility
//! - Validate taxonomy mutations above the repository layer.
//! - Orchestrate the atomic move-on-destroy unit and its event.
//!
//! # Invariants
//! - The first row of a kind becomes the project default.
//! - Deleting a referenced row requires a same-project, same-kind,
//!   distinct replacement; referrers and the default pointer move to it
//!   in the same transaction.

use crate::events::{DomainEvent, EventBus};
use crate::model::taxonomy::{TaxonomyAttrs, TaxonomyKind, TaxonomyPatch, TaxonomyRow};
use crate::repo::catalog_repo::{
    delete_row_tx, insert_row_tx, load_role_by_slug_tx, load_row_tx, reassign_referents_tx,
    referent_usage_count_tx, store_row_tx,
};
use crate::repo::project_repo::{require_project, store_default_pointer_tx};
use crate::service::{closure, ensure_not_blocked, run_in_tx, CoreError, CoreResult};
use crate::slug::slugify_uniquely;
use rusqlite::Connection;

/// Catalog service facade.
pub struct CatalogService<'a> {
    conn: &'a Connection,
    bus: &'a EventBus,
}

impl<'a> CatalogService<'a> {
    pub fn new(conn: &'a Connection, bus: &'a EventBus) -> Self {
        Self { conn, bus }
    }

    /// Inserts one taxonomy row into the project-scoped set.
    ///
    /// The row becomes the project default when its kind has a default
    /// pointer and none is set yet. Role rows get a project-unique slug
    /// derived from the name when the caller supplies none.
    pub fn add_row(
        &self,
        project_id: i64,
        kind: TaxonomyKind,
        attrs: TaxonomyAttrs,
    ) -> CoreResult<TaxonomyRow> {
        if kind == TaxonomyKind::QuestionStatus {
            return Err(CoreError::Validation {
                field: "kind",
                code: "deprecated",
            });
        }

        run_in_tx(self.conn, self.bus, |tx| {
            let project = require_project(tx, project_id)?;
            ensure_not_blocked(&project)?;

            let mut attrs = attrs;
            attrs.name = attrs.name.trim().to_string();
            if attrs.name.is_empty() {
                return Err(CoreError::Validation {
                    field: "name",
                    code: "required",
                });
            }

            if kind == TaxonomyKind::Role && attrs.slug.is_none() {
                let slug = slugify_uniquely(&attrs.name, |candidate| {
                    load_role_by_slug_tx(tx, project_id, candidate).map(|found| found.is_some())
                })?;
                attrs.slug = Some(slug);
            }

            let row = insert_row_tx(tx, project_id, kind, &attrs)?;

            if kind.has_default_pointer() && project.default_for(kind).is_none() {
                store_default_pointer_tx(tx, project_id, kind, Some(row.id))?;
            }

            Ok(row)
        })
    }

    /// Applies a partial update to one row.
    ///
    /// Toggling `is_closed` on a status row triggers the closure
    /// propagator for every affected story and refreshes the direct
    /// mirrors of tasks and issues.
    pub fn update_row(
        &self,
        project_id: i64,
        row_id: i64,
        patch: TaxonomyPatch,
    ) -> CoreResult<TaxonomyRow> {
        run_in_tx(self.conn, self.bus, |tx| {
            let project = require_project(tx, project_id)?;
            ensure_not_blocked(&project)?;

            let mut row = load_row_tx(tx, row_id)?.ok_or(CoreError::NotFound {
                entity: "taxonomy row",
                id: row_id,
            })?;
            if row.project_id != project_id {
                return Err(CoreError::WrongProject { row_id, project_id });
            }

            let closed_before = row.is_closed;

            if let Some(name) = patch.name {
                let name = name.trim().to_string();
                if name.is_empty() {
                    return Err(CoreError::Validation {
                        field: "name",
                        code: "required",
                    });
                }
                row.name = name;
            }
            if let Some(order) = patch.order {
                row.order = order;
            }
            if let Some(is_closed) = patch.is_closed {
                if !row.kind.is_status() {
                    return Err(CoreError::Validation {
                        field: "is_closed",
                        code: "not_a_status",
                    });
                }
                row.is_closed = Some(is_closed);
            }
            if let Some(color) = patch.color {
                row.color = color;
            }
            if let Some(wip_limit) = patch.wip_limit {
                row.wip_limit = wip_limit;
            }
            if let Some(value) = patch.value {
                row.value = value;
            }
            if let Some(computable) = patch.computable {
                row.computable = Some(computable);
            }
            if let Some(permissions) = patch.permissions {
                row.permissions = Some(permissions);
            }

            store_row_tx(tx, &row)?;

            if row.is_closed != closed_before {
                closure::sync_status_edit(tx, self.bus, &row)?;
            }

            Ok(row)
        })
    }

    /// Updates the project's default pointer for one kind.
    pub fn set_default(&self, project_id: i64, kind: TaxonomyKind, row_id: i64) -> CoreResult<()> {
        if !kind.has_default_pointer() {
            return Err(CoreError::Validation {
                field: "kind",
                code: "no_default",
            });
        }

        run_in_tx(self.conn, self.bus, |tx| {
            let project = require_project(tx, project_id)?;
            ensure_not_blocked(&project)?;

            let row = load_row_tx(tx, row_id)?.ok_or(CoreError::NotFound {
                entity: "taxonomy row",
                id: row_id,
            })?;
            if row.project_id != project_id || row.kind != kind {
                return Err(CoreError::WrongProject { row_id, project_id });
            }

            store_default_pointer_tx(tx, project_id, kind, Some(row_id))?;
            Ok(())
        })
    }

    /// Deletes one taxonomy row, moving referrers to `replacement`.
    ///
    /// `replacement` may be omitted only when nothing references the row.
    /// When the deleted row was the project default, the pointer is
    /// rewritten to the replacement (or cleared when none is needed).
    pub fn delete_row(
        &self,
        project_id: i64,
        kind: TaxonomyKind,
        row_id: i64,
        replacement_id: Option<i64>,
    ) -> CoreResult<()> {
        run_in_tx(self.conn, self.bus, |tx| {
            let project = require_project(tx, project_id)?;
            ensure_not_blocked(&project)?;

            let row = load_row_tx(tx, row_id)?.ok_or(CoreError::NotFound {
                entity: "taxonomy row",
                id: row_id,
            })?;
            if row.project_id != project_id || row.kind != kind {
                return Err(CoreError::WrongProject { row_id, project_id });
            }

            let usage = referent_usage_count_tx(tx, kind, row_id)?;

            let replacement = match replacement_id {
                None => {
                    if usage > 0 {
                        return Err(CoreError::BadReplacement {
                            reason: "replacement required while referents exist",
                        });
                    }
                    None
                }
                Some(replacement_id) => {
                    if replacement_id == row_id {
                        return Err(CoreError::BadReplacement {
                            reason: "replacement equals the deleted row",
                        });
                    }
                    let replacement =
                        load_row_tx(tx, replacement_id)?.ok_or(CoreError::BadReplacement {
                            reason: "replacement does not exist",
                        })?;
                    if replacement.project_id != project_id {
                        return Err(CoreError::BadReplacement {
                            reason: "replacement belongs to another project",
                        });
                    }
                    if replacement.kind != kind {
                        return Err(CoreError::BadReplacement {
                            reason: "replacement is of another kind",
                        });
                    }
                    Some(replacement)
                }
            };

            if let Some(replacement) = &replacement {
                let outcome = reassign_referents_tx(tx, &row, replacement)?;
                for story_id in outcome.stories_to_revisit {
                    closure::sync_story_closure(tx, self.bus, story_id)?;
                }
            }

            if project.default_for(kind) == Some(row_id) {
                let moved_to = replacement.as_ref().map(|row| row.id);
                store_default_pointer_tx(tx, project_id, kind, moved_to)?;
            }

            delete_row_tx(tx, row_id)?;

            if let Some(replacement) = &replacement {
                self.bus.publish(DomainEvent::TaxonomyMovedOnDestroy {
                    kind,
                    project_id,
                    deleted_id: row_id,
                    moved_id: replacement.id,
                })?;
            }

            Ok(())
        })
    }
}
