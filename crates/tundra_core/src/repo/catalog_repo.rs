//! Taxonomy-row persistence and the move-on-destroy primitives.
//!
//! # Responsibility
//! - Provide CRUD over the unified `taxonomy_rows` set.
//! - Reassign referrers from a doomed row to its replacement, per kind,
//!   inside the caller's transaction.
//!
//! # Invariants
//! - `(project, kind, name)` uniqueness surfaces as `UniqueViolation`.
//! - Reassignment keeps the `is_closed` mirror of tasks and issues in
//!   step with the replacement status; story mirrors are recomputed by
//!   the closure propagator from the ids this module reports back.

use crate::model::taxonomy::{TaxonomyAttrs, TaxonomyKind, TaxonomyRow};
use crate::repo::{bool_to_int, RepoError, RepoResult};
use rusqlite::{params, Connection, Row};

const ROW_SELECT_SQL: &str = "SELECT
    id,
    project_id,
    kind,
    name,
    sort_order,
    is_closed,
    color,
    wip_limit,
    value,
    slug,
    computable,
    permissions
FROM taxonomy_rows";

/// Result of one referrer reassignment.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct MoveOutcome {
    /// Referrer rows repointed to the replacement.
    pub moved: usize,
    /// Story ids whose closure mirror must be recomputed.
    pub stories_to_revisit: Vec<i64>,
}

/// Repository interface for taxonomy rows.
pub trait CatalogRepository {
    /// Lists one kind's rows of a project in catalog order.
    fn list_rows(&self, project_id: i64, kind: TaxonomyKind) -> RepoResult<Vec<TaxonomyRow>>;
    /// Gets one row by id.
    fn get_row(&self, id: i64) -> RepoResult<Option<TaxonomyRow>>;
    /// Counts referrers currently pointing at one row.
    fn referent_usage(&self, kind: TaxonomyKind, row_id: i64) -> RepoResult<i64>;
}

/// SQLite-backed taxonomy repository.
pub struct SqliteCatalogRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteCatalogRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl CatalogRepository for SqliteCatalogRepository<'_> {
    fn list_rows(&self, project_id: i64, kind: TaxonomyKind) -> RepoResult<Vec<TaxonomyRow>> {
        let mut stmt = self.conn.prepare(&format!(
            "{ROW_SELECT_SQL}
             WHERE project_id = ?1 AND kind = ?2
             ORDER BY sort_order ASC, id ASC;"
        ))?;
        let mut rows = stmt.query(params![project_id, kind.as_db()])?;
        let mut items = Vec::new();
        while let Some(row) = rows.next()? {
            items.push(parse_taxonomy_row(row)?);
        }
        Ok(items)
    }

    fn get_row(&self, id: i64) -> RepoResult<Option<TaxonomyRow>> {
        load_row_tx(self.conn, id)
    }

    fn referent_usage(&self, kind: TaxonomyKind, row_id: i64) -> RepoResult<i64> {
        referent_usage_count_tx(self.conn, kind, row_id)
    }
}

pub(crate) fn insert_row_tx(
    conn: &Connection,
    project_id: i64,
    kind: TaxonomyKind,
    attrs: &TaxonomyAttrs,
) -> RepoResult<TaxonomyRow> {
    let permissions = encode_permissions(attrs.permissions.as_deref())?;
    conn.execute(
        "INSERT INTO taxonomy_rows (
            project_id,
            kind,
            name,
            sort_order,
            is_closed,
            color,
            wip_limit,
            value,
            slug,
            computable,
            permissions
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11);",
        params![
            project_id,
            kind.as_db(),
            attrs.name,
            attrs.order,
            attrs.is_closed.map(bool_to_int),
            attrs.color,
            attrs.wip_limit,
            attrs.value,
            attrs.slug,
            attrs.computable.map(bool_to_int),
            permissions,
        ],
    )
    .map_err(|err| RepoError::map_unique(err, "taxonomy row", "name"))?;

    let id = conn.last_insert_rowid();
    load_row_tx(conn, id)?.ok_or(RepoError::NotFound {
        entity: "taxonomy row",
        id,
    })
}

pub(crate) fn load_row_tx(conn: &Connection, id: i64) -> RepoResult<Option<TaxonomyRow>> {
    let mut stmt = conn.prepare(&format!("{ROW_SELECT_SQL} WHERE id = ?1;"))?;
    let mut rows = stmt.query([id])?;
    if let Some(row) = rows.next()? {
        return Ok(Some(parse_taxonomy_row(row)?));
    }
    Ok(None)
}

/// Writes every mutable column of one row. The caller applies patches to
/// the record before storing.
pub(crate) fn store_row_tx(conn: &Connection, row: &TaxonomyRow) -> RepoResult<()> {
    let permissions = encode_permissions(row.permissions.as_deref())?;
    let changed = conn
        .execute(
            "UPDATE taxonomy_rows
             SET name = ?2,
                 sort_order = ?3,
                 is_closed = ?4,
                 color = ?5,
                 wip_limit = ?6,
                 value = ?7,
                 computable = ?8,
                 permissions = ?9,
                 modified_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?1;",
            params![
                row.id,
                row.name,
                row.order,
                row.is_closed.map(bool_to_int),
                row.color,
                row.wip_limit,
                row.value,
                row.computable.map(bool_to_int),
                permissions,
            ],
        )
        .map_err(|err| RepoError::map_unique(err, "taxonomy row", "name"))?;
    if changed == 0 {
        return Err(RepoError::NotFound {
            entity: "taxonomy row",
            id: row.id,
        });
    }
    Ok(())
}

pub(crate) fn delete_row_tx(conn: &Connection, id: i64) -> RepoResult<bool> {
    let changed = conn.execute("DELETE FROM taxonomy_rows WHERE id = ?1;", [id])?;
    Ok(changed > 0)
}

/// Counts referrer rows pointing at one taxonomy row.
pub(crate) fn referent_usage_count_tx(
    conn: &Connection,
    kind: TaxonomyKind,
    row_id: i64,
) -> RepoResult<i64> {
    let total = match kind {
        TaxonomyKind::UsStatus => single_count(
            conn,
            "SELECT COUNT(*) FROM userstories WHERE status_id = ?1;",
            row_id,
        )?,
        TaxonomyKind::TaskStatus => single_count(
            conn,
            "SELECT COUNT(*) FROM tasks WHERE status_id = ?1;",
            row_id,
        )?,
        TaxonomyKind::IssueStatus => single_count(
            conn,
            "SELECT COUNT(*) FROM issues WHERE status_id = ?1;",
            row_id,
        )?,
        TaxonomyKind::IssueType => single_count(
            conn,
            "SELECT COUNT(*) FROM issues WHERE type_id = ?1;",
            row_id,
        )?,
        TaxonomyKind::Priority => single_count(
            conn,
            "SELECT COUNT(*) FROM issues WHERE priority_id = ?1;",
            row_id,
        )?,
        TaxonomyKind::Severity => single_count(
            conn,
            "SELECT COUNT(*) FROM issues WHERE severity_id = ?1;",
            row_id,
        )?,
        TaxonomyKind::Points => single_count(
            conn,
            "SELECT COUNT(*) FROM role_points WHERE points_id = ?1;",
            row_id,
        )?,
        TaxonomyKind::Role => {
            single_count(
                conn,
                "SELECT COUNT(*) FROM memberships WHERE role_id = ?1;",
                row_id,
            )? + single_count(
                conn,
                "SELECT COUNT(*) FROM role_points WHERE role_id = ?1;",
                row_id,
            )?
        }
        TaxonomyKind::QuestionStatus => 0,
    };
    Ok(total)
}

/// Repoints every referrer of `deleted` to `replacement`.
///
/// Task and issue `is_closed` mirrors follow the replacement status here;
/// story ids needing a closure recompute are returned to the caller.
pub(crate) fn reassign_referents_tx(
    conn: &Connection,
    deleted: &TaxonomyRow,
    replacement: &TaxonomyRow,
) -> RepoResult<MoveOutcome> {
    let mut outcome = MoveOutcome::default();
    match deleted.kind {
        TaxonomyKind::UsStatus => {
            outcome.stories_to_revisit =
                collect_ids(conn, "SELECT id FROM userstories WHERE status_id = ?1;", deleted.id)?;
            outcome.moved = conn.execute(
                "UPDATE userstories
                 SET status_id = ?2,
                     modified_at = (strftime('%s', 'now') * 1000)
                 WHERE status_id = ?1;",
                params![deleted.id, replacement.id],
            )?;
        }
        TaxonomyKind::TaskStatus => {
            outcome.stories_to_revisit = collect_ids(
                conn,
                "SELECT DISTINCT user_story_id FROM tasks
                 WHERE status_id = ?1 AND user_story_id IS NOT NULL;",
                deleted.id,
            )?;
            outcome.moved = conn.execute(
                "UPDATE tasks
                 SET status_id = ?2,
                     is_closed = ?3,
                     modified_at = (strftime('%s', 'now') * 1000)
                 WHERE status_id = ?1;",
                params![
                    deleted.id,
                    replacement.id,
                    bool_to_int(replacement.closes_referents()),
                ],
            )?;
        }
        TaxonomyKind::IssueStatus => {
            outcome.moved = conn.execute(
                "UPDATE issues
                 SET status_id = ?2,
                     is_closed = ?3,
                     modified_at = (strftime('%s', 'now') * 1000)
                 WHERE status_id = ?1;",
                params![
                    deleted.id,
                    replacement.id,
                    bool_to_int(replacement.closes_referents()),
                ],
            )?;
        }
        TaxonomyKind::IssueType => {
            outcome.moved = conn.execute(
                "UPDATE issues SET type_id = ?2 WHERE type_id = ?1;",
                params![deleted.id, replacement.id],
            )?;
        }
        TaxonomyKind::Priority => {
            outcome.moved = conn.execute(
                "UPDATE issues SET priority_id = ?2 WHERE priority_id = ?1;",
                params![deleted.id, replacement.id],
            )?;
        }
        TaxonomyKind::Severity => {
            outcome.moved = conn.execute(
                "UPDATE issues SET severity_id = ?2 WHERE severity_id = ?1;",
                params![deleted.id, replacement.id],
            )?;
        }
        TaxonomyKind::Points => {
            outcome.moved = conn.execute(
                "UPDATE role_points SET points_id = ?2 WHERE points_id = ?1;",
                params![deleted.id, replacement.id],
            )?;
        }
        TaxonomyKind::Role => {
            let moved_memberships = conn.execute(
                "UPDATE memberships SET role_id = ?2 WHERE role_id = ?1;",
                params![deleted.id, replacement.id],
            )?;
            // A story may already estimate under the replacement role;
            // dropping the doomed edge wins over colliding on reassignment.
            conn.execute(
                "DELETE FROM role_points
                 WHERE role_id = ?1
                   AND user_story_id IN (
                     SELECT user_story_id FROM role_points WHERE role_id = ?2
                   );",
                params![deleted.id, replacement.id],
            )?;
            let moved_points = conn.execute(
                "UPDATE role_points SET role_id = ?2 WHERE role_id = ?1;",
                params![deleted.id, replacement.id],
            )?;
            outcome.moved = moved_memberships + moved_points;
        }
        TaxonomyKind::QuestionStatus => {}
    }
    Ok(outcome)
}

fn single_count(conn: &Connection, sql: &str, row_id: i64) -> RepoResult<i64> {
    let count: i64 = conn.query_row(sql, [row_id], |row| row.get(0))?;
    Ok(count)
}

fn collect_ids(conn: &Connection, sql: &str, bind: i64) -> RepoResult<Vec<i64>> {
    let mut stmt = conn.prepare(sql)?;
    let mut rows = stmt.query([bind])?;
    let mut ids = Vec::new();
    while let Some(row) = rows.next()? {
        ids.push(row.get(0)?);
    }
    Ok(ids)
}

fn encode_permissions(permissions: Option<&[String]>) -> RepoResult<Option<String>> {
    permissions
        .map(|values| {
            serde_json::to_string(values)
                .map_err(|err| RepoError::InvalidData(format!("cannot encode permissions: {err}")))
        })
        .transpose()
}

fn parse_taxonomy_row(row: &Row<'_>) -> RepoResult<TaxonomyRow> {
    let kind_text: String = row.get("kind")?;
    let kind = TaxonomyKind::parse(&kind_text).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid taxonomy kind `{kind_text}` in taxonomy_rows.kind"
        ))
    })?;

    let permissions = match row.get::<_, Option<String>>("permissions")? {
        Some(raw) => Some(serde_json::from_str(&raw).map_err(|err| {
            RepoError::InvalidData(format!("invalid permissions payload `{raw}`: {err}"))
        })?),
        None => None,
    };

    Ok(TaxonomyRow {
        id: row.get("id")?,
        project_id: row.get("project_id")?,
        kind,
        name: row.get("name")?,
        order: row.get("sort_order")?,
        is_closed: row
            .get::<_, Option<i64>>("is_closed")?
            .map(|value| value != 0),
        color: row.get("color")?,
        wip_limit: row.get("wip_limit")?,
        value: row.get("value")?,
        slug: row.get("slug")?,
        computable: row
            .get::<_, Option<i64>>("computable")?
            .map(|value| value != 0),
        permissions,
    })
}

pub(crate) fn load_role_by_slug_tx(
    conn: &Connection,
    project_id: i64,
    slug: &str,
) -> RepoResult<Option<TaxonomyRow>> {
    let mut stmt = conn.prepare(&format!(
        "{ROW_SELECT_SQL} WHERE project_id = ?1 AND kind = 'role' AND slug = ?2;"
    ))?;
    let mut rows = stmt.query(params![project_id, slug])?;
    if let Some(row) = rows.next()? {
        return Ok(Some(parse_taxonomy_row(row)?));
    }
    Ok(None)
}

pub(crate) fn first_role_tx(conn: &Connection, project_id: i64) -> RepoResult<Option<TaxonomyRow>> {
    let mut stmt = conn.prepare(&format!(
        "{ROW_SELECT_SQL}
         WHERE project_id = ?1 AND kind = 'role'
         ORDER BY sort_order ASC, id ASC
         LIMIT 1;"
    ))?;
    let mut rows = stmt.query([project_id])?;
    if let Some(row) = rows.next()? {
        return Ok(Some(parse_taxonomy_row(row)?));
    }
    Ok(None)
}

pub(crate) fn load_row_by_name_tx(
    conn: &Connection,
    project_id: i64,
    kind: TaxonomyKind,
    name: &str,
) -> RepoResult<Option<TaxonomyRow>> {
    let mut stmt = conn.prepare(&format!(
        "{ROW_SELECT_SQL} WHERE project_id = ?1 AND kind = ?2 AND name = ?3;"
    ))?;
    let mut rows = stmt.query(params![project_id, kind.as_db(), name])?;
    if let Some(row) = rows.next()? {
        return Ok(Some(parse_taxonomy_row(row)?));
    }
    Ok(None)
}
