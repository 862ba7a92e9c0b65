//! Project persistence.
//!
//! # Responsibility
//! - Provide project CRUD, ownership counts and default-pointer writes.
//! - Own the JSON encoding of project tags and the `(tag, color)`
//!   registry.
//!
//! # Invariants
//! - `name` and `slug` stay globally unique; violations surface as
//!   `UniqueViolation`.
//! - Default pointers are only ever written through
//!   `store_default_pointer_tx`, which scopes the column by kind.

use crate::model::project::{BlockedCode, Project, TagColor};
use crate::model::taxonomy::TaxonomyKind;
use crate::repo::{bool_to_int, int_to_bool, tags_from_json, tags_to_json, RepoError, RepoResult};
use rusqlite::{params, Connection, OptionalExtension, Row};

const PROJECT_SELECT_SQL: &str = "SELECT
    id,
    name,
    slug,
    description,
    owner_id,
    is_private,
    blocked_code,
    tags,
    tags_colors,
    total_story_points,
    total_milestones,
    creation_template_id,
    default_us_status_id,
    default_task_status_id,
    default_issue_status_id,
    default_issue_type_id,
    default_priority_id,
    default_severity_id,
    default_points_id,
    created_at,
    modified_at
FROM projects";

/// Repository interface for project records.
pub trait ProjectRepository {
    /// Gets one project by id.
    fn get_project(&self, id: i64) -> RepoResult<Option<Project>>;
    /// Gets one project by unique slug.
    fn get_project_by_slug(&self, slug: &str) -> RepoResult<Option<Project>>;
    /// Counts projects owned by one user, optionally filtered by privacy.
    fn count_owned_projects(&self, owner_id: i64, is_private: Option<bool>) -> RepoResult<i64>;
    /// Whether the given project slug is already taken.
    fn slug_taken(&self, slug: &str) -> RepoResult<bool>;
}

/// SQLite-backed project repository.
pub struct SqliteProjectRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteProjectRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl ProjectRepository for SqliteProjectRepository<'_> {
    fn get_project(&self, id: i64) -> RepoResult<Option<Project>> {
        load_project(self.conn, id)
    }

    fn get_project_by_slug(&self, slug: &str) -> RepoResult<Option<Project>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{PROJECT_SELECT_SQL} WHERE slug = ?1;"))?;
        let mut rows = stmt.query([slug])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_project_row(row)?));
        }
        Ok(None)
    }

    fn count_owned_projects(&self, owner_id: i64, is_private: Option<bool>) -> RepoResult<i64> {
        count_owned_projects(self.conn, owner_id, is_private)
    }

    fn slug_taken(&self, slug: &str) -> RepoResult<bool> {
        let taken: i64 = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM projects WHERE slug = ?1);",
            [slug],
            |row| row.get(0),
        )?;
        Ok(taken == 1)
    }
}

pub(crate) fn load_project(conn: &Connection, id: i64) -> RepoResult<Option<Project>> {
    let mut stmt = conn.prepare(&format!("{PROJECT_SELECT_SQL} WHERE id = ?1;"))?;
    let mut rows = stmt.query([id])?;
    if let Some(row) = rows.next()? {
        return Ok(Some(parse_project_row(row)?));
    }
    Ok(None)
}

pub(crate) fn require_project(conn: &Connection, id: i64) -> RepoResult<Project> {
    load_project(conn, id)?.ok_or(RepoError::NotFound {
        entity: "project",
        id,
    })
}

pub(crate) fn count_owned_projects(
    conn: &Connection,
    owner_id: i64,
    is_private: Option<bool>,
) -> RepoResult<i64> {
    let count = match is_private {
        Some(private) => conn.query_row(
            "SELECT COUNT(*) FROM projects WHERE owner_id = ?1 AND is_private = ?2;",
            params![owner_id, bool_to_int(private)],
            |row| row.get(0),
        )?,
        None => conn.query_row(
            "SELECT COUNT(*) FROM projects WHERE owner_id = ?1;",
            [owner_id],
            |row| row.get(0),
        )?,
    };
    Ok(count)
}

/// Inserts the bare project row; catalog and memberships are materialized
/// by the caller inside the same transaction.
pub(crate) fn insert_project_tx(
    conn: &Connection,
    name: &str,
    slug: &str,
    description: &str,
    owner_id: Option<i64>,
    is_private: bool,
    creation_template_id: Option<i64>,
) -> RepoResult<i64> {
    conn.execute(
        "INSERT INTO projects (name, slug, description, owner_id, is_private, creation_template_id)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
        params![
            name,
            slug,
            description,
            owner_id,
            bool_to_int(is_private),
            creation_template_id,
        ],
    )
    .map_err(|err| RepoError::map_unique(err, "project", "name"))?;
    Ok(conn.last_insert_rowid())
}

pub(crate) fn slug_taken_tx(conn: &Connection, slug: &str) -> RepoResult<bool> {
    let taken: i64 = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM projects WHERE slug = ?1);",
        [slug],
        |row| row.get(0),
    )?;
    Ok(taken == 1)
}

fn default_column(kind: TaxonomyKind) -> Option<&'static str> {
    match kind {
        TaxonomyKind::UsStatus => Some("default_us_status_id"),
        TaxonomyKind::TaskStatus => Some("default_task_status_id"),
        TaxonomyKind::IssueStatus => Some("default_issue_status_id"),
        TaxonomyKind::IssueType => Some("default_issue_type_id"),
        TaxonomyKind::Priority => Some("default_priority_id"),
        TaxonomyKind::Severity => Some("default_severity_id"),
        TaxonomyKind::Points => Some("default_points_id"),
        TaxonomyKind::QuestionStatus | TaxonomyKind::Role => None,
    }
}

/// Writes one default pointer. Kinds without a pointer are a no-op.
pub(crate) fn store_default_pointer_tx(
    conn: &Connection,
    project_id: i64,
    kind: TaxonomyKind,
    row_id: Option<i64>,
) -> RepoResult<()> {
    let Some(column) = default_column(kind) else {
        return Ok(());
    };
    let changed = conn.execute(
        &format!(
            "UPDATE projects
             SET {column} = ?2,
                 modified_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?1;"
        ),
        params![project_id, row_id],
    )?;
    if changed == 0 {
        return Err(RepoError::NotFound {
            entity: "project",
            id: project_id,
        });
    }
    Ok(())
}

pub(crate) fn store_project_fields_tx(
    conn: &Connection,
    project_id: i64,
    name: &str,
    description: &str,
    is_private: bool,
) -> RepoResult<()> {
    let changed = conn
        .execute(
            "UPDATE projects
             SET name = ?2,
                 description = ?3,
                 is_private = ?4,
                 modified_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?1;",
            params![project_id, name, description, bool_to_int(is_private)],
        )
        .map_err(|err| RepoError::map_unique(err, "project", "name"))?;
    if changed == 0 {
        return Err(RepoError::NotFound {
            entity: "project",
            id: project_id,
        });
    }
    Ok(())
}

pub(crate) fn store_owner_tx(
    conn: &Connection,
    project_id: i64,
    owner_id: Option<i64>,
) -> RepoResult<()> {
    let changed = conn.execute(
        "UPDATE projects
         SET owner_id = ?2,
             modified_at = (strftime('%s', 'now') * 1000)
         WHERE id = ?1;",
        params![project_id, owner_id],
    )?;
    if changed == 0 {
        return Err(RepoError::NotFound {
            entity: "project",
            id: project_id,
        });
    }
    Ok(())
}

pub(crate) fn store_blocked_code_tx(
    conn: &Connection,
    project_id: i64,
    blocked_code: Option<BlockedCode>,
) -> RepoResult<()> {
    let changed = conn.execute(
        "UPDATE projects
         SET blocked_code = ?2,
             modified_at = (strftime('%s', 'now') * 1000)
         WHERE id = ?1;",
        params![project_id, blocked_code.map(BlockedCode::as_db)],
    )?;
    if changed == 0 {
        return Err(RepoError::NotFound {
            entity: "project",
            id: project_id,
        });
    }
    Ok(())
}

pub(crate) fn store_project_tags_tx(
    conn: &Connection,
    project_id: i64,
    tags: &[String],
) -> RepoResult<()> {
    let changed = conn.execute(
        "UPDATE projects
         SET tags = ?2,
             modified_at = (strftime('%s', 'now') * 1000)
         WHERE id = ?1;",
        params![project_id, tags_to_json(tags)?],
    )?;
    if changed == 0 {
        return Err(RepoError::NotFound {
            entity: "project",
            id: project_id,
        });
    }
    Ok(())
}

pub(crate) fn load_tags_colors_tx(conn: &Connection, project_id: i64) -> RepoResult<Vec<TagColor>> {
    let raw: String = conn
        .query_row(
            "SELECT tags_colors FROM projects WHERE id = ?1;",
            [project_id],
            |row| row.get(0),
        )
        .optional()?
        .ok_or(RepoError::NotFound {
            entity: "project",
            id: project_id,
        })?;
    parse_tags_colors(&raw)
}

pub(crate) fn store_tags_colors_tx(
    conn: &Connection,
    project_id: i64,
    registry: &[TagColor],
) -> RepoResult<()> {
    let encoded = serde_json::to_string(registry)
        .map_err(|err| RepoError::InvalidData(format!("cannot encode tags_colors: {err}")))?;
    let changed = conn.execute(
        "UPDATE projects SET tags_colors = ?2 WHERE id = ?1;",
        params![project_id, encoded],
    )?;
    if changed == 0 {
        return Err(RepoError::NotFound {
            entity: "project",
            id: project_id,
        });
    }
    Ok(())
}

pub(crate) fn delete_project_tx(conn: &Connection, project_id: i64) -> RepoResult<bool> {
    let changed = conn.execute("DELETE FROM projects WHERE id = ?1;", [project_id])?;
    Ok(changed > 0)
}

/// Refreshes the cached totals (story points and milestone count).
pub(crate) fn refresh_totals_tx(conn: &Connection, project_id: i64) -> RepoResult<()> {
    conn.execute(
        "UPDATE projects
         SET total_story_points = (
                SELECT SUM(t.value)
                FROM role_points rp
                INNER JOIN userstories u ON u.id = rp.user_story_id
                LEFT JOIN taxonomy_rows t ON t.id = rp.points_id
                WHERE u.project_id = ?1
             ),
             total_milestones = (
                SELECT COUNT(*) FROM milestones m WHERE m.project_id = ?1
             )
         WHERE id = ?1;",
        [project_id],
    )?;
    Ok(())
}

fn parse_tags_colors(raw: &str) -> RepoResult<Vec<TagColor>> {
    serde_json::from_str(raw).map_err(|err| {
        RepoError::InvalidData(format!("invalid tags_colors payload `{raw}`: {err}"))
    })
}

fn parse_project_row(row: &Row<'_>) -> RepoResult<Project> {
    let blocked_code = match row.get::<_, Option<i64>>("blocked_code")? {
        Some(value) => Some(BlockedCode::parse(value).ok_or_else(|| {
            RepoError::InvalidData(format!(
                "invalid blocked code `{value}` in projects.blocked_code"
            ))
        })?),
        None => None,
    };

    let raw_tags: String = row.get("tags")?;
    let raw_tags_colors: String = row.get("tags_colors")?;

    Ok(Project {
        id: row.get("id")?,
        name: row.get("name")?,
        slug: row.get("slug")?,
        description: row.get("description")?,
        owner_id: row.get("owner_id")?,
        is_private: int_to_bool(row.get("is_private")?, "projects.is_private")?,
        blocked_code,
        tags: tags_from_json(&raw_tags)?,
        tags_colors: parse_tags_colors(&raw_tags_colors)?,
        total_story_points: row.get("total_story_points")?,
        total_milestones: row.get("total_milestones")?,
        creation_template_id: row.get("creation_template_id")?,
        default_us_status_id: row.get("default_us_status_id")?,
        default_task_status_id: row.get("default_task_status_id")?,
        default_issue_status_id: row.get("default_issue_status_id")?,
        default_issue_type_id: row.get("default_issue_type_id")?,
        default_priority_id: row.get("default_priority_id")?,
        default_severity_id: row.get("default_severity_id")?,
        default_points_id: row.get("default_points_id")?,
        created_at: row.get("created_at")?,
        modified_at: row.get("modified_at")?,
    })
}
