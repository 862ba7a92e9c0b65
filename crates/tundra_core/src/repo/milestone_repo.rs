//! Milestone persistence and milestone closure derivation.
//!
//! # Responsibility
//! - Provide milestone CRUD with per-project name/slug uniqueness.
//! - Keep the closure-derivation SQL for milestones next to the data.
//!
//! # Invariants
//! - `(project, name)` and `(project, slug)` violations surface as
//!   `UniqueViolation`.
//! - An empty milestone never derives as closed.

use crate::model::milestone::Milestone;
use crate::repo::{bool_to_int, RepoError, RepoResult};
use rusqlite::{params, Connection, Row};

const MILESTONE_SELECT_SQL: &str = "SELECT
    id, project_id, name, slug, estimated_start, estimated_finish,
    is_closed, sort_order, created_at, modified_at
FROM milestones";

/// Repository interface for milestones.
pub trait MilestoneRepository {
    fn get_milestone(&self, id: i64) -> RepoResult<Option<Milestone>>;
    fn list_for_project(&self, project_id: i64) -> RepoResult<Vec<Milestone>>;
    /// Creates one milestone; the caller supplies a project-unique slug.
    fn create_milestone(
        &self,
        project_id: i64,
        name: &str,
        slug: &str,
        estimated_start: Option<i64>,
        estimated_finish: Option<i64>,
        order: i64,
    ) -> RepoResult<Milestone>;
    /// Writes every mutable milestone column.
    fn store_milestone(&self, milestone: &Milestone) -> RepoResult<()>;
    fn delete_milestone(&self, id: i64) -> RepoResult<bool>;
    /// Whether the milestone slug is taken within the project.
    fn slug_taken(&self, project_id: i64, slug: &str) -> RepoResult<bool>;
}

/// SQLite-backed milestone repository.
pub struct SqliteMilestoneRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteMilestoneRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl MilestoneRepository for SqliteMilestoneRepository<'_> {
    fn get_milestone(&self, id: i64) -> RepoResult<Option<Milestone>> {
        load_milestone_tx(self.conn, id)
    }

    fn list_for_project(&self, project_id: i64) -> RepoResult<Vec<Milestone>> {
        let mut stmt = self.conn.prepare(&format!(
            "{MILESTONE_SELECT_SQL} WHERE project_id = ?1 ORDER BY sort_order ASC, id ASC;"
        ))?;
        let mut rows = stmt.query([project_id])?;
        let mut items = Vec::new();
        while let Some(row) = rows.next()? {
            items.push(parse_milestone_row(row)?);
        }
        Ok(items)
    }

    fn create_milestone(
        &self,
        project_id: i64,
        name: &str,
        slug: &str,
        estimated_start: Option<i64>,
        estimated_finish: Option<i64>,
        order: i64,
    ) -> RepoResult<Milestone> {
        self.conn
            .execute(
                "INSERT INTO milestones (
                    project_id, name, slug, estimated_start, estimated_finish, sort_order
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
                params![project_id, name, slug, estimated_start, estimated_finish, order],
            )
            .map_err(|err| RepoError::map_unique(err, "milestone", "name"))?;

        let id = self.conn.last_insert_rowid();
        load_milestone_tx(self.conn, id)?.ok_or(RepoError::NotFound {
            entity: "milestone",
            id,
        })
    }

    fn store_milestone(&self, milestone: &Milestone) -> RepoResult<()> {
        let changed = self
            .conn
            .execute(
                "UPDATE milestones
                 SET name = ?2,
                     estimated_start = ?3,
                     estimated_finish = ?4,
                     is_closed = ?5,
                     sort_order = ?6,
                     modified_at = (strftime('%s', 'now') * 1000)
                 WHERE id = ?1;",
                params![
                    milestone.id,
                    milestone.name,
                    milestone.estimated_start,
                    milestone.estimated_finish,
                    bool_to_int(milestone.is_closed),
                    milestone.order,
                ],
            )
            .map_err(|err| RepoError::map_unique(err, "milestone", "name"))?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: "milestone",
                id: milestone.id,
            });
        }
        Ok(())
    }

    fn delete_milestone(&self, id: i64) -> RepoResult<bool> {
        let changed = self.conn.execute("DELETE FROM milestones WHERE id = ?1;", [id])?;
        Ok(changed > 0)
    }

    fn slug_taken(&self, project_id: i64, slug: &str) -> RepoResult<bool> {
        let taken: i64 = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM milestones WHERE project_id = ?1 AND slug = ?2);",
            params![project_id, slug],
            |row| row.get(0),
        )?;
        Ok(taken == 1)
    }
}

pub(crate) fn load_milestone_tx(conn: &Connection, id: i64) -> RepoResult<Option<Milestone>> {
    let mut stmt = conn.prepare(&format!("{MILESTONE_SELECT_SQL} WHERE id = ?1;"))?;
    let mut rows = stmt.query([id])?;
    if let Some(row) = rows.next()? {
        return Ok(Some(parse_milestone_row(row)?));
    }
    Ok(None)
}

/// A milestone is closed iff it holds at least one item and all of its
/// stories, story-less tasks and issues are closed.
pub(crate) fn derive_milestone_closed_tx(conn: &Connection, milestone_id: i64) -> RepoResult<bool> {
    let closed: i64 = conn.query_row(
        "SELECT
            (
                (SELECT COUNT(*) FROM userstories WHERE milestone_id = ?1)
                + (SELECT COUNT(*) FROM tasks
                   WHERE milestone_id = ?1 AND user_story_id IS NULL)
                + (SELECT COUNT(*) FROM issues WHERE milestone_id = ?1)
            ) > 0
            AND NOT EXISTS (
                SELECT 1 FROM userstories
                WHERE milestone_id = ?1 AND is_closed = 0
            )
            AND NOT EXISTS (
                SELECT 1 FROM tasks
                WHERE milestone_id = ?1 AND user_story_id IS NULL AND is_closed = 0
            )
            AND NOT EXISTS (
                SELECT 1 FROM issues
                WHERE milestone_id = ?1 AND is_closed = 0
            );",
        [milestone_id],
        |row| row.get(0),
    )?;
    Ok(closed == 1)
}

/// Writes the derived closed flag; returns whether it flipped.
pub(crate) fn set_milestone_closed_tx(
    conn: &Connection,
    milestone_id: i64,
    is_closed: bool,
) -> RepoResult<bool> {
    let changed = conn.execute(
        "UPDATE milestones
         SET is_closed = ?2
         WHERE id = ?1 AND is_closed <> ?2;",
        params![milestone_id, bool_to_int(is_closed)],
    )?;
    Ok(changed > 0)
}

fn parse_milestone_row(row: &Row<'_>) -> RepoResult<Milestone> {
    Ok(Milestone {
        id: row.get("id")?,
        project_id: row.get("project_id")?,
        name: row.get("name")?,
        slug: row.get("slug")?,
        estimated_start: row.get("estimated_start")?,
        estimated_finish: row.get("estimated_finish")?,
        is_closed: row.get::<_, i64>("is_closed")? != 0,
        order: row.get("sort_order")?,
        created_at: row.get("created_at")?,
        modified_at: row.get("modified_at")?,
    })
}
