//! Referent persistence: user stories, tasks, issues, epics and the
//! per-(project, kind) reference counters.
//!
//! # Responsibility
//! - Allocate reference numbers from the `refs` counter table.
//! - Provide load/insert/store primitives for the four referent tables.
//! - Keep closure-derivation SQL for stories next to the data it reads.
//!
//! # Invariants
//! - `next_ref_tx` must run inside an immediate transaction; the counter
//!   row is the serialization point for ref allocation.
//! - `store_*_tx` bumps `version` on every write.
//! - Loaded rows with unknown enum tokens are rejected, not masked.

use crate::model::referent::{
    Epic, EpicUserStory, Issue, ReferentKind, RolePoints, Task, UserStory,
};
use crate::repo::{bool_to_int, tags_from_json, tags_to_json, RepoError, RepoResult};
use rusqlite::{params, Connection, OptionalExtension, Row};

/// Repository interface for referent reads.
pub trait ReferentRepository {
    fn get_user_story(&self, id: i64) -> RepoResult<Option<UserStory>>;
    fn get_task(&self, id: i64) -> RepoResult<Option<Task>>;
    fn get_issue(&self, id: i64) -> RepoResult<Option<Issue>>;
    fn get_epic(&self, id: i64) -> RepoResult<Option<Epic>>;
    /// Lists a project's stories in backlog order.
    fn list_user_stories(&self, project_id: i64) -> RepoResult<Vec<UserStory>>;
    /// Lists a story's tasks in task order.
    fn list_story_tasks(&self, user_story_id: i64) -> RepoResult<Vec<Task>>;
    /// Current counter value for one `(project, kind)`.
    fn last_ref(&self, project_id: i64, kind: ReferentKind) -> RepoResult<i64>;
    /// Lists the `(epic, story)` edges of one epic, ordered.
    fn list_epic_stories(&self, epic_id: i64) -> RepoResult<Vec<EpicUserStory>>;
    /// Lists the role-points edges of one story.
    fn list_role_points(&self, user_story_id: i64) -> RepoResult<Vec<RolePoints>>;
}

/// SQLite-backed referent repository.
pub struct SqliteReferentRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteReferentRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl ReferentRepository for SqliteReferentRepository<'_> {
    fn get_user_story(&self, id: i64) -> RepoResult<Option<UserStory>> {
        load_user_story_tx(self.conn, id)
    }

    fn get_task(&self, id: i64) -> RepoResult<Option<Task>> {
        load_task_tx(self.conn, id)
    }

    fn get_issue(&self, id: i64) -> RepoResult<Option<Issue>> {
        load_issue_tx(self.conn, id)
    }

    fn get_epic(&self, id: i64) -> RepoResult<Option<Epic>> {
        load_epic_tx(self.conn, id)
    }

    fn list_user_stories(&self, project_id: i64) -> RepoResult<Vec<UserStory>> {
        let mut stmt = self.conn.prepare(&format!(
            "{US_SELECT_SQL} WHERE project_id = ?1 ORDER BY backlog_order ASC, ref ASC;"
        ))?;
        let mut rows = stmt.query([project_id])?;
        let mut items = Vec::new();
        while let Some(row) = rows.next()? {
            items.push(parse_user_story_row(row)?);
        }
        Ok(items)
    }

    fn list_story_tasks(&self, user_story_id: i64) -> RepoResult<Vec<Task>> {
        let mut stmt = self.conn.prepare(&format!(
            "{TASK_SELECT_SQL} WHERE user_story_id = ?1 ORDER BY task_order ASC, ref ASC;"
        ))?;
        let mut rows = stmt.query([user_story_id])?;
        let mut items = Vec::new();
        while let Some(row) = rows.next()? {
            items.push(parse_task_row(row)?);
        }
        Ok(items)
    }

    fn last_ref(&self, project_id: i64, kind: ReferentKind) -> RepoResult<i64> {
        let value: Option<i64> = self
            .conn
            .query_row(
                "SELECT last_ref FROM refs WHERE project_id = ?1 AND kind = ?2;",
                params![project_id, kind.as_db()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value.unwrap_or(0))
    }

    fn list_epic_stories(&self, epic_id: i64) -> RepoResult<Vec<EpicUserStory>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, epic_id, user_story_id, sort_order
             FROM epic_userstories
             WHERE epic_id = ?1
             ORDER BY sort_order ASC, id ASC;",
        )?;
        let mut rows = stmt.query([epic_id])?;
        let mut items = Vec::new();
        while let Some(row) = rows.next()? {
            items.push(EpicUserStory {
                id: row.get("id")?,
                epic_id: row.get("epic_id")?,
                user_story_id: row.get("user_story_id")?,
                order: row.get("sort_order")?,
            });
        }
        Ok(items)
    }

    fn list_role_points(&self, user_story_id: i64) -> RepoResult<Vec<RolePoints>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, user_story_id, role_id, points_id
             FROM role_points
             WHERE user_story_id = ?1
             ORDER BY id ASC;",
        )?;
        let mut rows = stmt.query([user_story_id])?;
        let mut items = Vec::new();
        while let Some(row) = rows.next()? {
            items.push(RolePoints {
                id: row.get("id")?,
                user_story_id: row.get("user_story_id")?,
                role_id: row.get("role_id")?,
                points_id: row.get("points_id")?,
            });
        }
        Ok(items)
    }
}

/// Seeds the four counters of a fresh project at zero.
pub(crate) fn seed_refs_tx(conn: &Connection, project_id: i64) -> RepoResult<()> {
    for kind in ReferentKind::all() {
        conn.execute(
            "INSERT OR IGNORE INTO refs (project_id, kind, last_ref) VALUES (?1, ?2, 0);",
            params![project_id, kind.as_db()],
        )?;
    }
    Ok(())
}

/// Allocates the next reference number for `(project, kind)`.
///
/// The enclosing immediate transaction holds the database write lock, so
/// concurrent allocations serialize and the sequence stays gap-free.
pub(crate) fn next_ref_tx(conn: &Connection, project_id: i64, kind: ReferentKind) -> RepoResult<i64> {
    let next: i64 = conn.query_row(
        "INSERT INTO refs (project_id, kind, last_ref)
         VALUES (?1, ?2, 1)
         ON CONFLICT (project_id, kind) DO UPDATE SET last_ref = last_ref + 1
         RETURNING last_ref;",
        params![project_id, kind.as_db()],
        |row| row.get(0),
    )?;
    Ok(next)
}

// --- user stories ---

const US_SELECT_SQL: &str = "SELECT
    id, project_id, ref, subject, description, owner_id, assigned_to_id,
    status_id, milestone_id, tags, version, is_closed, is_blocked,
    blocked_note, backlog_order, generated_from_issue_id, created_at,
    modified_at
FROM userstories";

pub(crate) fn load_user_story_tx(conn: &Connection, id: i64) -> RepoResult<Option<UserStory>> {
    let mut stmt = conn.prepare(&format!("{US_SELECT_SQL} WHERE id = ?1;"))?;
    let mut rows = stmt.query([id])?;
    if let Some(row) = rows.next()? {
        return Ok(Some(parse_user_story_row(row)?));
    }
    Ok(None)
}

pub(crate) fn require_user_story_tx(conn: &Connection, id: i64) -> RepoResult<UserStory> {
    load_user_story_tx(conn, id)?.ok_or(RepoError::NotFound {
        entity: "user story",
        id,
    })
}

#[allow(clippy::too_many_arguments)]
pub(crate) fn insert_user_story_tx(
    conn: &Connection,
    project_id: i64,
    ref_num: i64,
    subject: &str,
    description: &str,
    owner_id: Option<i64>,
    assigned_to_id: Option<i64>,
    status_id: Option<i64>,
    milestone_id: Option<i64>,
    tags: &[String],
    is_closed: bool,
    backlog_order: i64,
    generated_from_issue_id: Option<i64>,
) -> RepoResult<i64> {
    conn.execute(
        "INSERT INTO userstories (
            project_id, ref, subject, description, owner_id, assigned_to_id,
            status_id, milestone_id, tags, is_closed, backlog_order,
            generated_from_issue_id
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12);",
        params![
            project_id,
            ref_num,
            subject,
            description,
            owner_id,
            assigned_to_id,
            status_id,
            milestone_id,
            tags_to_json(tags)?,
            bool_to_int(is_closed),
            backlog_order,
            generated_from_issue_id,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Writes every mutable story column and bumps `version`.
pub(crate) fn store_user_story_tx(conn: &Connection, story: &UserStory) -> RepoResult<()> {
    let changed = conn.execute(
        "UPDATE userstories
         SET subject = ?2,
             description = ?3,
             assigned_to_id = ?4,
             status_id = ?5,
             milestone_id = ?6,
             tags = ?7,
             is_closed = ?8,
             is_blocked = ?9,
             blocked_note = ?10,
             backlog_order = ?11,
             version = version + 1,
             modified_at = (strftime('%s', 'now') * 1000)
         WHERE id = ?1;",
        params![
            story.id,
            story.subject,
            story.description,
            story.assigned_to_id,
            story.status_id,
            story.milestone_id,
            tags_to_json(&story.tags)?,
            bool_to_int(story.is_closed),
            bool_to_int(story.is_blocked),
            story.blocked_note,
            story.backlog_order,
        ],
    )?;
    if changed == 0 {
        return Err(RepoError::NotFound {
            entity: "user story",
            id: story.id,
        });
    }
    Ok(())
}

pub(crate) fn delete_user_story_tx(conn: &Connection, id: i64) -> RepoResult<bool> {
    let changed = conn.execute("DELETE FROM userstories WHERE id = ?1;", [id])?;
    Ok(changed > 0)
}

fn parse_user_story_row(row: &Row<'_>) -> RepoResult<UserStory> {
    let raw_tags: String = row.get("tags")?;
    Ok(UserStory {
        id: row.get("id")?,
        project_id: row.get("project_id")?,
        ref_num: row.get("ref")?,
        subject: row.get("subject")?,
        description: row.get("description")?,
        owner_id: row.get("owner_id")?,
        assigned_to_id: row.get("assigned_to_id")?,
        status_id: row.get("status_id")?,
        milestone_id: row.get("milestone_id")?,
        tags: tags_from_json(&raw_tags)?,
        version: row.get("version")?,
        is_closed: row.get::<_, i64>("is_closed")? != 0,
        is_blocked: row.get::<_, i64>("is_blocked")? != 0,
        blocked_note: row.get("blocked_note")?,
        backlog_order: row.get("backlog_order")?,
        generated_from_issue_id: row.get("generated_from_issue_id")?,
        created_at: row.get("created_at")?,
        modified_at: row.get("modified_at")?,
    })
}

// --- tasks ---

const TASK_SELECT_SQL: &str = "SELECT
    id, project_id, ref, subject, description, owner_id, assigned_to_id,
    status_id, milestone_id, user_story_id, tags, version, is_closed,
    is_blocked, blocked_note, task_order, is_iocaine, created_at,
    modified_at
FROM tasks";

pub(crate) fn load_task_tx(conn: &Connection, id: i64) -> RepoResult<Option<Task>> {
    let mut stmt = conn.prepare(&format!("{TASK_SELECT_SQL} WHERE id = ?1;"))?;
    let mut rows = stmt.query([id])?;
    if let Some(row) = rows.next()? {
        return Ok(Some(parse_task_row(row)?));
    }
    Ok(None)
}

pub(crate) fn require_task_tx(conn: &Connection, id: i64) -> RepoResult<Task> {
    load_task_tx(conn, id)?.ok_or(RepoError::NotFound {
        entity: "task",
        id,
    })
}

#[allow(clippy::too_many_arguments)]
pub(crate) fn insert_task_tx(
    conn: &Connection,
    project_id: i64,
    ref_num: i64,
    subject: &str,
    description: &str,
    owner_id: Option<i64>,
    assigned_to_id: Option<i64>,
    status_id: Option<i64>,
    milestone_id: Option<i64>,
    user_story_id: Option<i64>,
    tags: &[String],
    is_closed: bool,
    task_order: i64,
    is_iocaine: bool,
) -> RepoResult<i64> {
    conn.execute(
        "INSERT INTO tasks (
            project_id, ref, subject, description, owner_id, assigned_to_id,
            status_id, milestone_id, user_story_id, tags, is_closed,
            task_order, is_iocaine
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13);",
        params![
            project_id,
            ref_num,
            subject,
            description,
            owner_id,
            assigned_to_id,
            status_id,
            milestone_id,
            user_story_id,
            tags_to_json(tags)?,
            bool_to_int(is_closed),
            task_order,
            bool_to_int(is_iocaine),
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub(crate) fn store_task_tx(conn: &Connection, task: &Task) -> RepoResult<()> {
    let changed = conn.execute(
        "UPDATE tasks
         SET subject = ?2,
             description = ?3,
             assigned_to_id = ?4,
             status_id = ?5,
             milestone_id = ?6,
             user_story_id = ?7,
             tags = ?8,
             is_closed = ?9,
             is_blocked = ?10,
             blocked_note = ?11,
             task_order = ?12,
             is_iocaine = ?13,
             version = version + 1,
             modified_at = (strftime('%s', 'now') * 1000)
         WHERE id = ?1;",
        params![
            task.id,
            task.subject,
            task.description,
            task.assigned_to_id,
            task.status_id,
            task.milestone_id,
            task.user_story_id,
            tags_to_json(&task.tags)?,
            bool_to_int(task.is_closed),
            bool_to_int(task.is_blocked),
            task.blocked_note,
            task.task_order,
            bool_to_int(task.is_iocaine),
        ],
    )?;
    if changed == 0 {
        return Err(RepoError::NotFound {
            entity: "task",
            id: task.id,
        });
    }
    Ok(())
}

pub(crate) fn delete_task_tx(conn: &Connection, id: i64) -> RepoResult<bool> {
    let changed = conn.execute("DELETE FROM tasks WHERE id = ?1;", [id])?;
    Ok(changed > 0)
}

fn parse_task_row(row: &Row<'_>) -> RepoResult<Task> {
    let raw_tags: String = row.get("tags")?;
    Ok(Task {
        id: row.get("id")?,
        project_id: row.get("project_id")?,
        ref_num: row.get("ref")?,
        subject: row.get("subject")?,
        description: row.get("description")?,
        owner_id: row.get("owner_id")?,
        assigned_to_id: row.get("assigned_to_id")?,
        status_id: row.get("status_id")?,
        milestone_id: row.get("milestone_id")?,
        user_story_id: row.get("user_story_id")?,
        tags: tags_from_json(&raw_tags)?,
        version: row.get("version")?,
        is_closed: row.get::<_, i64>("is_closed")? != 0,
        is_blocked: row.get::<_, i64>("is_blocked")? != 0,
        blocked_note: row.get("blocked_note")?,
        task_order: row.get("task_order")?,
        is_iocaine: row.get::<_, i64>("is_iocaine")? != 0,
        created_at: row.get("created_at")?,
        modified_at: row.get("modified_at")?,
    })
}

// --- issues ---

const ISSUE_SELECT_SQL: &str = "SELECT
    id, project_id, ref, subject, description, owner_id, assigned_to_id,
    status_id, severity_id, priority_id, type_id, milestone_id, tags,
    version, is_closed, is_blocked, blocked_note, created_at, modified_at
FROM issues";

pub(crate) fn load_issue_tx(conn: &Connection, id: i64) -> RepoResult<Option<Issue>> {
    let mut stmt = conn.prepare(&format!("{ISSUE_SELECT_SQL} WHERE id = ?1;"))?;
    let mut rows = stmt.query([id])?;
    if let Some(row) = rows.next()? {
        return Ok(Some(parse_issue_row(row)?));
    }
    Ok(None)
}

pub(crate) fn require_issue_tx(conn: &Connection, id: i64) -> RepoResult<Issue> {
    load_issue_tx(conn, id)?.ok_or(RepoError::NotFound {
        entity: "issue",
        id,
    })
}

#[allow(clippy::too_many_arguments)]
pub(crate) fn insert_issue_tx(
    conn: &Connection,
    project_id: i64,
    ref_num: i64,
    subject: &str,
    description: &str,
    owner_id: Option<i64>,
    assigned_to_id: Option<i64>,
    status_id: Option<i64>,
    severity_id: Option<i64>,
    priority_id: Option<i64>,
    type_id: Option<i64>,
    milestone_id: Option<i64>,
    tags: &[String],
    is_closed: bool,
) -> RepoResult<i64> {
    conn.execute(
        "INSERT INTO issues (
            project_id, ref, subject, description, owner_id, assigned_to_id,
            status_id, severity_id, priority_id, type_id, milestone_id,
            tags, is_closed
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13);",
        params![
            project_id,
            ref_num,
            subject,
            description,
            owner_id,
            assigned_to_id,
            status_id,
            severity_id,
            priority_id,
            type_id,
            milestone_id,
            tags_to_json(tags)?,
            bool_to_int(is_closed),
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub(crate) fn store_issue_tx(conn: &Connection, issue: &Issue) -> RepoResult<()> {
    let changed = conn.execute(
        "UPDATE issues
         SET subject = ?2,
             description = ?3,
             assigned_to_id = ?4,
             status_id = ?5,
             severity_id = ?6,
             priority_id = ?7,
             type_id = ?8,
             milestone_id = ?9,
             tags = ?10,
             is_closed = ?11,
             is_blocked = ?12,
             blocked_note = ?13,
             version = version + 1,
             modified_at = (strftime('%s', 'now') * 1000)
         WHERE id = ?1;",
        params![
            issue.id,
            issue.subject,
            issue.description,
            issue.assigned_to_id,
            issue.status_id,
            issue.severity_id,
            issue.priority_id,
            issue.type_id,
            issue.milestone_id,
            tags_to_json(&issue.tags)?,
            bool_to_int(issue.is_closed),
            bool_to_int(issue.is_blocked),
            issue.blocked_note,
        ],
    )?;
    if changed == 0 {
        return Err(RepoError::NotFound {
            entity: "issue",
            id: issue.id,
        });
    }
    Ok(())
}

pub(crate) fn delete_issue_tx(conn: &Connection, id: i64) -> RepoResult<bool> {
    let changed = conn.execute("DELETE FROM issues WHERE id = ?1;", [id])?;
    Ok(changed > 0)
}

fn parse_issue_row(row: &Row<'_>) -> RepoResult<Issue> {
    let raw_tags: String = row.get("tags")?;
    Ok(Issue {
        id: row.get("id")?,
        project_id: row.get("project_id")?,
        ref_num: row.get("ref")?,
        subject: row.get("subject")?,
        description: row.get("description")?,
        owner_id: row.get("owner_id")?,
        assigned_to_id: row.get("assigned_to_id")?,
        status_id: row.get("status_id")?,
        severity_id: row.get("severity_id")?,
        priority_id: row.get("priority_id")?,
        type_id: row.get("type_id")?,
        milestone_id: row.get("milestone_id")?,
        tags: tags_from_json(&raw_tags)?,
        version: row.get("version")?,
        is_closed: row.get::<_, i64>("is_closed")? != 0,
        is_blocked: row.get::<_, i64>("is_blocked")? != 0,
        blocked_note: row.get("blocked_note")?,
        created_at: row.get("created_at")?,
        modified_at: row.get("modified_at")?,
    })
}

// --- epics ---

const EPIC_SELECT_SQL: &str = "SELECT
    id, project_id, ref, subject, description, owner_id, assigned_to_id,
    color, tags, version, is_closed, is_blocked, blocked_note,
    epics_order, created_at, modified_at
FROM epics";

pub(crate) fn load_epic_tx(conn: &Connection, id: i64) -> RepoResult<Option<Epic>> {
    let mut stmt = conn.prepare(&format!("{EPIC_SELECT_SQL} WHERE id = ?1;"))?;
    let mut rows = stmt.query([id])?;
    if let Some(row) = rows.next()? {
        return Ok(Some(parse_epic_row(row)?));
    }
    Ok(None)
}

pub(crate) fn require_epic_tx(conn: &Connection, id: i64) -> RepoResult<Epic> {
    load_epic_tx(conn, id)?.ok_or(RepoError::NotFound {
        entity: "epic",
        id,
    })
}

#[allow(clippy::too_many_arguments)]
pub(crate) fn insert_epic_tx(
    conn: &Connection,
    project_id: i64,
    ref_num: i64,
    subject: &str,
    description: &str,
    owner_id: Option<i64>,
    assigned_to_id: Option<i64>,
    color: Option<&str>,
    tags: &[String],
    epics_order: i64,
) -> RepoResult<i64> {
    conn.execute(
        "INSERT INTO epics (
            project_id, ref, subject, description, owner_id, assigned_to_id,
            color, tags, epics_order
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9);",
        params![
            project_id,
            ref_num,
            subject,
            description,
            owner_id,
            assigned_to_id,
            color,
            tags_to_json(tags)?,
            epics_order,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub(crate) fn store_epic_tx(conn: &Connection, epic: &Epic) -> RepoResult<()> {
    let changed = conn.execute(
        "UPDATE epics
         SET subject = ?2,
             description = ?3,
             assigned_to_id = ?4,
             color = ?5,
             tags = ?6,
             is_closed = ?7,
             is_blocked = ?8,
             blocked_note = ?9,
             epics_order = ?10,
             version = version + 1,
             modified_at = (strftime('%s', 'now') * 1000)
         WHERE id = ?1;",
        params![
            epic.id,
            epic.subject,
            epic.description,
            epic.assigned_to_id,
            epic.color,
            tags_to_json(&epic.tags)?,
            bool_to_int(epic.is_closed),
            bool_to_int(epic.is_blocked),
            epic.blocked_note,
            epic.epics_order,
        ],
    )?;
    if changed == 0 {
        return Err(RepoError::NotFound {
            entity: "epic",
            id: epic.id,
        });
    }
    Ok(())
}

pub(crate) fn delete_epic_tx(conn: &Connection, id: i64) -> RepoResult<bool> {
    let changed = conn.execute("DELETE FROM epics WHERE id = ?1;", [id])?;
    Ok(changed > 0)
}

fn parse_epic_row(row: &Row<'_>) -> RepoResult<Epic> {
    let raw_tags: String = row.get("tags")?;
    Ok(Epic {
        id: row.get("id")?,
        project_id: row.get("project_id")?,
        ref_num: row.get("ref")?,
        subject: row.get("subject")?,
        description: row.get("description")?,
        owner_id: row.get("owner_id")?,
        assigned_to_id: row.get("assigned_to_id")?,
        color: row.get("color")?,
        tags: tags_from_json(&raw_tags)?,
        version: row.get("version")?,
        is_closed: row.get::<_, i64>("is_closed")? != 0,
        is_blocked: row.get::<_, i64>("is_blocked")? != 0,
        blocked_note: row.get("blocked_note")?,
        epics_order: row.get("epics_order")?,
        created_at: row.get("created_at")?,
        modified_at: row.get("modified_at")?,
    })
}

// --- joins ---

/// Seeds a role-points edge for every computable role of the project,
/// using the project's default points row.
pub(crate) fn seed_role_points_tx(
    conn: &Connection,
    user_story_id: i64,
    project_id: i64,
    default_points_id: Option<i64>,
) -> RepoResult<()> {
    conn.execute(
        "INSERT OR IGNORE INTO role_points (user_story_id, role_id, points_id)
         SELECT ?1, id, ?3
         FROM taxonomy_rows
         WHERE project_id = ?2 AND kind = 'role' AND computable = 1;",
        params![user_story_id, project_id, default_points_id],
    )?;
    Ok(())
}

pub(crate) fn upsert_role_points_tx(
    conn: &Connection,
    user_story_id: i64,
    role_id: i64,
    points_id: Option<i64>,
) -> RepoResult<()> {
    conn.execute(
        "INSERT INTO role_points (user_story_id, role_id, points_id)
         VALUES (?1, ?2, ?3)
         ON CONFLICT (user_story_id, role_id) DO UPDATE SET points_id = excluded.points_id;",
        params![user_story_id, role_id, points_id],
    )?;
    Ok(())
}

pub(crate) fn link_epic_story_tx(
    conn: &Connection,
    epic_id: i64,
    user_story_id: i64,
    order: i64,
) -> RepoResult<()> {
    conn.execute(
        "INSERT INTO epic_userstories (epic_id, user_story_id, sort_order)
         VALUES (?1, ?2, ?3)
         ON CONFLICT (epic_id, user_story_id) DO UPDATE SET sort_order = excluded.sort_order;",
        params![epic_id, user_story_id, order],
    )?;
    Ok(())
}

pub(crate) fn unlink_epic_story_tx(
    conn: &Connection,
    epic_id: i64,
    user_story_id: i64,
) -> RepoResult<bool> {
    let changed = conn.execute(
        "DELETE FROM epic_userstories WHERE epic_id = ?1 AND user_story_id = ?2;",
        params![epic_id, user_story_id],
    )?;
    Ok(changed > 0)
}

// --- closure derivation ---

/// A story is closed iff its own status closes it and every attached task
/// is closed; a task with no status counts as open.
pub(crate) fn derive_story_closed_tx(conn: &Connection, user_story_id: i64) -> RepoResult<bool> {
    let closed: i64 = conn.query_row(
        "SELECT
            COALESCE((SELECT t.is_closed
                      FROM taxonomy_rows t
                      WHERE t.id = u.status_id), 0)
            AND NOT EXISTS (
                SELECT 1
                FROM tasks k
                LEFT JOIN taxonomy_rows ts ON ts.id = k.status_id
                WHERE k.user_story_id = u.id
                  AND COALESCE(ts.is_closed, 0) = 0
            )
         FROM userstories u
         WHERE u.id = ?1;",
        [user_story_id],
        |row| row.get(0),
    )?;
    Ok(closed == 1)
}

/// Writes the derived mirror; returns whether the stored value flipped.
pub(crate) fn set_story_closed_tx(
    conn: &Connection,
    user_story_id: i64,
    is_closed: bool,
) -> RepoResult<bool> {
    let changed = conn.execute(
        "UPDATE userstories
         SET is_closed = ?2
         WHERE id = ?1 AND is_closed <> ?2;",
        params![user_story_id, bool_to_int(is_closed)],
    )?;
    Ok(changed > 0)
}

/// Story ids of one project using any status of the given status row's
/// kind lineage: direct users for story statuses, parents of using tasks
/// for task statuses.
pub(crate) fn stories_using_status_tx(conn: &Connection, status_id: i64) -> RepoResult<Vec<i64>> {
    let mut ids = Vec::new();
    let mut stmt = conn.prepare("SELECT id FROM userstories WHERE status_id = ?1;")?;
    let mut rows = stmt.query([status_id])?;
    while let Some(row) = rows.next()? {
        ids.push(row.get(0)?);
    }
    Ok(ids)
}

pub(crate) fn story_parents_of_task_status_tx(
    conn: &Connection,
    status_id: i64,
) -> RepoResult<Vec<i64>> {
    let mut ids = Vec::new();
    let mut stmt = conn.prepare(
        "SELECT DISTINCT user_story_id
         FROM tasks
         WHERE status_id = ?1 AND user_story_id IS NOT NULL;",
    )?;
    let mut rows = stmt.query([status_id])?;
    while let Some(row) = rows.next()? {
        ids.push(row.get(0)?);
    }
    Ok(ids)
}

/// Bulk-refreshes the direct status mirror of tasks and issues after a
/// status row's `is_closed` toggled.
pub(crate) fn refresh_status_mirrors_tx(conn: &Connection, status_id: i64) -> RepoResult<()> {
    conn.execute(
        "UPDATE tasks
         SET is_closed = (SELECT COALESCE(t.is_closed, 0) FROM taxonomy_rows t WHERE t.id = ?1)
         WHERE status_id = ?1;",
        [status_id],
    )?;
    conn.execute(
        "UPDATE issues
         SET is_closed = (SELECT COALESCE(t.is_closed, 0) FROM taxonomy_rows t WHERE t.id = ?1)
         WHERE status_id = ?1;",
        [status_id],
    )?;
    Ok(())
}

/// Collects every tag used by the project's taggable items, including the
/// project's own tag list.
pub(crate) fn gather_used_tags_tx(
    conn: &Connection,
    project_id: i64,
) -> RepoResult<std::collections::HashSet<String>> {
    let mut used = std::collections::HashSet::new();

    let raw_project: String = conn.query_row(
        "SELECT tags FROM projects WHERE id = ?1;",
        [project_id],
        |row| row.get(0),
    )?;
    used.extend(tags_from_json(&raw_project)?);

    for table in ["userstories", "tasks", "issues", "epics"] {
        let mut stmt =
            conn.prepare(&format!("SELECT tags FROM {table} WHERE project_id = ?1;"))?;
        let mut rows = stmt.query([project_id])?;
        while let Some(row) = rows.next()? {
            let raw: String = row.get(0)?;
            used.extend(tags_from_json(&raw)?);
        }
    }
    Ok(used)
}
