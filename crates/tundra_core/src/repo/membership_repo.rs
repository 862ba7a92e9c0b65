//! Membership persistence: confirmed members and pending invitations.
//!
//! # Responsibility
//! - Provide membership CRUD plus the distinct-member counts the quota
//!   governor consumes.
//!
//! # Invariants
//! - `(user, project)` uniqueness surfaces as `UniqueViolation`.
//! - Acceptance clears `token` and sets `user_id` atomically.

use crate::model::membership::Membership;
use crate::repo::{bool_to_int, RepoError, RepoResult};
use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

const MEMBERSHIP_SELECT_SQL: &str = "SELECT
    id, user_id, project_id, role_id, is_admin, email, token,
    invited_by_id, created_at
FROM memberships";

/// Repository interface for memberships.
pub trait MembershipRepository {
    fn get_membership(&self, id: i64) -> RepoResult<Option<Membership>>;
    /// Membership of one user in one project, if confirmed or invited.
    fn find_for_user(&self, project_id: i64, user_id: i64) -> RepoResult<Option<Membership>>;
    /// All memberships of a project, invitations included.
    fn list_for_project(&self, project_id: i64) -> RepoResult<Vec<Membership>>;
    /// Distinct members: confirmed users plus distinct pending emails.
    fn distinct_member_count(&self, project_id: i64) -> RepoResult<i64>;
    /// Pending invitation by token.
    fn find_by_token(&self, token: Uuid) -> RepoResult<Option<Membership>>;
}

/// SQLite-backed membership repository.
pub struct SqliteMembershipRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteMembershipRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl MembershipRepository for SqliteMembershipRepository<'_> {
    fn get_membership(&self, id: i64) -> RepoResult<Option<Membership>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{MEMBERSHIP_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_membership_row(row)?));
        }
        Ok(None)
    }

    fn find_for_user(&self, project_id: i64, user_id: i64) -> RepoResult<Option<Membership>> {
        find_membership_tx(self.conn, project_id, user_id)
    }

    fn list_for_project(&self, project_id: i64) -> RepoResult<Vec<Membership>> {
        let mut stmt = self.conn.prepare(&format!(
            "{MEMBERSHIP_SELECT_SQL} WHERE project_id = ?1 ORDER BY id ASC;"
        ))?;
        let mut rows = stmt.query([project_id])?;
        let mut items = Vec::new();
        while let Some(row) = rows.next()? {
            items.push(parse_membership_row(row)?);
        }
        Ok(items)
    }

    fn distinct_member_count(&self, project_id: i64) -> RepoResult<i64> {
        distinct_member_count_tx(self.conn, project_id)
    }

    fn find_by_token(&self, token: Uuid) -> RepoResult<Option<Membership>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{MEMBERSHIP_SELECT_SQL} WHERE token = ?1;"))?;
        let mut rows = stmt.query([token.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_membership_row(row)?));
        }
        Ok(None)
    }
}

pub(crate) fn find_membership_tx(
    conn: &Connection,
    project_id: i64,
    user_id: i64,
) -> RepoResult<Option<Membership>> {
    let mut stmt = conn.prepare(&format!(
        "{MEMBERSHIP_SELECT_SQL} WHERE project_id = ?1 AND user_id = ?2;"
    ))?;
    let mut rows = stmt.query(params![project_id, user_id])?;
    if let Some(row) = rows.next()? {
        return Ok(Some(parse_membership_row(row)?));
    }
    Ok(None)
}

pub(crate) fn distinct_member_count_tx(conn: &Connection, project_id: i64) -> RepoResult<i64> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(DISTINCT user_id) + COUNT(DISTINCT CASE WHEN user_id IS NULL THEN email END)
         FROM memberships
         WHERE project_id = ?1;",
        [project_id],
        |row| row.get(0),
    )?;
    Ok(count)
}

#[allow(clippy::too_many_arguments)]
pub(crate) fn insert_membership_tx(
    conn: &Connection,
    project_id: i64,
    user_id: Option<i64>,
    role_id: i64,
    is_admin: bool,
    email: Option<&str>,
    token: Option<Uuid>,
    invited_by_id: Option<i64>,
) -> RepoResult<i64> {
    conn.execute(
        "INSERT INTO memberships (
            user_id, project_id, role_id, is_admin, email, token, invited_by_id
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7);",
        params![
            user_id,
            project_id,
            role_id,
            bool_to_int(is_admin),
            email,
            token.map(|value| value.to_string()),
            invited_by_id,
        ],
    )
    .map_err(|err| RepoError::map_unique(err, "membership", "user"))?;
    Ok(conn.last_insert_rowid())
}

pub(crate) fn load_membership_tx(conn: &Connection, id: i64) -> RepoResult<Option<Membership>> {
    let mut stmt = conn.prepare(&format!("{MEMBERSHIP_SELECT_SQL} WHERE id = ?1;"))?;
    let mut rows = stmt.query([id])?;
    if let Some(row) = rows.next()? {
        return Ok(Some(parse_membership_row(row)?));
    }
    Ok(None)
}

/// Confirms a pending invitation: binds the user, clears email and token.
pub(crate) fn accept_invitation_tx(
    conn: &Connection,
    membership_id: i64,
    user_id: i64,
) -> RepoResult<()> {
    let changed = conn
        .execute(
            "UPDATE memberships
             SET user_id = ?2,
                 email = NULL,
                 token = NULL
             WHERE id = ?1 AND user_id IS NULL;",
            params![membership_id, user_id],
        )
        .map_err(|err| RepoError::map_unique(err, "membership", "user"))?;
    if changed == 0 {
        return Err(RepoError::NotFound {
            entity: "membership invitation",
            id: membership_id,
        });
    }
    Ok(())
}

pub(crate) fn delete_membership_tx(conn: &Connection, id: i64) -> RepoResult<bool> {
    let changed = conn.execute("DELETE FROM memberships WHERE id = ?1;", [id])?;
    Ok(changed > 0)
}

pub(crate) fn delete_owner_membership_tx(
    conn: &Connection,
    project_id: i64,
    owner_id: i64,
) -> RepoResult<Option<i64>> {
    let id: Option<i64> = conn
        .query_row(
            "SELECT id FROM memberships WHERE project_id = ?1 AND user_id = ?2;",
            params![project_id, owner_id],
            |row| row.get(0),
        )
        .optional()?;
    if let Some(id) = id {
        conn.execute("DELETE FROM memberships WHERE id = ?1;", [id])?;
    }
    Ok(id)
}

fn parse_membership_row(row: &Row<'_>) -> RepoResult<Membership> {
    let token = match row.get::<_, Option<String>>("token")? {
        Some(raw) => Some(Uuid::parse_str(&raw).map_err(|_| {
            RepoError::InvalidData(format!("invalid token `{raw}` in memberships.token"))
        })?),
        None => None,
    };

    Ok(Membership {
        id: row.get("id")?,
        user_id: row.get("user_id")?,
        project_id: row.get("project_id")?,
        role_id: row.get("role_id")?,
        is_admin: row.get::<_, i64>("is_admin")? != 0,
        email: row.get("email")?,
        token,
        invited_by_id: row.get("invited_by_id")?,
        created_at: row.get("created_at")?,
    })
}
