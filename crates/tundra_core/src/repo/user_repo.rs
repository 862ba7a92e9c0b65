//! User persistence: stable owner references and quota limits.
//!
//! # Responsibility
//! - Provide the minimal user store the catalog and quota governor need.
//!
//! # Invariants
//! - `username` is unique.
//! - Limit columns stay `NULL` for "no cap"; they are seeded from
//!   `CoreConfig` at creation time.

use crate::config::CoreConfig;
use crate::model::user::User;
use crate::repo::{RepoError, RepoResult};
use rusqlite::{params, Connection, OptionalExtension, Row};

/// Repository interface for user records.
pub trait UserRepository {
    /// Creates one user, seeding quota limits from configuration.
    fn create_user(&self, username: &str, full_name: &str, email: &str) -> RepoResult<User>;
    /// Gets one user by id.
    fn get_user(&self, id: i64) -> RepoResult<Option<User>>;
    /// Overrides the four owner limits for one user.
    fn set_owner_limits(
        &self,
        id: i64,
        max_public_projects: Option<i64>,
        max_private_projects: Option<i64>,
        max_memberships_public_projects: Option<i64>,
        max_memberships_private_projects: Option<i64>,
    ) -> RepoResult<()>;
}

/// SQLite-backed user repository.
pub struct SqliteUserRepository<'conn> {
    conn: &'conn Connection,
    config: CoreConfig,
}

impl<'conn> SqliteUserRepository<'conn> {
    pub fn new(conn: &'conn Connection, config: CoreConfig) -> Self {
        Self { conn, config }
    }
}

impl UserRepository for SqliteUserRepository<'_> {
    fn create_user(&self, username: &str, full_name: &str, email: &str) -> RepoResult<User> {
        self.conn
            .execute(
                "INSERT INTO users (
                    username,
                    full_name,
                    email,
                    max_public_projects,
                    max_private_projects,
                    max_memberships_public_projects,
                    max_memberships_private_projects
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7);",
                params![
                    username,
                    full_name,
                    email,
                    self.config.max_public_projects_per_user,
                    self.config.max_private_projects_per_user,
                    self.config.max_memberships_public_projects,
                    self.config.max_memberships_private_projects,
                ],
            )
            .map_err(|err| RepoError::map_unique(err, "user", "username"))?;

        let id = self.conn.last_insert_rowid();
        load_user(self.conn, id)?.ok_or(RepoError::NotFound { entity: "user", id })
    }

    fn get_user(&self, id: i64) -> RepoResult<Option<User>> {
        load_user(self.conn, id)
    }

    fn set_owner_limits(
        &self,
        id: i64,
        max_public_projects: Option<i64>,
        max_private_projects: Option<i64>,
        max_memberships_public_projects: Option<i64>,
        max_memberships_private_projects: Option<i64>,
    ) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE users
             SET max_public_projects = ?2,
                 max_private_projects = ?3,
                 max_memberships_public_projects = ?4,
                 max_memberships_private_projects = ?5
             WHERE id = ?1;",
            params![
                id,
                max_public_projects,
                max_private_projects,
                max_memberships_public_projects,
                max_memberships_private_projects,
            ],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound { entity: "user", id });
        }
        Ok(())
    }
}

pub(crate) fn load_user(conn: &Connection, id: i64) -> RepoResult<Option<User>> {
    conn.query_row(
        "SELECT
            id,
            username,
            full_name,
            email,
            max_public_projects,
            max_private_projects,
            max_memberships_public_projects,
            max_memberships_private_projects
         FROM users
         WHERE id = ?1;",
        [id],
        parse_user_row,
    )
    .optional()
    .map_err(RepoError::from)
}

fn parse_user_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get("id")?,
        username: row.get("username")?,
        full_name: row.get("full_name")?,
        email: row.get("email")?,
        max_public_projects: row.get("max_public_projects")?,
        max_private_projects: row.get("max_private_projects")?,
        max_memberships_public_projects: row.get("max_memberships_public_projects")?,
        max_memberships_private_projects: row.get("max_memberships_private_projects")?,
    })
}
