//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define use-case oriented data access contracts per aggregate.
//! - Isolate SQLite query details from service orchestration.
//!
//! # Invariants
//! - Repository APIs return semantic errors (`NotFound`, `UniqueViolation`)
//!   in addition to DB transport errors.
//! - Multi-statement write paths run under the caller's or their own
//!   immediate transaction; partial writes are never visible.

use crate::db::DbError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod attachment_repo;
pub mod catalog_repo;
pub mod membership_repo;
pub mod milestone_repo;
pub mod project_repo;
pub mod referent_repo;
pub mod template_repo;
pub mod user_repo;
pub mod wiki_repo;

pub type RepoResult<T> = Result<T, RepoError>;

/// Generic repository error shared by all persistence modules.
#[derive(Debug)]
pub enum RepoError {
    Db(DbError),
    NotFound { entity: &'static str, id: i64 },
    UniqueViolation { entity: &'static str, field: &'static str },
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound { entity, id } => write!(f, "{entity} not found: {id}"),
            Self::UniqueViolation { entity, field } => {
                write!(f, "{entity} violates unique constraint on {field}")
            }
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl RepoError {
    /// Maps a SQLite unique-constraint failure onto a semantic violation,
    /// leaving every other error untouched.
    pub(crate) fn map_unique(
        err: rusqlite::Error,
        entity: &'static str,
        field: &'static str,
    ) -> Self {
        if is_unique_violation(&err) {
            Self::UniqueViolation { entity, field }
        } else {
            Self::from(err)
        }
    }
}

pub(crate) fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(failure, _)
            if failure.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                || failure.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY
    )
}

pub(crate) fn bool_to_int(value: bool) -> i64 {
    if value {
        1
    } else {
        0
    }
}

pub(crate) fn int_to_bool(value: i64, column: &'static str) -> RepoResult<bool> {
    match value {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(RepoError::InvalidData(format!(
            "invalid boolean value `{other}` in {column}"
        ))),
    }
}

pub(crate) fn tags_to_json(tags: &[String]) -> RepoResult<String> {
    serde_json::to_string(tags)
        .map_err(|err| RepoError::InvalidData(format!("cannot encode tags: {err}")))
}

pub(crate) fn tags_from_json(raw: &str) -> RepoResult<Vec<String>> {
    serde_json::from_str(raw)
        .map_err(|err| RepoError::InvalidData(format!("invalid tags payload `{raw}`: {err}")))
}
