//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into use-case level APIs.
//! - Define the error taxonomy every public operation surfaces.
//! - Keep the one-transaction-per-operation contract in a single place.
//!
//! # Invariants
//! - Every public mutation runs inside one immediate transaction; queued
//!   events are delivered post-commit or dropped on rollback.
//! - Errors always propagate; nothing is recovered inside the core.

use crate::db::DbError;
use crate::events::{EventBus, SubscriberError};
use crate::model::project::{BlockedCode, Project};
use crate::repo::RepoError;
use crate::service::quota::QuotaReason;
use rusqlite::{Connection, Transaction, TransactionBehavior};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod catalog_service;
pub mod closure;
pub mod project_service;
pub mod quota;
pub mod referent_service;
pub mod tags;
pub mod template_service;

pub type CoreResult<T> = Result<T, CoreError>;

/// Error taxonomy raised by core services.
#[derive(Debug)]
pub enum CoreError {
    /// Addressed entity absent.
    NotFound { entity: &'static str, id: i64 },
    /// Caller lacks a permission required by the role-permission system.
    PermissionDenied { permission: &'static str },
    /// Structural violation: uniqueness, referential integrity, required
    /// field.
    Validation { field: &'static str, code: &'static str },
    /// Quota governor rejection.
    QuotaExceeded {
        reason: QuotaReason,
        current_memberships: i64,
    },
    /// Move-on-destroy with a missing, cross-project, wrong-kind or
    /// self replacement.
    BadReplacement { reason: &'static str },
    /// Optimistic-concurrency version mismatch.
    StaleWrite { expected: i64, actual: i64 },
    /// Template slug not registered.
    TemplateUnknown { slug: String },
    /// Project carries a non-null blocked code; only reads succeed.
    Blocked { code: BlockedCode },
    /// Row addressed through a project it does not belong to.
    WrongProject { row_id: i64, project_id: i64 },
    /// Synchronous event subscriber aborted the operation.
    Subscriber(SubscriberError),
    /// Persistence-layer failure.
    Repo(RepoError),
}

impl Display for CoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound { entity, id } => write!(f, "{entity} not found: {id}"),
            Self::PermissionDenied { permission } => {
                write!(f, "permission denied: {permission}")
            }
            Self::Validation { field, code } => {
                write!(f, "validation failed on `{field}`: {code}")
            }
            Self::QuotaExceeded {
                reason,
                current_memberships,
            } => write!(
                f,
                "quota exceeded: {reason} (current memberships: {current_memberships})"
            ),
            Self::BadReplacement { reason } => write!(f, "bad replacement: {reason}"),
            Self::StaleWrite { expected, actual } => write!(
                f,
                "stale write: expected version {expected}, stored version {actual}"
            ),
            Self::TemplateUnknown { slug } => write!(f, "unknown project template `{slug}`"),
            Self::Blocked { code } => write!(f, "project is blocked ({code:?})"),
            Self::WrongProject { row_id, project_id } => write!(
                f,
                "row {row_id} does not belong to project {project_id}"
            ),
            Self::Subscriber(err) => write!(f, "{err}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for CoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Subscriber(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for CoreError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound { entity, id } => Self::NotFound { entity, id },
            RepoError::UniqueViolation { field, .. } => Self::Validation {
                field,
                code: "unique",
            },
            other => Self::Repo(other),
        }
    }
}

impl From<DbError> for CoreError {
    fn from(value: DbError) -> Self {
        Self::Repo(RepoError::Db(value))
    }
}

impl From<rusqlite::Error> for CoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Repo(RepoError::from(value))
    }
}

impl From<SubscriberError> for CoreError {
    fn from(value: SubscriberError) -> Self {
        Self::Subscriber(value)
    }
}

/// Runs one service operation inside an immediate write transaction.
///
/// Queued events are delivered post-commit on success and dropped on any
/// failure, matching the bus contract.
pub(crate) fn run_in_tx<T>(
    conn: &Connection,
    bus: &EventBus,
    body: impl FnOnce(&Transaction<'_>) -> CoreResult<T>,
) -> CoreResult<T> {
    let tx = Transaction::new_unchecked(conn, TransactionBehavior::Immediate)?;
    match body(&tx) {
        Ok(value) => match tx.commit() {
            Ok(()) => {
                bus.commit_pending();
                Ok(value)
            }
            Err(err) => {
                bus.discard_pending();
                Err(err.into())
            }
        },
        Err(err) => {
            drop(tx);
            bus.discard_pending();
            Err(err)
        }
    }
}

/// Rejects mutations on blocked projects.
pub(crate) fn ensure_not_blocked(project: &Project) -> CoreResult<()> {
    match project.blocked_code {
        Some(code) => Err(CoreError::Blocked { code }),
        None => Ok(()),
    }
}
