//! Per-project taxonomy rows: statuses, types, priorities, severities,
//! point scales and roles.
//!
//! # Responsibility
//! - Define the unified taxonomy record and its kind discriminator.
//! - Keep kind-specific field expectations in one place.
//!
//! # Invariants
//! - `(project, kind, name)` is unique; names are compared post-trim and
//!   case-sensitively.
//! - Role rows additionally keep `(project, slug)` unique.
//! - A row never moves to another project.

use serde::{Deserialize, Serialize};

/// Kind discriminator for taxonomy rows.
///
/// `QuestionStatus` is a legacy kind: rows are tolerated when reading old
/// databases but no operation creates or mutates them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaxonomyKind {
    UsStatus,
    TaskStatus,
    IssueStatus,
    QuestionStatus,
    IssueType,
    Priority,
    Severity,
    Points,
    Role,
}

impl TaxonomyKind {
    /// Database token stored in `taxonomy_rows.kind`.
    pub fn as_db(self) -> &'static str {
        match self {
            Self::UsStatus => "us_status",
            Self::TaskStatus => "task_status",
            Self::IssueStatus => "issue_status",
            Self::QuestionStatus => "question_status",
            Self::IssueType => "issue_type",
            Self::Priority => "priority",
            Self::Severity => "severity",
            Self::Points => "points",
            Self::Role => "role",
        }
    }

    /// Parses a database token back into a kind.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "us_status" => Some(Self::UsStatus),
            "task_status" => Some(Self::TaskStatus),
            "issue_status" => Some(Self::IssueStatus),
            "question_status" => Some(Self::QuestionStatus),
            "issue_type" => Some(Self::IssueType),
            "priority" => Some(Self::Priority),
            "severity" => Some(Self::Severity),
            "points" => Some(Self::Points),
            "role" => Some(Self::Role),
            _ => None,
        }
    }

    /// Whether a project keeps a default pointer for this kind.
    pub fn has_default_pointer(self) -> bool {
        !matches!(self, Self::QuestionStatus | Self::Role)
    }

    /// Whether rows of this kind carry an `is_closed` flag.
    pub fn is_status(self) -> bool {
        matches!(
            self,
            Self::UsStatus | Self::TaskStatus | Self::IssueStatus | Self::QuestionStatus
        )
    }
}

/// One configurable enumeration value scoped to a project.
///
/// Kind-specific fields stay `None` for kinds that do not use them:
/// `is_closed` on statuses, `wip_limit` on user-story statuses, `value`
/// on points (`None` value renders as "?"), `slug`/`computable`/
/// `permissions` on roles.
#[derive(Debug, Clone, PartialEq)]
pub struct TaxonomyRow {
    pub id: i64,
    pub project_id: i64,
    pub kind: TaxonomyKind,
    pub name: String,
    pub order: i64,
    pub is_closed: Option<bool>,
    pub color: Option<String>,
    pub wip_limit: Option<i64>,
    pub value: Option<f64>,
    pub slug: Option<String>,
    pub computable: Option<bool>,
    pub permissions: Option<Vec<String>>,
}

impl TaxonomyRow {
    /// Whether this status row closes the referents pointing at it.
    pub fn closes_referents(&self) -> bool {
        self.is_closed.unwrap_or(false)
    }
}

/// Insert payload for one taxonomy row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaxonomyAttrs {
    pub name: String,
    pub order: i64,
    pub is_closed: Option<bool>,
    pub color: Option<String>,
    pub wip_limit: Option<i64>,
    pub value: Option<f64>,
    pub slug: Option<String>,
    pub computable: Option<bool>,
    pub permissions: Option<Vec<String>>,
}

impl TaxonomyAttrs {
    /// Minimal payload with name and order, all kind-specific fields unset.
    pub fn named(name: impl Into<String>, order: i64) -> Self {
        Self {
            name: name.into(),
            order,
            ..Self::default()
        }
    }
}

/// Partial update for one taxonomy row. `None` leaves the field untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaxonomyPatch {
    pub name: Option<String>,
    pub order: Option<i64>,
    pub is_closed: Option<bool>,
    pub color: Option<Option<String>>,
    pub wip_limit: Option<Option<i64>>,
    pub value: Option<Option<f64>>,
    pub computable: Option<bool>,
    pub permissions: Option<Vec<String>>,
}
