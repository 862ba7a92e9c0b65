//! Project aggregate root.
//!
//! # Responsibility
//! - Define the project record, its blocked-state codes and the per-kind
//!   default pointers.
//! - Keep the `(tag, color)` registry shape used by the tag subsystem.
//!
//! # Invariants
//! - `name` is globally unique; `slug` is globally unique and generated.
//! - A blocked project only accepts read operations.
//! - Default pointers always reference rows of the matching kind inside
//!   the same project, or are `NULL`.

use crate::model::taxonomy::TaxonomyKind;
use serde::{Deserialize, Serialize};

/// Reason code for blocked projects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockedCode {
    ExpiredInvoice,
    Staff,
    OwnerLeaving,
    Deleting,
}

impl BlockedCode {
    /// Numeric code persisted in `projects.blocked_code`.
    pub fn as_db(self) -> i64 {
        match self {
            Self::ExpiredInvoice => 1,
            Self::Staff => 2,
            Self::OwnerLeaving => 3,
            Self::Deleting => 4,
        }
    }

    /// Parses a persisted numeric code.
    pub fn parse(value: i64) -> Option<Self> {
        match value {
            1 => Some(Self::ExpiredInvoice),
            2 => Some(Self::Staff),
            3 => Some(Self::OwnerLeaving),
            4 => Some(Self::Deleting),
            _ => None,
        }
    }
}

/// One `(tag, color)` registry entry. Serialized as a two-element array
/// to keep the persisted JSON shape `[["urgent", "#f00"], ["blue", null]]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagColor(pub String, pub Option<String>);

impl TagColor {
    pub fn tag(&self) -> &str {
        &self.0
    }

    pub fn color(&self) -> Option<&str> {
        self.1.as_deref()
    }
}

/// Project record.
#[derive(Debug, Clone, PartialEq)]
pub struct Project {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub description: String,
    /// `None` after orphaning (two-phase delete) or owner account removal.
    pub owner_id: Option<i64>,
    pub is_private: bool,
    pub blocked_code: Option<BlockedCode>,
    /// Ordered lowercase tags attached to the project itself.
    pub tags: Vec<String>,
    /// Ordered registry of tags in use across the project's taggable items.
    pub tags_colors: Vec<TagColor>,
    pub total_story_points: Option<f64>,
    pub total_milestones: Option<i64>,
    pub creation_template_id: Option<i64>,
    pub default_us_status_id: Option<i64>,
    pub default_task_status_id: Option<i64>,
    pub default_issue_status_id: Option<i64>,
    pub default_issue_type_id: Option<i64>,
    pub default_priority_id: Option<i64>,
    pub default_severity_id: Option<i64>,
    pub default_points_id: Option<i64>,
    pub created_at: i64,
    pub modified_at: i64,
}

impl Project {
    /// Returns the default pointer for one taxonomy kind, if any.
    pub fn default_for(&self, kind: TaxonomyKind) -> Option<i64> {
        match kind {
            TaxonomyKind::UsStatus => self.default_us_status_id,
            TaxonomyKind::TaskStatus => self.default_task_status_id,
            TaxonomyKind::IssueStatus => self.default_issue_status_id,
            TaxonomyKind::IssueType => self.default_issue_type_id,
            TaxonomyKind::Priority => self.default_priority_id,
            TaxonomyKind::Severity => self.default_severity_id,
            TaxonomyKind::Points => self.default_points_id,
            TaxonomyKind::QuestionStatus | TaxonomyKind::Role => None,
        }
    }

    /// Whether mutations must be rejected with `Blocked`.
    pub fn is_blocked(&self) -> bool {
        self.blocked_code.is_some()
    }
}

/// Partial update for project attributes. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProjectPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub is_private: Option<bool>,
    pub tags: Option<Vec<String>>,
}
