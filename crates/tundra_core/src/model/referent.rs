//! Referent entities: user stories, tasks, issues and epics.
//!
//! # Responsibility
//! - Define the four backlog-item records and their creation/patch payloads.
//! - Keep the referent-kind discriminator used by the ref counters.
//!
//! # Invariants
//! - `ref_num` is unique within a project, strictly monotonic per kind,
//!   never reused; 0 is a reserved sentinel that is never assigned.
//! - `version` increments on every mutation (optimistic concurrency).
//! - `is_closed` mirrors the referenced status row's `is_closed`.

use crate::model::taxonomy::TaxonomyKind;
use serde::{Deserialize, Serialize};

/// Kind of backlog item carrying a per-project reference number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferentKind {
    UserStory,
    Task,
    Issue,
    Epic,
}

impl ReferentKind {
    /// Token stored in `refs.kind`.
    pub fn as_db(self) -> &'static str {
        match self {
            Self::UserStory => "userstory",
            Self::Task => "task",
            Self::Issue => "issue",
            Self::Epic => "epic",
        }
    }

    /// Parses a persisted kind token.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "userstory" => Some(Self::UserStory),
            "task" => Some(Self::Task),
            "issue" => Some(Self::Issue),
            "epic" => Some(Self::Epic),
            _ => None,
        }
    }

    /// Backing table for this referent kind.
    pub fn table(self) -> &'static str {
        match self {
            Self::UserStory => "userstories",
            Self::Task => "tasks",
            Self::Issue => "issues",
            Self::Epic => "epics",
        }
    }

    /// Status taxonomy kind this referent points at, if any.
    ///
    /// Epics carry no project-scoped status set; their `is_closed` flag is
    /// managed directly.
    pub fn status_kind(self) -> Option<TaxonomyKind> {
        match self {
            Self::UserStory => Some(TaxonomyKind::UsStatus),
            Self::Task => Some(TaxonomyKind::TaskStatus),
            Self::Issue => Some(TaxonomyKind::IssueStatus),
            Self::Epic => None,
        }
    }

    /// All referent kinds in allocation order.
    pub fn all() -> [Self; 4] {
        [Self::UserStory, Self::Task, Self::Issue, Self::Epic]
    }
}

/// User story record.
#[derive(Debug, Clone, PartialEq)]
pub struct UserStory {
    pub id: i64,
    pub project_id: i64,
    pub ref_num: i64,
    pub subject: String,
    pub description: String,
    pub owner_id: Option<i64>,
    pub assigned_to_id: Option<i64>,
    pub status_id: Option<i64>,
    pub milestone_id: Option<i64>,
    pub tags: Vec<String>,
    pub version: i64,
    pub is_closed: bool,
    pub is_blocked: bool,
    pub blocked_note: String,
    pub backlog_order: i64,
    pub generated_from_issue_id: Option<i64>,
    pub created_at: i64,
    pub modified_at: i64,
}

/// Task record.
#[derive(Debug, Clone, PartialEq)]
pub struct Task {
    pub id: i64,
    pub project_id: i64,
    pub ref_num: i64,
    pub subject: String,
    pub description: String,
    pub owner_id: Option<i64>,
    pub assigned_to_id: Option<i64>,
    pub status_id: Option<i64>,
    pub milestone_id: Option<i64>,
    pub user_story_id: Option<i64>,
    pub tags: Vec<String>,
    pub version: i64,
    pub is_closed: bool,
    pub is_blocked: bool,
    pub blocked_note: String,
    pub task_order: i64,
    /// Marker for long-running tasks.
    pub is_iocaine: bool,
    pub created_at: i64,
    pub modified_at: i64,
}

/// Issue record.
#[derive(Debug, Clone, PartialEq)]
pub struct Issue {
    pub id: i64,
    pub project_id: i64,
    pub ref_num: i64,
    pub subject: String,
    pub description: String,
    pub owner_id: Option<i64>,
    pub assigned_to_id: Option<i64>,
    pub status_id: Option<i64>,
    pub severity_id: Option<i64>,
    pub priority_id: Option<i64>,
    pub type_id: Option<i64>,
    pub milestone_id: Option<i64>,
    pub tags: Vec<String>,
    pub version: i64,
    pub is_closed: bool,
    pub is_blocked: bool,
    pub blocked_note: String,
    pub created_at: i64,
    pub modified_at: i64,
}

/// Epic record.
#[derive(Debug, Clone, PartialEq)]
pub struct Epic {
    pub id: i64,
    pub project_id: i64,
    pub ref_num: i64,
    pub subject: String,
    pub description: String,
    pub owner_id: Option<i64>,
    pub assigned_to_id: Option<i64>,
    pub color: Option<String>,
    pub tags: Vec<String>,
    pub version: i64,
    pub is_closed: bool,
    pub is_blocked: bool,
    pub blocked_note: String,
    pub epics_order: i64,
    pub created_at: i64,
    pub modified_at: i64,
}

/// `(user_story, role)`-unique estimation edge to a points row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RolePoints {
    pub id: i64,
    pub user_story_id: i64,
    pub role_id: i64,
    pub points_id: Option<i64>,
}

/// Ordered epic <-> user story edge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EpicUserStory {
    pub id: i64,
    pub epic_id: i64,
    pub user_story_id: i64,
    pub order: i64,
}

/// Creation payload shared by all referent kinds.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReferentAttrs {
    pub subject: String,
    pub description: String,
    pub owner_id: Option<i64>,
    pub assigned_to_id: Option<i64>,
    /// `None` selects the project default for the kind's status set.
    pub status_id: Option<i64>,
    pub milestone_id: Option<i64>,
    pub tags: Vec<String>,
}

/// Kind-specific creation extras for user stories.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserStoryExtras {
    pub backlog_order: Option<i64>,
    pub generated_from_issue_id: Option<i64>,
}

/// Kind-specific creation extras for tasks.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskExtras {
    pub user_story_id: Option<i64>,
    pub task_order: Option<i64>,
    pub is_iocaine: bool,
}

/// Kind-specific creation extras for issues. `None` selects the project
/// default of the matching kind.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IssueExtras {
    pub severity_id: Option<i64>,
    pub priority_id: Option<i64>,
    pub type_id: Option<i64>,
}

/// Partial update for referent entities. Outer `None` leaves the field
/// untouched; inner `None` clears a nullable pointer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReferentPatch {
    pub subject: Option<String>,
    pub description: Option<String>,
    pub assigned_to_id: Option<Option<i64>>,
    pub status_id: Option<Option<i64>>,
    pub milestone_id: Option<Option<i64>>,
    pub tags: Option<Vec<String>>,
    pub is_blocked: Option<bool>,
    pub blocked_note: Option<String>,
    pub user_story_id: Option<Option<i64>>,
    pub severity_id: Option<Option<i64>>,
    pub priority_id: Option<Option<i64>>,
    pub type_id: Option<Option<i64>>,
    pub is_iocaine: Option<bool>,
    pub is_closed: Option<bool>,
}
