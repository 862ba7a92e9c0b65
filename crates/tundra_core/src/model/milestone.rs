//! Milestone (sprint) records.
//!
//! # Invariants
//! - `(project, name)` and `(project, slug)` are unique.
//! - `is_closed` is derived from the milestone's items by the closure
//!   propagator; direct writes are allowed for empty milestones only.

/// Milestone record.
#[derive(Debug, Clone, PartialEq)]
pub struct Milestone {
    pub id: i64,
    pub project_id: i64,
    pub name: String,
    pub slug: String,
    /// Epoch ms; `None` when not yet scheduled.
    pub estimated_start: Option<i64>,
    pub estimated_finish: Option<i64>,
    pub is_closed: bool,
    pub order: i64,
    pub created_at: i64,
    pub modified_at: i64,
}
