//! Wiki pages and sidebar links.
//!
//! # Invariants
//! - `(project, slug)` is unique for pages; `(project, href)` for links.
//! - Page `version` increments on every content write (optimistic
//!   concurrency, same contract as referent versions).

/// Wiki page record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WikiPage {
    pub id: i64,
    pub project_id: i64,
    pub slug: String,
    pub content: String,
    pub owner_id: Option<i64>,
    pub last_modifier_id: Option<i64>,
    pub version: i64,
    pub created_at: i64,
    pub modified_at: i64,
}

/// Sidebar link to a wiki location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WikiLink {
    pub id: i64,
    pub project_id: i64,
    pub title: String,
    pub href: String,
    pub order: i64,
}
