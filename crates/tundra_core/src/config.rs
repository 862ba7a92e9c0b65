//! Process-wide core configuration.
//!
//! # Responsibility
//! - Carry deployment-level defaults: owner quota limits and the template
//!   used when project creation names none.
//!
//! # Invariants
//! - A `None` limit means "no cap".
//! - New users inherit these limits at creation time; per-user overrides
//!   live on the user row afterwards.

/// Core configuration record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreConfig {
    pub max_public_projects_per_user: Option<i64>,
    pub max_private_projects_per_user: Option<i64>,
    pub max_memberships_public_projects: Option<i64>,
    pub max_memberships_private_projects: Option<i64>,
    /// Template slug applied when `create_project` receives none.
    pub default_template_slug: String,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            max_public_projects_per_user: None,
            max_private_projects_per_user: None,
            max_memberships_public_projects: None,
            max_memberships_private_projects: None,
            default_template_slug: "scrum".to_string(),
        }
    }
}
