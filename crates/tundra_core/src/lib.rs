//! Core domain logic for Tundra.
//! This crate is the single source of truth for business invariants.

pub mod config;
pub mod db;
pub mod events;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;
pub mod slug;

pub use config::CoreConfig;
pub use events::{DomainEvent, EventBus};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::project::{BlockedCode, Project, ProjectPatch, TagColor};
pub use model::referent::{
    Epic, Issue, IssueExtras, ReferentAttrs, ReferentKind, ReferentPatch, Task, TaskExtras,
    UserStory, UserStoryExtras,
};
pub use model::taxonomy::{TaxonomyAttrs, TaxonomyKind, TaxonomyPatch, TaxonomyRow};
pub use repo::{RepoError, RepoResult};
pub use service::catalog_service::CatalogService;
pub use service::project_service::ProjectService;
pub use service::quota::{QuotaDecision, QuotaReason};
pub use service::referent_service::ReferentService;
pub use service::template_service::{DuplicateMember, TemplateService};
pub use service::{CoreError, CoreResult};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
