//! Project templates: inert catalog definitions.
//!
//! # Responsibility
//! - Define the JSON shape templates persist and exchange.
//! - Keep the template record inert: applying one is the template
//!   engine's job, never the model's.
//!
//! # Invariants
//! - `(slug, domain)` is unique; `domain = None` templates share one slug
//!   namespace.
//! - `default_options` names rows by taxonomy `name` (role by `slug`);
//!   resolution happens against the rows the same template created.

use serde::{Deserialize, Serialize};

/// Status definition (user-story, task and issue statuses).
/// `wip_limit` is meaningful for user-story statuses only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusDef {
    pub name: String,
    pub order: i64,
    pub is_closed: bool,
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wip_limit: Option<i64>,
}

/// Colored, ordered definition (issue types, priorities, severities).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BadgeDef {
    pub name: String,
    pub order: i64,
    pub color: Option<String>,
}

/// Point-scale definition; `value = None` renders as "?".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointsDef {
    pub name: String,
    pub order: i64,
    pub value: Option<f64>,
}

/// Role definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoleDef {
    pub name: String,
    pub slug: String,
    pub order: i64,
    pub computable: bool,
    pub permissions: Vec<String>,
}

/// Default-pointer selections, by taxonomy row name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DefaultOptions {
    pub us_status: Option<String>,
    pub task_status: Option<String>,
    pub issue_status: Option<String>,
    pub issue_type: Option<String>,
    pub priority: Option<String>,
    pub severity: Option<String>,
    pub points: Option<String>,
}

/// The materializable body of a template.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TemplateDefinition {
    #[serde(default)]
    pub default_options: DefaultOptions,
    #[serde(default)]
    pub us_statuses: Vec<StatusDef>,
    #[serde(default)]
    pub points: Vec<PointsDef>,
    #[serde(default)]
    pub task_statuses: Vec<StatusDef>,
    #[serde(default)]
    pub issue_statuses: Vec<StatusDef>,
    #[serde(default)]
    pub issue_types: Vec<BadgeDef>,
    #[serde(default)]
    pub priorities: Vec<BadgeDef>,
    #[serde(default)]
    pub severities: Vec<BadgeDef>,
    #[serde(default)]
    pub roles: Vec<RoleDef>,
}

/// Stored template record.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectTemplate {
    pub id: i64,
    pub name: String,
    pub slug: String,
    /// Tenant discriminator; `None` for the shared namespace.
    pub domain: Option<String>,
    pub description: String,
    /// Role slug the project owner is registered under on creation.
    pub default_owner_role: String,
    pub definition: TemplateDefinition,
    pub created_at: i64,
    pub modified_at: i64,
}

#[cfg(test)]
mod tests {
    use super::{DefaultOptions, StatusDef, TemplateDefinition};

    #[test]
    fn definition_tolerates_missing_arrays() {
        let parsed: TemplateDefinition =
            serde_json::from_str(r#"{"us_statuses": [{"name": "New", "order": 1, "is_closed": false, "color": null}]}"#)
                .expect("partial definition should parse");
        assert_eq!(parsed.us_statuses.len(), 1);
        assert!(parsed.roles.is_empty());
        assert_eq!(parsed.default_options, DefaultOptions::default());
    }

    #[test]
    fn wip_limit_is_omitted_when_absent() {
        let def = StatusDef {
            name: "New".to_string(),
            order: 1,
            is_closed: false,
            color: None,
            wip_limit: None,
        };
        let json = serde_json::to_string(&def).expect("serializable status");
        assert!(!json.contains("wip_limit"));
    }
}
