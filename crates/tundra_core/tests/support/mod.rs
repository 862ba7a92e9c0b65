//! Shared fixtures for integration tests: an in-memory database with the
//! stock "scrum" template and helpers to create users and projects.
#![allow(dead_code)]

use rusqlite::Connection;
use tundra_core::db::open_db_in_memory;
use tundra_core::model::template::{
    BadgeDef, DefaultOptions, PointsDef, RoleDef, StatusDef, TemplateDefinition,
};
use tundra_core::repo::template_repo::{SqliteTemplateRepository, TemplateRepository};
use tundra_core::repo::user_repo::{SqliteUserRepository, UserRepository};
use tundra_core::{CoreConfig, EventBus, Project, ProjectService};

pub fn scrum_definition() -> TemplateDefinition {
    TemplateDefinition {
        default_options: DefaultOptions {
            us_status: Some("New".to_string()),
            task_status: Some("New".to_string()),
            issue_status: Some("New".to_string()),
            issue_type: Some("Bug".to_string()),
            priority: Some("Normal".to_string()),
            severity: Some("Normal".to_string()),
            points: Some("?".to_string()),
        },
        us_statuses: vec![
            StatusDef {
                name: "New".to_string(),
                order: 1,
                is_closed: false,
                color: Some("#999999".to_string()),
                wip_limit: None,
            },
            StatusDef {
                name: "In progress".to_string(),
                order: 2,
                is_closed: false,
                color: Some("#ff9900".to_string()),
                wip_limit: Some(4),
            },
            StatusDef {
                name: "Done".to_string(),
                order: 3,
                is_closed: true,
                color: Some("#669900".to_string()),
                wip_limit: None,
            },
        ],
        points: vec![
            PointsDef {
                name: "?".to_string(),
                order: 1,
                value: None,
            },
            PointsDef {
                name: "1".to_string(),
                order: 2,
                value: Some(1.0),
            },
            PointsDef {
                name: "2".to_string(),
                order: 3,
                value: Some(2.0),
            },
        ],
        task_statuses: vec![
            StatusDef {
                name: "New".to_string(),
                order: 1,
                is_closed: false,
                color: Some("#999999".to_string()),
                wip_limit: None,
            },
            StatusDef {
                name: "Done".to_string(),
                order: 2,
                is_closed: true,
                color: Some("#669900".to_string()),
                wip_limit: None,
            },
        ],
        issue_statuses: vec![
            StatusDef {
                name: "New".to_string(),
                order: 1,
                is_closed: false,
                color: Some("#999999".to_string()),
                wip_limit: None,
            },
            StatusDef {
                name: "Open".to_string(),
                order: 2,
                is_closed: false,
                color: Some("#ff9900".to_string()),
                wip_limit: None,
            },
            StatusDef {
                name: "Closed".to_string(),
                order: 3,
                is_closed: true,
                color: Some("#669900".to_string()),
                wip_limit: None,
            },
        ],
        issue_types: vec![
            BadgeDef {
                name: "Bug".to_string(),
                order: 1,
                color: Some("#cc0000".to_string()),
            },
            BadgeDef {
                name: "Enhancement".to_string(),
                order: 2,
                color: Some("#0066cc".to_string()),
            },
        ],
        priorities: vec![
            BadgeDef {
                name: "Low".to_string(),
                order: 1,
                color: None,
            },
            BadgeDef {
                name: "Normal".to_string(),
                order: 2,
                color: None,
            },
            BadgeDef {
                name: "High".to_string(),
                order: 3,
                color: Some("#cc0000".to_string()),
            },
        ],
        severities: vec![
            BadgeDef {
                name: "Minor".to_string(),
                order: 1,
                color: None,
            },
            BadgeDef {
                name: "Normal".to_string(),
                order: 2,
                color: None,
            },
            BadgeDef {
                name: "Important".to_string(),
                order: 3,
                color: Some("#cc0000".to_string()),
            },
        ],
        roles: vec![
            RoleDef {
                name: "Product Owner".to_string(),
                slug: "product-owner".to_string(),
                order: 1,
                computable: false,
                permissions: vec!["view_project".to_string(), "admin_project".to_string()],
            },
            RoleDef {
                name: "Back".to_string(),
                slug: "back".to_string(),
                order: 2,
                computable: true,
                permissions: vec!["view_project".to_string(), "modify_us".to_string()],
            },
            RoleDef {
                name: "Front".to_string(),
                slug: "front".to_string(),
                order: 3,
                computable: true,
                permissions: vec!["view_project".to_string(), "modify_us".to_string()],
            },
        ],
    }
}

/// Opens a migrated in-memory database seeded with the "scrum" template.
pub fn setup() -> (Connection, EventBus, CoreConfig) {
    let conn = open_db_in_memory().expect("in-memory db opens");
    let templates = SqliteTemplateRepository::new(&conn);
    templates
        .create_template(
            "Scrum",
            "scrum",
            None,
            "Stock scrum catalog",
            "product-owner",
            &scrum_definition(),
        )
        .expect("stock template inserts");
    (conn, EventBus::new(), CoreConfig::default())
}

pub fn create_user(conn: &Connection, config: &CoreConfig, username: &str) -> i64 {
    let users = SqliteUserRepository::new(conn, config.clone());
    users
        .create_user(username, username, &format!("{username}@example.com"))
        .expect("user creation succeeds")
        .id
}

pub fn create_project(
    conn: &Connection,
    bus: &EventBus,
    config: &CoreConfig,
    owner_id: i64,
    name: &str,
) -> Project {
    let projects = ProjectService::new(conn, bus, config);
    projects
        .create_project(owner_id, name, "test project", false, None)
        .expect("project creation succeeds")
}
