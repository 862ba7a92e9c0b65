mod support;

use support::{create_project, create_user, setup};
use tundra_core::model::taxonomy::{TaxonomyAttrs, TaxonomyKind, TaxonomyPatch};
use tundra_core::repo::catalog_repo::{CatalogRepository, SqliteCatalogRepository};
use tundra_core::repo::project_repo::{ProjectRepository, SqliteProjectRepository};
use tundra_core::{CatalogService, CoreError};

#[test]
fn first_row_of_a_kind_becomes_the_default() {
    let (conn, bus, config) = setup();
    let owner = create_user(&conn, &config, "alice");
    let project = create_project(&conn, &bus, &config, owner, "Acme");

    // Clear one pointer by hand to observe the first-row rule.
    conn.execute(
        "UPDATE projects SET default_severity_id = NULL WHERE id = ?1;",
        [project.id],
    )
    .unwrap();

    let catalog = CatalogService::new(&conn, &bus);
    let row = catalog
        .add_row(
            project.id,
            TaxonomyKind::Severity,
            TaxonomyAttrs::named("Wishlist", 9),
        )
        .unwrap();

    let reloaded = SqliteProjectRepository::new(&conn)
        .get_project(project.id)
        .unwrap()
        .unwrap();
    assert_eq!(reloaded.default_severity_id, Some(row.id));

    // A second row must not steal the default.
    let second = catalog
        .add_row(
            project.id,
            TaxonomyKind::Severity,
            TaxonomyAttrs::named("Blocker", 10),
        )
        .unwrap();
    let reloaded = SqliteProjectRepository::new(&conn)
        .get_project(project.id)
        .unwrap()
        .unwrap();
    assert_eq!(reloaded.default_severity_id, Some(row.id));
    assert_ne!(reloaded.default_severity_id, Some(second.id));
}

#[test]
fn names_are_unique_per_kind_but_free_across_kinds() {
    let (conn, bus, config) = setup();
    let owner = create_user(&conn, &config, "alice");
    let project = create_project(&conn, &bus, &config, owner, "Acme");

    let catalog = CatalogService::new(&conn, &bus);
    let err = catalog
        .add_row(
            project.id,
            TaxonomyKind::IssueStatus,
            TaxonomyAttrs::named("New", 99),
        )
        .unwrap_err();
    assert!(matches!(
        err,
        CoreError::Validation {
            field: "name",
            code: "unique"
        }
    ));

    // "New" exists for us/task/issue statuses; a priority may reuse it.
    catalog
        .add_row(
            project.id,
            TaxonomyKind::Priority,
            TaxonomyAttrs::named("New", 99),
        )
        .unwrap();
}

#[test]
fn names_are_trimmed_before_the_uniqueness_check() {
    let (conn, bus, config) = setup();
    let owner = create_user(&conn, &config, "alice");
    let project = create_project(&conn, &bus, &config, owner, "Acme");

    let catalog = CatalogService::new(&conn, &bus);
    let err = catalog
        .add_row(
            project.id,
            TaxonomyKind::IssueStatus,
            TaxonomyAttrs::named("  New  ", 99),
        )
        .unwrap_err();
    assert!(matches!(
        err,
        CoreError::Validation {
            field: "name",
            code: "unique"
        }
    ));

    let blank = catalog
        .add_row(
            project.id,
            TaxonomyKind::IssueStatus,
            TaxonomyAttrs::named("   ", 99),
        )
        .unwrap_err();
    assert!(matches!(
        blank,
        CoreError::Validation {
            field: "name",
            code: "required"
        }
    ));
}

#[test]
fn set_default_rejects_rows_of_other_projects() {
    let (conn, bus, config) = setup();
    let owner = create_user(&conn, &config, "alice");
    let acme = create_project(&conn, &bus, &config, owner, "Acme");
    let globex = create_project(&conn, &bus, &config, owner, "Globex");

    let repo = SqliteCatalogRepository::new(&conn);
    let foreign_row = repo
        .list_rows(globex.id, TaxonomyKind::IssueStatus)
        .unwrap()
        .into_iter()
        .next()
        .unwrap();

    let catalog = CatalogService::new(&conn, &bus);
    let err = catalog
        .set_default(acme.id, TaxonomyKind::IssueStatus, foreign_row.id)
        .unwrap_err();
    assert!(matches!(err, CoreError::WrongProject { .. }));

    let own_row = repo
        .list_rows(acme.id, TaxonomyKind::IssueStatus)
        .unwrap()
        .into_iter()
        .last()
        .unwrap();
    catalog
        .set_default(acme.id, TaxonomyKind::IssueStatus, own_row.id)
        .unwrap();
    let reloaded = SqliteProjectRepository::new(&conn)
        .get_project(acme.id)
        .unwrap()
        .unwrap();
    assert_eq!(reloaded.default_issue_status_id, Some(own_row.id));
}

#[test]
fn roles_get_project_unique_slugs() {
    let (conn, bus, config) = setup();
    let owner = create_user(&conn, &config, "alice");
    let project = create_project(&conn, &bus, &config, owner, "Acme");

    let catalog = CatalogService::new(&conn, &bus);
    let role = catalog
        .add_row(
            project.id,
            TaxonomyKind::Role,
            TaxonomyAttrs::named("QA Engineer", 20),
        )
        .unwrap();
    assert_eq!(role.slug.as_deref(), Some("qa-engineer"));

    let clashing = catalog
        .add_row(
            project.id,
            TaxonomyKind::Role,
            TaxonomyAttrs::named("QA engineer!", 21),
        )
        .unwrap();
    assert_eq!(clashing.slug.as_deref(), Some("qa-engineer-1"));
}

#[test]
fn question_statuses_are_read_only_legacy() {
    let (conn, bus, config) = setup();
    let owner = create_user(&conn, &config, "alice");
    let project = create_project(&conn, &bus, &config, owner, "Acme");

    let catalog = CatalogService::new(&conn, &bus);
    let err = catalog
        .add_row(
            project.id,
            TaxonomyKind::QuestionStatus,
            TaxonomyAttrs::named("Pending", 1),
        )
        .unwrap_err();
    assert!(matches!(
        err,
        CoreError::Validation {
            field: "kind",
            code: "deprecated"
        }
    ));

    // Pre-existing rows from migrated data still load.
    conn.execute(
        "INSERT INTO taxonomy_rows (project_id, kind, name, sort_order, is_closed)
         VALUES (?1, 'question_status', 'Pending', 1, 0);",
        [project.id],
    )
    .unwrap();
    let repo = SqliteCatalogRepository::new(&conn);
    let legacy = repo
        .list_rows(project.id, TaxonomyKind::QuestionStatus)
        .unwrap();
    assert_eq!(legacy.len(), 1);
    assert_eq!(legacy[0].name, "Pending");
}

#[test]
fn update_row_renames_and_reorders() {
    let (conn, bus, config) = setup();
    let owner = create_user(&conn, &config, "alice");
    let project = create_project(&conn, &bus, &config, owner, "Acme");

    let repo = SqliteCatalogRepository::new(&conn);
    let row = repo
        .list_rows(project.id, TaxonomyKind::IssueStatus)
        .unwrap()
        .into_iter()
        .next()
        .unwrap();

    let catalog = CatalogService::new(&conn, &bus);
    let updated = catalog
        .update_row(
            project.id,
            row.id,
            TaxonomyPatch {
                name: Some("Triage".to_string()),
                order: Some(42),
                color: Some(Some("#abcdef".to_string())),
                ..TaxonomyPatch::default()
            },
        )
        .unwrap();
    assert_eq!(updated.name, "Triage");
    assert_eq!(updated.order, 42);
    assert_eq!(updated.color.as_deref(), Some("#abcdef"));
}
