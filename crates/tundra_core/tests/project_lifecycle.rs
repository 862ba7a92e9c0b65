mod support;

use support::{create_project, create_user, setup};
use tundra_core::model::referent::ReferentKind;
use tundra_core::model::taxonomy::TaxonomyKind;
use tundra_core::repo::catalog_repo::{CatalogRepository, SqliteCatalogRepository};
use tundra_core::repo::membership_repo::{MembershipRepository, SqliteMembershipRepository};
use tundra_core::repo::project_repo::{ProjectRepository, SqliteProjectRepository};
use tundra_core::repo::referent_repo::{ReferentRepository, SqliteReferentRepository};
use tundra_core::{
    BlockedCode, CoreError, ProjectPatch, ProjectService,
};

#[test]
fn create_materializes_catalog_defaults_and_owner_membership() {
    let (conn, bus, config) = setup();
    let owner = create_user(&conn, &config, "alice");
    let project = create_project(&conn, &bus, &config, owner, "Acme");

    assert_eq!(project.slug, "acme");
    assert_eq!(project.owner_id, Some(owner));

    let catalog = SqliteCatalogRepository::new(&conn);
    assert_eq!(catalog.list_rows(project.id, TaxonomyKind::UsStatus).unwrap().len(), 3);
    assert_eq!(catalog.list_rows(project.id, TaxonomyKind::TaskStatus).unwrap().len(), 2);
    assert_eq!(catalog.list_rows(project.id, TaxonomyKind::IssueStatus).unwrap().len(), 3);
    assert_eq!(catalog.list_rows(project.id, TaxonomyKind::Points).unwrap().len(), 3);
    assert_eq!(catalog.list_rows(project.id, TaxonomyKind::Role).unwrap().len(), 3);

    for kind in [
        TaxonomyKind::UsStatus,
        TaxonomyKind::TaskStatus,
        TaxonomyKind::IssueStatus,
        TaxonomyKind::IssueType,
        TaxonomyKind::Priority,
        TaxonomyKind::Severity,
        TaxonomyKind::Points,
    ] {
        assert!(project.default_for(kind).is_some(), "missing default for {kind:?}");
    }

    let memberships = SqliteMembershipRepository::new(&conn);
    let members = memberships.list_for_project(project.id).unwrap();
    assert_eq!(members.len(), 1);
    assert_eq!(members[0].user_id, Some(owner));
    assert!(members[0].is_admin);
    let owner_role = catalog.get_row(members[0].role_id).unwrap().unwrap();
    assert_eq!(owner_role.slug.as_deref(), Some("product-owner"));

    let referents = SqliteReferentRepository::new(&conn);
    for kind in ReferentKind::all() {
        assert_eq!(referents.last_ref(project.id, kind).unwrap(), 0);
    }
}

#[test]
fn project_names_are_globally_unique_and_slugs_disambiguate() {
    let (conn, bus, config) = setup();
    let owner = create_user(&conn, &config, "alice");
    create_project(&conn, &bus, &config, owner, "Acme");

    let projects = ProjectService::new(&conn, &bus, &config);
    let err = projects
        .create_project(owner, "Acme", "", false, None)
        .unwrap_err();
    assert!(matches!(
        err,
        CoreError::Validation {
            field: "name",
            code: "unique"
        }
    ));

    // A different name that slugifies to the same base gets a suffix.
    let second = projects
        .create_project(owner, "Acme!", "", false, None)
        .unwrap();
    assert_eq!(second.slug, "acme-1");
}

#[test]
fn blocked_projects_accept_reads_only() {
    let (conn, bus, config) = setup();
    let owner = create_user(&conn, &config, "alice");
    let project = create_project(&conn, &bus, &config, owner, "Acme");

    let projects = ProjectService::new(&conn, &bus, &config);
    projects
        .set_blocked_code(project.id, Some(BlockedCode::ExpiredInvoice))
        .unwrap();

    let err = projects
        .update_project(
            project.id,
            ProjectPatch {
                description: Some("nope".to_string()),
                ..ProjectPatch::default()
            },
        )
        .unwrap_err();
    assert!(matches!(
        err,
        CoreError::Blocked {
            code: BlockedCode::ExpiredInvoice
        }
    ));

    let reloaded = SqliteProjectRepository::new(&conn)
        .get_project(project.id)
        .unwrap()
        .unwrap();
    assert_eq!(reloaded.description, "test project");

    projects.set_blocked_code(project.id, None).unwrap();
    projects
        .update_project(
            project.id,
            ProjectPatch {
                description: Some("better".to_string()),
                ..ProjectPatch::default()
            },
        )
        .unwrap();
}

#[test]
fn two_phase_delete_orphans_then_cascades() {
    let (conn, bus, config) = setup();
    let owner = create_user(&conn, &config, "alice");
    let project = create_project(&conn, &bus, &config, owner, "Acme");

    let projects = ProjectService::new(&conn, &bus, &config);
    projects.orphan_project(project.id).unwrap();

    let repo = SqliteProjectRepository::new(&conn);
    let orphaned = repo.get_project(project.id).unwrap().unwrap();
    assert_eq!(orphaned.owner_id, None);
    assert_eq!(orphaned.blocked_code, Some(BlockedCode::Deleting));

    let memberships = SqliteMembershipRepository::new(&conn);
    assert!(memberships.list_for_project(project.id).unwrap().is_empty());

    assert!(projects.delete_project(project.id).unwrap());
    assert!(repo.get_project(project.id).unwrap().is_none());

    // Rerunning the cascade after a crash is a no-op.
    assert!(!projects.delete_project(project.id).unwrap());
}

#[test]
fn transfer_moves_ownership_to_a_member() {
    let (conn, bus, config) = setup();
    let alice = create_user(&conn, &config, "alice");
    let bob = create_user(&conn, &config, "bob");
    let project = create_project(&conn, &bus, &config, alice, "Acme");

    let catalog = SqliteCatalogRepository::new(&conn);
    let role = catalog
        .list_rows(project.id, TaxonomyKind::Role)
        .unwrap()
        .into_iter()
        .next()
        .unwrap();

    let projects = ProjectService::new(&conn, &bus, &config);
    projects.add_member(project.id, bob, role.id, false).unwrap();
    let transferred = projects.transfer_project(project.id, bob).unwrap();
    assert_eq!(transferred.owner_id, Some(bob));

    let memberships = SqliteMembershipRepository::new(&conn);
    let bob_membership = memberships
        .find_for_user(project.id, bob)
        .unwrap()
        .unwrap();
    assert!(bob_membership.is_admin);
}
