mod support;

use support::{create_project, create_user, setup};
use tundra_core::model::taxonomy::TaxonomyKind;
use tundra_core::repo::catalog_repo::{CatalogRepository, SqliteCatalogRepository};
use tundra_core::repo::user_repo::{SqliteUserRepository, UserRepository};
use tundra_core::service::template_service::DuplicateMember;
use tundra_core::{
    CoreError, ProjectPatch, ProjectService, QuotaReason, TemplateService,
};

fn set_limits(
    conn: &rusqlite::Connection,
    config: &tundra_core::CoreConfig,
    user_id: i64,
    max_public: Option<i64>,
    max_private: Option<i64>,
    max_members_public: Option<i64>,
    max_members_private: Option<i64>,
) {
    let users = SqliteUserRepository::new(conn, config.clone());
    users
        .set_owner_limits(
            user_id,
            max_public,
            max_private,
            max_members_public,
            max_members_private,
        )
        .unwrap();
}

#[test]
fn privacy_flip_rejects_when_public_slots_are_full() {
    let (conn, bus, config) = setup();
    let owner = create_user(&conn, &config, "alice");
    create_project(&conn, &bus, &config, owner, "X");

    let projects = ProjectService::new(&conn, &bus, &config);
    let y = projects
        .create_project(owner, "Y", "private one", true, None)
        .unwrap();

    set_limits(&conn, &config, owner, Some(1), None, None, None);

    let err = projects
        .update_project(
            y.id,
            ProjectPatch {
                is_private: Some(false),
                ..ProjectPatch::default()
            },
        )
        .unwrap_err();
    match err {
        CoreError::QuotaExceeded { reason, .. } => {
            assert_eq!(reason, QuotaReason::PublicProjectsExceeded);
        }
        other => panic!("expected QuotaExceeded, got {other}"),
    }
}

#[test]
fn create_rejects_over_private_project_cap() {
    let (conn, bus, config) = setup();
    let owner = create_user(&conn, &config, "alice");
    set_limits(&conn, &config, owner, None, Some(1), None, None);

    let projects = ProjectService::new(&conn, &bus, &config);
    projects
        .create_project(owner, "First", "", true, None)
        .unwrap();
    let err = projects
        .create_project(owner, "Second", "", true, None)
        .unwrap_err();
    match err {
        CoreError::QuotaExceeded { reason, .. } => {
            assert_eq!(reason, QuotaReason::PrivateProjectsExceeded);
        }
        other => panic!("expected QuotaExceeded, got {other}"),
    }
}

#[test]
fn transfer_rejects_when_receiver_is_full() {
    let (conn, bus, config) = setup();
    let alice = create_user(&conn, &config, "alice");
    let bob = create_user(&conn, &config, "bob");

    let project = create_project(&conn, &bus, &config, alice, "Acme");
    create_project(&conn, &bus, &config, bob, "Bob Park");

    let projects = ProjectService::new(&conn, &bus, &config);
    let roles = SqliteCatalogRepository::new(&conn);
    let role = roles
        .list_rows(project.id, TaxonomyKind::Role)
        .unwrap()
        .into_iter()
        .next()
        .unwrap();
    projects.add_member(project.id, bob, role.id, false).unwrap();

    set_limits(&conn, &config, bob, Some(1), None, None, None);

    let err = projects.transfer_project(project.id, bob).unwrap_err();
    match err {
        CoreError::QuotaExceeded { reason, .. } => {
            assert_eq!(reason, QuotaReason::PublicProjectsExceeded);
        }
        other => panic!("expected QuotaExceeded, got {other}"),
    }
}

#[test]
fn transfer_requires_membership() {
    let (conn, bus, config) = setup();
    let alice = create_user(&conn, &config, "alice");
    let mallory = create_user(&conn, &config, "mallory");
    let project = create_project(&conn, &bus, &config, alice, "Acme");

    let projects = ProjectService::new(&conn, &bus, &config);
    let err = projects.transfer_project(project.id, mallory).unwrap_err();
    assert!(matches!(
        err,
        CoreError::Validation {
            field: "owner",
            code: "not_member"
        }
    ));
}

#[test]
fn duplicate_counts_requested_members_plus_owner() {
    let (conn, bus, config) = setup();
    let alice = create_user(&conn, &config, "alice");
    let bob = create_user(&conn, &config, "bob");
    let project = create_project(&conn, &bus, &config, alice, "Acme");

    let projects = ProjectService::new(&conn, &bus, &config);
    let roles = SqliteCatalogRepository::new(&conn);
    let role = roles
        .list_rows(project.id, TaxonomyKind::Role)
        .unwrap()
        .into_iter()
        .next()
        .unwrap();
    projects.add_member(project.id, bob, role.id, false).unwrap();

    // One membership allowed: the duplicate would need two (owner + bob).
    set_limits(&conn, &config, alice, None, None, Some(1), None);

    let templates = TemplateService::new(&conn, &bus);
    let err = templates
        .duplicate(
            project.id,
            alice,
            "Acme Copy",
            "",
            false,
            &[DuplicateMember { user_id: bob }],
        )
        .unwrap_err();
    match err {
        CoreError::QuotaExceeded { reason, .. } => {
            assert_eq!(reason, QuotaReason::PublicMembershipsExceeded);
        }
        other => panic!("expected QuotaExceeded, got {other}"),
    }

    // Without the extra member the same duplication fits.
    let copied = templates
        .duplicate(project.id, alice, "Acme Copy", "", false, &[])
        .unwrap();
    assert_eq!(copied.owner_id, Some(alice));
}

#[test]
fn ownerless_project_rejects_privacy_flip() {
    let (conn, bus, config) = setup();
    let alice = create_user(&conn, &config, "alice");
    let project = create_project(&conn, &bus, &config, alice, "Acme");

    let projects = ProjectService::new(&conn, &bus, &config);
    projects.orphan_project(project.id).unwrap();

    // Orphaned projects are blocked for deletion; the mutation path
    // reports the block before anything else.
    let err = projects
        .update_project(
            project.id,
            ProjectPatch {
                is_private: Some(true),
                ..ProjectPatch::default()
            },
        )
        .unwrap_err();
    assert!(matches!(err, CoreError::Blocked { .. }));
}
