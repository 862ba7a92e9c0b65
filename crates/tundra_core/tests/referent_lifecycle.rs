mod support;

use support::{create_project, create_user, setup};
use tundra_core::model::taxonomy::TaxonomyKind;
use tundra_core::repo::catalog_repo::{CatalogRepository, SqliteCatalogRepository};
use tundra_core::repo::milestone_repo::{MilestoneRepository, SqliteMilestoneRepository};
use tundra_core::repo::project_repo::{ProjectRepository, SqliteProjectRepository};
use tundra_core::repo::referent_repo::{ReferentRepository, SqliteReferentRepository};
use tundra_core::{
    CoreError, IssueExtras, ReferentAttrs, ReferentPatch, ReferentService, TaskExtras,
    UserStoryExtras,
};

fn attrs(subject: &str) -> ReferentAttrs {
    ReferentAttrs {
        subject: subject.to_string(),
        ..ReferentAttrs::default()
    }
}

#[test]
fn creation_falls_back_to_project_defaults() {
    let (conn, bus, config) = setup();
    let owner = create_user(&conn, &config, "alice");
    let project = create_project(&conn, &bus, &config, owner, "Acme");

    let referents = ReferentService::new(&conn, &bus);
    let issue = referents
        .create_issue(project.id, attrs("crash"), IssueExtras::default())
        .unwrap();

    assert_eq!(issue.status_id, project.default_issue_status_id);
    assert_eq!(issue.severity_id, project.default_severity_id);
    assert_eq!(issue.priority_id, project.default_priority_id);
    assert_eq!(issue.type_id, project.default_issue_type_id);
    assert!(!issue.is_closed);
}

#[test]
fn version_counter_guards_concurrent_writes() {
    let (conn, bus, config) = setup();
    let owner = create_user(&conn, &config, "alice");
    let project = create_project(&conn, &bus, &config, owner, "Acme");

    let referents = ReferentService::new(&conn, &bus);
    let story = referents
        .create_user_story(project.id, attrs("story"), UserStoryExtras::default())
        .unwrap();
    assert_eq!(story.version, 1);

    let updated = referents
        .update_user_story(
            story.id,
            ReferentPatch {
                subject: Some("story v2".to_string()),
                ..ReferentPatch::default()
            },
            Some(1),
        )
        .unwrap();
    assert_eq!(updated.version, 2);

    let err = referents
        .update_user_story(
            story.id,
            ReferentPatch {
                subject: Some("stale".to_string()),
                ..ReferentPatch::default()
            },
            Some(1),
        )
        .unwrap_err();
    match err {
        CoreError::StaleWrite { expected, actual } => {
            assert_eq!(expected, 1);
            assert_eq!(actual, 2);
        }
        other => panic!("expected StaleWrite, got {other}"),
    }

    let repo = SqliteReferentRepository::new(&conn);
    let stored = repo.get_user_story(story.id).unwrap().unwrap();
    assert_eq!(stored.subject, "story v2");
}

#[test]
fn cross_project_status_pointers_are_rejected() {
    let (conn, bus, config) = setup();
    let owner = create_user(&conn, &config, "alice");
    let acme = create_project(&conn, &bus, &config, owner, "Acme");
    let globex = create_project(&conn, &bus, &config, owner, "Globex");

    let catalog = SqliteCatalogRepository::new(&conn);
    let foreign_status = catalog
        .list_rows(globex.id, TaxonomyKind::UsStatus)
        .unwrap()
        .into_iter()
        .next()
        .unwrap();

    let referents = ReferentService::new(&conn, &bus);
    let mut bad = attrs("story");
    bad.status_id = Some(foreign_status.id);
    let err = referents
        .create_user_story(acme.id, bad, UserStoryExtras::default())
        .unwrap_err();
    assert!(matches!(
        err,
        CoreError::Validation {
            field: "status",
            code: "wrong_project"
        }
    ));
}

#[test]
fn tasks_follow_their_story_milestone() {
    let (conn, bus, config) = setup();
    let owner = create_user(&conn, &config, "alice");
    let project = create_project(&conn, &bus, &config, owner, "Acme");

    let milestones = SqliteMilestoneRepository::new(&conn);
    let sprint = milestones
        .create_milestone(project.id, "Sprint 1", "sprint-1", None, None, 1)
        .unwrap();

    let referents = ReferentService::new(&conn, &bus);
    let mut story_attrs = attrs("story");
    story_attrs.milestone_id = Some(sprint.id);
    let story = referents
        .create_user_story(project.id, story_attrs, UserStoryExtras::default())
        .unwrap();

    let task = referents
        .create_task(
            project.id,
            attrs("task"),
            TaskExtras {
                user_story_id: Some(story.id),
                ..TaskExtras::default()
            },
        )
        .unwrap();
    assert_eq!(task.milestone_id, Some(sprint.id));

    // Moving the story out of the sprint drags its tasks along.
    referents
        .update_user_story(
            story.id,
            ReferentPatch {
                milestone_id: Some(None),
                ..ReferentPatch::default()
            },
            None,
        )
        .unwrap();
    let repo = SqliteReferentRepository::new(&conn);
    let task = repo.get_task(task.id).unwrap().unwrap();
    assert_eq!(task.milestone_id, None);
}

#[test]
fn role_points_are_seeded_for_computable_roles() {
    let (conn, bus, config) = setup();
    let owner = create_user(&conn, &config, "alice");
    let project = create_project(&conn, &bus, &config, owner, "Acme");

    let referents = ReferentService::new(&conn, &bus);
    let story = referents
        .create_user_story(project.id, attrs("estimated"), UserStoryExtras::default())
        .unwrap();

    let repo = SqliteReferentRepository::new(&conn);
    let edges = repo.list_role_points(story.id).unwrap();
    // The stock template defines two computable roles (back, front).
    assert_eq!(edges.len(), 2);
    for edge in &edges {
        assert_eq!(edge.points_id, project.default_points_id);
    }
}

#[test]
fn set_role_points_updates_the_totals_cache() {
    let (conn, bus, config) = setup();
    let owner = create_user(&conn, &config, "alice");
    let project = create_project(&conn, &bus, &config, owner, "Acme");

    let catalog = SqliteCatalogRepository::new(&conn);
    let back_role = catalog
        .list_rows(project.id, TaxonomyKind::Role)
        .unwrap()
        .into_iter()
        .find(|row| row.slug.as_deref() == Some("back"))
        .unwrap();
    let two_points = catalog
        .list_rows(project.id, TaxonomyKind::Points)
        .unwrap()
        .into_iter()
        .find(|row| row.name == "2")
        .unwrap();

    let referents = ReferentService::new(&conn, &bus);
    let story = referents
        .create_user_story(project.id, attrs("estimated"), UserStoryExtras::default())
        .unwrap();
    referents
        .set_role_points(story.id, back_role.id, Some(two_points.id))
        .unwrap();

    let projects = SqliteProjectRepository::new(&conn);
    let reloaded = projects.get_project(project.id).unwrap().unwrap();
    assert_eq!(reloaded.total_story_points, Some(2.0));
}

#[test]
fn epics_link_stories_with_explicit_order() {
    let (conn, bus, config) = setup();
    let owner = create_user(&conn, &config, "alice");
    let project = create_project(&conn, &bus, &config, owner, "Acme");

    let referents = ReferentService::new(&conn, &bus);
    let epic = referents
        .create_epic(project.id, attrs("big theme"), Some("#aa55cc".to_string()))
        .unwrap();
    let first = referents
        .create_user_story(project.id, attrs("one"), UserStoryExtras::default())
        .unwrap();
    let second = referents
        .create_user_story(project.id, attrs("two"), UserStoryExtras::default())
        .unwrap();

    referents.link_story_to_epic(epic.id, second.id, 1).unwrap();
    referents.link_story_to_epic(epic.id, first.id, 2).unwrap();

    let repo = SqliteReferentRepository::new(&conn);
    let linked = repo.list_epic_stories(epic.id).unwrap();
    assert_eq!(
        linked
            .iter()
            .map(|edge| edge.user_story_id)
            .collect::<Vec<_>>(),
        vec![second.id, first.id]
    );

    // Linking twice only moves the story inside the epic.
    referents.link_story_to_epic(epic.id, second.id, 9).unwrap();
    let relinked = repo.list_epic_stories(epic.id).unwrap();
    assert_eq!(relinked.len(), 2);
    assert_eq!(relinked.last().unwrap().user_story_id, second.id);

    referents.unlink_story_from_epic(epic.id, first.id).unwrap();
    assert_eq!(repo.list_epic_stories(epic.id).unwrap().len(), 1);
}
