mod support;

use support::{create_project, create_user, setup};
use tundra_core::model::referent::ReferentKind;
use tundra_core::repo::referent_repo::{ReferentRepository, SqliteReferentRepository};
use tundra_core::{IssueExtras, ReferentAttrs, ReferentService, TaskExtras, UserStoryExtras};

fn attrs(subject: &str) -> ReferentAttrs {
    ReferentAttrs {
        subject: subject.to_string(),
        ..ReferentAttrs::default()
    }
}

#[test]
fn issue_refs_start_at_one_and_stay_dense() {
    let (conn, bus, config) = setup();
    let owner = create_user(&conn, &config, "alice");
    let project = create_project(&conn, &bus, &config, owner, "Acme");

    let service = ReferentService::new(&conn, &bus);
    let first = service
        .create_issue(project.id, attrs("A"), IssueExtras::default())
        .unwrap();
    let second = service
        .create_issue(project.id, attrs("B"), IssueExtras::default())
        .unwrap();

    let refs: std::collections::HashSet<i64> =
        [first.ref_num, second.ref_num].into_iter().collect();
    assert_eq!(refs, [1, 2].into_iter().collect());
    assert_eq!(first.project_id, project.id);
    assert_eq!(second.project_id, project.id);

    let repo = SqliteReferentRepository::new(&conn);
    assert_eq!(repo.last_ref(project.id, ReferentKind::Issue).unwrap(), 2);
}

#[test]
fn counters_are_independent_per_kind() {
    let (conn, bus, config) = setup();
    let owner = create_user(&conn, &config, "alice");
    let project = create_project(&conn, &bus, &config, owner, "Acme");

    let service = ReferentService::new(&conn, &bus);
    let story = service
        .create_user_story(project.id, attrs("story"), UserStoryExtras::default())
        .unwrap();
    let task = service
        .create_task(project.id, attrs("task"), TaskExtras::default())
        .unwrap();
    let issue = service
        .create_issue(project.id, attrs("issue"), IssueExtras::default())
        .unwrap();
    let epic = service.create_epic(project.id, attrs("epic"), None).unwrap();

    assert_eq!(story.ref_num, 1);
    assert_eq!(task.ref_num, 1);
    assert_eq!(issue.ref_num, 1);
    assert_eq!(epic.ref_num, 1);

    let second_story = service
        .create_user_story(project.id, attrs("story 2"), UserStoryExtras::default())
        .unwrap();
    assert_eq!(second_story.ref_num, 2);
}

#[test]
fn refs_are_never_reused_after_delete() {
    let (conn, bus, config) = setup();
    let owner = create_user(&conn, &config, "alice");
    let project = create_project(&conn, &bus, &config, owner, "Acme");

    let service = ReferentService::new(&conn, &bus);
    let first = service
        .create_issue(project.id, attrs("doomed"), IssueExtras::default())
        .unwrap();
    assert_eq!(first.ref_num, 1);

    service.delete_issue(first.id).unwrap();

    let second = service
        .create_issue(project.id, attrs("survivor"), IssueExtras::default())
        .unwrap();
    assert_eq!(second.ref_num, 2);
}

#[test]
fn counters_are_independent_across_projects() {
    let (conn, bus, config) = setup();
    let owner = create_user(&conn, &config, "alice");
    let acme = create_project(&conn, &bus, &config, owner, "Acme");
    let globex = create_project(&conn, &bus, &config, owner, "Globex");

    let service = ReferentService::new(&conn, &bus);
    for subject in ["a", "b", "c"] {
        service
            .create_issue(acme.id, attrs(subject), IssueExtras::default())
            .unwrap();
    }
    let globex_issue = service
        .create_issue(globex.id, attrs("first"), IssueExtras::default())
        .unwrap();

    assert_eq!(globex_issue.ref_num, 1);

    let repo = SqliteReferentRepository::new(&conn);
    assert_eq!(repo.last_ref(acme.id, ReferentKind::Issue).unwrap(), 3);
    assert_eq!(repo.last_ref(globex.id, ReferentKind::Issue).unwrap(), 1);
}
