mod support;

use support::{create_project, create_user, setup};
use tundra_core::repo::project_repo::{ProjectRepository, SqliteProjectRepository};
use tundra_core::service::tags::{normalize_tag, normalize_tags};
use tundra_core::{
    CoreError, ProjectService, ReferentAttrs, ReferentService, TaskExtras, UserStoryExtras,
};

fn registry(conn: &rusqlite::Connection, project_id: i64) -> Vec<(String, Option<String>)> {
    SqliteProjectRepository::new(conn)
        .get_project(project_id)
        .unwrap()
        .unwrap()
        .tags_colors
        .into_iter()
        .map(|entry| (entry.tag().to_string(), entry.color().map(str::to_string)))
        .collect()
}

#[test]
fn tags_are_trimmed_lowercased_and_deduplicated_on_save() {
    let (conn, bus, config) = setup();
    let owner = create_user(&conn, &config, "alice");
    let project = create_project(&conn, &bus, &config, owner, "Acme");

    let referents = ReferentService::new(&conn, &bus);
    let story = referents
        .create_user_story(
            project.id,
            ReferentAttrs {
                subject: "tagged".to_string(),
                tags: vec![
                    "  Urgent ".to_string(),
                    "BLUE".to_string(),
                    "urgent".to_string(),
                ],
                ..ReferentAttrs::default()
            },
            UserStoryExtras::default(),
        )
        .unwrap();

    assert_eq!(story.tags, vec!["urgent", "blue"]);
    assert_eq!(
        registry(&conn, project.id),
        vec![("urgent".to_string(), None), ("blue".to_string(), None)]
    );
}

#[test]
fn normalization_is_idempotent() {
    assert_eq!(normalize_tag("urgent"), Some("urgent".to_string()));
    let once = normalize_tags(&["  MiXeD ".to_string(), "two".to_string()]);
    assert_eq!(normalize_tags(&once), once);
}

#[test]
fn deleting_the_last_user_of_a_tag_garbage_collects_it() {
    let (conn, bus, config) = setup();
    let owner = create_user(&conn, &config, "alice");
    let project = create_project(&conn, &bus, &config, owner, "Acme");

    let referents = ReferentService::new(&conn, &bus);
    let keeper = referents
        .create_user_story(
            project.id,
            ReferentAttrs {
                subject: "keeper".to_string(),
                tags: vec!["urgent".to_string()],
                ..ReferentAttrs::default()
            },
            UserStoryExtras::default(),
        )
        .unwrap();
    let task = referents
        .create_task(
            project.id,
            ReferentAttrs {
                subject: "worker".to_string(),
                tags: vec!["urgent".to_string(), "blue".to_string()],
                ..ReferentAttrs::default()
            },
            TaskExtras::default(),
        )
        .unwrap();

    let projects = ProjectService::new(&conn, &bus, &config);
    projects
        .set_tag_color(project.id, "urgent", Some("#f00"))
        .unwrap();
    assert_eq!(
        registry(&conn, project.id),
        vec![
            ("urgent".to_string(), Some("#f00".to_string())),
            ("blue".to_string(), None)
        ]
    );

    // The task was the only user of "blue"; "urgent" survives through the
    // story and keeps its color.
    referents.delete_task(task.id).unwrap();
    assert_eq!(
        registry(&conn, project.id),
        vec![("urgent".to_string(), Some("#f00".to_string()))]
    );

    referents.delete_user_story(keeper.id).unwrap();
    assert_eq!(registry(&conn, project.id), Vec::new());
}

#[test]
fn set_tag_color_rejects_unknown_tags() {
    let (conn, bus, config) = setup();
    let owner = create_user(&conn, &config, "alice");
    let project = create_project(&conn, &bus, &config, owner, "Acme");

    let projects = ProjectService::new(&conn, &bus, &config);
    let err = projects
        .set_tag_color(project.id, "ghost", Some("#123456"))
        .unwrap_err();
    assert!(matches!(
        err,
        CoreError::Validation {
            field: "tag",
            code: "unknown"
        }
    ));
}

#[test]
fn project_tag_edits_feed_the_registry() {
    let (conn, bus, config) = setup();
    let owner = create_user(&conn, &config, "alice");
    let project = create_project(&conn, &bus, &config, owner, "Acme");

    let projects = ProjectService::new(&conn, &bus, &config);
    projects
        .update_project(
            project.id,
            tundra_core::ProjectPatch {
                tags: Some(vec!["Greenfield".to_string(), "internal".to_string()]),
                ..tundra_core::ProjectPatch::default()
            },
        )
        .unwrap();

    assert_eq!(
        registry(&conn, project.id),
        vec![
            ("greenfield".to_string(), None),
            ("internal".to_string(), None)
        ]
    );

    // Dropping one project tag releases it from the registry.
    projects
        .update_project(
            project.id,
            tundra_core::ProjectPatch {
                tags: Some(vec!["internal".to_string()]),
                ..tundra_core::ProjectPatch::default()
            },
        )
        .unwrap();
    assert_eq!(
        registry(&conn, project.id),
        vec![("internal".to_string(), None)]
    );
}
