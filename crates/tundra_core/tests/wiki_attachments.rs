mod support;

use support::{create_project, create_user, setup};
use tundra_core::model::attachment::AttachedTo;
use tundra_core::repo::attachment_repo::{AttachmentRepository, SqliteAttachmentRepository};
use tundra_core::repo::wiki_repo::{SqliteWikiRepository, WikiRepository};
use tundra_core::repo::RepoError;
use tundra_core::{ReferentAttrs, ReferentService, TaskExtras};

#[test]
fn wiki_page_slugs_are_unique_per_project() {
    let (conn, bus, config) = setup();
    let owner = create_user(&conn, &config, "alice");
    let acme = create_project(&conn, &bus, &config, owner, "Acme");
    let globex = create_project(&conn, &bus, &config, owner, "Globex");

    let wiki = SqliteWikiRepository::new(&conn);
    wiki.create_page(acme.id, "home", "# Welcome", Some(owner))
        .unwrap();
    let err = wiki
        .create_page(acme.id, "home", "clone", Some(owner))
        .unwrap_err();
    assert!(matches!(err, RepoError::UniqueViolation { .. }));

    // The namespace is per project.
    wiki.create_page(globex.id, "home", "# Welcome", Some(owner))
        .unwrap();
}

#[test]
fn wiki_content_writes_bump_the_version() {
    let (conn, bus, config) = setup();
    let owner = create_user(&conn, &config, "alice");
    let project = create_project(&conn, &bus, &config, owner, "Acme");

    let wiki = SqliteWikiRepository::new(&conn);
    let page = wiki
        .create_page(project.id, "home", "draft", Some(owner))
        .unwrap();
    assert_eq!(page.version, 1);

    wiki.store_content(page.id, "final", Some(owner)).unwrap();
    let reloaded = wiki.get_page(page.id).unwrap().unwrap();
    assert_eq!(reloaded.version, 2);
    assert_eq!(reloaded.content, "final");
}

#[test]
fn wiki_links_are_unique_per_href() {
    let (conn, bus, config) = setup();
    let owner = create_user(&conn, &config, "alice");
    let project = create_project(&conn, &bus, &config, owner, "Acme");

    let wiki = SqliteWikiRepository::new(&conn);
    wiki.create_link(project.id, "Home", "home", 1).unwrap();
    let err = wiki.create_link(project.id, "Also home", "home", 2).unwrap_err();
    assert!(matches!(err, RepoError::UniqueViolation { .. }));

    let links = wiki.list_links(project.id).unwrap();
    assert_eq!(links.len(), 1);
    assert_eq!(links[0].title, "Home");
}

#[test]
fn attachments_dispatch_by_owner_kind() {
    let (conn, bus, config) = setup();
    let owner = create_user(&conn, &config, "alice");
    let project = create_project(&conn, &bus, &config, owner, "Acme");

    let referents = ReferentService::new(&conn, &bus);
    let task = referents
        .create_task(
            project.id,
            ReferentAttrs {
                subject: "with file".to_string(),
                ..ReferentAttrs::default()
            },
            TaskExtras::default(),
        )
        .unwrap();

    let attachments = SqliteAttachmentRepository::new(&conn);
    let uploaded = attachments
        .create_attachment(
            project.id,
            Some(owner),
            AttachedTo::Task(task.id),
            "attachments/task/spec.pdf",
            "design notes",
            1,
        )
        .unwrap();
    assert_eq!(uploaded.attached_to, AttachedTo::Task(task.id));

    // The same object id under a different kind is a different owner.
    assert!(attachments
        .list_for(AttachedTo::UserStory(task.id))
        .unwrap()
        .is_empty());
    let listed = attachments.list_for(AttachedTo::Task(task.id)).unwrap();
    assert_eq!(listed.len(), 1);

    let mut deprecated = listed.into_iter().next().unwrap();
    deprecated.is_deprecated = true;
    attachments.store_attachment(&deprecated).unwrap();
    let reloaded = attachments.get_attachment(uploaded.id).unwrap().unwrap();
    assert!(reloaded.is_deprecated);

    assert!(attachments.delete_attachment(uploaded.id).unwrap());
    assert!(attachments.get_attachment(uploaded.id).unwrap().is_none());
}
