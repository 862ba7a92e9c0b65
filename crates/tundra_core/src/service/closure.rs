//! Closure propagation: derived `is_closed` for stories and milestones.
//!
//! # Responsibility
//! - Recompute story closure mirrors when statuses, tasks or the story
//!   itself change.
//! - Recompute milestone closure from the items it holds.
//!
//! # Invariants
//! - Propagation is idempotent: recomputing an already-consistent state
//!   writes nothing and emits nothing.
//! - `StoryClosureChanged` is emitted only when the stored mirror flips.

use crate::events::{DomainEvent, EventBus};
use crate::model::taxonomy::{TaxonomyKind, TaxonomyRow};
use crate::repo::milestone_repo::{derive_milestone_closed_tx, set_milestone_closed_tx};
use crate::repo::referent_repo::{
    derive_story_closed_tx, refresh_status_mirrors_tx, require_user_story_tx,
    set_story_closed_tx, stories_using_status_tx, story_parents_of_task_status_tx,
};
use crate::service::CoreResult;
use rusqlite::Connection;

/// Recomputes one story's closure mirror and, when the story sits in a
/// milestone, that milestone's closed flag.
pub(crate) fn sync_story_closure(
    conn: &Connection,
    bus: &EventBus,
    user_story_id: i64,
) -> CoreResult<()> {
    let story = require_user_story_tx(conn, user_story_id)?;
    let derived = derive_story_closed_tx(conn, user_story_id)?;
    if set_story_closed_tx(conn, user_story_id, derived)? {
        bus.publish(DomainEvent::StoryClosureChanged {
            user_story_id,
            project_id: story.project_id,
            is_closed: derived,
        })?;
    }

    if let Some(milestone_id) = story.milestone_id {
        sync_milestone_closure(conn, milestone_id)?;
    }
    Ok(())
}

/// Recomputes the stories affected by an edited status row.
///
/// Story statuses revisit their direct users; task statuses refresh the
/// task mirrors first, then revisit the parent stories.
pub(crate) fn sync_status_edit(
    conn: &Connection,
    bus: &EventBus,
    status: &TaxonomyRow,
) -> CoreResult<()> {
    match status.kind {
        TaxonomyKind::UsStatus => {
            for story_id in stories_using_status_tx(conn, status.id)? {
                sync_story_closure(conn, bus, story_id)?;
            }
        }
        TaxonomyKind::TaskStatus => {
            refresh_status_mirrors_tx(conn, status.id)?;
            for story_id in story_parents_of_task_status_tx(conn, status.id)? {
                sync_story_closure(conn, bus, story_id)?;
            }
            for milestone_id in milestones_of_status_tasks(conn, status.id)? {
                sync_milestone_closure(conn, milestone_id)?;
            }
        }
        TaxonomyKind::IssueStatus => {
            refresh_status_mirrors_tx(conn, status.id)?;
            for milestone_id in milestones_of_status_issues(conn, status.id)? {
                sync_milestone_closure(conn, milestone_id)?;
            }
        }
        _ => {}
    }
    Ok(())
}

/// Recomputes one milestone's closed flag.
pub(crate) fn sync_milestone_closure(conn: &Connection, milestone_id: i64) -> CoreResult<()> {
    let derived = derive_milestone_closed_tx(conn, milestone_id)?;
    set_milestone_closed_tx(conn, milestone_id, derived)?;
    Ok(())
}

fn milestones_of_status_tasks(conn: &Connection, status_id: i64) -> CoreResult<Vec<i64>> {
    collect_ids(
        conn,
        "SELECT DISTINCT milestone_id FROM tasks
         WHERE status_id = ?1 AND milestone_id IS NOT NULL;",
        status_id,
    )
}

fn milestones_of_status_issues(conn: &Connection, status_id: i64) -> CoreResult<Vec<i64>> {
    collect_ids(
        conn,
        "SELECT DISTINCT milestone_id FROM issues
         WHERE status_id = ?1 AND milestone_id IS NOT NULL;",
        status_id,
    )
}

fn collect_ids(conn: &Connection, sql: &str, bind: i64) -> CoreResult<Vec<i64>> {
    let mut stmt = conn.prepare(sql)?;
    let mut rows = stmt.query([bind])?;
    let mut ids = Vec::new();
    while let Some(row) = rows.next()? {
        ids.push(row.get(0)?);
    }
    Ok(ids)
}
