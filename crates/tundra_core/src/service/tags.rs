//! Tag normalization and the project `(tag, color)` registry.
//!
//! # Responsibility
//! - Normalize tag input on every save of a tagged entity.
//! - Keep `projects.tags_colors` reflecting the tags currently in use.
//!
//! # Invariants
//! - Normalization is idempotent: trim + lowercase, duplicates removed
//!   preserving first occurrence.
//! - Registry GC never drops a color while its tag remains in use.
//! - New tags enter the registry with a `NULL` color.

use crate::model::project::TagColor;
use crate::repo::project_repo::{load_tags_colors_tx, store_tags_colors_tx};
use crate::repo::referent_repo::gather_used_tags_tx;
use crate::service::CoreResult;
use rusqlite::Connection;
use std::collections::HashSet;

/// Normalizes one tag. Blank input normalizes to `None`.
pub fn normalize_tag(tag: &str) -> Option<String> {
    let trimmed = tag.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_lowercase())
    }
}

/// Normalizes a tag list, dropping blanks and duplicates while keeping
/// the first occurrence order.
pub fn normalize_tags(tags: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut normalized = Vec::new();
    for tag in tags {
        if let Some(value) = normalize_tag(tag) {
            if seen.insert(value.clone()) {
                normalized.push(value);
            }
        }
    }
    normalized
}

/// Appends registry entries for tags not yet present, color unset.
///
/// Runs on every create/edit of a taggable item.
pub(crate) fn register_tags_tx(
    conn: &Connection,
    project_id: i64,
    tags: &[String],
) -> CoreResult<()> {
    if tags.is_empty() {
        return Ok(());
    }

    let mut registry = load_tags_colors_tx(conn, project_id)?;
    let known: HashSet<String> = registry
        .iter()
        .map(|entry| entry.tag().to_string())
        .collect();

    let mut appended = false;
    for tag in tags {
        if !known.contains(tag) {
            registry.push(TagColor(tag.clone(), None));
            appended = true;
        }
    }

    if appended {
        store_tags_colors_tx(conn, project_id, &registry)?;
    }
    Ok(())
}

/// Drops registry entries whose tag no longer appears on any taggable
/// item of the project.
///
/// Runs after deletes.
pub(crate) fn gc_tags_tx(conn: &Connection, project_id: i64) -> CoreResult<()> {
    let used = gather_used_tags_tx(conn, project_id)?;
    let registry = load_tags_colors_tx(conn, project_id)?;

    let retained: Vec<TagColor> = registry
        .iter()
        .filter(|entry| used.contains(entry.tag()))
        .cloned()
        .collect();

    if retained.len() != registry.len() {
        store_tags_colors_tx(conn, project_id, &retained)?;
    }
    Ok(())
}
