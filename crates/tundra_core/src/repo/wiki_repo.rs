//! Wiki page and wiki link persistence.
//!
//! # Responsibility
//! - Provide page CRUD with per-project slug uniqueness and
//!   version-counted content writes.
//! - Provide sidebar link CRUD with per-project href uniqueness.
//!
//! # Invariants
//! - Content writes bump `version`; a stale expected version is reported
//!   through the stored version so callers can raise their own conflict
//!   error.

use crate::model::wiki::{WikiLink, WikiPage};
use crate::repo::{RepoError, RepoResult};
use rusqlite::{params, Connection, Row};

const PAGE_SELECT_SQL: &str = "SELECT
    id, project_id, slug, content, owner_id, last_modifier_id, version,
    created_at, modified_at
FROM wiki_pages";

/// Repository interface for wiki content.
pub trait WikiRepository {
    fn get_page(&self, id: i64) -> RepoResult<Option<WikiPage>>;
    fn get_page_by_slug(&self, project_id: i64, slug: &str) -> RepoResult<Option<WikiPage>>;
    fn list_pages(&self, project_id: i64) -> RepoResult<Vec<WikiPage>>;
    /// Creates one page under a normalized slug.
    fn create_page(
        &self,
        project_id: i64,
        slug: &str,
        content: &str,
        owner_id: Option<i64>,
    ) -> RepoResult<WikiPage>;
    /// Replaces page content, bumping `version`.
    fn store_content(
        &self,
        page_id: i64,
        content: &str,
        last_modifier_id: Option<i64>,
    ) -> RepoResult<()>;
    fn delete_page(&self, id: i64) -> RepoResult<bool>;
    /// Creates one sidebar link.
    fn create_link(&self, project_id: i64, title: &str, href: &str, order: i64)
        -> RepoResult<WikiLink>;
    fn list_links(&self, project_id: i64) -> RepoResult<Vec<WikiLink>>;
    fn delete_link(&self, id: i64) -> RepoResult<bool>;
}

/// SQLite-backed wiki repository.
pub struct SqliteWikiRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteWikiRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl WikiRepository for SqliteWikiRepository<'_> {
    fn get_page(&self, id: i64) -> RepoResult<Option<WikiPage>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{PAGE_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_page_row(row)?));
        }
        Ok(None)
    }

    fn get_page_by_slug(&self, project_id: i64, slug: &str) -> RepoResult<Option<WikiPage>> {
        let mut stmt = self.conn.prepare(&format!(
            "{PAGE_SELECT_SQL} WHERE project_id = ?1 AND slug = ?2;"
        ))?;
        let mut rows = stmt.query(params![project_id, slug])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_page_row(row)?));
        }
        Ok(None)
    }

    fn list_pages(&self, project_id: i64) -> RepoResult<Vec<WikiPage>> {
        let mut stmt = self.conn.prepare(&format!(
            "{PAGE_SELECT_SQL} WHERE project_id = ?1 ORDER BY slug ASC;"
        ))?;
        let mut rows = stmt.query([project_id])?;
        let mut items = Vec::new();
        while let Some(row) = rows.next()? {
            items.push(parse_page_row(row)?);
        }
        Ok(items)
    }

    fn create_page(
        &self,
        project_id: i64,
        slug: &str,
        content: &str,
        owner_id: Option<i64>,
    ) -> RepoResult<WikiPage> {
        self.conn
            .execute(
                "INSERT INTO wiki_pages (project_id, slug, content, owner_id, last_modifier_id)
                 VALUES (?1, ?2, ?3, ?4, ?4);",
                params![project_id, slug, content, owner_id],
            )
            .map_err(|err| RepoError::map_unique(err, "wiki page", "slug"))?;

        let id = self.conn.last_insert_rowid();
        self.get_page(id)?.ok_or(RepoError::NotFound {
            entity: "wiki page",
            id,
        })
    }

    fn store_content(
        &self,
        page_id: i64,
        content: &str,
        last_modifier_id: Option<i64>,
    ) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE wiki_pages
             SET content = ?2,
                 last_modifier_id = ?3,
                 version = version + 1,
                 modified_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?1;",
            params![page_id, content, last_modifier_id],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: "wiki page",
                id: page_id,
            });
        }
        Ok(())
    }

    fn delete_page(&self, id: i64) -> RepoResult<bool> {
        let changed = self.conn.execute("DELETE FROM wiki_pages WHERE id = ?1;", [id])?;
        Ok(changed > 0)
    }

    fn create_link(
        &self,
        project_id: i64,
        title: &str,
        href: &str,
        order: i64,
    ) -> RepoResult<WikiLink> {
        self.conn
            .execute(
                "INSERT INTO wiki_links (project_id, title, href, sort_order)
                 VALUES (?1, ?2, ?3, ?4);",
                params![project_id, title, href, order],
            )
            .map_err(|err| RepoError::map_unique(err, "wiki link", "href"))?;

        let id = self.conn.last_insert_rowid();
        let mut stmt = self.conn.prepare(
            "SELECT id, project_id, title, href, sort_order FROM wiki_links WHERE id = ?1;",
        )?;
        let mut rows = stmt.query([id])?;
        if let Some(row) = rows.next()? {
            return parse_link_row(row);
        }
        Err(RepoError::NotFound {
            entity: "wiki link",
            id,
        })
    }

    fn list_links(&self, project_id: i64) -> RepoResult<Vec<WikiLink>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, project_id, title, href, sort_order
             FROM wiki_links
             WHERE project_id = ?1
             ORDER BY sort_order ASC, id ASC;",
        )?;
        let mut rows = stmt.query([project_id])?;
        let mut items = Vec::new();
        while let Some(row) = rows.next()? {
            items.push(parse_link_row(row)?);
        }
        Ok(items)
    }

    fn delete_link(&self, id: i64) -> RepoResult<bool> {
        let changed = self.conn.execute("DELETE FROM wiki_links WHERE id = ?1;", [id])?;
        Ok(changed > 0)
    }
}

fn parse_page_row(row: &Row<'_>) -> RepoResult<WikiPage> {
    Ok(WikiPage {
        id: row.get("id")?,
        project_id: row.get("project_id")?,
        slug: row.get("slug")?,
        content: row.get("content")?,
        owner_id: row.get("owner_id")?,
        last_modifier_id: row.get("last_modifier_id")?,
        version: row.get("version")?,
        created_at: row.get("created_at")?,
        modified_at: row.get("modified_at")?,
    })
}

fn parse_link_row(row: &Row<'_>) -> RepoResult<WikiLink> {
    Ok(WikiLink {
        id: row.get("id")?,
        project_id: row.get("project_id")?,
        title: row.get("title")?,
        href: row.get("href")?,
        order: row.get("sort_order")?,
    })
}
