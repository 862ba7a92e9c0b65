//! Attachment persistence over the tagged owner key.
//!
//! # Responsibility
//! - Store and list attachments for any owning entity kind without
//!   runtime type introspection.

use crate::model::attachment::{AttachedTo, Attachment};
use crate::repo::{bool_to_int, RepoError, RepoResult};
use rusqlite::{params, Connection, Row};

const ATTACHMENT_SELECT_SQL: &str = "SELECT
    id, project_id, owner_id, content_kind, object_id, attached_file,
    sort_order, is_deprecated, description, created_at, modified_at
FROM attachments";

/// Repository interface for attachments.
pub trait AttachmentRepository {
    fn get_attachment(&self, id: i64) -> RepoResult<Option<Attachment>>;
    /// Lists attachments of one owning entity in attachment order.
    fn list_for(&self, attached_to: AttachedTo) -> RepoResult<Vec<Attachment>>;
    fn create_attachment(
        &self,
        project_id: i64,
        owner_id: Option<i64>,
        attached_to: AttachedTo,
        attached_file: &str,
        description: &str,
        order: i64,
    ) -> RepoResult<Attachment>;
    /// Updates mutable metadata (order, deprecation, description).
    fn store_attachment(&self, attachment: &Attachment) -> RepoResult<()>;
    fn delete_attachment(&self, id: i64) -> RepoResult<bool>;
}

/// SQLite-backed attachment repository.
pub struct SqliteAttachmentRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteAttachmentRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl AttachmentRepository for SqliteAttachmentRepository<'_> {
    fn get_attachment(&self, id: i64) -> RepoResult<Option<Attachment>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{ATTACHMENT_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_attachment_row(row)?));
        }
        Ok(None)
    }

    fn list_for(&self, attached_to: AttachedTo) -> RepoResult<Vec<Attachment>> {
        let mut stmt = self.conn.prepare(&format!(
            "{ATTACHMENT_SELECT_SQL}
             WHERE content_kind = ?1 AND object_id = ?2
             ORDER BY sort_order ASC, id ASC;"
        ))?;
        let mut rows = stmt.query(params![attached_to.kind_token(), attached_to.object_id()])?;
        let mut items = Vec::new();
        while let Some(row) = rows.next()? {
            items.push(parse_attachment_row(row)?);
        }
        Ok(items)
    }

    fn create_attachment(
        &self,
        project_id: i64,
        owner_id: Option<i64>,
        attached_to: AttachedTo,
        attached_file: &str,
        description: &str,
        order: i64,
    ) -> RepoResult<Attachment> {
        self.conn.execute(
            "INSERT INTO attachments (
                project_id, owner_id, content_kind, object_id, attached_file,
                sort_order, description
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7);",
            params![
                project_id,
                owner_id,
                attached_to.kind_token(),
                attached_to.object_id(),
                attached_file,
                order,
                description,
            ],
        )?;

        let id = self.conn.last_insert_rowid();
        self.get_attachment(id)?.ok_or(RepoError::NotFound {
            entity: "attachment",
            id,
        })
    }

    fn store_attachment(&self, attachment: &Attachment) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE attachments
             SET sort_order = ?2,
                 is_deprecated = ?3,
                 description = ?4,
                 modified_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?1;",
            params![
                attachment.id,
                attachment.order,
                bool_to_int(attachment.is_deprecated),
                attachment.description,
            ],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: "attachment",
                id: attachment.id,
            });
        }
        Ok(())
    }

    fn delete_attachment(&self, id: i64) -> RepoResult<bool> {
        let changed = self
            .conn
            .execute("DELETE FROM attachments WHERE id = ?1;", [id])?;
        Ok(changed > 0)
    }
}

fn parse_attachment_row(row: &Row<'_>) -> RepoResult<Attachment> {
    let kind_token: String = row.get("content_kind")?;
    let object_id: i64 = row.get("object_id")?;
    let attached_to = AttachedTo::from_parts(&kind_token, object_id).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid content kind `{kind_token}` in attachments.content_kind"
        ))
    })?;

    Ok(Attachment {
        id: row.get("id")?,
        project_id: row.get("project_id")?,
        owner_id: row.get("owner_id")?,
        attached_to,
        attached_file: row.get("attached_file")?,
        order: row.get("sort_order")?,
        is_deprecated: row.get::<_, i64>("is_deprecated")? != 0,
        description: row.get("description")?,
        created_at: row.get("created_at")?,
        modified_at: row.get("modified_at")?,
    })
}
