//! Project template persistence.
//!
//! # Responsibility
//! - Store and load inert template records with their JSON definition.
//!
//! # Invariants
//! - `(slug, domain)` uniqueness surfaces as `UniqueViolation`;
//!   templates without a domain share one slug namespace.

use crate::model::template::{ProjectTemplate, TemplateDefinition};
use crate::repo::{RepoError, RepoResult};
use rusqlite::{params, Connection, Row};

const TEMPLATE_SELECT_SQL: &str = "SELECT
    id, name, slug, domain, description, default_owner_role, definition,
    created_at, modified_at
FROM project_templates";

/// Repository interface for templates.
pub trait TemplateRepository {
    fn get_template(&self, id: i64) -> RepoResult<Option<ProjectTemplate>>;
    /// Template by slug within one tenant namespace (`None` = shared).
    fn get_template_by_slug(
        &self,
        slug: &str,
        domain: Option<&str>,
    ) -> RepoResult<Option<ProjectTemplate>>;
    /// Creates one template record.
    fn create_template(
        &self,
        name: &str,
        slug: &str,
        domain: Option<&str>,
        description: &str,
        default_owner_role: &str,
        definition: &TemplateDefinition,
    ) -> RepoResult<ProjectTemplate>;
    /// Replaces the definition and owner role of one template.
    fn store_definition(
        &self,
        id: i64,
        default_owner_role: &str,
        definition: &TemplateDefinition,
    ) -> RepoResult<()>;
}

/// SQLite-backed template repository.
pub struct SqliteTemplateRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteTemplateRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl TemplateRepository for SqliteTemplateRepository<'_> {
    fn get_template(&self, id: i64) -> RepoResult<Option<ProjectTemplate>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{TEMPLATE_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_template_row(row)?));
        }
        Ok(None)
    }

    fn get_template_by_slug(
        &self,
        slug: &str,
        domain: Option<&str>,
    ) -> RepoResult<Option<ProjectTemplate>> {
        load_template_by_slug_tx(self.conn, slug, domain)
    }

    fn create_template(
        &self,
        name: &str,
        slug: &str,
        domain: Option<&str>,
        description: &str,
        default_owner_role: &str,
        definition: &TemplateDefinition,
    ) -> RepoResult<ProjectTemplate> {
        let encoded = encode_definition(definition)?;
        self.conn
            .execute(
                "INSERT INTO project_templates (
                    name, slug, domain, description, default_owner_role, definition
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
                params![name, slug, domain, description, default_owner_role, encoded],
            )
            .map_err(|err| RepoError::map_unique(err, "project template", "slug"))?;

        let id = self.conn.last_insert_rowid();
        self.get_template(id)?.ok_or(RepoError::NotFound {
            entity: "project template",
            id,
        })
    }

    fn store_definition(
        &self,
        id: i64,
        default_owner_role: &str,
        definition: &TemplateDefinition,
    ) -> RepoResult<()> {
        let encoded = encode_definition(definition)?;
        let changed = self.conn.execute(
            "UPDATE project_templates
             SET default_owner_role = ?2,
                 definition = ?3,
                 modified_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?1;",
            params![id, default_owner_role, encoded],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: "project template",
                id,
            });
        }
        Ok(())
    }
}

pub(crate) fn load_template_by_slug_tx(
    conn: &Connection,
    slug: &str,
    domain: Option<&str>,
) -> RepoResult<Option<ProjectTemplate>> {
    let mut stmt = conn.prepare(&format!(
        "{TEMPLATE_SELECT_SQL}
         WHERE slug = ?1 AND (domain = ?2 OR (?2 IS NULL AND domain IS NULL));"
    ))?;
    let mut rows = stmt.query(params![slug, domain])?;
    if let Some(row) = rows.next()? {
        return Ok(Some(parse_template_row(row)?));
    }
    Ok(None)
}

fn encode_definition(definition: &TemplateDefinition) -> RepoResult<String> {
    serde_json::to_string(definition)
        .map_err(|err| RepoError::InvalidData(format!("cannot encode template definition: {err}")))
}

fn parse_template_row(row: &Row<'_>) -> RepoResult<ProjectTemplate> {
    let raw_definition: String = row.get("definition")?;
    let definition = serde_json::from_str(&raw_definition).map_err(|err| {
        RepoError::InvalidData(format!(
            "invalid template definition `{raw_definition}`: {err}"
        ))
    })?;

    Ok(ProjectTemplate {
        id: row.get("id")?,
        name: row.get("name")?,
        slug: row.get("slug")?,
        domain: row.get("domain")?,
        description: row.get("description")?,
        default_owner_role: row.get("default_owner_role")?,
        definition,
        created_at: row.get("created_at")?,
        modified_at: row.get("modified_at")?,
    })
}
