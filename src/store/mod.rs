use std::path::{Path, PathBuf};
use std::sync::Mutex;

use rusqlite::{Connection, OpenFlags, OptionalExtension, Row, TransactionBehavior, params};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::error::{CoreError, CoreResult};
use crate::fingerprint::{Fingerprint, fingerprint};
use crate::model::Layout;
use crate::util::now_utc_string;

mod schema;

use schema::{configure_connection, ensure_schema};

pub const TEMPLATE_DB_FILE: &str = "templates.sqlite";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Template {
    pub template_id: String,
    pub name: Option<String>,
    pub fingerprint: Fingerprint,
    pub layout: Layout,
    pub created_at: String,
    /// Store-assigned creation order; larger is newer.
    pub sequence: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TemplateSummary {
    pub template_id: String,
    pub name: Option<String>,
    pub block_count: usize,
    pub shape_digest: String,
    pub created_at: String,
    pub sequence: i64,
}

struct TemplateRow {
    template_id: String,
    name: Option<String>,
    fingerprint_json: String,
    layout_json: String,
    created_at: String,
    sequence: i64,
}

impl TemplateRow {
    const COLUMNS: &'static str =
        "template_id, name, fingerprint_json, layout_json, created_at, sequence";

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            template_id: row.get(0)?,
            name: row.get(1)?,
            fingerprint_json: row.get(2)?,
            layout_json: row.get(3)?,
            created_at: row.get(4)?,
            sequence: row.get(5)?,
        })
    }

    fn into_template(self) -> CoreResult<Template> {
        Ok(Template {
            template_id: self.template_id,
            name: self.name,
            fingerprint: serde_json::from_str(&self.fingerprint_json)?,
            layout: serde_json::from_str(&self.layout_json)?,
            created_at: self.created_at,
            sequence: self.sequence,
        })
    }
}

/// SQLite-backed template persistence.
///
/// Writes go through a single writer connection inside IMMEDIATE
/// transactions; reads use a separate connection so they observe the last
/// committed snapshot under WAL without waiting on an open write.
pub struct TemplateStore {
    path: PathBuf,
    writer: Mutex<Connection>,
    reader: Mutex<Connection>,
}

impl TemplateStore {
    pub fn open(path: &Path) -> CoreResult<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let writer = Connection::open(path)?;
        configure_connection(&writer)?;
        ensure_schema(&writer)?;

        let reader = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        reader.busy_timeout(std::time::Duration::from_secs(5))?;

        Ok(Self {
            path: path.to_path_buf(),
            writer: Mutex::new(writer),
            reader: Mutex::new(reader),
        })
    }

    pub fn open_in(cache_root: &Path) -> CoreResult<Self> {
        Self::open(&cache_root.join(TEMPLATE_DB_FILE))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Persists `layout` as a new template. A reused `name` moves to the new
    /// template; the older one stays loadable by id only.
    pub fn save(&self, layout: &Layout, name: Option<&str>) -> CoreResult<Template> {
        let name = normalize_name(name);
        let fingerprint = fingerprint(layout, layout.extent);
        let fingerprint_json = serde_json::to_string(&fingerprint)?;
        let layout_json = serde_json::to_string(layout)?;
        let template_id = Uuid::new_v4().to_string();
        let created_at = now_utc_string();

        let mut connection = self.writer.lock().expect("template store writer poisoned");
        let tx = connection.transaction_with_behavior(TransactionBehavior::Immediate)?;

        if let Some(name) = name.as_deref() {
            tx.execute(
                "UPDATE templates SET name = NULL WHERE name = ?1",
                params![name],
            )?;
        }

        tx.execute(
            "
            INSERT INTO templates(template_id, name, block_count, shape_digest, fingerprint_json, layout_json, created_at)
            VALUES(?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ",
            params![
                template_id,
                name,
                fingerprint.block_count as i64,
                fingerprint.shape_digest,
                fingerprint_json,
                layout_json,
                created_at,
            ],
        )?;
        let sequence = tx.last_insert_rowid();
        tx.commit()?;

        debug!(
            template_id = %template_id,
            name = name.as_deref().unwrap_or(""),
            blocks = fingerprint.block_count,
            "saved template"
        );

        Ok(Template {
            template_id,
            name,
            fingerprint,
            layout: layout.clone(),
            created_at,
            sequence,
        })
    }

    /// Loads by template id first, then by name.
    pub fn load(&self, id_or_name: &str) -> CoreResult<Template> {
        let key = id_or_name.trim();
        let connection = self.reader.lock().expect("template store reader poisoned");

        let by_id = connection
            .query_row(
                &format!(
                    "SELECT {} FROM templates WHERE template_id = ?1",
                    TemplateRow::COLUMNS
                ),
                params![key],
                TemplateRow::from_row,
            )
            .optional()?;

        let row = match by_id {
            Some(row) => Some(row),
            None => connection
                .query_row(
                    &format!(
                        "SELECT {} FROM templates WHERE name = ?1",
                        TemplateRow::COLUMNS
                    ),
                    params![key],
                    TemplateRow::from_row,
                )
                .optional()?,
        };

        row.ok_or_else(|| CoreError::TemplateNotFound(key.to_string()))?
            .into_template()
    }

    /// All templates, newest first.
    pub fn load_all(&self) -> CoreResult<Vec<Template>> {
        let connection = self.reader.lock().expect("template store reader poisoned");
        let mut statement = connection.prepare(&format!(
            "SELECT {} FROM templates ORDER BY sequence DESC",
            TemplateRow::COLUMNS
        ))?;

        let rows = statement.query_map([], TemplateRow::from_row)?;
        let mut out = Vec::<Template>::new();
        for row in rows {
            out.push(row?.into_template()?);
        }
        Ok(out)
    }

    pub fn list(&self) -> CoreResult<Vec<TemplateSummary>> {
        let connection = self.reader.lock().expect("template store reader poisoned");
        let mut statement = connection.prepare(
            "
            SELECT template_id, name, block_count, shape_digest, created_at, sequence
            FROM templates
            ORDER BY sequence DESC
            ",
        )?;

        let rows = statement.query_map([], |row| {
            Ok(TemplateSummary {
                template_id: row.get(0)?,
                name: row.get(1)?,
                block_count: row.get::<_, i64>(2)? as usize,
                shape_digest: row.get(3)?,
                created_at: row.get(4)?,
                sequence: row.get(5)?,
            })
        })?;

        let mut out = Vec::<TemplateSummary>::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    /// Renames a template. The new name is released from any other template.
    pub fn rename(&self, id_or_name: &str, new_name: &str) -> CoreResult<Template> {
        let key = id_or_name.trim();
        let Some(new_name) = normalize_name(Some(new_name)) else {
            return Err(CoreError::InvalidTemplateName(new_name.to_string()));
        };

        {
            let mut connection = self.writer.lock().expect("template store writer poisoned");
            let tx = connection.transaction_with_behavior(TransactionBehavior::Immediate)?;

            let template_id = tx
                .query_row(
                    "
                    SELECT template_id FROM templates
                    WHERE template_id = ?1 OR name = ?1
                    ORDER BY CASE WHEN template_id = ?1 THEN 0 ELSE 1 END
                    LIMIT 1
                    ",
                    params![key],
                    |row| row.get::<_, String>(0),
                )
                .optional()?
                .ok_or_else(|| CoreError::TemplateNotFound(key.to_string()))?;

            tx.execute(
                "UPDATE templates SET name = NULL WHERE name = ?1 AND template_id != ?2",
                params![new_name, template_id],
            )?;
            tx.execute(
                "UPDATE templates SET name = ?1 WHERE template_id = ?2",
                params![new_name, template_id],
            )?;
            tx.commit()?;

            debug!(template_id = %template_id, name = %new_name, "renamed template");
        }

        self.load(&new_name)
    }

    pub fn count(&self) -> CoreResult<i64> {
        let connection = self.reader.lock().expect("template store reader poisoned");
        let count = connection.query_row("SELECT COUNT(*) FROM templates", [], |row| row.get(0))?;
        Ok(count)
    }
}

fn normalize_name(name: Option<&str>) -> Option<String> {
    name.map(str::trim)
        .filter(|value| !value.is_empty())
        .map(ToOwned::to_owned)
}
