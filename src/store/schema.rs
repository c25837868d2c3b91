use rusqlite::Connection;

use crate::error::CoreResult;

pub(super) const STORE_SCHEMA_VERSION: &str = "1";

pub(super) fn configure_connection(connection: &Connection) -> CoreResult<()> {
    connection.pragma_update(None, "journal_mode", "WAL")?;
    connection.pragma_update(None, "synchronous", "NORMAL")?;
    connection.busy_timeout(std::time::Duration::from_secs(5))?;
    Ok(())
}

pub(super) fn ensure_schema(connection: &Connection) -> CoreResult<()> {
    connection.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS metadata (
          key TEXT PRIMARY KEY,
          value TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS templates (
          sequence INTEGER PRIMARY KEY AUTOINCREMENT,
          template_id TEXT NOT NULL UNIQUE,
          name TEXT,
          block_count INTEGER NOT NULL,
          shape_digest TEXT NOT NULL,
          fingerprint_json TEXT NOT NULL,
          layout_json TEXT NOT NULL,
          created_at TEXT NOT NULL
        );

        CREATE UNIQUE INDEX IF NOT EXISTS idx_templates_name
          ON templates(name) WHERE name IS NOT NULL;

        CREATE INDEX IF NOT EXISTS idx_templates_digest
          ON templates(shape_digest);
        ",
    )?;

    connection.execute(
        "
        INSERT INTO metadata(key, value) VALUES('schema_version', ?1)
        ON CONFLICT(key) DO UPDATE SET value=excluded.value
        ",
        [STORE_SCHEMA_VERSION],
    )?;

    Ok(())
}
