//! v001 -- Initial schema creation.
//!
//! Creates the `local_settings` key/value table.

use rusqlite::Connection;

/// SQL executed when upgrading from version 0 to version 1.
const UP_SQL: &str = r#"
-- ----------------------------------------------------------------
-- Settings that never leave this machine
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS local_settings (
    key        TEXT PRIMARY KEY NOT NULL,
    value      TEXT NOT NULL,
    updated_at TEXT NOT NULL                  -- ISO-8601 / RFC-3339
);
"#;

/// Apply the v001 migration.
pub fn up(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(UP_SQL)
}
