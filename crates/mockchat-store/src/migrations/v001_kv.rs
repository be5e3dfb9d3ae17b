//! v001 -- Key/value table holding the serialized application state.

use rusqlite::Connection;

/// SQL executed when upgrading from version 0 to version 1.
///
/// SQLite has no binary JSON column type; the value column is JSON-checked
/// text instead.
const UP_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS kv (
    key   TEXT PRIMARY KEY NOT NULL,
    value TEXT NOT NULL CHECK (json_valid(value))
);
"#;

pub fn up(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(UP_SQL)
}
