//! Database schema definitions
//!
//! This module contains all SQL schema definitions for the crawl database.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Every URL ever seen as a link target
CREATE TABLE IF NOT EXISTS links (
    url TEXT PRIMARY KEY,
    discovered_at TEXT
);

-- URLs that completed the crawl step, with the depth at which they did
CREATE TABLE IF NOT EXISTS visited (
    url TEXT PRIMARY KEY,
    depth INTEGER NOT NULL,
    visited_at TEXT
);

CREATE INDEX IF NOT EXISTS idx_visited_depth ON visited(depth);

-- Track crawl runs
CREATE TABLE IF NOT EXISTS runs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    seed_url TEXT NOT NULL,
    max_depth INTEGER NOT NULL,
    workers INTEGER NOT NULL,
    config_hash TEXT NOT NULL,
    started_at TEXT NOT NULL,
    finished_at TEXT,
    status TEXT NOT NULL,
    processed_count INTEGER NOT NULL DEFAULT 0
);
"#;

/// Columns added after the original two-table layout, as `(table, column, type)`
///
/// Store files written with only `links(url)` and `visited(url, depth)` get
/// these added on open.
const ADDED_COLUMNS: &[(&str, &str, &str)] = &[
    ("links", "discovered_at", "TEXT"),
    ("visited", "visited_at", "TEXT"),
];

/// Initializes the database schema
///
/// Safe to run against an existing database file, including one created
/// with the bare `links(url)` / `visited(url, depth)` layout.
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    migrate_columns(conn)?;
    Ok(())
}

/// Adds any column from [`ADDED_COLUMNS`] that an existing table lacks
fn migrate_columns(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    for (table, column, column_type) in ADDED_COLUMNS {
        if !has_column(conn, table, column)? {
            tracing::info!("Adding missing column {}.{}", table, column);
            conn.execute_batch(&format!(
                "ALTER TABLE {} ADD COLUMN {} {};",
                table, column, column_type
            ))?;
        }
    }
    Ok(())
}

fn has_column(
    conn: &rusqlite::Connection,
    table: &str,
    column: &str,
) -> Result<bool, rusqlite::Error> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({})", table))?;
    let names = stmt
        .query_map([], |row| row.get::<_, String>(1))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(names.iter().any(|name| name == column))
}
