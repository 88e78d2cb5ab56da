// Database schema: table creation.
//
// A `schema_version` table records which versions of the layout are in place.
// The base tables are CREATE IF NOT EXISTS; later columns arrive through
// numbered migrations that run once per database.

use anyhow::{Context, Result};
use rusqlite::Connection;

/// Latest schema version.
pub const SCHEMA_VERSION: i64 = 2;

/// Create all tables if they don't exist yet.
///
/// Idempotent, so startup calls it unconditionally.
pub fn create_tables(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        -- User directory: where notifications for a user id are delivered
        CREATE TABLE IF NOT EXISTS users (
            id TEXT PRIMARY KEY,
            email TEXT,
            phone TEXT,
            display_name TEXT,
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        -- Detector results (moderation, deepfake, face checks)
        CREATE TABLE IF NOT EXISTS analyses (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id TEXT,
            kind TEXT NOT NULL,
            subject TEXT NOT NULL,            -- file path or text preview
            flagged INTEGER NOT NULL DEFAULT 0,
            confidence REAL NOT NULL DEFAULT 0,
            result_json TEXT NOT NULL,
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        -- One row per dispatch, with the per-channel outcome map
        CREATE TABLE IF NOT EXISTS notifications (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id TEXT NOT NULL,
            kind TEXT NOT NULL,
            channels_json TEXT NOT NULL,
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX IF NOT EXISTS idx_analyses_created ON analyses(created_at);
        CREATE INDEX IF NOT EXISTS idx_notifications_user ON notifications(user_id);
        ",
    )
    .context("Failed to create tables")?;

    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version) VALUES (?1)",
        [1],
    )
    .context("Failed to record schema version")?;

    // Migration v2: review workflow for flagged content. `status` is one of
    // pending/reviewing/resolved/dismissed; `content_hash` is the sha256 of
    // the stored result record.
    run_migration(conn, 2, |c| {
        c.execute_batch(
            "ALTER TABLE analyses ADD COLUMN status TEXT NOT NULL DEFAULT 'pending';
             ALTER TABLE analyses ADD COLUMN content_hash TEXT;
             CREATE INDEX IF NOT EXISTS idx_analyses_status ON analyses(status);",
        )
    })?;

    Ok(())
}

/// Run a migration if it hasn't been applied yet.
fn run_migration<F>(conn: &Connection, version: i64, migrate: F) -> Result<()>
where
    F: FnOnce(&Connection) -> rusqlite::Result<()>,
{
    let already_applied: bool = conn.query_row(
        "SELECT COUNT(*) > 0 FROM schema_version WHERE version = ?1",
        [version],
        |row| row.get(0),
    )?;

    if !already_applied {
        migrate(conn).with_context(|| format!("Migration v{version} failed"))?;
        conn.execute(
            "INSERT INTO schema_version (version) VALUES (?1)",
            [version],
        )?;
    }

    Ok(())
}

/// Highest applied schema version.
pub fn current_version(conn: &Connection) -> Result<i64> {
    let version = conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| {
        row.get(0)
    })?;
    Ok(version)
}

/// Count the number of user-created tables in the database.
pub fn table_count(conn: &Connection) -> Result<i64> {
    let count = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%'",
        [],
        |row| row.get(0),
    )?;
    Ok(count)
}
